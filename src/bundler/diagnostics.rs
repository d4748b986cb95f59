//! Side channel for non-fatal bundle conditions.
//!
//! Swallowed icon failures are reported here instead of failing the bundle.
//! The sink is injected into each bundler; nothing in the crate keeps a
//! process-wide handle.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Bundle stage a diagnostic originates from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// Icon lookup via the icon source.
    IconInference,
    /// Decode, crop, resample and pack.
    IconConversion,
    /// Writing `icon.icns` into the bundle.
    IconWrite,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::IconInference => "icon inference",
            Stage::IconConversion => "icon conversion",
            Stage::IconWrite => "icon write",
        })
    }
}

/// A recorded non-fatal condition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    /// Where it happened.
    pub stage: Stage,
    /// Rendered error message.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// Receives diagnostics from a bundle run.
pub trait DiagnosticSink: Send + Sync {
    /// Records one diagnostic.
    fn record(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `log` facade at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
    }
}

/// Collects diagnostics in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Whether any recorded message contains `pattern`.
    pub fn contains(&self, pattern: &str) -> bool {
        self.diagnostics()
            .iter()
            .any(|diagnostic| diagnostic.message.contains(pattern))
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, diagnostic: Diagnostic) {
        log::debug!("recorded diagnostic: {}", diagnostic);
        match self.entries.lock() {
            Ok(mut entries) => entries.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_shared_between_clones() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        handle.record(Diagnostic {
            stage: Stage::IconInference,
            message: "no icon inferrer available".into(),
        });
        assert_eq!(sink.diagnostics().len(), 1);
        assert!(sink.contains("inferrer"));
        assert!(!sink.contains("decoding"));
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic {
            stage: Stage::IconConversion,
            message: "decoding icon image: bad magic".into(),
        };
        assert_eq!(
            diagnostic.to_string(),
            "[icon conversion] decoding icon image: bad magic"
        );
    }
}
