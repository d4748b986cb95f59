//! Error types for bundler operations.
//!
//! Provides contextual error chaining, filesystem-specific errors, and the
//! icon pipeline taxonomy.
//!
//! Errors fall into three classes:
//!
//! - **Fatal assembly errors** (`Fs`, `Io`, `Json`, ...) abort a bundle run.
//! - **Icon pipeline errors** ([`IconError`]) are recorded as diagnostics and
//!   the bundle is produced without an icon, unless the caller opted into
//!   [`IconFailurePolicy::Abort`](crate::bundler::IconFailurePolicy::Abort).
//! - **Unsupported platform** is reported before anything is written.
//!
//! # Example
//!
//! ```no_run
//! use nativefy::bundler::{ErrorExt, Result};
//! use std::path::Path;
//!
//! fn read_manifest(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).fs_context("reading manifest", path)
//! }
//! ```

use std::{fmt::Display, io, path::PathBuf};
use thiserror::Error as DeriveError;

/// Errors returned by the bundler.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "creating directory")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Child process could not be spawned.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Image processing error.
    #[error("{0}")]
    ImageError(#[from] image::ImageError),

    /// Handlebars template rendering error.
    #[error("{0}")]
    HandleBarsError(#[from] handlebars::RenderError),

    /// Handlebars template parsing error.
    #[error("{0}")]
    Template(#[from] handlebars::TemplateError),

    /// JSON serialization/deserialization error.
    #[error("{0}")]
    JsonError(#[from] serde_json::error::Error),

    /// HTTP client error.
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("{0}")]
    UrlParse(#[from] url::ParseError),

    /// Regular expression error (favicon link scanning).
    #[error("{0}")]
    RegexError(#[from] regex::Error),

    /// Icon acquisition or conversion failed.
    #[error("icon pipeline: {0}")]
    Icon(#[from] IconError),

    /// No bundler is registered for the requested platform.
    #[error("no bundler implemented for {platform}")]
    UnsupportedPlatform {
        /// The requested platform identifier
        platform: String,
    },

    /// The caller cancelled the bundle operation.
    #[error("bundle operation cancelled")]
    Cancelled,

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// The innermost error below any [`Error::Context`] wrappers.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Error::Context(_, inner) = current {
            current = inner;
        }
        current
    }

    /// Returns whether this error belongs to the icon pipeline class,
    /// looking through any context wrappers.
    pub fn is_icon_pipeline(&self) -> bool {
        matches!(self.root_cause(), Error::Icon(_))
    }

    /// Returns whether this error is a cancellation, looking through any
    /// context wrappers.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Error::Cancelled)
    }
}

/// Icon pipeline failures.
///
/// None of these are retried automatically.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum IconError {
    /// Icon inference was requested but no inferrer is configured.
    #[error("no icon inferrer available")]
    NoInferrer,

    /// The icon source returned no candidate.
    #[error("could not infer icon for {url}")]
    NotFound {
        /// Page the icon was looked up for
        url: String,
    },

    /// The icon source failed.
    #[error("inferring icon: {0}")]
    Inference(String),

    /// The candidate bytes are not a decodable raster image.
    #[error("decoding icon image: {0}")]
    Decode(#[source] image::ImageError),

    /// The decoded image has a zero dimension.
    #[error("icon image has no pixels ({width}x{height})")]
    EmptyImage {
        /// Decoded width
        width: u32,
        /// Decoded height
        height: u32,
    },

    /// Re-sampling or intermediate encoding failed.
    #[error("resampling icon to {size}x{size}: {reason}")]
    Resample {
        /// Target pixel size
        size: u32,
        /// What went wrong
        reason: String,
    },

    /// The icon packer failed. `output` holds its captured diagnostics.
    #[error("{tool} failed: {output}")]
    Conversion {
        /// Packer that failed (e.g. "iconutil")
        tool: String,
        /// Captured stdout/stderr or error text
        output: String,
    },
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with bundler's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying binary".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_errors_classified_through_context() {
        let err: Result<()> = Err(Error::Icon(IconError::NoInferrer));
        let err = err.context("fetching icon").unwrap_err();
        assert!(err.is_icon_pipeline());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_root_cause_unwraps_nested_context() {
        let err: Result<()> = Err(Error::UnsupportedPlatform {
            platform: "linux".into(),
        });
        let err = err.context("selecting bundler").context("bundling").unwrap_err();
        assert!(matches!(err.root_cause(), Error::UnsupportedPlatform { platform } if platform == "linux"));
        assert!(matches!(Error::Cancelled.root_cause(), Error::Cancelled));
    }

    #[test]
    fn test_fs_context_keeps_path() {
        let err = std::fs::read("/definitely/not/here")
            .fs_context("reading executable", "/definitely/not/here")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("reading executable /definitely/not/here"));
        assert!(!err.is_icon_pipeline());
    }

    #[test]
    fn test_conversion_error_includes_tool_output() {
        let err = IconError::Conversion {
            tool: "iconutil".into(),
            output: "icon.iconset:Invalid Iconset.".into(),
        };
        assert_eq!(err.to_string(), "iconutil failed: icon.iconset:Invalid Iconset.");
    }

    #[test]
    fn test_option_context_is_generic_error() {
        let none: Option<u8> = None;
        let err = none.context("no executable name").unwrap_err();
        assert!(matches!(err, Error::GenericError(ref m) if m == "no executable name"));
    }
}
