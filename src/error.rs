//! Top-level error types for the `nativefy` command.
//!
//! Wraps CLI and bundler failures and attaches actionable recovery
//! suggestions for the terminal.

use crate::bundler::{Error as BundlerError, IconError};
use thiserror::Error;

/// Result type alias for command-level operations
pub type Result<T> = std::result::Result<T, NativefyError>;

/// Main error type of the command
#[derive(Error, Debug)]
pub enum NativefyError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// Bundler errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] BundlerError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl NativefyError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            NativefyError::Cli(CliError::InvalidArguments { .. }) => vec![
                "Run nativefy --help for usage".to_string(),
            ],
            NativefyError::Bundler(error) => bundler_suggestions(error.root_cause()),
            NativefyError::Io(_) => {
                vec!["Check the error message above for specific details".to_string()]
            }
        }
    }
}

fn bundler_suggestions(cause: &BundlerError) -> Vec<String> {
    match cause {
        BundlerError::UnsupportedPlatform { .. } => vec![
            "Only macOS bundles can be produced: pass --platform macos".to_string(),
        ],
        BundlerError::UrlParse(_) => vec![
            "Pass a host name such as example.com or a full https:// URL".to_string(),
        ],
        BundlerError::Fs { path, .. } => vec![
            format!("Check that {} exists and is accessible", path.display()),
            "Use --binary to point at the viewer executable".to_string(),
        ],
        BundlerError::Icon(IconError::Conversion { tool, .. }) => vec![
            format!("The {} packer failed; try --packer icns", tool),
            "Drop --strict-icon to bundle without an icon".to_string(),
        ],
        BundlerError::Icon(_) => vec![
            "Drop --strict-icon to bundle without an icon".to_string(),
            "Use --no-icon to skip icon inference".to_string(),
        ],
        BundlerError::Cancelled => vec![
            "The bundle may be incomplete; run the command again".to_string(),
        ],
        _ => vec!["Check the error message above for specific details".to_string()],
    }
}
