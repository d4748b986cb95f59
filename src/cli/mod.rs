//! Command line interface for nativefy.
//!
//! Parses arguments, runs the bundle and reports the result.

mod args;
pub mod commands;
mod output;

pub use args::{Args, PackerKind, RuntimeConfig};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Run the command for already-parsed arguments
pub async fn run(args: Args) -> Result<i32> {
    execute_command(args).await
}

/// Parse process arguments
pub fn parse_args() -> Args {
    Args::parse_args()
}
