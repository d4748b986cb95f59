//! Command execution.

mod bundle;

use crate::cli::{Args, RuntimeConfig};
use crate::error::{NativefyError, Result};

use bundle::execute_bundle;

/// Execute the command described by the parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let output = super::OutputManager::new(false, false);
        let error = NativefyError::from(validation_error);
        output.error(&error.to_string());
        for suggestion in error.recovery_suggestions() {
            output.indent_err(&format!("• {}", suggestion));
        }
        return Ok(2);
    }

    let config = RuntimeConfig::from(&args);

    match execute_bundle(&args, &config).await {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            let output = config.output();
            output.error(&format!("Bundle failed: {}", e));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.indent_err("Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent_err(&format!("• {}", suggestion));
                }
            }

            Ok(1)
        }
    }
}
