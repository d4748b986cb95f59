//! nativefy - wrap a website into a native application bundle.

use nativefy::cli;
use nativefy::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    let args = cli::parse_args();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .format_timestamp(None)
        .init();

    match cli::run(args).await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));

            for suggestion in e.recovery_suggestions() {
                output.indent_err(&suggestion);
            }

            process::exit(1);
        }
    }
}
