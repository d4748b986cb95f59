//! Bundle command implementation.

use crate::bundler::{
    BundleRequest, BundledApp, Bundler, Collaborators, MemorySink, OsFs, PageIconInferrer,
};
use crate::cli::{Args, RuntimeConfig};
use crate::error::Result;
use path_absolutize::Absolutize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Execute the bundle command
pub(super) async fn execute_bundle(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let output = config.output();

    let binary = match &args.binary {
        Some(binary) => binary.clone(),
        None => std::env::current_exe()?,
    };
    let dest = args.output.absolutize()?.into_owned();
    let platform = args.target_platform();

    let request = BundleRequest::new(binary, args.title.as_str(), &args.url)?
        .infer_icon(!args.no_icon)
        .debug(args.debug)
        .icon_policy(args.icon_policy());
    let _ = output.info(&format!("Bundling {} as {} for {}", request.url(), args.title, platform));
    let _ = output.verbose(&format!("Wrapping {}", request.target().display()));

    let inferrer = if request.wants_icon() {
        Some(PageIconInferrer::new()?)
    } else {
        None
    };
    let sink = MemorySink::new();
    let collaborators = Collaborators::new(
        Arc::new(OsFs),
        Arc::new(sink.clone()),
        inferrer,
        args.packer.packer(),
    );
    let bundler = Bundler::select(&platform, request, collaborators)?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, cancelling bundle");
                cancel.cancel();
            }
        })
    };
    let result = bundler.bundle(&dest, &cancel).await;
    interrupt.abort();
    let app = result?;

    for diagnostic in sink.diagnostics() {
        let _ = output.warn(&diagnostic.to_string());
    }
    print_summary(config, &app);
    Ok(0)
}

fn print_summary(config: &RuntimeConfig, app: &BundledApp) {
    let output = config.output();
    let _ = output.success(&format!("Created {}", app.path.display()));
    let _ = output.field("executable", &app.executable.display().to_string());
    let _ = output.field("sha256", &app.executable_sha256);
    let icon = match &app.icon {
        Some(icon) => icon.display().to_string(),
        None => "none".to_string(),
    };
    let _ = output.field("icon", &icon);
    if output.is_quiet() {
        println!("{}", app.path.display());
    }
}
