//! Wraps a web-viewer executable into a native application bundle.
//!
//! A bundle run takes a [`BundleRequest`] (source executable, title, URL) and
//! writes a self-contained `.app` directory: the executable, a JSON config
//! document it reads at launch, the website's icon converted to `.icns`, and
//! an `Info.plist` manifest.
//!
//! # Supported Platforms
//!
//! | Platform | Output | Notes |
//! |----------|--------|-------|
//! | macOS | `.app` | Assembled on any host |
//! | Windows, Linux | none | Rejected with [`Error::UnsupportedPlatform`] |
//!
//! # Icon failures
//!
//! Icon problems (no icon found, undecodable image, packer failure) do not
//! fail the bundle by default. They are reported through the
//! [`DiagnosticSink`] and the bundle is written without an icon. Set
//! [`IconFailurePolicy::Abort`] to make them fatal.
//!
//! # Integration
//!
//! ```no_run
//! use nativefy::bundler::{
//!     BundleRequest, Bundler, Collaborators, IconFailurePolicy, MemorySink, Platform,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> nativefy::bundler::Result<()> {
//! let sink = MemorySink::new();
//! let request = BundleRequest::new("target/release/viewer", "Docs", "docs.rs")?
//!     .icon_policy(IconFailurePolicy::Warn);
//! let collaborators = Collaborators::standard()?.with_diagnostics(Arc::new(sink.clone()));
//!
//! let bundler = Bundler::select(&Platform::current(), request, collaborators)?;
//! let app = bundler.bundle("dist".as_ref(), &CancellationToken::new()).await?;
//!
//! for diagnostic in sink.diagnostics() {
//!     eprintln!("warning: {diagnostic}");
//! }
//! println!("{}", app.path.display());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod builder;
mod diagnostics;
mod error;
pub(crate) mod platform;
mod resources;
mod settings;
mod utils;

// Public re-exports
pub use builder::{Bundler, Collaborators};
pub use diagnostics::{Diagnostic, DiagnosticSink, LogSink, MemorySink, Stage};
pub use error::{Context, Error, ErrorExt, IconError, Result};
pub use platform::Platform;
pub use platform::macos::app::{AppLayout, ICON_FILE_NAME, MacOsBundler};
pub use platform::macos::icon::{
    CONVERTED_SOURCE, ICNS_MIME, IcnsPacker, IconPacker, IconutilPacker, Packer, convert_icon,
};
pub use platform::macos::manifest::{INFO_PLIST_FILE_NAME, ManifestFields, ManifestRenderer};
pub use resources::favicon::{IconInferrer, PREFERRED_FORMATS, PageIconInferrer};
pub use resources::icons::{ICONSET_SIZES, Icon, IconsetEntry, nearest_size};
pub use settings::{
    BundleConfig, BundleRequest, CONFIG_FILE_NAME, IconFailurePolicy, normalize_url,
    validate_title,
};
pub use utils::fs::{EXECUTABLE_MODE, EntryMetadata, FILE_MODE, FileSystem, MemoryFs, OsFs};

/// The result of a successful bundle run.
///
/// All paths are inside [`path`](Self::path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledApp {
    /// The `.app` directory.
    pub path: std::path::PathBuf,

    /// The copied executable in `Contents/MacOS/`.
    pub executable: std::path::PathBuf,

    /// `Contents/MacOS/config.json`.
    pub config: std::path::PathBuf,

    /// `Contents/Info.plist`.
    pub manifest: std::path::PathBuf,

    /// `Contents/Resources/icon.icns`, when an icon was produced.
    pub icon: Option<std::path::PathBuf>,

    /// Hex SHA-256 of the copied executable.
    ///
    /// Matches the source file byte for byte, so it can be compared against
    /// a checksum of the original.
    pub executable_sha256: String,
}
