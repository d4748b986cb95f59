//! Bundle orchestration and platform dispatch.
//!
//! [`Bundler::select`] picks the implementation for a [`Platform`]. Only
//! macOS has one; every other platform is rejected before anything touches
//! the destination.
//!
//! # Example
//!
//! ```no_run
//! use nativefy::bundler::{BundleRequest, Bundler, Collaborators, Platform};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> nativefy::bundler::Result<()> {
//! let request = BundleRequest::new("target/release/viewer", "Example", "example.com")?;
//! let bundler = Bundler::select(&Platform::MacOs, request, Collaborators::standard()?)?;
//! let app = bundler.bundle("dist".as_ref(), &CancellationToken::new()).await?;
//! println!("Created {} (sha256 {})", app.path.display(), app.executable_sha256);
//! # Ok(())
//! # }
//! ```

use crate::bundler::diagnostics::{DiagnosticSink, LogSink};
use crate::bundler::error::{Error, Result};
use crate::bundler::platform::Platform;
use crate::bundler::platform::macos::app::MacOsBundler;
use crate::bundler::platform::macos::icon::{IconPacker, Packer};
use crate::bundler::resources::favicon::{IconInferrer, PageIconInferrer};
use crate::bundler::settings::BundleRequest;
use crate::bundler::utils::fs::{FileSystem, OsFs};
use crate::bundler::BundledApp;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Services a bundler works through.
///
/// The icon source is fixed here, once, so a bundler never falls back to a
/// global default mid-run. `inferrer: None` means no icon can be inferred;
/// requests that ask for one get a diagnostic instead.
pub struct Collaborators<I, P> {
    /// Filesystem the bundle is written to.
    pub fs: Arc<dyn FileSystem>,
    /// Receiver of non-fatal conditions.
    pub diagnostics: Arc<dyn DiagnosticSink>,
    /// Icon source.
    pub inferrer: Option<I>,
    /// `.icns` packer.
    pub packer: P,
}

impl Collaborators<PageIconInferrer, Packer> {
    /// Host filesystem, log diagnostics, website icon scraping and the
    /// in-process `.icns` packer.
    pub fn standard() -> Result<Self> {
        Ok(Self {
            fs: Arc::new(OsFs),
            diagnostics: Arc::new(LogSink),
            inferrer: Some(PageIconInferrer::new()?),
            packer: Packer::default(),
        })
    }
}

impl<I, P> Collaborators<I, P> {
    /// Assembles collaborators from parts.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        diagnostics: Arc<dyn DiagnosticSink>,
        inferrer: Option<I>,
        packer: P,
    ) -> Self {
        Self {
            fs,
            diagnostics,
            inferrer,
            packer,
        }
    }

    /// Replaces the filesystem.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Replaces the diagnostic sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Replaces the icon source.
    pub fn with_inferrer<J>(self, inferrer: Option<J>) -> Collaborators<J, P> {
        Collaborators {
            fs: self.fs,
            diagnostics: self.diagnostics,
            inferrer,
            packer: self.packer,
        }
    }

    /// Replaces the packer.
    pub fn with_packer<Q>(self, packer: Q) -> Collaborators<I, Q> {
        Collaborators {
            fs: self.fs,
            diagnostics: self.diagnostics,
            inferrer: self.inferrer,
            packer,
        }
    }
}

/// A platform bundler, chosen by [`Bundler::select`].
pub enum Bundler<I = PageIconInferrer, P = Packer> {
    /// `.app` bundles.
    MacOs(MacOsBundler<I, P>),
}

impl<I: IconInferrer, P: IconPacker> Bundler<I, P> {
    /// Returns the bundler for `platform`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedPlatform`] naming the platform for anything other
    /// than macOS.
    pub fn select(
        platform: &Platform,
        request: BundleRequest,
        collaborators: Collaborators<I, P>,
    ) -> Result<Self> {
        match platform {
            Platform::MacOs => Ok(Bundler::MacOs(MacOsBundler::new(request, collaborators)?)),
            Platform::Windows | Platform::Linux | Platform::Other(_) => {
                log::debug!("No bundler for {}", platform);
                Err(Error::UnsupportedPlatform {
                    platform: platform.to_string(),
                })
            }
        }
    }

    /// Platform this bundler targets.
    pub fn platform(&self) -> Platform {
        match self {
            Bundler::MacOs(_) => Platform::MacOs,
        }
    }

    /// Produces the bundle under `dest`.
    pub async fn bundle(&self, dest: &Path, cancel: &CancellationToken) -> Result<BundledApp> {
        match self {
            Bundler::MacOs(bundler) => bundler.bundle(dest, cancel).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::diagnostics::MemorySink;
    use crate::bundler::platform::macos::icon::IcnsPacker;
    use crate::bundler::utils::fs::MemoryFs;

    fn collaborators(fs: &MemoryFs) -> Collaborators<PageIconInferrer, IcnsPacker> {
        Collaborators::new(
            Arc::new(fs.clone()),
            Arc::new(MemorySink::new()),
            None,
            IcnsPacker,
        )
    }

    #[test]
    fn test_select_rejects_other_platforms() {
        let fs = MemoryFs::new();
        for platform in [Platform::Windows, Platform::Linux, Platform::Other("plan9".into())] {
            let request = BundleRequest::new("/bin/app", "App", "example.com").unwrap();
            let err = Bundler::select(&platform, request, collaborators(&fs))
                .err()
                .unwrap();
            assert!(matches!(err, Error::UnsupportedPlatform { .. }));
            assert!(err.to_string().contains(platform.name()));
        }
        assert!(fs.is_empty());
    }

    #[test]
    fn test_select_macos() {
        let fs = MemoryFs::new();
        let request = BundleRequest::new("/bin/app", "App", "example.com").unwrap();
        let bundler = Bundler::select(&Platform::from_os("darwin"), request, collaborators(&fs)).unwrap();
        assert_eq!(bundler.platform(), Platform::MacOs);
    }
}
