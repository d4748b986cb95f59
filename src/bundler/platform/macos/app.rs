//! macOS application bundle (.app) creation.
//!
//! Produces this layout under the destination directory:
//!
//! ```text
//! <Title>.app/
//!   Contents/
//!     Info.plist
//!     MacOS/
//!       <executable>        mode 0755
//!       config.json
//!     Resources/
//!       icon.icns           only when an icon was produced
//! ```
//!
//! Stages run in order: directories, executable, config, icon, manifest.
//! The manifest goes last so it can reference the icon only when one exists.

use super::icon::{IconPacker, convert_icon};
use super::manifest::{INFO_PLIST_FILE_NAME, ManifestFields, ManifestRenderer};
use crate::bundler::builder::Collaborators;
use crate::bundler::diagnostics::{Diagnostic, DiagnosticSink, Stage};
use crate::bundler::error::{Context, Error, ErrorExt, IconError, Result};
use crate::bundler::resources::favicon::{IconInferrer, PREFERRED_FORMATS};
use crate::bundler::resources::icons::Icon;
use crate::bundler::settings::{BundleRequest, CONFIG_FILE_NAME, IconFailurePolicy};
use crate::bundler::utils::fs::{EXECUTABLE_MODE, FILE_MODE, FileSystem};
use crate::bundler::BundledApp;
use sha2::{Digest, Sha256};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// File name of the converted icon inside `Contents/Resources/`.
pub const ICON_FILE_NAME: &str = "icon.icns";

/// Paths of one `.app` bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayout {
    /// `<dest>/<Title>.app`
    pub app: PathBuf,
    /// `Contents/`
    pub contents: PathBuf,
    /// `Contents/MacOS/`
    pub macos: PathBuf,
    /// `Contents/Resources/`
    pub resources: PathBuf,
}

impl AppLayout {
    /// Layout for an app titled `title` under `dest`.
    pub fn new(dest: &Path, title: &str) -> Self {
        let app = dest.join(format!("{}.app", title));
        let contents = app.join("Contents");
        Self {
            macos: contents.join("MacOS"),
            resources: contents.join("Resources"),
            contents,
            app,
        }
    }
}

/// Copies everything written through it into a SHA-256 digest.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Builds `.app` bundles for one request.
pub struct MacOsBundler<I, P> {
    request: BundleRequest,
    executable_name: String,
    fs: Arc<dyn FileSystem>,
    diagnostics: Arc<dyn DiagnosticSink>,
    inferrer: Option<I>,
    packer: P,
    manifest: ManifestRenderer,
}

impl<I: IconInferrer, P: IconPacker> MacOsBundler<I, P> {
    /// Creates a bundler. Fails when the target path has no file name.
    pub fn new(request: BundleRequest, collaborators: Collaborators<I, P>) -> Result<Self> {
        let executable_name = request.executable_name()?;
        Ok(Self {
            request,
            executable_name,
            fs: collaborators.fs,
            diagnostics: collaborators.diagnostics,
            inferrer: collaborators.inferrer,
            packer: collaborators.packer,
            manifest: ManifestRenderer::new()?,
        })
    }

    /// Assembles `<dest>/<Title>.app`.
    ///
    /// Re-running over an existing bundle overwrites every file it writes.
    /// An icon left by an earlier run is removed when this run produces none.
    pub async fn bundle(&self, dest: &Path, cancel: &CancellationToken) -> Result<BundledApp> {
        ensure_active(cancel)?;
        let layout = AppLayout::new(dest, self.request.title());
        log::info!("Bundling {} at {}", self.request.title(), layout.app.display());

        self.create_directories(&layout)?;

        ensure_active(cancel)?;
        let executable = layout.macos.join(&self.executable_name);
        let executable_sha256 = self
            .copy_executable(&executable)
            .with_context(|| format!("failed to copy {} into bundle", self.request.target().display()))?;

        ensure_active(cancel)?;
        let config = layout.macos.join(CONFIG_FILE_NAME);
        self.write_config(&config).context("failed to write config")?;

        let icon = if self.request.wants_icon() {
            self.create_icon(&layout.resources, cancel).await?
        } else {
            log::debug!("Icon inference disabled");
            None
        };
        if icon.is_none() {
            self.remove_stale_icon(&layout.resources.join(ICON_FILE_NAME))?;
        }

        ensure_active(cancel)?;
        let manifest = layout.contents.join(INFO_PLIST_FILE_NAME);
        self.write_manifest(&manifest, icon.is_some())
            .context("failed to write Info.plist")?;

        log::info!("Finished {}", layout.app.display());
        Ok(BundledApp {
            path: layout.app,
            executable,
            config,
            manifest,
            icon,
            executable_sha256,
        })
    }

    fn create_directories(&self, layout: &AppLayout) -> Result<()> {
        for dir in [&layout.macos, &layout.resources] {
            self.fs
                .create_dir_all(dir)
                .fs_context("failed to create bundle directory", dir)?;
        }
        Ok(())
    }

    /// Streams the source executable into the bundle; returns its hex SHA-256.
    fn copy_executable(&self, dest: &Path) -> Result<String> {
        let source = self.request.target();
        log::debug!("Copying {} to {}", source.display(), dest.display());
        let mut reader = self
            .fs
            .open(source)
            .fs_context("failed to open executable", source)?;
        let writer = self
            .fs
            .create(dest, EXECUTABLE_MODE)
            .fs_context("failed to create executable", dest)?;
        let mut hashing = HashingWriter {
            inner: writer,
            hasher: Sha256::new(),
        };
        io::copy(&mut reader, &mut hashing).fs_context("failed to copy executable", dest)?;
        hashing.flush().fs_context("failed to flush executable", dest)?;
        Ok(hex::encode(hashing.hasher.finalize()))
    }

    fn remove_stale_icon(&self, path: &Path) -> Result<()> {
        if !self.fs.exists(path) {
            return Ok(());
        }
        log::debug!("Removing stale {}", path.display());
        self.fs
            .remove_file(path)
            .fs_context("failed to remove stale icon", path)
    }

    fn write_config(&self, path: &Path) -> Result<()> {
        let data = self.request.config().to_json()?;
        self.fs
            .write(path, &data, FILE_MODE)
            .fs_context("failed to write config", path)
    }

    fn write_manifest(&self, path: &Path, has_icon: bool) -> Result<()> {
        let fields = ManifestFields::new(
            self.executable_name.as_str(),
            self.request.title(),
            has_icon.then_some(ICON_FILE_NAME),
        );
        let data = self.manifest.render(&fields)?;
        self.fs
            .write(path, &data, FILE_MODE)
            .fs_context("failed to write manifest", path)
    }

    /// Infers, converts and writes the icon. Returns the icon path, or
    /// `None` when a failure was downgraded to a diagnostic.
    async fn create_icon(
        &self,
        resources: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>> {
        let icon = match self.infer_icon(cancel).await {
            Ok(icon) => icon,
            Err(e) => return self.icon_failure(Stage::IconInference, e),
        };

        ensure_active(cancel)?;
        let converted = match convert_icon(&icon, &self.packer, cancel).await {
            Ok(converted) => converted,
            Err(e) => return self.icon_failure(Stage::IconConversion, e),
        };

        ensure_active(cancel)?;
        let path = resources.join(ICON_FILE_NAME);
        match self
            .fs
            .write(&path, &converted.data, FILE_MODE)
            .fs_context("failed to write icon", &path)
        {
            Ok(()) => {
                log::debug!("Wrote {} ({} bytes)", path.display(), converted.size);
                Ok(Some(path))
            }
            Err(e) => self.icon_failure(Stage::IconWrite, e),
        }
    }

    async fn infer_icon(&self, cancel: &CancellationToken) -> Result<Icon> {
        let Some(inferrer) = &self.inferrer else {
            return Err(IconError::NoInferrer.into());
        };
        let url = self.request.url();
        log::debug!("Inferring icon for {}", url);

        let found = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            found = inferrer.infer(url, &PREFERRED_FORMATS) => found,
        };

        match found {
            Ok(Some(icon)) => {
                log::debug!("Using icon from {} ({}, {} bytes)", icon.source, icon.ext, icon.size);
                Ok(icon)
            }
            Ok(None) => Err(IconError::NotFound { url: url.to_string() }.into()),
            Err(e) if e.is_cancelled() || e.is_icon_pipeline() => Err(e),
            Err(e) => Err(IconError::Inference(e.to_string()).into()),
        }
    }

    fn icon_failure(&self, stage: Stage, error: Error) -> Result<Option<PathBuf>> {
        if error.is_cancelled() {
            return Err(error);
        }
        match self.request.policy() {
            IconFailurePolicy::Abort => Err(Error::Context(stage.to_string(), Box::new(error))),
            IconFailurePolicy::Warn => {
                self.diagnostics.record(Diagnostic {
                    stage,
                    message: error.to_string(),
                });
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = AppLayout::new(Path::new("/out"), "My Site");
        assert_eq!(layout.app, Path::new("/out/My Site.app"));
        assert_eq!(layout.contents, Path::new("/out/My Site.app/Contents"));
        assert_eq!(layout.macos, Path::new("/out/My Site.app/Contents/MacOS"));
        assert_eq!(layout.resources, Path::new("/out/My Site.app/Contents/Resources"));
    }

    #[test]
    fn test_hashing_writer_digest() {
        let mut writer = HashingWriter {
            inner: Vec::new(),
            hasher: Sha256::new(),
        };
        writer.write_all(b"abc").unwrap();
        assert_eq!(writer.inner, b"abc");
        assert_eq!(
            hex::encode(writer.hasher.finalize()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
