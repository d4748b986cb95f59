//! ICNS icon creation for macOS application bundles.
//!
//! [`convert_icon`] turns any decodable candidate image into a packed `.icns`
//! container: decode, crop to a centered square, snap to the nearest iconset
//! size, resample, stage as `icon.iconset/icon_<n>x<n>[@2x].png` in a fresh
//! temporary directory, then hand the iconset to an [`IconPacker`].

use crate::bundler::error::{Error, ErrorExt, IconError, Result};
use crate::bundler::resources::icons::{self, ICONSET_SIZES, Icon, IconsetEntry, nearest_size};
use icns::{IconFamily, IconType, Image as IcnsImage};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::task;
use tokio_util::sync::CancellationToken;

/// MIME type of packed icon containers.
pub const ICNS_MIME: &str = "image/icns";

/// Source marker of converted icons.
pub const CONVERTED_SOURCE: &str = "converted";

/// Packs a directory of iconset PNGs into one `.icns` file.
pub trait IconPacker: Send + Sync {
    /// Short tool name used in error messages.
    fn name(&self) -> &'static str;

    /// Reads `icon_<n>x<n>[@2x].png` files from `iconset` and writes the
    /// container to `output`. Failures carry the tool's diagnostics in
    /// [`IconError::Conversion`].
    fn pack(&self, iconset: &Path, output: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// In-process ICNS encoder. Works on any host.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcnsPacker;

/// Delegates to Apple's `iconutil` (macOS hosts only).
#[derive(Debug, Clone, Default)]
pub struct IconutilPacker {
    program: Option<PathBuf>,
}

impl IconutilPacker {
    /// Uses the `iconutil` found on `PATH` at pack time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific `iconutil` binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }
}

/// Packer selected at runtime.
#[derive(Debug, Clone)]
pub enum Packer {
    /// See [`IcnsPacker`].
    Icns(IcnsPacker),
    /// See [`IconutilPacker`].
    Iconutil(IconutilPacker),
}

impl Default for Packer {
    fn default() -> Self {
        Packer::Icns(IcnsPacker)
    }
}

impl IconPacker for Packer {
    fn name(&self) -> &'static str {
        match self {
            Packer::Icns(packer) => packer.name(),
            Packer::Iconutil(packer) => packer.name(),
        }
    }

    async fn pack(&self, iconset: &Path, output: &Path) -> Result<()> {
        match self {
            Packer::Icns(packer) => packer.pack(iconset, output).await,
            Packer::Iconutil(packer) => packer.pack(iconset, output).await,
        }
    }
}

/// Maps an iconset entry onto its ICNS slot.
fn icon_type_for(entry: &IconsetEntry) -> Option<IconType> {
    let icon_type = match (entry.nominal, entry.retina) {
        (16, false) => IconType::RGBA32_16x16,
        (16, true) => IconType::RGBA32_16x16_2x,
        (32, false) => IconType::RGBA32_32x32,
        (32, true) => IconType::RGBA32_32x32_2x,
        (64, false) => IconType::RGBA32_64x64,
        (128, false) => IconType::RGBA32_128x128,
        (128, true) => IconType::RGBA32_128x128_2x,
        (256, false) => IconType::RGBA32_256x256,
        (256, true) => IconType::RGBA32_256x256_2x,
        (512, false) => IconType::RGBA32_512x512,
        (512, true) => IconType::RGBA32_512x512_2x,
        _ => return None,
    };
    Some(icon_type)
}

fn icns_failure(reason: impl std::fmt::Display) -> Error {
    IconError::Conversion {
        tool: "icns".into(),
        output: reason.to_string(),
    }
    .into()
}

impl IconPacker for IcnsPacker {
    fn name(&self) -> &'static str {
        "icns"
    }

    async fn pack(&self, iconset: &Path, output: &Path) -> Result<()> {
        let iconset = iconset.to_path_buf();
        let output = output.to_path_buf();

        // PNG decoding and ICNS encoding are CPU-bound
        task::spawn_blocking(move || -> Result<()> {
            let mut family = IconFamily::new();
            let mut entries = std::fs::read_dir(&iconset)
                .fs_context("reading iconset", &iconset)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::io::Result<Vec<_>>>()
                .fs_context("reading iconset", &iconset)?;
            entries.sort();

            for path in entries {
                let Some(entry) = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(IconsetEntry::parse)
                else {
                    log::debug!("Ignoring {} in iconset", path.display());
                    continue;
                };
                let icon_type = icon_type_for(&entry).ok_or_else(|| {
                    icns_failure(format!("no ICNS slot for {}", entry.file_name()))
                })?;

                let file = std::fs::File::open(&path).fs_context("opening iconset image", &path)?;
                let image = IcnsImage::read_png(std::io::BufReader::new(file))
                    .map_err(|e| icns_failure(format!("reading {}: {}", entry.file_name(), e)))?;
                family
                    .add_icon_with_type(&image, icon_type)
                    .map_err(|e| icns_failure(format!("adding {}: {}", entry.file_name(), e)))?;
                log::debug!("Added {} to icon family", entry.file_name());
            }

            if family.elements.is_empty() {
                return Err(icns_failure(format!(
                    "{} contains no iconset images",
                    iconset.display()
                )));
            }

            let file = std::fs::File::create(&output).fs_context("creating ICNS output file", &output)?;
            family
                .write(std::io::BufWriter::new(file))
                .map_err(|e| icns_failure(format!("writing ICNS data: {}", e)))?;
            Ok(())
        })
        .await
        .map_err(|e| Error::GenericError(format!("ICNS encoding task failed: {}", e)))?
    }
}

impl IconPacker for IconutilPacker {
    fn name(&self) -> &'static str {
        "iconutil"
    }

    async fn pack(&self, iconset: &Path, output: &Path) -> Result<()> {
        let program = match &self.program {
            Some(program) => program.clone(),
            None => which::which("iconutil").map_err(|e| IconError::Conversion {
                tool: "iconutil".into(),
                output: format!("iconutil not found in PATH: {}", e),
            })?,
        };

        let mut command = tokio::process::Command::new(&program);
        command.arg("-c").arg("icns").arg(iconset).arg("-o").arg(output);
        log::debug!("Running {:?}", command.as_std());

        let result = command.output().await.map_err(|error| Error::CommandFailed {
            command: program.display().to_string(),
            error,
        })?;

        if !result.status.success() {
            let mut captured = String::from_utf8_lossy(&result.stdout).into_owned();
            captured.push_str(&String::from_utf8_lossy(&result.stderr));
            return Err(IconError::Conversion {
                tool: "iconutil".into(),
                output: format!("{} (exit status {}): {}", program.display(), result.status, captured.trim()),
            }
            .into());
        }
        Ok(())
    }
}

/// Decodes, squares, snaps and resamples the candidate; returns the iconset
/// entry and its PNG bytes.
fn prepare_iconset_image(icon: &Icon) -> std::result::Result<(IconsetEntry, Vec<u8>), IconError> {
    let original = icons::decode(icon)?;
    let square = icons::crop_to_square(&original);
    let biggest = square.width().max(square.height());
    let pixels = nearest_size(&ICONSET_SIZES, biggest).unwrap_or(ICONSET_SIZES[0]);
    let entry = IconsetEntry::for_pixels(pixels);
    log::debug!("Icon is {}px, using {}", biggest, entry.file_name());
    let resized = icons::resample(&square, pixels)?;
    Ok((entry, icons::encode_png(&resized)?))
}

/// Converts a candidate image into a packed `.icns` icon.
///
/// Each call stages its iconset in a uniquely named temporary directory, so
/// concurrent conversions never collide. The directory is removed on return.
pub async fn convert_icon<P: IconPacker>(
    icon: &Icon,
    packer: &P,
    cancel: &CancellationToken,
) -> Result<Icon> {
    let candidate = icon.clone();
    let (entry, png) = task::spawn_blocking(move || prepare_iconset_image(&candidate))
        .await
        .map_err(|e| Error::GenericError(format!("icon preparation task failed: {}", e)))??;

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let staging = tempfile::Builder::new()
        .prefix("nativefy-icon-")
        .tempdir()
        .fs_context("creating iconset staging directory", std::env::temp_dir())?;
    let iconset = staging.path().join("icon.iconset");
    tokio::fs::create_dir_all(&iconset)
        .await
        .fs_context("creating iconset directory", &iconset)?;
    let image_path = iconset.join(entry.file_name());
    tokio::fs::write(&image_path, png)
        .await
        .fs_context("writing iconset image", &image_path)?;

    let output = staging.path().join("icon.icns");
    log::debug!("Packing {} with {}", iconset.display(), packer.name());
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        packed = packer.pack(&iconset, &output) => packed?,
    }

    let data = tokio::fs::read(&output)
        .await
        .fs_context("reading packed icon", &output)?;
    log::debug!("Icon converted ({} bytes)", data.len());
    Ok(Icon::new(CONVERTED_SOURCE, data, ICNS_MIME, "icns"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_icon(width: u32, height: u32) -> Icon {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([20, 120, 220, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        Icon::new("https://example.com/icon.png", buf, "image/png", "png")
    }

    /// Records the iconset it was handed and writes a fake container.
    #[derive(Default)]
    struct RecordingPacker {
        seen: std::sync::Mutex<Vec<String>>,
    }

    impl IconPacker for RecordingPacker {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn pack(&self, iconset: &Path, output: &Path) -> Result<()> {
            let mut names: Vec<String> = std::fs::read_dir(iconset)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            self.seen.lock().unwrap().extend(names);
            std::fs::write(output, b"icns-fake").unwrap();
            Ok(())
        }
    }

    struct FailingPacker;

    impl IconPacker for FailingPacker {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn pack(&self, _iconset: &Path, _output: &Path) -> Result<()> {
            Err(IconError::Conversion {
                tool: "iconutil".into(),
                output: "icon.iconset:Failed to generate ICNS.".into(),
            }
            .into())
        }
    }

    #[test]
    fn test_prepare_snaps_to_nearest_size() {
        let (entry, png) = prepare_iconset_image(&png_icon(130, 200)).unwrap();
        assert_eq!(entry, IconsetEntry::for_pixels(128));
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (128, 128));
    }

    #[test]
    fn test_prepare_large_icon_is_retina() {
        let (entry, png) = prepare_iconset_image(&png_icon(900, 900)).unwrap();
        assert!(entry.retina);
        assert_eq!(entry.file_name(), "icon_512x512@2x.png");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 1024);
    }

    #[tokio::test]
    async fn test_convert_stages_single_named_image() {
        let packer = RecordingPacker::default();
        let converted = convert_icon(&png_icon(40, 30), &packer, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*packer.seen.lock().unwrap(), vec!["icon_32x32.png".to_string()]);
        assert_eq!(converted.source, CONVERTED_SOURCE);
        assert_eq!(converted.mime, ICNS_MIME);
        assert_eq!(converted.ext, "icns");
        assert_eq!(converted.size, 9);
        assert_eq!(&converted.data[..], b"icns-fake");
    }

    #[tokio::test]
    async fn test_convert_with_icns_packer() {
        let converted = convert_icon(&png_icon(16, 16), &IcnsPacker, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(&converted.data[..4], b"icns");
        let family = IconFamily::read(Cursor::new(&converted.data[..])).unwrap();
        assert!(family.has_icon_with_type(IconType::RGBA32_16x16));
    }

    #[tokio::test]
    async fn test_convert_surfaces_packer_output() {
        let err = convert_icon(&png_icon(16, 16), &FailingPacker, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_icon_pipeline());
        assert!(err.to_string().contains("Failed to generate ICNS"));
    }

    #[tokio::test]
    async fn test_convert_decode_error() {
        let icon = Icon::new("https://example.com/x.png", &b"<html>"[..], "image/png", "png");
        let err = convert_icon(&icon, &IcnsPacker, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Icon(IconError::Decode(_))));
    }

    #[tokio::test]
    async fn test_convert_honours_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = convert_icon(&png_icon(16, 16), &IcnsPacker, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_icns_packer_rejects_empty_iconset() {
        let dir = tempfile::tempdir().unwrap();
        let err = IcnsPacker
            .pack(dir.path(), &dir.path().join("out.icns"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no iconset images"));
    }

    #[tokio::test]
    async fn test_iconutil_missing_binary_is_conversion_error() {
        let packer = IconutilPacker::with_program("/nonexistent/iconutil");
        let dir = tempfile::tempdir().unwrap();
        let err = packer
            .pack(dir.path(), &dir.path().join("out.icns"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }
}
