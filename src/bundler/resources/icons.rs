//! Icon values and raster helpers shared by the icon pipeline.
//!
//! # Icon Selection Algorithm
//!
//! A decoded candidate is cropped to a centered square, then mapped onto the
//! nearest entry of [`ICONSET_SIZES`] by absolute pixel distance. Ties go to
//! the smaller size. The largest size (1024) is emitted as the `@2x`
//! variant of 512, matching the iconset naming scheme:
//!
//! | Selected | File name |
//! |----------|-----------|
//! | 16 | `icon_16x16.png` |
//! | 128 | `icon_128x128.png` |
//! | 1024 | `icon_512x512@2x.png` |

use crate::bundler::error::IconError;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage, imageops::FilterType};
use std::io::Cursor;

/// Square pixel sizes an iconset may carry, strictly ascending.
pub const ICONSET_SIZES: [u32; 6] = [16, 32, 128, 256, 512, 1024];

/// Pixel size that is stored as a double-density variant of half its size.
const RETINA_PIXELS: u32 = 1024;

/// An icon payload with its metadata.
///
/// Never mutated: conversion produces a new `Icon`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    /// Origin, e.g. the URL it was downloaded from, or `"converted"`.
    pub source: String,
    /// Raw bytes.
    pub data: Bytes,
    /// MIME type, e.g. `image/png`.
    pub mime: String,
    /// File extension without the dot, e.g. `png`.
    pub ext: String,
    /// Byte length of `data`.
    pub size: usize,
}

impl Icon {
    /// Creates an icon; `size` is taken from `data`.
    pub fn new(
        source: impl Into<String>,
        data: impl Into<Bytes>,
        mime: impl Into<String>,
        ext: impl Into<String>,
    ) -> Self {
        let data = data.into();
        Self {
            source: source.into(),
            size: data.len(),
            data,
            mime: mime.into(),
            ext: ext.into(),
        }
    }
}

/// Picks the entry of `sizes` closest to `biggest`.
///
/// Walks `sizes` in order and only replaces the running best on a strictly
/// smaller distance, so the earlier entry wins a tie. Returns `None` for an
/// empty table.
pub fn nearest_size(sizes: &[u32], biggest: u32) -> Option<u32> {
    let mut best: Option<(u32, u32)> = None;
    for &size in sizes {
        let distance = size.abs_diff(biggest);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((size, distance)),
        }
    }
    best.map(|(size, _)| size)
}

/// One image inside an iconset directory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IconsetEntry {
    /// Actual pixel dimensions.
    pub pixels: u32,
    /// Size in the file name.
    pub nominal: u32,
    /// Whether this is the `@2x` variant of `nominal`.
    pub retina: bool,
}

impl IconsetEntry {
    /// Entry for an image of `pixels` x `pixels`.
    pub fn for_pixels(pixels: u32) -> Self {
        if pixels == RETINA_PIXELS {
            Self {
                pixels,
                nominal: pixels / 2,
                retina: true,
            }
        } else {
            Self {
                pixels,
                nominal: pixels,
                retina: false,
            }
        }
    }

    /// `icon_<n>x<n>[@2x].png`
    pub fn file_name(&self) -> String {
        let scale = if self.retina { "@2x" } else { "" };
        format!("icon_{0}x{0}{1}.png", self.nominal, scale)
    }

    /// Parses a name produced by [`file_name`](Self::file_name).
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_prefix("icon_")?.strip_suffix(".png")?;
        let (dims, retina) = match stem.strip_suffix("@2x") {
            Some(dims) => (dims, true),
            None => (stem, false),
        };
        let (width, height) = dims.split_once('x')?;
        let nominal: u32 = width.parse().ok()?;
        if height.parse::<u32>().ok()? != nominal || nominal == 0 {
            return None;
        }
        Some(Self {
            pixels: if retina { nominal * 2 } else { nominal },
            nominal,
            retina,
        })
    }
}

/// Decodes the icon's bytes into a raster image.
pub fn decode(icon: &Icon) -> Result<DynamicImage, IconError> {
    let img = image::load_from_memory(&icon.data).map_err(IconError::Decode)?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(IconError::EmptyImage { width, height });
    }
    log::debug!("Decoded {}x{} icon from {}", width, height, icon.source);
    Ok(img)
}

/// Crops the image to a square around its center, dropping the excess of
/// the longer side. Never stretches.
pub fn crop_to_square(img: &DynamicImage) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width == height {
        return img.clone();
    }
    let side = width.min(height);
    img.crop_imm((width - side) / 2, (height - side) / 2, side, side)
}

/// Resizes to exactly `size` x `size` with a bicubic (Catmull-Rom) filter.
pub fn resample(img: &DynamicImage, size: u32) -> Result<RgbaImage, IconError> {
    if size == 0 {
        return Err(IconError::Resample {
            size,
            reason: "target size is zero".into(),
        });
    }
    Ok(img
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgba8())
}

/// Encodes an RGBA raster as PNG.
pub fn encode_png(rgba: &RgbaImage) -> Result<Vec<u8>, IconError> {
    let mut buffer = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| IconError::Resample {
            size: rgba.width(),
            reason: format!("encoding PNG: {e}"),
        })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_size_prefers_closest() {
        assert_eq!(nearest_size(&ICONSET_SIZES, 130), Some(128));
        assert_eq!(nearest_size(&ICONSET_SIZES, 900), Some(1024));
        assert_eq!(nearest_size(&ICONSET_SIZES, 1), Some(16));
        assert_eq!(nearest_size(&ICONSET_SIZES, 5000), Some(1024));
    }

    #[test]
    fn test_nearest_size_tie_goes_to_smaller() {
        assert_eq!(nearest_size(&[100, 200], 150), Some(100));
        // 384 is 128 away from both 256 and 512.
        assert_eq!(nearest_size(&ICONSET_SIZES, 384), Some(256));
    }

    #[test]
    fn test_nearest_size_empty_table() {
        assert_eq!(nearest_size(&[], 64), None);
    }

    #[test]
    fn test_iconset_sizes_strictly_ascending() {
        assert!(ICONSET_SIZES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_iconset_entry_naming() {
        assert_eq!(IconsetEntry::for_pixels(128).file_name(), "icon_128x128.png");
        let retina = IconsetEntry::for_pixels(1024);
        assert!(retina.retina);
        assert_eq!(retina.nominal, 512);
        assert_eq!(retina.file_name(), "icon_512x512@2x.png");
    }

    #[test]
    fn test_iconset_entry_parse() {
        assert_eq!(
            IconsetEntry::parse("icon_512x512@2x.png"),
            Some(IconsetEntry::for_pixels(1024))
        );
        assert_eq!(IconsetEntry::parse("icon_16x16.png"), Some(IconsetEntry::for_pixels(16)));
        assert_eq!(IconsetEntry::parse("icon_16x32.png"), None);
        assert_eq!(IconsetEntry::parse("icon.png"), None);
        assert_eq!(IconsetEntry::parse(".DS_Store"), None);
    }

    #[test]
    fn test_crop_to_square_centers() {
        let mut img = RgbaImage::new(30, 10);
        // mark the middle column band red
        for y in 0..10 {
            for x in 10..20 {
                img.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
            }
        }
        let cropped = crop_to_square(&DynamicImage::ImageRgba8(img));
        assert_eq!(cropped.dimensions(), (10, 10));
        assert!(
            cropped
                .to_rgba8()
                .pixels()
                .all(|p| *p == image::Rgba([255, 0, 0, 255]))
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let icon = Icon::new("test", &b"not an image"[..], "image/png", "png");
        assert!(matches!(decode(&icon), Err(IconError::Decode(_))));
    }

    #[test]
    fn test_resample_and_encode() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(40, 40));
        let rgba = resample(&img, 32).unwrap();
        assert_eq!(rgba.dimensions(), (32, 32));
        let png = encode_png(&rgba).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        assert!(matches!(resample(&img, 0), Err(IconError::Resample { .. })));
    }
}
