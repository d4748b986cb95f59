//! Icon sources and raster helpers.

pub mod favicon;
pub mod icons;
