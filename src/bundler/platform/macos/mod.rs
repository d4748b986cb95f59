//! macOS application bundles.
//!
//! - [`app`]: bundle assembly
//! - [`icon`]: image to `.icns` conversion and the packer backends
//! - [`manifest`]: `Info.plist` rendering
//!
//! Nothing here shells out unless [`icon::IconutilPacker`] is selected, so
//! bundles can be assembled on any host.

pub mod app;
pub mod icon;
pub mod manifest;
