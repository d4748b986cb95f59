//! Filesystem and HTTP helpers shared by the bundler.

pub mod fs;
pub mod http;
