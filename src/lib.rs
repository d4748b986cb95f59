//! # nativefy
//!
//! Wraps a website into a native desktop application bundle.
//!
//! Given a web-viewer executable, a title and a URL, nativefy writes a
//! self-contained macOS `.app` directory: the executable, the config document
//! it reads at launch, the site's icon converted to `.icns`, and an
//! `Info.plist` manifest.
//!
//! ## Features
//!
//! - **Icon inference**: scrapes `<link rel="icon">` declarations and
//!   well-known favicon locations, keeping the best format
//! - **Host independent**: the built-in `.icns` encoder lets Linux and Windows
//!   hosts produce macOS bundles; `iconutil` is optional
//! - **Non-fatal icons**: icon failures become diagnostics unless strict mode
//!   is on
//! - **Cancellable**: every stage honours a cancellation token
//!
//! ## Usage
//!
//! ```bash
//! nativefy --title Example example.com
//! nativefy -t Docs https://docs.rs --output ~/Applications --strict-icon
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bundler;
pub mod cli;
pub mod error;

pub use bundler::{BundleRequest, BundledApp, Bundler, Collaborators, Platform};
pub use cli::Args;
pub use error::{CliError, NativefyError, Result};
