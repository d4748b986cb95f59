//! Platform identifiers and platform-specific bundlers.
//!
//! | Platform | Output | Module |
//! |----------|--------|--------|
//! | macOS | `.app` | [`macos`] |
//! | Windows | not implemented | |
//! | Linux | not implemented | |

pub mod macos;

use std::fmt;
use std::str::FromStr;

/// Operating system a bundle is built for.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Platform {
    /// macOS (`darwin`).
    MacOs,
    /// Windows.
    Windows,
    /// Linux.
    Linux,
    /// Anything else, by the name it was requested with.
    Other(String),
}

impl Platform {
    /// The platform this process runs on.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps an OS identifier (`std::env::consts::OS` style, or `darwin`).
    /// Matching is case-insensitive.
    pub fn from_os(os: &str) -> Self {
        match os.trim().to_ascii_lowercase().as_str() {
            "macos" | "darwin" | "osx" => Platform::MacOs,
            "windows" => Platform::Windows,
            "linux" => Platform::Linux,
            _ => Platform::Other(os.trim().to_string()),
        }
    }

    /// Short identifier used in messages and on the command line.
    pub fn name(&self) -> &str {
        match self {
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Other(name) => name,
        }
    }
}

impl FromStr for Platform {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_os(s))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
