//! Command line argument parsing and validation.

use crate::bundler::{
    IcnsPacker, IconFailurePolicy, IconutilPacker, Packer, Platform, validate_title,
};
use crate::error::CliError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Wrap a website into a native application bundle
#[derive(Parser, Debug)]
#[command(
    name = "nativefy",
    version,
    about = "Wrap a website into a native application bundle",
    long_about = "Create a macOS .app bundle that opens a website in a native window.

Usage:
  nativefy --title Example example.com
  nativefy -t Docs https://docs.rs -o ~/Applications --strict-icon"
)]
pub struct Args {
    /// Website address; bare host names get https://www. prepended
    #[arg(index = 1, value_name = "URL")]
    pub url: String,

    /// Application title, also the .app folder name
    #[arg(short, long)]
    pub title: String,

    /// Directory the bundle is written to
    #[arg(short, long, env = "NATIVEFY_OUTPUT", default_value = "dist")]
    pub output: PathBuf,

    /// Viewer executable to wrap (defaults to this program)
    #[arg(long, value_name = "PATH")]
    pub binary: Option<PathBuf>,

    /// Skip icon inference
    #[arg(long)]
    pub no_icon: bool,

    /// Enable the web inspector in the bundled app
    #[arg(long)]
    pub debug: bool,

    /// Target platform (defaults to the host)
    #[arg(long, value_name = "OS")]
    pub platform: Option<String>,

    /// Tool used to pack the icon
    #[arg(long, value_enum, default_value_t = PackerKind::Icns)]
    pub packer: PackerKind,

    /// Fail the bundle when the icon cannot be produced
    #[arg(long)]
    pub strict_icon: bool,

    /// Show debug output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// `.icns` packer selectable on the command line
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PackerKind {
    /// Built-in encoder, works on any host
    Icns,
    /// Apple's iconutil (macOS only)
    Iconutil,
}

impl PackerKind {
    /// The packer this choice stands for
    pub fn packer(self) -> Packer {
        match self {
            PackerKind::Icns => Packer::Icns(IcnsPacker),
            PackerKind::Iconutil => Packer::Iconutil(IconutilPacker::new()),
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), CliError> {
        if self.url.trim().is_empty() {
            return Err(CliError::InvalidArguments {
                reason: "URL must not be empty".to_string(),
            });
        }
        validate_title(&self.title).map_err(|e| CliError::InvalidArguments {
            reason: format!("--title: {}", e),
        })
    }

    /// Platform to bundle for
    pub fn target_platform(&self) -> Platform {
        self.platform
            .as_deref()
            .map(Platform::from_os)
            .unwrap_or_else(Platform::current)
    }

    /// Icon failure policy selected by `--strict-icon`
    pub fn icon_policy(&self) -> IconFailurePolicy {
        if self.strict_icon {
            IconFailurePolicy::Abort
        } else {
            IconFailurePolicy::Warn
        }
    }

    /// Default log filter for the verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}
