//! Configuration structures for bundling operations.
//!
//! [`BundleRequest`] is what the caller asks for; [`BundleConfig`] is the
//! runtime document written into the bundle and read back by the wrapped
//! executable at launch.

use crate::bundler::error::{ErrorExt, Result};
use crate::bundler::utils::fs::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Name of the runtime configuration document inside `Contents/MacOS/`.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// What to do when icon acquisition or conversion fails.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum IconFailurePolicy {
    /// Record a diagnostic and produce the bundle without an icon.
    #[default]
    Warn,
    /// Abort the bundle operation with the icon error.
    Abort,
}

/// One bundle invocation's input.
///
/// Read-only for the lifetime of a bundle operation.
///
/// # Examples
///
/// ```
/// use nativefy::bundler::BundleRequest;
///
/// let request = BundleRequest::new("target/release/viewer", "Example", "example.com")?
///     .infer_icon(false)
///     .debug(true);
/// assert_eq!(request.url(), "https://www.example.com/");
/// # Ok::<(), nativefy::bundler::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct BundleRequest {
    target: PathBuf,
    title: String,
    url: url::Url,
    infer_icon: bool,
    debug: bool,
    icon_policy: IconFailurePolicy,
}

impl BundleRequest {
    /// Creates a request. `url` is normalized with [`normalize_url`].
    ///
    /// Icon inference is on by default.
    pub fn new(target: impl Into<PathBuf>, title: impl Into<String>, url: &str) -> Result<Self> {
        let title = title.into();
        validate_title(&title)?;
        Ok(Self {
            target: target.into(),
            title,
            url: normalize_url(url)?,
            infer_icon: true,
            debug: false,
            icon_policy: IconFailurePolicy::default(),
        })
    }

    /// Whether to fetch and convert the website's icon.
    pub fn infer_icon(mut self, infer: bool) -> Self {
        self.infer_icon = infer;
        self
    }

    /// Value of `Debug` in the bundled config document.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// How icon failures are treated.
    pub fn icon_policy(mut self, policy: IconFailurePolicy) -> Self {
        self.icon_policy = policy;
        self
    }

    /// Path to the source executable.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Display title; also the `.app` folder name.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Normalized target address.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Whether icon inference was requested.
    pub fn wants_icon(&self) -> bool {
        self.infer_icon
    }

    /// Debug flag for the config document.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Icon failure policy.
    pub fn policy(&self) -> IconFailurePolicy {
        self.icon_policy
    }

    /// Base name of the source executable, used as `CFBundleExecutable`.
    pub fn executable_name(&self) -> Result<String> {
        use crate::bundler::error::Context;
        self.target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", self.target.display()))
    }

    /// The config document for this request.
    pub fn config(&self) -> BundleConfig {
        BundleConfig {
            title: self.title.clone(),
            url: self.url().to_string(),
            debug: self.debug,
        }
    }
}

/// Runtime configuration written as `Contents/MacOS/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Window title.
    #[serde(rename = "Title")]
    pub title: String,
    /// Page to open.
    #[serde(rename = "URL")]
    pub url: String,
    /// Enables the web inspector in the launched app.
    #[serde(rename = "Debug", default)]
    pub debug: bool,
}

impl BundleConfig {
    /// Serializes to the JSON document stored in the bundle.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Reads a config document back through `fs`.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let data = fs.read(path).fs_context("reading config", path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

/// Checks that `title` can name the `.app` folder.
///
/// The title becomes a single path component under the destination, so it
/// must not be blank or contain path separators, and `"{title}.app"` must not
/// resolve to anything but a plain file name.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        crate::bail!("bundle title must not be empty");
    }
    if title.contains(['/', '\\']) || title == "." || title == ".." {
        crate::bail!("bundle title must not contain path separators: {}", title);
    }
    let folder = format!("{title}.app");
    let mut components = Path::new(&folder).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => crate::bail!("bundle title is not a valid folder name: {}", title),
    }
}

/// Turns a bare address into an absolute `https` URL.
///
/// Addresses already starting with `http` are kept; `www.` hosts get
/// `https://`; anything else gets `https://www.`.
pub fn normalize_url(address: &str) -> Result<url::Url> {
    let address = address.trim();
    let full = if address.starts_with("http") {
        address.to_string()
    } else if address.starts_with("www") {
        format!("https://{address}")
    } else {
        format!("https://www.{address}")
    };
    Ok(url::Url::parse(&full)?)
}
