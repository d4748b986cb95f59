//! Icon sources: finding a website's icon.
//!
//! [`IconInferrer`] is the seam the bundler calls through. [`PageIconInferrer`]
//! is the default implementation: it reads the page's `<link rel="icon">`
//! declarations, falls back to the well-known `/favicon.ico` and
//! `/apple-touch-icon.png` locations, downloads every candidate and keeps the
//! one whose format ranks best in the caller's preference list.

use crate::bundler::error::Result;
use crate::bundler::resources::icons::Icon;
use crate::bundler::utils::http;
use regex::Regex;
use std::future::Future;
use std::time::Duration;

/// Formats asked for by the bundler, best first.
pub const PREFERRED_FORMATS: [&str; 3] = ["png", "jpg", "ico"];

/// Locations probed when the page declares nothing usable.
const FALLBACK_PATHS: [&str; 2] = ["/apple-touch-icon.png", "/favicon.ico"];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Retrieves a candidate icon for a URL.
pub trait IconInferrer: Send + Sync {
    /// Returns the best available icon whose format is in
    /// `preferred_formats` (earlier entries are better), or `None`.
    fn infer(
        &self,
        url: &str,
        preferred_formats: &[&str],
    ) -> impl Future<Output = Result<Option<Icon>>> + Send;
}

/// Scrapes icons from the live website over HTTP.
#[derive(Debug, Clone)]
pub struct PageIconInferrer {
    client: reqwest::Client,
    scanner: LinkScanner,
}

impl PageIconInferrer {
    /// Creates an inferrer with its own HTTP client.
    pub fn new() -> Result<Self> {
        Self::with_client(http::client(DEFAULT_TIMEOUT)?)
    }

    /// Creates an inferrer on top of an existing client.
    pub fn with_client(client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            client,
            scanner: LinkScanner::new()?,
        })
    }

    async fn candidates(&self, page: &url::Url) -> Vec<url::Url> {
        let mut candidates = match http::download(&self.client, page).await {
            Ok(download) => {
                let html = String::from_utf8_lossy(&download.body);
                self.scanner.icon_links(&html, &download.url)
            }
            Err(e) => {
                log::debug!("Could not fetch page {}: {}", page, e);
                Vec::new()
            }
        };
        for path in FALLBACK_PATHS {
            if let Ok(fallback) = page.join(path)
                && !candidates.contains(&fallback)
            {
                candidates.push(fallback);
            }
        }
        candidates
    }
}

impl IconInferrer for PageIconInferrer {
    async fn infer(&self, url: &str, preferred_formats: &[&str]) -> Result<Option<Icon>> {
        let page = url::Url::parse(url)?;
        let mut icons = Vec::new();

        for candidate in self.candidates(&page).await {
            let download = match http::download(&self.client, &candidate).await {
                Ok(download) => download,
                Err(e) => {
                    log::debug!("Skipping icon candidate {}: {}", candidate, e);
                    continue;
                }
            };
            match classify(&download.body, download.content_type.as_deref(), &download.url) {
                Some((ext, mime)) => {
                    log::debug!("Icon candidate {} ({}, {} bytes)", download.url, ext, download.body.len());
                    icons.push(Icon::new(download.url.as_str(), download.body, mime, ext));
                }
                None => log::debug!("Icon candidate {} is not a known image format", download.url),
            }
        }

        Ok(select_preferred(icons, preferred_formats))
    }
}

/// Compiled patterns for `<link>` tag scanning.
#[derive(Debug, Clone)]
struct LinkScanner {
    tag: Regex,
    rel: Regex,
    href: Regex,
}

impl LinkScanner {
    fn new() -> Result<Self> {
        Ok(Self {
            tag: Regex::new(r"(?is)<link\b[^>]*>")?,
            rel: Regex::new(r#"(?i)\brel\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)?,
            href: Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)?,
        })
    }

    /// Absolute URLs of every `<link>` whose `rel` mentions `icon`, in page order.
    fn icon_links(&self, html: &str, base: &url::Url) -> Vec<url::Url> {
        let mut links = Vec::new();
        for tag in self.tag.find_iter(html) {
            let tag = tag.as_str();
            let Some(rel) = attribute(&self.rel, tag) else {
                continue;
            };
            if !rel.to_ascii_lowercase().contains("icon") {
                continue;
            }
            let Some(href) = attribute(&self.href, tag) else {
                continue;
            };
            match base.join(href.trim()) {
                Ok(url) if !links.contains(&url) => links.push(url),
                Ok(_) => {}
                Err(e) => log::debug!("Ignoring icon link {:?}: {}", href, e),
            }
        }
        links
    }
}

fn attribute<'a>(pattern: &Regex, tag: &'a str) -> Option<&'a str> {
    let captures = pattern.captures(tag)?;
    (1..=3).find_map(|i| captures.get(i)).map(|m| m.as_str())
}

/// Determines `(extension, mime)` from content sniffing, then the
/// `Content-Type` header, then the URL's extension.
fn classify(
    body: &[u8],
    content_type: Option<&str>,
    url: &url::Url,
) -> Option<(&'static str, &'static str)> {
    if let Ok(format) = image::guess_format(body) {
        let sniffed = match format {
            image::ImageFormat::Png => Some(("png", "image/png")),
            image::ImageFormat::Jpeg => Some(("jpg", "image/jpeg")),
            image::ImageFormat::Ico => Some(("ico", "image/x-icon")),
            image::ImageFormat::Gif => Some(("gif", "image/gif")),
            image::ImageFormat::WebP => Some(("webp", "image/webp")),
            _ => None,
        };
        if sniffed.is_some() {
            return sniffed;
        }
    }

    let by_mime = content_type.and_then(|mime| match mime {
        "image/png" => Some(("png", "image/png")),
        "image/jpeg" | "image/jpg" => Some(("jpg", "image/jpeg")),
        "image/x-icon" | "image/vnd.microsoft.icon" | "image/ico" => Some(("ico", "image/x-icon")),
        "image/gif" => Some(("gif", "image/gif")),
        "image/svg+xml" => Some(("svg", "image/svg+xml")),
        "image/webp" => Some(("webp", "image/webp")),
        _ => None,
    });
    if by_mime.is_some() {
        return by_mime;
    }

    let ext = url.path().rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some(("png", "image/png")),
        "jpg" | "jpeg" => Some(("jpg", "image/jpeg")),
        "ico" => Some(("ico", "image/x-icon")),
        "gif" => Some(("gif", "image/gif")),
        "svg" => Some(("svg", "image/svg+xml")),
        "webp" => Some(("webp", "image/webp")),
        _ => None,
    }
}

/// Keeps the icon with the best-ranked format; larger payloads win ties.
fn select_preferred(icons: Vec<Icon>, preferred_formats: &[&str]) -> Option<Icon> {
    icons
        .into_iter()
        .filter_map(|icon| {
            preferred_formats
                .iter()
                .position(|format| *format == icon.ext)
                .map(|rank| (rank, icon))
        })
        .min_by(|(rank_a, a), (rank_b, b)| rank_a.cmp(rank_b).then(b.size.cmp(&a.size)))
        .map(|(_, icon)| icon)
}
