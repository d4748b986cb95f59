//! HTTP utilities for fetching page resources.

use crate::bundler::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use std::time::Duration;

/// User agent sent with every request. Some sites refuse unknown clients.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Largest response body [`download`] accepts. Pages and icons are far smaller.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// A fetched HTTP resource.
#[derive(Debug, Clone)]
pub struct Download {
    /// Final URL after redirects.
    pub url: url::Url,
    /// `Content-Type` header value, without parameters, lowercased.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Bytes,
}

/// Builds the client used for page and icon downloads.
pub fn client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Downloads a URL, failing on non-success status codes.
pub async fn download(client: &reqwest::Client, url: &url::Url) -> Result<Download> {
    download_limited(client, url, MAX_BODY_BYTES).await
}

/// Like [`download`], but fails once the body exceeds `limit` bytes.
pub async fn download_limited(
    client: &reqwest::Client,
    url: &url::Url,
    limit: usize,
) -> Result<Download> {
    log::debug!("Downloading {}", url);

    let mut response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::GenericError(format!("Download of {} failed: {}", url, e)))?
        .error_for_status()?;

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(media_type);

    if response
        .content_length()
        .is_some_and(|length| length > limit as u64)
    {
        return Err(too_large(url, limit));
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| Error::GenericError(format!("Failed to read response: {}", e)))?
    {
        if body.len() + chunk.len() > limit {
            return Err(too_large(url, limit));
        }
        body.extend_from_slice(&chunk);
    }
    let body = body.freeze();

    Ok(Download {
        url: final_url,
        content_type,
        body,
    })
}

fn too_large(url: &url::Url, limit: usize) -> Error {
    Error::GenericError(format!("Response from {} exceeds {} bytes", url, limit))
}

/// Strips parameters from a `Content-Type` value: `"Image/PNG; q=1"` -> `"image/png"`.
pub fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and returns its URL.
    async fn serve_once(response: Vec<u8>) -> url::Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        });
        url::Url::parse(&format!("http://{}/favicon.ico", addr)).unwrap()
    }

    fn local_client() -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    fn response(headers: &str, body: &[u8]) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 200 OK\r\n{}Connection: close\r\n\r\n", headers).into_bytes();
        out.extend_from_slice(body);
        out
    }

    #[tokio::test]
    async fn test_download_within_limit() {
        let url = serve_once(response("Content-Type: image/png\r\nContent-Length: 4\r\n", b"\x89PNG")).await;
        let client = local_client();
        let download = download_limited(&client, &url, 16).await.unwrap();
        assert_eq!(&download.body[..], b"\x89PNG");
        assert_eq!(download.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_download_rejects_declared_oversize_body() {
        let body = vec![0u8; 64];
        let url = serve_once(response("Content-Length: 64\r\n", &body)).await;
        let client = local_client();
        let err = download_limited(&client, &url, 16).await.unwrap_err();
        assert!(err.to_string().contains("exceeds 16 bytes"));
    }

    #[tokio::test]
    async fn test_download_caps_undeclared_body() {
        let body = vec![0u8; 64];
        let url = serve_once(response("", &body)).await;
        let client = local_client();
        let err = download_limited(&client, &url, 16).await.unwrap_err();
        assert!(err.to_string().contains("exceeds 16 bytes"));
    }

    #[test]
    fn test_media_type_strips_parameters() {
        assert_eq!(media_type("text/html; charset=UTF-8"), "text/html");
        assert_eq!(media_type("Image/PNG"), "image/png");
        assert_eq!(media_type(""), "");
    }
}
