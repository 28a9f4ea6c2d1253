//! HTTP access to the WeChat endpoints.
//!
//! Three calls, each a single request with its own timeout and no retry:
//!
//! | Call | Endpoint | Success field |
//! |------|----------|---------------|
//! | [`WeChatClient::fetch_token`] | `GET {base}/token` | `access_token` |
//! | [`WeChatClient::upload_image`] | `POST {base}/media/uploadimg` (multipart `media`) | `url` |
//! | [`WeChatClient::download_external`] | arbitrary image URL | response body |
//!
//! The endpoints answer HTTP 200 with `{"errcode": …, "errmsg": …}` on
//! failure; those codes are surfaced verbatim in [`PressError::Provider`].

use crate::config::{Credentials, PressConfig};
use crate::error::{PressError, NETWORK_ERROR_CODE};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Browser-like agent; some image CDNs refuse unknown clients.
const DOWNLOAD_USER_AGENT: &str = "Mozilla/5.0";

/// A freshly issued token and its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: u64,
}

/// Both endpoints share this envelope: success fields or an error pair.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    url: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

impl ApiResponse {
    fn into_error(self, default_message: &str) -> PressError {
        PressError::Provider {
            code: self.errcode.unwrap_or(NETWORK_ERROR_CODE),
            message: self.errmsg.unwrap_or_else(|| default_message.to_string()),
        }
    }
}

/// Client for the token, upload and download calls.
#[derive(Debug, Clone)]
pub struct WeChatClient {
    http: reqwest::Client,
    api_base: String,
    token_timeout: Duration,
    upload_timeout: Duration,
    download_timeout: Duration,
}

impl WeChatClient {
    pub fn new(config: &PressConfig) -> Result<Self, PressError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| PressError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token_timeout: Duration::from_secs(config.token_timeout_secs),
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Request a new access token.
    pub async fn fetch_token(&self, credentials: &Credentials) -> Result<TokenGrant, PressError> {
        let url = format!("{}/token", self.api_base);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", credentials.app_id.as_str()),
                ("secret", credentials.app_secret.as_str()),
            ])
            .timeout(self.token_timeout)
            .send()
            .await
            .map_err(|e| PressError::network(format!("token request failed: {e}")))?;

        let body = read_json(response, "token request").await?;
        match body.access_token.clone() {
            Some(access_token) => Ok(TokenGrant {
                access_token,
                expires_in: body.expires_in.unwrap_or(7200),
            }),
            None => Err(body.into_error("unknown error")),
        }
    }

    /// Upload one image for use inside article content; returns its hosted URL.
    pub async fn upload_image(
        &self,
        access_token: &str,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<String, PressError> {
        let url = format!("{}/media/uploadimg", self.api_base);
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| PressError::Internal(format!("invalid MIME type '{mime_type}': {e}")))?;
        let form = Form::new().part("media", part);

        debug!("Uploading {} ({})", filename, mime_type);
        let response = self
            .http
            .post(&url)
            .query(&[("access_token", access_token)])
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await
            .map_err(|e| PressError::network(format!("image upload failed: {e}")))?;

        let body = read_json(response, "image upload").await?;
        match body.url.clone() {
            Some(hosted) => Ok(hosted),
            None => Err(body.into_error("upload failed")),
        }
    }

    /// Fetch `url` into a new file under `dest_dir`.
    ///
    /// The file is named `downloaded_<millis><ext>`, the extension taken from
    /// the response content type (`.jpg` when absent or unrecognised).
    pub async fn download_external(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, PressError> {
        info!("Downloading image: {}", url);
        let fail = |reason: String| PressError::network(format!("download of {url} failed: {reason}"));

        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, DOWNLOAD_USER_AGENT)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }

        let ext = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(extension_for_content_type)
            .unwrap_or(".jpg");

        let bytes = response.bytes().await.map_err(|e| fail(e.to_string()))?;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = unique_path(dest_dir, &format!("downloaded_{millis}"), ext);

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| fail(format!("cannot write {}: {e}", path.display())))?;
        debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

/// Parse the JSON envelope, mapping transport and parse failures to
/// network-coded provider errors.
async fn read_json(response: reqwest::Response, what: &str) -> Result<ApiResponse, PressError> {
    let status = response.status();
    if !status.is_success() {
        return Err(PressError::network(format!("{what} failed: HTTP {status}")));
    }
    let text = response
        .text()
        .await
        .map_err(|e| PressError::network(format!("{what} failed: {e}")))?;
    parse_envelope(&text, what)
}

fn parse_envelope(text: &str, what: &str) -> Result<ApiResponse, PressError> {
    serde_json::from_str(text).map_err(|e| PressError::Provider {
        code: NETWORK_ERROR_CODE,
        message: format!("{what} returned malformed response: {e}"),
    })
}

/// File extension for a `Content-Type` header value.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "image/svg+xml" => ".svg",
        "image/tiff" => ".tiff",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        _ => ".jpg",
    }
}

/// MIME type for an upload, from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("tif" | "tiff") => "image/tiff",
        Some("ico") => "image/x-icon",
        _ => "image/jpeg",
    }
}

fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let first = dir.join(format!("{stem}{ext}"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{stem}_{n}{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}
