//! End-to-end entry points: read an article, host its images, return
//! WeChat-ready HTML.
//!
//! [`process_markdown`] and [`process_html`] resolve credentials, a token
//! and a [`WeChatClient`] from the [`PressConfig`] and then delegate to the
//! `*_with` variants, which take any [`ImageHost`] and a ready token. The
//! `*_with` variants are what the tests drive.

use crate::article::{absolute, base_dir_of, parse_markdown_str, read_error, UNTITLED};
use crate::client::WeChatClient;
use crate::config::PressConfig;
use crate::error::PressError;
use crate::output::ProcessOutput;
use crate::pipeline::extract::resolve_locator;
use crate::pipeline::html::{extract_body, extract_title, image_sources};
use crate::pipeline::rewrite::rewrite_image_sources;
use crate::pipeline::upload::{distinct_jobs, upload_images, ImageHost, UploadJob};
use crate::progress::PressProgressCallback;
use crate::token::{FileTokenCache, TokenCache, TokenManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Process a Markdown article: render it, upload its images and rewrite the
/// image sources to the hosted URLs.
///
/// # Errors
/// Fatal errors only: the file is missing ([`PressError::ResourceNotFound`]),
/// credentials are absent ([`PressError::CredentialsMissing`]) or no token
/// could be obtained ([`PressError::Provider`]). Per-image failures are
/// reported in [`ProcessOutput::images`].
pub async fn process_markdown(
    path: impl AsRef<Path>,
    config: &PressConfig,
) -> Result<ProcessOutput, PressError> {
    let path = absolute(path.as_ref());
    ensure_exists(&path).await?;
    let (client, token) = connect(config).await?;
    process_markdown_with(&path, &client, &token, config.progress_callback.as_deref()).await
}

/// [`process_markdown`] against an explicit host and token.
pub async fn process_markdown_with<H: ImageHost>(
    path: impl AsRef<Path>,
    host: &H,
    access_token: &str,
    callback: Option<&dyn PressProgressCallback>,
) -> Result<ProcessOutput, PressError> {
    let path = absolute(path.as_ref());
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| read_error(&path, e))?;

    let article = parse_markdown_str(&text, base_dir_of(&path));
    info!("Processing article: {}", article.title);

    let jobs = distinct_jobs(article.images.iter().map(|img| UploadJob {
        locator: img.original_locator.clone(),
        location: img.resolved_location.clone(),
    }));
    let scratch = scratch_dir()?;
    let uploads = upload_images(host, access_token, &jobs, scratch.path(), callback).await;

    let cover_image_url = article
        .images
        .first()
        .and_then(|img| uploads.mapping.get(&img.original_locator))
        .cloned();
    let html = rewrite_image_sources(&article.html, &uploads.mapping);
    info!(
        "Uploaded {}/{} images for '{}'",
        uploads.uploaded(),
        jobs.len(),
        article.title
    );

    Ok(ProcessOutput {
        title: article.title,
        html,
        summary: article.description,
        images_uploaded: uploads.uploaded(),
        cover_image_url,
        source_file: path,
        images: uploads.outcomes,
    })
}

/// Process an existing HTML article: keep its body, upload its images and
/// rewrite the image sources.
///
/// Sources already on the WeChat image host and `data:` URIs are left alone;
/// remote sources are downloaded and re-hosted.
pub async fn process_html(
    path: impl AsRef<Path>,
    config: &PressConfig,
) -> Result<ProcessOutput, PressError> {
    let path = absolute(path.as_ref());
    ensure_exists(&path).await?;
    let (client, token) = connect(config).await?;
    process_html_with(&path, &client, &token, config.progress_callback.as_deref()).await
}

/// [`process_html`] against an explicit host and token.
pub async fn process_html_with<H: ImageHost>(
    path: impl AsRef<Path>,
    host: &H,
    access_token: &str,
    callback: Option<&dyn PressProgressCallback>,
) -> Result<ProcessOutput, PressError> {
    let path = absolute(path.as_ref());
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| read_error(&path, e))?;

    let title = extract_title(&content).unwrap_or_else(|| UNTITLED.to_string());
    let body = extract_body(&content);
    info!("Processing HTML article: {}", title);

    let base_dir = base_dir_of(&path);
    let jobs = distinct_jobs(image_sources(&body).into_iter().map(|src| UploadJob {
        location: resolve_locator(&src, base_dir),
        locator: src,
    }));
    let scratch = scratch_dir()?;
    let uploads = upload_images(host, access_token, &jobs, scratch.path(), callback).await;

    let cover_image_url = jobs
        .first()
        .and_then(|job| uploads.mapping.get(&job.locator))
        .cloned();
    let html = rewrite_image_sources(&body, &uploads.mapping);

    Ok(ProcessOutput {
        title,
        html,
        summary: String::new(),
        images_uploaded: uploads.uploaded(),
        cover_image_url,
        source_file: path,
        images: uploads.outcomes,
    })
}

/// Synchronous wrapper around [`process_markdown`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_markdown_sync(
    path: impl AsRef<Path>,
    config: &PressConfig,
) -> Result<ProcessOutput, PressError> {
    runtime()?.block_on(process_markdown(path, config))
}

/// Synchronous wrapper around [`process_html`].
pub fn process_html_sync(
    path: impl AsRef<Path>,
    config: &PressConfig,
) -> Result<ProcessOutput, PressError> {
    runtime()?.block_on(process_html(path, config))
}

/// Delete the cached access token, if any.
pub fn clear_token_cache(config: &PressConfig) -> Result<(), PressError> {
    TokenManager::new(token_cache(config)).clear()
}

/// Write `contents` to `path` through a temporary sibling and a rename, so
/// readers never observe a partial file.
pub async fn write_atomic(path: impl AsRef<Path>, contents: &str) -> Result<(), PressError> {
    let path = path.as_ref();
    let write_failed = |source| PressError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn ensure_exists(path: &Path) -> Result<(), PressError> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(()),
        Err(e) => Err(read_error(path, e)),
    }
}

/// Credentials, then a token: no request is made without both.
async fn connect(config: &PressConfig) -> Result<(WeChatClient, String), PressError> {
    let credentials = config.require_credentials()?;
    let client = WeChatClient::new(config)?;
    let token = TokenManager::new(token_cache(config))
        .acquire(&client, credentials, config.force_refresh)
        .await?;
    Ok((client, token))
}

fn token_cache(config: &PressConfig) -> Arc<dyn TokenCache> {
    match &config.token_cache {
        Some(cache) => Arc::clone(cache),
        None => Arc::new(FileTokenCache::default_location()),
    }
}

fn scratch_dir() -> Result<tempfile::TempDir, PressError> {
    tempfile::Builder::new()
        .prefix("wechat_images")
        .tempdir()
        .map_err(|e| PressError::Internal(format!("failed to create scratch directory: {e}")))
}

fn runtime() -> Result<tokio::runtime::Runtime, PressError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PressError::Internal(format!("Failed to create tokio runtime: {}", e)))
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::token::MemoryTokenCache;

    #[test]
    fn missing_input_reported_before_credentials() {
        let config = PressConfig::default();
        let err = tokio_test::block_on(process_markdown("/no/such/article.md", &config)).unwrap_err();
        assert!(matches!(err, PressError::ResourceNotFound { .. }), "got: {err}");
    }

    #[test]
    fn missing_credentials_is_fatal_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "# A").unwrap();
        let config = PressConfig::builder()
            .api_base("http://127.0.0.1:9")
            .build()
            .unwrap();
        let err = tokio_test::block_on(process_markdown(&path, &config)).unwrap_err();
        assert!(matches!(err, PressError::CredentialsMissing { .. }), "got: {err}");
    }

    #[test]
    fn token_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.html");
        std::fs::write(&path, "<p>x</p>").unwrap();
        let config = PressConfig::builder()
            .api_base("http://127.0.0.1:9")
            .token_timeout_secs(2)
            .credentials(Credentials::new("wx1", "s"))
            .token_cache(Arc::new(MemoryTokenCache::new()))
            .build()
            .unwrap();
        let err = tokio_test::block_on(process_html(&path, &config)).unwrap_err();
        assert!(err.is_network(), "got: {err}");
    }

    #[test]
    fn clear_uses_configured_cache() {
        let cache = Arc::new(MemoryTokenCache::with_token(crate::token::CachedToken {
            owner_id: "wx1".into(),
            token: "t".into(),
            expires_at: 1,
        }));
        let config = PressConfig::builder()
            .token_cache(cache.clone())
            .build()
            .unwrap();
        clear_token_cache(&config).unwrap();
        assert!(cache.get().is_none());
    }

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out/nested/article.html");
        tokio_test::block_on(write_atomic(&target, "<p>hi</p>")).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "<p>hi</p>");
        assert!(!tmp_sibling(&target).exists());
    }

    #[test]
    fn tmp_sibling_appends_suffix() {
        assert_eq!(
            tmp_sibling(Path::new("/o/a.html")),
            PathBuf::from("/o/a.html.tmp")
        );
    }
}
