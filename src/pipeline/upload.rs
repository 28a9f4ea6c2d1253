//! Image hosting: upload each distinct image and record where it landed.
//!
//! Uploads run strictly one after another, in discovery order. A failure is
//! logged, reported to the progress callback and recorded in the outcome
//! list; it never stops the remaining images.

use crate::client::{mime_for_path, WeChatClient};
use crate::error::{ImageError, PressError};
use crate::output::ImageOutcome;
use crate::pipeline::extract::{is_http, ResolvedLocation};
use crate::pipeline::html::is_already_hosted;
use crate::progress::PressProgressCallback;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The remote side of the uploader. [`WeChatClient`] is the real host;
/// tests provide their own.
pub trait ImageHost {
    /// Upload `bytes` and return the hosted URL.
    fn upload(
        &self,
        access_token: &str,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> impl Future<Output = Result<String, PressError>>;

    /// Fetch a remote image into `dest_dir`, returning the local path.
    fn download_external(
        &self,
        url: &str,
        dest_dir: &Path,
    ) -> impl Future<Output = Result<PathBuf, PressError>>;
}

impl ImageHost for WeChatClient {
    async fn upload(
        &self,
        access_token: &str,
        bytes: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<String, PressError> {
        self.upload_image(access_token, bytes, filename, mime_type).await
    }

    async fn download_external(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, PressError> {
        WeChatClient::download_external(self, url, dest_dir).await
    }
}

/// One image to host: the locator as written and where its bytes are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub locator: String,
    pub location: ResolvedLocation,
}

/// Locator → hosted URL, plus one outcome per attempted image.
#[derive(Debug, Default)]
pub struct UploadResult {
    pub mapping: HashMap<String, String>,
    pub outcomes: Vec<ImageOutcome>,
}

impl UploadResult {
    pub fn uploaded(&self) -> usize {
        self.mapping.len()
    }
}

/// Keep the first job per locator, preserving order, and drop sources that
/// are already hosted or inline.
pub fn distinct_jobs(jobs: impl IntoIterator<Item = UploadJob>) -> Vec<UploadJob> {
    let mut seen = HashSet::new();
    jobs.into_iter()
        .filter(|job| !is_already_hosted(&job.locator))
        .filter(|job| seen.insert(job.locator.clone()))
        .collect()
}

/// Upload every job in order.
///
/// `scratch_dir` receives downloads of remote images; each download is
/// removed once its upload has been attempted.
pub async fn upload_images<H: ImageHost>(
    host: &H,
    access_token: &str,
    jobs: &[UploadJob],
    scratch_dir: &Path,
    callback: Option<&dyn PressProgressCallback>,
) -> UploadResult {
    let total = jobs.len();
    let mut result = UploadResult::default();
    if let Some(cb) = callback {
        cb.on_upload_start(total);
    }

    for (i, job) in jobs.iter().enumerate() {
        let index = i + 1;
        if let Some(cb) = callback {
            cb.on_image_start(index, total, &job.locator);
        }

        match host_one(host, access_token, job, scratch_dir).await {
            Ok(url) => {
                info!("Uploaded {} → {}", job.locator, url);
                if let Some(cb) = callback {
                    cb.on_image_uploaded(index, total, &job.locator, &url);
                }
                result.mapping.insert(job.locator.clone(), url.clone());
                result.outcomes.push(ImageOutcome::uploaded(&job.locator, url));
            }
            Err(error) => {
                warn!("Skipping image {}: {}", job.locator, error);
                if let Some(cb) = callback {
                    cb.on_image_error(index, total, &job.locator, &error.to_string());
                }
                result.outcomes.push(ImageOutcome::failed(&job.locator, error));
            }
        }
    }

    if let Some(cb) = callback {
        cb.on_upload_complete(total, result.uploaded());
    }
    result
}

async fn host_one<H: ImageHost>(
    host: &H,
    access_token: &str,
    job: &UploadJob,
    scratch_dir: &Path,
) -> Result<String, ImageError> {
    match &job.location {
        ResolvedLocation::File(path) => upload_file(host, access_token, path).await,
        ResolvedLocation::Remote(url) if is_http(url) => {
            let local = host
                .download_external(url, scratch_dir)
                .await
                .map_err(ImageError::from_download)?;
            let uploaded = upload_file(host, access_token, &local).await;
            if let Err(e) = tokio::fs::remove_file(&local).await {
                warn!("Could not remove temporary file {}: {}", local.display(), e);
            }
            uploaded
        }
        ResolvedLocation::Remote(other) => Err(ImageError::DownloadFailed {
            detail: format!("unsupported scheme in '{other}'"),
        }),
    }
}

async fn upload_file<H: ImageHost>(
    host: &H,
    access_token: &str,
    path: &Path,
) -> Result<String, ImageError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ImageError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(ImageError::UploadFailed {
                code: crate::error::NETWORK_ERROR_CODE,
                message: format!("cannot read {}: {e}", path.display()),
            })
        }
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    host.upload(access_token, bytes, &filename, mime_for_path(path))
        .await
        .map_err(ImageError::from_upload)
}
