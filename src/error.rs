//! Error types for the wechat-press library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PressError`]: **Fatal**. The run cannot proceed at all (missing
//!   credentials, input file absent, token endpoint refused us). Returned as
//!   `Err(PressError)` from the top-level `process*` functions.
//!
//! * [`ImageError`]: **Non-fatal**. A single image could not be hosted
//!   (missing on disk, upload rejected, download failed) but the rest of the
//!   article is fine. Stored inside [`crate::output::ImageOutcome`] so the
//!   caller sees exactly which references were left unmapped.

use std::path::PathBuf;
use thiserror::Error;

/// Synthetic provider code used for transport-level failures
/// (connection refused, timeout, non-2xx status, unreadable body).
pub const NETWORK_ERROR_CODE: i64 = -1;

/// All fatal errors returned by the wechat-press library.
#[derive(Debug, Error)]
pub enum PressError {
    // ── Configuration ─────────────────────────────────────────────────────
    /// Required identifiers are absent from the environment and `.env`.
    #[error(
        "Missing credentials: {missing}\n\
Set WECHAT_APP_ID and WECHAT_APP_SECRET in the environment or in a .env file."
    )]
    CredentialsMissing { missing: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Remote endpoints ──────────────────────────────────────────────────
    /// The remote endpoint returned an error code, the response could not be
    /// parsed, or the request never completed (code [`NETWORK_ERROR_CODE`]).
    #[error("WeChat API error ({code}): {message}")]
    Provider { code: i64, message: String },

    // ── Input / output ────────────────────────────────────────────────────
    /// A referenced local file does not exist.
    #[error("File not found: '{path}'")]
    ResourceNotFound { path: PathBuf },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PressError {
    /// A transport failure, reported as a provider error with the synthetic code.
    pub fn network(message: impl Into<String>) -> Self {
        PressError::Provider {
            code: NETWORK_ERROR_CODE,
            message: message.into(),
        }
    }

    /// True when this is a provider error produced by a failed request
    /// rather than a code returned by the endpoint.
    pub fn is_network(&self) -> bool {
        matches!(self, PressError::Provider { code, .. } if *code == NETWORK_ERROR_CODE)
    }
}

/// A non-fatal error for a single image reference.
///
/// The locator stays unmapped in the rewritten HTML; every other image is
/// still processed.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageError {
    /// The resolved local file is absent.
    #[error("image not found: '{}'", .path.display())]
    NotFound { path: PathBuf },

    /// The upload endpoint rejected the image or was unreachable.
    #[error("upload failed ({code}): {message}")]
    UploadFailed { code: i64, message: String },

    /// A remote image could not be fetched for re-hosting.
    #[error("download failed: {detail}")]
    DownloadFailed { detail: String },
}

impl ImageError {
    /// Convert a fatal-shaped error raised while handling one image into the
    /// per-image record kept in the report.
    pub(crate) fn from_upload(err: PressError) -> Self {
        match err {
            PressError::Provider { code, message } => ImageError::UploadFailed { code, message },
            PressError::ResourceNotFound { path } => ImageError::NotFound { path },
            other => ImageError::UploadFailed {
                code: NETWORK_ERROR_CODE,
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn from_download(err: PressError) -> Self {
        ImageError::DownloadFailed {
            detail: err.to_string(),
        }
    }
}
