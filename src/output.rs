//! Result types returned by the `process*` entry points.

use crate::error::ImageError;
use serde::Serialize;
use std::path::PathBuf;

/// What happened to one distinct image locator.
#[derive(Debug, Clone, Serialize)]
pub struct ImageOutcome {
    /// The locator exactly as written in the source.
    pub locator: String,
    /// Hosted URL; `None` when the image was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ImageError>,
}

impl ImageOutcome {
    pub fn uploaded(locator: &str, url: String) -> Self {
        Self {
            locator: locator.to_string(),
            hosted_url: Some(url),
            error: None,
        }
    }

    pub fn failed(locator: &str, error: ImageError) -> Self {
        Self {
            locator: locator.to_string(),
            hosted_url: None,
            error: Some(error),
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.hosted_url.is_some()
    }
}

/// A processed article, ready to paste into the WeChat editor.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutput {
    pub title: String,
    /// Final HTML with image sources rewritten to hosted URLs.
    pub html: String,
    /// Frontmatter `description`, empty when absent or for HTML input.
    pub summary: String,
    pub images_uploaded: usize,
    /// Hosted URL of the first image, when it was uploaded.
    pub cover_image_url: Option<String>,
    pub source_file: PathBuf,
    /// One entry per distinct locator, in discovery order.
    pub images: Vec<ImageOutcome>,
}

impl ProcessOutput {
    /// Outcomes that did not produce a hosted URL.
    pub fn failed_images(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.images.iter().filter(|o| !o.is_uploaded())
    }
}
