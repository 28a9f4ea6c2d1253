//! Progress-callback trait for per-image upload events.
//!
//! Inject an [`Arc<dyn PressProgressCallback>`] via
//! [`crate::config::PressConfigBuilder::progress_callback`] to receive events
//! as the uploader walks the article's images.
//!
//! # Example
//!
//! ```rust
//! use wechat_press::{PressConfig, PressProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     uploaded: AtomicUsize,
//! }
//!
//! impl PressProgressCallback for CountingCallback {
//!     fn on_image_uploaded(&self, index: usize, total: usize, locator: &str, _url: &str) {
//!         self.uploaded.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {locator}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { uploaded: AtomicUsize::new(0) });
//!
//! let config = PressConfig::builder()
//!     .progress_callback(counter as Arc<dyn PressProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the uploader as it processes each distinct image.
///
/// Uploads are sequential, so events arrive in discovery order. All methods
/// have default no-op implementations.
pub trait PressProgressCallback: Send + Sync {
    /// Called once before the first image is attempted.
    ///
    /// # Arguments
    /// * `total`: number of distinct images that will be attempted
    fn on_upload_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before an image is read (or downloaded) and sent.
    ///
    /// # Arguments
    /// * `index`  : 1-indexed position among the distinct images
    /// * `total`  : number of distinct images
    /// * `locator`: the locator exactly as written in the source
    fn on_image_start(&self, index: usize, total: usize, locator: &str) {
        let _ = (index, total, locator);
    }

    /// Called when the endpoint returned a hosted URL.
    fn on_image_uploaded(&self, index: usize, total: usize, locator: &str, url: &str) {
        let _ = (index, total, locator, url);
    }

    /// Called when an image was skipped: missing file, failed download or
    /// rejected upload. The locator stays unmapped.
    fn on_image_error(&self, index: usize, total: usize, locator: &str, error: &str) {
        let _ = (index, total, locator, error);
    }

    /// Called once after every image has been attempted.
    ///
    /// # Arguments
    /// * `total`   : number of distinct images attempted
    /// * `uploaded`: images that now have a hosted URL
    fn on_upload_complete(&self, total: usize, uploaded: usize) {
        let _ = (total, uploaded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PressProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PressConfig`].
pub type ProgressCallback = Arc<dyn PressProgressCallback>;
