//! Image extraction: find every `![alt](locator)` in a Markdown body.
//!
//! Each locator is resolved exactly once, here, against the directory that
//! holds the source document. Later stages key everything on the original
//! locator string and never re-derive the location.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Image markup: `![alt](locator)`. Shared with the renderer so both stages
/// agree on what counts as an image.
pub(crate) static RE_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap());

static RE_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap());

/// Where an image's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResolvedLocation {
    /// Absolute filesystem path.
    File(PathBuf),
    /// Network URL or inline `data:` URI, left as written.
    Remote(String),
}

impl ResolvedLocation {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ResolvedLocation::File(p) => Some(p),
            ResolvedLocation::Remote(_) => None,
        }
    }
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedLocation::File(p) => write!(f, "{}", p.display()),
            ResolvedLocation::Remote(u) => f.write_str(u),
        }
    }
}

/// One discovered image mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    pub alt_text: String,
    pub original_locator: String,
    pub resolved_location: ResolvedLocation,
}

/// True for locators with a URL scheme (`http://`, `https://`, …) or `data:`.
pub fn is_remote(locator: &str) -> bool {
    RE_SCHEME.is_match(locator) || locator.starts_with("data:")
}

/// True for `http(s)://` locators that can be downloaded.
pub fn is_http(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Resolve `locator` against `base_dir`.
pub fn resolve_locator(locator: &str, base_dir: &Path) -> ResolvedLocation {
    if is_remote(locator) {
        return ResolvedLocation::Remote(locator.to_string());
    }
    let path = Path::new(locator);
    if path.is_absolute() {
        return ResolvedLocation::File(path.to_path_buf());
    }
    ResolvedLocation::File(join_lexically(base_dir, path))
}

/// Join without touching the filesystem, dropping `.` segments.
fn join_lexically(base: &Path, rel: &Path) -> PathBuf {
    let mut out = base.to_path_buf();
    for component in rel.components() {
        match component {
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Scan `markdown` left to right and return every image in appearance order.
///
/// The first element, if any, is the article's cover image.
pub fn extract_images(markdown: &str, base_dir: &Path) -> Vec<ImageReference> {
    let images: Vec<ImageReference> = RE_IMAGE
        .captures_iter(markdown)
        .map(|caps| {
            let locator = caps[2].to_string();
            ImageReference {
                alt_text: caps[1].to_string(),
                resolved_location: resolve_locator(&locator, base_dir),
                original_locator: locator,
            }
        })
        .collect();
    debug!("Extracted {} image references", images.len());
    images
}
