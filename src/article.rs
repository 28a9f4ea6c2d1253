//! Offline parse of a Markdown article: no credentials, no network.
//!
//! Runs the splitter, extractor and renderer and returns everything the
//! upload step would need, so a document can be previewed before it is
//! published.

use crate::error::PressError;
use crate::pipeline::extract::{extract_images, ImageReference, ResolvedLocation};
use crate::pipeline::frontmatter::Document;
use crate::pipeline::render::markdown_to_html;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Title used when neither frontmatter nor a heading provides one.
pub const UNTITLED: &str = "Untitled";

static RE_TITLE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^##? +(.+?)\s*$").unwrap());

/// A Markdown article after the offline stages.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedArticle {
    pub title: String,
    pub description: String,
    /// Resolved location of the first image.
    pub cover_image: Option<ResolvedLocation>,
    pub images: Vec<ImageReference>,
    /// Rendered HTML; image sources still carry the original locators.
    pub html: String,
    /// Absolute path of the parsed file; empty for in-memory text.
    pub source_file: PathBuf,
}

/// Parse Markdown `text` whose images resolve against `base_dir`.
pub fn parse_markdown_str(text: &str, base_dir: &Path) -> ParsedArticle {
    let doc = Document::parse(text);
    let images = extract_images(&doc.body, base_dir);
    let html = markdown_to_html(&doc.body);
    let title = doc
        .get("title")
        .map(str::to_string)
        .or_else(|| first_heading(&doc.body))
        .unwrap_or_else(|| UNTITLED.to_string());
    debug!("Parsed article '{}' with {} images", title, images.len());

    ParsedArticle {
        title,
        description: doc.get("description").unwrap_or_default().to_string(),
        cover_image: images.first().map(|img| img.resolved_location.clone()),
        images,
        html,
        source_file: PathBuf::new(),
    }
}

/// Read and parse the Markdown file at `path`.
pub fn parse_markdown_file(path: impl AsRef<Path>) -> Result<ParsedArticle, PressError> {
    let path = absolute(path.as_ref());
    let text = std::fs::read_to_string(&path).map_err(|e| read_error(&path, e))?;
    let mut article = parse_markdown_str(&text, base_dir_of(&path));
    article.source_file = path;
    Ok(article)
}

/// Text of the first `#` or `##` heading in `body`.
fn first_heading(body: &str) -> Option<String> {
    RE_TITLE_HEADING
        .captures(body)
        .map(|caps| caps[1].to_string())
        .filter(|t| !t.is_empty())
}

pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

pub(crate) fn base_dir_of(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

pub(crate) fn read_error(path: &Path, e: std::io::Error) -> PressError {
    if e.kind() == std::io::ErrorKind::NotFound {
        PressError::ResourceNotFound {
            path: path.to_path_buf(),
        }
    } else {
        PressError::Internal(format!("failed to read {}: {e}", path.display()))
    }
}
