//! HTML input: pull the title, the body fragment and the image sources out
//! of an existing HTML article.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Longest title kept, in characters.
pub const MAX_TITLE_CHARS: usize = 64;

/// Prefix of URLs already served by the WeChat image host.
pub const HOSTED_PREFIX: &str = "https://mmbiz.qpic.cn";

static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").unwrap());
static RE_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h1[^>]*>([^<]+)</h1>").unwrap());
static RE_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<body[^>]*>(.*?)</body>").unwrap());
static RE_HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<html[^>]*>|</html>").unwrap());
static RE_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<head[^>]*>.*?</head>").unwrap());
static RE_DOCTYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<!DOCTYPE[^>]*>").unwrap());
static RE_IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).unwrap());

/// Title from `<title>`, else the first `<h1>`, truncated to
/// [`MAX_TITLE_CHARS`]. `None` when neither is present.
pub fn extract_title(html: &str) -> Option<String> {
    RE_TITLE
        .captures(html)
        .or_else(|| RE_H1.captures(html))
        .map(|caps| caps[1].trim().chars().take(MAX_TITLE_CHARS).collect())
}

/// The inner content of `<body>`; without one, the document minus its
/// `<html>` wrapper, `<head>` and doctype.
pub fn extract_body(html: &str) -> String {
    if let Some(caps) = RE_BODY.captures(html) {
        return caps[1].trim().to_string();
    }
    let s = RE_HTML_TAG.replace_all(html, "");
    let s = RE_HEAD.replace_all(&s, "");
    let s = RE_DOCTYPE.replace_all(&s, "");
    s.trim().to_string()
}

/// True for sources the uploader should leave alone.
pub fn is_already_hosted(src: &str) -> bool {
    src.starts_with(HOSTED_PREFIX) || src.starts_with("data:")
}

/// Distinct `<img>` sources needing upload, in first-appearance order.
pub fn image_sources(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    RE_IMG_SRC
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .filter(|src| !is_already_hosted(src))
        .filter(|src| seen.insert(src.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title> My Post </title><style>p{}</style></head>
<body>
<h1>Heading</h1>
<img class="x" src="a.png"><IMG SRC='https://cdn.site/b.jpg'>
<img src="a.png"><img src="https://mmbiz.qpic.cn/z.png"><img src="data:image/png;base64,AA">
</body></html>"#;

    #[test]
    fn title_prefers_title_tag() {
        assert_eq!(extract_title(PAGE).as_deref(), Some("My Post"));
    }

    #[test]
    fn title_falls_back_to_h1() {
        assert_eq!(
            extract_title("<h1 id=t>Only Heading</h1>").as_deref(),
            Some("Only Heading")
        );
        assert_eq!(extract_title("<p>nothing</p>"), None);
    }

    #[test]
    fn title_is_truncated_by_characters() {
        let long = "标".repeat(100);
        let title = extract_title(&format!("<title>{long}</title>")).unwrap();
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn body_inner_content() {
        let body = extract_body(PAGE);
        assert!(body.starts_with("<h1>Heading</h1>"));
        assert!(body.ends_with("base64,AA\">"));
        assert!(!body.contains("<title>"));
    }

    #[test]
    fn body_without_body_tag_strips_wrappers() {
        let html = "<!doctype html><html><head><title>t</title></head><p>x</p></html>";
        assert_eq!(extract_body(html), "<p>x</p>");
    }

    #[test]
    fn sources_deduplicated_and_filtered() {
        assert_eq!(
            image_sources(PAGE),
            ["a.png", "https://cdn.site/b.jpg"]
        );
    }
}
