//! Reference rewriting: point image `src` attributes at their hosted URLs.
//!
//! A `src="…"` (or `src='…'`, as found in hand-written HTML input) value is
//! rewritten when it equals a mapped locator exactly. The quote style is kept.
//! Two images whose locator strings are identical share one hosted URL even
//! if they resolved to different files.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

static RE_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"src=(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Replace every `src="<locator>"` with `src="<hosted url>"` for each mapped
/// locator. Unmapped locators are left exactly as they were.
///
/// One pass over the document: a hosted URL that happens to equal another
/// locator is never rewritten a second time.
pub fn rewrite_image_sources(html: &str, mapping: &HashMap<String, String>) -> String {
    if mapping.is_empty() {
        return html.to_string();
    }

    RE_SRC
        .replace_all(html, |caps: &Captures<'_>| {
            let (value, quote) = match caps.get(1) {
                Some(m) => (m.as_str(), '"'),
                None => (caps.get(2).map_or("", |m| m.as_str()), '\''),
            };
            match mapping.get(value) {
                Some(url) => format!("src={quote}{url}{quote}"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_mapping_is_identity() {
        let html = r#"<img src="a.png"><p>x</p>"#;
        assert_eq!(rewrite_image_sources(html, &HashMap::new()), html);
    }

    #[test]
    fn every_occurrence_replaced() {
        let html = r#"<img src="a.png"><p>t</p><img src="a.png">"#;
        let out = rewrite_image_sources(html, &map(&[("a.png", "https://host/a.png")]));
        assert_eq!(
            out,
            r#"<img src="https://host/a.png"><p>t</p><img src="https://host/a.png">"#
        );
    }

    #[test]
    fn unmapped_locators_untouched() {
        let html = r#"<img src="a.png"><img src="b.png">"#;
        let out = rewrite_image_sources(html, &map(&[("b.png", "https://h/b")]));
        assert_eq!(out, r#"<img src="a.png"><img src="https://h/b">"#);
    }

    #[test]
    fn only_src_attributes_are_rewritten() {
        let html = r#"<img src="a.png" alt="a.png"><p>a.png</p>"#;
        let out = rewrite_image_sources(html, &map(&[("a.png", "https://h/a")]));
        assert_eq!(out, r#"<img src="https://h/a" alt="a.png"><p>a.png</p>"#);
    }

    #[test]
    fn hosted_url_is_not_rewritten_again() {
        let html = r#"<img src="a.png"><img src="b.png">"#;
        let out = rewrite_image_sources(
            html,
            &map(&[("a.png", "b.png"), ("b.png", "https://h/b")]),
        );
        assert_eq!(out, r#"<img src="b.png"><img src="https://h/b">"#);
    }

    #[test]
    fn prefix_locators_do_not_collide() {
        let html = r#"<img src="a.png"><img src="a.png?v=2">"#;
        let out = rewrite_image_sources(
            html,
            &map(&[("a.png", "https://h/1"), ("a.png?v=2", "https://h/2")]),
        );
        assert_eq!(out, r#"<img src="https://h/1"><img src="https://h/2">"#);
    }

    #[test]
    fn single_quoted_sources_keep_their_quotes() {
        let html = "<img src='a.png'><img src=\"a.png\">";
        let out = rewrite_image_sources(html, &map(&[("a.png", "https://h/a")]));
        assert_eq!(out, "<img src='https://h/a'><img src=\"https://h/a\">");
    }
}
