//! Markdown rendering: ordered text substitutions producing WeChat HTML.
//!
//! This is not a CommonMark renderer. It applies a fixed sequence of
//! line-oriented rules, each exactly once, and then groups the result into
//! paragraphs:
//!
//! ```text
//!  1. fenced code      ─┐ stashed behind placeholders so
//!  2. images           ─┘ later rules never see their contents
//!  3. ## / ### headers
//!  4. --- rules
//!  5. **bold**
//!  6. *italic*
//!  7. [links](url)
//!  8. > quotes
//!  9. - / 1. list items, consecutive items wrapped in one list
//! 10. blank-line blocks → paragraphs (block tags pass through)
//! ```
//!
//! Known limitations, kept on purpose: no nesting, no HTML escaping of
//! source text, and the italic rule can pair stray asterisks left over from
//! unmatched bold markers.

use crate::pipeline::extract::RE_IMAGE;
use crate::styles;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Placeholder sentinel. U+001A never appears in Markdown prose.
const STASH_MARK: char = '\u{1A}';

static RE_CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(\w*)\n(.*?)```").unwrap());
static RE_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## (.+)$").unwrap());
static RE_H3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^### (.+)$").unwrap());
static RE_HR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^---+$").unwrap());
static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static RE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^> (.+)$").unwrap());
static RE_UL_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^- (.+)$").unwrap());
static RE_OL_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\d+\. (.+)$").unwrap());
static RE_LIST_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<li[^>]*>.*?</li>(?:\n<li[^>]*>.*?</li>)*").unwrap()
});
static RE_STASH_REF: Lazy<Regex> = Lazy::new(|| Regex::new("\u{1A}(\\d+)\u{1A}").unwrap());

/// Render a Markdown body (frontmatter already removed) to HTML.
///
/// Deterministic: the same input always yields byte-identical output.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut stash = Stash::default();
    let html = markdown.replace("\r\n", "\n");

    let html = RE_CODE_BLOCK.replace_all(&html, |caps: &Captures<'_>| {
        stash.put(render_code_block(&caps[2]))
    });
    let html = RE_IMAGE.replace_all(&html, |caps: &Captures<'_>| {
        stash.put(format!(
            r#"<img src="{}" alt="{}" style="{}">"#,
            &caps[2],
            &caps[1],
            styles::IMG
        ))
    });

    let html = RE_H2.replace_all(&html, format!(r#"<h2 style="{}">$1</h2>"#, styles::H2).as_str());
    let html = RE_H3.replace_all(&html, format!(r#"<h3 style="{}">$1</h3>"#, styles::H3).as_str());
    let html = RE_HR.replace_all(&html, format!(r#"<hr style="{}">"#, styles::HR).as_str());
    let html = RE_BOLD.replace_all(&html, "<strong>$1</strong>");
    let html = RE_ITALIC.replace_all(&html, "<em>$1</em>");
    let html = RE_LINK.replace_all(
        &html,
        format!(r#"<a href="$2" style="{}">$1</a>"#, styles::LINK).as_str(),
    );
    let html = RE_QUOTE.replace_all(
        &html,
        format!(r#"<blockquote style="{}">$1</blockquote>"#, styles::BLOCKQUOTE).as_str(),
    );

    let li = format!(r#"<li style="{}">$1</li>"#, styles::LI);
    let html = RE_UL_ITEM.replace_all(&html, li.as_str());
    let html = RE_OL_ITEM.replace_all(&html, li.as_str());
    let html = RE_LIST_RUN.replace_all(&html, |caps: &Captures<'_>| {
        format!(r#"<ul style="{}">{}</ul>"#, styles::UL, &caps[0])
    });

    let html = wrap_paragraphs(&html, &stash);
    stash.restore(&html)
}

/// Monospace block: spaces become `&nbsp;`, lines joined with `<br>`.
fn render_code_block(code: &str) -> String {
    let body = code
        .trim()
        .split('\n')
        .map(|line| line.replace(' ', "&nbsp;"))
        .collect::<Vec<_>>()
        .join("<br>");
    format!(r#"<pre style="{}">{}</pre>"#, styles::PRE, body)
}

/// Split on blank lines; wrap every block that does not already open with a
/// block-level tag in a paragraph, single newlines becoming `<br>`.
fn wrap_paragraphs(html: &str, stash: &Stash) -> String {
    html.split("\n\n")
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if starts_with_block_tag(stash.peek_leading(part)) {
                part.to_string()
            } else {
                format!(
                    r#"<p style="{}">{}</p>"#,
                    styles::P,
                    part.replace('\n', "<br>")
                )
            }
        })
        .collect()
}

fn starts_with_block_tag(text: &str) -> bool {
    styles::BLOCK_TAG_PREFIXES
        .iter()
        .any(|prefix| text.starts_with(prefix))
}

/// Finished fragments kept out of reach of later substitution rules.
#[derive(Default)]
struct Stash {
    fragments: Vec<String>,
}

impl Stash {
    fn put(&mut self, fragment: String) -> String {
        let idx = self.fragments.len();
        self.fragments.push(fragment);
        format!("{STASH_MARK}{idx}{STASH_MARK}")
    }

    /// If `text` opens with a placeholder, the fragment it stands for;
    /// otherwise `text` itself.
    fn peek_leading<'a>(&'a self, text: &'a str) -> &'a str {
        RE_STASH_REF
            .captures(text)
            .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0))
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .and_then(|idx| self.fragments.get(idx))
            .map_or(text, String::as_str)
    }

    fn restore(&self, text: &str) -> String {
        RE_STASH_REF
            .replace_all(text, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.fragments.get(idx))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
