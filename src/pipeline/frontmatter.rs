//! Frontmatter splitting: separate the leading `---` metadata block from the body.
//!
//! Only flat `key: value` lines are understood. List items and anything
//! else the simple grammar cannot read are skipped rather than rejected; a
//! half-readable block yields a partial mapping, never an error.

use std::collections::BTreeMap;

const DELIMITER: &str = "---";

/// A document split into its metadata and body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub frontmatter: BTreeMap<String, String>,
    pub body: String,
}

impl Document {
    /// Split `text` into frontmatter and body.
    pub fn parse(text: &str) -> Self {
        let (frontmatter, body) = split_frontmatter(text);
        Self {
            frontmatter,
            body: body.to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.frontmatter.get(key).map(String::as_str)
    }
}

/// Split leading frontmatter from `text`.
///
/// Returns the parsed mapping and the text starting immediately after the
/// closing delimiter line. Without an opening delimiter on the first line
/// the mapping is empty and `text` is returned unchanged. Without a closing
/// one, the lines after the opening delimiter are still parsed but `text`
/// is returned unchanged as the body.
pub fn split_frontmatter(text: &str) -> (BTreeMap<String, String>, &str) {
    let mut lines = LineSpans::new(text);

    match lines.next() {
        Some((first, _)) if first.trim() == DELIMITER => {}
        _ => return (BTreeMap::new(), text),
    }

    let mut block = Vec::new();
    for (line, end) in lines {
        if line.trim() == DELIMITER {
            return (parse_block(&block), &text[end..]);
        }
        block.push(line);
    }

    // Unterminated: keep whatever pairs were readable, body untouched.
    (parse_block(&block), text)
}

fn parse_block(lines: &[&str]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in lines {
        if line.trim_start().starts_with('-') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !key.is_empty() && !value.is_empty() {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}

/// Iterates lines together with the byte offset just past each line's
/// terminator, so the body can be sliced without re-joining.
struct LineSpans<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> LineSpans<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl<'a> Iterator for LineSpans<'a> {
    type Item = (&'a str, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.pos..];
        let (line, consumed) = match rest.find('\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        Some((line.trim_end_matches('\r'), self.pos))
    }
}
