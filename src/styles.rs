//! Inline styles attached to generated tags.
//!
//! The WeChat editor strips `<style>` blocks and external stylesheets, so
//! every tag the renderer emits carries its presentation inline. Keeping the
//! declarations here means the renderer only deals with structure.

pub const PRE: &str = "background:#f5f5f5;padding:15px;border-radius:5px;overflow-x:auto;\
font-family:monospace;font-size:14px;line-height:1.5;";

pub const IMG: &str = "max-width:100%;display:block;margin:20px auto;";

pub const H2: &str = "font-size:20px;font-weight:bold;margin:25px 0 15px;\
border-bottom:1px solid #eee;padding-bottom:10px;";

pub const H3: &str = "font-size:18px;font-weight:bold;margin:20px 0 10px;";

pub const HR: &str = "border:none;border-top:1px solid #ddd;margin:30px 0;";

pub const LINK: &str = "color:#576b95;";

pub const BLOCKQUOTE: &str = "border-left:4px solid #ddd;padding-left:15px;color:#666;margin:15px 0;";

pub const LI: &str = "margin:5px 0;";

pub const UL: &str = "padding-left:20px;margin:15px 0;";

pub const P: &str = "margin:15px 0;line-height:1.8;text-align:justify;";

/// Tag prefixes that open a block the paragraph pass must leave alone.
pub const BLOCK_TAG_PREFIXES: &[&str] = &[
    "<h2",
    "<h3",
    "<blockquote",
    "<ul",
    "<ol",
    "<pre",
    "<hr",
    "<img",
];
