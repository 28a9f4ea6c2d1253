//! Pipeline stages for turning an article into WeChat-ready HTML.
//!
//! Each submodule implements exactly one transformation step and is
//! independently testable.
//!
//! ## Data Flow
//!
//! ```text
//!               ┌──▶ extract ──▶ upload ──┐
//! frontmatter ──┤                         ├──▶ rewrite
//!               └──▶ render  ─────────────┘
//! ```
//!
//! 1. [`frontmatter`]: split the `---` metadata block from the body
//! 2. [`extract`]    : list every image reference and resolve it once
//! 3. [`render`]     : ordered Markdown → HTML substitutions
//! 4. [`upload`]     : host each distinct image; the only stage with network I/O
//! 5. [`rewrite`]    : swap original locators for hosted URLs
//!
//! [`html`] replaces stages 1–3 when the input is already HTML.

pub mod extract;
pub mod frontmatter;
pub mod html;
pub mod render;
pub mod rewrite;
pub mod upload;
