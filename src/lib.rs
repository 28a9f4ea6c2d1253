//! # wechat-press
//!
//! Turn Markdown (or existing HTML) articles into HTML that the WeChat
//! Official Account editor accepts, with every image re-hosted on WeChat's
//! image service.
//!
//! ## Pipeline Overview
//!
//! ```text
//! article.md
//!  │
//!  ├─ 1. Split    strip the `---` frontmatter block (title, description)
//!  ├─ 2. Extract  list `![alt](locator)` images, resolve each once
//!  ├─ 3. Render   ordered regex substitutions → inline-styled HTML
//!  ├─ 4. Upload   one multipart request per distinct image, in order
//!  └─ 5. Rewrite  src="locator" → src="https://mmbiz.qpic.cn/…"
//! ```
//!
//! Uploading needs an access token. Tokens are cached in
//! `~/.wechat_token_cache.json` and reused while at least five minutes of
//! their lifetime remain (see [`token`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wechat_press::{process_markdown, Credentials, PressConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // WECHAT_APP_ID / WECHAT_APP_SECRET from the environment or a .env file
//!     let config = PressConfig::builder()
//!         .credentials(Credentials::from_env()?)
//!         .build()?;
//!     let output = process_markdown("article.md", &config).await?;
//!     println!("{}", output.html);
//!     eprintln!("{} images uploaded", output.images_uploaded);
//!     Ok(())
//! }
//! ```
//!
//! Offline preview, no credentials needed:
//!
//! ```rust,no_run
//! let article = wechat_press::parse_markdown_file("article.md")?;
//! println!("{} ({} images)", article.title, article.images.len());
//! # Ok::<(), wechat_press::PressError>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `wxpress` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! wechat-press = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod article;
pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod styles;
pub mod token;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use article::{parse_markdown_file, parse_markdown_str, ParsedArticle};
pub use client::WeChatClient;
pub use config::{Credentials, PressConfig, PressConfigBuilder};
pub use error::{ImageError, PressError};
pub use output::{ImageOutcome, ProcessOutput};
pub use pipeline::extract::{ImageReference, ResolvedLocation};
pub use pipeline::upload::ImageHost;
pub use process::{
    clear_token_cache, process_html, process_html_sync, process_html_with, process_markdown,
    process_markdown_sync, process_markdown_with, write_atomic,
};
pub use progress::{NoopProgressCallback, PressProgressCallback, ProgressCallback};
pub use token::{CachedToken, FileTokenCache, MemoryTokenCache, TokenCache, TokenManager};
