//! CLI binary for wechat-press.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PressConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wechat_press::{
    clear_token_cache, parse_markdown_file, process_html, process_markdown, write_atomic,
    Credentials, PressConfig, PressProgressCallback, ProcessOutput, ProgressCallback,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over the article's distinct images, one log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Fetching access token…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Uploading");
    }
}

impl PressProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, total: usize) {
        self.activate_bar(total);
        if total > 0 {
            self.bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Uploading {total} images…"))
            ));
        }
    }

    fn on_image_start(&self, _index: usize, _total: usize, locator: &str) {
        self.bar.set_message(locator.to_string());
    }

    fn on_image_uploaded(&self, index: usize, total: usize, locator: &str, _url: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(locator)
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, index: usize, total: usize, locator: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            locator,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_upload_complete(&self, total: usize, uploaded: usize) {
        self.bar.finish_and_clear();
        if total == 0 {
            return;
        }
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} images uploaded", green("✔"), bold(&uploaded.to_string()));
        } else {
            eprintln!(
                "{} {}/{} images uploaded  ({} skipped)",
                if uploaded == 0 { red("✘") } else { cyan("⚠") },
                bold(&uploaded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Markdown → WeChat HTML on stdout
  wxpress process --markdown post.md

  # Write to a file
  wxpress process --markdown post.md -o post.html

  # Existing HTML page, full JSON summary
  wxpress process --html page.html --json

  # Offline preview (no credentials, no network)
  wxpress parse post.md
  wxpress parse post.md --html-only

  # Forget the cached access token
  wxpress clear-cache

ENVIRONMENT VARIABLES:
  WECHAT_APP_ID       Official Account AppID
  WECHAT_APP_SECRET   Official Account AppSecret
  RUST_LOG            Override log filtering (e.g. wechat_press=debug)

  Credentials are read from the environment first, then from the nearest
  .env file in the current directory or up to four parents.
"#;

/// Publish Markdown and HTML articles to WeChat Official Accounts.
#[derive(Parser, Debug)]
#[command(
    name = "wxpress",
    version,
    about = "Convert articles to WeChat-ready HTML and re-host their images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "WXPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "WXPRESS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload images and print WeChat-compatible HTML.
    Process(ProcessArgs),
    /// Parse a Markdown file offline and print its structure.
    Parse(ParseArgs),
    /// Delete the cached access token.
    ClearCache,
}

#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("input").required(true).args(["markdown", "html"]))]
struct ProcessArgs {
    /// Markdown article to process.
    #[arg(long)]
    markdown: Option<PathBuf>,

    /// HTML article to process.
    #[arg(long)]
    html: Option<PathBuf>,

    /// Write the result to this file instead of stdout.
    #[arg(short, long, env = "WXPRESS_OUTPUT")]
    output: Option<PathBuf>,

    /// Output the full JSON summary instead of just HTML.
    #[arg(long, env = "WXPRESS_JSON")]
    json: bool,

    /// Ignore the cached access token and request a new one.
    #[arg(long, env = "WXPRESS_FORCE_REFRESH")]
    force_refresh: bool,

    /// Disable progress bar.
    #[arg(long, env = "WXPRESS_NO_PROGRESS")]
    no_progress: bool,

    /// API base URL.
    #[arg(long, env = "WXPRESS_API_BASE", default_value = wechat_press::config::DEFAULT_API_BASE)]
    api_base: String,

    /// Token request timeout in seconds.
    #[arg(long, env = "WXPRESS_TOKEN_TIMEOUT", default_value_t = 30)]
    token_timeout: u64,

    /// Per-image upload timeout in seconds.
    #[arg(long, env = "WXPRESS_UPLOAD_TIMEOUT", default_value_t = 120)]
    upload_timeout: u64,

    /// Remote image download timeout in seconds.
    #[arg(long, env = "WXPRESS_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct ParseArgs {
    /// Markdown file to parse.
    file: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: ParseFormat,

    /// Output only the rendered HTML.
    #[arg(long)]
    html_only: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ParseFormat {
    Json,
    Html,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs while it is active.
    let show_progress = match &cli.command {
        Command::Process(args) => !cli.quiet && !args.no_progress && !args.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Process(ref args) => run_process(args, cli.quiet, show_progress).await,
        Command::Parse(ref args) => run_parse(args),
        Command::ClearCache => {
            clear_token_cache(&PressConfig::default()).context("Failed to clear token cache")?;
            if !cli.quiet {
                println!("Token cache cleared.");
            }
            Ok(())
        }
    }
}

async fn run_process(args: &ProcessArgs, quiet: bool, show_progress: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PressProgressCallback>)
    } else {
        None
    };
    let config = build_config(args, progress)?;

    let output = match (&args.markdown, &args.html) {
        (Some(path), _) => process_markdown(path, &config)
            .await
            .with_context(|| format!("Failed to process {}", path.display()))?,
        (None, Some(path)) => process_html(path, &config)
            .await
            .with_context(|| format!("Failed to process {}", path.display()))?,
        (None, None) => anyhow::bail!("Either --markdown or --html is required"),
    };

    let rendered = if args.json {
        serde_json::to_string_pretty(&output).context("Failed to serialise output")?
    } else {
        output.html.clone()
    };

    match &args.output {
        Some(path) => {
            write_atomic(path, &rendered).await?;
            if !quiet {
                print_summary(&output, path);
            }
        }
        None => write_stdout(&rendered)?,
    }
    Ok(())
}

fn run_parse(args: &ParseArgs) -> Result<()> {
    let article = parse_markdown_file(&args.file)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;

    if args.html_only || args.format == ParseFormat::Html {
        write_stdout(&article.html)
    } else {
        let json = serde_json::to_string_pretty(&article).context("Failed to serialise article")?;
        write_stdout(&json)
    }
}

/// Map CLI args to `PressConfig`.
fn build_config(args: &ProcessArgs, progress: Option<ProgressCallback>) -> Result<PressConfig> {
    let credentials = Credentials::from_env().context("Cannot authenticate with WeChat")?;

    let mut builder = PressConfig::builder()
        .api_base(args.api_base.clone())
        .token_timeout_secs(args.token_timeout)
        .upload_timeout_secs(args.upload_timeout)
        .download_timeout_secs(args.download_timeout)
        .force_refresh(args.force_refresh)
        .credentials(credentials);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &ProcessOutput, path: &Path) {
    eprintln!("{}  saved to {}", green("✔"), bold(&path.display().to_string()));
    eprintln!("   title: {}", output.title);
    eprintln!("   images uploaded: {}", output.images_uploaded);
    for failed in output.failed_images() {
        if let Some(ref e) = failed.error {
            eprintln!("   {} {}  {}", red("✗"), failed.locator, dim(&e.to_string()));
        }
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}
