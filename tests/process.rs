//! Integration tests for the full Markdown / HTML pipelines.
//!
//! The WeChat endpoints are replaced by an in-process [`ImageHost`], so
//! these run offline and deterministically.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use wechat_press::pipeline::extract::extract_images;
use wechat_press::pipeline::frontmatter::split_frontmatter;
use wechat_press::pipeline::render::markdown_to_html;
use wechat_press::pipeline::rewrite::rewrite_image_sources;
use wechat_press::{
    parse_markdown_str, process_html_with, process_markdown_with, ImageError, ImageHost,
    PressError, PressProgressCallback, ResolvedLocation,
};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Hosts every upload at `https://mmbiz.qpic.cn/<n>/<filename>`; uploads whose
/// file name is listed in `reject` fail with a provider error.
#[derive(Default)]
struct FakeHost {
    reject: Vec<&'static str>,
    uploads: Mutex<Vec<String>>,
    downloads: Mutex<Vec<String>>,
}

impl FakeHost {
    fn rejecting(names: &[&'static str]) -> Self {
        Self {
            reject: names.to_vec(),
            ..Default::default()
        }
    }

    fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

impl ImageHost for FakeHost {
    async fn upload(
        &self,
        access_token: &str,
        bytes: Vec<u8>,
        filename: &str,
        _mime_type: &str,
    ) -> Result<String, PressError> {
        assert_eq!(access_token, "test-token");
        assert!(!bytes.is_empty());
        if self.reject.contains(&filename) {
            return Err(PressError::Provider {
                code: 40009,
                message: format!("invalid image size: {filename}"),
            });
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(filename.to_string());
        Ok(format!("https://mmbiz.qpic.cn/{}/{}", uploads.len(), filename))
    }

    async fn download_external(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, PressError> {
        if url.contains("404") {
            return Err(PressError::network(format!("download of {url} failed: HTTP 404")));
        }
        let mut downloads = self.downloads.lock().unwrap();
        downloads.push(url.to_string());
        let path = dest_dir.join(format!("downloaded_{}.png", downloads.len()));
        std::fs::write(&path, "remote").unwrap();
        Ok(path)
    }
}

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl PressProgressCallback for EventLog {
    fn on_upload_start(&self, total: usize) {
        self.0.lock().unwrap().push(format!("start {total}"));
    }
    fn on_image_uploaded(&self, index: usize, _total: usize, locator: &str, _url: &str) {
        self.0.lock().unwrap().push(format!("ok {index} {locator}"));
    }
    fn on_image_error(&self, index: usize, _total: usize, locator: &str, _error: &str) {
        self.0.lock().unwrap().push(format!("err {index} {locator}"));
    }
    fn on_upload_complete(&self, total: usize, uploaded: usize) {
        self.0.lock().unwrap().push(format!("done {uploaded}/{total}"));
    }
}

/// Write `files` (relative path → contents) under a fresh temp dir.
fn fixture(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (rel, contents) in files {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
    dir
}

fn img_count(html: &str) -> usize {
    html.matches("<img ").count()
}

// ── Offline stages ───────────────────────────────────────────────────────────

#[test]
fn docs_scenario_extract_and_render() {
    let body = "# skip\n\n![cap](./img/x.png)\n\nSome **bold** text.";

    let images = extract_images(body, Path::new("/docs"));
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].original_locator, "./img/x.png");
    assert_eq!(images[0].alt_text, "cap");
    assert_eq!(
        images[0].resolved_location,
        ResolvedLocation::File(PathBuf::from("/docs/img/x.png"))
    );

    let html = markdown_to_html(body);
    assert_eq!(img_count(&html), 1);
    let img_at = html.find(r#"<img src="./img/x.png""#).expect("image tag");
    let para = format!(
        r#"<p style="{}">Some <strong>bold</strong> text.</p>"#,
        wechat_press::styles::P
    );
    let para_at = html.find(&para).expect("paragraph");
    assert!(img_at < para_at);
}

#[test]
fn n_images_in_n_tags_out_in_order() {
    let body = "intro ![a](a.png) and ![](b.png)\n\n- item\n\n![c](https://x.io/c.jpg)\n\n```\n![not](code.png)\n```";
    let images = extract_images(body, Path::new("/base"));
    let html = markdown_to_html(body);

    // The fenced block still contains image markup, so it is counted by the
    // extractor; the renderer stashes it as code instead of an <img>.
    let locators: Vec<_> = images.iter().map(|i| i.original_locator.as_str()).collect();
    assert_eq!(locators, ["a.png", "b.png", "https://x.io/c.jpg", "code.png"]);
    assert_eq!(img_count(&html), 3);

    let mut cursor = 0;
    for locator in &locators[..3] {
        let at = html[cursor..]
            .find(&format!(r#"src="{locator}""#))
            .unwrap_or_else(|| panic!("{locator} missing or out of order"));
        cursor += at;
    }
}

#[test]
fn rendering_is_idempotent() {
    let body = "## Title\n\nText with *em* and [link](https://a.b)\n\n1. one\n2. two\n\n> quote";
    assert_eq!(markdown_to_html(body), markdown_to_html(body));
}

#[test]
fn frontmatter_split_preserves_body_exactly() {
    let body = "\n# Heading\n\nparagraph  with  spaces\n---\ntrailing\n";
    let text = format!("---\ntitle: T\ntags:\n- a\n---\n{body}");
    let (meta, rest) = split_frontmatter(&text);
    assert_eq!(rest, body);
    assert_eq!(meta.get("title").map(String::as_str), Some("T"));
    assert!(!meta.contains_key("- a"));
}

#[test]
fn rewrite_of_repeated_locator() {
    let html = r#"<img src="a.png"><p>x</p><img src="a.png">"#;
    let mapping = [("a.png".to_string(), "https://host/a.png".to_string())]
        .into_iter()
        .collect();
    let out = rewrite_image_sources(html, &mapping);
    assert_eq!(out.matches(r#"src="https://host/a.png""#).count(), 2);
    assert!(!out.contains(r#"src="a.png""#));
}

#[test]
fn parse_without_frontmatter_uses_heading() {
    let article = parse_markdown_str("# From Heading\n\n![c](c.png)", Path::new("/p"));
    assert_eq!(article.title, "From Heading");
    assert_eq!(
        article.cover_image,
        Some(ResolvedLocation::File(PathBuf::from("/p/c.png")))
    );
}

// ── Markdown pipeline ────────────────────────────────────────────────────────

#[tokio::test]
async fn one_failed_upload_leaves_others_rewritten() {
    let dir = fixture(&[
        ("img/a.png", "a"),
        ("img/b.png", "b"),
        ("img/c.png", "c"),
        (
            "post.md",
            "---\ntitle: Three\ndescription: d\n---\n![](img/a.png)\n\n![](img/b.png)\n\n![](img/c.png)\n",
        ),
    ]);
    let host = FakeHost::rejecting(&["b.png"]);

    let out = process_markdown_with(dir.path().join("post.md"), &host, "test-token", None)
        .await
        .unwrap();

    assert_eq!(out.title, "Three");
    assert_eq!(out.summary, "d");
    assert_eq!(out.images_uploaded, 2);
    assert_eq!(host.uploaded(), ["a.png", "c.png"]);
    assert!(out.html.contains(r#"src="https://mmbiz.qpic.cn/1/a.png""#));
    assert!(out.html.contains(r#"src="img/b.png""#));
    assert!(out.html.contains(r#"src="https://mmbiz.qpic.cn/2/c.png""#));
    assert_eq!(
        out.cover_image_url.as_deref(),
        Some("https://mmbiz.qpic.cn/1/a.png")
    );
    assert!(matches!(
        out.images[1].error,
        Some(ImageError::UploadFailed { code: 40009, .. })
    ));
}

#[tokio::test]
async fn missing_images_skipped_and_reported() {
    let dir = fixture(&[
        ("here.png", "x"),
        ("post.md", "![gone](gone.png)\n\n![here](here.png)"),
    ]);
    let host = FakeHost::default();
    let log = EventLog::default();

    let out = process_markdown_with(dir.path().join("post.md"), &host, "test-token", Some(&log))
        .await
        .unwrap();

    assert_eq!(out.images_uploaded, 1);
    assert!(out.cover_image_url.is_none(), "cover image was the missing one");
    assert!(matches!(out.images[0].error, Some(ImageError::NotFound { .. })));
    assert_eq!(
        *log.0.lock().unwrap(),
        ["start 2", "err 1 gone.png", "ok 2 here.png", "done 1/2"]
    );
}

#[tokio::test]
async fn duplicate_locators_uploaded_once() {
    let dir = fixture(&[("a.png", "x"), ("post.md", "![1](a.png)\n\n![2](a.png)")]);
    let host = FakeHost::default();

    let out = process_markdown_with(dir.path().join("post.md"), &host, "test-token", None)
        .await
        .unwrap();

    assert_eq!(host.uploaded().len(), 1);
    assert_eq!(out.images.len(), 1);
    assert_eq!(out.html.matches("https://mmbiz.qpic.cn/1/a.png").count(), 2);
}

#[tokio::test]
async fn remote_markdown_images_rehosted_hosted_ones_kept() {
    let dir = fixture(&[(
        "post.md",
        "![r](https://cdn.site/r.png)\n\n![h](https://mmbiz.qpic.cn/already)\n\n![bad](https://cdn.site/404.png)",
    )]);
    let host = FakeHost::default();

    let out = process_markdown_with(dir.path().join("post.md"), &host, "test-token", None)
        .await
        .unwrap();

    assert_eq!(*host.downloads.lock().unwrap(), ["https://cdn.site/r.png"]);
    assert_eq!(out.images_uploaded, 1);
    assert!(out.html.contains(r#"src="https://mmbiz.qpic.cn/1/downloaded_1.png""#));
    assert!(out.html.contains(r#"src="https://mmbiz.qpic.cn/already""#));
    assert!(out.html.contains(r#"src="https://cdn.site/404.png""#));
    assert!(matches!(
        out.images[1].error,
        Some(ImageError::DownloadFailed { .. })
    ));
}

#[tokio::test]
async fn missing_article_is_fatal() {
    let host = FakeHost::default();
    let err = process_markdown_with("/no/such/post.md", &host, "test-token", None)
        .await
        .unwrap_err();
    assert!(matches!(err, PressError::ResourceNotFound { .. }));
}

// ── HTML pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn html_article_body_title_and_images() {
    let dir = fixture(&[
        ("pics/local.png", "l"),
        (
            "page.html",
            r#"<!DOCTYPE html><html><head><title>Page Title</title></head>
<body><h1>H</h1><img src="pics/local.png"><img src='https://cdn.site/r.jpg'>
<img src="https://mmbiz.qpic.cn/k"><img src="data:image/png;base64,AA"></body></html>"#,
        ),
    ]);
    let host = FakeHost::default();
    let events = Arc::new(EventLog::default());

    let out = process_html_with(
        dir.path().join("page.html"),
        &host,
        "test-token",
        Some(events.as_ref()),
    )
    .await
    .unwrap();

    assert_eq!(out.title, "Page Title");
    assert_eq!(out.summary, "");
    assert!(out.html.starts_with("<h1>H</h1>"));
    assert!(!out.html.contains("<title>"));
    assert_eq!(out.images_uploaded, 2);
    assert!(out.html.contains(r#"src="https://mmbiz.qpic.cn/1/local.png""#));
    assert!(out.html.contains("src='https://mmbiz.qpic.cn/2/downloaded_1.png'"));
    assert!(out.html.contains(r#"src="https://mmbiz.qpic.cn/k""#));
    assert!(out.html.contains("data:image/png;base64,AA"));
    assert_eq!(events.0.lock().unwrap()[0], "start 2");
}

#[tokio::test]
async fn html_without_title_is_untitled() {
    let dir = fixture(&[("bare.html", "<p>no images</p>")]);
    let host = FakeHost::default();
    let out = process_html_with(dir.path().join("bare.html"), &host, "test-token", None)
        .await
        .unwrap();
    assert_eq!(out.title, "Untitled");
    assert_eq!(out.html, "<p>no images</p>");
    assert!(out.images.is_empty());
}
