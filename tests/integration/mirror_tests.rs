//! Integration tests for the mirror
//!
//! These tests use wiremock to serve a small site and run both phases end-to-end
//! into a temporary output directory.

use site_mirror::config::MirrorConfig;
use site_mirror::storage::{image_file_name, images_dir_name, to_local_path};
use site_mirror::{mirror, MirrorStats};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

fn css(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/css")
}

fn png() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(vec![0x89u8, b'P', b'N', b'G'], "image/png")
}

async fn serve(server: &MockServer, at: &str, response: ResponseTemplate, times: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

/// Creates a test configuration that mirrors `start` into `output_dir`
fn test_config(start: &str, output_dir: &Path) -> MirrorConfig {
    let mut config = MirrorConfig::new(start);
    config.output_dir = output_dir.to_path_buf();
    config.delay = 0.0;
    config.timeout = 5.0;
    config.max_workers = 4;
    config.user_agent = Some("MirrorTestBot/1.0".to_string());
    config
}

/// Where a URL on the mock server lands on disk
fn local(server: &MockServer, dir: &TempDir, at: &str) -> PathBuf {
    let url = Url::parse(&format!("{}{}", server.uri(), at)).unwrap();
    to_local_path(dir.path(), &url).unwrap().into_path_buf()
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("{} should exist: {}", path.display(), e))
}

async fn run(config: MirrorConfig) -> MirrorStats {
    mirror(config, CancellationToken::new())
        .await
        .expect("mirror run failed")
}

#[tokio::test]
async fn test_mirror_small_site() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(
        &server,
        "/",
        html(
            r#"<html><head><link rel="stylesheet" href="/css/site.css"></head><body>
            <img src="/img/logo.png" alt="logo">
            <img src="https://tracker.invalid/pixel.gif">
            <a href="/about">About</a>
            </body></html>"#,
        ),
        1,
    )
    .await;
    serve(
        &server,
        "/about",
        html(r#"<html><body><img src="/img/logo.png"><a href="/">Home</a></body></html>"#),
        1,
    )
    .await;
    serve(
        &server,
        "/css/site.css",
        css("body { background: url(../img/bg.png); }"),
        1,
    )
    .await;
    serve(&server, "/img/logo.png", png(), 1).await;
    serve(&server, "/img/bg.png", png(), 1).await;

    let stats = run(test_config(&server.uri(), dir.path())).await;

    assert_eq!(stats.pages_saved, 2);
    assert_eq!(stats.resources_saved, 3);
    assert_eq!(stats.failed(), 0);
    assert_eq!(stats.skipped_cross_origin, 1);
    assert!(!stats.cancelled);

    let index = read(&local(&server, &dir, "/"));
    assert!(index.contains(r#"href="css/site.css""#), "{}", index);
    assert!(index.contains(r#"src="img/logo.png""#), "{}", index);
    assert!(index.contains(r#"href="about/index.html""#), "{}", index);
    assert!(index.contains("https://tracker.invalid/pixel.gif"));

    let about = read(&local(&server, &dir, "/about"));
    assert!(about.contains(r#"src="../img/logo.png""#), "{}", about);
    assert!(about.contains(r#"href="../index.html""#), "{}", about);

    let stylesheet = read(&local(&server, &dir, "/css/site.css"));
    assert!(stylesheet.contains(r#"url("../img/bg.png")"#), "{}", stylesheet);

    let logo = std::fs::read(local(&server, &dir, "/img/logo.png")).unwrap();
    assert_eq!(logo, vec![0x89u8, b'P', b'N', b'G']);
    assert!(local(&server, &dir, "/img/bg.png").exists());
}

#[tokio::test]
async fn test_page_budget() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(
        &server,
        "/",
        html(r#"<a href="/a">A</a><img src="/img/x.png">"#),
        1,
    )
    .await;
    serve(&server, "/a", html("<p>never</p>"), 0).await;
    serve(&server, "/img/x.png", png(), 1).await;

    let mut config = test_config(&server.uri(), dir.path());
    config.max_pages = 1;
    let stats = run(config).await;

    assert_eq!(stats.pages_saved, 1);
    assert_eq!(stats.resources_saved, 1);
    assert_eq!(stats.pages_unvisited, 1);

    let index = read(&local(&server, &dir, "/"));
    assert!(index.contains(r#"href="/a""#), "{}", index);
    assert!(index.contains(r#"src="img/x.png""#), "{}", index);
    assert!(!local(&server, &dir, "/a").exists());
}

#[tokio::test]
async fn test_shared_resource_fetched_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(
        &server,
        "/",
        html(r#"<img src="/shared.png"><a href="/one">1</a><a href="/two">2</a>"#),
        1,
    )
    .await;
    serve(&server, "/one", html(r#"<img src="/shared.png">"#), 1).await;
    serve(&server, "/two", html(r#"<img src="shared.png"><a href="/one">1</a>"#), 1).await;
    serve(&server, "/shared.png", png(), 1).await;

    let stats = run(test_config(&server.uri(), dir.path())).await;

    assert_eq!(stats.pages_saved, 3);
    assert_eq!(stats.resources_saved, 1);
    assert_eq!(stats.fetch_attempts, 4);
}

#[tokio::test]
async fn test_robots_disallow() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
        .mount(&server)
        .await;
    serve(
        &server,
        "/",
        html(r#"<a href="/private/page">secret</a><a href="/public">open</a>"#),
        1,
    )
    .await;
    serve(&server, "/private/page", html("<p>secret</p>"), 0).await;
    serve(&server, "/public", html("<p>open</p>"), 1).await;

    let stats = run(test_config(&server.uri(), dir.path())).await;

    assert_eq!(stats.pages_saved, 2);
    assert_eq!(stats.skipped_robots, 1);
    assert!(!local(&server, &dir, "/private/page").exists());

    let index = read(&local(&server, &dir, "/"));
    assert!(index.contains(r#"href="/private/page""#), "{}", index);
    assert!(index.contains(r#"href="public/index.html""#), "{}", index);
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .expect(0)
        .mount(&server)
        .await;
    serve(&server, "/", html("<p>home</p>"), 1).await;

    let mut config = test_config(&server.uri(), dir.path());
    config.obey_robots = false;
    let stats = run(config).await;

    assert_eq!(stats.pages_saved, 1);
    assert_eq!(stats.skipped_robots, 0);
}

#[tokio::test]
async fn test_missing_resource_keeps_original_reference() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(
        &server,
        "/",
        html(r#"<img src="/missing.png"><img src="/ok.png">"#),
        1,
    )
    .await;
    serve(&server, "/missing.png", ResponseTemplate::new(404), 1).await;
    serve(&server, "/ok.png", png(), 1).await;

    let stats = run(test_config(&server.uri(), dir.path())).await;

    assert_eq!(stats.resources_saved, 1);
    assert_eq!(stats.resources_failed, 1);

    let index = read(&local(&server, &dir, "/"));
    assert!(index.contains(r#"src="/missing.png""#), "{}", index);
    assert!(index.contains(r#"src="ok.png""#), "{}", index);
}

#[tokio::test]
async fn test_nested_page_uses_relative_paths() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(
        &server,
        "/blog/post/",
        html(r#"<img src="/img/a.png"><a href="/blog/">Blog</a>"#),
        1,
    )
    .await;
    serve(&server, "/blog/", html("<p>index</p>"), 1).await;
    serve(&server, "/img/a.png", png(), 1).await;

    let start = format!("{}/blog/post/", server.uri());
    let stats = run(test_config(&start, dir.path())).await;

    assert_eq!(stats.pages_saved, 2);

    let post = read(&local(&server, &dir, "/blog/post/"));
    assert!(post.contains(r#"src="../../img/a.png""#), "{}", post);
    assert!(post.contains(r#"href="../index.html""#), "{}", post);
}

#[tokio::test]
async fn test_redirected_page_resolves_against_final_url() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(&server, "/", html(r#"<a href="/old">Old</a>"#), 1).await;
    serve(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/new/"),
        1,
    )
    .await;
    serve(&server, "/new/", html(r#"<img src="pic.png"><a href="/">Home</a>"#), 1).await;
    serve(&server, "/new/pic.png", png(), 1).await;

    let stats = run(test_config(&server.uri(), dir.path())).await;

    assert_eq!(stats.pages_saved, 2);
    assert_eq!(stats.resources_saved, 1);

    let moved = read(&local(&server, &dir, "/old"));
    assert!(moved.contains(r#"src="../new/pic.png""#), "{}", moved);
    assert!(moved.contains(r#"href="../index.html""#), "{}", moved);
}

#[tokio::test]
async fn test_page_linking_to_its_redirect_target_fetched_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(
        &server,
        "/docs",
        ResponseTemplate::new(301).insert_header("location", "/docs/"),
        1,
    )
    .await;
    serve(
        &server,
        "/docs/",
        html(r#"<a href="/docs/">Docs</a><a href="/docs">Docs again</a>"#),
        1,
    )
    .await;

    let start = format!("{}/docs", server.uri());
    let stats = run(test_config(&start, dir.path())).await;

    assert_eq!(stats.pages_saved, 1);
    assert_eq!(stats.fetch_attempts, 1);
    assert_eq!(stats.pages_unvisited, 0);

    let docs = read(&local(&server, &dir, "/docs"));
    assert!(!docs.contains(r#"href="/docs/""#), "{}", docs);
}

#[tokio::test]
async fn test_stylesheet_without_extension_is_rewritten_as_css() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(
        &server,
        "/",
        html(r#"<html><head><link rel="stylesheet" href="/theme"></head><body></body></html>"#),
        1,
    )
    .await;
    serve(
        &server,
        "/theme",
        css("body { background: url(/img/bg.png); }"),
        1,
    )
    .await;
    serve(&server, "/img/bg.png", png(), 1).await;

    let stats = run(test_config(&server.uri(), dir.path())).await;

    assert_eq!(stats.resources_saved, 2);
    assert_eq!(stats.pages_rewritten, 1);
    assert_eq!(stats.stylesheets_rewritten, 1);

    let index = read(&local(&server, &dir, "/"));
    assert!(index.contains(r#"href="theme/index.html""#), "{}", index);

    let theme = read(&local(&server, &dir, "/theme"));
    assert!(theme.contains(r#"url("../img/bg.png")"#), "{}", theme);
    assert!(!theme.contains("/img/bg.png)"), "{}", theme);
}

#[tokio::test]
async fn test_images_collected_into_flat_folder() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(
        &server,
        "/",
        html(r#"<img src="/img/deep/logo.png"><img src="/photo"><script src="/app.js"></script>"#),
        1,
    )
    .await;
    serve(&server, "/img/deep/logo.png", png(), 1).await;
    serve(
        &server,
        "/photo",
        ResponseTemplate::new(200).set_body_raw(vec![0xffu8, 0xd8], "image/jpeg"),
        1,
    )
    .await;
    serve(
        &server,
        "/app.js",
        ResponseTemplate::new(200).set_body_raw("let x;", "application/javascript"),
        1,
    )
    .await;

    let stats = run(test_config(&server.uri(), dir.path())).await;

    let base = Url::parse(&server.uri()).unwrap();
    let images = dir.path().join(images_dir_name(&base).unwrap());
    assert_eq!(stats.images_collected, 2);
    assert_eq!(stats.images_dir.as_deref(), Some(images.as_path()));

    let logo = std::fs::read(images.join("logo.png")).unwrap();
    assert_eq!(logo, vec![0x89u8, b'P', b'N', b'G']);
    let photo = base.join("/photo").unwrap();
    assert!(images.join(image_file_name(&photo, Some("image/jpeg"))).exists());
    assert!(!images.join("app.js").exists());

    // The mirrored copies stay where pages reference them
    let index = read(&local(&server, &dir, "/"));
    assert!(index.contains(r#"src="img/deep/logo.png""#), "{}", index);
}

#[tokio::test]
async fn test_image_collection_disabled() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(&server, "/", html(r#"<img src="/logo.png">"#), 1).await;
    serve(&server, "/logo.png", png(), 1).await;

    let mut config = test_config(&server.uri(), dir.path());
    config.collect_images = false;
    let stats = run(config).await;

    let base = Url::parse(&server.uri()).unwrap();
    assert_eq!(stats.resources_saved, 1);
    assert_eq!(stats.images_collected, 0);
    assert_eq!(stats.images_dir, None);
    assert!(!dir.path().join(images_dir_name(&base).unwrap()).exists());
}

#[tokio::test]
async fn test_cancelled_run_fetches_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    serve(&server, "/", html("<p>home</p>"), 0).await;

    let mut config = test_config(&server.uri(), dir.path());
    config.obey_robots = false;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = mirror(config, cancel).await.unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.files_saved(), 0);
    assert_eq!(stats.fetch_attempts, 0);
}

#[tokio::test]
async fn test_invalid_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = test_config("ftp://example.com/", dir.path());

    assert!(mirror(config, CancellationToken::new()).await.is_err());
}
