//! Concurrent resource downloader
//!
//! Resource batches are fetched by a bounded pool of workers. Each worker fetches one
//! URL and streams the body to its mapped path; results flow back to the single
//! driver task, which is the only writer of the frontier.

use crate::crawler::{CrawlScope, Fetcher, Frontier};
use crate::rewrite::{extract_css_refs, ContentKind};
use crate::state::{FailureReason, Resolution};
use crate::storage::{
    copy_file, create_file, finish_file, image_file_name, read_text, to_local_path, write_chunk,
    LocalPath,
};
use crate::url::{is_image_url, is_stylesheet_url, normalize, UrlKind};
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of one resource download
#[derive(Debug)]
pub struct DownloadResult {
    pub url: Url,
    pub outcome: DownloadOutcome,
}

#[derive(Debug)]
pub enum DownloadOutcome {
    Saved {
        path: LocalPath,
        /// URL after redirects
        final_url: Url,
        bytes: u64,
        /// Stylesheets are scanned for further references
        kind: ContentKind,
        /// Copy in the flat image folder, for images
        image_copy: Option<PathBuf>,
    },
    Failed(FailureReason),
}

impl DownloadResult {
    fn failed(url: Url, reason: FailureReason) -> Self {
        Self {
            url,
            outcome: DownloadOutcome::Failed(reason),
        }
    }
}

/// Counts from one batch, including its stylesheet follow-ups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub saved: usize,
    pub failed: usize,
    pub skipped: usize,
    /// References admitted from downloaded stylesheets
    pub discovered: usize,
    /// Images also copied into the flat image folder
    pub images_collected: usize,
}

/// Bounded-parallelism resource fetcher
#[derive(Debug, Clone)]
pub struct Downloader {
    fetcher: Fetcher,
    output_root: PathBuf,
    max_workers: usize,
    batch_size: usize,
    /// Sleep before each worker's request
    resource_delay: Duration,
    /// Sleep after each (sub-)batch
    batch_delay: Duration,
    images_dir: Option<PathBuf>,
}

impl Downloader {
    pub fn new(
        fetcher: Fetcher,
        output_root: PathBuf,
        max_workers: usize,
        resource_delay: Duration,
        batch_delay: Duration,
    ) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            fetcher,
            output_root,
            max_workers,
            batch_size: max_workers * 2,
            resource_delay,
            batch_delay,
            images_dir: None,
        }
    }

    /// Also copies every downloaded image into `dir`, flat
    pub fn with_images_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.images_dir = dir;
        self
    }

    /// Downloads one batch from the frontier's resource queue
    ///
    /// # Flow
    ///
    /// 1. Take up to `batch_size` resources from the queue
    /// 2. Resolve URLs that are out of scope as skipped, without a request
    /// 3. Fetch the rest with at most `max_workers` in flight, applying each result
    ///    as soon as it completes
    /// 4. References found in downloaded stylesheets form the next sub-batch,
    ///    repeated until none are left
    ///
    /// Cancellation is checked before each sub-batch; resources not yet dispatched
    /// go back to the front of the queue.
    pub async fn run_batch(
        &self,
        frontier: &mut Frontier,
        scope: &CrawlScope,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut queue: VecDeque<Url> = frontier.next_resource_batch(self.batch_size).into();

        while !queue.is_empty() {
            if cancel.is_cancelled() {
                frontier.requeue_resources(queue.drain(..));
                break;
            }

            let take = self.batch_size.min(queue.len());
            let chunk: Vec<Url> = queue.drain(..take).collect();
            let discovered = self.download_chunk(frontier, scope, chunk, &mut report).await;
            report.discovered += discovered.len();
            queue.extend(discovered);

            sleep_unless_cancelled(self.batch_delay, cancel).await;
        }

        report
    }

    async fn download_chunk(
        &self,
        frontier: &mut Frontier,
        scope: &CrawlScope,
        chunk: Vec<Url>,
        report: &mut BatchReport,
    ) -> Vec<Url> {
        let mut dispatch = Vec::with_capacity(chunk.len());
        for url in chunk {
            let target = scope.classify(url, UrlKind::Resource);
            match scope.check(&target) {
                Some(reason) => {
                    if reason == FailureReason::RobotsDisallowed {
                        info!("Skipping resource disallowed by robots.txt: {}", target.url);
                    } else {
                        debug!("Skipping resource {}: {}", target.url, reason);
                    }
                    report.skipped += 1;
                    frontier.resolve(target.url, Resolution::Failed(reason));
                }
                None => {
                    frontier.begin_fetch(&target.url);
                    dispatch.push(target.url);
                }
            }
        }

        if dispatch.is_empty() {
            return Vec::new();
        }

        info!(
            "Downloading {} resources ({} workers)",
            dispatch.len(),
            self.max_workers.min(dispatch.len())
        );

        let mut discovered = Vec::new();
        let mut results = stream::iter(dispatch)
            .map(|url| self.download(url))
            .buffer_unordered(self.max_workers);

        while let Some(result) = results.next().await {
            discovered.extend(self.apply(frontier, result, report).await);
        }

        discovered
    }

    /// Records one result; returns newly admitted stylesheet references
    async fn apply(
        &self,
        frontier: &mut Frontier,
        result: DownloadResult,
        report: &mut BatchReport,
    ) -> Vec<Url> {
        let DownloadResult { url, outcome } = result;

        match outcome {
            DownloadOutcome::Saved {
                path,
                final_url,
                bytes,
                kind,
                image_copy,
            } => {
                report.saved += 1;
                match image_copy {
                    Some(copy) => {
                        report.images_collected += 1;
                        info!(
                            "Saved image {} -> {} ({} bytes, copy at {})",
                            url,
                            path,
                            bytes,
                            copy.display()
                        );
                    }
                    None => {
                        let label = if is_image_url(&url) { "image" } else { "resource" };
                        info!("Saved {} {} -> {} ({} bytes)", label, url, path, bytes);
                    }
                }

                frontier.resolve(url.clone(), Resolution::Resolved(path.clone()));
                frontier.record_content(&url, kind);
                frontier.record_final_url(&url, final_url.clone());

                if kind != ContentKind::Stylesheet {
                    return Vec::new();
                }
                match read_text(path.as_path()).await {
                    Ok(css) => extract_css_refs(&css)
                        .iter()
                        .filter_map(|raw| normalize(&final_url, raw))
                        .filter(|found| frontier.admit(found.clone(), UrlKind::Resource))
                        .collect(),
                    Err(e) => {
                        warn!("Could not scan stylesheet {}: {}", path, e);
                        Vec::new()
                    }
                }
            }
            DownloadOutcome::Failed(reason) => {
                report.failed += 1;
                warn!("Failed to download {}: {}", url, reason);
                frontier.resolve(url, Resolution::Failed(reason));
                Vec::new()
            }
        }
    }

    /// Worker body: fetch one resource and stream it to disk
    pub async fn download(&self, url: Url) -> DownloadResult {
        if !self.resource_delay.is_zero() {
            tokio::time::sleep(self.resource_delay).await;
        }

        let path = match to_local_path(&self.output_root, &url) {
            Ok(path) => path,
            Err(e) => return DownloadResult::failed(url, FailureReason::Filesystem(e.to_string())),
        };

        let fetched = match self.fetcher.fetch(&url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                let reason = e.to_failure_reason();
                return DownloadResult::failed(url, reason);
            }
        };

        let content_type = fetched.content_type();
        let kind = if is_stylesheet_url(&url) || is_stylesheet_url(&fetched.final_url) {
            ContentKind::Stylesheet
        } else {
            match content_type.as_deref() {
                Some(ct) => ContentKind::from_content_type(ct),
                None => ContentKind::from_path(&path),
            }
        };
        let is_image = is_image_url(&url)
            || content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("image/"));
        let final_url = fetched.final_url;
        let mut response = fetched.response;

        let mut file = match create_file(path.as_path()).await {
            Ok(file) => file,
            Err(e) => return DownloadResult::failed(url, FailureReason::Filesystem(e.to_string())),
        };

        let mut bytes: u64 = 0;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if let Err(e) = write_chunk(&mut file, path.as_path(), &chunk).await {
                        discard_partial(&path).await;
                        return DownloadResult::failed(url, FailureReason::Filesystem(e.to_string()));
                    }
                    bytes += chunk.len() as u64;
                }
                Ok(None) => break,
                Err(e) => {
                    discard_partial(&path).await;
                    return DownloadResult::failed(url, FailureReason::Network(e.to_string()));
                }
            }
        }

        if let Err(e) = finish_file(file, path.as_path()).await {
            return DownloadResult::failed(url, FailureReason::Filesystem(e.to_string()));
        }

        let image_copy = match (&self.images_dir, is_image) {
            (Some(dir), true) => {
                self.collect_image(&url, content_type.as_deref(), &path, dir)
                    .await
            }
            _ => None,
        };

        DownloadResult {
            url,
            outcome: DownloadOutcome::Saved {
                path,
                final_url,
                bytes,
                kind,
                image_copy,
            },
        }
    }

    /// Copies a saved image into the flat image folder
    ///
    /// A failed copy is logged; the mirrored file itself is unaffected. Images whose
    /// names collide overwrite each other.
    async fn collect_image(
        &self,
        url: &Url,
        content_type: Option<&str>,
        path: &LocalPath,
        dir: &Path,
    ) -> Option<PathBuf> {
        let target = dir.join(image_file_name(url, content_type));
        match copy_file(path.as_path(), &target).await {
            Ok(_) => Some(target),
            Err(e) => {
                warn!("Could not copy image {} into {}: {}", url, dir.display(), e);
                None
            }
        }
    }
}

async fn discard_partial(path: &LocalPath) {
    if let Err(e) = tokio::fs::remove_file(path.as_path()).await {
        debug!("Could not remove partial file {}: {}", path, e);
    }
}

/// Sleeps for `duration`, returning early if `cancel` fires
pub(crate) async fn sleep_unless_cancelled(duration: Duration, cancel: &CancellationToken) {
    if duration.is_zero() {
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = cancel.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robots::RobotsPolicy;
    use crate::url::OriginPolicy;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader(root: &std::path::Path) -> Downloader {
        let fetcher = Fetcher::from_settings("TestBot/1.0", Duration::from_secs(5)).unwrap();
        Downloader::new(fetcher, root.to_path_buf(), 2, Duration::ZERO, Duration::ZERO)
    }

    fn scope_for(server: &MockServer) -> CrawlScope {
        let base = Url::parse(&server.uri()).unwrap();
        CrawlScope::new(
            OriginPolicy::with_default_cdns(base.host_str().unwrap()),
            true,
            RobotsPolicy::AllowAll,
            "TestBot/1.0",
        )
    }

    #[tokio::test]
    async fn test_download_streams_to_mapped_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/a.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 3000]))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = Url::parse(&format!("{}/img/a.png", server.uri())).unwrap();
        let result = downloader(dir.path()).download(url.clone()).await;

        match result.outcome {
            DownloadOutcome::Saved {
                path,
                bytes,
                kind,
                image_copy,
                ..
            } => {
                assert_eq!(path, to_local_path(dir.path(), &url).unwrap());
                assert_eq!(bytes, 3000);
                assert_eq!(kind, ContentKind::Other);
                assert_eq!(image_copy, None);
                assert_eq!(std::fs::read(path.as_path()).unwrap().len(), 3000);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_download_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = Url::parse(&format!("{}/gone.png", server.uri())).unwrap();
        let result = downloader(dir.path()).download(url.clone()).await;

        assert!(matches!(
            result.outcome,
            DownloadOutcome::Failed(FailureReason::Http(404))
        ));
        assert!(!to_local_path(dir.path(), &url).unwrap().as_path().exists());
    }

    #[tokio::test]
    async fn test_css_detected_by_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/theme"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("body{}", "text/css; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = Url::parse(&format!("{}/theme", server.uri())).unwrap();
        let result = downloader(dir.path()).download(url).await;

        assert!(matches!(
            result.outcome,
            DownloadOutcome::Saved {
                kind: ContentKind::Stylesheet,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_image_copied_into_flat_folder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/icons/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/png"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/avatar"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![4u8, 5], "image/webp"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/app.js"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("let x;", "application/javascript"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let images = dir.path().join("images");
        let dl = downloader(dir.path()).with_images_dir(Some(images.clone()));

        let logo = Url::parse(&format!("{}/img/icons/logo.png", server.uri())).unwrap();
        match dl.download(logo).await.outcome {
            DownloadOutcome::Saved { image_copy, .. } => {
                assert_eq!(image_copy, Some(images.join("logo.png")));
                assert_eq!(std::fs::read(images.join("logo.png")).unwrap(), vec![1u8, 2, 3]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let avatar = Url::parse(&format!("{}/avatar", server.uri())).unwrap();
        let expected = images.join(image_file_name(&avatar, Some("image/webp")));
        match dl.download(avatar).await.outcome {
            DownloadOutcome::Saved { image_copy, .. } => {
                assert_eq!(image_copy, Some(expected.clone()));
                assert!(expected.to_string_lossy().ends_with(".webp"));
                assert!(expected.exists());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let script = Url::parse(&format!("{}/app.js", server.uri())).unwrap();
        assert!(matches!(
            dl.download(script).await.outcome,
            DownloadOutcome::Saved {
                image_copy: None,
                ..
            }
        ));
        assert_eq!(std::fs::read_dir(&images).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_batch_follows_stylesheet_references() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/style.css"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(
                        "@import 'extra.css'; body{background:url(bg.png)}",
                        "text/css",
                    ),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/extra.css"))
            .respond_with(ResponseTemplate::new(200).set_body_string("p{background:url(bg.png)}"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bg.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let start = Url::parse(&format!("{}/", server.uri())).unwrap();
        let css = start.join("style.css").unwrap();
        let mut frontier = Frontier::new(start.clone(), 10);
        frontier.enqueue(css.clone(), UrlKind::Resource);

        let report = downloader(dir.path())
            .run_batch(&mut frontier, &scope_for(&server), &CancellationToken::new())
            .await;

        assert_eq!(report.saved, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.discovered, 2);
        assert_eq!(report.images_collected, 0);
        assert!(!frontier.has_pending_resources());
        assert!(frontier
            .resolution(&start.join("bg.png").unwrap())
            .is_some_and(Resolution::is_resolved));
    }

    #[tokio::test]
    async fn test_cross_origin_resource_skipped() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let start = Url::parse(&format!("{}/", server.uri())).unwrap();
        let foreign = Url::parse("https://tracker.invalid/pixel.gif").unwrap();
        let mut frontier = Frontier::new(start, 10);
        frontier.enqueue(foreign.clone(), UrlKind::Resource);

        let report = downloader(dir.path())
            .run_batch(&mut frontier, &scope_for(&server), &CancellationToken::new())
            .await;

        assert_eq!(report.skipped, 1);
        assert_eq!(
            frontier.resolution(&foreign),
            Some(&Resolution::Failed(FailureReason::CrossOrigin))
        );
        assert_eq!(frontier.fetch_attempts(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_batch_requeues() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let start = Url::parse(&format!("{}/", server.uri())).unwrap();
        let mut frontier = Frontier::new(start.clone(), 10);
        frontier.enqueue(start.join("a.png").unwrap(), UrlKind::Resource);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = downloader(dir.path())
            .run_batch(&mut frontier, &scope_for(&server), &cancel)
            .await;

        assert_eq!(report, BatchReport::default());
        assert!(frontier.has_pending_resources());
    }
}
