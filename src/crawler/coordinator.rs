//! Crawler coordinator - the frontier driver
//!
//! This module contains the two-phase run:
//! - Crawl: pages are fetched one at a time and always before resources; resource
//!   batches are handed to the downloader whenever no page is eligible
//! - Rewrite: once the frontier is drained (or the run is cancelled), every saved page
//!   and stylesheet is rewritten against the finished URL map

use crate::config::{validate, MirrorConfig};
use crate::crawler::downloader::sleep_unless_cancelled;
use crate::crawler::{extract_references, CrawlScope, Downloader, FetchError, Fetcher, Frontier};
use crate::output::MirrorStats;
use crate::rewrite::{ContentKind, Rewriter};
use crate::robots::{fetch_robots, RobotsPolicy};
use crate::state::{FailureReason, Resolution};
use crate::storage::{to_local_path, write_file, StorageError};
use crate::url::{parse_start_url, OriginPolicy, UrlKind};
use crate::Result;
use chrono::Local;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Main mirror coordinator structure
pub struct Coordinator {
    config: MirrorConfig,
    start_url: Url,
    fetcher: Fetcher,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the HTTP client cannot be built.
    pub fn new(config: MirrorConfig) -> Result<Self> {
        validate(&config)?;
        let start_url = parse_start_url(&config.start_url)?;
        let fetcher = Fetcher::from_settings(config.user_agent(), config.request_timeout())?;

        Ok(Self {
            config,
            start_url,
            fetcher,
        })
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    /// Checks that the start URL answers with a 2xx, following redirects
    ///
    /// Returns the URL the start page is served from.
    pub async fn probe(&self) -> std::result::Result<Url, FetchError> {
        let fetched = self.fetcher.fetch(&self.start_url).await?;
        Ok(fetched.final_url)
    }

    /// Runs the crawl and rewrite phases
    ///
    /// Per-URL failures are recorded and never abort the run. Cancelling `cancel`
    /// stops the crawl at the next poll point; the rewrite pass still runs over what
    /// was saved.
    ///
    /// # Errors
    ///
    /// Only if the output directory cannot be created.
    pub async fn run(self, cancel: CancellationToken) -> Result<MirrorStats> {
        let started_at = Local::now();
        let output_root = self.config.output_dir.clone();

        tokio::fs::create_dir_all(&output_root)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: output_root.clone(),
                source,
            })?;

        tracing::info!(
            "Mirroring {} into {} (max {} pages, {} workers)",
            self.start_url,
            output_root.display(),
            self.config.max_pages,
            self.config.max_workers
        );

        let robots = if self.config.obey_robots {
            fetch_robots(&self.fetcher, &self.start_url).await
        } else {
            tracing::info!("robots.txt compliance disabled");
            RobotsPolicy::AllowAll
        };

        let base_host = self.start_url.host_str().unwrap_or_default();
        let origin = OriginPolicy::new(base_host, self.config.cdn_patterns.clone());
        let scope = CrawlScope::new(
            origin,
            self.config.same_domain_only,
            robots,
            self.config.user_agent(),
        );

        let images_dir = self.config.image_collection_dir(&self.start_url)?;
        if let Some(dir) = &images_dir {
            tracing::info!("Copying downloaded images into {}", dir.display());
        }

        let downloader = Downloader::new(
            self.fetcher.clone(),
            output_root.clone(),
            self.config.max_workers,
            self.config.resource_delay(),
            self.config.page_delay(),
        )
        .with_images_dir(images_dir.clone());

        let mut frontier = Frontier::new(self.start_url.clone(), self.config.max_pages);
        let mut cancelled = false;
        let mut images_collected = 0;

        loop {
            if cancel.is_cancelled() {
                tracing::warn!("Cancellation requested, stopping crawl");
                cancelled = true;
                break;
            }

            if let Some(url) = frontier.next_page() {
                let fetched = self
                    .process_page(&mut frontier, &scope, &output_root, url)
                    .await;
                if fetched {
                    sleep_unless_cancelled(self.config.page_delay(), &cancel).await;
                }
                continue;
            }

            if frontier.has_pending_resources() {
                let report = downloader.run_batch(&mut frontier, &scope, &cancel).await;
                tracing::debug!(
                    "Batch done: {} saved, {} failed, {} skipped, {} found in stylesheets",
                    report.saved,
                    report.failed,
                    report.skipped,
                    report.discovered
                );
                images_collected += report.images_collected;
                continue;
            }

            break;
        }

        let counts = frontier.counts();
        tracing::info!(
            "Crawl phase finished: {} pages and {} resources saved, {} fetches",
            counts.pages_saved,
            counts.resources_saved,
            counts.fetch_attempts
        );
        if counts.pages_unvisited > 0 {
            tracing::info!(
                "{} discovered pages were not visited (page budget {})",
                counts.pages_unvisited,
                self.config.max_pages
            );
        }

        tracing::info!("Rewriting links in saved pages and stylesheets");
        let rewriter = Rewriter::new(frontier.into_rewrite_map());
        let summary = rewriter.rewrite_all().await;

        Ok(
            MirrorStats::new(counts, summary, started_at, cancelled, output_root)
                .with_images(images_collected, images_dir),
        )
    }

    /// Fetches one page, saves its raw body and queues what it references
    ///
    /// # Flow
    ///
    /// 1. Out-of-scope pages are resolved as skipped without a request and without
    ///    using the page budget
    /// 2. The page is fetched; any failure is recorded and the crawl moves on
    /// 3. The body is saved byte-for-byte to the page's mapped path (provisional
    ///    until the rewrite pass)
    /// 4. A redirect target is registered as saved before links are queued, so a page
    ///    linking to its own final URL is not fetched twice
    /// 5. HTML bodies are parsed once for resources and page links, resolved against
    ///    the URL the page was served from
    ///
    /// Returns false if no request was made.
    async fn process_page(
        &self,
        frontier: &mut Frontier,
        scope: &CrawlScope,
        output_root: &Path,
        url: Url,
    ) -> bool {
        let target = scope.classify(url, UrlKind::Page);
        if let Some(reason) = scope.check(&target) {
            match reason {
                FailureReason::RobotsDisallowed => {
                    tracing::info!("Skipping page disallowed by robots.txt: {}", target.url)
                }
                _ => tracing::debug!("Skipping page {}: {}", target.url, reason),
            }
            frontier.resolve(target.url, Resolution::Failed(reason));
            return false;
        }
        let url = target.url;

        frontier.begin_fetch(&url);
        tracing::info!(
            "[page {}/{}] Fetching {}",
            frontier.pages_visited(),
            self.config.max_pages,
            url
        );

        let resolution = match self.fetcher.fetch_page(&url).await {
            Ok(page) => match to_local_path(output_root, &url) {
                Ok(path) => match write_file(path.as_path(), &page.body).await {
                    Ok(()) => {
                        let kind = page
                            .content_type
                            .as_deref()
                            .map_or(ContentKind::Html, ContentKind::from_content_type);
                        frontier.record_content(&url, kind);
                        frontier.record_final_url(&url, page.final_url.clone());

                        let refs = if kind == ContentKind::Html {
                            extract_references(&page.text(), &page.final_url)
                        } else {
                            tracing::debug!(
                                "Not parsing {} ({})",
                                url,
                                page.content_type.as_deref().unwrap_or_default()
                            );
                            Default::default()
                        };
                        let (new_pages, new_resources) = frontier.enqueue_references(refs);
                        tracing::info!(
                            "Saved page {} -> {} ({} new pages, {} new resources)",
                            url,
                            path,
                            new_pages,
                            new_resources
                        );
                        Resolution::Resolved(path)
                    }
                    Err(e) => Resolution::Failed(FailureReason::Filesystem(e.to_string())),
                },
                Err(e) => Resolution::Failed(FailureReason::Filesystem(e.to_string())),
            },
            Err(e) => Resolution::Failed(e.to_failure_reason()),
        };

        if let Resolution::Failed(reason) = &resolution {
            tracing::warn!("Failed to mirror page {}: {}", url, reason);
        }
        frontier.resolve(url, resolution);
        true
    }
}
