//! Crawler module for site mirroring
//!
//! This module contains the crawl phase, including:
//! - HTTP fetching with manual redirect handling
//! - HTML reference extraction
//! - The URL frontier and page budget
//! - Scope checks (origin and robots.txt)
//! - Concurrent resource downloads
//! - Overall run coordination

mod coordinator;
mod downloader;
mod fetcher;
mod frontier;
mod parser;
mod scope;

pub use coordinator::Coordinator;
pub use downloader::{BatchReport, DownloadOutcome, DownloadResult, Downloader};
pub use fetcher::{
    build_http_client, FetchError, FetchedPage, FetchedResponse, Fetcher, MAX_REDIRECTS,
};
pub use frontier::{Frontier, FrontierCounts};
pub use parser::{
    extract_references, parse_srcset, PageReferences, SrcsetCandidate, RESOURCE_ATTRIBUTES,
};
pub use scope::CrawlScope;

use crate::config::MirrorConfig;
use crate::output::MirrorStats;
use crate::Result;
use tokio_util::sync::CancellationToken;

/// Mirrors a site into `config.output_dir`
///
/// This is the main entry point for a run. It will:
/// 1. Validate the configuration and build the HTTP client
/// 2. Fetch robots.txt (when obeyed)
/// 3. Crawl pages and download resources until the frontier is drained, the page
///    budget is spent or `cancel` fires
/// 4. Rewrite saved pages and stylesheets to point at local copies
///
/// # Returns
///
/// * `Ok(MirrorStats)` - The run finished (possibly cancelled, with partial output)
/// * `Err(MirrorError)` - Setup failed before anything was fetched
pub async fn mirror(config: MirrorConfig, cancel: CancellationToken) -> Result<MirrorStats> {
    Coordinator::new(config)?.run(cancel).await
}
