//! Robots.txt handling module
//!
//! robots.txt is fetched once per run from the start URL's host and evaluated with the
//! robotstxt crate. Only URLs on that host are judged by it.

mod parser;

pub use parser::{product_token, RobotsPolicy};

use crate::crawler::{FetchError, Fetcher};
use tracing::{debug, info, warn};
use url::Url;

/// Fetches robots.txt for the host of `start_url`
///
/// # Outcomes
///
/// | Response | Policy |
/// |----------|--------|
/// | 2xx | rules from the body |
/// | 401 / 403 | disallow everything |
/// | any other status | allow everything |
/// | network failure | allow everything |
///
/// Never fails: an unreachable robots.txt means the site expressed no rules.
pub async fn fetch_robots(fetcher: &Fetcher, start_url: &Url) -> RobotsPolicy {
    let robots_url = match start_url.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            warn!("Cannot build robots.txt URL for {}: {}", start_url, e);
            return RobotsPolicy::AllowAll;
        }
    };

    match fetcher.fetch_page(&robots_url).await {
        Ok(page) => {
            info!("Loaded robots.txt from {}", robots_url);
            RobotsPolicy::from_content(&page.text())
        }
        Err(FetchError::Http { status }) if status == 401 || status == 403 => {
            warn!(
                "robots.txt at {} answered HTTP {}; treating site as disallowed",
                robots_url, status
            );
            RobotsPolicy::DisallowAll
        }
        Err(FetchError::Http { status }) => {
            debug!("No robots.txt at {} (HTTP {})", robots_url, status);
            RobotsPolicy::AllowAll
        }
        Err(e) => {
            warn!("Could not fetch {}: {}; allowing all", robots_url, e);
            RobotsPolicy::AllowAll
        }
    }
}
