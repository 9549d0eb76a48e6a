use crate::robots::RobotsPolicy;
use crate::state::FailureReason;
use crate::url::{CrawlUrl, OriginPolicy, UrlKind};
use url::Url;

/// Decides, before any request is made, whether a URL may be fetched
///
/// The same checks gate pages and resources.
#[derive(Debug, Clone)]
pub struct CrawlScope {
    origin: OriginPolicy,
    same_domain_only: bool,
    robots: RobotsPolicy,
    user_agent: String,
}

impl CrawlScope {
    pub fn new(
        origin: OriginPolicy,
        same_domain_only: bool,
        robots: RobotsPolicy,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            origin,
            same_domain_only,
            robots,
            user_agent: user_agent.into(),
        }
    }

    pub fn origin(&self) -> &OriginPolicy {
        &self.origin
    }

    pub fn classify(&self, url: Url, kind: UrlKind) -> CrawlUrl {
        CrawlUrl::new(url, kind, &self.origin)
    }

    /// Returns the skip reason for `target`, or `None` if it may be fetched
    ///
    /// robots.txt only judges URLs on the origin host itself.
    pub fn check(&self, target: &CrawlUrl) -> Option<FailureReason> {
        if self.same_domain_only && !target.same_origin {
            return Some(FailureReason::CrossOrigin);
        }
        if self.origin.is_origin_host(&target.url)
            && !self.robots.is_allowed(&target.url, &self.user_agent)
        {
            return Some(FailureReason::RobotsDisallowed);
        }
        None
    }
}
