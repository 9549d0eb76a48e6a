/// Per-URL state definitions for tracking crawl progress
///
/// Every URL the frontier has heard of is in exactly one of these states.
use crate::url::UrlKind;
use std::fmt;

/// Represents the current state of a URL in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    // ===== Active States =====
    /// Never seen by the frontier
    Unseen,

    /// Waiting in the page or resource queue
    Queued(UrlKind),

    /// Fetch currently in progress
    InFlight,

    // ===== Terminal Success States =====
    /// Fetched and written to its local path
    Saved,

    // ===== Terminal Skip States =====
    /// Disallowed by the origin's robots.txt; never fetched
    SkippedByRobots,

    /// Outside the crawl scope while same-domain-only is set; never fetched
    SkippedCrossOrigin,

    // ===== Terminal Error States =====
    /// Network, HTTP or filesystem failure
    Failed,
}

impl UrlState {
    /// Returns true if this is a terminal state
    ///
    /// Terminal URLs are never enqueued again.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the URL may still be fetched or is being fetched
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Unseen | Self::Queued(_) | Self::InFlight)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved)
    }

    /// Returns true for policy skips, which are not counted as failures
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::SkippedByRobots | Self::SkippedCrossOrigin)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Short label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::Queued(UrlKind::Page) => "queued_page",
            Self::Queued(UrlKind::Resource) => "queued_resource",
            Self::InFlight => "in_flight",
            Self::Saved => "saved",
            Self::SkippedByRobots => "skipped_robots",
            Self::SkippedCrossOrigin => "skipped_cross_origin",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
