use crate::state::UrlState;
use crate::storage::LocalPath;
use std::fmt;

/// Why a URL did not end up on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// DNS, connection, TLS, timeout or a body read that broke off
    Network(String),

    /// Terminal response outside 2xx
    Http(u16),

    /// Redirect chain too long, looping, or pointing nowhere usable
    Redirect(String),

    /// Disallowed by robots.txt; no request was made
    RobotsDisallowed,

    /// Outside the origin while same-domain-only is set
    CrossOrigin,

    /// The body could not be written
    Filesystem(String),
}

impl FailureReason {
    /// Returns true for policy skips, which are not failures of the remote site
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::RobotsDisallowed | Self::CrossOrigin)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {}", msg),
            Self::Http(status) => write!(f, "HTTP {}", status),
            Self::Redirect(msg) => write!(f, "redirect error: {}", msg),
            Self::RobotsDisallowed => write!(f, "disallowed by robots.txt"),
            Self::CrossOrigin => write!(f, "cross-origin"),
            Self::Filesystem(msg) => write!(f, "filesystem error: {}", msg),
        }
    }
}

/// Final outcome recorded for a URL once the crawl is done with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(LocalPath),
    Failed(FailureReason),
}

impl Resolution {
    pub fn local_path(&self) -> Option<&LocalPath> {
        match self {
            Self::Resolved(path) => Some(path),
            Self::Failed(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Terminal state corresponding to this outcome
    pub fn state(&self) -> UrlState {
        match self {
            Self::Resolved(_) => UrlState::Saved,
            Self::Failed(FailureReason::RobotsDisallowed) => UrlState::SkippedByRobots,
            Self::Failed(FailureReason::CrossOrigin) => UrlState::SkippedCrossOrigin,
            Self::Failed(_) => UrlState::Failed,
        }
    }
}
