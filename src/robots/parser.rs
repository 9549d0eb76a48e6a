//! Robots.txt policy evaluation
//!
//! This module wraps the robotstxt crate's matcher behind the three outcomes a robots.txt
//! fetch can have.

use robotstxt::DefaultMatcher;
use url::Url;

/// Crawl permissions derived from the origin's robots.txt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsPolicy {
    /// No usable robots.txt, or compliance disabled
    AllowAll,

    /// robots.txt answered 401/403
    DisallowAll,

    /// Raw robots.txt content, evaluated per URL
    Rules(String),
}

impl RobotsPolicy {
    /// Creates a policy from raw robots.txt content
    ///
    /// Empty content allows everything.
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            Self::AllowAll
        } else {
            Self::Rules(content.to_string())
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// Matching uses the user agent's product token, so
    /// `MirrorBot/1.0 (+https://example.com/bot)` is matched as `MirrorBot`.
    pub fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DisallowAll => false,
            Self::Rules(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(
                    content,
                    product_token(user_agent),
                    url.as_str(),
                )
            }
        }
    }
}

/// Extracts the product token from a User-Agent header value
///
/// # Examples
///
/// ```
/// use site_mirror::robots::product_token;
///
/// assert_eq!(product_token("MirrorBot/1.0 (+https://example.com/bot)"), "MirrorBot");
/// assert_eq!(product_token("my-crawler"), "my-crawler");
/// ```
pub fn product_token(user_agent: &str) -> &str {
    let trimmed = user_agent.trim();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(trimmed.len());
    if end == 0 {
        trimmed
    } else {
        &trimmed[..end]
    }
}
