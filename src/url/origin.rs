use crate::url::matcher::matches_host_pattern;
use url::Url;

/// Host patterns treated as belonging to the crawled site unless configured otherwise
///
/// These are raw host fragments and favor over-inclusion: a site's own asset CDN
/// should not be missed even if an unrelated CDN occasionally slips in. They are
/// matched against the host only, never the path.
pub const DEFAULT_CDN_PATTERNS: &[&str] = &[
    "cdn.",
    "static.",
    "assets.",
    "media.",
    "images.",
    "wixstatic.com",
    "parastorage.com",
];

/// Decides which hosts count as part of the crawled site
///
/// A URL is same-origin when its host, ignoring a leading `www.`:
/// - equals the base domain,
/// - is a subdomain of the base domain, or
/// - matches one of the CDN allow-list patterns.
///
/// Ports and schemes are not compared.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    base_domain: String,
    cdn_patterns: Vec<String>,
}

impl OriginPolicy {
    /// Creates a policy for `base_host` with an explicit CDN allow-list
    pub fn new(base_host: &str, cdn_patterns: Vec<String>) -> Self {
        Self {
            base_domain: strip_www(&base_host.to_ascii_lowercase()).to_string(),
            cdn_patterns,
        }
    }

    /// Creates a policy for `base_host` using [`DEFAULT_CDN_PATTERNS`]
    pub fn with_default_cdns(base_host: &str) -> Self {
        Self::new(
            base_host,
            DEFAULT_CDN_PATTERNS.iter().map(|p| p.to_string()).collect(),
        )
    }

    /// The origin's domain with any `www.` prefix removed
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let host = strip_www(&host);

        host == self.base_domain
            || host.ends_with(&format!(".{}", self.base_domain))
            || self
                .cdn_patterns
                .iter()
                .any(|pattern| matches_host_pattern(pattern, host))
    }

    /// Returns true when `url` is on the origin host itself (`www.`-insensitive)
    ///
    /// robots.txt is per host, so only these URLs are judged by the origin's rules.
    pub fn is_origin_host(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| strip_www(&host.to_ascii_lowercase()) == self.base_domain)
            .unwrap_or(false)
    }
}

/// Removes a single leading `www.` label
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Checks whether `url` belongs to the site at `base_host`, using the default CDN list
///
/// Unparseable URLs are never same-origin.
///
/// # Examples
///
/// ```
/// use site_mirror::url::is_same_origin;
///
/// assert!(is_same_origin("example.com", "https://example.com/x"));
/// assert!(is_same_origin("example.com", "https://cdn.example.com/x"));
/// assert!(!is_same_origin("example.com", "https://evil.com/x"));
/// ```
pub fn is_same_origin(base_host: &str, url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => OriginPolicy::with_default_cdns(base_host).is_same_origin(&parsed),
        Err(_) => false,
    }
}
