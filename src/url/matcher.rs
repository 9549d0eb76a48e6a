/// Checks a host against one CDN allow-list pattern
///
/// Two kinds of pattern are supported:
/// 1. Wildcard domain: `*.example.com` matches `example.com` and every subdomain
///    of it (`img.example.com`, `a.b.example.com`)
/// 2. Host fragment: any other pattern matches when it occurs anywhere in the host,
///    so `cdn.` matches `cdn.example.com` and `eu-cdn.shop.io`
///
/// Fragments deliberately over-match: pulling in an unrelated CDN is preferred
/// over missing the site's own asset host.
///
/// # Examples
///
/// ```
/// use site_mirror::url::matches_host_pattern;
///
/// assert!(matches_host_pattern("*.example.com", "example.com"));
/// assert!(matches_host_pattern("*.example.com", "img.example.com"));
/// assert!(!matches_host_pattern("*.example.com", "example.org"));
///
/// assert!(matches_host_pattern("cdn.", "cdn.shopify.com"));
/// assert!(matches_host_pattern("wixstatic.com", "static.wixstatic.com"));
/// assert!(!matches_host_pattern("cdn.", "example.com"));
/// ```
pub fn matches_host_pattern(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    if let Some(base) = pattern.strip_prefix("*.") {
        host == base || host.ends_with(&format!(".{}", base))
    } else {
        host.contains(&pattern)
    }
}
