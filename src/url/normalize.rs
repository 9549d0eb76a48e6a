use crate::{UrlError, UrlResult};
use url::Url;

/// Reference schemes that never lead to a downloadable document
const IGNORED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Resolves a raw reference found in a document against the document's URL
///
/// # Rules
///
/// 1. Surrounding whitespace is trimmed; an empty reference is dropped
/// 2. `javascript:`, `mailto:`, `tel:` and `data:` references are dropped
///    (`data:` URLs stay inline in the saved document and are never queued)
/// 3. The reference is resolved against `base`, which covers protocol-relative
///    (`//host/path`), root-relative, path-relative and query-only references
/// 4. The fragment is stripped
/// 5. Only `http`/`https` results with a host are kept
///
/// # Examples
///
/// ```
/// use site_mirror::url::normalize;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/intro.html").unwrap();
///
/// let url = normalize(&base, "../img/logo.png#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/img/logo.png");
///
/// let url = normalize(&base, "//cdn.example.com/app.js").unwrap();
/// assert_eq!(url.as_str(), "https://cdn.example.com/app.js");
///
/// assert!(normalize(&base, "mailto:team@example.com").is_none());
/// ```
pub fn normalize(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || is_ignored_scheme(raw) {
        return None;
    }

    let mut url = base.join(raw).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    if url.host_str().map_or(true, str::is_empty) {
        return None;
    }

    url.set_fragment(None);
    Some(url)
}

/// Returns true for inline `data:` URLs
pub fn is_data_url(raw: &str) -> bool {
    has_scheme_prefix(raw.trim(), "data:")
}

fn is_ignored_scheme(raw: &str) -> bool {
    IGNORED_SCHEMES
        .iter()
        .any(|scheme| has_scheme_prefix(raw, scheme))
}

fn has_scheme_prefix(raw: &str, scheme: &str) -> bool {
    raw.len() >= scheme.len()
        && raw.is_char_boundary(scheme.len())
        && raw[..scheme.len()].eq_ignore_ascii_case(scheme)
}

/// Parses the crawl's start URL, which must be absolute http(s) with a host
pub fn parse_start_url(raw: &str) -> UrlResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain(raw.to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}
