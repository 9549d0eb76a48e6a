//! CSS reference scanning and rewriting
//!
//! Handles `url(...)` in every quoting style and the string form of `@import`
//! (`@import "x.css"`; the `@import url(x.css)` form is already a `url(...)`).

use super::RewriteMap;
use crate::storage::LocalPath;
use crate::url::normalize;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use url::Url;

static CSS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]+))\s*\)"#)
        .expect("css url regex is valid")
});

static CSS_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)@import\s+(?:"([^"]*)"|'([^']*)')"#).expect("css import regex is valid")
});

/// Raw reference text of whichever alternative matched
fn reference<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

/// Returns every `url(...)` and `@import "..."` reference in `css`, unresolved
///
/// # Examples
///
/// ```
/// use site_mirror::rewrite::extract_css_refs;
///
/// let refs = extract_css_refs(r#"@import "base.css"; body { background: url('bg.png') }"#);
/// assert_eq!(refs, vec!["bg.png".to_string(), "base.css".to_string()]);
/// ```
pub fn extract_css_refs(css: &str) -> Vec<String> {
    CSS_URL_RE
        .captures_iter(css)
        .chain(CSS_IMPORT_RE.captures_iter(css))
        .filter_map(|caps| reference(&caps).map(str::to_string))
        .collect()
}

/// Resolves `raw` against `base_url` and returns the local link for it, if it was saved
///
/// Any `#fragment` on the reference is carried over to the link. Same-document
/// references (`#top`) are left alone.
pub(crate) fn local_link(
    raw: &str,
    base_url: &Url,
    own_path: &LocalPath,
    map: &RewriteMap,
) -> Option<String> {
    if raw.trim_start().starts_with('#') {
        return None;
    }
    let target = normalize(base_url, raw)?;
    let target_path = map.lookup(&target)?;
    let mut link = target_path.link_from(own_path);
    if let Some((_, fragment)) = raw.trim().split_once('#') {
        link.push('#');
        link.push_str(fragment);
    }
    Some(link)
}

/// Rewrites CSS references to links relative to `own_path`
///
/// `base_url` is the URL the CSS was served from (or the page URL for inline CSS).
/// References whose target was not saved are left exactly as written. Returns the new
/// text and the number of references changed.
pub fn rewrite_css(
    css: &str,
    base_url: &Url,
    own_path: &LocalPath,
    map: &RewriteMap,
) -> (String, usize) {
    let mut changed = 0;

    let with_urls = CSS_URL_RE.replace_all(css, |caps: &Captures| {
        match reference(caps).and_then(|raw| local_link(raw, base_url, own_path, map)) {
            Some(link) => {
                changed += 1;
                format!("url(\"{}\")", link)
            }
            None => caps[0].to_string(),
        }
    });

    let with_imports = CSS_IMPORT_RE.replace_all(&with_urls, |caps: &Captures| {
        match reference(caps).and_then(|raw| local_link(raw, base_url, own_path, map)) {
            Some(link) => {
                changed += 1;
                format!("@import \"{}\"", link)
            }
            None => caps[0].to_string(),
        }
    });

    (with_imports.into_owned(), changed)
}
