//! In-place HTML reference rewriting
//!
//! Saved pages are edited textually: only attribute values (and `<style>` block
//! contents) that point at saved files change, so the rest of the markup stays exactly
//! as the server sent it.

use super::css::{local_link, rewrite_css};
use super::RewriteMap;
use crate::crawler::{parse_srcset, RESOURCE_ATTRIBUTES};
use crate::storage::LocalPath;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use url::Url;

static START_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([a-zA-Z][a-zA-Z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("start tag regex is valid")
});

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(\s)([^\s"'<>/=]+)(?:(\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .expect("attribute regex is valid")
});

static STYLE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<style\b[^>]*>)(.*?)(</style\s*>)").expect("style block regex is valid")
});

/// Context shared by every replacement on one page
struct PageContext<'a> {
    base_url: &'a Url,
    own_path: &'a LocalPath,
    map: &'a RewriteMap,
}

/// How an attribute value should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeKind {
    Reference,
    Srcset,
    Style,
}

fn attribute_kind(tag: &str, attr: &str) -> Option<AttributeKind> {
    if attr == "style" {
        return Some(AttributeKind::Style);
    }
    if tag == "a" && attr == "href" {
        return Some(AttributeKind::Reference);
    }
    RESOURCE_ATTRIBUTES
        .iter()
        .find(|(t, a)| *t == tag && *a == attr)
        .map(|(_, a)| {
            if *a == "srcset" {
                AttributeKind::Srcset
            } else {
                AttributeKind::Reference
            }
        })
}

/// Decodes the entity references that commonly appear in URL attributes
pub fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn encode_attribute(value: &str, quote: char) -> String {
    let escaped = value.replace('&', "&amp;");
    match quote {
        '\'' => escaped.replace('\'', "&#39;"),
        _ => escaped.replace('"', "&quot;"),
    }
}

/// Rewrites all references in a saved page to links relative to `own_path`
///
/// `base_url` is the URL the page was served from. Covered references:
/// - the resource tag/attribute table, with `srcset` descriptors preserved
/// - `<a href>` links to saved pages and files
/// - `style` attributes and `<style>` blocks
///
/// Anything whose target was not saved is left untouched. Returns the new text and
/// the number of references changed.
pub fn rewrite_html(
    html: &str,
    base_url: &Url,
    own_path: &LocalPath,
    map: &RewriteMap,
) -> (String, usize) {
    let ctx = PageContext {
        base_url,
        own_path,
        map,
    };
    let mut changed = 0;

    let styled = STYLE_BLOCK_RE.replace_all(html, |caps: &Captures| {
        let (css, count) = rewrite_css(&caps[2], ctx.base_url, ctx.own_path, ctx.map);
        changed += count;
        format!("{}{}{}", &caps[1], css, &caps[3])
    });

    let rewritten = START_TAG_RE.replace_all(&styled, |caps: &Captures| {
        let tag = caps[1].to_ascii_lowercase();
        let (attrs, count) = rewrite_attributes(&tag, &caps[2], &ctx);
        changed += count;
        format!("<{}{}>", &caps[1], attrs)
    });

    (rewritten.into_owned(), changed)
}

fn rewrite_attributes(tag: &str, attrs: &str, ctx: &PageContext<'_>) -> (String, usize) {
    let mut changed = 0;

    let out = ATTRIBUTE_RE.replace_all(attrs, |caps: &Captures| {
        let name = caps[2].to_ascii_lowercase();
        let Some(kind) = attribute_kind(tag, &name) else {
            return caps[0].to_string();
        };
        let Some(equals) = caps.get(3) else {
            return caps[0].to_string();
        };

        let (raw, quote) = match (caps.get(4), caps.get(5), caps.get(6)) {
            (Some(v), _, _) => (v.as_str(), '"'),
            (_, Some(v), _) => (v.as_str(), '\''),
            (_, _, Some(v)) => (v.as_str(), '"'),
            _ => return caps[0].to_string(),
        };

        let decoded = decode_entities(raw);
        let replacement = match kind {
            AttributeKind::Reference => {
                local_link(&decoded, ctx.base_url, ctx.own_path, ctx.map).map(|link| (link, 1))
            }
            AttributeKind::Srcset => rewrite_srcset(&decoded, ctx),
            AttributeKind::Style => {
                let (css, count) = rewrite_css(&decoded, ctx.base_url, ctx.own_path, ctx.map);
                (count > 0).then_some((css, count))
            }
        };

        match replacement {
            Some((value, count)) => {
                changed += count;
                format!(
                    "{}{}{}{}{}{}",
                    &caps[1],
                    &caps[2],
                    equals.as_str(),
                    quote,
                    encode_attribute(&value, quote),
                    quote
                )
            }
            None => caps[0].to_string(),
        }
    });

    (out.into_owned(), changed)
}

/// Rewrites the URL of each srcset candidate, keeping descriptors
fn rewrite_srcset(value: &str, ctx: &PageContext<'_>) -> Option<(String, usize)> {
    let mut count = 0;
    let parts: Vec<String> = parse_srcset(value)
        .into_iter()
        .map(|candidate| {
            let url = match local_link(candidate.url, ctx.base_url, ctx.own_path, ctx.map) {
                Some(link) => {
                    count += 1;
                    link
                }
                None => candidate.url.to_string(),
            };
            if candidate.descriptor.is_empty() {
                url
            } else {
                format!("{} {}", url, candidate.descriptor)
            }
        })
        .collect();

    (count > 0).then(|| (parts.join(", "), count))
}
