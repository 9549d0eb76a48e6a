//! HTML parser for discovering references
//!
//! One parse per page yields both the embedded resources and the page links:
//! - Resources from the tag/attribute table (`img@src`, `link@href`, ...)
//! - Page links from `<a href>` and `<iframe src>`
//! - `url(...)` and `@import` references inside `style` attributes and `<style>` blocks

use crate::rewrite::extract_css_refs;
use crate::url::{looks_like_resource, normalize};
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Tag/attribute pairs that reference embedded resources
///
/// The same table drives discovery and the rewrite pass.
pub const RESOURCE_ATTRIBUTES: &[(&str, &str)] = &[
    ("img", "src"),
    ("img", "srcset"),
    ("script", "src"),
    ("link", "href"),
    ("source", "src"),
    ("source", "srcset"),
    ("video", "src"),
    ("audio", "src"),
    ("iframe", "src"),
];

/// Absolute URLs discovered on one page, in document order and without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReferences {
    pub pages: Vec<Url>,
    pub resources: Vec<Url>,
}

impl PageReferences {
    fn push_page(&mut self, url: Url, seen: &mut HashSet<Url>) {
        if seen.insert(url.clone()) {
            self.pages.push(url);
        }
    }

    fn push_resource(&mut self, url: Url, seen: &mut HashSet<Url>) {
        if seen.insert(url.clone()) {
            self.resources.push(url);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.resources.is_empty()
    }
}

/// One candidate of a `srcset` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetCandidate<'a> {
    pub url: &'a str,
    /// Width or density descriptor such as `800w` or `2x`; may be empty
    pub descriptor: &'a str,
}

/// Splits a `srcset` value into candidates
///
/// A candidate URL runs up to the next whitespace, so commas inside `data:` URLs do not
/// split it. Trailing commas on a URL end the candidate without a descriptor.
///
/// # Examples
///
/// ```
/// use site_mirror::crawler::parse_srcset;
///
/// let candidates = parse_srcset("a.jpg 1x, b.jpg 2x");
/// assert_eq!(candidates.len(), 2);
/// assert_eq!(candidates[1].url, "b.jpg");
/// assert_eq!(candidates[1].descriptor, "2x");
/// ```
pub fn parse_srcset(value: &str) -> Vec<SrcsetCandidate<'_>> {
    let mut candidates = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let raw_url = &rest[..url_end];
        let url = raw_url.trim_end_matches(',');

        if url.len() < raw_url.len() {
            // "a.jpg," ends the candidate right here
            candidates.push(SrcsetCandidate {
                url,
                descriptor: "",
            });
            rest = &rest[url_end..];
            continue;
        }

        let after = &rest[url_end..];
        let descriptor_end = after.find(',').unwrap_or(after.len());
        candidates.push(SrcsetCandidate {
            url,
            descriptor: after[..descriptor_end].trim(),
        });
        rest = &after[descriptor_end..];
    }

    candidates
}

/// Parses HTML and extracts every reference worth fetching
///
/// # Classification Rules
///
/// | Source | Looks like a resource | Otherwise |
/// |--------|-----------------------|-----------|
/// | `a@href` | resource | page |
/// | `iframe@src` | resource | page |
/// | `srcset` candidates | resource | page |
/// | other table entries | resource | resource |
/// | CSS in `style` / `<style>` | resource | resource |
///
/// References that do not normalize (`javascript:`, `mailto:`, `tel:`, `data:`, other
/// schemes, garbage) are dropped. Malformed HTML never fails: whatever the parser
/// recovers is used.
///
/// # Example
///
/// ```
/// use site_mirror::crawler::extract_references;
/// use url::Url;
///
/// let html = r#"<img src="logo.png"><a href="/about">About</a>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let refs = extract_references(html, &base);
/// assert_eq!(refs.resources[0].as_str(), "https://example.com/logo.png");
/// assert_eq!(refs.pages[0].as_str(), "https://example.com/about");
/// ```
pub fn extract_references(html: &str, base_url: &Url) -> PageReferences {
    let document = Html::parse_document(html);
    if !document.errors.is_empty() {
        debug!(
            "{} HTML parse issue(s) on {}; continuing with recovered tree",
            document.errors.len(),
            base_url
        );
    }

    let mut refs = PageReferences::default();
    let mut seen: HashSet<Url> = HashSet::new();

    for (tag, attr) in RESOURCE_ATTRIBUTES {
        let Ok(selector) = Selector::parse(&format!("{}[{}]", tag, attr)) else {
            continue;
        };

        for element in document.select(&selector) {
            let Some(raw) = element.value().attr(attr) else {
                continue;
            };

            if *attr == "srcset" {
                for candidate in parse_srcset(raw) {
                    if let Some(url) = normalize(base_url, candidate.url) {
                        if looks_like_resource(&url) {
                            refs.push_resource(url, &mut seen);
                        } else {
                            refs.push_page(url, &mut seen);
                        }
                    }
                }
                continue;
            }

            let Some(url) = normalize(base_url, raw) else {
                continue;
            };
            if looks_like_resource(&url) || *tag != "iframe" {
                refs.push_resource(url, &mut seen);
            } else {
                refs.push_page(url, &mut seen);
            }
        }
    }

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| normalize(base_url, href))
            else {
                continue;
            };
            if looks_like_resource(&url) {
                refs.push_resource(url, &mut seen);
            } else {
                refs.push_page(url, &mut seen);
            }
        }
    }

    let mut css_sources: Vec<String> = Vec::new();
    if let Ok(selector) = Selector::parse("[style]") {
        css_sources.extend(
            document
                .select(&selector)
                .filter_map(|element| element.value().attr("style"))
                .map(str::to_string),
        );
    }
    if let Ok(selector) = Selector::parse("style") {
        css_sources.extend(
            document
                .select(&selector)
                .map(|element| element.text().collect::<String>()),
        );
    }
    for css in &css_sources {
        for raw in extract_css_refs(css) {
            if let Some(url) = normalize(base_url, &raw) {
                refs.push_resource(url, &mut seen);
            }
        }
    }

    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    fn strs(urls: &[Url]) -> Vec<&str> {
        urls.iter().map(Url::as_str).collect()
    }

    #[test]
    fn test_resource_table() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/css/site.css">
            <script src="app.js"></script>
        </head><body>
            <img src="img/a.png">
            <video src="/media/clip.mp4"></video>
            <audio src="/media/song.mp3"></audio>
            <picture><source src="/img/b.webp"></picture>
        </body></html>"#;
        let refs = extract_references(html, &base_url());

        assert_eq!(
            strs(&refs.resources),
            vec![
                "https://example.com/img/a.png",
                "https://example.com/blog/app.js",
                "https://example.com/css/site.css",
                "https://example.com/img/b.webp",
                "https://example.com/media/clip.mp4",
                "https://example.com/media/song.mp3",
            ]
        );
        assert!(refs.pages.is_empty());
    }

    #[test]
    fn test_anchor_classification() {
        let html = r#"<a href="/about">About</a>
            <a href="/files/report.pdf">Report</a>
            <a href="../contact/">Contact</a>"#;
        let refs = extract_references(html, &base_url());

        assert_eq!(
            strs(&refs.pages),
            vec!["https://example.com/about", "https://example.com/contact/"]
        );
        assert_eq!(strs(&refs.resources), vec!["https://example.com/files/report.pdf"]);
    }

    #[test]
    fn test_iframe_is_page_unless_resource() {
        let html = r#"<iframe src="/embed/widget"></iframe><iframe src="/doc.pdf"></iframe>"#;
        let refs = extract_references(html, &base_url());

        assert_eq!(strs(&refs.pages), vec!["https://example.com/embed/widget"]);
        assert_eq!(strs(&refs.resources), vec!["https://example.com/doc.pdf"]);
    }

    #[test]
    fn test_extensionless_table_entry_is_resource() {
        let html = r#"<link rel="icon" href="/favicon"><img src="/image?id=4">"#;
        let refs = extract_references(html, &base_url());

        assert_eq!(refs.resources.len(), 2);
        assert!(refs.pages.is_empty());
    }

    #[test]
    fn test_srcset() {
        let html = r#"<img srcset="small.jpg 480w, /large.jpg 800w">"#;
        let refs = extract_references(html, &base_url());

        assert_eq!(
            strs(&refs.resources),
            vec!["https://example.com/blog/small.jpg", "https://example.com/large.jpg"]
        );
    }

    #[test]
    fn test_ignored_schemes() {
        let html = r##"<a href="javascript:void(0)">x</a>
            <a href="mailto:a@b.c">m</a>
            <a href="tel:123">t</a>
            <img src="data:image/png;base64,AAAA">
            <a href="ftp://example.com/file">f</a>
            <a href="#top">top</a>"##;
        let refs = extract_references(html, &base_url());

        assert!(refs.resources.is_empty());
        assert_eq!(strs(&refs.pages), vec!["https://example.com/blog/post"]);
    }

    #[test]
    fn test_fragments_stripped_and_deduplicated() {
        let html = r#"<a href="/a#one">1</a><a href="/a#two">2</a><img src="x.png"><img src="x.png">"#;
        let refs = extract_references(html, &base_url());

        assert_eq!(strs(&refs.pages), vec!["https://example.com/a"]);
        assert_eq!(refs.resources.len(), 1);
    }

    #[test]
    fn test_inline_css() {
        let html = r#"<style>body { background: url('/img/bg.png'); } @import "print.css";</style>
            <div style="background-image: url(hero.jpg)"></div>"#;
        let refs = extract_references(html, &base_url());

        let found = strs(&refs.resources);
        assert!(found.contains(&"https://example.com/img/bg.png"));
        assert!(found.contains(&"https://example.com/blog/print.css"));
        assert!(found.contains(&"https://example.com/blog/hero.jpg"));
    }

    #[test]
    fn test_malformed_html() {
        let html = r#"<html><body><img src="a.png"<a href="/p">unclosed <div></body>"#;
        let refs = extract_references(html, &base_url());
        // Best effort: no panic, and whatever survives is absolute
        for url in refs.pages.iter().chain(&refs.resources) {
            assert_eq!(url.host_str(), Some("example.com"));
        }
    }

    #[test]
    fn test_parse_srcset_descriptors() {
        let candidates = parse_srcset(" a.jpg 1x ,b.jpg  2x,c.jpg");
        assert_eq!(
            candidates,
            vec![
                SrcsetCandidate { url: "a.jpg", descriptor: "1x" },
                SrcsetCandidate { url: "b.jpg", descriptor: "2x" },
                SrcsetCandidate { url: "c.jpg", descriptor: "" },
            ]
        );
    }

    #[test]
    fn test_parse_srcset_data_url_with_comma() {
        let candidates = parse_srcset("data:image/png;base64,AAA= 1x, b.png 2x");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, "data:image/png;base64,AAA=");
        assert_eq!(candidates[1].url, "b.png");
    }

    #[test]
    fn test_parse_srcset_trailing_comma() {
        let candidates = parse_srcset("a.jpg,b.jpg 2x");
        // "a.jpg,b.jpg" has no whitespace so it is one URL
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].descriptor, "2x");

        let candidates = parse_srcset("a.jpg, b.jpg");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, "a.jpg");
    }
}
