use crate::url::OriginPolicy;
use std::fmt;
use url::Url;

/// Extensions of assets that are downloaded as-is
const BINARY_EXTS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".ico", ".bmp", ".tiff", ".tif", ".avif",
    ".woff", ".woff2", ".ttf", ".eot", ".otf", ".mp4", ".webm", ".ogg", ".mp3", ".wav", ".avi",
    ".mov", ".pdf", ".zip", ".rar", ".7z", ".tar", ".gz",
];

/// Text assets that are still resources rather than pages
const TEXT_ASSET_EXTS: &[&str] = &[".css", ".js"];

const IMAGE_EXTS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".ico", ".bmp", ".tiff", ".tif", ".avif",
    ".jfif",
];

/// Whether a URL is crawled as a page or downloaded as a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlKind {
    /// HTML document: parsed for further references
    Page,
    /// Asset referenced by a page or stylesheet
    Resource,
}

impl fmt::Display for UrlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Resource => write!(f, "resource"),
        }
    }
}

/// An absolute URL together with its crawl classification
///
/// Immutable once built; the frontier owns these while they are queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlUrl {
    pub url: Url,
    pub kind: UrlKind,
    /// Whether the host belongs to the origin (including allowed CDNs)
    pub same_origin: bool,
}

impl CrawlUrl {
    pub fn new(url: Url, kind: UrlKind, policy: &OriginPolicy) -> Self {
        let same_origin = policy.is_same_origin(&url);
        Self {
            url,
            kind,
            same_origin,
        }
    }
}

/// Classifies a URL by the extension of its path
///
/// Images, fonts, audio/video, archives, PDFs, stylesheets and scripts are
/// resources; everything else is a candidate page. The decision is made on the
/// extension alone, without consulting the served Content-Type.
///
/// # Examples
///
/// ```
/// use site_mirror::url::looks_like_resource;
/// use url::Url;
///
/// assert!(looks_like_resource(&Url::parse("https://example.com/a/logo.PNG").unwrap()));
/// assert!(looks_like_resource(&Url::parse("https://example.com/app.js?v=3").unwrap()));
/// assert!(!looks_like_resource(&Url::parse("https://example.com/about").unwrap()));
/// ```
pub fn looks_like_resource(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    BINARY_EXTS
        .iter()
        .chain(TEXT_ASSET_EXTS)
        .any(|ext| path.ends_with(ext))
}

/// Returns true when the URL path has an image extension
pub fn is_image_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    IMAGE_EXTS.iter().any(|ext| path.ends_with(ext))
}

/// Returns true when the URL path names a stylesheet
pub fn is_stylesheet_url(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with(".css")
}
