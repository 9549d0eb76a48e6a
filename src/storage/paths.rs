use crate::url::strip_www;
use crate::{UrlError, UrlResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// File name given to directory-like URLs
const INDEX_FILE: &str = "index.html";

/// Number of hex characters of the query digest embedded in file names
const QUERY_DIGEST_LEN: usize = 8;

/// Location of a mirrored URL on disk, always beneath the output root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalPath(PathBuf);

impl LocalPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// Lowercased extension of the file name, if any
    pub fn extension(&self) -> Option<String> {
        self.0
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// True for `.html` / `.htm` files
    pub fn is_html(&self) -> bool {
        matches!(self.extension().as_deref(), Some("html") | Some("htm"))
    }

    /// True for `.css` files
    pub fn is_css(&self) -> bool {
        self.extension().as_deref() == Some("css")
    }

    /// Link to this file usable from inside the file at `from`
    ///
    /// See [`relative_link`].
    pub fn link_from(&self, from: &LocalPath) -> String {
        relative_link(from.as_path(), self.as_path())
    }
}

impl AsRef<Path> for LocalPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for LocalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Maps an absolute URL to its file beneath `output_root`
///
/// # Mapping Rules
///
/// 1. The host is the first directory (`host_port` when the URL names a port)
/// 2. Path segments are kept; `.` and `..` segments are resolved and can never
///    climb above the host directory
/// 3. A path ending in `/`, or whose last segment has no extension, gets an
///    implied `index.html`
/// 4. A non-empty query string adds `__q<digest>` before the final extension, where
///    the digest is the first 8 hex characters of SHA-256 over the raw query
///
/// The function is pure: the same URL always yields the same path, and distinct
/// query strings on the same path yield distinct files.
///
/// # Errors
///
/// Returns [`UrlError::MissingDomain`] for URLs without a host.
///
/// # Examples
///
/// ```
/// use site_mirror::storage::to_local_path;
/// use std::path::Path;
/// use url::Url;
///
/// let root = Path::new("out");
/// let url = Url::parse("https://example.com/docs/").unwrap();
/// let path = to_local_path(root, &url).unwrap();
/// assert_eq!(path.as_path(), Path::new("out/example.com/docs/index.html"));
/// ```
pub fn to_local_path(output_root: &Path, url: &Url) -> UrlResult<LocalPath> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlError::MissingDomain(url.to_string()))?;

    let host_dir = match url.port() {
        Some(port) => format!("{}_{}", host, port),
        None => host.to_string(),
    };

    let raw_path = url.path();
    let mut segments: Vec<String> = Vec::new();
    for segment in raw_path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }

    let directory_like = raw_path.ends_with('/')
        || segments
            .last()
            .map_or(true, |last| Path::new(last).extension().is_none());
    if directory_like {
        segments.push(INDEX_FILE.to_string());
    }

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        let digest = query_digest(query);
        if let Some(last) = segments.last_mut() {
            *last = insert_before_extension(last, &format!("__q{}", digest));
        }
    }

    let mut path = output_root.join(host_dir);
    path.extend(segments);
    Ok(LocalPath(path))
}

/// Name of the flat image folder for a site, `<host>-images`
///
/// A leading `www.` is dropped; an explicit port is kept as `_<port>`.
pub fn images_dir_name(url: &Url) -> UrlResult<String> {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlError::MissingDomain(url.to_string()))?;
    let host = strip_www(host);

    Ok(match url.port() {
        Some(port) => format!("{}_{}-images", host, port),
        None => format!("{}-images", host),
    })
}

/// File name of an image in the flat image folder
///
/// The last path segment with file-name-unsafe characters replaced by `_`. A segment
/// without an extension becomes `image_<digest>` with an extension taken from the
/// content type.
pub fn image_file_name(url: &Url, content_type: Option<&str>) -> String {
    let base = url.path().rsplit('/').next().unwrap_or_default();
    if base.contains('.') && !base.starts_with('.') {
        return base
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                other => other,
            })
            .collect();
    }

    let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));
    let ext = match content_type {
        Some("image/png") => "png",
        Some("image/gif") => "gif",
        Some("image/webp") => "webp",
        Some("image/svg+xml") => "svg",
        Some("image/avif") => "avif",
        Some("image/x-icon") | Some("image/vnd.microsoft.icon") => "ico",
        _ => "jpg",
    };
    format!("image_{}.{}", &digest[..QUERY_DIGEST_LEN], ext)
}

/// Short, stable identity for a query string
fn query_digest(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    hex::encode(digest)[..QUERY_DIGEST_LEN].to_string()
}

fn insert_before_extension(name: &str, marker: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}{}", &name[..dot], marker, &name[dot..]),
        _ => format!("{}{}", name, marker),
    }
}

/// Computes the link from the file at `from_file` to the file at `to_file`
///
/// The result is relative to `from_file`'s directory and uses `/` separators, so it
/// works from `file://` URLs where there is no site root. `%` is escaped because
/// file names keep the URL's percent-encoding on disk.
pub fn relative_link(from_file: &Path, to_file: &Path) -> String {
    let from_dir: Vec<Component> = from_file
        .parent()
        .map(|dir| dir.components().collect())
        .unwrap_or_default();
    let target: Vec<Component> = to_file.components().collect();

    let common = from_dir
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    parts.extend(std::iter::repeat("..".to_string()).take(from_dir.len() - common));
    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    parts.join("/").replace('%', "%25")
}
