//! Link rewriting module
//!
//! The second phase of a run. Once the frontier has drained, every saved page and
//! stylesheet is rewritten so that references to saved files become links relative to
//! the referencing file.
//!
//! # Components
//!
//! - `RewriteMap`: read-only snapshot of every URL that was saved, and where
//! - `Rewriter`: walks the saved HTML and CSS files and rewrites them in place

mod css;
mod html;

pub use css::{extract_css_refs, rewrite_css};
pub use html::{decode_entities, rewrite_html};

use crate::storage::{read_file, write_file, LocalPath, StorageError};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use url::Url;

/// What a saved file contains, as far as rewriting is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Stylesheet,
    /// Images, scripts, fonts and anything else that is never rewritten
    Other,
}

impl ContentKind {
    /// Classifies a served `Content-Type` (lowercased, without parameters)
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type == "text/css" {
            Self::Stylesheet
        } else if content_type.contains("html") {
            Self::Html
        } else {
            Self::Other
        }
    }

    /// Classifies by the saved file's extension
    pub fn from_path(path: &LocalPath) -> Self {
        if path.is_html() {
            Self::Html
        } else if path.is_css() {
            Self::Stylesheet
        } else {
            Self::Other
        }
    }
}

/// A saved file and what the rewrite pass needs to know about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    /// URL the file was requested as
    pub url: Url,
    /// URL the content was served from (differs after redirects); relative
    /// references inside the file resolve against it
    pub base_url: Url,
    pub path: LocalPath,
    pub kind: ContentKind,
}

/// Successful URL to path entries, frozen after the crawl
#[derive(Debug, Clone, Default)]
pub struct RewriteMap {
    paths: HashMap<Url, LocalPath>,
    files: Vec<SavedFile>,
}

impl RewriteMap {
    pub fn new(paths: HashMap<Url, LocalPath>, files: Vec<SavedFile>) -> Self {
        Self { paths, files }
    }

    pub fn lookup(&self, url: &Url) -> Option<&LocalPath> {
        self.paths.get(url)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Every saved file, rewritable or not
    pub fn files(&self) -> &[SavedFile] {
        &self.files
    }
}

/// Counts from one rewrite pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub pages: usize,
    pub stylesheets: usize,
    pub references: usize,
    pub failures: usize,
}

/// Text view of a saved file that turns back into the exact same bytes
///
/// Content that is not valid UTF-8 is mapped one byte per char (U+0000..=U+00FF), so
/// bytes outside the rewritten references are written back unchanged.
enum SavedText {
    Utf8(String),
    Bytes(String),
}

impl SavedText {
    fn decode(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Self::Utf8(text),
            Err(e) => Self::Bytes(e.into_bytes().into_iter().map(char::from).collect()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Self::Utf8(text) | Self::Bytes(text) => text,
        }
    }

    fn encode(&self, text: String) -> Vec<u8> {
        match self {
            Self::Utf8(_) => text.into_bytes(),
            // Inserted links are ASCII; every other char came from a single byte
            Self::Bytes(_) => text
                .chars()
                .map(|c| u8::try_from(c).unwrap_or(b'?'))
                .collect(),
        }
    }
}

/// Rewrites saved files against a finished [`RewriteMap`]
#[derive(Debug)]
pub struct Rewriter {
    map: RewriteMap,
}

impl Rewriter {
    pub fn new(map: RewriteMap) -> Self {
        Self { map }
    }

    pub fn map(&self) -> &RewriteMap {
        &self.map
    }

    /// Rewrites every saved HTML page and stylesheet
    ///
    /// A file that cannot be read or written is logged and keeps its provisional
    /// content; the pass continues with the next file.
    pub async fn rewrite_all(&self) -> RewriteSummary {
        let mut summary = RewriteSummary::default();

        for file in self.map.files() {
            if file.kind == ContentKind::Other {
                continue;
            }

            match self.rewrite_file(file).await {
                Ok(count) => {
                    summary.references += count;
                    if file.kind == ContentKind::Html {
                        summary.pages += 1;
                        info!("Rewrote page {} ({} references)", file.path, count);
                    } else {
                        summary.stylesheets += 1;
                        info!("Rewrote stylesheet {} ({} references)", file.path, count);
                    }
                }
                Err(e) => {
                    summary.failures += 1;
                    warn!("Rewrite failed for {}: {}", file.url, e);
                }
            }
        }

        summary
    }

    /// Rewrites one file in place and returns the number of references changed
    ///
    /// The file is only written back when something changed.
    pub async fn rewrite_file(&self, file: &SavedFile) -> Result<usize, StorageError> {
        if file.kind == ContentKind::Other {
            return Ok(0);
        }
        let text = SavedText::decode(read_file(file.path.as_path()).await?);

        let (rewritten, count) = match file.kind {
            ContentKind::Html => {
                rewrite_html(text.as_str(), &file.base_url, &file.path, &self.map)
            }
            _ => rewrite_css(text.as_str(), &file.base_url, &file.path, &self.map),
        };

        if count > 0 {
            write_file(file.path.as_path(), &text.encode(rewritten)).await?;
        } else {
            debug!("Nothing to rewrite in {}", file.path);
        }
        Ok(count)
    }
}
