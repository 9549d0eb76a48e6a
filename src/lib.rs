//! Site-Mirror: an offline website mirroring engine
//!
//! This crate crawls a website breadth-first, downloads its pages and embedded
//! resources (images, stylesheets, scripts, fonts, media), and rewrites every
//! cross-reference so the saved copy can be browsed from disk.
//!
//! A run has two phases:
//! 1. **Crawl** - the frontier driver fetches pages serially and drains resource
//!    batches in parallel, recording a local path (or a failure) for every URL.
//! 2. **Rewrite** - once the frontier is exhausted, every saved page and stylesheet
//!    is rewritten against the finished URL map using paths relative to the file.

pub mod config;
pub mod crawler;
pub mod output;
pub mod rewrite;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Mirror operations
///
/// Only setup problems surface through this type. Failures of individual URLs are
/// recorded as [`state::Resolution::Failed`] and never abort a run.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Malformed config line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingDomain(String),
}

/// Result type alias for Site-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::MirrorConfig;
pub use crawler::{mirror, Coordinator};
pub use output::MirrorStats;
pub use state::{FailureReason, Resolution, UrlState};
pub use storage::{to_local_path, LocalPath};
pub use crate::url::{is_same_origin, looks_like_resource, normalize, CrawlUrl, OriginPolicy, UrlKind};
