use crate::storage::images_dir_name;
use crate::url::DEFAULT_CDN_PATTERNS;
use crate::UrlResult;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// User agent sent when the configuration does not name one
pub const DEFAULT_USER_AGENT: &str = "MirrorBot/1.0 (+https://example.com/bot)";

/// Main configuration structure for Site-Mirror
///
/// Keys are the same in the flat `key=value` format and in TOML files.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Page the crawl starts from; its host defines the origin
    pub start_url: String,

    /// Root of the mirrored tree; host directories are created beneath it
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum number of page fetches per run
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Pause after each page fetch, in seconds (halved per resource fetch)
    #[serde(default = "default_delay")]
    pub delay: f64,

    /// Whether robots.txt of the origin is honored
    #[serde(default = "default_true", deserialize_with = "de_flag")]
    pub obey_robots: bool,

    /// Whether URLs outside the origin (and its CDN allow-list) are skipped
    #[serde(default = "default_true", deserialize_with = "de_flag")]
    pub same_domain_only: bool,

    /// Custom User-Agent header
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Per-request timeout, in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Number of concurrent resource downloads
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Host patterns treated as part of the origin (asset CDNs)
    #[serde(default = "default_cdn_patterns", deserialize_with = "de_list")]
    pub cdn_patterns: Vec<String>,

    /// Whether downloaded images are also copied into one flat folder
    #[serde(default = "default_true", deserialize_with = "de_flag")]
    pub collect_images: bool,

    /// The flat image folder; defaults to `<output_dir>/<host>-images`
    #[serde(default)]
    pub images_dir: Option<PathBuf>,
}

impl MirrorConfig {
    /// Creates a configuration for `start_url` with every other key at its default
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            output_dir: default_output_dir(),
            max_pages: default_max_pages(),
            delay: default_delay(),
            obey_robots: true,
            same_domain_only: true,
            user_agent: None,
            timeout: default_timeout(),
            max_workers: default_max_workers(),
            cdn_patterns: default_cdn_patterns(),
            collect_images: true,
            images_dir: None,
        }
    }

    /// The User-Agent header value for every request
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay)
    }

    pub fn resource_delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay / 2.0)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    /// Folder that receives a flat copy of every downloaded image, if enabled
    pub fn image_collection_dir(&self, start_url: &Url) -> UrlResult<Option<PathBuf>> {
        if !self.collect_images {
            return Ok(None);
        }
        match &self.images_dir {
            Some(dir) => Ok(Some(dir.clone())),
            None => Ok(Some(self.output_dir.join(images_dir_name(start_url)?))),
        }
    }

    /// Number of resource URLs pulled from the frontier per batch
    pub fn batch_size(&self) -> usize {
        self.max_workers * 2
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("scraped_site")
}

fn default_max_pages() -> usize {
    1000
}

fn default_delay() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> f64 {
    20.0
}

fn default_max_workers() -> usize {
    5
}

fn default_cdn_patterns() -> Vec<String> {
    DEFAULT_CDN_PATTERNS.iter().map(|p| p.to_string()).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Accepts `true`/`false`, `1`/`0` and the usual yes/no spellings
fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(1) => Ok(true),
        Flag::Int(0) => Ok(false),
        Flag::Int(n) => Err(serde::de::Error::custom(format!(
            "expected a boolean, got {}",
            n
        ))),
        Flag::Text(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected a boolean, got '{}'",
                other
            ))),
        },
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum List {
    Many(Vec<String>),
    One(String),
}

/// Accepts either a list or a single comma-separated string
fn de_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match List::deserialize(deserializer)? {
        List::Many(items) => items,
        List::One(joined) => joined.split(',').map(str::to_string).collect(),
    };

    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
