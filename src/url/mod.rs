//! URL handling module for Site-Mirror
//!
//! This module provides reference resolution, origin (same-site) decisions,
//! CDN host pattern matching, and page/resource classification.

mod classify;
mod matcher;
mod normalize;
mod origin;

pub use classify::{is_image_url, is_stylesheet_url, looks_like_resource, CrawlUrl, UrlKind};
pub use matcher::matches_host_pattern;
pub use normalize::{is_data_url, normalize, parse_start_url};
pub use origin::{is_same_origin, strip_www, OriginPolicy, DEFAULT_CDN_PATTERNS};
