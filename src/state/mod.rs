//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlState`: where a URL is in its lifecycle (queued, in flight, saved, skipped, failed)
//! - `Resolution`: the recorded outcome of a URL, either its local path or a `FailureReason`

mod resolution;
mod url_state;

pub use resolution::{FailureReason, Resolution};
pub use url_state::UrlState;
