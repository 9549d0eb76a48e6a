//! Output module for run summaries
//!
//! This module handles:
//! - Collecting run statistics from the crawl and rewrite phases
//! - Printing the final summary

pub mod stats;

pub use stats::{format_elapsed, print_summary, MirrorStats};
