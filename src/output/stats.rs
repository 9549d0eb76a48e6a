//! Run statistics and the final summary
//!
//! Counts come from the frontier's recorded resolutions and the rewrite pass.

use crate::crawler::FrontierCounts;
use crate::rewrite::RewriteSummary;
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Mirror run statistics summary
#[derive(Debug, Clone)]
pub struct MirrorStats {
    pub pages_saved: usize,
    pub resources_saved: usize,
    pub pages_failed: usize,
    pub resources_failed: usize,
    pub skipped_robots: usize,
    pub skipped_cross_origin: usize,

    /// Pages discovered but never fetched (budget reached or run cancelled)
    pub pages_unvisited: usize,
    pub resources_unvisited: usize,

    /// Network fetches started; each URL is fetched at most once
    pub fetch_attempts: usize,

    pub pages_rewritten: usize,
    pub stylesheets_rewritten: usize,
    pub references_rewritten: usize,
    pub rewrite_failures: usize,

    /// Images copied into the flat image folder, when one is kept
    pub images_collected: usize,
    pub images_dir: Option<PathBuf>,

    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,

    /// The crawl stopped early on request
    pub cancelled: bool,

    pub output_dir: PathBuf,
}

impl MirrorStats {
    pub fn new(
        counts: FrontierCounts,
        rewrite: RewriteSummary,
        started_at: DateTime<Local>,
        cancelled: bool,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            pages_saved: counts.pages_saved,
            resources_saved: counts.resources_saved,
            pages_failed: counts.pages_failed,
            resources_failed: counts.resources_failed,
            skipped_robots: counts.skipped_robots,
            skipped_cross_origin: counts.skipped_cross_origin,
            pages_unvisited: counts.pages_unvisited,
            resources_unvisited: counts.resources_unvisited,
            fetch_attempts: counts.fetch_attempts,
            pages_rewritten: rewrite.pages,
            stylesheets_rewritten: rewrite.stylesheets,
            references_rewritten: rewrite.references,
            rewrite_failures: rewrite.failures,
            images_collected: 0,
            images_dir: None,
            started_at,
            finished_at: Local::now(),
            cancelled,
            output_dir,
        }
    }

    /// Records the flat image folder and how many images went into it
    pub fn with_images(mut self, collected: usize, dir: Option<PathBuf>) -> Self {
        self.images_collected = collected;
        self.images_dir = dir;
        self
    }

    /// Pages and resources that failed (skips excluded)
    pub fn failed(&self) -> usize {
        self.pages_failed + self.resources_failed
    }

    pub fn files_saved(&self) -> usize {
        self.pages_saved + self.resources_saved
    }

    pub fn files_rewritten(&self) -> usize {
        self.pages_rewritten + self.stylesheets_rewritten
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Formats a duration as `1h 02m 03s`, `2m 03s` or `4.2s`
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_milliseconds().max(0);
    let secs = total / 1000;
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", total as f64 / 1000.0)
    }
}

/// Prints the final summary to stdout
pub fn print_summary(stats: &MirrorStats) {
    println!();
    if stats.cancelled {
        println!("=== Mirror Stopped (partial output) ===\n");
    } else {
        println!("=== Mirror Complete ===\n");
    }

    println!("Saved:");
    println!("  Pages: {}", stats.pages_saved);
    println!("  Resources: {}", stats.resources_saved);
    println!();

    println!("Not saved:");
    println!(
        "  Failed: {} ({} pages, {} resources)",
        stats.failed(),
        stats.pages_failed,
        stats.resources_failed
    );
    println!("  Disallowed by robots.txt: {}", stats.skipped_robots);
    println!("  Outside the site: {}", stats.skipped_cross_origin);
    println!("  Pages left unvisited: {}", stats.pages_unvisited);
    if stats.resources_unvisited > 0 {
        println!("  Resources left undownloaded: {}", stats.resources_unvisited);
    }
    println!();

    println!("Rewritten:");
    println!(
        "  Files: {} ({} pages, {} stylesheets)",
        stats.files_rewritten(),
        stats.pages_rewritten,
        stats.stylesheets_rewritten
    );
    println!("  References: {}", stats.references_rewritten);
    if stats.rewrite_failures > 0 {
        println!("  Failures: {}", stats.rewrite_failures);
    }
    println!();

    println!(
        "Started {}, finished {} ({})",
        stats.started_at.format("%Y-%m-%d %H:%M:%S"),
        stats.finished_at.format("%H:%M:%S"),
        format_elapsed(stats.elapsed())
    );
    println!("Output directory: {}", stats.output_dir.display());
    if let Some(dir) = &stats.images_dir {
        println!(
            "Image folder: {} ({} images)",
            dir.display(),
            stats.images_collected
        );
    }
}
