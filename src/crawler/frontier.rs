//! Crawl frontier
//!
//! This module handles:
//! - The two FIFO queues (pages, resources)
//! - First-seen-wins deduplication across both queues
//! - The page budget
//! - Recording the final resolution of every URL
//!
//! The frontier is owned by the crawl driver; nothing else mutates it.

use crate::crawler::PageReferences;
use crate::rewrite::{ContentKind, RewriteMap, SavedFile};
use crate::state::{Resolution, UrlState};
use crate::url::UrlKind;
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

#[derive(Debug, Clone, Copy)]
struct Entry {
    kind: UrlKind,
    state: UrlState,
}

/// Tallies of the frontier's per-URL outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierCounts {
    pub pages_saved: usize,
    pub resources_saved: usize,
    pub pages_failed: usize,
    pub resources_failed: usize,
    pub skipped_robots: usize,
    pub skipped_cross_origin: usize,
    /// Pages still queued when the crawl stopped
    pub pages_unvisited: usize,
    /// Resources still queued when the crawl stopped (only after cancellation)
    pub resources_unvisited: usize,
    /// Network requests started, pages and resources together
    pub fetch_attempts: usize,
    pub page_attempts: usize,
}

/// Dual-queue crawl scheduler
///
/// # Invariants
///
/// - A URL is enqueued at most once over the whole run
/// - A URL is in at most one queue at a time
/// - Once resolved, a URL never goes back into a queue
/// - At most `max_pages` page fetches are started
#[derive(Debug)]
pub struct Frontier {
    pending_pages: VecDeque<Url>,
    pending_resources: VecDeque<Url>,
    entries: HashMap<Url, Entry>,
    visited_pages: HashSet<Url>,
    attempted: HashSet<Url>,
    resolved: HashMap<Url, Resolution>,
    /// Where content was actually served from, when a redirect moved it
    served_from: HashMap<Url, Url>,
    /// Content kind as served, for saved files
    kinds: HashMap<Url, ContentKind>,
    max_pages: usize,
}

impl Frontier {
    /// Creates a frontier with `start_url` queued as a page
    pub fn new(start_url: Url, max_pages: usize) -> Self {
        let mut frontier = Self {
            pending_pages: VecDeque::new(),
            pending_resources: VecDeque::new(),
            entries: HashMap::new(),
            visited_pages: HashSet::new(),
            attempted: HashSet::new(),
            resolved: HashMap::new(),
            served_from: HashMap::new(),
            kinds: HashMap::new(),
            max_pages,
        };
        frontier.enqueue(start_url, UrlKind::Page);
        frontier
    }

    /// Current state of `url`
    pub fn state(&self, url: &Url) -> UrlState {
        self.entries
            .get(url)
            .map(|entry| entry.state)
            .unwrap_or(UrlState::Unseen)
    }

    /// Queues `url` unless it has been seen before
    ///
    /// Returns true if the URL was new.
    pub fn enqueue(&mut self, url: Url, kind: UrlKind) -> bool {
        if !self.admit(url.clone(), kind) {
            return false;
        }
        match kind {
            UrlKind::Page => self.pending_pages.push_back(url),
            UrlKind::Resource => self.pending_resources.push_back(url),
        }
        true
    }

    /// Registers `url` as queued without placing it in a frontier queue
    ///
    /// Used for follow-up batches the caller holds itself. Returns true if the URL
    /// was new.
    pub fn admit(&mut self, url: Url, kind: UrlKind) -> bool {
        if self.entries.contains_key(&url) {
            return false;
        }
        self.entries.insert(
            url,
            Entry {
                kind,
                state: UrlState::Queued(kind),
            },
        );
        true
    }

    /// Queues every reference found on a page
    ///
    /// Returns the number of new pages and new resources.
    pub fn enqueue_references(&mut self, refs: PageReferences) -> (usize, usize) {
        let pages = refs
            .pages
            .into_iter()
            .filter(|url| self.enqueue(url.clone(), UrlKind::Page))
            .count();
        let resources = refs
            .resources
            .into_iter()
            .filter(|url| self.enqueue(url.clone(), UrlKind::Resource))
            .count();
        (pages, resources)
    }

    /// Returns true while another page fetch may be started
    pub fn has_page_budget(&self) -> bool {
        self.visited_pages.len() < self.max_pages
    }

    /// Takes the next page, if any remain and the budget allows
    pub fn next_page(&mut self) -> Option<Url> {
        if !self.has_page_budget() {
            return None;
        }
        let url = self.pending_pages.pop_front()?;
        self.set_state(&url, UrlState::InFlight);
        Some(url)
    }

    /// Takes up to `max` resources from the front of the queue
    pub fn next_resource_batch(&mut self, max: usize) -> Vec<Url> {
        let take = max.min(self.pending_resources.len());
        let batch: Vec<Url> = self.pending_resources.drain(..take).collect();
        for url in &batch {
            self.set_state(url, UrlState::InFlight);
        }
        batch
    }

    /// Puts untouched resources back at the front of the queue, keeping their order
    pub fn requeue_resources(&mut self, urls: impl IntoIterator<Item = Url>) {
        let urls: Vec<Url> = urls.into_iter().collect();
        for url in urls.into_iter().rev() {
            self.set_state(&url, UrlState::Queued(UrlKind::Resource));
            self.pending_resources.push_front(url);
        }
    }

    pub fn has_pending_pages(&self) -> bool {
        self.has_page_budget() && !self.pending_pages.is_empty()
    }

    pub fn has_pending_resources(&self) -> bool {
        !self.pending_resources.is_empty()
    }

    /// Returns true when nothing more will be fetched
    pub fn is_drained(&self) -> bool {
        !self.has_pending_pages() && !self.has_pending_resources()
    }

    /// Records that a network request for `url` is starting
    ///
    /// Page fetches count against the budget. Returns false if `url` was already
    /// fetched once, which the queue invariants rule out.
    pub fn begin_fetch(&mut self, url: &Url) -> bool {
        let is_page = matches!(
            self.entries.get(url),
            Some(Entry {
                kind: UrlKind::Page,
                ..
            })
        );
        if is_page {
            self.visited_pages.insert(url.clone());
        }
        self.set_state(url, UrlState::InFlight);
        self.attempted.insert(url.clone())
    }

    /// Records the final outcome for `url`
    pub fn resolve(&mut self, url: Url, resolution: Resolution) {
        self.set_state(&url, resolution.state());
        self.resolved.insert(url, resolution);
    }

    /// Notes that `url` was served from `final_url` after redirects
    ///
    /// The final URL is registered as saved at the same path so it is never fetched
    /// again under its second name.
    /// Records what `url` was served as, so the rewrite pass need not guess from its path
    pub fn record_content(&mut self, url: &Url, kind: ContentKind) {
        self.kinds.insert(url.clone(), kind);
    }

    pub fn record_final_url(&mut self, url: &Url, final_url: Url) {
        if &final_url == url {
            return;
        }
        let kind = self
            .entries
            .get(url)
            .map(|entry| entry.kind)
            .unwrap_or(UrlKind::Resource);
        if !self.entries.contains_key(&final_url) {
            self.entries.insert(
                final_url.clone(),
                Entry {
                    kind,
                    state: UrlState::Saved,
                },
            );
        }
        self.served_from.insert(url.clone(), final_url);
    }

    fn set_state(&mut self, url: &Url, state: UrlState) {
        if let Some(entry) = self.entries.get_mut(url) {
            entry.state = state;
        }
    }

    pub fn resolution(&self, url: &Url) -> Option<&Resolution> {
        self.resolved.get(url)
    }

    /// Number of network fetches started
    pub fn fetch_attempts(&self) -> usize {
        self.attempted.len()
    }

    pub fn pages_visited(&self) -> usize {
        self.visited_pages.len()
    }

    pub fn counts(&self) -> FrontierCounts {
        let mut counts = FrontierCounts {
            pages_unvisited: self.pending_pages.len(),
            resources_unvisited: self.pending_resources.len(),
            fetch_attempts: self.attempted.len(),
            page_attempts: self.visited_pages.len(),
            ..FrontierCounts::default()
        };

        for (url, resolution) in &self.resolved {
            let kind = self
                .entries
                .get(url)
                .map(|entry| entry.kind)
                .unwrap_or(UrlKind::Resource);
            match (resolution.state(), kind) {
                (UrlState::Saved, UrlKind::Page) => counts.pages_saved += 1,
                (UrlState::Saved, UrlKind::Resource) => counts.resources_saved += 1,
                (UrlState::SkippedByRobots, _) => counts.skipped_robots += 1,
                (UrlState::SkippedCrossOrigin, _) => counts.skipped_cross_origin += 1,
                (_, UrlKind::Page) => counts.pages_failed += 1,
                (_, UrlKind::Resource) => counts.resources_failed += 1,
            }
        }

        counts
    }

    /// Freezes the successful entries into the map used by the rewrite pass
    pub fn into_rewrite_map(self) -> RewriteMap {
        let mut paths = HashMap::new();
        let mut aliases = Vec::new();
        let mut files = Vec::new();

        for (url, resolution) in self.resolved {
            let Resolution::Resolved(path) = resolution else {
                continue;
            };
            let base_url = self
                .served_from
                .get(&url)
                .cloned()
                .unwrap_or_else(|| url.clone());
            if base_url != url {
                aliases.push((base_url.clone(), path.clone()));
            }
            let kind = self
                .kinds
                .get(&url)
                .copied()
                .unwrap_or_else(|| ContentKind::from_path(&path));
            paths.insert(url.clone(), path.clone());
            files.push(SavedFile {
                url,
                base_url,
                path,
                kind,
            });
        }

        // A URL saved under its own name keeps that path
        for (alias, path) in aliases {
            paths.entry(alias).or_insert(path);
        }

        files.sort_by(|a, b| a.path.as_path().cmp(b.path.as_path()));
        RewriteMap::new(paths, files)
    }
}
