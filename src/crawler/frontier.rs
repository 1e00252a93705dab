//! Breadth-first crawl frontier
//!
//! A FIFO queue of discovered URLs plus the set of every URL the run has
//! already queued or visited. URLs are compared by their normalized form, so
//! `/docs/a#intro` and `/docs/a?utm_source=x` are the same page.

use crate::url::normalize_url;
use std::collections::{HashSet, VecDeque};
use url::Url;

pub struct Frontier {
    queue: VecDeque<Url>,

    /// Normalized keys of everything queued, visited, or reached by redirect
    known: HashSet<String>,

    /// Normalized keys of pages actually fetched, including redirect targets
    fetched: HashSet<String>,

    visited: usize,
    max_pages: usize,
}

impl Frontier {
    pub fn new(max_pages: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            known: HashSet::new(),
            fetched: HashSet::new(),
            visited: 0,
            max_pages,
        }
    }

    /// Creates a frontier holding only `seed`
    pub fn seeded(seed: Url, max_pages: usize) -> Self {
        let mut frontier = Self::new(max_pages);
        frontier.push(seed);
        frontier
    }

    /// Queues `url` unless it was seen before
    ///
    /// Returns true if the URL was added.
    pub fn push(&mut self, url: Url) -> bool {
        if self.known.insert(page_key(&url)) {
            self.queue.push_back(url);
            true
        } else {
            false
        }
    }

    /// Dequeues the next URL and counts it as visited
    ///
    /// Returns `None` once the queue is empty or the page budget is spent.
    pub fn next_url(&mut self) -> Option<Url> {
        if self.visited >= self.max_pages {
            return None;
        }

        let url = self.queue.pop_front()?;
        self.fetched.insert(page_key(&url));
        self.visited += 1;
        Some(url)
    }

    /// Records that fetching `requested` ended at `landed`
    ///
    /// A pending queue entry for the landing page is dropped, since its
    /// content is already in hand. Returns false when the landing page was
    /// fetched earlier in the run and must not be scraped again.
    pub fn resolve_redirect(&mut self, requested: &Url, landed: &Url) -> bool {
        let landed_key = page_key(landed);
        if landed_key == page_key(requested) {
            return true;
        }

        self.queue.retain(|queued| page_key(queued) != landed_key);
        self.known.insert(landed_key.clone());
        self.fetched.insert(landed_key)
    }

    pub fn visited(&self) -> usize {
        self.visited
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Visited plus queued, capped at the page budget
    pub fn estimated_total(&self) -> usize {
        (self.visited + self.queue.len()).min(self.max_pages)
    }
}

/// Normalized form of `url` used to compare pages
pub(crate) fn page_key(url: &Url) -> String {
    normalize_url(url.as_str())
        .map(String::from)
        .unwrap_or_else(|_| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::seeded(url("https://example.com/docs/"), 10);
        frontier.push(url("https://example.com/docs/a"));
        frontier.push(url("https://example.com/docs/b"));

        assert_eq!(frontier.next_url().unwrap().path(), "/docs/");
        assert_eq!(frontier.next_url().unwrap().path(), "/docs/a");
        assert_eq!(frontier.next_url().unwrap().path(), "/docs/b");
        assert!(frontier.next_url().is_none());
        assert_eq!(frontier.visited(), 3);
    }

    #[test]
    fn test_duplicates_rejected_by_normalized_form() {
        let mut frontier = Frontier::seeded(url("https://example.com/docs/a"), 10);

        assert!(!frontier.push(url("https://example.com/docs/a#intro")));
        assert!(!frontier.push(url("https://EXAMPLE.com/docs/a?utm_source=x")));
        assert!(frontier.push(url("https://example.com/docs/b")));
        assert_eq!(frontier.queued(), 2);
    }

    #[test]
    fn test_visited_urls_never_requeued() {
        let mut frontier = Frontier::seeded(url("https://example.com/docs/"), 10);
        frontier.next_url();

        assert!(!frontier.push(url("https://example.com/docs/")));
        assert!(frontier.next_url().is_none());
    }

    #[test]
    fn test_page_budget() {
        let mut frontier = Frontier::seeded(url("https://example.com/docs/"), 2);
        for page in ["a", "b", "c", "d"] {
            frontier.push(url(&format!("https://example.com/docs/{}", page)));
        }

        assert_eq!(frontier.estimated_total(), 2);
        assert!(frontier.next_url().is_some());
        assert!(frontier.next_url().is_some());
        assert!(frontier.next_url().is_none());
        assert_eq!(frontier.visited(), 2);
    }

    #[test]
    fn test_redirect_target_never_queued_later() {
        let mut frontier = Frontier::seeded(url("https://example.com/docs"), 10);
        let requested = frontier.next_url().unwrap();

        assert!(frontier.resolve_redirect(&requested, &url("https://example.com/docs/")));
        assert!(!frontier.push(url("https://example.com/docs/")));
    }

    #[test]
    fn test_redirect_onto_queued_page_drops_the_queue_entry() {
        let mut frontier = Frontier::seeded(url("https://example.com/docs/"), 10);
        frontier.next_url();
        frontier.push(url("https://example.com/docs/old"));
        frontier.push(url("https://example.com/docs/b"));
        frontier.push(url("https://example.com/docs/c"));

        let requested = frontier.next_url().unwrap();
        assert!(frontier.resolve_redirect(&requested, &url("https://example.com/docs/b#top")));

        assert_eq!(frontier.queued(), 1);
        assert_eq!(frontier.next_url().unwrap().path(), "/docs/c");
        assert!(frontier.next_url().is_none());
    }

    #[test]
    fn test_redirect_onto_fetched_page_is_rejected() {
        let mut frontier = Frontier::seeded(url("https://example.com/docs/"), 10);
        frontier.next_url();
        frontier.push(url("https://example.com/docs/old"));

        let requested = frontier.next_url().unwrap();
        assert!(!frontier.resolve_redirect(&requested, &url("https://example.com/docs/")));
    }

    #[test]
    fn test_plain_fetch_is_not_a_redirect() {
        let mut frontier = Frontier::seeded(url("https://example.com/docs/a"), 10);
        let requested = frontier.next_url().unwrap();

        assert!(frontier.resolve_redirect(&requested, &url("https://example.com/docs/a#intro")));
    }
}
