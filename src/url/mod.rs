//! URL handling module for doc-harvest
//!
//! This module provides URL normalization, host extraction, site scoping, and
//! the documentation-path filter that decides which discovered links a crawl
//! follows.

mod domain;
mod normalize;

use ::url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_same_site};
pub use normalize::normalize_url;

/// Path fragments that mark a page as documentation
const DOC_PATH_MARKERS: &[&str] = &[
    "/docs",
    "/documentation",
    "/guide",
    "/tutorial",
    "/manual",
    "/reference",
    "/api",
];

/// File extensions that are never crawled
const SKIPPED_EXTENSIONS: &[&str] = &[".pdf", ".zip", ".tar", ".gz", ".exe", ".dmg"];

/// Path fragments for pages that are never crawled
const SKIPPED_PATH_MARKERS: &[&str] = &["/download", "/signin", "/login", "/register"];

/// Returns true if the URL path looks like documentation
///
/// The path must contain one of the documentation markers, must not point at
/// a binary download, and must not be an account page. Matching is
/// case-insensitive.
pub fn is_documentation_url(url: &Url) -> bool {
    let path = url.path().to_lowercase();

    DOC_PATH_MARKERS.iter().any(|marker| path.contains(marker))
        && !SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        && !SKIPPED_PATH_MARKERS.iter().any(|marker| path.contains(marker))
}

/// Decides whether a link found during a crawl seeded on `seed_host` is followed
pub fn should_follow(seed_host: &str, link: &Url) -> bool {
    match extract_domain(link) {
        Some(host) => is_same_site(seed_host, &host) && is_documentation_url(link),
        None => false,
    }
}
