//! Crawler module for documentation page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetcher`] seam
//! - HTML parsing, content extraction and link discovery
//! - The breadth-first frontier with its page budget
//! - The [`CrawlEngine`] that drives a task from start to a terminal status

mod engine;
mod fetcher;
mod frontier;
mod parser;

pub use engine::CrawlEngine;
pub use fetcher::{build_http_client, FetchedPage, Fetcher, HttpFetcher};
pub use frontier::Frontier;
pub use parser::{
    extract_navigation_entries, extract_navigation_links, parse_page, CodeBlock, Heading,
    NavigationLink, ParsedPage,
};
