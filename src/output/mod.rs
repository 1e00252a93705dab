//! Output module for crawled pages
//!
//! The crawl engine hands every finished run to a [`PagePersister`]. The
//! format is up to the implementation; [`JsonDirectoryPersister`] writes one
//! JSON file per page plus an index.

mod json;
mod traits;

pub use json::JsonDirectoryPersister;
pub use traits::{OutputError, OutputResult, PagePersister, ScrapedPage};
