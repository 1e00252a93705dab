//! doc-harvest: framework documentation discovery and crawling
//!
//! This crate locates the official documentation site of a software framework,
//! crawls it politely (basic breadth-first or plan-driven intelligent mode),
//! and persists cleaned page text while streaming task progress to subscribers.

pub mod config;
pub mod crawler;
pub mod harvester;
pub mod output;
pub mod planner;
pub mod progress;
pub mod resilience;
pub mod search;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for doc-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Outbound call failed: {0}")]
    Call(#[from] resilience::CallError),

    #[error("Task error: {0}")]
    Task(#[from] state::TaskError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("no pages could be scraped from {seed}")]
    NoPagesScraped { seed: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for doc-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use harvester::{DiscoverRequest, Harvester, StartRequest};
pub use planner::{DocumentationLookup, Topic, TopicDiscovery};
pub use progress::{ProgressEvent, ProgressUpdate, Subscription};
pub use search::SearchHit;
pub use state::{CrawlMode, Task, TaskStatus};
pub use crate::url::{extract_domain, normalize_url};
