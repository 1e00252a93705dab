//! Configuration module for doc-harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section except `[user-agent]` falls back to defaults when omitted.
//!
//! # Example
//!
//! ```no_run
//! use doc_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CircuitBreakerConfig, CompletionConfig, Config, CrawlerConfig, Environment, OutputConfig,
    ResilienceConfig, SearchConfig, TaskConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
