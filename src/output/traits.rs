//! Output handler traits and types
//!
//! This module defines the persistence interface a crawl hands its pages to,
//! and the page record itself.

use crate::crawler::{CodeBlock, Heading};
use crate::planner::PlanPriority;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One page captured by a crawl run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub content: String,
    pub links: Vec<String>,
    pub headings: Vec<Heading>,
    pub code_blocks: Vec<CodeBlock>,
    pub scraped_at: DateTime<Utc>,

    /// Plan category, for pages fetched from an intelligent-mode plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<PlanPriority>,

    /// Completion-service summary, or the title when the service was unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
}

impl ScrapedPage {
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Receives the pages of a finished crawl
#[async_trait]
pub trait PagePersister: Send + Sync {
    /// Stores `pages` harvested for `framework`
    async fn persist(&self, framework: &str, pages: &[ScrapedPage]) -> OutputResult<()>;
}
