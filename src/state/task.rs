//! Task record and lifecycle definitions
//!
//! A task moves through `Queued -> InProgress -> {Completed, Error}`; a queued
//! task may also fail directly. Terminal states are absorbing.

use crate::progress::ProgressUpdate;
use crate::state::TaskError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents the current state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but no work started yet
    Queued,

    /// Crawl or planning work is running
    InProgress,

    // ===== Terminal States =====
    /// Finished and handed pages to the persister
    Completed,

    /// Aborted with an error message
    Error,
}

impl TaskStatus {
    /// Returns true if no further updates are accepted
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// Staying in the same non-terminal state is always allowed.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match (self, next) {
            (Self::Queued, Self::Queued) => true,
            (Self::Queued, Self::InProgress) => true,
            (Self::Queued, Self::Error) => true,
            (Self::InProgress, Self::InProgress) => true,
            (Self::InProgress, Self::Completed) => true,
            (Self::InProgress, Self::Error) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a crawl run chooses which pages to visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrawlMode {
    /// Breadth-first traversal from the seed URL
    Basic,

    /// Navigation discovery plus a completion-service plan focused on `topic`
    Intelligent { topic: Option<String> },
}

impl CrawlMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intelligent { .. } => "intelligent",
        }
    }
}

impl Default for CrawlMode {
    fn default() -> Self {
        Self::Intelligent { topic: None }
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CrawlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "intelligent" => Ok(Self::Intelligent { topic: None }),
            other => Err(format!(
                "mode must be either \"intelligent\" or \"basic\", got \"{}\"",
                other
            )),
        }
    }
}

/// Fields supplied when a task is created
#[derive(Debug, Clone)]
pub struct NewTask {
    pub seed_url: String,
    pub framework: String,
    pub mode: CrawlMode,
}

/// One crawl request tracked through its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub seed_url: String,
    pub framework: String,
    pub mode: CrawlMode,
    pub status: TaskStatus,
    pub progress: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_scraped: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<String>, new_task: NewTask) -> Self {
        Self {
            id: id.into(),
            seed_url: new_task.seed_url,
            framework: new_task.framework,
            mode: new_task.mode,
            status: TaskStatus::Queued,
            progress: 0.0,
            message: "Starting...".to_string(),
            pages_scraped: None,
            total_pages: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Merges `update` into the record
    ///
    /// Progress never moves backwards and is clamped to `0..=100`.
    pub fn apply(&mut self, update: TaskUpdate) -> Result<(), TaskError> {
        if self.status.is_terminal() {
            return Err(TaskError::Terminal {
                task_id: self.id.clone(),
                status: self.status,
            });
        }

        if let Some(next) = update.status {
            if !self.status.can_transition_to(next) {
                return Err(TaskError::InvalidTransition {
                    from: self.status,
                    to: next,
                });
            }
            self.status = next;
        }

        if let Some(progress) = update.progress {
            let progress = progress.clamp(0.0, 100.0);
            if progress < self.progress {
                tracing::debug!(
                    "Ignoring backwards progress {:.1} -> {:.1} for task {}",
                    self.progress,
                    progress,
                    self.id
                );
            } else {
                self.progress = progress;
            }
        }

        if let Some(message) = update.message {
            self.message = message;
        }
        if update.pages_scraped.is_some() {
            self.pages_scraped = update.pages_scraped;
        }
        if update.total_pages.is_some() {
            self.total_pages = update.total_pages;
        }
        if update.error.is_some() {
            self.error = update.error;
        }

        Ok(())
    }

    pub fn progress_update(&self, timestamp: DateTime<Utc>) -> ProgressUpdate {
        ProgressUpdate {
            task_id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            pages_scraped: self.pages_scraped,
            total_pages: self.total_pages,
            error: self.error.clone(),
            timestamp,
        }
    }
}

/// Partial update; `None` fields leave the record untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub pages_scraped: Option<usize>,
    pub total_pages: Option<usize>,
    pub error: Option<String>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn pages(mut self, scraped: usize, total: usize) -> Self {
        self.pages_scraped = Some(scraped);
        self.total_pages = Some(total);
        self
    }

    /// Terminal success with progress 100
    pub fn completed(message: impl Into<String>) -> Self {
        Self::new()
            .status(TaskStatus::Completed)
            .progress(100.0)
            .message(message)
    }

    /// Terminal failure carrying `error` as both message and error text
    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            status: Some(TaskStatus::Error),
            message: Some(format!("Error: {}", error)),
            error: Some(error),
            ..Self::default()
        }
    }
}
