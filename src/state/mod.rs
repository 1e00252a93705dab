//! State module for tracking crawl tasks
//!
//! # Components
//!
//! - `Task` / `TaskStatus`: the record of one crawl request and its lifecycle
//! - `TaskUpdate`: partial, last-write-wins changes to a task
//! - `TaskStore`: owns all task records and publishes every change

mod store;
mod task;

use thiserror::Error;

// Re-export main types
pub use store::TaskStore;
pub use task::{CrawlMode, NewTask, Task, TaskStatus, TaskUpdate};

/// Errors raised by task lifecycle operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task already exists: {0}")]
    AlreadyExists(String),

    #[error("Task {task_id} is already {status} and accepts no further updates")]
    Terminal { task_id: String, status: TaskStatus },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}
