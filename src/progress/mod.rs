//! Progress broadcasting between crawl workers and observers
//!
//! Each task identifier has at most one primary sink: an unbounded channel
//! whose receiving half is held by a transport adapter (a terminal printer, a
//! streaming HTTP response, ...). Subscribing again replaces it. Observers are
//! additive: any number of them may follow one task side by side.
//!
//! Publishing is a non-blocking send to the primary sink and every observer;
//! a sink whose receiver has gone away is dropped on the next publish. Events
//! published before a sink registers are not replayed.

use crate::state::TaskStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Snapshot of a task sent to observers after every change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_scraped: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Event delivered to a task's sink
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The task record changed
    TaskUpdate(ProgressUpdate),

    /// The task record was removed after reaching a terminal state
    #[serde(rename_all = "camelCase")]
    Removed {
        task_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl ProgressEvent {
    pub fn task_id(&self) -> &str {
        match self {
            Self::TaskUpdate(update) => &update.task_id,
            Self::Removed { task_id, .. } => task_id,
        }
    }

    /// Returns true for an update carrying a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TaskUpdate(update) if update.status.is_terminal())
    }
}

struct Sink {
    id: u64,
    sender: UnboundedSender<ProgressEvent>,
}

/// Receiving end of a task's progress stream
#[derive(Debug)]
pub struct Subscription {
    task_id: String,
    id: u64,
    receiver: UnboundedReceiver<ProgressEvent>,
}

impl Subscription {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Waits for the next event
    ///
    /// Returns `None` once the sink has been unsubscribed, replaced, or closed
    /// and every buffered event has been drained.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.recv().await
    }

    /// Returns a buffered event without waiting
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Default)]
struct Registry {
    /// One replaceable sink per task
    primary: HashMap<String, Sink>,
    observers: HashMap<String, Vec<Sink>>,
}

/// Registry of progress sinks keyed by task identifier
#[derive(Clone, Default)]
pub struct ProgressBroadcaster {
    registry: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, task_id: &str) -> (Sink, Subscription) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let subscription = Subscription {
            task_id: task_id.to_string(),
            id,
            receiver,
        };
        (Sink { id, sender }, subscription)
    }

    /// Registers the primary sink for `task_id`, replacing any existing one
    pub fn subscribe(&self, task_id: &str) -> Subscription {
        let (sink, subscription) = self.open(task_id);

        let replaced = self
            .lock()
            .primary
            .insert(task_id.to_string(), sink)
            .is_some();
        if replaced {
            tracing::debug!("Replaced existing progress sink for task {}", task_id);
        }

        subscription
    }

    /// Adds an observer for `task_id` next to any existing sinks
    pub fn observe(&self, task_id: &str) -> Subscription {
        let (sink, subscription) = self.open(task_id);

        let mut registry = self.lock();
        let observers = registry.observers.entry(task_id.to_string()).or_default();
        observers.push(sink);
        tracing::debug!("Task {} now has {} observers", task_id, observers.len());

        subscription
    }

    /// Removes the sink registered by `subscription`
    ///
    /// Returns false for a subscription that was already replaced or removed.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut registry = self.lock();
        let task_id = &subscription.task_id;

        if registry
            .primary
            .get(task_id)
            .is_some_and(|sink| sink.id == subscription.id)
        {
            registry.primary.remove(task_id);
            return true;
        }

        let Some(observers) = registry.observers.get_mut(task_id) else {
            return false;
        };
        let before = observers.len();
        observers.retain(|sink| sink.id != subscription.id);
        let removed = observers.len() < before;
        if observers.is_empty() {
            registry.observers.remove(task_id);
        }
        removed
    }

    /// Sends `event` to the task's primary sink and observers
    ///
    /// Returns true if the event was handed to at least one live sink.
    pub fn publish(&self, task_id: &str, event: ProgressEvent) -> bool {
        let mut registry = self.lock();
        let mut delivered = false;

        if let Some(sink) = registry.primary.get(task_id) {
            if sink.sender.send(event.clone()).is_ok() {
                delivered = true;
            } else {
                tracing::debug!("Progress sink for task {} is gone, dropping it", task_id);
                registry.primary.remove(task_id);
            }
        }

        if let Some(observers) = registry.observers.get_mut(task_id) {
            observers.retain(|sink| sink.sender.send(event.clone()).is_ok());
            delivered |= !observers.is_empty();
            if observers.is_empty() {
                registry.observers.remove(task_id);
            }
        }

        delivered
    }

    /// Drops every sink of the task so their receivers end after draining
    pub fn close(&self, task_id: &str) {
        let mut registry = self.lock();
        registry.primary.remove(task_id);
        registry.observers.remove(task_id);
    }

    /// Returns true if the task has a primary sink
    pub fn is_subscribed(&self, task_id: &str) -> bool {
        self.lock().primary.contains_key(task_id)
    }

    pub fn observer_count(&self, task_id: &str) -> usize {
        self.lock().observers.get(task_id).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
