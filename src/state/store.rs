//! In-memory task store
//!
//! Every accepted update is followed by a publish of the merged record through
//! the [`ProgressBroadcaster`]. When a task reaches a terminal status a removal
//! is scheduled after the configured cleanup delay; the record is then deleted
//! and observers receive a `Removed` event.

use crate::progress::{ProgressBroadcaster, ProgressEvent};
use crate::state::{NewTask, Task, TaskError, TaskUpdate};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct TaskEntry {
    task: Task,
    /// Distinguishes a re-created id from the record a cleanup was scheduled for
    generation: u64,
    cleanup_scheduled: bool,
}

#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<Mutex<HashMap<String, TaskEntry>>>,
    generations: Arc<AtomicU64>,
    broadcaster: ProgressBroadcaster,
    cleanup_delay: Duration,
}

impl TaskStore {
    pub fn new(broadcaster: ProgressBroadcaster, cleanup_delay: Duration) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
            broadcaster,
            cleanup_delay,
        }
    }

    pub fn broadcaster(&self) -> &ProgressBroadcaster {
        &self.broadcaster
    }

    /// Inserts a new queued task
    pub fn create(&self, task_id: &str, new_task: NewTask) -> Result<Task, TaskError> {
        let mut tasks = self.lock();
        if tasks.contains_key(task_id) {
            return Err(TaskError::AlreadyExists(task_id.to_string()));
        }

        let task = Task::new(task_id, new_task);
        tasks.insert(
            task_id.to_string(),
            TaskEntry {
                task: task.clone(),
                generation: self.generations.fetch_add(1, Ordering::Relaxed),
                cleanup_scheduled: false,
            },
        );

        tracing::debug!("Created task {} for {}", task_id, task.seed_url);
        Ok(task)
    }

    /// Merges `update` into the task and publishes the result
    pub fn update(&self, task_id: &str, update: TaskUpdate) -> Result<Task, TaskError> {
        let (task, schedule_generation) = {
            let mut tasks = self.lock();
            let entry = tasks
                .get_mut(task_id)
                .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;

            entry.task.apply(update)?;

            let schedule = entry.task.status.is_terminal() && !entry.cleanup_scheduled;
            if schedule {
                entry.cleanup_scheduled = true;
            }
            (entry.task.clone(), schedule.then_some(entry.generation))
        };

        self.broadcaster.publish(
            task_id,
            ProgressEvent::TaskUpdate(task.progress_update(Utc::now())),
        );

        if let Some(generation) = schedule_generation {
            self.schedule_cleanup(task_id, generation);
        }

        Ok(task)
    }

    pub fn get(&self, task_id: &str) -> Result<Task, TaskError> {
        self.lock()
            .get(task_id)
            .map(|entry| entry.task.clone())
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))
    }

    /// Deletes the task immediately
    pub fn remove(&self, task_id: &str) -> Option<Task> {
        self.lock().remove(task_id).map(|entry| entry.task)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn schedule_cleanup(&self, task_id: &str, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                "No async runtime available; task {} will not be cleaned up",
                task_id
            );
            return;
        };

        let store = self.clone();
        let task_id = task_id.to_string();
        let delay = self.cleanup_delay;

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            store.expire(&task_id, generation);
        });
    }

    fn expire(&self, task_id: &str, generation: u64) {
        let removed = {
            let mut tasks = self.lock();
            match tasks.get(task_id) {
                Some(entry) if entry.generation == generation => {
                    tasks.remove(task_id);
                    true
                }
                _ => false,
            }
        };

        if removed {
            tracing::debug!("Cleaned up task {}", task_id);
            self.broadcaster.publish(
                task_id,
                ProgressEvent::Removed {
                    task_id: task_id.to_string(),
                    timestamp: Utc::now(),
                },
            );
            self.broadcaster.close(task_id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
