//! Download registry
//!
//! In-memory list of download tasks. Not persisted: the list starts empty on
//! every run. Each mutation runs under the channel's write lock and publishes
//! the whole list, so subscribers never see a half-updated task. Tasks in a
//! terminal state are never changed again.

use std::sync::Arc;
use tokio::sync::watch;

use super::Writable;
use crate::models::{DownloadStatus, DownloadTask};

/// Shared handle to the task list; clones point at the same registry
#[derive(Clone)]
pub struct DownloadRegistry {
    tasks: Arc<Writable<Vec<DownloadTask>>>,
}

impl Default for DownloadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Writable::new(Vec::new())),
        }
    }

    /// Register a new task in the downloading state and return its id
    pub fn add(
        &self,
        source_label: &str,
        item_label: &str,
        thumbnail_ref: Option<String>,
        source_url: &str,
    ) -> String {
        let task = DownloadTask::new(source_label, item_label, thumbnail_ref, source_url);
        let id = task.id.clone();
        self.tasks.modify_if(|tasks| {
            tasks.push(task);
            true
        });
        log::debug!("Registered download {} ({} - {})", id, source_label, item_label);
        id
    }

    /// Set the progress percentage of a task; unknown ids are ignored
    pub fn update_progress(&self, id: &str, progress: u8) {
        self.modify(id, |task| task.progress = progress.min(100));
    }

    /// Mark a task completed at 100% with its local file path
    pub fn complete(&self, id: &str, local_path: &str) {
        self.modify(id, |task| {
            task.status = DownloadStatus::Completed;
            task.progress = 100;
            task.local_path = Some(local_path.to_string());
        });
    }

    /// Mark a task failed
    pub fn fail(&self, id: &str) {
        self.modify(id, |task| task.status = DownloadStatus::Error);
    }

    pub fn remove(&self, id: &str) {
        self.tasks.modify_if(|tasks| {
            let before = tasks.len();
            tasks.retain(|task| task.id != id);
            tasks.len() != before
        });
    }

    pub fn get(&self, id: &str) -> Option<DownloadTask> {
        self.tasks
            .with(|tasks| tasks.iter().find(|task| task.id == id).cloned())
    }

    pub fn tasks(&self) -> Vec<DownloadTask> {
        self.tasks.get()
    }

    /// Tasks that have not reached a terminal state
    pub fn active(&self) -> Vec<DownloadTask> {
        self.tasks.with(|tasks| {
            tasks
                .iter()
                .filter(|task| !task.status.is_terminal())
                .cloned()
                .collect()
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<DownloadTask>> {
        self.tasks.subscribe()
    }

    /// Apply `f` to the matching task. Unknown ids and finished tasks are
    /// left alone and nothing is published.
    fn modify(&self, id: &str, f: impl FnOnce(&mut DownloadTask)) {
        let changed = self.tasks.modify_if(|tasks| {
            match tasks.iter_mut().find(|task| task.id == id) {
                Some(task) if !task.status.is_terminal() => {
                    f(task);
                    true
                }
                _ => false,
            }
        });
        if !changed {
            log::debug!("Ignoring update for unknown or finished download {}", id);
        }
    }
}
