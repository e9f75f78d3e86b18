//! Download orchestration
//!
//! Drives one episode download from registration to a terminal state:
//!
//! 1. build the remote source URL and the local relative path
//! 2. register the task and get its correlation id
//! 3. resolve the destination inside the app directory
//! 4. subscribe to progress events for that id
//! 5. run the transfer, forwarding progress to the registry and notifications
//! 6. complete the task, or mark it `error` on any failure
//!
//! The progress subscription and the task itself are held by drop guards, so
//! a dropped (cancelled) download future still releases the subscription,
//! marks the task `error` and replaces its progress notification.

use std::sync::Arc;
use thiserror::Error;

use super::filesystem::AppDirectory;
use super::transfer::{FileTransfer, TransferError, TransferOutcome, TransferRequest};
use crate::models::{notification_id, Episode, ProgressEvent, ShowDetails};
use crate::notifications::NotificationBridge;
use crate::store::DownloadRegistry;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("download {id}: could not prepare destination: {source}")]
    Destination {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download {id} failed: {source}")]
    Transfer {
        id: String,
        #[source]
        source: TransferError,
    },
}

impl DownloadError {
    /// Correlation id of the failed task
    pub fn id(&self) -> &str {
        match self {
            DownloadError::Destination { id, .. } | DownloadError::Transfer { id, .. } => id,
        }
    }
}

/// Where an episode comes from and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub source_url: String,
    /// Path relative to the app directory (`<show folder>/<file>`)
    pub local_path: String,
    pub source_label: String,
    pub item_label: String,
    pub thumbnail_ref: Option<String>,
}

impl DownloadPlan {
    pub fn new(server_url: &str, show: &ShowDetails, episode: &Episode) -> Self {
        let base = server_url.trim_end_matches('/');
        Self {
            source_url: format!("{}/midia/{}/{}", base, show.folder, episode.file),
            local_path: format!("{}/{}", show.folder, episode.file),
            source_label: show.name.clone(),
            item_label: episode.label().to_string(),
            thumbnail_ref: show.poster.clone(),
        }
    }
}

pub struct DownloadOrchestrator {
    registry: DownloadRegistry,
    transfer: Arc<dyn FileTransfer>,
    app_dir: AppDirectory,
    notifications: Option<NotificationBridge>,
}

impl DownloadOrchestrator {
    pub fn new(
        registry: DownloadRegistry,
        transfer: Arc<dyn FileTransfer>,
        app_dir: AppDirectory,
    ) -> Self {
        Self {
            registry,
            transfer,
            app_dir,
            notifications: None,
        }
    }

    /// Mirror progress and completion into OS notifications
    pub fn with_notifications(mut self, bridge: NotificationBridge) -> Self {
        self.notifications = Some(bridge);
        self
    }

    pub fn registry(&self) -> &DownloadRegistry {
        &self.registry
    }

    pub fn app_dir(&self) -> &AppDirectory {
        &self.app_dir
    }

    /// Download one episode. Returns the task id once it is completed.
    ///
    /// On failure the task is left in the `error` state and the error is
    /// returned. A retry is a new call and gets a new task id.
    pub async fn start_download(
        &self,
        server_url: &str,
        show: &ShowDetails,
        episode: &Episode,
    ) -> Result<String, DownloadError> {
        self.run(DownloadPlan::new(server_url, show, episode)).await
    }

    /// Execute a prepared plan
    pub async fn run(&self, plan: DownloadPlan) -> Result<String, DownloadError> {
        let id = self.registry.add(
            &plan.source_label,
            &plan.item_label,
            plan.thumbnail_ref.clone(),
            &plan.source_url,
        );
        let notify_id = notification_id(&id);
        let guard = TaskGuard {
            registry: self.registry.clone(),
            notifications: self.notifications.clone(),
            id: id.clone(),
            notify_id,
            item_label: plan.item_label.clone(),
            armed: true,
        };
        log::info!("Starting download {} from {}", id, plan.source_url);

        let result = self.transfer_with_progress(&id, notify_id, &plan).await;
        guard.disarm();

        match result {
            Ok(outcome) => {
                self.registry.complete(&id, &plan.local_path);
                if let Some(bridge) = &self.notifications {
                    bridge.show_complete(notify_id, &plan.item_label, true).await;
                }
                log::info!(
                    "Download {} finished: {} bytes at {:?}",
                    id,
                    outcome.bytes,
                    outcome.path
                );
                Ok(id)
            }
            Err(e) => {
                log::error!("Download {} ({}) failed: {}", id, plan.local_path, e);
                self.registry.fail(&id);
                if let Some(bridge) = &self.notifications {
                    bridge.show_complete(notify_id, &plan.item_label, false).await;
                }
                Err(e)
            }
        }
    }

    async fn transfer_with_progress(
        &self,
        id: &str,
        notify_id: i32,
        plan: &DownloadPlan,
    ) -> Result<TransferOutcome, DownloadError> {
        let target = self
            .app_dir
            .resolve(&plan.local_path)
            .await
            .map_err(|source| DownloadError::Destination {
                id: id.to_string(),
                source,
            })?;

        // Subscribe before starting so no early event is missed
        let mut subscription = self.transfer.progress().subscribe(id);
        let mut last_percent: Option<u8> = None;

        let transfer = self.transfer.download(TransferRequest {
            source: plan.source_url.clone(),
            target,
            id: id.to_string(),
        });
        tokio::pin!(transfer);

        let result = loop {
            tokio::select! {
                biased;
                Some(event) = subscription.recv() => {
                    self.apply_progress(&event, notify_id, &plan.item_label, &mut last_percent).await;
                }
                result = &mut transfer => break result,
            }
        };

        while let Some(event) = subscription.try_recv() {
            self.apply_progress(&event, notify_id, &plan.item_label, &mut last_percent)
                .await;
        }

        result.map_err(|source| DownloadError::Transfer {
            id: id.to_string(),
            source,
        })
    }

    async fn apply_progress(
        &self,
        event: &ProgressEvent,
        notify_id: i32,
        title: &str,
        last_percent: &mut Option<u8>,
    ) {
        let Some(percent) = event.percent() else {
            return;
        };
        if *last_percent == Some(percent) {
            return;
        }
        *last_percent = Some(percent);

        self.registry.update_progress(&event.id, percent);
        if let Some(bridge) = &self.notifications {
            bridge.show_progress(notify_id, title, percent).await;
        }
    }
}

/// Fails the task if the download future is dropped before finishing
struct TaskGuard {
    registry: DownloadRegistry,
    notifications: Option<NotificationBridge>,
    id: String,
    notify_id: i32,
    item_label: String,
    armed: bool,
}

impl TaskGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        log::warn!("Download {}: {}", self.id, TransferError::Cancelled);
        self.registry.fail(&self.id);

        // Can't await here; hand the final notification to the runtime if any
        let Some(bridge) = self.notifications.clone() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let notify_id = self.notify_id;
                let label = std::mem::take(&mut self.item_label);
                handle.spawn(async move {
                    bridge.show_complete(notify_id, &label, false).await;
                });
            }
            Err(_) => log::debug!("No runtime to notify cancellation of {}", self.id),
        }
    }
}
