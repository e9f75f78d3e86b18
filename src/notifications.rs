//! Download notifications
//!
//! Mirrors download lifecycle events into OS-level notifications through a
//! `NotificationService`. Every failure from the service is logged and
//! swallowed here; a broken notifier never interrupts a download.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub const CHANNEL_ID: &str = "downloads";
pub const CHANNEL_NAME: &str = "Downloads";

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("notification service unavailable: {0}")]
    Unavailable(String),
}

/// Notification channel (Android-style grouping)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub description: String,
    /// 3 = default importance
    pub importance: u8,
    /// 1 = public
    pub visibility: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressBar {
    pub value: u8,
    pub max: u8,
    pub indeterminate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i32,
    pub title: String,
    pub body: String,
    /// Ongoing notifications can't be swiped away
    pub ongoing: bool,
    pub auto_cancel: bool,
    pub channel_id: String,
    pub progress_bar: Option<ProgressBar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

/// Platform notification service
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn list_channels(&self) -> Result<Vec<Channel>, NotificationError>;
    async fn create_channel(&self, channel: Channel) -> Result<(), NotificationError>;
    async fn request_permission(&self) -> Result<PermissionState, NotificationError>;
    /// Show or replace notifications (matched by id)
    async fn schedule(&self, notifications: Vec<Notification>) -> Result<(), NotificationError>;
}

// =============================================================================
// Bridge
// =============================================================================

#[derive(Clone)]
pub struct NotificationBridge {
    service: Arc<dyn NotificationService>,
    channel_ready: Arc<AtomicBool>,
}

impl NotificationBridge {
    pub fn new(service: Arc<dyn NotificationService>) -> Self {
        Self {
            service,
            channel_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create the downloads channel unless it already exists
    pub async fn ensure_channel(&self) {
        if self.channel_ready.load(Ordering::Acquire) {
            return;
        }

        let result = async {
            let channels = self.service.list_channels().await?;
            if !channels.iter().any(|c| c.id == CHANNEL_ID) {
                self.service
                    .create_channel(Channel {
                        id: CHANNEL_ID.to_string(),
                        name: CHANNEL_NAME.to_string(),
                        description: "Media download notifications".to_string(),
                        importance: 3,
                        visibility: 1,
                    })
                    .await?;
            }
            Ok::<(), NotificationError>(())
        }
        .await;

        match result {
            Ok(()) => self.channel_ready.store(true, Ordering::Release),
            Err(e) => log::error!("Failed to create notification channel: {}", e),
        }
    }

    /// Ask for permission; on grant the channel is created. `false` on any error.
    pub async fn request_permission(&self) -> bool {
        match self.service.request_permission().await {
            Ok(PermissionState::Granted) => {
                self.ensure_channel().await;
                true
            }
            Ok(state) => {
                log::info!("Notification permission not granted ({:?})", state);
                false
            }
            Err(e) => {
                log::error!("Failed to request notification permission: {}", e);
                false
            }
        }
    }

    /// Show or refresh the ongoing progress notification `id`
    pub async fn show_progress(&self, id: i32, title: &str, progress: u8) {
        let progress = progress.min(100);
        let notification = Notification {
            id,
            title: format!("Downloading: {}", title),
            body: format!("{}% complete", progress),
            ongoing: true,
            auto_cancel: false,
            channel_id: CHANNEL_ID.to_string(),
            progress_bar: Some(ProgressBar {
                value: progress,
                max: 100,
                indeterminate: false,
            }),
        };

        if let Err(e) = self.service.schedule(vec![notification]).await {
            log::error!("Failed to show progress notification {}: {}", id, e);
        }
    }

    /// Replace notification `id` with a dismissable completion/failure notice
    pub async fn show_complete(&self, id: i32, title: &str, success: bool) {
        let notification = Notification {
            id,
            title: if success {
                "Download Complete".to_string()
            } else {
                "Download Failed".to_string()
            },
            body: if success {
                format!("\"{}\" was downloaded successfully.", title)
            } else {
                format!("An error occurred while downloading \"{}\".", title)
            },
            ongoing: false,
            auto_cancel: true,
            channel_id: CHANNEL_ID.to_string(),
            progress_bar: None,
        };

        if let Err(e) = self.service.schedule(vec![notification]).await {
            log::error!("Failed to show completion notification {}: {}", id, e);
        }
    }
}

// =============================================================================
// Console notifier
// =============================================================================

/// Desktop fallback that renders notifications as log lines.
///
/// Keeps the latest notification per id so callers can inspect what is shown.
#[derive(Default)]
pub struct ConsoleNotifier {
    channels: Mutex<Vec<Channel>>,
    shown: Mutex<Vec<Notification>>,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently displayed notifications, one per id
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().clone()
    }
}

#[async_trait]
impl NotificationService for ConsoleNotifier {
    async fn list_channels(&self) -> Result<Vec<Channel>, NotificationError> {
        Ok(self.channels.lock().clone())
    }

    async fn create_channel(&self, channel: Channel) -> Result<(), NotificationError> {
        log::debug!("Notification channel '{}' created", channel.id);
        self.channels.lock().push(channel);
        Ok(())
    }

    async fn request_permission(&self) -> Result<PermissionState, NotificationError> {
        Ok(PermissionState::Granted)
    }

    async fn schedule(&self, notifications: Vec<Notification>) -> Result<(), NotificationError> {
        let mut shown = self.shown.lock();
        for notification in notifications {
            match &notification.progress_bar {
                Some(bar) => log::info!("[{}] {} ({}%)", notification.id, notification.title, bar.value),
                None => log::info!("[{}] {}: {}", notification.id, notification.title, notification.body),
            }
            shown.retain(|n| n.id != notification.id);
            shown.push(notification);
        }
        Ok(())
    }
}
