//! Application session
//!
//! Owns every store and service for one run of the app. Nothing is created at
//! module load: the entry point calls `Session::initialize` once and
//! `Session::shutdown` when done.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::download::{DownloadOrchestrator, FileTransfer, HttpTransfer, ProgressHub};
use crate::notifications::{ConsoleNotifier, NotificationBridge, NotificationService};
use crate::storage::{FileStorage, KeyValueStorage};
use crate::store::{AuthStore, DownloadRegistry, FavoritesStore, Preferences, WatchHistoryStore};

pub struct Session {
    pub config: Config,
    pub storage: Arc<dyn KeyValueStorage>,
    pub auth: AuthStore,
    pub watch_history: WatchHistoryStore,
    pub favorites: FavoritesStore,
    pub preferences: Preferences,
    pub downloads: DownloadRegistry,
    pub orchestrator: DownloadOrchestrator,
    pub notifications: Option<NotificationBridge>,
}

impl Session {
    /// Build a session backed by the configured storage file, HTTP transfers
    /// and console notifications.
    pub async fn initialize(config: Config) -> Result<Self> {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::open(config.storage_path()));
        let hub = ProgressHub::new();
        let transfer: Arc<dyn FileTransfer> = Arc::new(HttpTransfer::new(hub));
        let notifier: Arc<dyn NotificationService> = Arc::new(ConsoleNotifier::new());
        Self::with_services(config, storage, transfer, notifier).await
    }

    /// Build a session on caller-provided platform services
    pub async fn with_services(
        config: Config,
        storage: Arc<dyn KeyValueStorage>,
        transfer: Arc<dyn FileTransfer>,
        notifier: Arc<dyn NotificationService>,
    ) -> Result<Self> {
        let notifications = if config.notifications {
            let bridge = NotificationBridge::new(notifier);
            bridge.request_permission().await;
            Some(bridge)
        } else {
            None
        };

        let downloads = DownloadRegistry::new();
        let mut orchestrator =
            DownloadOrchestrator::new(downloads.clone(), transfer, config.downloads_dir());
        if let Some(bridge) = &notifications {
            orchestrator = orchestrator.with_notifications(bridge.clone());
        }

        log::debug!("Session initialized (data dir {:?})", config.data_dir());
        Ok(Self {
            auth: AuthStore::new(storage.clone()),
            watch_history: WatchHistoryStore::new(storage.clone()),
            favorites: FavoritesStore::new(storage.clone()),
            preferences: Preferences::new(storage.clone()),
            storage,
            downloads,
            orchestrator,
            notifications,
            config,
        })
    }

    /// End the session. Unfinished downloads are reported; their state is
    /// not persisted.
    pub fn shutdown(self) {
        let active = self.downloads.active();
        for task in &active {
            log::warn!("Dropping unfinished download {} ({})", task.id, task);
        }
        log::debug!("Session shut down with {} unfinished downloads", active.len());
    }
}
