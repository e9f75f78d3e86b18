//! Watch history
//!
//! Tracks how far the user got into each episode or movie, keyed by its code.
//! The whole map is persisted as a JSON object on every update.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

use super::PersistedStore;
use crate::models::WatchedEpisode;
use crate::storage::KeyValueStorage;

pub const WATCH_HISTORY_KEY: &str = "user_watch_history";

/// Fraction at which an item counts as watched
pub const COMPLETION_THRESHOLD: f64 = 0.9;

pub type WatchHistory = HashMap<String, WatchedEpisode>;

/// Persisted map of playback progress keyed by item code
pub struct WatchHistoryStore {
    store: PersistedStore<WatchHistory>,
}

impl WatchHistoryStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            store: PersistedStore::new(storage, WATCH_HISTORY_KEY, WatchHistory::new()),
        }
    }

    /// Record playback position for `code`.
    ///
    /// Ignored when `code` is empty, `duration` is zero, or either number is
    /// not finite. JSON has no NaN or infinity, and one such entry would make
    /// the whole stored map unreadable.
    /// `current_time / duration` is not clamped; callers pass consistent values.
    /// Any previous entry for `code` is replaced wholesale.
    pub fn update_progress(&self, code: &str, current_time: f64, duration: f64) {
        if code.is_empty()
            || duration == 0.0
            || !duration.is_finite()
            || !current_time.is_finite()
        {
            log::debug!("Ignoring progress for '{}': {} / {}", code, current_time, duration);
            return;
        }

        let progress = round2(current_time / duration);
        if !progress.is_finite() {
            return;
        }
        let entry = WatchedEpisode {
            code: code.to_string(),
            watched_at: chrono::Utc::now().timestamp_millis(),
            progress,
            duration: round2(duration),
            is_complete: progress >= COMPLETION_THRESHOLD,
        };

        self.store.update(|history| {
            let mut next = history.clone();
            next.insert(code.to_string(), entry);
            next
        });
    }

    pub fn get_progress(&self, code: &str) -> Option<WatchedEpisode> {
        self.store.with(|history| history.get(code).cloned())
    }

    pub fn all(&self) -> WatchHistory {
        self.store.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<WatchHistory> {
        self.store.subscribe()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
