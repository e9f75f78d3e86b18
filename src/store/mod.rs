//! Reactive state containers
//!
//! - `Writable` - in-memory container; every write replaces the whole value
//!   and is immediately visible to all subscribers
//! - `PersistedStore` - a `Writable` mirrored to key-value storage under a key
//!
//! Concrete stores built on top:
//! - `auth` - logged-in user and session token
//! - `watch_history` - per-episode playback progress
//! - `favorites` - ordered favorites list
//! - `downloads` - in-memory download registry
//! - `preferences` - theme, profile and interaction flag

pub mod auth;
pub mod downloads;
pub mod favorites;
pub mod preferences;
pub mod watch_history;

pub use auth::AuthStore;
pub use downloads::DownloadRegistry;
pub use favorites::{AddOutcome, FavoritesStore};
pub use preferences::Preferences;
pub use watch_history::WatchHistoryStore;

use serde::de::DeserializeOwned;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::storage::KeyValueStorage;

// =============================================================================
// Writable
// =============================================================================

/// Reactive value container.
///
/// Reads and writes are synchronous. Subscribers receive a
/// `watch::Receiver` that always observes a complete snapshot.
#[derive(Debug)]
pub struct Writable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Writable<T> {
    pub fn new(value: T) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self { tx }
    }

    /// Current value (cloned snapshot)
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Run `f` against the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Derive the next value from the current one and publish it.
    ///
    /// Runs under the channel's write lock, so concurrent updates never
    /// overwrite each other.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.tx.send_modify(|value| {
            let next = f(&*value);
            *value = next;
        });
    }

    /// Edit the value in place; subscribers are notified only if `f` returns
    /// `true`.
    pub fn modify_if(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

// =============================================================================
// PersistedStore
// =============================================================================

/// A `Writable` whose value is written to storage on every change and
/// rehydrated from storage when created.
pub struct PersistedStore<T> {
    key: String,
    storage: Arc<dyn KeyValueStorage>,
    inner: Writable<T>,
    /// Held across compute, persist and publish
    write_lock: Mutex<()>,
}

impl<T> PersistedStore<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// Create a store seeded from `storage[key]`, or `initial` when the key is
    /// absent or does not parse as `T`. Never fails.
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>, initial: T) -> Self {
        let key = key.into();
        let value = load(storage.as_ref(), &key).unwrap_or(initial);
        let store = Self {
            key,
            storage,
            inner: Writable::new(value),
            write_lock: Mutex::new(()),
        };
        // Mirror the starting value so corrupted entries are replaced right away
        store.persist(&store.inner.get());
        store
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> T {
        self.inner.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    pub fn set(&self, value: T) {
        let _guard = self.write_lock.lock();
        self.persist(&value);
        self.inner.set(value);
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let _guard = self.write_lock.lock();
        let next = self.inner.with(f);
        self.persist(&next);
        self.inner.set(next);
    }

    /// Like `update`, but `f` may return `None` to leave the value, storage
    /// and subscribers untouched. Returns whether a new value was written.
    pub fn update_if(&self, f: impl FnOnce(&T) -> Option<T>) -> bool {
        let _guard = self.write_lock.lock();
        match self.inner.with(f) {
            Some(next) => {
                self.persist(&next);
                self.inner.set(next);
                true
            }
            None => false,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.inner.subscribe()
    }

    /// Re-read the stored value. Leaves memory untouched when storage holds
    /// nothing usable.
    pub fn reload(&self) {
        let _guard = self.write_lock.lock();
        if let Some(value) = load(self.storage.as_ref(), &self.key) {
            self.inner.set(value);
        }
    }

    fn persist(&self, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.storage.set(&self.key, &json));
        if let Err(e) = result {
            log::error!("Failed to persist '{}': {}", self.key, e);
        }
    }
}

/// Parse `storage[key]` as `T`, discarding malformed data
fn load<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str) -> Option<T> {
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Discarding malformed stored value for '{}': {}", key, e);
            if let Err(e) = storage.remove(key) {
                log::warn!("Could not remove '{}': {}", key, e);
            }
            None
        }
    }
}
