//! Favorites list
//!
//! Ordered, duplicate-free (by code) list of favorite shows and movies,
//! persisted on every change.

use std::sync::Arc;
use tokio::sync::watch;

use super::PersistedStore;
use crate::models::FavoriteItem;
use crate::storage::KeyValueStorage;

pub const FAVORITES_KEY: &str = "user_favorites";

/// Result of adding a favorite
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

impl AddOutcome {
    /// User-facing message for this outcome
    pub fn notice(&self, item: &FavoriteItem) -> String {
        match self {
            AddOutcome::Added => format!("\"{}\" added to favorites!", item.name),
            AddOutcome::AlreadyPresent => {
                format!("\"{}\" is already in your favorites.", item.name)
            }
        }
    }
}

pub struct FavoritesStore {
    store: PersistedStore<Vec<FavoriteItem>>,
}

impl FavoritesStore {
    /// Create the store; rehydrates from storage once
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            store: PersistedStore::new(storage, FAVORITES_KEY, Vec::new()),
        }
    }

    /// Append `item` unless an entry with the same code exists
    pub fn add(&self, item: FavoriteItem) -> AddOutcome {
        let added = self.store.update_if(|items| {
            if items.iter().any(|existing| existing.code == item.code) {
                return None;
            }
            let mut next = items.clone();
            next.push(item.clone());
            Some(next)
        });

        let outcome = if added {
            AddOutcome::Added
        } else {
            AddOutcome::AlreadyPresent
        };
        log::info!("{}", outcome.notice(&item));
        outcome
    }

    /// Drop any entry with `code`; the list is persisted either way
    pub fn remove(&self, code: &str) {
        self.store.update(|items| {
            items
                .iter()
                .filter(|item| item.code != code)
                .cloned()
                .collect()
        });
    }

    /// Re-read favorites from storage. Safe to call repeatedly.
    pub fn load_from_storage(&self) {
        self.store.reload();
    }

    pub fn contains(&self, code: &str) -> bool {
        self.store.with(|items| items.iter().any(|item| item.code == code))
    }

    pub fn items(&self) -> Vec<FavoriteItem> {
        self.store.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<FavoriteItem>> {
        self.store.subscribe()
    }
}
