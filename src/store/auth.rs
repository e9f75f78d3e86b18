//! Authentication session
//!
//! The logged-in user and the session token from the backend. The user is
//! stored as JSON under `user` and the token as a raw string under
//! `sessionToken`; a session is restored only when both are present.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use super::Writable;
use crate::models::User;
use crate::storage::{KeyValueStorage, StorageError};

pub const USER_KEY: &str = "user";
pub const SESSION_TOKEN_KEY: &str = "sessionToken";

pub struct AuthStore {
    storage: Arc<dyn KeyValueStorage>,
    user: Writable<Option<User>>,
    write_lock: Mutex<()>,
}

impl AuthStore {
    /// Restore the stored session, if any. A corrupted user entry means
    /// logged out.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let user = restore(storage.as_ref());
        Self {
            storage,
            user: Writable::new(user),
            write_lock: Mutex::new(()),
        }
    }

    /// Persist the session and publish the user
    pub fn login(&self, user: User, session_token: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();
        let json = serde_json::to_string(&user)?;
        self.storage.set(USER_KEY, &json)?;
        self.storage.set(SESSION_TOKEN_KEY, session_token)?;
        log::info!("Logged in as {}", user.username);
        self.user.set(Some(user));
        Ok(())
    }

    /// Clear the session from memory and storage
    pub fn logout(&self) {
        let _guard = self.write_lock.lock();
        for key in [USER_KEY, SESSION_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                log::error!("Failed to remove '{}': {}", key, e);
            }
        }
        self.user.set(None);
        log::info!("Logged out");
    }

    pub fn user(&self) -> Option<User> {
        self.user.get()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.with(Option::is_some)
    }

    pub fn session_token(&self) -> Option<String> {
        if !self.is_logged_in() {
            return None;
        }
        self.storage.get(SESSION_TOKEN_KEY)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }
}

fn restore(storage: &dyn KeyValueStorage) -> Option<User> {
    let user = storage.get(USER_KEY)?;
    storage.get(SESSION_TOKEN_KEY)?;
    match serde_json::from_str(&user) {
        Ok(user) => Some(user),
        Err(e) => {
            log::warn!("Ignoring corrupted stored user: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_user_without_token_is_logged_out() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        storage.set(USER_KEY, r#"{"id":"1","username":"seiya"}"#).unwrap();

        let auth = AuthStore::new(storage);
        assert!(auth.user().is_none());
        assert!(auth.session_token().is_none());
    }
}
