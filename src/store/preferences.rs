//! User preferences
//!
//! Theme, profile picture and the "user has interacted" flag, each persisted
//! under its own storage key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use std::sync::Arc;

use super::PersistedStore;
use crate::models::{Theme, UserProfile};
use crate::storage::KeyValueStorage;

pub const THEME_KEY: &str = "theme";
pub const PROFILE_KEY: &str = "user_profile";
pub const INTERACTION_KEY: &str = "userHasInteracted";

pub struct Preferences {
    pub theme: PersistedStore<Theme>,
    pub profile: PersistedStore<UserProfile>,
    /// Whether the user interacted with the app yet (gates autoplay with sound)
    pub user_has_interacted: PersistedStore<bool>,
}

impl Preferences {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            theme: PersistedStore::new(storage.clone(), THEME_KEY, Theme::default()),
            profile: PersistedStore::new(storage.clone(), PROFILE_KEY, UserProfile::default()),
            user_has_interacted: PersistedStore::new(storage, INTERACTION_KEY, false),
        }
    }

    /// Store the image at `path` as the profile picture (base64 data URL).
    ///
    /// Returns `false` and leaves the profile untouched if the file can't be read.
    pub async fn update_profile_picture(&self, path: &Path) -> bool {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Failed to read profile picture {:?}: {}", path, e);
                return false;
            }
        };

        let data_url = format!("data:{};base64,{}", image_mime(path), STANDARD.encode(bytes));
        self.profile.set(UserProfile {
            profile_picture_url: Some(data_url),
        });
        true
    }
}

/// Guess the image MIME type from the file extension
fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("a.PNG")), "image/png");
        assert_eq!(image_mime(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(image_mime(Path::new("noext")), "application/octet-stream");
    }
}
