//! Data structures and types for Nostalgia
//!
//! Contains all shared models used across the application organized by domain:
//! - **Catalog**: show and episode details as served by the media server
//! - **Downloads**: offline download tasks and transfer progress events
//! - **History**: per-episode playback progress
//! - **Favorites / Watchlist**: user-curated lists
//! - **Preferences**: theme and profile

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Catalog Models (media server)
// =============================================================================

/// Show details as returned by the media server catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowDetails {
    pub code: String,
    #[serde(rename = "nomeReal")]
    pub name: String,
    /// Folder on the server holding the show's media files
    #[serde(rename = "nomePasta")]
    pub folder: String,
    #[serde(default)]
    pub poster: Option<String>,
}

impl fmt::Display for ShowDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.code)
    }
}

/// A single playable episode of a show
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// File name inside the show folder
    #[serde(rename = "arquivo")]
    pub file: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "titulo", default)]
    pub title: Option<String>,
    #[serde(rename = "sinopse", default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Episode {
    /// Label shown to the user: the title, or the file name when untitled
    pub fn label(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.file,
        }
    }
}

/// Audio track advertised by the media metadata endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub index: u32,
    #[serde(default)]
    pub language: Option<String>,
}

/// Subtitle track advertised by the media metadata endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub index: u32,
    pub language: String,
}

/// Media metadata (audio and subtitle tracks)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,
    #[serde(default)]
    pub subtitle_tracks: Vec<SubtitleTrack>,
}

// =============================================================================
// Download Models
// =============================================================================

/// Lifecycle state of a download task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Downloading,
    Completed,
    Error,
    /// Present for compatibility with stored UI state; nothing transitions here
    Paused,
}

impl DownloadStatus {
    /// Completed and error tasks never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Error)
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Downloading => write!(f, "downloading"),
            DownloadStatus::Completed => write!(f, "completed"),
            DownloadStatus::Error => write!(f, "error"),
            DownloadStatus::Paused => write!(f, "paused"),
        }
    }
}

/// A single episode download tracked by the download registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTask {
    pub id: String,
    pub source_label: String,
    pub item_label: String,
    pub thumbnail_ref: Option<String>,
    /// Percentage, 0-100
    pub progress: u8,
    pub status: DownloadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    pub source_url: String,
}

impl DownloadTask {
    /// Create a task in the downloading state with a fresh correlation id
    pub fn new(
        source_label: impl Into<String>,
        item_label: impl Into<String>,
        thumbnail_ref: Option<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_label: source_label.into(),
            item_label: item_label.into(),
            thumbnail_ref,
            progress: 0,
            status: DownloadStatus::Downloading,
            local_path: None,
            source_url: source_url.into(),
        }
    }

    /// Numeric id for OS notifications, derived from the task UUID
    pub fn notification_id(&self) -> i32 {
        notification_id(&self.id)
    }
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} [{} {}%]",
            self.source_label, self.item_label, self.status, self.progress
        )
    }
}

/// Map a task correlation id to a positive 31-bit notification id
pub fn notification_id(task_id: &str) -> i32 {
    match uuid::Uuid::parse_str(task_id) {
        Ok(uuid) => (uuid.as_u128() & 0x7fff_ffff) as i32,
        Err(_) => task_id
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
            as i32
            & 0x7fff_ffff,
    }
}

/// Progress event emitted by the file-transfer service, tagged with the task it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub id: String,
    pub bytes: u64,
    /// Zero when the server did not report a length
    pub content_length: u64,
}

impl ProgressEvent {
    /// Whole percentage for this event, if the total length is known
    pub fn percent(&self) -> Option<u8> {
        if self.content_length == 0 {
            return None;
        }
        let ratio = self.bytes as f64 / self.content_length as f64;
        Some((ratio * 100.0).round().clamp(0.0, 100.0) as u8)
    }
}

// =============================================================================
// Watch History Models
// =============================================================================

/// Playback progress for a single episode or movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedEpisode {
    pub code: String,
    /// Unix epoch milliseconds of the last update
    pub watched_at: i64,
    /// Fraction watched, normally 0.0-1.0
    pub progress: f64,
    /// Total length in seconds
    pub duration: f64,
    pub is_complete: bool,
}

// =============================================================================
// Favorites / Watchlist Models
// =============================================================================

/// Favorite show or movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteItem {
    pub code: String,
    pub name: String,
    pub poster: String,
}

impl fmt::Display for FavoriteItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.code)
    }
}

/// Server-side watchlist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub id: String,
    pub title: String,
    pub path: String,
}

// =============================================================================
// Preference Models
// =============================================================================

/// Visual theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Nostalgia,
    Matrix,
}

impl Theme {
    /// Parse a theme name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "default" => Some(Theme::Default),
            "nostalgia" => Some(Theme::Nostalgia),
            "matrix" => Some(Theme::Matrix),
            _ => None,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Default => write!(f, "default"),
            Theme::Nostalgia => write!(f, "nostalgia"),
            Theme::Matrix => write!(f, "matrix"),
        }
    }
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// User profile data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Avatar as a base64 data URL
    pub profile_picture_url: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_label_falls_back_to_file() {
        let mut ep = Episode {
            file: "ep01.mp4".to_string(),
            path: String::new(),
            title: None,
            synopsis: None,
            thumbnail: None,
        };
        assert_eq!(ep.label(), "ep01.mp4");

        ep.title = Some(String::new());
        assert_eq!(ep.label(), "ep01.mp4");

        ep.title = Some("Pilot".to_string());
        assert_eq!(ep.label(), "Pilot");
    }

    #[test]
    fn test_show_details_wire_names() {
        let json = r#"{"code":"cdz","nomeReal":"Cavaleiros","nomePasta":"cavaleiros","poster":null}"#;
        let show: ShowDetails = serde_json::from_str(json).unwrap();
        assert_eq!(show.name, "Cavaleiros");
        assert_eq!(show.folder, "cavaleiros");
        assert!(show.poster.is_none());
    }

    #[test]
    fn test_progress_event_percent() {
        let ev = |bytes, len| ProgressEvent {
            id: "t".into(),
            bytes,
            content_length: len,
        };
        assert_eq!(ev(0, 0).percent(), None);
        assert_eq!(ev(42, 100).percent(), Some(42));
        assert_eq!(ev(1, 3).percent(), Some(33));
        assert_eq!(ev(2, 3).percent(), Some(67));
        assert_eq!(ev(150, 100).percent(), Some(100));
    }

    #[test]
    fn test_download_status_serde_and_terminal() {
        assert_eq!(
            serde_json::to_string(&DownloadStatus::Downloading).unwrap(),
            "\"downloading\""
        );
        assert!(DownloadStatus::Completed.is_terminal());
        assert!(DownloadStatus::Error.is_terminal());
        assert!(!DownloadStatus::Downloading.is_terminal());
        assert!(!DownloadStatus::Paused.is_terminal());
    }

    #[test]
    fn test_notification_id_is_positive_and_stable() {
        let task = DownloadTask::new("Show", "Ep", None, "http://x/ep.mp4");
        let a = task.notification_id();
        let b = notification_id(&task.id);
        assert_eq!(a, b);
        assert!(a >= 0);
        assert!(notification_id("not-a-uuid") >= 0);
    }

    #[test]
    fn test_theme_from_name() {
        assert_eq!(Theme::from_name("Matrix"), Some(Theme::Matrix));
        assert_eq!(Theme::from_name(" nostalgia "), Some(Theme::Nostalgia));
        assert_eq!(Theme::from_name("neon"), None);
        assert_eq!(Theme::default().to_string(), "default");
    }

    #[test]
    fn test_watched_episode_camel_case() {
        let entry = WatchedEpisode {
            code: "ep1".into(),
            watched_at: 1,
            progress: 0.5,
            duration: 100.0,
            is_complete: false,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"watchedAt\":1"));
        assert!(json.contains("\"isComplete\":false"));
    }
}
