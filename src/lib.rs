//! Nostalgia - client for a self-hosted media library
//!
//! Offline downloads, watch progress, favorites and a server-side watchlist.
//!
//! # Modules
//!
//! - `models` - Data structures for shows, downloads, history, users, preferences
//! - `storage` - Key-value storage backends (file, memory)
//! - `store` - Observable stores, persisted and in-memory
//! - `download` - Transfer service, progress fan-out and orchestration
//! - `notifications` - Download notifications
//! - `api` - Media server API client
//! - `watchlist` - CSV-backed watchlist resource and its HTTP server
//! - `app` - Session wiring every service together

pub mod api;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod download;
pub mod models;
pub mod notifications;
pub mod storage;
pub mod store;
pub mod watchlist;

// Re-export commonly used types
pub use models::{
    DownloadStatus, DownloadTask, Episode, FavoriteItem, ShowDetails, Theme, User, UserProfile,
    WatchedEpisode, WatchlistItem,
};

pub use api::ApiClient;
pub use app::Session;
pub use download::{DownloadError, DownloadOrchestrator};
pub use store::{AuthStore, DownloadRegistry, FavoritesStore, Preferences, WatchHistoryStore};
