//! API clients for external services
//!
//! - Media server: playback progress, media metadata, watchlist, health

pub mod client;

pub use client::{ApiClient, ApiError, Health, ProgressData};
