//! Media server API client
//!
//! Playback progress sync, media metadata and the server watchlist.
//! Non-2xx responses become `ApiError::Http` carrying the server's JSON
//! `error` message when there is one, else the raw body, else the status.

use regex::Regex;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::models::{MediaMetadata, WatchlistItem};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Server URL is not configured")]
    MissingServerUrl,

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Backend reachability as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Online,
    Offline,
}

/// Saved playback position on the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ProgressResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    progress: Option<ProgressData>,
}

/// Client for the media server's JSON API
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client for `base_url`; fails fast when it's missing or empty
    pub fn new(base_url: Option<&str>) -> Result<Self, ApiError> {
        let base_url = base_url
            .map(|u| u.trim().trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or(ApiError::MissingServerUrl)?;

        Ok(Self {
            base_url: base_url.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Send a request and return the body of a successful response
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, ApiError> {
        let mut request = self
            .client
            .request(method, self.url(path))
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }
        Ok(text)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let text = self.send(method, path, body).await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("JSON parse error: {}", e)))
    }

    // -------------------------------------------------------------------------
    // Playback progress
    // -------------------------------------------------------------------------

    /// Saved position in seconds for a media file, 0 when none is stored
    pub async fn get_progress(&self, path: &str) -> Result<f64, ApiError> {
        let param = if is_absolute_path(path) { "filePath" } else { "relativePath" };
        let endpoint = format!("/api/progress?{}={}", param, urlencoding::encode(path));

        let response: ProgressResponse = self.fetch(Method::GET, &endpoint, None).await?;
        match response.progress {
            Some(progress) if response.ok => Ok(progress.current_time),
            _ => Ok(0.0),
        }
    }

    /// Save the playback position for a media file
    pub async fn update_progress(
        &self,
        path: &str,
        current_time: f64,
        duration: f64,
    ) -> Result<(), ApiError> {
        let param = if is_absolute_path(path) { "filePath" } else { "relativePath" };
        let mut body = json!({
            "currentTime": current_time,
            "duration": duration,
        });
        body[param] = json!(path);
        self.send(Method::POST, "/api/progress", Some(body)).await?;
        Ok(())
    }

    /// Audio and subtitle tracks for a media path
    pub async fn media_metadata(&self, path: &str) -> Result<MediaMetadata, ApiError> {
        let endpoint = format!("/api/media/metadata?path={}", urlencoding::encode(path));
        self.fetch(Method::GET, &endpoint, None).await
    }

    // -------------------------------------------------------------------------
    // Watchlist
    // -------------------------------------------------------------------------

    pub async fn watchlist(&self) -> Result<Vec<WatchlistItem>, ApiError> {
        self.fetch(Method::GET, "/api/watchlist", None).await
    }

    pub async fn add_to_watchlist(&self, item: &WatchlistItem) -> Result<(), ApiError> {
        let body = serde_json::to_value(item)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        self.send(Method::POST, "/api/watchlist", Some(body)).await?;
        Ok(())
    }

    pub async fn remove_from_watchlist(&self, id: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, "/api/watchlist", Some(json!({ "id": id })))
            .await?;
        Ok(())
    }

    /// Check the backend with a 2.5 s budget; never errors
    pub async fn health_check(&self) -> Health {
        let result = self
            .client
            .head(self.url("/api/watchlist"))
            .timeout(Duration::from_millis(2500))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => Health::Online,
            Ok(response) => {
                log::info!("Health check returned HTTP {}", response.status());
                Health::Offline
            }
            Err(e) => {
                log::info!("Health check failed, backend is offline: {}", e);
                Health::Offline
            }
        }
    }
}

/// Paths like `/home/...`, `C:\...` or `//host/...` are absolute on the server
pub fn is_absolute_path(path: &str) -> bool {
    static ABSOLUTE: OnceLock<Option<Regex>> = OnceLock::new();
    ABSOLUTE
        .get_or_init(|| Regex::new(r"^([A-Za-z]:\\|/{1,2}|/home/|/mnt/|/media/)").ok())
        .as_ref()
        .map(|re| re.is_match(path))
        .unwrap_or(false)
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return message.to_string();
        }
    }
    if body.trim().is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        body.to_string()
    }
}
