//! Server-side watchlist
//!
//! The watchlist lives in a flat CSV file, one `id,title,path` entry per line.
//! `WatchlistService` implements the HTTP resource semantics on top of it and
//! `server` exposes them over axum.

pub mod server;

use serde::Deserialize;
use serde_json::{json, Value};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::WatchlistItem;

#[derive(Error, Debug)]
pub enum WatchlistError {
    #[error("Failed to read watchlist: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write watchlist: {0}")]
    Write(#[source] io::Error),
}

// =============================================================================
// CSV file
// =============================================================================

#[derive(Debug, Clone)]
pub struct WatchlistFile {
    path: PathBuf,
}

impl WatchlistFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location (<data_dir>/nostalgia/data/watchlist.csv)
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nostalgia")
            .join("data")
            .join("watchlist.csv")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries; a missing or empty file is an empty list
    pub async fn read(&self) -> Result<Vec<WatchlistItem>, WatchlistError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(parse_csv(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => {
                log::error!("Error reading watchlist file {:?}: {}", self.path, e);
                Err(WatchlistError::Read(e))
            }
        }
    }

    /// Replace the whole file with `items`
    pub async fn write(&self, items: &[WatchlistItem]) -> Result<(), WatchlistError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(WatchlistError::Write)?;
        }
        tokio::fs::write(&self.path, to_csv(items))
            .await
            .map_err(WatchlistError::Write)
    }
}

/// Parse `id,title,path` lines. Fields past the third are dropped.
fn parse_csv(contents: &str) -> Vec<WatchlistItem> {
    let contents = contents.trim();
    if contents.is_empty() {
        return Vec::new();
    }

    contents
        .split('\n')
        .map(|line| {
            let mut fields = line.trim_end_matches('\r').split(',');
            WatchlistItem {
                id: fields.next().unwrap_or_default().to_string(),
                title: fields.next().unwrap_or_default().to_string(),
                path: fields.next().unwrap_or_default().to_string(),
            }
        })
        .collect()
}

fn to_csv(items: &[WatchlistItem]) -> String {
    items
        .iter()
        .map(|item| format!("{},{},{}", item.id, item.title, item.path))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Resource semantics
// =============================================================================

/// HTTP-shaped result: status code plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistResponse {
    pub status: u16,
    pub body: Value,
}

impl WatchlistResponse {
    fn message(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "message": message }),
        }
    }

    fn error(status: u16, error: impl std::fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "error": error.to_string() }),
        }
    }
}

/// Request body for add/remove; every field optional so missing ones become 400s
#[derive(Debug, Default, Deserialize)]
pub struct WatchlistRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

/// Watchlist resource; read-modify-write cycles are serialized
pub struct WatchlistService {
    file: WatchlistFile,
    lock: Mutex<()>,
}

impl WatchlistService {
    pub fn new(file: WatchlistFile) -> Self {
        Self {
            file,
            lock: Mutex::new(()),
        }
    }

    pub fn file(&self) -> &WatchlistFile {
        &self.file
    }

    /// GET: the full list
    pub async fn list(&self) -> WatchlistResponse {
        let _guard = self.lock.lock().await;
        match self.file.read().await {
            Ok(items) => WatchlistResponse {
                status: 200,
                body: json!(items),
            },
            Err(e) => WatchlistResponse::error(500, e),
        }
    }

    /// POST: 400 on missing fields, 409 on duplicate id, else 201
    pub async fn add(&self, request: WatchlistRequest) -> WatchlistResponse {
        let (Some(id), Some(title), Some(path)) = (
            present(&request.id),
            present(&request.title),
            present(&request.path),
        ) else {
            return WatchlistResponse::error(400, "Missing id, title, or path");
        };

        let _guard = self.lock.lock().await;
        let mut items = match self.file.read().await {
            Ok(items) => items,
            Err(e) => return WatchlistResponse::error(500, e),
        };
        if items.iter().any(|item| item.id == id) {
            return WatchlistResponse::error(409, "Item already in watchlist");
        }

        items.push(WatchlistItem {
            id: id.to_string(),
            title: title.to_string(),
            path: path.to_string(),
        });
        match self.file.write(&items).await {
            Ok(()) => WatchlistResponse::message(201, "Item added to watchlist"),
            Err(e) => WatchlistResponse::error(500, e),
        }
    }

    /// DELETE: 400 on missing id, 404 when absent, else 200
    pub async fn remove(&self, request: WatchlistRequest) -> WatchlistResponse {
        let Some(id) = present(&request.id) else {
            return WatchlistResponse::error(400, "Missing id");
        };

        let _guard = self.lock.lock().await;
        let items = match self.file.read().await {
            Ok(items) => items,
            Err(e) => return WatchlistResponse::error(500, e),
        };
        let before = items.len();
        let remaining: Vec<WatchlistItem> =
            items.into_iter().filter(|item| item.id != id).collect();

        if remaining.len() == before {
            return WatchlistResponse::error(404, "Item not found in watchlist");
        }
        match self.file.write(&remaining).await {
            Ok(()) => WatchlistResponse::message(200, "Item removed from watchlist"),
            Err(e) => WatchlistResponse::error(500, e),
        }
    }
}
