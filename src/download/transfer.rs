//! File transfer service
//!
//! Downloads a remote file to a local target and reports progress for it on
//! the shared `ProgressHub`, tagged with the caller's task id.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::progress::ProgressHub;
use crate::models::ProgressEvent;

/// Transfer failures
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("transfer cancelled")]
    Cancelled,
}

/// What to download, where, and under which task id to report progress
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source: String,
    pub target: PathBuf,
    pub id: String,
}

/// Final result of a successful transfer
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Platform file-transfer service
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Progress channel this service publishes to
    fn progress(&self) -> &ProgressHub;

    async fn download(&self, request: TransferRequest) -> Result<TransferOutcome, TransferError>;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// Streams a file over HTTP into `<target>.part`, renaming it on success
pub struct HttpTransfer {
    client: Client,
    hub: ProgressHub,
}

impl HttpTransfer {
    pub fn new(hub: ProgressHub) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            hub,
        }
    }

    /// Use a preconfigured client (custom timeouts, proxies, tests)
    pub fn with_client(client: Client, hub: ProgressHub) -> Self {
        Self { client, hub }
    }

    fn temporary_path(target: &Path) -> PathBuf {
        PathBuf::from(format!("{}.part", target.to_string_lossy()))
    }
}

#[async_trait]
impl FileTransfer for HttpTransfer {
    fn progress(&self) -> &ProgressHub {
        &self.hub
    }

    async fn download(&self, request: TransferRequest) -> Result<TransferOutcome, TransferError> {
        let response = self.client.get(&request.source).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status(status.as_u16()));
        }

        let content_length = response.content_length().unwrap_or(0);
        let partial = PartialFile::new(Self::temporary_path(&request.target));

        let bytes = async {
            let mut file = File::create(partial.path()).await?;
            let mut stream = response.bytes_stream();
            let mut bytes = 0u64;

            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                bytes += chunk.len() as u64;
                self.hub.publish(ProgressEvent {
                    id: request.id.clone(),
                    bytes,
                    content_length,
                });
            }

            file.flush().await?;
            file.sync_all().await?;
            Ok::<u64, TransferError>(bytes)
        }
        .await?;

        partial.commit(&request.target).await?;
        Ok(TransferOutcome {
            path: request.target,
            bytes,
        })
    }
}

/// Temporary download file, removed on drop unless committed
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Move the file to `target`
    async fn commit(mut self, target: &Path) -> std::io::Result<()> {
        tokio::fs::rename(&self.path, target).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed partial download {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove partial download {:?}: {}", self.path, e),
        }
    }
}
