//! Offline downloads
//!
//! - Progress: per-task pub/sub over the shared transfer progress channel
//! - Transfer: HTTP file transfer that reports progress
//! - Filesystem: app-private destination paths
//! - Orchestrator: the download lifecycle

pub mod filesystem;
pub mod orchestrator;
pub mod progress;
pub mod transfer;

pub use filesystem::AppDirectory;
pub use orchestrator::{DownloadError, DownloadOrchestrator, DownloadPlan};
pub use progress::{ProgressHub, ProgressSubscription};
pub use transfer::{FileTransfer, HttpTransfer, TransferError, TransferOutcome, TransferRequest};
