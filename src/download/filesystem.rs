//! App-private download directory
//!
//! Resolves paths relative to the application's persistent downloads
//! directory (<data_dir>/downloads, see `Config::downloads_dir`).

use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppDirectory {
    root: PathBuf,
}

impl AppDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` inside the directory, creating parent folders.
    ///
    /// Absolute paths and `..` components are rejected so downloads cannot
    /// escape the app directory.
    pub async fn resolve(&self, relative: &str) -> io::Result<PathBuf> {
        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path {:?} is outside the app directory", relative),
            ));
        }

        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(target)
    }
}
