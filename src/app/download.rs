use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::orchestrator::StudioState;

const DOWNLOAD_DIR_ENV: &str = "ROOMRUG_DOWNLOAD_DIR";

pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to create download directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DownloadError {
    pub fn user_message(&self) -> String {
        match self {
            Self::CreateDirectory { path, .. } => {
                format!("无法创建下载目录：{}", path.display())
            }
            Self::Write { path, .. } => format!("保存图片失败：{}", path.display()),
        }
    }
}

/// Saves the current result image as `ai-rug-design-<unix-millis>.png`.
pub struct DownloadUseCase {
    directory: PathBuf,
    clock: Clock,
}

impl DownloadUseCase {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::with_clock(directory, Arc::new(|| chrono::Utc::now().timestamp_millis()))
    }

    pub fn with_clock(directory: impl Into<PathBuf>, clock: Clock) -> Self {
        Self {
            directory: directory.into(),
            clock,
        }
    }

    /// `ROOMRUG_DOWNLOAD_DIR`, then the platform download folder, then the working directory.
    pub fn from_env() -> Self {
        let directory = std::env::var(DOWNLOAD_DIR_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(directory)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes the result and returns its path, or `None` when there is nothing to save.
    pub fn save(&self, state: &StudioState) -> Result<Option<PathBuf>, DownloadError> {
        let Some(request) = state.download_request((self.clock)()) else {
            return Ok(None);
        };

        fs::create_dir_all(&self.directory).map_err(|source| DownloadError::CreateDirectory {
            path: self.directory.clone(),
            source,
        })?;

        let path = self.directory.join(&request.file_name);
        fs::write(&path, request.image.bytes()).map_err(|source| DownloadError::Write {
            path: path.clone(),
            source,
        })?;

        log::info!(
            "saved result image to {} ({} bytes)",
            path.display(),
            request.image.bytes().len()
        );
        Ok(Some(path))
    }
}
