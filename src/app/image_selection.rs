use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use super::orchestrator::StudioState;
use crate::domain::{ImagePayload, PreviewReference, PreviewRegistry, SlotKind};
use crate::infra::image_file::{ImageLoadError, load_image_payload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectImageCommand {
    Select { slot: SlotKind, path: String },
    Clear { slot: SlotKind },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectImageOutcome {
    Selected {
        slot: SlotKind,
        replaced: bool,
        file_name: String,
        preview: PreviewReference,
    },
    Cleared {
        slot: SlotKind,
        had_image: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectImageError {
    #[error("image path must not be empty")]
    EmptyPath,
    #[error("failed to load image: {source}")]
    LoadFailed { source: ImageLoadError },
}

impl SelectImageError {
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyPath => "请先选择一张图片。".to_string(),
            Self::LoadFailed { source } => match source {
                ImageLoadError::UnsupportedExtension { .. } => {
                    "仅支持图片文件（PNG、JPG、WEBP 等）。".to_string()
                }
                ImageLoadError::Io { .. } => "无法读取该图片，请检查文件路径和权限。".to_string(),
            },
        }
    }
}

pub trait ImageFileLoader: Send + Sync {
    fn load_image(&self, path: &Path) -> Result<ImagePayload, ImageLoadError>;
}

#[derive(Debug, Default)]
pub struct FileImageLoader;

impl ImageFileLoader for FileImageLoader {
    fn load_image(&self, path: &Path) -> Result<ImagePayload, ImageLoadError> {
        load_image_payload(path)
    }
}

/// Loads picked files into slots and hands out their preview leases.
pub struct ImageSelectionUseCase {
    loader: Arc<dyn ImageFileLoader>,
    previews: PreviewRegistry,
}

impl ImageSelectionUseCase {
    pub fn new() -> Self {
        Self::with_loader(Arc::new(FileImageLoader))
    }

    pub fn with_loader(loader: Arc<dyn ImageFileLoader>) -> Self {
        Self {
            loader,
            previews: PreviewRegistry::new(),
        }
    }

    pub fn execute(
        &self,
        state: &StudioState,
        command: SelectImageCommand,
    ) -> Result<(StudioState, SelectImageOutcome), SelectImageError> {
        match command {
            SelectImageCommand::Select { slot, path } => self.select(state, slot, path),
            SelectImageCommand::Clear { slot } => Ok(clear(state, slot)),
        }
    }

    /// Ids of previews still held by some snapshot.
    pub fn live_previews(&self) -> Vec<u64> {
        self.previews.live_ids()
    }

    pub fn preview_registry(&self) -> &PreviewRegistry {
        &self.previews
    }

    fn select(
        &self,
        state: &StudioState,
        slot: SlotKind,
        path: String,
    ) -> Result<(StudioState, SelectImageOutcome), SelectImageError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(SelectImageError::EmptyPath);
        }

        let payload = self
            .loader
            .load_image(Path::new(path))
            .map_err(|source| SelectImageError::LoadFailed { source })?;
        let lease = self.previews.acquire(slot);
        let preview = lease.reference();
        let replaced = state.slot(slot).is_populated();
        let file_name = payload.file_name.clone();

        log::info!(
            "selected {} image: file={} mime={} bytes={}",
            slot.as_str(),
            file_name,
            payload.mime_type,
            payload.len()
        );

        Ok((
            state.select(slot, payload, lease),
            SelectImageOutcome::Selected {
                slot,
                replaced,
                file_name,
                preview,
            },
        ))
    }
}

impl Default for ImageSelectionUseCase {
    fn default() -> Self {
        Self::new()
    }
}

fn clear(state: &StudioState, slot: SlotKind) -> (StudioState, SelectImageOutcome) {
    let had_image = state.slot(slot).is_populated();
    (
        state.clear(slot),
        SelectImageOutcome::Cleared { slot, had_image },
    )
}
