use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{GenerationError, PreviewLease, PreviewReference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Scene,
    Rug,
}

impl SlotKind {
    pub const ALL: [SlotKind; 2] = [SlotKind::Scene, SlotKind::Rug];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Rug => "rug",
        }
    }
}

/// A user-picked image file held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl ImagePayload {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.bytes.is_empty() {
            return Err(GenerationError::validation(format!(
                "image '{}' must not be empty",
                self.file_name
            )));
        }
        if !is_image_mime_type(&self.mime_type) {
            return Err(GenerationError::validation(format!(
                "image '{}' must have an image/* MIME type (got '{}')",
                self.file_name, self.mime_type
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

pub(crate) fn is_image_mime_type(mime_type: &str) -> bool {
    mime_type
        .trim()
        .strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty())
}

#[derive(Debug, Clone)]
pub struct SlotSelection {
    payload: ImagePayload,
    preview: Arc<PreviewLease>,
}

/// One upload slot. The file and its preview reference are set and cleared together.
#[derive(Debug, Clone, Default)]
pub struct ImageSlot {
    selection: Option<SlotSelection>,
}

impl ImageSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&ImagePayload> {
        self.selection.as_ref().map(|selection| &selection.payload)
    }

    pub fn preview_reference(&self) -> Option<PreviewReference> {
        self.selection
            .as_ref()
            .map(|selection| selection.preview.reference())
    }

    pub fn is_populated(&self) -> bool {
        self.selection.is_some()
    }

    /// Replaces the current selection. The previous lease is released once no
    /// snapshot holds it anymore.
    pub fn select(&self, payload: ImagePayload, preview: PreviewLease) -> Self {
        Self {
            selection: Some(SlotSelection {
                payload,
                preview: Arc::new(preview),
            }),
        }
    }

    pub fn clear(&self) -> Self {
        Self::empty()
    }
}
