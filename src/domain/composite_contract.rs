use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};

use super::image_slot::is_image_mime_type;
use super::{GenerationError, ImagePayload};

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

// Providers are inconsistent about trailing padding, so accept both forms.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.provider.trim().is_empty() {
            return Err(GenerationError::validation("model provider must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(GenerationError::validation("model name must not be empty"));
        }
        Ok(())
    }
}

/// One composite call: place `rug` into `scene`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeRequest {
    pub request_id: String,
    pub model: ModelRef,
    pub scene: ImagePayload,
    pub rug: ImagePayload,
    pub prompt: String,
}

impl CompositeRequest {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.request_id.trim().is_empty() {
            return Err(GenerationError::validation("request_id must not be empty"));
        }
        self.model.validate()?;
        self.scene.validate()?;
        self.rug.validate()?;
        if self.prompt.trim().is_empty() {
            return Err(GenerationError::validation("prompt must not be empty"));
        }
        Ok(())
    }
}

/// Self-contained generated image, kept both as a data URI and as raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct CompositeImage {
    data_uri: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl CompositeImage {
    pub fn from_base64(
        mime_type: impl Into<String>,
        base64_data: &str,
    ) -> Result<Self, GenerationError> {
        let mime_type = mime_type.into().trim().to_string();
        if !is_image_mime_type(&mime_type) {
            return Err(GenerationError::invalid_response(format!(
                "generated payload must be an image (got '{mime_type}')"
            )));
        }

        let base64_data = base64_data.trim();
        let bytes = decode_base64(base64_data)?;
        if bytes.is_empty() {
            return Err(GenerationError::invalid_response(
                "generated image payload is empty",
            ));
        }

        Ok(Self {
            data_uri: format!("{DATA_URI_PREFIX}{mime_type}{BASE64_MARKER}{base64_data}"),
            mime_type,
            bytes: bytes.into(),
        })
    }

    pub fn from_data_uri(data_uri: &str) -> Result<Self, GenerationError> {
        let (mime_type, base64_data) = split_data_uri(data_uri)?;
        Self::from_base64(mime_type, base64_data)
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.bytes.is_empty() {
            return Err(GenerationError::invalid_response(
                "generated image payload is empty",
            ));
        }
        if !is_image_mime_type(&self.mime_type) {
            return Err(GenerationError::invalid_response(format!(
                "generated payload must be an image (got '{}')",
                self.mime_type
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for CompositeImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

pub fn encode_base64(bytes: &[u8]) -> String {
    LENIENT_BASE64.encode(bytes)
}

fn split_data_uri(data_uri: &str) -> Result<(&str, &str), GenerationError> {
    let rest = data_uri
        .trim()
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| GenerationError::invalid_response("data URI must start with 'data:'"))?;
    let marker = rest.find(BASE64_MARKER).ok_or_else(|| {
        GenerationError::invalid_response("data URI must carry a base64 payload")
    })?;
    let mime_type = &rest[..marker];
    let base64_data = &rest[marker + BASE64_MARKER.len()..];
    Ok((mime_type, base64_data))
}

fn decode_base64(base64_data: &str) -> Result<Vec<u8>, GenerationError> {
    LENIENT_BASE64.decode(base64_data).map_err(|error| {
        GenerationError::invalid_response(format!("image payload is not valid base64: {error}"))
    })
}
