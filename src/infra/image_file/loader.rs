use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::domain::ImagePayload;

/// Extensions accepted by the file dialog and the drop target.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "gif", "bmp", "tif", "tiff", "heic", "heif", "avif",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageLoadError {
    #[error("unsupported file extension for image file: {path}")]
    UnsupportedExtension { path: String },
    #[error("failed to read image file: {message}")]
    Io { message: String },
}

pub fn has_supported_image_extension(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_IMAGE_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Reads an image file. Only the extension filter applies; the content itself
/// is not decoded or checked, and a zero-byte file loads as an empty payload.
pub fn load_image_payload(path: impl AsRef<Path>) -> Result<ImagePayload, ImageLoadError> {
    let path = path.as_ref();
    if !has_supported_image_extension(path) {
        return Err(ImageLoadError::UnsupportedExtension {
            path: path.display().to_string(),
        });
    }

    let bytes = fs::read(path).map_err(|error| ImageLoadError::Io {
        message: error.to_string(),
    })?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_type_for_bytes(&bytes, path);

    Ok(ImagePayload::new(file_name, mime_type, bytes))
}

/// Sniffs the MIME type from magic bytes, falling back to the file extension.
pub fn mime_type_for_bytes(bytes: &[u8], path: &Path) -> String {
    if let Some(kind) = infer::get(bytes)
        && kind.mime_type().starts_with("image/")
    {
        return kind.mime_type().to_string();
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => "image/png",
    }
    .to_string()
}
