use std::path::{Path, PathBuf};

use gpui::{ExternalPaths, ImageFormat};
use roomrug::app::GenerationJob;
use roomrug::infra::image_file::has_supported_image_extension;

pub(super) fn log_generation_submission(job: &GenerationJob) {
    log::info!(
        "submitting {}: scene={} ({} bytes) rug={} ({} bytes)",
        job.request_id(),
        job.scene.file_name,
        job.scene.len(),
        job.rug.file_name,
        job.rug.len()
    );
}

pub(super) fn dropped_path_to_load(paths: &ExternalPaths) -> Option<String> {
    choose_dropped_image_path(paths.paths()).map(|path| path.to_string_lossy().to_string())
}

pub(super) fn choose_dropped_image_path(paths: &[PathBuf]) -> Option<PathBuf> {
    paths
        .iter()
        .find(|path| has_supported_image_extension(path))
        .cloned()
        .or_else(|| paths.first().cloned())
}

pub(super) fn display_file_name_from_path(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(path)
        .to_string()
}

/// Formats gpui can decode. Anything else falls back to a file-name label.
pub(super) fn image_format_for_mime(mime_type: &str) -> Option<ImageFormat> {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/webp" => Some(ImageFormat::Webp),
        "image/gif" => Some(ImageFormat::Gif),
        "image/bmp" => Some(ImageFormat::Bmp),
        "image/tiff" => Some(ImageFormat::Tiff),
        _ => None,
    }
}
