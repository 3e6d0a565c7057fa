mod loader;

pub use loader::{
    ImageLoadError, SUPPORTED_IMAGE_EXTENSIONS, has_supported_image_extension, load_image_payload,
    mime_type_for_bytes,
};
