mod env;
mod gemini_image;
mod provider;
mod response_parsing;

pub use gemini_image::{DEFAULT_COMPOSITE_PROMPT, DEFAULT_GEMINI_MODEL, GeminiImageProvider};
pub use provider::ImageCompositeProvider;
