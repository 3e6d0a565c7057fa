pub mod gemini;
pub mod image_file;
