use crate::domain::{CompositeImage, CompositeRequest, GenerationError};

/// The external generation capability: two images in, one composed image out.
pub trait ImageCompositeProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    fn supports_model(&self, model_id: &str) -> bool;

    fn compose(&self, request: &CompositeRequest) -> Result<CompositeImage, GenerationError>;
}
