use std::sync::Arc;

use crate::domain::{CompositeImage, CompositeRequest, GenerationError};
use crate::infra::gemini::ImageCompositeProvider;

/// Runs exactly one provider call per request. Retries are left to the user.
#[derive(Clone)]
pub struct GenerationService {
    provider: Arc<dyn ImageCompositeProvider>,
}

impl GenerationService {
    pub fn new(provider: Arc<dyn ImageCompositeProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.provider_id()
    }

    pub fn compose(&self, mut request: CompositeRequest) -> Result<CompositeImage, GenerationError> {
        // Canonicalize provider/model IDs so the support check and the call see the same values.
        request.model.provider = request.model.provider.trim().to_string();
        request.model.model = request.model.model.trim().to_string();

        request.validate()?;

        if request.model.provider != self.provider.provider_id() {
            return Err(GenerationError::validation(format!(
                "provider '{}' is not configured",
                request.model.provider
            )));
        }
        if !self.provider.supports_model(&request.model.model) {
            return Err(GenerationError::validation(format!(
                "model '{}' is not supported by provider '{}'",
                request.model.model, request.model.provider
            )));
        }

        let image = self.provider.compose(&request)?;
        image.validate()?;
        Ok(image)
    }
}
