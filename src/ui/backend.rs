use std::sync::Arc;

use roomrug::{
    app::{CompositeSettings, GenerationJobManager, GenerationService},
    domain::{CompositeImage, CompositeRequest, GenerationError, ModelRef},
    infra::gemini::{DEFAULT_COMPOSITE_PROMPT, GeminiImageProvider, ImageCompositeProvider},
};

use super::{STUB_MODEL_ID, STUB_PROVIDER_ID, STUB_PROVIDER_NOTICE};

pub(super) struct GenerationBackend {
    pub(super) job_manager: Arc<GenerationJobManager>,
    pub(super) startup_notice: Option<String>,
}

pub(super) fn build_generation_backend() -> GenerationBackend {
    let mut notices = Vec::new();

    let provider = match GeminiImageProvider::from_env() {
        Ok(provider) => provider,
        Err(error) => {
            if !is_missing_credentials_error(&error) {
                log::warn!("Gemini provider is unavailable: {error}");
                notices.push(format!("Gemini 配置无效：{}", error.diagnostic_message()));
            }
            return build_stub_backend(notices);
        }
    };

    let settings = CompositeSettings {
        model: ModelRef::new("gemini", provider.model()),
        prompt: DEFAULT_COMPOSITE_PROMPT.to_string(),
    };
    log::info!("using Gemini model {}", settings.model.model);

    let service = GenerationService::new(Arc::new(provider));
    match GenerationJobManager::new(service, settings) {
        Ok(manager) => GenerationBackend {
            job_manager: Arc::new(manager),
            startup_notice: (!notices.is_empty()).then(|| notices.join(" ")),
        },
        Err(error) => {
            log::error!("failed to start generation worker: {error}");
            build_stub_backend(notices)
        }
    }
}

fn build_stub_backend(mut notices: Vec<String>) -> GenerationBackend {
    let service = GenerationService::new(Arc::new(UnconfiguredProvider));
    let settings = CompositeSettings {
        model: ModelRef::new(STUB_PROVIDER_ID, STUB_MODEL_ID),
        prompt: DEFAULT_COMPOSITE_PROMPT.to_string(),
    };
    let manager = GenerationJobManager::new(service, settings)
        .expect("stub generation worker should start");

    log::warn!("no Gemini API key configured; generation requests will fail");
    notices.push(STUB_PROVIDER_NOTICE.to_string());

    GenerationBackend {
        job_manager: Arc::new(manager),
        startup_notice: Some(notices.join(" ")),
    }
}

pub(super) fn is_missing_credentials_error(error: &GenerationError) -> bool {
    matches!(
        error,
        GenerationError::Validation { message } if message.contains("API key is missing")
    )
}

struct UnconfiguredProvider;

impl ImageCompositeProvider for UnconfiguredProvider {
    fn provider_id(&self) -> &str {
        STUB_PROVIDER_ID
    }

    fn supports_model(&self, model_id: &str) -> bool {
        model_id.trim() == STUB_MODEL_ID
    }

    fn compose(&self, _request: &CompositeRequest) -> Result<CompositeImage, GenerationError> {
        Err(GenerationError::validation("no image provider is configured"))
    }
}
