use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::domain::{
    CompositeImage, CompositeRequest, GenerationError, ImagePayload, encode_base64,
};

use super::ImageCompositeProvider;
use super::env::{read_env_var, read_first_env_var, read_timeout_from_env};
use super::response_parsing::{non_blank, truncate_message};

const PROVIDER_ID: &str = "gemini";
const API_VERSION: &str = "v1beta";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const API_KEY_HEADER: &str = "x-goog-api-key";
const ENV_API_KEYS: &[&str] = &["ROOMRUG_GEMINI_API_KEY", "GEMINI_API_KEY", "API_KEY"];
const ENV_BASE_URL: &str = "ROOMRUG_GEMINI_BASE_URL";
const ENV_MODEL: &str = "ROOMRUG_GEMINI_MODEL";
const ENV_TIMEOUT_SECS: &str = "ROOMRUG_GEMINI_TIMEOUT_SECS";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image";

pub const DEFAULT_COMPOSITE_PROMPT: &str = "The first image is a photo of a room. The second image shows a rug (its texture, pattern or a flat top-down view). \
Generate a photorealistic image of the same room with this rug laid on the floor. \
Keep the room's perspective, lighting, walls and furniture unchanged, scale the rug naturally to the space, \
and let furniture legs rest on top of it with realistic shadows. Return only the edited image.";

pub struct GeminiImageProvider {
    api_key: String,
    api_base_url: String,
    model: String,
    client: Client,
}

impl GeminiImageProvider {
    pub fn from_api_key(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        Self::with_config(api_key, DEFAULT_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_TIMEOUT)
    }

    pub fn from_env() -> Result<Self, GenerationError> {
        let api_key = read_first_env_var(ENV_API_KEYS)?.ok_or_else(|| {
            GenerationError::validation(
                "Gemini API key is missing (set ROOMRUG_GEMINI_API_KEY, GEMINI_API_KEY or API_KEY)",
            )
        })?;
        let api_base_url = read_env_var(ENV_BASE_URL)?.unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let model = read_env_var(ENV_MODEL)?.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into());
        let timeout = read_timeout_from_env(ENV_TIMEOUT_SECS)?.unwrap_or(DEFAULT_TIMEOUT);
        Self::with_config(api_key, api_base_url, model, timeout)
    }

    pub fn with_config(
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenerationError::validation("Gemini API key must not be empty"));
        }

        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(GenerationError::validation(
                "Gemini API base URL must not be empty",
            ));
        }

        let model = model.into().trim().to_string();
        if model.is_empty() {
            return Err(GenerationError::validation("Gemini model must not be empty"));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            GenerationError::internal(format!("failed to create Gemini HTTP client: {err}"))
        })?;

        Ok(Self {
            api_key,
            api_base_url,
            model,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_url(&self, model: &str) -> String {
        format!(
            "{}/{API_VERSION}/models/{model}:generateContent",
            self.api_base_url.trim_end_matches('/')
        )
    }

    fn build_request_payload(&self, request: &CompositeRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    RequestPart::Text {
                        text: request.prompt.clone(),
                    },
                    RequestPart::inline_image(&request.scene),
                    RequestPart::inline_image(&request.rug),
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        }
    }

    fn map_success_response(&self, response_body: &str) -> Result<CompositeImage, GenerationError> {
        let response: GenerateContentResponse =
            serde_json::from_str(response_body).map_err(|err| {
                GenerationError::invalid_response(format!("Gemini response decode failed: {err}"))
            })?;

        if let Some(inline) = response
            .candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .find_map(|part| part.inline_data.as_ref())
        {
            return CompositeImage::from_base64(inline.mime_type.clone(), &inline.data);
        }

        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| non_blank(feedback.block_reason))
        {
            return Err(GenerationError::Blocked { reason });
        }

        let finish_reason = response
            .candidates
            .iter()
            .find_map(|candidate| non_blank(candidate.finish_reason.clone()));
        let text = response
            .candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join(" ");

        let mut message = "Gemini response did not include an inline image".to_string();
        if let Some(finish_reason) = finish_reason {
            message.push_str(&format!(" (finishReason={finish_reason})"));
        }
        if !text.trim().is_empty() {
            message.push_str(&format!(": {}", truncate_message(&text)));
        }
        Err(GenerationError::invalid_response(message))
    }
}

impl ImageCompositeProvider for GeminiImageProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn supports_model(&self, model_id: &str) -> bool {
        let model_id = model_id.trim();
        !model_id.is_empty() && model_id.starts_with("gemini-")
    }

    fn compose(&self, request: &CompositeRequest) -> Result<CompositeImage, GenerationError> {
        let payload = self.build_request_payload(request);
        let started = Instant::now();

        log::debug!(
            "gemini: request_id={} model={} scene_bytes={} rug_bytes={}",
            request.request_id,
            request.model.model,
            request.scene.len(),
            request.rug.len()
        );

        let response = self
            .client
            .post(self.endpoint_url(&request.model.model))
            .header(API_KEY_HEADER, &self.api_key)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        let response_body = response.text().map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_http_error(status, &response_body));
        }

        let image = self.map_success_response(&response_body)?;
        log::info!(
            "gemini: request_id={} composed {} bytes ({}) in {} ms",
            request.request_id,
            image.bytes().len(),
            image.mime_type(),
            started.elapsed().as_millis()
        );
        Ok(image)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: RequestInlineData },
}

impl RequestPart {
    fn inline_image(payload: &ImagePayload) -> Self {
        Self::InlineData {
            inline_data: RequestInlineData {
                mime_type: payload.mime_type.clone(),
                data: encode_base64(&payload.bytes),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseInlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    #[serde(default)]
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn map_http_error(status: StatusCode, body: &str) -> GenerationError {
    let parsed_error = serde_json::from_str::<GeminiErrorEnvelope>(body).ok();
    let error_status = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .and_then(|detail| detail.status.as_deref());

    if matches!(error_status, Some("UNAUTHENTICATED" | "PERMISSION_DENIED"))
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return GenerationError::Auth;
    }
    if matches!(error_status, Some("RESOURCE_EXHAUSTED"))
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return GenerationError::RateLimited;
    }
    if matches!(error_status, Some("DEADLINE_EXCEEDED"))
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::GATEWAY_TIMEOUT
    {
        return GenerationError::Timeout;
    }

    let message = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .map(|detail| detail.message.clone())
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| truncate_message(body));
    GenerationError::Transport {
        message: format!("Gemini API returned HTTP {status}: {message}"),
    }
}

fn map_transport_error(error: reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        return GenerationError::Timeout;
    }
    GenerationError::Transport {
        message: format!("Gemini transport error: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::{DEFAULT_COMPOSITE_PROMPT, GeminiImageProvider, map_http_error};
    use crate::domain::{CompositeRequest, GenerationError, ImagePayload, ModelRef};
    use crate::infra::gemini::ImageCompositeProvider;

    fn provider() -> GeminiImageProvider {
        GeminiImageProvider::with_config(
            "test-key",
            "https://generativelanguage.googleapis.com/",
            "gemini-2.5-flash-image",
            Duration::from_secs(2),
        )
        .expect("provider should build")
    }

    fn request() -> CompositeRequest {
        CompositeRequest {
            request_id: "req-7".to_string(),
            model: ModelRef::new("gemini", "gemini-2.5-flash-image"),
            scene: ImagePayload::new("roomA.jpg", "image/jpeg", vec![1_u8, 2, 3]),
            rug: ImagePayload::new("rugB.png", "image/png", vec![4_u8, 5, 6]),
            prompt: DEFAULT_COMPOSITE_PROMPT.to_string(),
        }
    }

    #[test]
    fn with_config_rejects_blank_values() {
        assert!(
            GeminiImageProvider::with_config(" ", "http://x", "gemini-x", Duration::from_secs(1))
                .is_err()
        );
        assert!(
            GeminiImageProvider::with_config("k", " ", "gemini-x", Duration::from_secs(1))
                .is_err()
        );
        assert!(
            GeminiImageProvider::with_config("k", "http://x", "  ", Duration::from_secs(1))
                .is_err()
        );
    }

    #[test]
    fn endpoint_url_strips_trailing_slash() {
        assert_eq!(
            provider().endpoint_url("gemini-2.5-flash-image"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn build_request_payload_sends_prompt_then_scene_then_rug() {
        let payload = provider().build_request_payload(&request());
        let json = serde_json::to_value(&payload).expect("payload should serialize");

        assert_eq!(json.pointer("/contents/0/role"), Some(&"user".into()));
        assert_eq!(
            json.pointer("/contents/0/parts/0/text")
                .and_then(|value| value.as_str()),
            Some(DEFAULT_COMPOSITE_PROMPT)
        );
        assert_eq!(
            json.pointer("/contents/0/parts/1/inline_data/mime_type"),
            Some(&"image/jpeg".into())
        );
        assert_eq!(
            json.pointer("/contents/0/parts/1/inline_data/data"),
            Some(&"AQID".into())
        );
        assert_eq!(
            json.pointer("/contents/0/parts/2/inline_data/data"),
            Some(&"BAUG".into())
        );
        assert_eq!(
            json.pointer("/generationConfig/responseModalities/0"),
            Some(&"IMAGE".into())
        );
    }

    #[test]
    fn map_success_response_extracts_first_inline_image() {
        let body = r#"{
          "candidates": [{
            "content": {"parts": [
              {"text": "Here is your room."},
              {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
            ]},
            "finishReason": "STOP"
          }]
        }"#;

        let image = provider()
            .map_success_response(body)
            .expect("inline image should be extracted");

        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.data_uri(), "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(image.bytes()[..4], [0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn map_success_response_accepts_snake_case_inline_data() {
        let body = r#"{"candidates":[{"content":{"parts":[
            {"inline_data":{"mime_type":"image/jpeg","data":"/9j/"}}
        ]}}]}"#;

        let image = provider()
            .map_success_response(body)
            .expect("snake_case payload should parse");
        assert_eq!(image.mime_type(), "image/jpeg");
    }

    #[test]
    fn map_success_response_reports_block_reason() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;

        let error = provider()
            .map_success_response(body)
            .expect_err("blocked prompt should fail");
        assert_eq!(
            error,
            GenerationError::Blocked {
                reason: "SAFETY".to_string()
            }
        );
    }

    #[test]
    fn map_success_response_rejects_text_only_answer() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"I cannot edit images."}]},"finishReason":"STOP"}]}"#;

        let error = provider()
            .map_success_response(body)
            .expect_err("text-only answer should fail");
        assert!(matches!(
            error,
            GenerationError::InvalidResponse { message }
            if message.contains("finishReason=STOP") && message.contains("I cannot edit images.")
        ));
    }

    #[test]
    fn map_http_error_maps_status_and_error_status() {
        let auth = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"API key not valid","status":"UNAUTHENTICATED"}}"#,
        );
        let rate_limited = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":429,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#,
        );
        let timeout = map_http_error(StatusCode::GATEWAY_TIMEOUT, "upstream timed out");
        let other = map_http_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":{"code":500,"message":"backend exploded","status":"INTERNAL"}}"#,
        );

        assert_eq!(auth, GenerationError::Auth);
        assert_eq!(rate_limited, GenerationError::RateLimited);
        assert_eq!(timeout, GenerationError::Timeout);
        assert!(matches!(
            other,
            GenerationError::Transport { message } if message.contains("backend exploded")
        ));
    }

    #[test]
    fn supports_only_gemini_models() {
        assert!(provider().supports_model("gemini-2.5-flash-image"));
        assert!(!provider().supports_model("claude-3-5-sonnet"));
        assert!(!provider().supports_model(" "));
    }
}
