//! Gemini (Google) image editing provider.

use crate::error::{parse_retry_after, sanitize_error_message, PassportError, Result};
use crate::image::provider::{EditRequest, EditedImage, ImageEditor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Default Generative Language API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "nano-banana-pro-preview",
        }
    }

    /// Parses a short name (`nano-banana`) or an API identifier.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "nano-banana" | "gemini-2.5-flash-image" => Some(Self::NanoBanana),
            "nano-banana-pro" | "nano-banana-pro-preview" => Some(Self::NanoBananaPro),
            _ => None,
        }
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    model: GeminiModel,
    base_url: Option<String>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY`, then `API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API endpoint (proxies, tests).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider.
    ///
    /// A missing API key is not an error here: every edit then fails with
    /// [`PassportError::Auth`], so the session reports it like any other
    /// failed request.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .or_else(|| std::env::var("API_KEY").ok())
            .filter(|k| !k.trim().is_empty());

        if api_key.is_none() {
            tracing::warn!("no Gemini API key configured; generation requests will fail");
        }

        Ok(GeminiProvider {
            client: reqwest::Client::builder().build()?,
            api_key,
            model: self.model,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Gemini image editing provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: GeminiModel,
    base_url: String,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Returns the configured model.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    async fn edit_impl(&self, request: &EditRequest) -> Result<EditedImage> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PassportError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
        })?;
        let start = Instant::now();

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model.as_str(),
        );

        let body = GeminiRequest::from_edit_request(request);

        tracing::debug!(
            model = self.model.as_str(),
            mime_type = %request.image.mime_type,
            aspect_ratio = %request.aspect_ratio,
            "sending Gemini edit request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let image = gemini_response.into_edited_image()?;

        tracing::debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Gemini edit complete"
        );
        Ok(image)
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> PassportError {
    let text = sanitize_error_message(text);
    if status == 402 {
        return PassportError::Billing(
            "Gemini billing issue: enable billing at https://aistudio.google.com".into(),
        );
    }
    if status == 404 {
        return PassportError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        );
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
        return PassportError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return PassportError::Auth(text);
    }
    let lower = text.to_lowercase();
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return PassportError::ContentBlocked(text);
    }
    PassportError::Api {
        status,
        message: text,
    }
}

#[async_trait]
impl ImageEditor for GeminiProvider {
    async fn edit(&self, request: &EditRequest) -> Result<EditedImage> {
        self.edit_impl(request).await
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
    image_config: GeminiImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

impl GeminiRequest {
    fn from_edit_request(req: &EditRequest) -> Self {
        // Instruction first, then the photo to edit
        let parts = vec![
            GeminiRequestPart::Text {
                text: req.instruction.clone(),
            },
            GeminiRequestPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: req.image.mime_type.clone(),
                    data: req.image.data.clone(),
                },
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: GeminiImageConfig {
                    aspect_ratio: req.aspect_ratio.as_str().to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

impl GeminiResponse {
    fn into_edited_image(self) -> Result<EditedImage> {
        // Blocks on the prompt come back as HTTP 200
        if let Some(feedback) = self.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
                return Err(PassportError::ContentBlocked(msg));
            }
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            PassportError::UnexpectedResponse("No candidates in Gemini response".into())
        })?;

        if let Some(ref finish_reason) = candidate.finish_reason {
            match finish_reason.as_str() {
                "SAFETY"
                | "IMAGE_SAFETY"
                | "IMAGE_PROHIBITED_CONTENT"
                | "IMAGE_RECITATION"
                | "RECITATION"
                | "PROHIBITED_CONTENT"
                | "BLOCKLIST" => {
                    return Err(PassportError::ContentBlocked(format!(
                        "Content blocked by Gemini safety filter: {}",
                        finish_reason
                    )));
                }
                _ => {} // STOP, MAX_TOKENS, NO_IMAGE etc. fall through to the part scan
            }
        }

        candidate
            .content
            .into_iter()
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data.filter(|d| !d.data.is_empty()))
            .map(|d| EditedImage {
                data: d.data,
                mime_type: d.mime_type,
            })
            .ok_or_else(|| {
                PassportError::UnexpectedResponse("AI did not return an image".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::provider::InlineImage;
    use crate::image::types::AspectRatio;

    fn edit_request() -> EditRequest {
        EditRequest {
            instruction: "Make it a passport photo".into(),
            image: InlineImage {
                data: "/9j/4AAQ".into(),
                mime_type: "image/jpeg".into(),
            },
            aspect_ratio: AspectRatio::Passport,
        }
    }

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(GeminiModel::NanoBanana.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            GeminiModel::NanoBananaPro.as_str(),
            "nano-banana-pro-preview"
        );
        assert_eq!(GeminiModel::default(), GeminiModel::NanoBanana);
        assert_eq!(
            GeminiModel::from_name("nano-banana-pro"),
            Some(GeminiModel::NanoBananaPro)
        );
        assert_eq!(GeminiModel::from_name("imagen"), None);
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = GeminiProviderBuilder::new()
            .api_key("test-key")
            .base_url("http://localhost:9999/")
            .build()
            .unwrap();
        assert_eq!(provider.base_url, "http://localhost:9999");
        assert_eq!(provider.api_key.as_deref(), Some("test-key"));
    }

    #[tokio::test]
    async fn test_blank_key_fails_at_request_time() {
        let provider = GeminiProviderBuilder::new().api_key("  ").build().unwrap();
        let err = provider.edit(&edit_request()).await.unwrap_err();
        assert!(matches!(err, PassportError::Auth(_)));
    }

    #[test]
    fn test_request_serialization() {
        let body = GeminiRequest::from_edit_request(&edit_request());
        let json = serde_json::to_value(&body).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "Make it a passport photo");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "/9j/4AAQ");
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "3:4");
        assert_eq!(json["generationConfig"]["responseModalities"][0], "IMAGE");
        assert!(json.get("generation_config").is_none());
    }

    #[test]
    fn test_response_first_inline_part_wins() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here is your photo"},
                        {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                        {"inlineData": {"mimeType": "image/png", "data": "BBBB"}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let image = resp.into_edited_image().unwrap();
        assert_eq!(image.data, "AAAA");
        assert_eq!(image.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_response_skips_empty_inline_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[
            {"inlineData":{"mimeType":"image/png","data":""}},
            {"inlineData":{"mimeType":"image/png"}},
            {"inlineData":{"mimeType":"image/png","data":"iVBORw0KGgo="}}
        ]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        let image = resp.into_edited_image().unwrap();
        assert_eq!(image.data, "iVBORw0KGgo=");
    }

    #[test]
    fn test_response_no_image_data() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "Sorry"}]}}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            resp.into_edited_image(),
            Err(PassportError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_response_with_prompt_feedback_block() {
        let json = r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        match resp.into_edited_image() {
            Err(PassportError::ContentBlocked(msg)) => {
                assert_eq!(msg, "Prompt was blocked due to safety")
            }
            other => panic!("expected content block, got {other:?}"),
        }
    }

    #[test]
    fn test_response_safety_finish_reason() {
        let json = r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#;
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            resp.into_edited_image(),
            Err(PassportError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_parse_error_mapping() {
        let headers = reqwest::header::HeaderMap::new();
        assert!(matches!(
            parse_error(403, "forbidden", &headers),
            PassportError::Auth(_)
        ));
        assert!(matches!(
            parse_error(402, "", &headers),
            PassportError::Billing(_)
        ));
        assert!(matches!(
            parse_error(404, "", &headers),
            PassportError::InvalidRequest(_)
        ));
        assert!(matches!(
            parse_error(400, r#"{"error": {"message": "Request blocked by safety"}}"#, &headers),
            PassportError::ContentBlocked(_)
        ));
        match parse_error(500, "boom", &headers) {
            PassportError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }
}
