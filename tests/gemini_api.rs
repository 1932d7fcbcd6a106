use passport_photo::{
    AspectRatio, EditRequest, GeminiModel, GeminiProvider, ImageEditor, InlineImage,
    PassportError,
};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";

fn provider(server: &MockServer) -> GeminiProvider {
    GeminiProvider::builder()
        .api_key("test-api-key")
        .model(GeminiModel::NanoBanana)
        .base_url(format!("{}/v1beta", server.uri()))
        .build()
        .unwrap()
}

fn edit_request() -> EditRequest {
    EditRequest {
        instruction: "Replace the background with solid #FFFFFF.".into(),
        image: InlineImage {
            data: "/9j/4AAQSkZJRg==".into(),
            mime_type: "image/jpeg".into(),
        },
        aspect_ratio: AspectRatio::Passport,
    }
}

#[tokio::test]
async fn sends_instruction_image_and_aspect_ratio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                ]},
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let image = provider(&server).edit(&edit_request()).await.unwrap();
    assert_eq!(image.data, "iVBORw0KGgo=");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let parts = &body["contents"][0]["parts"];
    assert_eq!(parts[0]["text"], "Replace the background with solid #FFFFFF.");
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[1]["inlineData"]["data"], "/9j/4AAQSkZJRg==");
    assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "3:4");
}

#[tokio::test]
async fn response_without_image_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "I can't edit this photo."}]}}]
        })))
        .mount(&server)
        .await;

    let err = provider(&server).edit(&edit_request()).await.unwrap_err();
    assert!(matches!(err, PassportError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "30")
                .set_body_json(json!({"error": {"code": 429, "message": "Quota exceeded"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server).edit(&edit_request()).await.unwrap_err();
    match err {
        PassportError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(30)))
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_key_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "API key not valid. Please pass a valid API key."}
        })))
        .mount(&server)
        .await;

    match provider(&server).edit(&edit_request()).await.unwrap_err() {
        PassportError::Auth(msg) => {
            assert_eq!(msg, "API key not valid. Please pass a valid API key.")
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn safety_block_is_content_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    match provider(&server).edit(&edit_request()).await.unwrap_err() {
        PassportError::ContentBlocked(msg) => assert_eq!(msg, "Prompt blocked: SAFETY"),
        other => panic!("expected content block, got {other:?}"),
    }
}
