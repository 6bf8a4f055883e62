//! Integration tests for `GeminiBackend` using wiremock HTTP mocks.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use metube::error::SynthesisError;
use metube::synthesizer::{GeminiBackend, Synthesizer};

fn test_backend(base_url: &str) -> GeminiBackend {
    GeminiBackend::new(
        "test-key".to_string(),
        "gemini-2.5-flash".to_string(),
        format!("{base_url}/"),
    )
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": text }]
            },
            "finishReason": "STOP"
        }]
    })
}

fn japanese_cats() -> serde_json::Value {
    let videos: Vec<_> = (0..12)
        .map(|i| {
            json!({
                "id": format!("cat{i}"),
                "title": format!("Funny cats compilation {i}"),
                "channelName": "Neko Land",
                "views": "850K views",
                "uploadDate": "3 days ago"
            })
        })
        .collect();
    json!({
        "detectedLanguage": "Japanese",
        "translatedQuery": "funny cat videos",
        "videos": videos
    })
}

#[tokio::test]
async fn run_sends_schema_and_parses_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "required": ["detectedLanguage", "translatedQuery", "videos"]
                }
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gemini_reply(&japanese_cats().to_string())),
        )
        .expect(1)
        .mount(&server)
        .await;

    let synthesizer = Synthesizer::new(test_backend(&server.uri()));
    let result = synthesizer.run("面白い猫の動画").await.expect("should synthesize");

    assert_eq!(result.detected_language, "Japanese");
    assert_eq!(result.translated_query, "funny cat videos");
    assert_eq!(result.items.len(), 12);
    assert_eq!(
        result.items[0].thumbnail_url,
        "https://picsum.photos/seed/cat0/480/270"
    );
}

#[tokio::test]
async fn http_error_is_backend_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let synthesizer = Synthesizer::new(test_backend(&server.uri()));
    let err = synthesizer.run("hola").await.unwrap_err();

    match err {
        SynthesisError::Backend { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "quota exceeded");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn no_candidates_is_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let synthesizer = Synthesizer::new(test_backend(&server.uri()));
    let err = synthesizer.run("hola").await.unwrap_err();
    assert!(matches!(err, SynthesisError::EmptyResponse));
}

#[tokio::test]
async fn reply_missing_videos_is_rejected() {
    let server = MockServer::start().await;

    let mut body = japanese_cats();
    body.as_object_mut().unwrap().remove("videos");
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(&body.to_string())))
        .mount(&server)
        .await;

    let synthesizer = Synthesizer::new(test_backend(&server.uri()));
    let err = synthesizer.run("hola").await.unwrap_err();
    assert!(matches!(err, SynthesisError::Malformed(_)));
}

#[tokio::test]
async fn non_json_envelope_is_request_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let synthesizer = Synthesizer::new(test_backend(&server.uri()));
    let err = synthesizer.run("hola").await.unwrap_err();
    assert!(matches!(err, SynthesisError::Request(_)));
}

#[tokio::test]
async fn empty_query_never_calls_backend() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let synthesizer = Synthesizer::new(test_backend(&server.uri()));
    let err = synthesizer.run("   ").await.unwrap_err();
    assert!(matches!(err, SynthesisError::EmptyQuery));
}
