//! Query translation and result synthesis.
//!
//! One backend call per query: the model detects the query language,
//! translates it to English and invents a page of video results, all
//! constrained to [`RESPONSE_SCHEMA`]. Thumbnails are derived locally
//! from the item ids.

use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::future::Future;

use crate::config::Config;
use crate::data_models::{RawSearchResponse, SearchResult, VideoSummary};
use crate::error::SynthesisError;

/// Number of results requested from the backend.
pub const RESULT_COUNT: usize = 12;

static THUMBNAIL_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("https://picsum.photos/seed").expect("valid thumbnail base url"));

/// Output schema in the backend's OpenAPI-subset dialect.
pub static RESPONSE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "detectedLanguage": {
                "type": "STRING",
                "description": "The detected language of the user's query (e.g., 'Spanish')."
            },
            "translatedQuery": {
                "type": "STRING",
                "description": "The user's query translated into English."
            },
            "videos": {
                "type": "ARRAY",
                "description": "An array of 12 realistic YouTube video search results.",
                "minItems": RESULT_COUNT,
                "maxItems": RESULT_COUNT,
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": {
                            "type": "STRING",
                            "description": "A unique identifier for the video, like a standard YouTube video ID."
                        },
                        "title": {
                            "type": "STRING",
                            "description": "The title of the video."
                        },
                        "channelName": {
                            "type": "STRING",
                            "description": "The name of the YouTube channel that uploaded the video."
                        },
                        "views": {
                            "type": "STRING",
                            "description": "The number of views, formatted as a string (e.g., '1.2M views')."
                        },
                        "uploadDate": {
                            "type": "STRING",
                            "description": "How long ago the video was uploaded (e.g., '2 weeks ago')."
                        }
                    },
                    "required": ["id", "title", "channelName", "views", "uploadDate"]
                }
            }
        },
        "required": ["detectedLanguage", "translatedQuery", "videos"]
    })
});

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub schema: Value,
}

/// A generative model that answers a prompt with JSON text conforming to a schema.
pub trait GenerativeBackend: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, SynthesisError>> + Send;
}

// =============================================================================
// Gemini HTTP backend
// =============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig<'a> {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
    #[serde(rename = "responseSchema")]
    response_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

pub struct GeminiBackend {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.api_base.clone(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl GenerativeBackend for GeminiBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, SynthesisError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let body = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.schema,
            },
        };

        log::debug!("calling {} with model {}", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Backend { status, body });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(SynthesisError::EmptyResponse)
    }
}

// =============================================================================
// Synthesizer
// =============================================================================

pub struct Synthesizer<B> {
    backend: B,
}

impl<B: GenerativeBackend> Synthesizer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Translate `query` and synthesize a page of results. No retries.
    pub async fn run(&self, query: &str) -> Result<SearchResult, SynthesisError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SynthesisError::EmptyQuery);
        }

        let request = GenerationRequest {
            prompt: build_prompt(query),
            schema: RESPONSE_SCHEMA.clone(),
        };

        let text = self.backend.generate(&request).await?;
        let result = parse_response(&text)?;

        log::info!(
            "synthesized {} results (detected language: {}, translated: {:?})",
            result.items.len(),
            result.detected_language,
            result.translated_query
        );
        Ok(result)
    }
}

pub fn build_prompt(query: &str) -> String {
    format!(
        r#"You are a YouTube search simulation API. A user has provided the following search query: "{query}".

Your tasks are:
1. Auto-detect the language of the query.
2. Translate the query into English.
3. Based on the English translation, generate a list of {RESULT_COUNT} realistic-looking YouTube video search results. Each result must include a unique ID, title, channel name, view count (e.g., '2.3M views'), and upload date (e.g., '3 months ago').

Return ONLY a JSON object that adheres to the provided schema. Do not include any other text, markdown formatting, or explanations.
"#
    )
}

/// Stable image URL for a result id.
pub fn thumbnail_url(id: &str) -> String {
    let mut url = THUMBNAIL_BASE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend([id, "480", "270"]);
    }
    url.to_string()
}

/// Parse and validate the backend's JSON text into a [`SearchResult`].
pub fn parse_response(text: &str) -> Result<SearchResult, SynthesisError> {
    let raw: RawSearchResponse = serde_json::from_str(strip_code_fence(text))?;

    require_text("detectedLanguage", &raw.detected_language)?;
    require_text("translatedQuery", &raw.translated_query)?;

    let mut videos = raw.videos;
    if videos.len() > RESULT_COUNT {
        log::warn!(
            "backend returned {} videos, keeping the first {RESULT_COUNT}",
            videos.len()
        );
        videos.truncate(RESULT_COUNT);
    } else if videos.len() < RESULT_COUNT {
        log::warn!(
            "backend returned {} videos, expected {RESULT_COUNT}",
            videos.len()
        );
    }

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(videos.len());
    for (idx, video) in videos.into_iter().enumerate() {
        require_text(&format!("videos[{idx}].id"), &video.id)?;
        require_text(&format!("videos[{idx}].title"), &video.title)?;
        require_text(&format!("videos[{idx}].channelName"), &video.channel_name)?;
        require_text(&format!("videos[{idx}].views"), &video.views)?;
        require_text(&format!("videos[{idx}].uploadDate"), &video.upload_date)?;

        if !seen.insert(video.id.clone()) {
            return Err(SynthesisError::SchemaViolation(format!(
                "duplicate video id {:?}",
                video.id
            )));
        }

        items.push(VideoSummary {
            thumbnail_url: thumbnail_url(&video.id),
            id: video.id,
            title: video.title,
            channel_name: video.channel_name,
            view_count_label: video.views,
            age_label: video.upload_date,
        });
    }

    Ok(SearchResult {
        detected_language: raw.detected_language,
        translated_query: raw.translated_query,
        items,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn require_text(field: &str, value: &str) -> Result<(), SynthesisError> {
    if value.trim().is_empty() {
        return Err(SynthesisError::SchemaViolation(format!(
            "{field} must not be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str) -> Value {
        json!({
            "id": id,
            "title": format!("Video {id}"),
            "channelName": "Rock Channel",
            "views": "1.2M views",
            "uploadDate": "2 weeks ago"
        })
    }

    fn response_with(count: usize) -> Value {
        json!({
            "detectedLanguage": "Spanish",
            "translatedQuery": "rock songs in Spanish",
            "videos": (0..count).map(|i| video(&format!("vid{i}"))).collect::<Vec<_>>()
        })
    }

    #[test]
    fn test_parse_full_response() {
        let result = parse_response(&response_with(12).to_string()).unwrap();
        assert_eq!(result.detected_language, "Spanish");
        assert_eq!(result.translated_query, "rock songs in Spanish");
        assert_eq!(result.items.len(), RESULT_COUNT);
        assert_eq!(result.items[3].id, "vid3");
        assert_eq!(result.items[3].view_count_label, "1.2M views");
        assert_eq!(result.items[3].age_label, "2 weeks ago");
        assert_eq!(
            result.items[3].thumbnail_url,
            "https://picsum.photos/seed/vid3/480/270"
        );
    }

    #[test]
    fn test_missing_videos_field_fails() {
        let text = json!({
            "detectedLanguage": "Spanish",
            "translatedQuery": "rock songs in Spanish"
        })
        .to_string();
        assert!(matches!(
            parse_response(&text),
            Err(SynthesisError::Malformed(_))
        ));
    }

    #[test]
    fn test_wrong_type_fails() {
        let mut value = response_with(12);
        value["videos"][0]["views"] = json!(1200000);
        assert!(matches!(
            parse_response(&value.to_string()),
            Err(SynthesisError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_item_field_fails() {
        let mut value = response_with(12);
        value["videos"][5]
            .as_object_mut()
            .unwrap()
            .remove("channelName");
        assert!(parse_response(&value.to_string()).is_err());
    }

    #[test]
    fn test_blank_field_is_schema_violation() {
        let mut value = response_with(12);
        value["videos"][2]["title"] = json!("   ");
        assert!(matches!(
            parse_response(&value.to_string()),
            Err(SynthesisError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut value = response_with(12);
        value["videos"][1]["id"] = json!("vid0");
        assert!(matches!(
            parse_response(&value.to_string()),
            Err(SynthesisError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_extra_items_truncated_short_lists_kept() {
        let result = parse_response(&response_with(15).to_string()).unwrap();
        assert_eq!(result.items.len(), RESULT_COUNT);
        assert_eq!(result.items.last().unwrap().id, "vid11");

        let result = parse_response(&response_with(4).to_string()).unwrap();
        assert_eq!(result.items.len(), 4);
    }

    #[test]
    fn test_code_fence_is_tolerated() {
        let text = format!("```json\n{}\n```", response_with(12));
        assert_eq!(parse_response(&text).unwrap().items.len(), RESULT_COUNT);

        let text = format!("```\n{}\n```", response_with(12));
        assert_eq!(parse_response(&text).unwrap().items.len(), RESULT_COUNT);
    }

    #[test]
    fn test_not_json_fails() {
        assert!(parse_response("Sure! Here are some videos").is_err());
        assert!(parse_response("").is_err());
    }

    #[test]
    fn test_thumbnail_is_deterministic_and_escaped() {
        assert_eq!(thumbnail_url("dQw4w9WgXcQ"), thumbnail_url("dQw4w9WgXcQ"));
        assert_ne!(thumbnail_url("a"), thumbnail_url("b"));

        let escaped = thumbnail_url("a/b c");
        assert_eq!(escaped, "https://picsum.photos/seed/a%2Fb%20c/480/270");
    }

    #[test]
    fn test_prompt_embeds_query_and_count() {
        let prompt = build_prompt("面白い猫の動画");
        assert!(prompt.contains("\"面白い猫の動画\""));
        assert!(prompt.contains("list of 12 realistic-looking"));
        assert!(prompt.contains("Return ONLY a JSON object"));
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = &*RESPONSE_SCHEMA;
        assert_eq!(
            schema["required"],
            json!(["detectedLanguage", "translatedQuery", "videos"])
        );
        assert_eq!(schema["properties"]["videos"]["maxItems"], json!(12));
        assert_eq!(
            schema["properties"]["videos"]["items"]["required"]
                .as_array()
                .unwrap()
                .len(),
            5
        );
    }
}
