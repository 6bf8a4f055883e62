use serde::{Deserialize, Serialize};

use crate::controller::{SearchExample, SearchView, UpsellPrompt};
use crate::data_models::{Identity, SearchResult};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    Completed,
    Blocked,
    Failed,
    Busy,
    Ignored,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upsell: Option<UpsellPrompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub free_searches_used: u32,
    pub searches_left: u32,
    pub processing_time_ms: u128,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub credential: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub identity: Option<Identity>,
    pub view: SearchView,
    pub limit: u32,
    pub sign_in_enabled: bool,
    pub google_client_id: String,
}

#[derive(Debug, Serialize)]
pub struct ExamplesResponse {
    pub examples: &'static [SearchExample],
}
