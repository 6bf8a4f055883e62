use serde::{Deserialize, Serialize};

/// Signed-in user as reported by the auth provider.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub picture: String,
}

impl Identity {
    pub fn new(name: String, email: String, picture: String) -> Identity {
        Identity {
            name,
            email,
            picture,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub signed_in: bool,
    pub subscribed: bool,
    pub free_searches_used: u32,
}

/// One synthetic search hit. Not a catalog entry: ids carry no meaning across calls.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub channel_name: String,
    pub view_count_label: String,
    pub age_label: String,
    pub thumbnail_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub detected_language: String,
    pub translated_query: String,
    pub items: Vec<VideoSummary>,
}

// =============================================================================
// Wire shapes returned by the generative backend
// =============================================================================

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchResponse {
    pub detected_language: String,
    pub translated_query: String,
    pub videos: Vec<RawVideo>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawVideo {
    pub id: String,
    pub title: String,
    pub channel_name: String,
    pub views: String,
    pub upload_date: String,
}
