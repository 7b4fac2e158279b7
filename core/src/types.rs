use serde::{Deserialize, Serialize};

/// Request to Gemini API to generate content
#[derive(Serialize, Debug)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

/// Content structure for requests and responses
#[derive(Serialize, Clone, Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Content {
    pub fn user_text(text: String) -> Self {
        Self {
            parts: vec![Part { text: Some(text) }],
            role: Some("user".to_string()),
        }
    }
}

/// Part structure for a piece of content
#[derive(Serialize, Clone, Debug, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Response from Gemini API
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

/// Candidate in the response
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

/// Set when the prompt itself was rejected
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

/// One page of `GET /models`
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
    pub next_page_token: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Fully qualified, e.g. `models/gemini-1.5-pro`
    pub name: String,
    pub display_name: Option<String>,
}

/// Error envelope returned by the Gemini API on non-2xx responses
#[derive(Deserialize, Debug)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct ApiErrorBody {
    pub code: Option<u16>,
    pub message: String,
    pub status: Option<String>,
}
