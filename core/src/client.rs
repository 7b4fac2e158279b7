use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info, warn};

use crate::config::DoctorConfig;
use crate::errors::{DoctorError, DoctorResult};
use crate::prompt::build_prompt;
use crate::types::*;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Anything that can answer a symptom message given prior conversation context
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        user_text: &str,
        prior_context: &str,
    ) -> DoctorResult<String>;

    /// Same as [`generate`](Self::generate) but with every failure flattened into
    /// a displayable message, so it can be shown in place of a reply.
    async fn generate_reply(
        &self,
        model: &str,
        user_text: &str,
        prior_context: &str,
    ) -> Result<String, String> {
        self.generate(model, user_text, prior_context)
            .await
            .map_err(|e| format!("Error generating response: {}", e))
    }
}

/// Client for interacting with the Gemini API. Owns the credential for one session.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini API client
    pub fn new(api_key: &str, config: &DoctorConfig) -> DoctorResult<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(DoctorError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DoctorError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: config.gemini_base_url().to_string(),
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            normalize_model_name(model)
        )
    }

    /// The key travels in a header so it never appears in URLs or transport errors
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }

    /// Generate content using the Gemini API
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> DoctorResult<GenerateContentResponse> {
        let response = self
            .authorized(self.client.post(self.generate_url(model)))
            .json(request)
            .send()
            .await
            .map_err(send_error)?;

        let response = check_status(response).await?;

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| DoctorError::ParsingError(format!("Failed to parse response: {}", e)))
    }

    /// Returns the identifiers of every model the API currently exposes
    pub async fn list_models(&self) -> DoctorResult<Vec<String>> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.authorized(self.client.get(format!("{}/models", self.base_url)));
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(send_error)?;
            let page = check_status(response)
                .await?
                .json::<ListModelsResponse>()
                .await
                .map_err(|e| {
                    DoctorError::ParsingError(format!("Failed to parse model list: {}", e))
                })?;

            names.extend(page.models.into_iter().map(|m| m.name));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = names.len(), "Listed models");
        Ok(names)
    }

    /// Model listing for display: failures become a single error line
    pub async fn list_model_names(&self) -> Vec<String> {
        match self.list_models().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Listing models failed: {}", e);
                vec![format!("Error listing models: {}", e)]
            }
        }
    }
}

#[async_trait]
impl Assistant for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        user_text: &str,
        prior_context: &str,
    ) -> DoctorResult<String> {
        let request = create_symptom_request(user_text, prior_context);
        info!(
            model = model,
            prompt_chars = user_text.len() + prior_context.len(),
            "Requesting completion"
        );
        let response = self.generate_content(model, &request).await?;
        extract_text_from_response(&response)
    }
}

/// Accepts both `gemini-1.5-pro` and the fully qualified `models/gemini-1.5-pro`
pub fn normalize_model_name(model: &str) -> &str {
    let model = model.trim();
    model.strip_prefix("models/").unwrap_or(model)
}

/// Wraps the symptom prompt into a single-turn request
pub fn create_symptom_request(user_text: &str, prior_context: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user_text(build_prompt(user_text, prior_context))],
    }
}

/// Extracts the text of the first candidate, concatenating its text parts
pub fn extract_text_from_response(response: &GenerateContentResponse) -> DoctorResult<String> {
    let candidate = match response.candidates.first() {
        Some(candidate) => candidate,
        None => {
            let reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(DoctorError::ResponseError(format!(
                "No candidates in response (block reason: {})",
                reason
            )));
        }
    };

    let content = candidate
        .content
        .as_ref()
        .ok_or_else(|| DoctorError::ResponseError("No content in candidate".to_string()))?;

    let text: String = content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.is_empty() {
        return Err(DoctorError::ResponseError("No text in response".to_string()));
    }

    Ok(text)
}

fn send_error(e: reqwest::Error) -> DoctorError {
    DoctorError::RequestError(format!("Failed to send request: {}", e.without_url()))
}

/// Turns a non-2xx response into an `HttpError`, preferring the API's own message
async fn check_status(response: Response) -> DoctorResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.map_err(|e| {
        DoctorError::ResponseError(format!("Failed to read error response: {}", e))
    })?;

    let message = match serde_json::from_str::<ApiErrorEnvelope>(&error_body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => format!("API request failed: {}", error_body),
    };

    Err(DoctorError::HttpError {
        status_code: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        let config = DoctorConfig::default();
        assert!(matches!(
            GeminiClient::new("", &config),
            Err(DoctorError::MissingApiKey)
        ));
        assert!(matches!(
            GeminiClient::new("   ", &config),
            Err(DoctorError::MissingApiKey)
        ));
    }

    #[test]
    fn test_generate_url() {
        let client = GeminiClient::new("secret", &DoctorConfig::default()).unwrap();
        assert_eq!(
            client.generate_url("models/gemini-1.5-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    fn unreachable_client(key: &str) -> GeminiClient {
        let config = DoctorConfig {
            gemini_base_url: Some("http://127.0.0.1:1/v1beta".to_string()),
            request_timeout_secs: Some(5),
            ..DoctorConfig::default()
        };
        GeminiClient::new(key, &config).unwrap()
    }

    #[tokio::test]
    async fn test_transport_errors_do_not_reveal_key() {
        let client = unreachable_client("SUPERSECRETKEY");

        let reply = client.generate_reply("gemini-1.5-flash", "cough", "").await;
        let message = reply.unwrap_err();
        assert!(message.starts_with("Error generating response: Request Error"));
        assert!(!message.contains("SUPERSECRETKEY"));

        let models = client.list_model_names().await;
        assert_eq!(models.len(), 1);
        assert!(models[0].starts_with("Error listing models:"));
        assert!(!models[0].contains("SUPERSECRETKEY"));
    }

    #[test]
    fn test_normalize_model_name() {
        assert_eq!(normalize_model_name("gemini-1.5-flash"), "gemini-1.5-flash");
        assert_eq!(normalize_model_name("models/gemini-1.0-pro"), "gemini-1.0-pro");
    }

    #[test]
    fn test_request_serialization() {
        let request = create_symptom_request("cough", "User: hi");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        let text = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("User's symptoms: cough"));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Rest "},{"text":"and hydrate."}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_from_response(&response).unwrap(), "Rest and hydrate.");
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        let err = extract_text_from_response(&response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_list_models_page_parses() {
        let page: ListModelsResponse = serde_json::from_str(
            r#"{"models":[{"name":"models/gemini-1.5-pro","displayName":"Gemini 1.5 Pro"}],"nextPageToken":"abc"}"#,
        )
        .unwrap();
        assert_eq!(page.models[0].name, "models/gemini-1.5-pro");
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
    }

    struct Failing;

    #[async_trait]
    impl Assistant for Failing {
        async fn generate(&self, _: &str, _: &str, _: &str) -> DoctorResult<String> {
            Err(DoctorError::HttpError {
                status_code: 429,
                message: "Quota exceeded".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_generate_reply_wraps_error() {
        let reply = Failing.generate_reply("gemini-1.5-pro", "cough", "").await;
        assert_eq!(
            reply,
            Err("Error generating response: HTTP Error: 429 - Quota exceeded".to_string())
        );
    }
}
