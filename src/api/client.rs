use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::types::{ChatMessage, ChatRequest, ChatResponse};
use crate::config::Config;
use crate::error::{BriefError, Result};

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 512;

/// Something that turns a prompt into a completion
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, api_key: &str, model: &str, prompt: &str) -> Result<String>;
}

/// Groq (OpenAI-compatible) chat completion client
pub struct GroqClient {
    client: Client,
    endpoint: String,
}

impl GroqClient {
    /// Create a new client from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.groq.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder.build().map_err(|e| {
            BriefError::ConfigError(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self::with_client(client, &config.groq.base_url))
    }

    /// Create a client against a custom base URL (gateways, test servers)
    pub fn with_base_url(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(model: &str, prompt: &str) -> ChatRequest {
        let model = model.trim();
        ChatRequest {
            model: if model.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            },
            messages: vec![ChatMessage::user(prompt)],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }

    /// Handle a completion response
    async fn handle_response(response: reqwest::Response) -> Result<String> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Completion request failed with {}: {}", status, body);
            return Err(BriefError::ApiHttpError {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| BriefError::UnexpectedException {
                    message: format!("Failed to parse completion response: {}", e),
                })?;

        parsed
            .first_content()
            .ok_or_else(|| BriefError::UnexpectedException {
                message: "Completion response contained no choices".to_string(),
            })
    }
}

#[async_trait]
impl Summarizer for GroqClient {
    async fn summarize(&self, api_key: &str, model: &str, prompt: &str) -> Result<String> {
        let request = Self::build_request(model, prompt);
        tracing::info!(
            "Requesting completion from {} (model: {}, {} prompt chars)",
            self.endpoint,
            request.model,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| BriefError::UnexpectedException {
                message: format!("Request failed: {}", e),
            })?;

        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_chat_completions() {
        let client = GroqClient::with_base_url("https://api.groq.com/openai/v1/");
        assert_eq!(
            client.endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn from_default_config_targets_groq() {
        let client = GroqClient::from_config(&Config::default()).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn build_request_uses_fixed_sampling() {
        let request = GroqClient::build_request("llama-3.1-8b-instant", "hello");

        assert_eq!(request.model, "llama-3.1-8b-instant");
        assert_eq!(request.messages, vec![ChatMessage::user("hello")]);
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.max_tokens, 512);
    }

    #[test]
    fn build_request_falls_back_to_default_model() {
        assert_eq!(GroqClient::build_request("", "x").model, DEFAULT_MODEL);
        assert_eq!(GroqClient::build_request("   ", "x").model, DEFAULT_MODEL);
    }

    mod http_tests {
        use super::*;
        use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn summarize_returns_first_choice() {
            let mock_server = MockServer::start().await;

            Mock::given(matchers::method("POST"))
                .and(matchers::path("/chat/completions"))
                .and(matchers::header("Authorization", "Bearer gsk_test"))
                .and(matchers::header("Content-Type", "application/json"))
                .and(matchers::body_partial_json(serde_json::json!({
                    "model": "openai/gpt-oss-20b",
                    "messages": [{ "role": "user", "content": "Summarize this" }],
                    "max_tokens": 512
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "S" } },
                        { "message": { "role": "assistant", "content": "ignored" } }
                    ]
                })))
                .expect(1)
                .mount(&mock_server)
                .await;

            let client = GroqClient::with_base_url(&mock_server.uri());
            let summary = client
                .summarize("gsk_test", "", "Summarize this")
                .await
                .unwrap();

            assert_eq!(summary, "S");
        }

        #[tokio::test]
        async fn unauthorized_surfaces_status() {
            let mock_server = MockServer::start().await;

            Mock::given(matchers::method("POST"))
                .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
                .mount(&mock_server)
                .await;

            let client = GroqClient::with_base_url(&mock_server.uri());
            let err = client.summarize("bad", "m", "p").await.unwrap_err();

            match err {
                BriefError::ApiHttpError {
                    status,
                    status_text,
                } => {
                    assert_eq!(status, 401);
                    assert_eq!(status_text, "Unauthorized");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn empty_choices_is_an_error() {
            let mock_server = MockServer::start().await;

            Mock::given(matchers::method("POST"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
                )
                .mount(&mock_server)
                .await;

            let client = GroqClient::with_base_url(&mock_server.uri());
            let err = client.summarize("k", "m", "p").await.unwrap_err();

            assert!(matches!(err, BriefError::UnexpectedException { .. }));
        }

        #[tokio::test]
        async fn malformed_body_is_an_error() {
            let mock_server = MockServer::start().await;

            Mock::given(matchers::method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
                .mount(&mock_server)
                .await;

            let client = GroqClient::with_base_url(&mock_server.uri());
            let err = client.summarize("k", "m", "p").await.unwrap_err();

            assert!(err.to_string().contains("Failed to parse completion response"));
        }
    }
}
