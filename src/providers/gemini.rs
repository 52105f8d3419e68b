use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::llm_manager::LLMProvider;

const SYSTEM_PROMPT: &str =
    "You are a careful analyst of news and social media content. Answer in plain text or Markdown.";

/// Gemini API provider over the OpenAI-compatible endpoint
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    max_tokens: usize,
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl GeminiProvider {
    /// Create a provider from an explicit credential and the provider settings.
    pub fn new(api_key: impl Into<String>, config: &ProviderConfig) -> Self {
        Self {
            api_key: api_key.into(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            max_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }

    /// The service answers errors either as an object or as a one-element array.
    fn parse_error(body: &str) -> Option<GeminiErrorDetails> {
        if let Ok(err) = serde_json::from_str::<GeminiError>(body) {
            return Some(err.error);
        }
        serde_json::from_str::<Vec<GeminiError>>(body)
            .ok()
            .and_then(|errs| errs.into_iter().next())
            .map(|e| e.error)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn context_size(&self) -> usize {
        match self.model.as_str() {
            m if m.starts_with("gemini-1.5-pro") => 2_097_152,
            _ => 1_048_576,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(prompt.to_string()),
                },
            ],
            max_tokens: Some(self.max_tokens),
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read Gemini response body")?;
        debug!("Raw Gemini response ({}): {}", status, response_text);

        if !status.is_success() {
            return Err(match Self::parse_error(&response_text) {
                Some(details) => anyhow!(
                    "Gemini API error (status {}): {} (status: {}, code: {})",
                    status,
                    details.message,
                    details.status.as_deref().unwrap_or("unknown"),
                    details
                        .code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "none".to_string())
                ),
                None => anyhow!("Gemini API error (status {}): {}", status, response_text),
            });
        }

        let gemini_response: GeminiResponse =
            serde_json::from_str(&response_text).context("Failed to parse Gemini response")?;

        if let Some(usage) = &gemini_response.usage {
            info!(
                "Gemini token usage - Prompt: {}, Completion: {}, Total: {}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        let choice = gemini_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No response choices from Gemini"))?;

        let finish_reason = choice.finish_reason.unwrap_or_else(|| "unknown".to_string());
        if finish_reason == "length" {
            warn!(
                "Gemini response was truncated at max_tokens ({}). Report may be incomplete.",
                self.max_tokens
            );
        }

        match choice.message.and_then(|m| m.content) {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(anyhow!(
                "Gemini returned no text (finish_reason: {})",
                finish_reason
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> GeminiProvider {
        let config = ProviderConfig {
            base_url: server.uri(),
            ..ProviderConfig::default()
        };
        GeminiProvider::new("test-key", &config)
    }

    #[test]
    fn test_context_sizes() {
        let mut config = ProviderConfig::default();
        assert_eq!(GeminiProvider::new("k", &config).context_size(), 1_048_576);
        config.model = "gemini-1.5-pro-latest".to_string();
        assert_eq!(GeminiProvider::new("k", &config).context_size(), 2_097_152);
    }

    #[tokio::test]
    async fn test_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "Report body"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider_for(&server).send_prompt("prompt").await.unwrap();
        assert_eq!(reply, "Report body");
    }

    #[tokio::test]
    async fn test_error_body_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!([{
                "error": {
                    "code": 429,
                    "message": "Resource has been exhausted (e.g. check quota).",
                    "status": "RESOURCE_EXHAUSTED"
                }
            }])))
            .mount(&server)
            .await;

        let err = provider_for(&server).send_prompt("prompt").await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("check quota"), "{}", text);
        assert!(text.contains("RESOURCE_EXHAUSTED"), "{}", text);
    }

    #[tokio::test]
    async fn test_unparseable_error_keeps_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = provider_for(&server).send_prompt("prompt").await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_empty_content_reports_finish_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant"}, "finish_reason": "content_filter"}]
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server).send_prompt("prompt").await.unwrap_err();
        assert!(err.to_string().contains("content_filter"));
    }
}
