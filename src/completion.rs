//! OpenAI-compatible chat completion client.
//!
//! One request per call, one user message, first choice returned. The
//! client is built once and shared read-only for the process lifetime.

use crate::config::{ApiKey, Settings};
use crate::error::{OptionExt, ResearchError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// Chat completion client
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    api_key: ApiKey,
    api_url: String,
    model: String,
}

impl CompletionClient {
    /// Build the client. Fails with a config error when no API key is set.
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_api_key()?.clone();

        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ResearchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            api_url: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one user message and return the first choice's text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending completion request");

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ResearchError::Api {
                code: status.as_u16(),
                message: format!("Completion API error: {} - {}", status, error_text),
            });
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Parse(format!("Failed to parse completion response: {}", e)))?;

        if let Some(usage) = &api_response.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Completion received"
            );
        }

        api_response
            .choices
            .into_iter()
            .next()
            .ok_or_parse("Completion response contained no choices")?
            .message
            .content
            .ok_or_parse("Completion choice has no message content")
    }
}

/// Extract JSON from LLM response (handles markdown code blocks)
pub(crate) fn extract_json(content: &str) -> String {
    let trimmed = content.trim();

    // Check for markdown code block
    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() >= 2 {
            let end = if lines.last().map(|l| l.trim()) == Some("```") {
                lines.len() - 1
            } else {
                lines.len()
            };
            return lines[1..end].join("\n");
        }
    }

    // Try to find JSON object in the text
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        let input = r#"{"verdict": "research", "answer": "test"}"#;
        assert_eq!(extract_json(input), input);
    }

    #[test]
    fn test_extract_json_code_block() {
        let input = "```json\n{\"verdict\": \"research\", \"answer\": \"test\"}\n```";
        let result = extract_json(input);
        assert!(result.starts_with('{'));
        assert!(result.contains("\"verdict\": \"research\""));
    }

    #[test]
    fn test_extract_json_with_text() {
        let input = r#"Sure! {"verdict": "non-research", "answer": "weather"} Hope this helps."#;
        let result = extract_json(input);
        assert!(result.starts_with('{'));
        assert!(result.ends_with('}'));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let settings = Settings::default();
        assert!(matches!(
            CompletionClient::new(&settings),
            Err(ResearchError::Config(_))
        ));
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_settings(base_url: &str) -> Settings {
        Settings {
            api_key: ApiKey::new("test-key"),
            base_url: base_url.to_string(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn complete_returns_first_choice() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": crate::config::DEFAULT_MODEL,
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "first"}},
                    {"message": {"role": "assistant", "content": "second"}}
                ],
                "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CompletionClient::new(&test_settings(&server.uri()))?;
        assert_eq!(client.complete("hello").await?, "first");
        Ok(())
    }

    #[tokio::test]
    async fn complete_500_returns_api_error() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = CompletionClient::new(&test_settings(&server.uri()))?;
        match client.complete("hello").await {
            Err(ResearchError::Api { code: 500, message }) => {
                assert!(message.contains("overloaded"));
            }
            other => panic!("expected Api(500), got: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn complete_empty_choices_is_parse_error() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = CompletionClient::new(&test_settings(&server.uri()))?;
        assert!(matches!(
            client.complete("hello").await,
            Err(ResearchError::Parse(_))
        ));
        Ok(())
    }
}
