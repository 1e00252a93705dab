//! OpenAI-compatible chat completion client
//!
//! A single request without retry; the planner wraps every call in the
//! [`ResilientCaller`](crate::resilience::ResilientCaller).

use crate::config::CompletionConfig;
use crate::resilience::CallError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Text completion service used for ranking and planning
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends `prompt` as a single user message and returns the reply text
    async fn complete(&self, prompt: &str) -> Result<String, CallError>;
}

pub struct ChatCompletionClient {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(config: &CompletionConfig, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: format!("{}/chat/completions", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
        }
    }

    /// Reads the API key from the environment variable named in `config`
    pub fn from_env(config: &CompletionConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(
                "{} is not set; documentation planning will use fallbacks",
                config.api_key_env
            );
        }
        Self::new(config, api_key)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CallError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(CallError::AuthenticationFailed(
                "no API key configured".to_string(),
            ));
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CallError::Transient(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(CallError::from_status(status.as_u16(), body.trim()));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| CallError::Rejected(format!("malformed completion response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| CallError::Rejected("completion response had no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, api_key: Option<&str>) -> ChatCompletionClient {
        let config = CompletionConfig {
            endpoint: format!("{}/v1", server.uri()),
            model: "test-model".to_string(),
            api_key_env: "UNUSED".to_string(),
        };
        ChatCompletionClient::new(&config, api_key.map(str::to_string))
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "https://react.dev/"}}]
            })))
            .mount(&server)
            .await;

        let reply = client(&server, Some("secret")).complete("hello").await.unwrap();
        assert_eq!(reply, "https://react.dev/");
    }

    #[tokio::test]
    async fn test_missing_key_is_authentication_failure() {
        let server = MockServer::start().await;
        let result = client(&server, None).complete("hello").await;
        assert!(matches!(result, Err(CallError::AuthenticationFailed(_))));
    }

    #[tokio::test]
    async fn test_status_and_payload_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let result = client(&server, Some("wrong")).complete("hello").await;
        assert!(matches!(result, Err(CallError::AuthenticationFailed(_))));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let result = client(&server, Some("secret")).complete("hello").await;
        assert!(matches!(result, Err(CallError::Rejected(_))));
    }
}
