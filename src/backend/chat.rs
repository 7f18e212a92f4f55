//! OpenAI-compatible chat completions client
//!
//! Works against any provider exposing `POST {base_url}/chat/completions`
//! (Groq, OpenAI, Ollama, vLLM, ...).

use super::{BackendError, ChatMessage, ChatModel, ResponseContent};
use crate::config::LlmConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Chat model backed by an OpenAI-compatible HTTP API
pub struct OpenAiChatModel {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    /// Build a client from the `[llm]` configuration section
    ///
    /// The API key is read from the environment variable named by
    /// `api_key_env`; providers that need no key (local Ollama) may leave it unset.
    pub fn from_config(config: &LlmConfig) -> Result<Self, BackendError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Initialization(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ResponseContent, BackendError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        debug!(
            "Sending chat request ({} messages) to model {}",
            messages.len(),
            self.model
        );

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| {
                choice
                    .message
                    .content
                    .unwrap_or_else(|| ResponseContent::Text(String::new()))
            })
            .ok_or_else(|| BackendError::Decode("response contained no choices".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("What is X?"),
        ];
        let body = CompletionRequest {
            model: "llama-3.1-70b",
            messages: &messages,
            temperature: 0.1,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama-3.1-70b");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "What is X?");
    }

    #[test]
    fn test_segmented_completion_response() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": [{"type": "text", "text": "X is "}, {"type": "text", "text": "a letter."}]
                }
            }]
        }"#;

        let completion: CompletionResponse = serde_json::from_str(raw).unwrap();
        let content = completion.choices[0].message.content.as_ref().unwrap();
        assert_eq!(content.flatten(), "X is a letter.");
    }

    fn model_at(base_url: &str) -> OpenAiChatModel {
        let mut config = LlmConfig::default();
        config.base_url = base_url.to_string();
        config.api_key_env = "RAGFUSE_TEST_UNSET_KEY".to_string();
        config.timeout_secs = 5;
        OpenAiChatModel::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_invoke_sends_bearer_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "X is Y."}}]}"#)
            .create_async()
            .await;

        let mut model = model_at(&server.url());
        model.api_key = Some("sk-test".to_string());

        let content = model.invoke(&[ChatMessage::user("What is X?")]).await.unwrap();

        assert_eq!(content.flatten(), "X is Y.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invoke_without_key_omits_authorization() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", mockito::Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#)
            .create_async()
            .await;

        let model = model_at(&server.url());
        let content = model.invoke(&[ChatMessage::user("hi")]).await.unwrap();

        // A null content is an empty answer, not an error
        assert_eq!(content, ResponseContent::Text(String::new()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invoke_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let model = model_at(&server.url());
        let result = model.invoke(&[ChatMessage::user("hi")]).await;

        match result {
            Err(BackendError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_without_choices_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let model = model_at(&server.url());
        let result = model.invoke(&[ChatMessage::user("hi")]).await;

        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn test_from_config_trims_base_url() {
        let mut config = LlmConfig::default();
        config.base_url = "http://localhost:11434/v1/".to_string();
        config.api_key_env = "RAGFUSE_TEST_UNSET_KEY".to_string();

        let model = OpenAiChatModel::from_config(&config).unwrap();
        assert_eq!(model.base_url, "http://localhost:11434/v1");
        assert!(model.api_key.is_none());
        assert_eq!(model.model_name(), config.model);
    }
}
