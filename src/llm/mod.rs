//! Client for the external language capability.
//!
//! One-shot text completion against the Ollama chat API: bounded
//! timeout, single attempt, no streaming, no multi-turn state. Callers
//! treat every [`LlmError`] as a signal to fall back to their rule-based
//! path; these errors never propagate to the user.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Settings for the language client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub ollama_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "llama3.2:latest".to_string(),
            temperature: 0.1,
            timeout_seconds: 30,
        }
    }
}

/// A failed or degraded call to the language capability.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("cannot connect to Ollama at {url}")]
    Connect { url: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("Ollama API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// HTTP client for one-shot completions.
pub struct LanguageClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LanguageClient {
    pub fn new(config: LlmConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, http }
    }

    /// Send a system prompt and one user message, return the reply text.
    ///
    /// A single attempt: no retry is performed, keeping latency bounded
    /// and predictable. Timeouts and connection failures map to their
    /// own variants so callers can log the degradation precisely.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.config.ollama_url);

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending completion request to {}", url);

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        seconds: self.config.timeout_seconds,
                    }
                } else if e.is_connect() {
                    LlmError::Connect {
                        url: self.config.ollama_url.clone(),
                    }
                } else {
                    LlmError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        Ok(chat_response.message.content)
    }
}

/// Extract the first JSON object embedded in free-form model output.
///
/// Models often wrap JSON in prose or code fences; take the outermost
/// `{...}` span and leave validation to the caller.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "llama3.2:latest");
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(
            extract_json_object("Sure! ```json\n{\"intent\": \"trend\"}\n```"),
            Some("{\"intent\": \"trend\"}")
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_chat_request_serializes() {
        let request = ChatRequest {
            model: "llama3.2:latest",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            stream: false,
            options: ChatOptions { temperature: 0.1 },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"llama3.2:latest\""));
        assert!(json.contains("\"stream\":false"));
    }
}
