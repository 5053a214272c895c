// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! LLM client abstraction for oracle-mode extraction and analysis
//!
//! Calls are synchronous request/response. The analyzer never retries and
//! never sets a timeout of its own; a failed call degrades to an empty result
//! at the call site.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trait for LLM clients used as an analysis oracle
pub trait LLMClient: Send + Sync {
    /// Send a prompt and get the raw (expected JSON) response
    fn evaluate(&self, prompt: &str) -> Result<LLMResponse, LLMError>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Response from LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

impl LLMResponse {
    /// Response with no usage information, handy for scripted oracles
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
            model: model.into(),
        }
    }

    /// Parse response as JSON
    pub fn as_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Errors from LLM clients
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, LLMError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LLMError::RateLimitExceeded);
    }
    let error_text = response.text()?;
    Err(LLMError::ApiError(format!("{}: {}", status, error_text)))
}

/// OpenAI chat completions client
pub struct OpenAIClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl LLMClient for OpenAIClient {
    fn evaluate(&self, prompt: &str) -> Result<LLMResponse, LLMError> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": 0.3
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()?;

        let response_data: serde_json::Value = check_status(response)?.json()?;

        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        let usage_data = &response_data["usage"];
        let usage = TokenUsage {
            prompt_tokens: usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage_data["total_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(LLMResponse {
            content,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Anthropic Claude messages client
pub struct AnthropicClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.anthropic.com/v1".to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl LLMClient for AnthropicClient {
    fn evaluate(&self, prompt: &str) -> Result<LLMResponse, LLMError> {
        let request = serde_json::json!({
            "model": self.model,
            "max_tokens": 4096,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()?;

        let response_data: serde_json::Value = check_status(response)?.json()?;

        let content = response_data["content"][0]["text"]
            .as_str()
            .ok_or(LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        let usage_data = &response_data["usage"];
        let input_tokens = usage_data["input_tokens"].as_u64().unwrap_or(0);
        let output_tokens = usage_data["output_tokens"].as_u64().unwrap_or(0);
        let usage = TokenUsage {
            prompt_tokens: input_tokens as u32,
            completion_tokens: output_tokens as u32,
            total_tokens: (input_tokens + output_tokens) as u32,
        };

        Ok(LLMResponse {
            content,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_client_parses_completion() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "choices": [{"message": {"content": "{\"memories\": []}"}}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
                }"#,
            )
            .create();

        let client = OpenAIClient::new("test-key".to_string(), "gpt-4".to_string())
            .with_base_url(server.url());
        let response = client.evaluate("extract").unwrap();

        mock.assert();
        assert_eq!(response.content, r#"{"memories": []}"#);
        assert_eq!(response.usage.total_tokens, 16);
        assert_eq!(response.model, "gpt-4");
        assert!(response.as_json().unwrap()["memories"].is_array());
    }

    #[test]
    fn test_openai_rate_limit() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create();

        let client = OpenAIClient::new("k".to_string(), "gpt-4".to_string())
            .with_base_url(server.url());
        assert!(matches!(
            client.evaluate("x"),
            Err(LLMError::RateLimitExceeded)
        ));
    }

    #[test]
    fn test_anthropic_client_parses_message() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "secret")
            .match_header("anthropic-version", "2023-06-01")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "content": [{"type": "text", "text": "{}"}],
                    "usage": {"input_tokens": 30, "output_tokens": 2}
                }"#,
            )
            .create();

        let client = AnthropicClient::new(
            "secret".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
        )
        .with_base_url(server.url());
        let response = client.evaluate("analyze").unwrap();

        mock.assert();
        assert_eq!(response.content, "{}");
        assert_eq!(response.usage.total_tokens, 32);
    }

    #[test]
    fn test_api_error_carries_body() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/messages")
            .with_status(401)
            .with_body("invalid key")
            .create();

        let client = AnthropicClient::new("bad".to_string(), "m".to_string())
            .with_base_url(server.url());
        match client.evaluate("x") {
            Err(LLMError::ApiError(message)) => assert!(message.contains("invalid key")),
            other => panic!("expected ApiError, got {:?}", other.map(|r| r.content)),
        }
    }
}
