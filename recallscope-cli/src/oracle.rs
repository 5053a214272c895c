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

//! Oracle client construction from command-line options

use anyhow::{bail, Result};
use clap::ValueEnum;
use recallscope_evals::{AnthropicClient, LLMClient, LLMError, OpenAIClient};
use std::sync::Arc;

/// LLM provider used as the analysis oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    #[value(name = "openai")]
    OpenAI,
    #[value(name = "anthropic")]
    Anthropic,
    /// Self-hosted model; requires a custom client
    #[value(name = "local")]
    Local,
}

impl Provider {
    /// Environment variable consulted when no key is passed on the command line
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Local => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

impl OracleConfig {
    /// Key from the command line, falling back to the provider's environment variable
    pub fn resolve_api_key(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        let present = |key: &String| !key.trim().is_empty();
        self.api_key
            .clone()
            .filter(present)
            .or_else(|| self.provider.api_key_env().and_then(env).filter(present))
    }

    fn require_api_key(&self, env: impl Fn(&str) -> Option<String>) -> Result<String, LLMError> {
        self.resolve_api_key(env).ok_or_else(|| {
            let source = self.provider.api_key_env().unwrap_or("--api-key");
            LLMError::MissingApiKey(source.to_string())
        })
    }

    /// Build the oracle client for this configuration
    pub fn build_client(&self, env: impl Fn(&str) -> Option<String>) -> Result<Arc<dyn LLMClient>> {
        let client: Arc<dyn LLMClient> = match self.provider {
            Provider::Local => bail!("local provider requires a custom LLM client"),
            Provider::OpenAI => {
                let mut client = OpenAIClient::new(self.require_api_key(env)?, self.model.clone());
                if let Some(url) = &self.base_url {
                    client = client.with_base_url(url.clone());
                }
                Arc::new(client)
            }
            Provider::Anthropic => {
                let mut client =
                    AnthropicClient::new(self.require_api_key(env)?, self.model.clone());
                if let Some(url) = &self.base_url {
                    client = client.with_base_url(url.clone());
                }
                Arc::new(client)
            }
        };
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: Provider, api_key: Option<&str>) -> OracleConfig {
        OracleConfig {
            provider,
            api_key: api_key.map(str::to_string),
            model: "gpt-4".to_string(),
            base_url: None,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_flag_takes_precedence_over_env() {
        let cfg = config(Provider::OpenAI, Some("sk-flag"));
        let key = cfg.resolve_api_key(|_| Some("sk-env".to_string()));
        assert_eq!(key.as_deref(), Some("sk-flag"));
    }

    #[test]
    fn test_env_fallback_per_provider() {
        let env = |name: &str| match name {
            "ANTHROPIC_API_KEY" => Some("ant-key".to_string()),
            _ => None,
        };
        assert_eq!(
            config(Provider::Anthropic, None).resolve_api_key(env).as_deref(),
            Some("ant-key")
        );
        assert!(config(Provider::OpenAI, None).resolve_api_key(env).is_none());
    }

    #[test]
    fn test_blank_key_is_missing() {
        let cfg = config(Provider::OpenAI, Some("  "));
        assert!(cfg.resolve_api_key(no_env).is_none());
        assert!(cfg.build_client(no_env).is_err());
    }

    #[test]
    fn test_blank_flag_falls_back_to_env() {
        let cfg = config(Provider::OpenAI, Some(""));
        let key =
            cfg.resolve_api_key(|name| (name == "OPENAI_API_KEY").then(|| "sk-env".to_string()));
        assert_eq!(key.as_deref(), Some("sk-env"));
        assert!(cfg.build_client(|_| Some("sk-env".to_string())).is_ok());
    }

    #[test]
    fn test_build_client_uses_model() {
        let mut cfg = config(Provider::Anthropic, Some("key"));
        cfg.model = "claude-3-haiku".to_string();
        cfg.base_url = Some("http://localhost:9999".to_string());

        let client = cfg.build_client(no_env).unwrap();
        assert_eq!(client.model_name(), "claude-3-haiku");
    }

    #[test]
    fn test_local_provider_is_rejected() {
        let err = config(Provider::Local, Some("key")).build_client(no_env).err().unwrap();
        assert!(err.to_string().contains("local"));
    }
}
