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

//! # RecallScope Evaluation Engine
//!
//! Determines whether an assistant correctly used, missed, or fabricated
//! references to memory established earlier in a dialogue.
//!
//! ## Features
//!
//! - **Memory extraction**: pattern rules or an LLM oracle derive memories per turn
//! - **Turn analysis**: used and missed memories with verbatim evidence spans
//! - **Hallucination detection**: typed, severity-scored findings from pluggable checks
//! - **Two modes**: deterministic heuristics, or LLM-as-judge through [`llm_client::LLMClient`]
//!
//! No failure inside a run is fatal. Oracle transport errors, malformed
//! payloads, unknown enumerants and out-of-range ids all degrade to empty or
//! partial results for the affected turn.
//!
//! ## Example
//!
//! ```rust
//! use recallscope_evals::{AnalyzerConfig, DialogueAnalyzer};
//! use recallscope_memory::Dialogue;
//!
//! let mut dialogue = Dialogue::default();
//! dialogue.push_exchange("我叫小明，我来自北京", "你好，小明！");
//! dialogue.push_exchange("还记得哪个城市是我的家乡吗？", "你来自上海。");
//!
//! let state = DialogueAnalyzer::heuristic(AnalyzerConfig::default()).analyze_dialogue(&dialogue);
//! assert_eq!(state.turn_count(), 2);
//! assert_eq!(state.memory_count(), 2);
//! assert_eq!(state.turns()[1].hallucinations[0].severity, 0.9);
//! ```

use thiserror::Error;

pub mod analyzer;
pub mod config;
pub mod extraction;
pub mod hallucination;
pub mod keywords;
pub mod llm_client;
pub mod orchestrator;
pub mod prompts;

pub use analyzer::{
    ContradictionRule, HeuristicTurnAnalyzer, OracleTurnAnalyzer, TurnAnalyzer, TurnContext,
};
pub use config::AnalyzerConfig;
pub use extraction::{
    ExtractionRule, HeuristicExtractor, MemoryCandidate, MemoryExtractor, OracleExtractor,
    RuleAction,
};
pub use hallucination::{
    DetectionInput, ForgottenContextCheck, HallucinationCheck, HallucinationDetector,
};
pub use keywords::{extract_keywords, matchable_keywords};
pub use llm_client::{AnthropicClient, LLMClient, LLMError, LLMResponse, OpenAIClient};
pub use orchestrator::DialogueAnalyzer;
pub use prompts::PromptBuilder;

/// Errors that can occur during oracle-mode evaluation
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("LLM client error: {0}")]
    LLMClientError(#[from] LLMError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Send a prompt and decode the reply as a JSON object
pub(crate) fn request_json(
    client: &dyn LLMClient,
    prompt: &str,
) -> Result<serde_json::Value, EvalError> {
    let response = client.evaluate(prompt)?;
    let json = response.as_json()?;
    if !json.is_object() {
        return Err(EvalError::InvalidResponse(format!(
            "expected a JSON object from {}",
            client.model_name()
        )));
    }
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticClient(&'static str);

    impl LLMClient for StaticClient {
        fn evaluate(&self, _prompt: &str) -> Result<LLMResponse, LLMError> {
            Ok(LLMResponse::text(self.0, "static"))
        }

        fn model_name(&self) -> &str {
            "static"
        }
    }

    #[test]
    fn test_request_json_requires_object() {
        assert!(request_json(&StaticClient(r#"{"a": 1}"#), "p").is_ok());
        assert!(matches!(
            request_json(&StaticClient("[1, 2]"), "p"),
            Err(EvalError::InvalidResponse(_))
        ));
        assert!(matches!(
            request_json(&StaticClient("nope"), "p"),
            Err(EvalError::Json(_))
        ));
    }
}
