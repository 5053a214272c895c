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

//! Memory extraction
//!
//! Derives memory candidates from one turn. Two implementations:
//! 1. **Heuristic** (deterministic): an ordered list of pattern rules applied
//!    to the user input only
//! 2. **Oracle** (LLM-as-judge): the model returns a `memories` array; any
//!    failure degrades to no memories for the turn

use crate::llm_client::LLMClient;
use crate::prompts::PromptBuilder;
use crate::{request_json, EvalError};
use recallscope_memory::{clamp_unit, MemoryCategory};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// A memory derived from a turn, before it is assigned an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryCandidate {
    pub content: String,
    pub importance: f64,
    pub category: MemoryCategory,
}

/// Derives memory candidates from one turn
pub trait MemoryExtractor: Send + Sync {
    fn extract(&self, turn_id: u32, user_input: &str, llm_response: &str) -> Vec<MemoryCandidate>;
}

/// How a rule turns a match into memory content
#[derive(Debug, Clone)]
pub enum RuleAction {
    /// First pattern that matches wins; its first capture fills `{}` in the template
    Capture {
        patterns: Vec<Regex>,
        template: String,
    },
    /// Input must contain a cue word and match `object`; content is the input verbatim
    Verbatim { cues: Vec<String>, object: Regex },
}

/// One declarative extraction rule. Each rule yields at most one memory.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub name: String,
    pub action: RuleAction,
    pub importance: f64,
    pub category: MemoryCategory,
}

impl ExtractionRule {
    /// Rule that captures a value with the first matching pattern
    pub fn capture(
        name: &str,
        patterns: &[&str],
        template: &str,
        importance: f64,
        category: MemoryCategory,
    ) -> Self {
        Self {
            name: name.to_string(),
            action: RuleAction::Capture {
                patterns: patterns
                    .iter()
                    .map(|p| Regex::new(p).expect("Invalid regex pattern"))
                    .collect(),
                template: template.to_string(),
            },
            importance,
            category,
        }
    }

    /// Rule that stores the whole input when a cue word and object pattern both hit
    pub fn verbatim(
        name: &str,
        cues: &[&str],
        object: &str,
        importance: f64,
        category: MemoryCategory,
    ) -> Self {
        Self {
            name: name.to_string(),
            action: RuleAction::Verbatim {
                cues: cues.iter().map(|c| c.to_string()).collect(),
                object: Regex::new(object).expect("Invalid regex pattern"),
            },
            importance,
            category,
        }
    }

    /// User discloses their name
    pub fn name_disclosure() -> Self {
        Self::capture(
            "name",
            &[
                r"我叫([\x{4e00}-\x{9fa5}]+)",
                r"我是([\x{4e00}-\x{9fa5}]+)",
                r"我的名字是([\x{4e00}-\x{9fa5}]+)",
            ],
            "用户姓名: {}",
            0.9,
            MemoryCategory::Fact,
        )
    }

    /// User discloses where they are from
    pub fn origin_disclosure() -> Self {
        Self::capture(
            "origin",
            &[
                r"我来自([\x{4e00}-\x{9fa5}]+)",
                r"我在([\x{4e00}-\x{9fa5}]+)",
                r"我是([\x{4e00}-\x{9fa5}]+)人",
            ],
            "用户来自: {}",
            0.9,
            MemoryCategory::Fact,
        )
    }

    /// User discloses a liking or hobby
    pub fn preference_disclosure() -> Self {
        Self::verbatim(
            "preference",
            &["喜欢", "爱好", "兴趣"],
            r"喜欢([^，。！？]+)",
            0.7,
            MemoryCategory::Preference,
        )
    }

    pub fn apply(&self, user_input: &str) -> Option<MemoryCandidate> {
        let content = match &self.action {
            RuleAction::Capture { patterns, template } => patterns.iter().find_map(|pattern| {
                let value = pattern.captures(user_input)?.get(1)?.as_str();
                Some(template.replace("{}", value))
            })?,
            RuleAction::Verbatim { cues, object } => {
                let has_cue = cues.iter().any(|cue| user_input.contains(cue.as_str()));
                if !has_cue || !object.is_match(user_input) {
                    return None;
                }
                user_input.to_string()
            }
        };

        Some(MemoryCandidate {
            content,
            importance: self.importance,
            category: self.category,
        })
    }
}

/// Rule-based extractor used when no oracle is configured
pub struct HeuristicExtractor {
    rules: Vec<ExtractionRule>,
}

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self::with_rules(Self::default_rules())
    }

    pub fn with_rules(rules: Vec<ExtractionRule>) -> Self {
        Self { rules }
    }

    /// Name, origin and preference rules, in that order
    pub fn default_rules() -> Vec<ExtractionRule> {
        vec![
            ExtractionRule::name_disclosure(),
            ExtractionRule::origin_disclosure(),
            ExtractionRule::preference_disclosure(),
        ]
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryExtractor for HeuristicExtractor {
    fn extract(&self, turn_id: u32, user_input: &str, _llm_response: &str) -> Vec<MemoryCandidate> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let candidate = rule.apply(user_input)?;
                debug!(turn_id, rule = %rule.name, content = %candidate.content, "Rule matched");
                Some(candidate)
            })
            .collect()
    }
}

/// Extractor that delegates to an LLM oracle
pub struct OracleExtractor {
    llm_client: Arc<dyn LLMClient>,
}

impl OracleExtractor {
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self { llm_client }
    }

    fn try_extract(
        &self,
        turn_id: u32,
        user_input: &str,
        llm_response: &str,
    ) -> Result<Vec<MemoryCandidate>, EvalError> {
        let prompt =
            PromptBuilder::build_memory_extraction_prompt(turn_id, user_input, llm_response);
        let json = request_json(self.llm_client.as_ref(), &prompt)?;

        let items = json["memories"]
            .as_array()
            .ok_or_else(|| EvalError::InvalidResponse("Missing memories array".to_string()))?;

        Ok(items
            .iter()
            .filter_map(|item| parse_candidate(turn_id, item))
            .collect())
    }
}

impl MemoryExtractor for OracleExtractor {
    fn extract(&self, turn_id: u32, user_input: &str, llm_response: &str) -> Vec<MemoryCandidate> {
        match self.try_extract(turn_id, user_input, llm_response) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    turn_id,
                    error = %e,
                    "Memory extraction failed, no memories recorded for turn"
                );
                Vec::new()
            }
        }
    }
}

fn parse_candidate(turn_id: u32, item: &serde_json::Value) -> Option<MemoryCandidate> {
    let content = item["content"].as_str()?.trim();
    if content.is_empty() {
        return None;
    }

    let category = match item["category"].as_str().unwrap_or("").parse::<MemoryCategory>() {
        Ok(category) => category,
        Err(e) => {
            warn!(turn_id, error = %e, "Dropping extracted memory");
            return None;
        }
    };

    Some(MemoryCandidate {
        content: content.to_string(),
        importance: clamp_unit(item["importance"].as_f64().unwrap_or(0.5)),
        category,
    })
}
