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

//! Prompt templates for oracle-mode extraction and analysis

use recallscope_memory::{DialogueTurn, HallucinationType, MemoryCategory, MemoryItem};

const ANALYSIS_TEMPLATE: &str = r#"You are an expert in analyzing how an LLM uses conversational memory. Analyze the memory usage of the LLM in the dialogue below.

## Rules
1. Judge ONLY from the given history. Do not assume any information that was not provided.
2. Strictly distinguish between:
   - prior information the response explicitly used
   - key information the response should have used but omitted
   - content generated from context that does not exist (hallucination)

## Tracked memories
{memories}

## History
{history}

## Current turn
**Turn {turn_id}**
User input: {user_input}
LLM response: {llm_response}

## Task
Respond in JSON format:

{
  "used_memories": [
    {
      "memory_id": 0,
      "content": "the prior information that was referenced",
      "reference_text": "verbatim span of the LLM response that references it",
      "relevance": 0.9
    }
  ],
  "missed_memories": [
    {
      "memory_id": 1,
      "content": "prior information that should have been referenced",
      "importance": 0.8,
      "reason": "why this information matters"
    }
  ],
  "hallucinations": [
    {
      "type": "fabricated_memory|forgotten_context|wrong_reference",
      "description": "what went wrong",
      "evidence": "span of the LLM response showing it",
      "severity": 0.7,
      "suggested_correction": "how to fix it"
    }
  ]
}

## Hallucination types
{types}

Make sure that:
1. every used memory is backed by the history
2. every missed memory is genuinely key and relevant
3. every hallucination has explicit supporting evidence"#;

const EXTRACTION_TEMPLATE: &str = r#"Extract the key information from this dialogue turn that should be remembered.

**Turn {turn_id}**
User input: {user_input}
LLM response: {llm_response}

Respond in JSON format:

{
  "memories": [
    {
      "content": "memory content",
      "importance": 0.8,
      "category": "fact|preference|context|instruction"
    }
  ]
}

## Categories
{categories}

Only extract information that is important and likely to be used later in the dialogue."#;

/// Builds oracle prompts
pub struct PromptBuilder;

impl PromptBuilder {
    /// Analysis prompt for one turn, embedding the full history so far
    pub fn build_analysis_prompt(
        turn_id: u32,
        user_input: &str,
        llm_response: &str,
        history: &[DialogueTurn],
        memories: &[MemoryItem],
    ) -> String {
        let history_text = if history.is_empty() {
            "(no previous turns)".to_string()
        } else {
            history
                .iter()
                .enumerate()
                .map(|(i, turn)| format!("[Turn {}] {}: {}", i + 1, turn.role, turn.content))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let memories_text = if memories.is_empty() {
            "(none)".to_string()
        } else {
            memories
                .iter()
                .map(|m| {
                    format!(
                        "#{} [{}] {} (importance {:.2})",
                        m.id, m.category, m.content, m.importance
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let types_text = HallucinationType::ALL
            .iter()
            .map(|t| format!("- **{}**: {}", t, t.description()))
            .collect::<Vec<_>>()
            .join("\n");

        fill_template(
            ANALYSIS_TEMPLATE,
            &[
                ("memories", memories_text.as_str()),
                ("history", history_text.as_str()),
                ("types", types_text.as_str()),
                ("turn_id", turn_id.to_string().as_str()),
                ("user_input", user_input),
                ("llm_response", llm_response),
            ],
        )
    }

    /// Memory extraction prompt for one turn
    pub fn build_memory_extraction_prompt(
        turn_id: u32,
        user_input: &str,
        llm_response: &str,
    ) -> String {
        let categories_text = MemoryCategory::ALL
            .iter()
            .map(|c| format!("- **{}**: {}", c, category_hint(*c)))
            .collect::<Vec<_>>()
            .join("\n");

        fill_template(
            EXTRACTION_TEMPLATE,
            &[
                ("categories", categories_text.as_str()),
                ("turn_id", turn_id.to_string().as_str()),
                ("user_input", user_input),
                ("llm_response", llm_response),
            ],
        )
    }
}

/// Substitute `{name}` placeholders in one left-to-right pass.
///
/// Inserted values are never rescanned, and braces that do not form a known
/// placeholder (such as the JSON examples) are copied through unchanged.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let hit = values.iter().find_map(|(name, value)| {
            let after = tail[1..].strip_prefix(*name)?.strip_prefix('}')?;
            Some((*value, after))
        });
        match hit {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn category_hint(category: MemoryCategory) -> &'static str {
    match category {
        MemoryCategory::Fact => "factual information (names, dates, places)",
        MemoryCategory::Preference => "user preferences (favourite colours, styles)",
        MemoryCategory::Context => "situational context (current task, state)",
        MemoryCategory::Instruction => "instructions or requirements",
    }
}
