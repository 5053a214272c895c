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

//! Markdown timeline report
//!
//! Layout:
//! 1. Header with generation time
//! 2. Executive summary and memory overview
//! 3. One section per analyzed turn
//! 4. Usage and hallucination statistics

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use recallscope_memory::{HallucinationType, MemoryId, MemoryItem, MemoryState, TurnAnalysis};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

const EVIDENCE_PREVIEW_CHARS: usize = 100;
const CONTENT_PREVIEW_CHARS: usize = 50;
const TOP_USED_MEMORIES: usize = 10;

/// Renders a [`MemoryState`] as a Markdown report
pub struct ReportGenerator<'a> {
    state: &'a MemoryState,
    generated_at: DateTime<Local>,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(state: &'a MemoryState) -> Self {
        Self {
            state,
            generated_at: Local::now(),
        }
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Local>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn generate_markdown_report(&self) -> String {
        let mut out = String::new();
        self.write_header(&mut out);
        self.write_summary(&mut out);
        self.write_timeline(&mut out);
        self.write_statistics(&mut out);
        out
    }

    pub fn save_report(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.generate_markdown_report())
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }

    fn write_header(&self, out: &mut String) {
        let _ = writeln!(out, "# LLM Memory Analysis Report\n");
        let _ = writeln!(
            out,
            "**Generated**: {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        out.push_str("---\n\n");
    }

    fn write_summary(&self, out: &mut String) {
        out.push_str("## 📊 Executive Summary\n\n");
        let _ = writeln!(out, "- **Turns analyzed**: {}", self.state.turn_count());
        let _ = writeln!(out, "- **Memories**: {}", self.state.memory_count());
        let _ = writeln!(out, "- **Hallucinations**: {}\n", self.state.total_hallucinations());

        if self.state.memory_count() > 0 {
            out.push_str("### Memory Overview\n\n");
            for memory in self.state.memories() {
                let _ = writeln!(
                    out,
                    "{}. {} **[{}]** {} (importance: {:.2})",
                    memory.id,
                    importance_marker(memory.importance),
                    memory.category,
                    memory.content,
                    memory.importance
                );
            }
            out.push('\n');
        }
        out.push_str("---\n\n");
    }

    fn write_timeline(&self, out: &mut String) {
        out.push_str("## ⏱️ Timeline\n\n");
        for turn in self.state.turns() {
            self.write_turn(out, turn);
        }
    }

    fn write_turn(&self, out: &mut String, turn: &TurnAnalysis) {
        let _ = writeln!(out, "### Turn {}\n", turn.turn_id);
        let _ = writeln!(out, "**👤 User:**\n> {}\n", turn.user_input);
        let _ = writeln!(out, "**🤖 Assistant:**\n> {}\n", turn.llm_response);

        if turn.used_memories.is_empty() {
            out.push_str("#### ⚠️ No prior information used\n\n");
        } else {
            out.push_str("#### ✅ Used memories\n\n");
            for memory in self.resolve(&turn.used_memories) {
                let _ = writeln!(
                    out,
                    "- **Memory #{}** [{}]: {}",
                    memory.id, memory.category, memory.content
                );
                if let Some(evidence) = turn.memory_references.get(&memory.id) {
                    let _ = writeln!(
                        out,
                        "  - Evidence: `{}`",
                        preview(evidence, EVIDENCE_PREVIEW_CHARS)
                    );
                }
            }
            out.push('\n');
        }

        if !turn.missed_memories.is_empty() {
            out.push_str("#### ❌ Missed memories\n\n");
            for memory in self.resolve(&turn.missed_memories) {
                let _ = writeln!(
                    out,
                    "- {} **Memory #{}** [{}]: {}",
                    importance_marker(memory.importance),
                    memory.id,
                    memory.category,
                    memory.content
                );
                let _ = writeln!(out, "  - Importance: {:.2}", memory.importance);
            }
            out.push('\n');
        }

        if !turn.hallucinations.is_empty() {
            out.push_str("#### 🚨 Hallucinations\n\n");
            for finding in &turn.hallucinations {
                let _ = writeln!(out, "- {} **{}**", type_marker(finding.kind), finding.kind);
                let _ = writeln!(out, "  - Description: {}", finding.description);
                let _ = writeln!(out, "  - Evidence: `{}`", finding.evidence);
                let _ = writeln!(out, "  - Severity: {:.2}", finding.severity);
                if let Some(correction) = &finding.suggested_correction {
                    let _ = writeln!(out, "  - Suggested correction: {}", correction);
                }
            }
            out.push('\n');
        }

        out.push_str("---\n\n");
    }

    fn write_statistics(&self, out: &mut String) {
        out.push_str("## 📈 Statistics\n\n");

        let usage = self.usage_frequency();
        if !usage.is_empty() {
            out.push_str("### Memory usage frequency\n\n");
            for (id, count) in usage.into_iter().take(TOP_USED_MEMORIES) {
                if let Some(memory) = self.state.get_by_id(id) {
                    let _ = writeln!(
                        out,
                        "- Memory #{}: {} time(s) - {}",
                        id,
                        count,
                        preview(&memory.content, CONTENT_PREVIEW_CHARS)
                    );
                }
            }
            out.push('\n');
        }

        if self.state.total_hallucinations() > 0 {
            out.push_str("### Hallucination types\n\n");
            for kind in HallucinationType::ALL {
                let count: usize = self.state.turns().iter().map(|t| t.count_of(kind)).sum();
                if count > 0 {
                    let _ = writeln!(out, "- {}: {}", kind, count);
                }
            }
            out.push('\n');

            out.push_str("### Hallucinations per turn\n\n");
            for turn in self.state.turns() {
                let _ = writeln!(out, "- Turn {}: {}", turn.turn_id, turn.hallucinations.len());
            }
            out.push('\n');
        }
    }

    fn resolve(&self, ids: &[MemoryId]) -> Vec<&'a MemoryItem> {
        let state: &'a MemoryState = self.state;
        ids.iter().filter_map(|&id| state.get_by_id(id)).collect()
    }

    /// Memory ids by descending use count, ties broken by id
    fn usage_frequency(&self) -> Vec<(MemoryId, usize)> {
        let mut counts: BTreeMap<MemoryId, usize> = BTreeMap::new();
        for turn in self.state.turns() {
            for &id in &turn.used_memories {
                *counts.entry(id).or_default() += 1;
            }
        }
        let mut usage: Vec<(MemoryId, usize)> = counts.into_iter().collect();
        usage.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        usage
    }
}

fn importance_marker(importance: f64) -> &'static str {
    if importance > 0.8 {
        "🔴"
    } else if importance > 0.5 {
        "🟡"
    } else {
        "🟢"
    }
}

fn type_marker(kind: HallucinationType) -> &'static str {
    match kind {
        HallucinationType::FabricatedMemory => "🔴",
        HallucinationType::ForgottenContext => "🟡",
        HallucinationType::WrongReference => "🟠",
    }
}

/// First `max_chars` characters, with an ellipsis when cut
fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
