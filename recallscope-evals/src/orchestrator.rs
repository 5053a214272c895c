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

//! Dialogue orchestration
//!
//! Walks a transcript two entries at a time. Each (user, assistant) pair is
//! run through memory extraction and then turn analysis against the memory
//! state built by every earlier pair, so pairs are processed strictly in order.

use crate::analyzer::{HeuristicTurnAnalyzer, OracleTurnAnalyzer, TurnAnalyzer, TurnContext};
use crate::config::AnalyzerConfig;
use crate::extraction::{HeuristicExtractor, MemoryExtractor, OracleExtractor};
use crate::llm_client::LLMClient;
use recallscope_memory::{Dialogue, DialogueTurn, MemoryState, Role};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs memory extraction and turn analysis over whole dialogues
pub struct DialogueAnalyzer {
    extractor: Box<dyn MemoryExtractor>,
    turn_analyzer: Box<dyn TurnAnalyzer>,
}

impl DialogueAnalyzer {
    /// Analyzer with a custom extraction/analysis pair
    pub fn new(extractor: Box<dyn MemoryExtractor>, turn_analyzer: Box<dyn TurnAnalyzer>) -> Self {
        Self {
            extractor,
            turn_analyzer,
        }
    }

    /// Deterministic, rule-based analyzer
    pub fn heuristic(config: AnalyzerConfig) -> Self {
        Self::new(
            Box::new(HeuristicExtractor::new()),
            Box::new(HeuristicTurnAnalyzer::new(config)),
        )
    }

    /// Analyzer that delegates extraction and analysis to an LLM oracle
    pub fn with_oracle(llm_client: Arc<dyn LLMClient>, config: AnalyzerConfig) -> Self {
        Self::new(
            Box::new(OracleExtractor::new(llm_client.clone())),
            Box::new(OracleTurnAnalyzer::new(llm_client, config)),
        )
    }

    /// Analyze a full dialogue into a fresh memory state.
    ///
    /// Turn ids are derived from the pair's position in the transcript
    /// (`offset / 2 + 1`), not from a running count of analyzed pairs. A pair
    /// skipped for its roles therefore leaves a gap in the recorded ids.
    pub fn analyze_dialogue(&self, dialogue: &Dialogue) -> MemoryState {
        let mut state = MemoryState::new();
        let mut history: Vec<DialogueTurn> = Vec::new();

        for (index, pair) in dialogue.turns.chunks_exact(2).enumerate() {
            let (user, assistant) = (&pair[0], &pair[1]);
            if user.role != Role::User || assistant.role != Role::Assistant {
                debug!(
                    offset = index * 2,
                    first = %user.role,
                    second = %assistant.role,
                    "Skipping pair that is not user then assistant"
                );
                continue;
            }

            let Ok(turn_id) = u32::try_from(index + 1) else {
                warn!(offset = index * 2, "Turn id out of range, stopping analysis");
                break;
            };
            self.process_turn(&mut state, &history, turn_id, &user.content, &assistant.content);

            history.push(user.clone());
            history.push(assistant.clone());
        }

        info!(
            turns = state.turn_count(),
            memories = state.memory_count(),
            hallucinations = state.total_hallucinations(),
            "Dialogue analysis complete"
        );
        state
    }

    /// Extract, analyze and record one turn
    pub fn process_turn(
        &self,
        state: &mut MemoryState,
        history: &[DialogueTurn],
        turn_id: u32,
        user_input: &str,
        llm_response: &str,
    ) {
        for candidate in self.extractor.extract(turn_id, user_input, llm_response) {
            state.add_memory(turn_id, candidate.content, candidate.importance, candidate.category);
        }

        let ctx = TurnContext {
            turn_id,
            user_input,
            llm_response,
            history,
        };
        let analysis = self.turn_analyzer.analyze(&ctx, state);

        for &id in &analysis.used_memories {
            state.mark_referenced(id, turn_id);
        }
        state.record_turn(analysis);
    }
}

impl Default for DialogueAnalyzer {
    fn default() -> Self {
        Self::heuristic(AnalyzerConfig::default())
    }
}
