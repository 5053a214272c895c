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

//! Per-turn analysis records

use crate::hallucination::{Hallucination, HallucinationType};
use crate::memory::MemoryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of analyzing one user/assistant turn pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnAnalysis {
    /// 1-based turn number
    pub turn_id: u32,
    pub user_input: String,
    pub llm_response: String,
    /// Memories the response referenced, in discovery order
    pub used_memories: Vec<MemoryId>,
    /// Relevant memories the response left out
    pub missed_memories: Vec<MemoryId>,
    /// Evidence span of the response for each used memory
    pub memory_references: BTreeMap<MemoryId, String>,
    pub hallucinations: Vec<Hallucination>,
}

impl TurnAnalysis {
    /// Empty analysis for a turn: nothing used, missed or flagged
    pub fn new(
        turn_id: u32,
        user_input: impl Into<String>,
        llm_response: impl Into<String>,
    ) -> Self {
        Self {
            turn_id,
            user_input: user_input.into(),
            llm_response: llm_response.into(),
            used_memories: Vec::new(),
            missed_memories: Vec::new(),
            memory_references: BTreeMap::new(),
            hallucinations: Vec::new(),
        }
    }

    /// Record a used memory. Returns false if it was already recorded.
    pub fn mark_used(&mut self, id: MemoryId, evidence: Option<String>) -> bool {
        if self.used_memories.contains(&id) {
            return false;
        }
        self.used_memories.push(id);
        if let Some(evidence) = evidence {
            self.memory_references.insert(id, evidence);
        }
        true
    }

    /// Record a missed memory. Used or already-missed ids are rejected.
    pub fn mark_missed(&mut self, id: MemoryId) -> bool {
        if self.used_memories.contains(&id) || self.missed_memories.contains(&id) {
            return false;
        }
        self.missed_memories.push(id);
        true
    }

    pub fn is_used(&self, id: MemoryId) -> bool {
        self.used_memories.contains(&id)
    }

    /// Whether nothing at all was found for this turn
    pub fn is_empty(&self) -> bool {
        self.used_memories.is_empty()
            && self.missed_memories.is_empty()
            && self.hallucinations.is_empty()
    }

    /// Number of findings of the given type
    pub fn count_of(&self, kind: HallucinationType) -> usize {
        self.hallucinations.iter().filter(|h| h.kind == kind).count()
    }
}
