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

//! Memory state of an analysis run
//!
//! `MemoryState` is an append-only store: memories are never removed or
//! renumbered, so a memory id is always its index in [`MemoryState::memories`].
//! The only mutation allowed on a stored item is growing `referenced_by`.

use crate::analysis::TurnAnalysis;
use crate::memory::{MemoryCategory, MemoryId, MemoryItem};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Memories and per-turn analyses accumulated over one dialogue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    memories: Vec<MemoryItem>,
    turns: Vec<TurnAnalysis>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a memory and return its id. Duplicated content is accepted.
    pub fn add_memory(
        &mut self,
        turn_id: u32,
        content: impl Into<String>,
        importance: f64,
        category: MemoryCategory,
    ) -> MemoryId {
        let id = self.memories.len();
        let item = MemoryItem::new(id, turn_id, content, importance, category);
        debug!(memory_id = id, turn_id, category = %item.category, "Stored memory");
        self.memories.push(item);
        id
    }

    /// Look up a memory. Out-of-range ids are absent, not errors.
    pub fn get_by_id(&self, id: MemoryId) -> Option<&MemoryItem> {
        self.memories.get(id)
    }

    /// Memories derived from a given turn, in storage order
    pub fn get_by_turn(&self, turn_id: u32) -> Vec<&MemoryItem> {
        self.memories
            .iter()
            .filter(|m| m.turn_id == turn_id)
            .collect()
    }

    /// Note that `turn_id` referenced memory `id`. Returns false if absent.
    pub fn mark_referenced(&mut self, id: MemoryId, turn_id: u32) -> bool {
        match self.memories.get_mut(id) {
            Some(item) => {
                item.referenced_by.insert(turn_id);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: MemoryId) -> bool {
        id < self.memories.len()
    }

    /// Append the analysis of the next processed turn
    pub fn record_turn(&mut self, analysis: TurnAnalysis) {
        self.turns.push(analysis);
    }

    pub fn memories(&self) -> &[MemoryItem] {
        &self.memories
    }

    pub fn turns(&self) -> &[TurnAnalysis] {
        &self.turns
    }

    /// Memory contents indexed by memory id
    pub fn memory_contents(&self) -> Vec<&str> {
        self.memories.iter().map(|m| m.content.as_str()).collect()
    }

    pub fn memory_count(&self) -> usize {
        self.memories.len()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn total_hallucinations(&self) -> usize {
        self.turns.iter().map(|t| t.hallucinations.len()).sum()
    }
}
