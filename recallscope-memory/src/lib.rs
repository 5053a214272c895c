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

//! RecallScope Memory Model
//!
//! Data model for auditing how a conversational assistant uses memory:
//! - **Memory items**: facts, preferences, context and instructions extracted
//!   from earlier turns, tagged with the turn that produced them
//! - **Turn analyses**: which memories a response used or missed, with evidence
//! - **Hallucinations**: typed, severity-scored discrepancies
//! - **Memory state**: the append-only aggregate built over one dialogue
//!
//! ```text
//! Dialogue ──► (extract) ──► MemoryState.memories ──► (analyze) ──► MemoryState.turns
//! ```
//!
//! # Example
//!
//! ```rust
//! use recallscope_memory::{MemoryCategory, MemoryState};
//!
//! let mut state = MemoryState::new();
//! let id = state.add_memory(1, "用户姓名: 小明", 0.9, MemoryCategory::Fact);
//! assert_eq!(state.get_by_id(id).unwrap().turn_id, 1);
//! assert!(state.get_by_id(id + 1).is_none());
//! ```

pub mod analysis;
pub mod dialogue;
pub mod error;
pub mod hallucination;
pub mod memory;
pub mod state;

// Re-exports
pub use analysis::TurnAnalysis;
pub use dialogue::{Dialogue, DialogueTurn, Role};
pub use error::{MemoryError, MemoryResult};
pub use hallucination::{Hallucination, HallucinationType};
pub use memory::{clamp_unit, MemoryCategory, MemoryId, MemoryItem};
pub use state::MemoryState;
