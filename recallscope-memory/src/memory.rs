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

//! Memory items
//!
//! A memory item is a discrete fact, preference, context note or instruction
//! derived from one turn of a dialogue. Later turns are checked against it.

use crate::error::MemoryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Identifier of a memory item. Always equal to its position in the store.
pub type MemoryId = usize;

/// Category of a memory item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    /// Factual information (names, dates, places)
    Fact,
    /// A preference expressed by the user
    Preference,
    /// Situational context (current task, state)
    Context,
    /// An instruction or requirement
    Instruction,
}

impl MemoryCategory {
    /// Every category, in declaration order
    pub const ALL: [MemoryCategory; 4] = [
        MemoryCategory::Fact,
        MemoryCategory::Preference,
        MemoryCategory::Context,
        MemoryCategory::Instruction,
    ];

    /// Wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::Fact => "fact",
            MemoryCategory::Preference => "preference",
            MemoryCategory::Context => "context",
            MemoryCategory::Instruction => "instruction",
        }
    }
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryCategory {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fact" => Ok(MemoryCategory::Fact),
            "preference" => Ok(MemoryCategory::Preference),
            "context" => Ok(MemoryCategory::Context),
            "instruction" => Ok(MemoryCategory::Instruction),
            other => Err(MemoryError::UnknownCategory(other.to_string())),
        }
    }
}

/// A memory item stored in the [`MemoryState`](crate::MemoryState)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Position in the store
    pub id: MemoryId,
    /// Turn this memory was derived from
    pub turn_id: u32,
    /// Memory content
    pub content: String,
    /// Importance in [0, 1]
    pub importance: f64,
    /// Category
    pub category: MemoryCategory,
    /// Turns whose response referenced this memory
    pub referenced_by: BTreeSet<u32>,
}

impl MemoryItem {
    /// Create a memory item. Importance is clamped to [0, 1].
    pub fn new(
        id: MemoryId,
        turn_id: u32,
        content: impl Into<String>,
        importance: f64,
        category: MemoryCategory,
    ) -> Self {
        Self {
            id,
            turn_id,
            content: content.into(),
            importance: clamp_unit(importance),
            category,
            referenced_by: BTreeSet::new(),
        }
    }

    /// Whether any turn has referenced this memory
    pub fn is_referenced(&self) -> bool {
        !self.referenced_by.is_empty()
    }
}

/// Clamp a score into [0, 1]. NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        for category in MemoryCategory::ALL {
            assert_eq!(category.as_str().parse::<MemoryCategory>().unwrap(), category);
        }
        assert!(matches!(
            "opinion".parse::<MemoryCategory>(),
            Err(MemoryError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&MemoryCategory::Instruction).unwrap();
        assert_eq!(json, "\"instruction\"");
    }

    #[test]
    fn test_importance_is_clamped() {
        assert_eq!(MemoryItem::new(0, 1, "a", 1.7, MemoryCategory::Fact).importance, 1.0);
        assert_eq!(MemoryItem::new(0, 1, "a", -0.2, MemoryCategory::Fact).importance, 0.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }
}
