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

//! Hallucination findings

use crate::error::MemoryError;
use crate::memory::clamp_unit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of discrepancy between a response and the tracked memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HallucinationType {
    /// Response claims history that never happened
    FabricatedMemory,
    /// Response ignored context it should have used
    ForgottenContext,
    /// Response referenced history incorrectly
    WrongReference,
}

impl HallucinationType {
    pub const ALL: [HallucinationType; 3] = [
        HallucinationType::FabricatedMemory,
        HallucinationType::ForgottenContext,
        HallucinationType::WrongReference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HallucinationType::FabricatedMemory => "fabricated_memory",
            HallucinationType::ForgottenContext => "forgotten_context",
            HallucinationType::WrongReference => "wrong_reference",
        }
    }

    /// Human-readable description used in prompts and reports
    pub fn description(&self) -> &'static str {
        match self {
            HallucinationType::FabricatedMemory => {
                "the response claims prior information that does not exist"
            }
            HallucinationType::ForgottenContext => {
                "the response omits key context it should have remembered"
            }
            HallucinationType::WrongReference => {
                "the response references prior information incorrectly"
            }
        }
    }
}

impl fmt::Display for HallucinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HallucinationType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fabricated_memory" => Ok(HallucinationType::FabricatedMemory),
            "forgotten_context" => Ok(HallucinationType::ForgottenContext),
            "wrong_reference" => Ok(HallucinationType::WrongReference),
            other => Err(MemoryError::UnknownHallucinationType(other.to_string())),
        }
    }
}

/// A single typed, severity-scored finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hallucination {
    #[serde(rename = "type")]
    pub kind: HallucinationType,
    pub turn_id: u32,
    pub description: String,
    /// Evidence span supporting the finding
    pub evidence: String,
    /// Severity in [0, 1]
    pub severity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_correction: Option<String>,
}

impl Hallucination {
    /// Create a finding. Severity is clamped to [0, 1].
    pub fn new(
        kind: HallucinationType,
        turn_id: u32,
        description: impl Into<String>,
        evidence: impl Into<String>,
        severity: f64,
    ) -> Self {
        Self {
            kind,
            turn_id,
            description: description.into(),
            evidence: evidence.into(),
            severity: clamp_unit(severity),
            suggested_correction: None,
        }
    }

    /// Attach a suggested correction
    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.suggested_correction = Some(correction.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_parsing() {
        assert_eq!(
            "wrong_reference".parse::<HallucinationType>().unwrap(),
            HallucinationType::WrongReference
        );
        assert!(matches!(
            "made_up".parse::<HallucinationType>(),
            Err(MemoryError::UnknownHallucinationType(_))
        ));
    }

    #[test]
    fn test_finding_serializes_type_tag() {
        let finding = Hallucination::new(
            HallucinationType::ForgottenContext,
            3,
            "missed memory #0",
            "用户姓名: 小明",
            0.7,
        );
        let value = serde_json::to_value(&finding).unwrap();
        assert_eq!(value["type"], "forgotten_context");
        assert!(value.get("suggested_correction").is_none());
    }

    #[test]
    fn test_severity_clamped() {
        let finding = Hallucination::new(HallucinationType::WrongReference, 1, "", "", 4.0)
            .with_correction("fix");
        assert_eq!(finding.severity, 1.0);
        assert_eq!(finding.suggested_correction.as_deref(), Some("fix"));
    }
}
