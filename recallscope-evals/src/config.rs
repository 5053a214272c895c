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

//! Analyzer configuration

use serde::{Deserialize, Serialize};

/// Tunable constants of the heuristic pipeline and oracle parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Keywords shorter than this (in characters) never match
    pub min_keyword_chars: usize,

    /// Characters of context kept on each side of a matched keyword
    pub evidence_window_chars: usize,

    /// Memories must be strictly above this importance to count as missed
    pub omission_importance_threshold: f64,

    /// Fact memories must be strictly above this importance to be contradicted
    pub contradiction_importance_threshold: f64,

    /// Severity of a contradicted fact
    pub wrong_reference_severity: f64,

    /// Severity of a forgotten memory
    pub forgotten_context_severity: f64,

    /// Severity assigned to oracle findings that omit one
    pub default_oracle_severity: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_keyword_chars: 3,
            evidence_window_chars: 20,
            omission_importance_threshold: 0.7,
            contradiction_importance_threshold: 0.7,
            wrong_reference_severity: 0.9,
            forgotten_context_severity: 0.7,
            default_oracle_severity: 0.5,
        }
    }
}
