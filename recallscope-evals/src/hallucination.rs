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

//! Hallucination detection
//!
//! The detector is a pure function of one turn's inputs. It runs an ordered
//! list of independent, stateless checks and concatenates their findings in
//! registration order. The default list holds a single check that reports
//! every missed memory as forgotten context.

use crate::config::AnalyzerConfig;
use recallscope_memory::{Hallucination, HallucinationType, MemoryId};

/// Marker used as evidence when a memory id does not resolve
pub const MISSING_MEMORY_EVIDENCE: &str = "N/A";

/// Everything a check may look at for one turn
#[derive(Debug, Clone, Copy)]
pub struct DetectionInput<'a> {
    pub turn_id: u32,
    pub llm_response: &'a str,
    /// Memory contents indexed by memory id
    pub available_memories: &'a [&'a str],
    pub used_memories: &'a [MemoryId],
    pub missed_memories: &'a [MemoryId],
}

/// A single, stateless detection rule
pub trait HallucinationCheck: Send + Sync {
    /// Identifier of the rule (e.g., "forgotten_context_v1")
    fn id(&self) -> &str;

    fn check(&self, input: &DetectionInput<'_>) -> Vec<Hallucination>;
}

/// Reports each missed memory as a forgotten-context finding
pub struct ForgottenContextCheck {
    severity: f64,
}

impl ForgottenContextCheck {
    pub fn new(severity: f64) -> Self {
        Self { severity }
    }
}

impl Default for ForgottenContextCheck {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default().forgotten_context_severity)
    }
}

impl HallucinationCheck for ForgottenContextCheck {
    fn id(&self) -> &str {
        "forgotten_context_v1"
    }

    fn check(&self, input: &DetectionInput<'_>) -> Vec<Hallucination> {
        input
            .missed_memories
            .iter()
            .map(|&memory_id| {
                let evidence = input
                    .available_memories
                    .get(memory_id)
                    .copied()
                    .unwrap_or(MISSING_MEMORY_EVIDENCE);
                Hallucination::new(
                    HallucinationType::ForgottenContext,
                    input.turn_id,
                    format!("Missed key memory #{}", memory_id),
                    evidence,
                    self.severity,
                )
            })
            .collect()
    }
}

/// Runs registered checks in order
pub struct HallucinationDetector {
    checks: Vec<Box<dyn HallucinationCheck>>,
}

impl HallucinationDetector {
    /// Detector with the default rule set
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self::empty().with_check(ForgottenContextCheck::new(config.forgotten_context_severity))
    }

    /// Detector with no rules
    pub fn empty() -> Self {
        Self { checks: Vec::new() }
    }

    /// Append a rule; its findings follow those of earlier rules
    pub fn with_check(mut self, check: impl HallucinationCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn check_ids(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.id()).collect()
    }

    pub fn detect(&self, input: &DetectionInput<'_>) -> Vec<Hallucination> {
        self.checks
            .iter()
            .flat_map(|check| check.check(input))
            .collect()
    }
}

impl Default for HallucinationDetector {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(memories: &'a [&'a str], missed: &'a [MemoryId]) -> DetectionInput<'a> {
        DetectionInput {
            turn_id: 2,
            llm_response: "你好",
            available_memories: memories,
            used_memories: &[],
            missed_memories: missed,
        }
    }

    #[test]
    fn test_forgotten_context_per_missed_memory() {
        let memories = ["用户姓名: 小明", "用户来自: 北京"];
        let missed = [1, 0];
        let findings = HallucinationDetector::default().detect(&input(&memories, &missed));

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, HallucinationType::ForgottenContext);
        assert_eq!(findings[0].turn_id, 2);
        assert_eq!(findings[0].severity, 0.7);
        assert_eq!(findings[0].evidence, "用户来自: 北京");
        assert!(findings[0].description.contains("#1"));
        assert_eq!(findings[1].evidence, "用户姓名: 小明");
        assert!(findings[1].suggested_correction.is_none());
    }

    #[test]
    fn test_out_of_range_memory_uses_marker() {
        let memories = ["only"];
        let missed = [5];
        let findings = HallucinationDetector::default().detect(&input(&memories, &missed));
        assert_eq!(findings[0].evidence, MISSING_MEMORY_EVIDENCE);
    }

    #[test]
    fn test_nothing_missed_nothing_found() {
        let findings = HallucinationDetector::default().detect(&input(&[], &[]));
        assert!(findings.is_empty());
    }

    struct EchoCheck;

    impl HallucinationCheck for EchoCheck {
        fn id(&self) -> &str {
            "echo"
        }

        fn check(&self, input: &DetectionInput<'_>) -> Vec<Hallucination> {
            vec![Hallucination::new(
                HallucinationType::FabricatedMemory,
                input.turn_id,
                "echo",
                input.llm_response,
                0.4,
            )]
        }
    }

    #[test]
    fn test_custom_checks_append_in_order() {
        let detector = HallucinationDetector::default().with_check(EchoCheck);
        assert_eq!(detector.check_ids(), vec!["forgotten_context_v1", "echo"]);

        let memories = ["m"];
        let missed = [0];
        let findings = detector.detect(&input(&memories, &missed));
        let kinds: Vec<_> = findings.iter().map(|h| h.kind).collect();
        assert_eq!(
            kinds,
            vec![HallucinationType::ForgottenContext, HallucinationType::FabricatedMemory]
        );
    }

    #[test]
    fn test_severity_follows_config() {
        let config = AnalyzerConfig {
            forgotten_context_severity: 0.4,
            ..AnalyzerConfig::default()
        };
        let memories = ["m"];
        let missed = [0];
        let findings = HallucinationDetector::new(&config).detect(&input(&memories, &missed));
        assert_eq!(findings[0].severity, 0.4);
    }
}
