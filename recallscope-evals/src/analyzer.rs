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

//! Turn analysis
//!
//! Decides, for one turn, which memories the response used, which relevant
//! memories it missed, and which hallucinations it contains.
//!
//! The heuristic pipeline runs in a fixed order:
//! 1. **Usage**: a memory is used if one of its keywords appears in the response
//! 2. **Omission**: an important, unused memory is missed if one of its
//!    keywords appears in the user input
//! 3. **Contradiction**: a narrow city-mismatch rule emits `wrong_reference`
//! 4. **Detector**: [`HallucinationDetector`] findings are appended last

use crate::config::AnalyzerConfig;
use crate::hallucination::{DetectionInput, HallucinationDetector};
use crate::keywords::{matchable_keywords, LoweredText};
use crate::llm_client::LLMClient;
use crate::prompts::PromptBuilder;
use crate::request_json;
use recallscope_memory::{
    clamp_unit, DialogueTurn, Hallucination, HallucinationType, MemoryCategory, MemoryId,
    MemoryItem, MemoryState, TurnAnalysis,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Inputs describing the turn under analysis
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub turn_id: u32,
    pub user_input: &'a str,
    pub llm_response: &'a str,
    /// Prior turns, oldest first
    pub history: &'a [DialogueTurn],
}

/// Produces the analysis record of one turn from the current memory state
pub trait TurnAnalyzer: Send + Sync {
    fn analyze(&self, ctx: &TurnContext<'_>, state: &MemoryState) -> TurnAnalysis;
}

/// Closed-set city mismatch rule.
///
/// Fires when an important fact mentions `anchor`, the user asks a location
/// question, and the response names one of `rivals` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ContradictionRule {
    pub anchor: String,
    pub rivals: Vec<String>,
    pub inquiry_cues: Vec<String>,
}

impl Default for ContradictionRule {
    fn default() -> Self {
        Self {
            anchor: "北京".to_string(),
            rivals: ["上海", "广州", "深圳"].iter().map(|s| s.to_string()).collect(),
            inquiry_cues: ["来自", "城市", "哪里", "哪"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ContradictionRule {
    fn is_inquiry(&self, user_lower: &str) -> bool {
        self.inquiry_cues.iter().any(|cue| user_lower.contains(cue.as_str()))
    }

    fn contradicts(&self, memory: &MemoryItem, response_lower: &str) -> bool {
        memory.content.contains(self.anchor.as_str())
            && self.rivals.iter().any(|city| response_lower.contains(city.as_str()))
    }
}

/// Keyword-based analyzer used when no oracle is configured
pub struct HeuristicTurnAnalyzer {
    config: AnalyzerConfig,
    contradiction: ContradictionRule,
    detector: HallucinationDetector,
}

impl HeuristicTurnAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let detector = HallucinationDetector::new(&config);
        Self {
            config,
            contradiction: ContradictionRule::default(),
            detector,
        }
    }

    /// Replace the hallucination detector (e.g., to register extra checks)
    pub fn with_detector(mut self, detector: HallucinationDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_contradiction_rule(mut self, rule: ContradictionRule) -> Self {
        self.contradiction = rule;
        self
    }

    fn detect_usage(
        &self,
        analysis: &mut TurnAnalysis,
        state: &MemoryState,
        response: &LoweredText<'_>,
    ) {
        for memory in state.memories() {
            let keywords = matchable_keywords(&memory.content, self.config.min_keyword_chars);
            let evidence = keywords
                .iter()
                .find_map(|kw| response.evidence(kw, self.config.evidence_window_chars));
            if let Some(evidence) = evidence {
                analysis.mark_used(memory.id, Some(evidence.to_string()));
            }
        }
    }

    fn detect_omissions(&self, analysis: &mut TurnAnalysis, state: &MemoryState, user_lower: &str) {
        for memory in state.memories() {
            if memory.importance <= self.config.omission_importance_threshold
                || analysis.is_used(memory.id)
            {
                continue;
            }
            let asked_about = matchable_keywords(&memory.content, self.config.min_keyword_chars)
                .iter()
                .any(|kw| user_lower.contains(kw.as_str()));
            if asked_about {
                analysis.mark_missed(memory.id);
            }
        }
    }

    fn detect_contradictions(
        &self,
        analysis: &mut TurnAnalysis,
        state: &MemoryState,
        user_lower: &str,
        response_lower: &str,
    ) {
        if !self.contradiction.is_inquiry(user_lower) {
            return;
        }
        for memory in state.memories() {
            if memory.category != MemoryCategory::Fact
                || memory.importance <= self.config.contradiction_importance_threshold
                || !self.contradiction.contradicts(memory, response_lower)
            {
                continue;
            }
            analysis.hallucinations.push(
                Hallucination::new(
                    HallucinationType::WrongReference,
                    analysis.turn_id,
                    format!(
                        "Response claims the user is from another city, but memory #{} says: {}",
                        memory.id, memory.content
                    ),
                    analysis.llm_response.clone(),
                    self.config.wrong_reference_severity,
                )
                .with_correction(format!("Should answer: {}", memory.content)),
            );
        }
    }
}

impl Default for HeuristicTurnAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl TurnAnalyzer for HeuristicTurnAnalyzer {
    fn analyze(&self, ctx: &TurnContext<'_>, state: &MemoryState) -> TurnAnalysis {
        let mut analysis = TurnAnalysis::new(ctx.turn_id, ctx.user_input, ctx.llm_response);
        let response = LoweredText::new(ctx.llm_response);
        let user_lower = ctx.user_input.to_lowercase();

        self.detect_usage(&mut analysis, state, &response);
        self.detect_omissions(&mut analysis, state, &user_lower);
        self.detect_contradictions(&mut analysis, state, &user_lower, response.as_str());

        let contents = state.memory_contents();
        let findings = self.detector.detect(&DetectionInput {
            turn_id: ctx.turn_id,
            llm_response: ctx.llm_response,
            available_memories: &contents,
            used_memories: &analysis.used_memories,
            missed_memories: &analysis.missed_memories,
        });
        analysis.hallucinations.extend(findings);

        debug!(
            turn_id = ctx.turn_id,
            used = analysis.used_memories.len(),
            missed = analysis.missed_memories.len(),
            hallucinations = analysis.hallucinations.len(),
            "Analyzed turn"
        );
        analysis
    }
}

/// Analyzer that delegates judgment to an LLM oracle
pub struct OracleTurnAnalyzer {
    llm_client: Arc<dyn LLMClient>,
    config: AnalyzerConfig,
}

impl OracleTurnAnalyzer {
    pub fn new(llm_client: Arc<dyn LLMClient>, config: AnalyzerConfig) -> Self {
        Self { llm_client, config }
    }

    fn parse_analysis(
        &self,
        ctx: &TurnContext<'_>,
        state: &MemoryState,
        json: &serde_json::Value,
    ) -> TurnAnalysis {
        let mut analysis = TurnAnalysis::new(ctx.turn_id, ctx.user_input, ctx.llm_response);

        for item in json["used_memories"].as_array().into_iter().flatten() {
            let Some(id) = memory_id(ctx.turn_id, item, state) else {
                continue;
            };
            // Evidence must be a verbatim span of the response
            let evidence = item["reference_text"]
                .as_str()
                .filter(|text| !text.is_empty() && ctx.llm_response.contains(text))
                .map(str::to_string);
            analysis.mark_used(id, evidence);
        }

        for item in json["missed_memories"].as_array().into_iter().flatten() {
            if let Some(id) = memory_id(ctx.turn_id, item, state) {
                analysis.mark_missed(id);
            }
        }

        for item in json["hallucinations"].as_array().into_iter().flatten() {
            let kind = match item["type"].as_str().unwrap_or("").parse::<HallucinationType>() {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(turn_id = ctx.turn_id, error = %e, "Dropping hallucination finding");
                    continue;
                }
            };
            let severity = item["severity"]
                .as_f64()
                .unwrap_or(self.config.default_oracle_severity);
            let mut finding = Hallucination::new(
                kind,
                ctx.turn_id,
                item["description"].as_str().unwrap_or(""),
                item["evidence"].as_str().unwrap_or(""),
                clamp_unit(severity),
            );
            finding.suggested_correction =
                item["suggested_correction"].as_str().map(str::to_string);
            analysis.hallucinations.push(finding);
        }

        analysis
    }
}

impl TurnAnalyzer for OracleTurnAnalyzer {
    fn analyze(&self, ctx: &TurnContext<'_>, state: &MemoryState) -> TurnAnalysis {
        let prompt = PromptBuilder::build_analysis_prompt(
            ctx.turn_id,
            ctx.user_input,
            ctx.llm_response,
            ctx.history,
            state.memories(),
        );

        match request_json(self.llm_client.as_ref(), &prompt) {
            Ok(json) => self.parse_analysis(ctx, state, &json),
            Err(e) => {
                warn!(
                    turn_id = ctx.turn_id,
                    error = %e,
                    "Turn analysis failed, recording empty analysis"
                );
                TurnAnalysis::new(ctx.turn_id, ctx.user_input, ctx.llm_response)
            }
        }
    }
}

/// Resolve an oracle-supplied memory id against the store
fn memory_id(turn_id: u32, item: &serde_json::Value, state: &MemoryState) -> Option<MemoryId> {
    let raw = item["memory_id"].as_u64()?;
    let id = usize::try_from(raw).ok()?;
    if state.contains(id) {
        Some(id)
    } else {
        warn!(turn_id, memory_id = raw, "Ignoring out-of-range memory id");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{LLMError, LLMResponse};

    fn ctx<'a>(turn_id: u32, user_input: &'a str, llm_response: &'a str) -> TurnContext<'a> {
        TurnContext {
            turn_id,
            user_input,
            llm_response,
            history: &[],
        }
    }

    fn beijing_state() -> MemoryState {
        let mut state = MemoryState::new();
        state.add_memory(1, "用户来自: 北京", 0.9, MemoryCategory::Fact);
        state
    }

    #[test]
    fn test_usage_records_evidence() {
        let mut state = MemoryState::new();
        state.add_memory(1, "User likes tennis", 0.7, MemoryCategory::Preference);
        state.add_memory(1, "User owns a cat", 0.7, MemoryCategory::Fact);

        let response = "Since you enjoy Tennis, how about a match this weekend?";
        let analysis =
            HeuristicTurnAnalyzer::default().analyze(&ctx(2, "Any plans?", response), &state);

        // "user" is the first keyword of both memories but absent from the response
        assert_eq!(analysis.used_memories, vec![0]);
        let evidence = &analysis.memory_references[&0];
        assert!(response.contains(evidence.as_str()));
        assert!(evidence.contains("Tennis"));
    }

    #[test]
    fn test_omission_of_important_memory() {
        let mut state = MemoryState::new();
        state.add_memory(1, "用户姓名: 小明", 0.9, MemoryCategory::Fact);
        state.add_memory(1, "用户姓名: 旧名", 0.5, MemoryCategory::Fact);

        let analysis = HeuristicTurnAnalyzer::default()
            .analyze(&ctx(2, "你还记得用户姓名吗？", "抱歉，我不记得了。"), &state);

        assert!(analysis.used_memories.is_empty());
        assert_eq!(analysis.missed_memories, vec![0]);
        assert_eq!(analysis.hallucinations.len(), 1);
        let finding = &analysis.hallucinations[0];
        assert_eq!(finding.kind, HallucinationType::ForgottenContext);
        assert_eq!(finding.severity, 0.7);
        assert_eq!(finding.evidence, "用户姓名: 小明");
    }

    #[test]
    fn test_used_memory_is_never_missed() {
        let mut state = MemoryState::new();
        state.add_memory(1, "用户姓名: 小明", 0.9, MemoryCategory::Fact);

        let analysis = HeuristicTurnAnalyzer::default()
            .analyze(&ctx(2, "用户姓名是什么", "用户姓名是小明"), &state);

        assert_eq!(analysis.used_memories, vec![0]);
        assert!(analysis.missed_memories.is_empty());
        assert!(analysis.hallucinations.is_empty());
    }

    #[test]
    fn test_wrong_city_is_flagged() {
        let response = "你来自上海，对吧？";
        let analysis = HeuristicTurnAnalyzer::default()
            .analyze(&ctx(3, "你还记得我来自哪个城市吗？", response), &beijing_state());

        let wrong: Vec<_> = analysis
            .hallucinations
            .iter()
            .filter(|h| h.kind == HallucinationType::WrongReference)
            .collect();
        assert_eq!(wrong.len(), 1);
        assert_eq!(wrong[0].severity, 0.9);
        assert_eq!(wrong[0].evidence, response);
        assert_eq!(wrong[0].turn_id, 3);
        assert!(wrong[0].suggested_correction.as_deref().unwrap().contains("用户来自: 北京"));
    }

    #[test]
    fn test_contradiction_precedes_detector_findings() {
        let analysis = HeuristicTurnAnalyzer::default()
            .analyze(&ctx(2, "用户来自哪个城市？", "你来自深圳。"), &beijing_state());

        let kinds: Vec<_> = analysis.hallucinations.iter().map(|h| h.kind).collect();
        assert_eq!(
            kinds,
            vec![HallucinationType::WrongReference, HallucinationType::ForgottenContext]
        );
    }

    #[test]
    fn test_contradiction_needs_inquiry_and_rival_city() {
        let analyzer = HeuristicTurnAnalyzer::default();
        let state = beijing_state();

        let no_question = analyzer.analyze(&ctx(2, "今天天气不错", "上海今天也晴天"), &state);
        assert_eq!(no_question.count_of(HallucinationType::WrongReference), 0);

        // Cities outside the closed set are not checked
        let other_city = analyzer.analyze(&ctx(2, "我来自哪里？", "你来自杭州"), &state);
        assert_eq!(other_city.count_of(HallucinationType::WrongReference), 0);

        let correct = analyzer.analyze(&ctx(2, "我来自哪里？", "你来自北京"), &state);
        assert_eq!(correct.count_of(HallucinationType::WrongReference), 0);
    }

    #[test]
    fn test_contradiction_ignores_preferences() {
        let mut state = MemoryState::new();
        state.add_memory(1, "我喜欢北京烤鸭", 0.95, MemoryCategory::Preference);
        let analysis = HeuristicTurnAnalyzer::default()
            .analyze(&ctx(2, "哪里好玩？", "上海很好玩"), &state);
        assert_eq!(analysis.count_of(HallucinationType::WrongReference), 0);
    }

    #[test]
    fn test_empty_state() {
        let analysis = HeuristicTurnAnalyzer::default()
            .analyze(&ctx(1, "我叫小明", "你好，小明"), &MemoryState::new());
        assert!(analysis.is_empty());
    }

    struct ScriptedClient(String);

    impl LLMClient for ScriptedClient {
        fn evaluate(&self, _prompt: &str) -> Result<LLMResponse, LLMError> {
            Ok(LLMResponse::text(self.0.clone(), "scripted"))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn oracle(response: &str) -> OracleTurnAnalyzer {
        OracleTurnAnalyzer::new(
            Arc::new(ScriptedClient(response.to_string())),
            AnalyzerConfig::default(),
        )
    }

    #[test]
    fn test_oracle_analysis_parsed() {
        let mut state = beijing_state();
        state.add_memory(1, "用户姓名: 小明", 0.9, MemoryCategory::Fact);

        let analyzer = oracle(
            r#"{
                "used_memories": [
                    {"memory_id": 1, "reference_text": "小明"},
                    {"memory_id": 1, "reference_text": "小明"},
                    {"memory_id": 42, "reference_text": "x"}
                ],
                "missed_memories": [{"memory_id": 0}, {"memory_id": 1}, {"memory_id": -3}],
                "hallucinations": [
                    {"type": "wrong_reference", "description": "wrong city", "evidence": "上海", "severity": 0.95, "suggested_correction": "北京"},
                    {"type": "imagined", "description": "dropped"},
                    {"type": "fabricated_memory", "description": "no severity"}
                ]
            }"#,
        );

        let analysis = analyzer.analyze(&ctx(2, "我来自哪里？", "小明，你来自上海"), &state);

        assert_eq!(analysis.used_memories, vec![1]);
        assert_eq!(analysis.memory_references[&1], "小明");
        assert_eq!(analysis.missed_memories, vec![0]);
        assert_eq!(analysis.hallucinations.len(), 2);
        assert_eq!(analysis.hallucinations[0].kind, HallucinationType::WrongReference);
        assert_eq!(analysis.hallucinations[0].suggested_correction.as_deref(), Some("北京"));
        assert_eq!(analysis.hallucinations[1].kind, HallucinationType::FabricatedMemory);
        assert_eq!(analysis.hallucinations[1].severity, 0.5);
    }

    #[test]
    fn test_oracle_reference_must_be_in_response() {
        let analyzer =
            oracle(r#"{"used_memories": [{"memory_id": 0, "reference_text": "Beijing"}]}"#);
        let analysis = analyzer.analyze(&ctx(2, "q", "你来自北京"), &beijing_state());

        assert_eq!(analysis.used_memories, vec![0]);
        assert!(analysis.memory_references.is_empty());
    }

    #[test]
    fn test_oracle_parse_failure_yields_empty_analysis() {
        let analysis = oracle("Sorry, I cannot help with that.")
            .analyze(&ctx(4, "我来自哪里？", "上海"), &beijing_state());

        assert_eq!(analysis.turn_id, 4);
        assert_eq!(analysis.user_input, "我来自哪里？");
        assert!(analysis.is_empty());
    }
}
