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

//! Keyword extraction and evidence spans
//!
//! Keywords are a coarse substring-membership oracle, not a tokenizer:
//! - runs of 2-4 CJK ideographs (non-overlapping, leftmost first)
//! - English alphabetic words of 3+ letters, lowercased
//!
//! Results keep first-occurrence order so "the first matching keyword" is
//! deterministic.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn cjk_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\x{4e00}-\x{9fa5}]{2,4}").expect("Invalid regex pattern"))
}

fn english_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b[a-zA-Z]{3,}\b").expect("Invalid regex pattern"))
}

/// Extract candidate keywords from free text, CJK runs first.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let cjk = cjk_pattern().find_iter(text).map(|m| m.as_str().to_string());
    let english = english_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase());

    cjk.chain(english)
        .filter(|kw| seen.insert(kw.clone()))
        .collect()
}

/// Keywords long enough to be used for matching
pub fn matchable_keywords(text: &str, min_chars: usize) -> Vec<String> {
    extract_keywords(text)
        .into_iter()
        .filter(|kw| kw.chars().count() >= min_chars)
        .collect()
}

/// Lowercased view of a text that remembers where each byte came from.
///
/// Lowercasing may change the length of a character, so offsets found in the
/// lowered text are mapped back to character positions of the original.
pub struct LoweredText<'a> {
    original: &'a str,
    lowered: String,
    /// Original character index for every byte of `lowered`
    origin: Vec<usize>,
}

impl<'a> LoweredText<'a> {
    pub fn new(original: &'a str) -> Self {
        let mut lowered = String::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len());
        for (index, ch) in original.chars().enumerate() {
            for lower in ch.to_lowercase() {
                let before = lowered.len();
                lowered.push(lower);
                origin.resize(origin.len() + (lowered.len() - before), index);
            }
        }
        Self {
            original,
            lowered,
            origin,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.lowered
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lowered.contains(needle)
    }

    /// Span of the original text around the first occurrence of `needle`,
    /// widened by `window` characters each side and clamped to the text.
    pub fn evidence(&self, needle: &str, window: usize) -> Option<&'a str> {
        if needle.is_empty() {
            return None;
        }
        let pos = self.lowered.find(needle)?;
        let first = self.origin[pos];
        let last = self.origin[pos + needle.len() - 1];

        let start = first.saturating_sub(window);
        let end = last + 1 + window;
        Some(char_slice(self.original, start, end))
    }
}

/// Slice `text` by character positions `[start, end)`, clamped to bounds.
fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let byte_at = |n: usize| {
        text.char_indices()
            .nth(n)
            .map(|(offset, _)| offset)
            .unwrap_or(text.len())
    };
    let from = byte_at(start);
    let to = byte_at(end).max(from);
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cjk_runs_split_into_chunks() {
        // Seven ideographs: a 4-run then a 3-run
        assert_eq!(extract_keywords("用户来自北京市"), vec!["用户来自", "北京市"]);
        assert_eq!(extract_keywords("用户来自: 北京"), vec!["用户来自", "北京"]);
        assert!(extract_keywords("我").is_empty());
    }

    #[test]
    fn test_english_words_lowercased_and_deduplicated() {
        assert_eq!(
            extract_keywords("I love Rust and rust, ok"),
            vec!["love", "rust", "and"]
        );
    }

    #[test]
    fn test_english_inside_cjk_has_no_word_boundary() {
        // Ideographs are word characters, so the Latin run is not a whole word
        assert_eq!(extract_keywords("我喜欢Rust编程"), vec!["我喜欢", "编程"]);
    }

    #[test]
    fn test_matchable_keywords_counts_characters() {
        let keywords = matchable_keywords("用户来自: 北京", 3);
        assert_eq!(keywords, vec!["用户来自"]);
    }

    #[test]
    fn test_evidence_window_clamped() {
        let text = "Hello, I remember you like Tennis very much!";
        let lowered = LoweredText::new(text);
        assert_eq!(lowered.evidence("tennis", 3), Some("ke Tennis ve"));
        assert_eq!(lowered.evidence("hello", 100), Some(text));
        assert_eq!(lowered.evidence("golf", 3), None);
        assert_eq!(lowered.evidence("", 3), None);
    }

    #[test]
    fn test_evidence_over_cjk() {
        let text = "你好小明，你是用户姓名为小明的朋友吗";
        let lowered = LoweredText::new(text);
        assert_eq!(lowered.evidence("用户姓名", 2), Some("你是用户姓名为小"));
    }

    #[test]
    fn test_evidence_when_lowercase_expands() {
        // 'İ' lowercases to two characters
        let text = "İİİ paris";
        let lowered = LoweredText::new(text);
        assert_eq!(lowered.evidence("paris", 1), Some(" paris"));
    }

    proptest! {
        #[test]
        fn prop_evidence_is_substring(text in "\\PC{0,60}", window in 0usize..30) {
            let lowered = LoweredText::new(&text);
            for keyword in extract_keywords(&text) {
                if let Some(span) = lowered.evidence(&keyword, window) {
                    prop_assert!(text.contains(span));
                }
            }
        }

        #[test]
        fn prop_keywords_unique(text in "[a-zA-Z 北京上海用户]{0,40}") {
            let keywords = extract_keywords(&text);
            let unique: HashSet<_> = keywords.iter().collect();
            prop_assert_eq!(unique.len(), keywords.len());
        }
    }
}
