//! Intent-pattern table for the semantic filter stage.
//!
//! The detector is a heuristic over token sequences. It recognises direct
//! requests, command structures and probing questions from a regex table, plus
//! one structural rule: an imperative verb opening a clause, followed by a
//! sensitive term, with no narrative or hypothetical framing before that term.
//! Everything it matches on is data loaded from `intents.json`.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::EngineError;
use super::normalizer::{stem_phrase, NormalizedForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    DirectRequest,
    CommandStructure,
    ProbingQuestion,
    /// Produced by the structural rule, never by a table entry.
    ImperativeDemand,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentKind::DirectRequest => "direct request",
            IntentKind::CommandStructure => "command structure",
            IntentKind::ProbingQuestion => "probing question",
            IntentKind::ImperativeDemand => "imperative demand",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentPatternSeed {
    pub id: String,
    pub kind: IntentKind,
    pub pattern: String,
}

/// Authoring form of the table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentTableSeed {
    #[serde(default)]
    pub patterns: Vec<IntentPatternSeed>,
    #[serde(default)]
    pub imperative_verbs: Vec<String>,
    #[serde(default)]
    pub fillers: Vec<String>,
    #[serde(default)]
    pub sensitive_terms: Vec<String>,
    #[serde(default)]
    pub framing_markers: Vec<String>,
}

#[derive(Debug, Clone)]
struct IntentPattern {
    id: String,
    kind: IntentKind,
    regex: Regex,
}

/// What the detector found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMatch {
    pub kind: IntentKind,
    /// Pattern id, or `"structural"` for the imperative rule.
    pub rule: String,
    /// The fragment of lowercased input that triggered the match.
    pub fragment: String,
}

#[derive(Debug, Clone, Default)]
pub struct IntentTable {
    patterns: Vec<IntentPattern>,
    // all word lists below hold stem sequences
    imperative_verbs: Vec<Vec<String>>,
    fillers: Vec<Vec<String>>,
    sensitive_terms: Vec<Vec<String>>,
    framing_markers: Vec<Vec<String>>,
}

fn compile_words(list: &[String], what: &str) -> Result<Vec<Vec<String>>, EngineError> {
    list.iter()
        .map(|w| {
            let stems = stem_phrase(w);
            if stems.is_empty() {
                Err(EngineError::MalformedCatalog(format!("blank entry in intent {}", what)))
            } else {
                Ok(stems)
            }
        })
        .collect()
}

/// Position of the first occurrence of `needle` as a contiguous run in `hay`.
pub(crate) fn find_sequence(hay: &[String], needle: &[String]) -> Option<usize> {
    if needle.is_empty() || needle.len() > hay.len() {
        return None;
    }
    hay.windows(needle.len()).position(|w| w == needle)
}

fn starts_at(hay: &[String], at: usize, needle: &[String]) -> bool {
    hay.get(at..at + needle.len()).is_some_and(|w| w == needle)
}

impl IntentTable {
    pub fn from_seed(seed: IntentTableSeed) -> Result<Self, EngineError> {
        let mut patterns = Vec::with_capacity(seed.patterns.len());
        for p in seed.patterns {
            if p.kind == IntentKind::ImperativeDemand {
                return Err(EngineError::MalformedCatalog(format!(
                    "intent pattern '{}' cannot use the structural kind",
                    p.id
                )));
            }
            let regex = Regex::new(&p.pattern).map_err(|source| EngineError::InvalidPattern {
                id: p.id.clone(),
                source,
            })?;
            patterns.push(IntentPattern {
                id: p.id,
                kind: p.kind,
                regex,
            });
        }
        Ok(Self {
            patterns,
            imperative_verbs: compile_words(&seed.imperative_verbs, "imperative_verbs")?,
            fillers: compile_words(&seed.fillers, "fillers")?,
            sensitive_terms: compile_words(&seed.sensitive_terms, "sensitive_terms")?,
            framing_markers: compile_words(&seed.framing_markers, "framing_markers")?,
        })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// First intent the table recognises in `form`, if any.
    pub fn detect(&self, form: &NormalizedForm) -> Option<IntentMatch> {
        for p in &self.patterns {
            if let Some(m) = p.regex.find(&form.text) {
                return Some(IntentMatch {
                    kind: p.kind,
                    rule: p.id.clone(),
                    fragment: m.as_str().trim().to_string(),
                });
            }
        }
        self.structural(form)
    }

    fn structural(&self, form: &NormalizedForm) -> Option<IntentMatch> {
        let stems = &form.stems;
        for start in self.clause_starts(stems) {
            let Some(verb) = self.imperative_verbs.iter().find(|v| starts_at(stems, start, v)) else {
                continue;
            };
            let after = start + verb.len();
            for pos in after..stems.len() {
                let Some(term) = self.sensitive_terms.iter().find(|t| starts_at(stems, pos, t)) else {
                    continue;
                };
                if self.framed_before(stems, pos) {
                    return None;
                }
                return Some(IntentMatch {
                    kind: IntentKind::ImperativeDemand,
                    rule: "structural".to_string(),
                    fragment: form.tokens[start..pos + term.len()].join(" "),
                });
            }
        }
        None
    }

    /// Token 0 and every position right after a filler word.
    fn clause_starts(&self, stems: &[String]) -> Vec<usize> {
        let mut starts = vec![0];
        for i in 0..stems.len() {
            for f in &self.fillers {
                if starts_at(stems, i, f) {
                    starts.push(i + f.len());
                }
            }
        }
        starts.retain(|&s| s < stems.len());
        starts.sort_unstable();
        starts.dedup();
        starts
    }

    fn framed_before(&self, stems: &[String], end: usize) -> bool {
        self.framing_markers
            .iter()
            .any(|m| find_sequence(&stems[..end], m).is_some())
    }
}
