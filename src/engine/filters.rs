//! The filter ladder: five rungs of increasing detection power.
//!
//! Rungs 1-4 work from the barrier's blocklist and are cumulative, so a
//! stage-n barrier also applies every lower rung. Rung 5 ignores the blocklist
//! and looks for intent structure instead (see [`super::intent`]).

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use super::errors::EngineError;
use super::intent::{find_sequence, IntentTable};
use super::lexicon::Lexicon;
use super::normalizer::{lookup_key, stem_phrase, tokenize, NormalizedForm};
use crate::logutil::escape_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum FilterStage {
    Exact = 1,
    CaseInsensitive = 2,
    Stemmed = 3,
    SynonymAware = 4,
    SemanticIntent = 5,
}

impl FilterStage {
    pub const ALL: [FilterStage; 5] = [
        FilterStage::Exact,
        FilterStage::CaseInsensitive,
        FilterStage::Stemmed,
        FilterStage::SynonymAware,
        FilterStage::SemanticIntent,
    ];

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterStage::Exact => "exact",
            FilterStage::CaseInsensitive => "case-insensitive",
            FilterStage::Stemmed => "stemmed",
            FilterStage::SynonymAware => "synonym-aware",
            FilterStage::SemanticIntent => "semantic-intent",
        }
    }

    fn uses_blocklist(self) -> bool {
        self != FilterStage::SemanticIntent
    }
}

impl TryFrom<u8> for FilterStage {
    type Error = EngineError;

    fn try_from(rank: u8) -> Result<Self, Self::Error> {
        FilterStage::ALL
            .get(usize::from(rank).wrapping_sub(1))
            .copied()
            .ok_or(EngineError::InvalidStage(rank))
    }
}

impl From<FilterStage> for u8 {
    fn from(stage: FilterStage) -> u8 {
        stage.rank()
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.rank(), self.label())
    }
}

fn default_detectable_from() -> FilterStage {
    FilterStage::Exact
}

/// A blocked concept and the lowest barrier stage at which it is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub concept: String,
    /// Literal strings the blocklist rungs look for. Empty means `[concept]`.
    #[serde(default)]
    pub surfaces: Vec<String>,
    #[serde(default = "default_detectable_from")]
    pub detectable_from: FilterStage,
}

impl BlockSpec {
    pub fn new(concept: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            surfaces: Vec::new(),
            detectable_from: FilterStage::Exact,
        }
    }

    pub fn with_surfaces<S: Into<String>>(mut self, surfaces: impl IntoIterator<Item = S>) -> Self {
        self.surfaces = surfaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn from_stage(mut self, stage: FilterStage) -> Self {
        self.detectable_from = stage;
        self
    }

    pub fn surfaces(&self) -> Vec<&str> {
        if self.surfaces.is_empty() {
            vec![self.concept.as_str()]
        } else {
            self.surfaces.iter().map(String::as_str).collect()
        }
    }

    pub fn is_active_at(&self, stage: FilterStage) -> bool {
        stage >= self.detectable_from
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The rung that caught the input.
    pub stage: FilterStage,
    pub rationale: String,
    pub concept: Option<String>,
    pub matched: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block(Block),
}

impl Verdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Block(_))
    }

    pub fn block(&self) -> Option<&Block> {
        match self {
            Verdict::Block(b) => Some(b),
            Verdict::Allow => None,
        }
    }
}

struct Hit {
    concept: String,
    matched: String,
}

/// Stateless evaluator borrowing the world's lexicon and intent table.
#[derive(Debug, Clone, Copy)]
pub struct FilterLadder<'a> {
    lexicon: &'a Lexicon,
    intents: &'a IntentTable,
}

impl<'a> FilterLadder<'a> {
    pub fn new(lexicon: &'a Lexicon, intents: &'a IntentTable) -> Self {
        Self { lexicon, intents }
    }

    /// Judge `form` at `stage` against the block specs active at that stage.
    pub fn evaluate(&self, stage: FilterStage, form: &NormalizedForm, specs: &[BlockSpec]) -> Verdict {
        let verdict = if stage.uses_blocklist() {
            let active: Vec<&BlockSpec> = specs.iter().filter(|s| s.is_active_at(stage)).collect();
            FilterStage::ALL[..usize::from(stage.rank())]
                .iter()
                .rev()
                .find_map(|&rung| self.rung(rung, form, &active).map(|hit| (rung, hit)))
                .map_or(Verdict::Allow, |(rung, hit)| {
                    Verdict::Block(Block {
                        stage: rung,
                        rationale: blocklist_rationale(rung, &hit.matched),
                        concept: Some(hit.concept),
                        matched: hit.matched,
                    })
                })
        } else {
            self.intents.detect(form).map_or(Verdict::Allow, |m| {
                Verdict::Block(Block {
                    stage,
                    rationale: format!(
                        "The warden reads the shape of your words, not the words themselves: a {} ('{}').",
                        m.kind, m.fragment
                    ),
                    concept: None,
                    matched: m.fragment,
                })
            })
        };

        if let Verdict::Block(b) = &verdict {
            debug!(
                target: "filter",
                "{} blocked '{}' on '{}' (caught at {})",
                stage,
                escape_log(&form.raw),
                escape_log(&b.matched),
                b.stage
            );
        }
        verdict
    }

    /// Verdict of every stage in turn, each with the specs active at that stage.
    pub fn evaluate_all(&self, form: &NormalizedForm, specs: &[BlockSpec]) -> Vec<(FilterStage, Verdict)> {
        FilterStage::ALL
            .iter()
            .map(|&stage| (stage, self.evaluate(stage, form, specs)))
            .collect()
    }

    fn rung(&self, rung: FilterStage, form: &NormalizedForm, active: &[&BlockSpec]) -> Option<Hit> {
        active.iter().find_map(|spec| match rung {
            FilterStage::Exact => exact(form, spec),
            FilterStage::CaseInsensitive => case_insensitive(form, spec),
            FilterStage::Stemmed => stemmed(form, &spec.concept, spec.surfaces()),
            FilterStage::SynonymAware => {
                let mut candidates = spec.surfaces();
                if let Some(synonyms) = self.lexicon.synonyms_of(&spec.concept) {
                    candidates.extend(synonyms.iter().map(String::as_str));
                }
                stemmed(form, &spec.concept, candidates)
            }
            FilterStage::SemanticIntent => None,
        })
    }
}

fn exact(form: &NormalizedForm, spec: &BlockSpec) -> Option<Hit> {
    spec.surfaces()
        .into_iter()
        .find(|s| !s.is_empty() && form.raw.contains(s))
        .map(|s| Hit {
            concept: spec.concept.clone(),
            matched: s.to_string(),
        })
}

fn case_insensitive(form: &NormalizedForm, spec: &BlockSpec) -> Option<Hit> {
    spec.surfaces().into_iter().find_map(|s| {
        let key = lookup_key(s);
        let hit = match tokenize(&key).as_slice() {
            [] => false,
            [single] if *single == key => form.tokens.iter().any(|t| t == single),
            _ => form.text.contains(&key),
        };
        hit.then(|| Hit {
            concept: spec.concept.clone(),
            matched: key,
        })
    })
}

fn stemmed(form: &NormalizedForm, concept: &str, candidates: Vec<&str>) -> Option<Hit> {
    candidates.into_iter().find_map(|s| {
        let needle = stem_phrase(s);
        find_sequence(&form.stems, &needle).map(|at| Hit {
            concept: concept.to_string(),
            matched: form.tokens[at..at + needle.len()].join(" "),
        })
    })
}

fn blocklist_rationale(rung: FilterStage, matched: &str) -> String {
    match rung {
        FilterStage::Exact => format!("The gate recognises '{}' letter for letter and stays shut.", matched),
        FilterStage::CaseInsensitive => format!(
            "Shouting or whispering changes nothing: the gate hears '{}' in any case.",
            matched
        ),
        FilterStage::Stemmed => format!(
            "The gate strips '{}' down to its root and finds a forbidden word underneath.",
            matched
        ),
        FilterStage::SynonymAware => format!(
            "The gate knows its thesaurus: '{}' means the same thing as what it guards.",
            matched
        ),
        FilterStage::SemanticIntent => String::new(),
    }
}
