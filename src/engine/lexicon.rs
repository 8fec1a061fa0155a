//! Concept ⇄ surface-word database.
//!
//! Lookup folds case and collapses whitespace but never stems; stemmed matching
//! belongs to the filter ladder. Every surface maps to exactly one concept.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::errors::EngineError;
use super::normalizer::{lookup_key, tokenize};

/// One authoring entry as it appears in `lexicon.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LexiconEntry {
    pub concept: String,
    #[serde(default)]
    pub surfaces: Vec<String>,
}

/// Result of a thesaurus lookup: the word's concept and every other surface for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThesaurusEntry {
    pub concept: String,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    /// concept -> surfaces in authoring order, headword first
    concepts: BTreeMap<String, Vec<String>>,
    /// surface key -> concept
    index: HashMap<String, String>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a lexicon from authoring entries, failing on the first conflict.
    pub fn from_entries<I>(entries: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = LexiconEntry>,
    {
        let mut lexicon = Self::new();
        for entry in entries {
            lexicon.insert(&entry.concept, &entry.surfaces)?;
        }
        Ok(lexicon)
    }

    /// Add surfaces to a concept (created on first use, with itself as headword).
    ///
    /// Either every surface is added or, on error, none is.
    pub fn insert<S: AsRef<str>>(&mut self, concept: &str, surfaces: &[S]) -> Result<(), EngineError> {
        let concept_key = lookup_key(concept);
        if tokenize(&concept_key).is_empty() {
            return Err(EngineError::MalformedLexicon(format!(
                "blank concept id '{}'",
                concept
            )));
        }

        let mut pending: Vec<String> = Vec::with_capacity(surfaces.len() + 1);
        for raw in std::iter::once(concept).chain(surfaces.iter().map(AsRef::as_ref)) {
            let key = lookup_key(raw);
            if tokenize(&key).is_empty() {
                return Err(EngineError::MalformedLexicon(format!(
                    "blank surface under '{}'",
                    concept_key
                )));
            }
            if let Some(owner) = self.index.get(&key) {
                if owner != &concept_key {
                    return Err(EngineError::DuplicateSurface {
                        surface: key,
                        first: owner.clone(),
                        second: concept_key,
                    });
                }
                continue;
            }
            if !pending.contains(&key) {
                pending.push(key);
            }
        }

        let list = self.concepts.entry(concept_key.clone()).or_default();
        for key in pending {
            self.index.insert(key.clone(), concept_key.clone());
            list.push(key);
        }
        Ok(())
    }

    /// Every surface form of a concept, headword first.
    pub fn synonyms_of(&self, concept: &str) -> Option<&[String]> {
        self.concepts.get(&lookup_key(concept)).map(Vec::as_slice)
    }

    pub fn concept_of(&self, surface: &str) -> Option<&str> {
        self.index.get(&lookup_key(surface)).map(String::as_str)
    }

    pub fn contains_concept(&self, concept: &str) -> bool {
        self.concepts.contains_key(&lookup_key(concept))
    }

    /// Synonyms of `word` excluding the word itself, for hinting.
    pub fn thesaurus(&self, word: &str) -> Option<ThesaurusEntry> {
        let key = lookup_key(word);
        let concept = self.index.get(&key)?;
        let synonyms = self.concepts[concept]
            .iter()
            .filter(|s| **s != key)
            .cloned()
            .collect();
        Some(ThesaurusEntry {
            concept: concept.clone(),
            synonyms,
        })
    }

    /// Number of concepts.
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn concepts(&self) -> impl Iterator<Item = &str> {
        self.concepts.keys().map(String::as_str)
    }

    pub fn surfaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.index.iter().map(|(s, c)| (s.as_str(), c.as_str()))
    }
}
