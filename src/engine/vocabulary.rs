//! Bypass vocabulary: every distinct word that has opened a barrier this session.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::normalizer::lookup_key;

const BASE_WORD_POINTS: u32 = 10;
const MAX_WORD_POINTS: u32 = 25;

/// Longer words are rarer and score more.
pub fn word_points(word: &str) -> u32 {
    let len = u32::try_from(word.chars().count()).unwrap_or(u32::MAX);
    BASE_WORD_POINTS.saturating_add(len).min(MAX_WORD_POINTS)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassVocabulary {
    words: BTreeSet<String>,
    /// Discovery order per room.
    by_room: BTreeMap<String, Vec<String>>,
    score: u32,
}

impl BypassVocabulary {
    /// Record `word` as used to pass `room`. Returns the points scored if it is new.
    pub fn record(&mut self, word: &str, room: &str) -> Option<u32> {
        let key = lookup_key(word);
        if key.is_empty() || self.words.contains(&key) {
            return None;
        }
        let points = word_points(&key);
        self.score += points;
        self.by_room.entry(room.to_string()).or_default().push(key.clone());
        self.words.insert(key);
        Some(points)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&lookup_key(word))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    pub fn discovered_in(&self, room: &str) -> &[String] {
        self.by_room.get(room).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_counted_once_case_insensitively() {
        let mut v = BypassVocabulary::default();
        assert_eq!(v.record("Divulge", "barrier_3"), Some(17));
        assert_eq!(v.record("divulge", "barrier_4"), None);
        assert_eq!(v.len(), 1);
        assert!(v.contains("DIVULGE"));
        assert_eq!(v.discovered_in("barrier_3"), &["divulge"]);
        assert!(v.discovered_in("barrier_4").is_empty());
    }

    #[test]
    fn points_are_capped() {
        assert_eq!(word_points("key"), 13);
        assert_eq!(word_points("antidisestablishmentarianism"), 25);
        let mut v = BypassVocabulary::default();
        v.record("key", "a");
        v.record("recondite", "b");
        assert_eq!(v.score(), 13 + 19);
    }
}
