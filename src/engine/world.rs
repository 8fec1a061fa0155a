//! Immutable world definition: lexicon, intent table, tactic catalog, flag
//! catalog and the ordered route of rooms.
//!
//! A world is validated in full when it is built. Any broken reference is a
//! configuration error, so a session never plays a half-defined barrier.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::errors::EngineError;
use super::filters::{BlockSpec, FilterLadder, FilterStage};
use super::intent::IntentTable;
use super::lexicon::Lexicon;
use super::normalizer::{stem_phrase, NormalizedForm};
use super::seed_loader::WorldSeed;
use super::tactics::{TacticCatalog, TacticClassifier};

fn default_min_tokens() -> usize {
    1
}

/// What a phrase must attempt, beyond slipping past the filter, to open a barrier.
///
/// `words` are request structure: they let a phrase through without being
/// scored. `bypass_words`, together with every lexicon synonym of a blocked
/// concept, are the substitutes that get recorded in the bypass vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    #[serde(default)]
    pub words: Vec<String>,
    #[serde(default)]
    pub bypass_words: Vec<String>,
    /// Also accept every lexicon synonym of each request word.
    #[serde(default)]
    pub include_synonyms: bool,
    #[serde(default = "default_min_tokens")]
    pub min_tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barrier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub stage: FilterStage,
    #[serde(default)]
    pub blocked: Vec<BlockSpec>,
    pub objective: Objective,
    #[serde(default)]
    pub requires: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub award_flag: Option<String>,
    /// Passing this barrier arms the named encounter's passphrase.
    #[serde(default)]
    pub reveals_passphrase_of: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterAwards {
    #[serde(default)]
    pub victory: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub one_shot: Option<String>,
    #[serde(default)]
    pub flawless: Option<String>,
    #[serde(default)]
    pub pacifist: Option<String>,
}

impl EncounterAwards {
    fn all(&self) -> impl Iterator<Item = &String> {
        [&self.victory, &self.speed, &self.one_shot, &self.flawless, &self.pacifist]
            .into_iter()
            .flatten()
    }
}

fn default_base_resistance() -> f64 {
    100.0
}

fn default_max_reduction() -> f64 {
    80.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default = "default_base_resistance")]
    pub base_resistance: f64,
    #[serde(default = "default_max_reduction")]
    pub max_reduction: f64,
    /// Rooms whose completion lowers the starting resistance.
    #[serde(default)]
    pub prep_rooms: Vec<String>,
    /// Tactic ids in play; empty means the whole catalog.
    #[serde(default)]
    pub tactics: Vec<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub generate_passphrase: bool,
    #[serde(default)]
    pub awards: EncounterAwards,
}

fn default_min_words() -> usize {
    50
}

fn default_min_concepts() -> usize {
    3
}

fn default_points_per_concept() -> u32 {
    30
}

/// A written proposal scored by how many defensive lexicon concepts it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defense {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    pub concepts: Vec<String>,
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    #[serde(default = "default_min_concepts")]
    pub min_concepts: usize,
    #[serde(default = "default_points_per_concept")]
    pub points_per_concept: u32,
    #[serde(default)]
    pub max_points: Option<u32>,
    #[serde(default)]
    pub award_flag: Option<String>,
}

impl Defense {
    /// Score for a proposal covering `covered` concepts.
    pub fn score(&self, covered: usize) -> u32 {
        let raw = self.points_per_concept.saturating_mul(covered as u32);
        self.max_points.map_or(raw, |cap| raw.min(cap))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Room {
    Barrier(Barrier),
    Encounter(Encounter),
    Defense(Defense),
}

impl Room {
    pub fn id(&self) -> &str {
        match self {
            Room::Barrier(b) => &b.id,
            Room::Encounter(e) => &e.id,
            Room::Defense(d) => &d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Room::Barrier(b) => &b.name,
            Room::Encounter(e) => &e.name,
            Room::Defense(d) => &d.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Room::Barrier(b) => &b.description,
            Room::Encounter(e) => &e.description,
            Room::Defense(d) => &d.description,
        }
    }

    pub fn requires(&self) -> Option<&str> {
        match self {
            Room::Barrier(b) => b.requires.as_deref(),
            Room::Encounter(e) => e.requires.as_deref(),
            Room::Defense(d) => d.requires.as_deref(),
        }
    }

    pub fn hints(&self) -> &[String] {
        match self {
            Room::Barrier(b) => &b.hints,
            Room::Encounter(e) => &e.hints,
            Room::Defense(d) => &d.hints,
        }
    }

    pub fn as_barrier(&self) -> Option<&Barrier> {
        match self {
            Room::Barrier(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_encounter(&self) -> Option<&Encounter> {
        match self {
            Room::Encounter(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_defense(&self) -> Option<&Defense> {
        match self {
            Room::Defense(d) => Some(d),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub points: u32,
}

#[derive(Debug, Clone)]
pub struct World {
    title: String,
    lexicon: Lexicon,
    intents: IntentTable,
    tactics: TacticCatalog,
    flags: BTreeMap<String, FlagDef>,
    vocabulary_flag: Option<String>,
    rooms: Vec<Room>,
    index: HashMap<String, usize>,
}

impl World {
    pub fn from_seed(seed: WorldSeed) -> Result<Self, EngineError> {
        let lexicon = Lexicon::from_entries(seed.lexicon)?;
        let intents = IntentTable::from_seed(seed.intents)?;
        let tactics = TacticCatalog::from_seeds(seed.tactics, &lexicon)?;

        let mut flags = BTreeMap::new();
        for flag in seed.flags.flags {
            if flag.id.trim().is_empty() {
                return Err(EngineError::MalformedCatalog("flag with blank id".into()));
            }
            if flags.insert(flag.id.clone(), flag).is_some() {
                return Err(EngineError::MalformedCatalog("duplicate flag id".into()));
            }
        }

        if seed.rooms.is_empty() {
            return Err(EngineError::EmptyRoute);
        }
        let mut index = HashMap::new();
        for (i, room) in seed.rooms.iter().enumerate() {
            if room.id().trim().is_empty() {
                return Err(EngineError::MalformedRoom {
                    room: format!("#{}", i),
                    reason: "blank id".into(),
                });
            }
            if index.insert(room.id().to_string(), i).is_some() {
                return Err(EngineError::DuplicateRoom(room.id().to_string()));
            }
        }

        let world = Self {
            title: seed.title,
            lexicon,
            intents,
            tactics,
            flags,
            vocabulary_flag: seed.flags.vocabulary_flag,
            rooms: seed.rooms,
            index,
        };
        world.validate()?;
        Ok(world)
    }

    fn validate(&self) -> Result<(), EngineError> {
        for tactic in self.tactics.iter() {
            if let Some(flag) = &tactic.reward_flag {
                self.check_flag(flag, &format!("tactic '{}'", tactic.id))?;
            }
        }
        if let Some(flag) = &self.vocabulary_flag {
            self.check_flag(flag, "vocabulary_flag")?;
        }
        for room in &self.rooms {
            if let Some(req) = room.requires() {
                self.check_room(req)?;
            }
            match room {
                Room::Barrier(b) => self.validate_barrier(b)?,
                Room::Encounter(e) => self.validate_encounter(e)?,
                Room::Defense(d) => self.validate_defense(d)?,
            }
        }
        Ok(())
    }

    fn validate_barrier(&self, b: &Barrier) -> Result<(), EngineError> {
        let malformed = |reason: String| EngineError::MalformedRoom {
            room: b.id.clone(),
            reason,
        };
        let context = format!("barrier '{}'", b.id);

        if b.stage != FilterStage::SemanticIntent && b.blocked.is_empty() {
            return Err(malformed("blocklist stages need at least one blocked concept".into()));
        }
        for spec in &b.blocked {
            if !self.lexicon.contains_concept(&spec.concept) {
                return Err(EngineError::UnknownConcept {
                    concept: spec.concept.clone(),
                    context,
                });
            }
            if spec.surfaces().iter().any(|s| stem_phrase(s).is_empty()) {
                return Err(malformed(format!("blank surface under '{}'", spec.concept)));
            }
        }
        let objective = &b.objective;
        if objective.words.is_empty() && objective.bypass_words.is_empty() {
            return Err(malformed("objective needs request words or bypass words".into()));
        }
        if objective
            .words
            .iter()
            .chain(&objective.bypass_words)
            .any(|w| stem_phrase(w).is_empty())
        {
            return Err(malformed("objective words must not be blank".into()));
        }
        if let Some(flag) = &b.award_flag {
            self.check_flag(flag, &context)?;
        }
        if let Some(target) = &b.reveals_passphrase_of {
            let room = self.check_room(target)?;
            match room.as_encounter() {
                None => return Err(malformed(format!("'{}' is not an encounter", target))),
                Some(e) if e.passphrase.is_none() && !e.generate_passphrase => {
                    return Err(malformed(format!("'{}' has no passphrase to reveal", target)))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn validate_encounter(&self, e: &Encounter) -> Result<(), EngineError> {
        let malformed = |reason: &str| EngineError::MalformedRoom {
            room: e.id.clone(),
            reason: reason.to_string(),
        };
        let context = format!("encounter '{}'", e.id);

        if !(0.0..=100.0).contains(&e.base_resistance) {
            return Err(malformed("base_resistance must be within [0, 100]"));
        }
        if !e.max_reduction.is_finite() || e.max_reduction < 0.0 {
            return Err(malformed("max_reduction must be finite and non-negative"));
        }
        if e.passphrase.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(malformed("blank passphrase"));
        }
        for prep in &e.prep_rooms {
            self.check_room(prep)?;
            if prep == &e.id {
                return Err(malformed("an encounter cannot prepare for itself"));
            }
        }
        for id in &e.tactics {
            if self.tactics.get(id).is_none() {
                return Err(EngineError::UnknownTactic {
                    tactic: id.clone(),
                    context: context.clone(),
                });
            }
        }
        for flag in e.awards.all() {
            self.check_flag(flag, &context)?;
        }
        Ok(())
    }

    fn validate_defense(&self, d: &Defense) -> Result<(), EngineError> {
        let malformed = |reason: &str| EngineError::MalformedRoom {
            room: d.id.clone(),
            reason: reason.to_string(),
        };
        let context = format!("defense '{}'", d.id);

        if d.concepts.is_empty() {
            return Err(malformed("a defense room needs concepts to score"));
        }
        for concept in &d.concepts {
            if !self.lexicon.contains_concept(concept) {
                return Err(EngineError::UnknownConcept {
                    concept: concept.clone(),
                    context: context.clone(),
                });
            }
        }
        if d.min_concepts == 0 || d.min_concepts > d.concepts.len() {
            return Err(malformed("min_concepts must be between 1 and the number of concepts"));
        }
        if let Some(flag) = &d.award_flag {
            self.check_flag(flag, &context)?;
        }
        Ok(())
    }

    fn check_flag(&self, flag: &str, context: &str) -> Result<(), EngineError> {
        if self.flags.contains_key(flag) {
            Ok(())
        } else {
            Err(EngineError::UnknownFlag {
                flag: flag.to_string(),
                context: context.to_string(),
            })
        }
    }

    fn check_room(&self, id: &str) -> Result<&Room, EngineError> {
        self.room(id).ok_or_else(|| EngineError::UnknownRoom(id.to_string()))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn intents(&self) -> &IntentTable {
        &self.intents
    }

    pub fn tactics(&self) -> &TacticCatalog {
        &self.tactics
    }

    pub fn ladder(&self) -> FilterLadder<'_> {
        FilterLadder::new(&self.lexicon, &self.intents)
    }

    pub fn classifier_for(&self, encounter: &Encounter) -> TacticClassifier<'_> {
        self.tactics.classifier(&encounter.tactics, &self.lexicon)
    }

    pub fn flag(&self, id: &str) -> Option<&FlagDef> {
        self.flags.get(id)
    }

    pub fn flags(&self) -> impl Iterator<Item = &FlagDef> {
        self.flags.values()
    }

    pub fn vocabulary_flag(&self) -> Option<&str> {
        self.vocabulary_flag.as_deref()
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.index.get(id).map(|&i| &self.rooms[i])
    }

    pub fn first_room(&self) -> &Room {
        &self.rooms[0]
    }

    /// Room after `id` on the route, if any.
    pub fn next_room(&self, id: &str) -> Option<&Room> {
        self.index.get(id).and_then(|&i| self.rooms.get(i + 1))
    }

    /// Every barrier's block specs, for comparing a phrase across the ladder.
    pub fn all_block_specs(&self) -> Vec<BlockSpec> {
        self.rooms
            .iter()
            .filter_map(Room::as_barrier)
            .flat_map(|b| b.blocked.iter().cloned())
            .collect()
    }

    /// First request word the phrase uses, in text order, as the player wrote it.
    pub fn objective_match(&self, barrier: &Barrier, form: &NormalizedForm) -> Option<String> {
        let mut candidates: Vec<Vec<String>> = Vec::new();
        for word in &barrier.objective.words {
            candidates.push(stem_phrase(word));
            if barrier.objective.include_synonyms {
                let concept = self.lexicon.concept_of(word).unwrap_or(word.as_str());
                if let Some(synonyms) = self.lexicon.synonyms_of(concept) {
                    candidates.extend(synonyms.iter().map(|s| stem_phrase(s)));
                }
            }
        }
        first_in_text(&candidates, form)
    }

    /// First substitute for a blocked word the phrase uses: a configured bypass
    /// word or a lexicon synonym of a blocked concept that is not itself on the list.
    pub fn bypass_match(&self, barrier: &Barrier, form: &NormalizedForm) -> Option<String> {
        let mut candidates: Vec<Vec<String>> = barrier.objective.bypass_words.iter().map(|w| stem_phrase(w)).collect();
        for spec in &barrier.blocked {
            let blocked: Vec<Vec<String>> = spec.surfaces().iter().map(|s| stem_phrase(s)).collect();
            if let Some(synonyms) = self.lexicon.synonyms_of(&spec.concept) {
                candidates.extend(
                    synonyms
                        .iter()
                        .map(|s| stem_phrase(s))
                        .filter(|stems| !blocked.contains(stems)),
                );
            }
        }
        first_in_text(&candidates, form)
    }

    /// Defense concepts the proposal touches, in the room's order.
    pub fn defense_coverage(&self, defense: &Defense, form: &NormalizedForm) -> Vec<String> {
        defense
            .concepts
            .iter()
            .filter(|concept| {
                self.lexicon.synonyms_of(concept.as_str()).is_some_and(|surfaces| {
                    let candidates: Vec<Vec<String>> = surfaces.iter().map(|s| stem_phrase(s)).collect();
                    first_in_text(&candidates, form).is_some()
                })
            })
            .cloned()
            .collect()
    }
}

/// Earliest candidate stem sequence in the phrase, longest first at a tie,
/// returned as the tokens the player actually wrote.
fn first_in_text(candidates: &[Vec<String>], form: &NormalizedForm) -> Option<String> {
    (0..form.stems.len()).find_map(|pos| {
        candidates
            .iter()
            .filter(|c| !c.is_empty() && form.stems[pos..].starts_with(c))
            .max_by_key(|c| c.len())
            .map(|c| form.tokens[pos..pos + c.len()].join(" "))
    })
}
