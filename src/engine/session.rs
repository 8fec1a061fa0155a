//! Challenge session: one player working through one world.
//!
//! The session owns every piece of mutable progress (attempt counts, bypass
//! vocabulary, completed rooms, flags, the active resistance meter) in a
//! [`SessionSnapshot`] that can be saved and restored whole. Rejected input is
//! never fatal: it produces feedback and the session stays playable.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::errors::EngineError;
use super::filters::{Block, FilterStage, Verdict};
use super::normalizer::{normalize, NormalizedForm};
use super::passphrase;
use super::resistance::{starting_value, EncounterResult, MeterStatus, ResistanceMeter};
use super::tactics::{ClassifierContext, TacticHit};
use super::vocabulary::BypassVocabulary;
use super::world::{Barrier, Defense, Encounter, Room, World};
use crate::logutil::escape_log;

/// Current snapshot layout version.
pub const SNAPSHOT_SCHEMA_VERSION: u8 = 1;

/// Tunables that are not part of the world definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Failed attempts needed for each hint level, ascending.
    pub hint_thresholds: Vec<u32>,
    /// Distinct bypass words needed for the vocabulary flag.
    pub vocabulary_flag_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hint_thresholds: vec![3, 5, 8],
            vocabulary_flag_threshold: 10,
        }
    }
}

/// Everything a session has accumulated. Plain data so it round-trips through bincode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub schema_version: u8,
    pub seed: u64,
    pub current_room: String,
    /// Failed submissions per room since it was last passed.
    pub attempts: BTreeMap<String, u32>,
    pub vocabulary: BypassVocabulary,
    pub completed_rooms: BTreeSet<String>,
    /// Earned flag id -> points.
    pub flags: BTreeMap<String, u32>,
    pub encounter: Option<ResistanceMeter>,
    pub results: Vec<EncounterResult>,
    /// Passphrase per encounter, generated or configured.
    pub passphrases: BTreeMap<String, String>,
    /// Encounters whose passphrase the player has extracted.
    pub extracted: BTreeSet<String>,
    /// Normalized text of the previous encounter submission.
    pub last_submission: Option<String>,
    pub tactics_discovered: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// Through the barrier. `bypass_word` is the substitute that slipped past,
    /// absent when only the request structure carried the phrase.
    Passed { bypass_word: Option<String> },
    Blocked(Block),
    /// Allowed by the filter but did not attempt the barrier's objective.
    Unfocused,
    /// Empty input.
    Silent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarrierReport {
    pub room: String,
    pub stage: FilterStage,
    pub outcome: BarrierOutcome,
    /// Failed attempts on this barrier after this submission.
    pub attempts: u32,
    /// Points for a newly discovered bypass word.
    pub vocabulary_points: Option<u32>,
    pub flags_awarded: Vec<String>,
    pub passphrase_revealed: Option<String>,
    pub next_room: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncounterReport {
    pub room: String,
    pub hits: Vec<TacticHit>,
    pub resistance: f64,
    pub requested_delta: f64,
    pub turn: u32,
    pub status: MeterStatus,
    pub passphrase_used: bool,
    pub flags_awarded: Vec<String>,
    pub result: Option<EncounterResult>,
    pub next_room: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefenseReport {
    pub room: String,
    pub passed: bool,
    /// Defense concepts the proposal covers, in the room's order.
    pub covered: Vec<String>,
    pub missing: Vec<String>,
    pub words: usize,
    /// Coverage score; zero unless the proposal passed.
    pub score: u32,
    pub attempts: u32,
    pub flags_awarded: Vec<String>,
    pub next_room: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    Barrier(BarrierReport),
    Encounter(EncounterReport),
    Defense(DefenseReport),
    Idle { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    /// 0 means no hint is unlocked yet.
    pub level: usize,
    pub text: String,
}

pub struct ChallengeSession {
    world: World,
    config: EngineConfig,
    state: SessionSnapshot,
}

fn fresh_state(world: &World, seed: u64) -> SessionSnapshot {
    let passphrases = world
        .rooms()
        .iter()
        .filter_map(Room::as_encounter)
        .filter_map(|e| {
            let phrase = match &e.passphrase {
                Some(p) => p.clone(),
                None if e.generate_passphrase => passphrase::generate(seed, &e.id),
                None => return None,
            };
            Some((e.id.clone(), phrase))
        })
        .collect();
    SessionSnapshot {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        seed,
        current_room: world.first_room().id().to_string(),
        attempts: BTreeMap::new(),
        vocabulary: BypassVocabulary::default(),
        completed_rooms: BTreeSet::new(),
        flags: BTreeMap::new(),
        encounter: None,
        results: Vec::new(),
        passphrases,
        extracted: BTreeSet::new(),
        last_submission: None,
        tactics_discovered: BTreeSet::new(),
    }
}

impl ChallengeSession {
    pub fn new(world: World, config: EngineConfig, seed: u64) -> Self {
        let state = fresh_state(&world, seed);
        let mut session = Self { world, config, state };
        session.open_current_room();
        info!(
            "New session in '{}' starting at '{}'",
            session.world.title(),
            session.state.current_room
        );
        session
    }

    /// Resume from a saved snapshot.
    pub fn restore(world: World, config: EngineConfig, snapshot: SessionSnapshot) -> Result<Self, EngineError> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "session",
                expected: SNAPSHOT_SCHEMA_VERSION,
                found: snapshot.schema_version,
            });
        }
        if world.room(&snapshot.current_room).is_none() {
            return Err(EngineError::UnknownRoom(snapshot.current_room));
        }
        if let Some(meter) = &snapshot.encounter {
            if meter.encounter() != snapshot.current_room {
                return Err(EngineError::UnknownRoom(meter.encounter().to_string()));
            }
        }
        Ok(Self {
            world,
            config,
            state: snapshot,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.clone()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn current_room(&self) -> &Room {
        // current_room is validated on construction, restore and enter
        self.world
            .room(&self.state.current_room)
            .unwrap_or_else(|| self.world.first_room())
    }

    pub fn meter(&self) -> Option<&ResistanceMeter> {
        self.state.encounter.as_ref()
    }

    pub fn attempts(&self, room: &str) -> u32 {
        self.state.attempts.get(room).copied().unwrap_or(0)
    }

    pub fn vocabulary(&self) -> &BypassVocabulary {
        &self.state.vocabulary
    }

    pub fn flags(&self) -> &BTreeMap<String, u32> {
        &self.state.flags
    }

    pub fn total_points(&self) -> u32 {
        self.state.flags.values().sum()
    }

    pub fn results(&self) -> &[EncounterResult] {
        &self.state.results
    }

    pub fn is_completed(&self, room: &str) -> bool {
        self.state.completed_rooms.contains(room)
    }

    pub fn tactics_discovered(&self) -> &BTreeSet<String> {
        &self.state.tactics_discovered
    }

    /// The passphrase of `encounter`, once the player has extracted it.
    pub fn known_passphrase(&self, encounter: &str) -> Option<&str> {
        if self.state.extracted.contains(encounter) {
            self.state.passphrases.get(encounter).map(String::as_str)
        } else {
            None
        }
    }

    /// Move to `room`. Walking out of a live encounter forfeits it.
    pub fn enter(&mut self, room: &str) -> Result<&Room, EngineError> {
        let target = self
            .world
            .room(room)
            .ok_or_else(|| EngineError::UnknownRoom(room.to_string()))?;
        if let Some(req) = target.requires() {
            if !self.state.completed_rooms.contains(req) {
                return Err(EngineError::RoomLocked {
                    room: room.to_string(),
                    requires: req.to_string(),
                });
            }
        }
        if self.state.current_room != room {
            self.leave_current_room();
            self.state.current_room = room.to_string();
            self.open_current_room();
            debug!("Entered '{}'", room);
        }
        Ok(self.current_room())
    }

    /// Count a room as done without playing it, e.g. when an outside mini-game finishes it.
    pub fn mark_room_completed(&mut self, room: &str) -> Result<bool, EngineError> {
        if self.world.room(room).is_none() {
            return Err(EngineError::UnknownRoom(room.to_string()));
        }
        Ok(self.state.completed_rooms.insert(room.to_string()))
    }

    /// Hint for the current room, chosen only by how many attempts have failed.
    pub fn hint(&self) -> Hint {
        let room = self.current_room();
        let attempts = self.attempts(room.id());
        let level = self
            .config
            .hint_thresholds
            .iter()
            .filter(|&&t| attempts >= t)
            .count();
        let hints = room.hints();
        let text = if level == 0 || hints.is_empty() {
            "Keep trying. Every refusal tells you something about how the guardian listens.".to_string()
        } else {
            hints[level.min(hints.len()) - 1].clone()
        };
        Hint { level, text }
    }

    /// Walk away from the current encounter.
    pub fn forfeit(&mut self) -> Result<EncounterResult, EngineError> {
        let room_id = self.state.current_room.clone();
        if self.world.room(&room_id).and_then(Room::as_encounter).is_none() {
            return Err(EngineError::NotAnEncounter(room_id));
        }
        let meter = self.state.encounter.as_mut().ok_or(EngineError::NoActiveEncounter)?;
        meter.forfeit()?;
        let result = self.conclude_meter();
        info!("Forfeited '{}' after {} turns", room_id, result.turns);
        Ok(result)
    }

    /// Start the current encounter over with a fresh meter. Returns the starting resistance.
    pub fn retry_encounter(&mut self) -> Result<f64, EngineError> {
        let room_id = self.state.current_room.clone();
        let encounter = self
            .world
            .room(&room_id)
            .and_then(Room::as_encounter)
            .cloned()
            .ok_or_else(|| EngineError::NotAnEncounter(room_id.clone()))?;
        if self.state.encounter.as_ref().is_some_and(ResistanceMeter::is_active) {
            if let Some(meter) = self.state.encounter.as_mut() {
                meter.forfeit()?;
            }
            self.conclude_meter();
        }
        self.start_meter(&encounter);
        Ok(self.state.encounter.as_ref().map_or(0.0, ResistanceMeter::value))
    }

    /// Throw away all progress and start again with the same seed.
    pub fn restart(&mut self) {
        self.state = fresh_state(&self.world, self.state.seed);
        self.open_current_room();
        info!("Session restarted");
    }

    /// Evaluate one line of player input against the current room.
    pub fn submit(&mut self, input: &str) -> Result<Feedback, EngineError> {
        let form = normalize(input);
        match self.current_room().clone() {
            Room::Barrier(barrier) => Ok(Feedback::Barrier(self.submit_barrier(&barrier, &form))),
            Room::Encounter(encounter) => self.submit_encounter(&encounter, &form),
            Room::Defense(defense) => Ok(self.submit_defense(&defense, &form)),
        }
    }

    fn submit_barrier(&mut self, barrier: &Barrier, form: &NormalizedForm) -> BarrierReport {
        let outcome = if form.is_empty() {
            BarrierOutcome::Silent
        } else {
            match self.world.ladder().evaluate(barrier.stage, form, &barrier.blocked) {
                Verdict::Block(block) => BarrierOutcome::Blocked(block),
                Verdict::Allow if form.token_count() < barrier.objective.min_tokens => BarrierOutcome::Unfocused,
                Verdict::Allow => {
                    let bypass_word = self.world.bypass_match(barrier, form);
                    if bypass_word.is_some() || self.world.objective_match(barrier, form).is_some() {
                        BarrierOutcome::Passed { bypass_word }
                    } else {
                        BarrierOutcome::Unfocused
                    }
                }
            }
        };

        let mut report = BarrierReport {
            room: barrier.id.clone(),
            stage: barrier.stage,
            outcome: outcome.clone(),
            attempts: 0,
            vocabulary_points: None,
            flags_awarded: Vec::new(),
            passphrase_revealed: None,
            next_room: None,
            message: String::new(),
        };

        let bypass_word = match outcome {
            BarrierOutcome::Passed { bypass_word } => bypass_word,
            failed => {
                let attempts = self.state.attempts.entry(barrier.id.clone()).or_insert(0);
                *attempts += 1;
                report.attempts = *attempts;
                report.message = match failed {
                    BarrierOutcome::Blocked(block) => block.rationale,
                    BarrierOutcome::Silent => "Silence does not move the barrier. Say something.".to_string(),
                    _ => "Your words pass through without triggering anything, but they do not ask for \
                          anything either. Try a phrase that actually attempts to get through."
                        .to_string(),
                };
                debug!(
                    "'{}' attempt {} failed for '{}'",
                    barrier.id,
                    report.attempts,
                    escape_log(&form.raw)
                );
                return report;
            }
        };

        info!("'{}' passed with '{}'", barrier.id, escape_log(&form.raw));
        self.state.attempts.remove(&barrier.id);
        self.state.completed_rooms.insert(barrier.id.clone());
        if let Some(word) = &bypass_word {
            report.vocabulary_points = self.state.vocabulary.record(word, &barrier.id);
        }
        if let Some(flag) = &barrier.award_flag {
            self.award(flag, &mut report.flags_awarded);
        }
        self.check_vocabulary_flag(&mut report.flags_awarded);

        if let Some(target) = &barrier.reveals_passphrase_of {
            if let Some(phrase) = self.state.passphrases.get(target).cloned() {
                self.state.extracted.insert(target.clone());
                report.passphrase_revealed = Some(phrase);
            }
        }

        report.message = match &bypass_word {
            Some(word) => format!("The barrier dissolves. '{}' was not on its list.", word),
            None => "The barrier dissolves. Nothing you said was on its list.".to_string(),
        };
        report.next_room = self.advance();
        report
    }

    fn submit_encounter(&mut self, encounter: &Encounter, form: &NormalizedForm) -> Result<Feedback, EngineError> {
        let meter = self.state.encounter.as_ref().ok_or(EngineError::NoActiveEncounter)?;
        if !meter.is_active() {
            return Err(EngineError::EncounterConcluded(encounter.id.clone()));
        }
        if form.is_empty() {
            return Ok(Feedback::Idle {
                message: format!("{} waits for you to speak.", encounter.name),
            });
        }

        let after_refusal = meter.last_turn_refused();
        let hits = {
            let classifier = self.world.classifier_for(encounter);
            let ctx = ClassifierContext {
                after_refusal,
                previous_text: self.state.last_submission.as_deref(),
            };
            classifier.classify(form, &ctx)
        };

        let meter = self.state.encounter.as_mut().ok_or(EngineError::NoActiveEncounter)?;
        let passphrase_used = meter.try_passphrase(form)?;
        let (hits, requested_delta) = if passphrase_used {
            (Vec::new(), 0.0)
        } else {
            let record = meter.apply(hits)?;
            (record.hits.clone(), record.requested_delta)
        };
        let (resistance, turn, status) = (meter.value(), meter.turn(), meter.status());
        self.state.last_submission = Some(form.text.clone());

        let mut flags_awarded = Vec::new();
        for hit in hits.iter().filter(|h| h.hidden) {
            if self.state.tactics_discovered.insert(hit.id.clone()) {
                info!("Hidden tactic '{}' discovered", hit.id);
            }
            let reward = self.world.tactics().get(&hit.id).and_then(|t| t.reward_flag.clone());
            if let Some(flag) = reward {
                self.award(&flag, &mut flags_awarded);
            }
        }
        if requested_delta >= 0.0 && status == MeterStatus::Active {
            *self.state.attempts.entry(encounter.id.clone()).or_insert(0) += 1;
        }

        let mut report = EncounterReport {
            room: encounter.id.clone(),
            hits,
            resistance,
            requested_delta,
            turn,
            status,
            passphrase_used,
            flags_awarded,
            result: None,
            next_room: None,
            message: String::new(),
        };

        if status == MeterStatus::Defeated {
            let result = self.conclude_meter();
            self.state.attempts.remove(&encounter.id);
            self.state.completed_rooms.insert(encounter.id.clone());
            let awards = &encounter.awards;
            let a = result.achievements;
            for (earned, flag) in [
                (true, &awards.victory),
                (a.speed, &awards.speed),
                (a.one_shot, &awards.one_shot),
                (a.flawless, &awards.flawless),
                (a.pacifist, &awards.pacifist),
            ] {
                if let (true, Some(flag)) = (earned, flag) {
                    self.award(flag, &mut report.flags_awarded);
                }
            }
            info!(
                "'{}' defeated in {} turns (passphrase: {})",
                encounter.id, result.turns, result.passphrase_used
            );
            report.message = if passphrase_used {
                format!("You speak the passphrase. {} lowers its gavel and steps aside.", encounter.name)
            } else {
                format!("{}'s resistance collapses. The way is open.", encounter.name)
            };
            report.result = Some(result);
            report.next_room = self.advance();
        } else {
            report.message = if report.hits.is_empty() {
                format!("{} is unmoved. Resistance holds at {:.0}.", encounter.name, resistance)
            } else if requested_delta < 0.0 {
                format!("{} wavers. Resistance falls to {:.0}.", encounter.name, resistance)
            } else if requested_delta > 0.0 {
                format!("{} bristles. Resistance rises to {:.0}.", encounter.name, resistance)
            } else {
                format!("{} considers this. Resistance stays at {:.0}.", encounter.name, resistance)
            };
        }
        Ok(Feedback::Encounter(report))
    }

    fn submit_defense(&mut self, defense: &Defense, form: &NormalizedForm) -> Feedback {
        if form.is_empty() {
            return Feedback::Idle {
                message: format!("{} waits for your proposal.", defense.name),
            };
        }
        if self.state.completed_rooms.contains(&defense.id) {
            return Feedback::Idle {
                message: "Your proposal has already been accepted.".to_string(),
            };
        }

        let covered = self.world.defense_coverage(defense, form);
        let missing: Vec<String> = defense
            .concepts
            .iter()
            .filter(|c| !covered.contains(c))
            .cloned()
            .collect();
        let words = form.text.split_whitespace().count();
        let passed = covered.len() >= defense.min_concepts && words >= defense.min_words;

        let mut report = DefenseReport {
            room: defense.id.clone(),
            passed,
            score: if passed { defense.score(covered.len()) } else { 0 },
            covered,
            missing,
            words,
            attempts: 0,
            flags_awarded: Vec::new(),
            next_room: None,
            message: String::new(),
        };

        if !passed {
            let attempts = self.state.attempts.entry(defense.id.clone()).or_insert(0);
            *attempts += 1;
            report.attempts = *attempts;
            report.message = if words < defense.min_words {
                format!(
                    "The Keeper wants at least {} words; you wrote {}.",
                    defense.min_words, words
                )
            } else {
                format!(
                    "Your proposal covers {} of the {} ideas the Keeper is looking for.",
                    report.covered.len(),
                    defense.min_concepts
                )
            };
            debug!(
                "'{}' proposal rejected: {} words, {} concepts",
                defense.id,
                words,
                report.covered.len()
            );
            return Feedback::Defense(report);
        }

        info!(
            "'{}' proposal accepted with {} concepts ({} points)",
            defense.id,
            report.covered.len(),
            report.score
        );
        self.state.attempts.remove(&defense.id);
        self.state.completed_rooms.insert(defense.id.clone());
        if let Some(flag) = &defense.award_flag {
            self.award(flag, &mut report.flags_awarded);
        }
        report.message = "The Keeper nods. You understand why a list of words was never enough.".to_string();
        report.next_room = self.advance();
        Feedback::Defense(report)
    }

    /// Record the concluded meter's result.
    fn conclude_meter(&mut self) -> EncounterResult {
        let result = self
            .state
            .encounter
            .as_ref()
            .and_then(ResistanceMeter::result);
        match result {
            Some(result) => {
                self.state.results.push(result.clone());
                result
            }
            // callers only conclude meters they just moved out of Active
            None => EncounterResult {
                encounter: self.state.current_room.clone(),
                success: false,
                tactic_log: Vec::new(),
                turns: 0,
                passphrase_used: false,
                forfeited: true,
                starting_resistance: 0.0,
                achievements: Default::default(),
            },
        }
    }

    fn award(&mut self, flag: &str, awarded: &mut Vec<String>) {
        if self.state.flags.contains_key(flag) {
            return;
        }
        let points = self.world.flag(flag).map_or(0, |f| f.points);
        self.state.flags.insert(flag.to_string(), points);
        awarded.push(flag.to_string());
        info!("Flag {} earned (+{} points)", flag, points);
    }

    fn check_vocabulary_flag(&mut self, awarded: &mut Vec<String>) {
        if self.state.vocabulary.len() < self.config.vocabulary_flag_threshold {
            return;
        }
        if let Some(flag) = self.world.vocabulary_flag().map(str::to_string) {
            self.award(&flag, awarded);
        }
    }

    /// Move to the next room on the route, if there is one.
    fn advance(&mut self) -> Option<String> {
        let next = self.world.next_room(&self.state.current_room)?.id().to_string();
        self.leave_current_room();
        self.state.current_room = next.clone();
        self.open_current_room();
        Some(next)
    }

    fn leave_current_room(&mut self) {
        if let Some(mut meter) = self.state.encounter.take() {
            if meter.is_active() && meter.forfeit().is_ok() {
                if let Some(result) = meter.result() {
                    info!("Left '{}' mid-encounter; counted as forfeit", meter.encounter());
                    self.state.results.push(result);
                }
            }
        }
        self.state.last_submission = None;
    }

    fn open_current_room(&mut self) {
        let encounter = self
            .world
            .room(&self.state.current_room)
            .and_then(Room::as_encounter)
            .cloned();
        if let Some(encounter) = encounter {
            self.start_meter(&encounter);
        }
    }

    fn start_meter(&mut self, encounter: &Encounter) {
        let done = encounter
            .prep_rooms
            .iter()
            .filter(|r| self.state.completed_rooms.contains(*r))
            .count();
        let start = starting_value(
            encounter.base_resistance,
            done,
            encounter.prep_rooms.len(),
            encounter.max_reduction,
        );
        let mut meter = ResistanceMeter::new(&encounter.id, start);
        if self.state.extracted.contains(&encounter.id) {
            if let Some(phrase) = self.state.passphrases.get(&encounter.id) {
                meter.arm_passphrase(phrase);
            }
        }
        info!(
            "Encounter '{}' opens at resistance {:.1} ({}/{} prep rooms)",
            encounter.id,
            start,
            done,
            encounter.prep_rooms.len()
        );
        self.state.encounter = Some(meter);
        self.state.last_submission = None;
    }
}
