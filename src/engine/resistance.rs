//! Boss resistance meter.
//!
//! `Active(value, turn)` moves to `Defeated` when the value reaches zero or an
//! armed passphrase is spoken, and to `Forfeited` when the player walks away.
//! Concluded meters reject every further operation without mutating.

use serde::{Deserialize, Serialize};

use super::errors::EngineError;
use super::normalizer::{lookup_key, NormalizedForm};
use super::tactics::TacticHit;

pub const MIN_RESISTANCE: f64 = 0.0;
pub const MAX_RESISTANCE: f64 = 100.0;
pub const SPEED_TURN_LIMIT: u32 = 3;

/// Starting value after preparation: `base - (done / total) * max_reduction`, clamped.
///
/// `done` is capped at `total`; with no prep rooms at all the base is returned.
pub fn starting_value(base: f64, done: usize, total: usize, max_reduction: f64) -> f64 {
    if total == 0 {
        return base.clamp(MIN_RESISTANCE, MAX_RESISTANCE);
    }
    let ratio = done.min(total) as f64 / total as f64;
    (base - ratio * max_reduction).clamp(MIN_RESISTANCE, MAX_RESISTANCE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeterStatus {
    Active,
    Defeated,
    Forfeited,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub hits: Vec<TacticHit>,
    /// Sum of hit deltas before clamping.
    pub requested_delta: f64,
    pub before: f64,
    pub after: f64,
    pub passphrase: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievements {
    pub flawless: bool,
    pub speed: bool,
    pub one_shot: bool,
    pub pacifist: bool,
}

/// Immutable summary of one boss attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterResult {
    pub encounter: String,
    pub success: bool,
    pub tactic_log: Vec<TacticHit>,
    pub turns: u32,
    pub passphrase_used: bool,
    pub forfeited: bool,
    pub starting_resistance: f64,
    pub achievements: Achievements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResistanceMeter {
    encounter: String,
    starting: f64,
    value: f64,
    turn: u32,
    status: MeterStatus,
    log: Vec<TurnRecord>,
    passphrase: Option<String>,
    passphrase_used: bool,
}

impl ResistanceMeter {
    pub fn new(encounter: impl Into<String>, starting: f64) -> Self {
        let starting = starting.clamp(MIN_RESISTANCE, MAX_RESISTANCE);
        Self {
            encounter: encounter.into(),
            starting,
            value: starting,
            turn: 0,
            status: MeterStatus::Active,
            log: Vec::new(),
            passphrase: None,
            passphrase_used: false,
        }
    }

    /// Allow `phrase` to end the encounter instantly.
    pub fn arm_passphrase(&mut self, phrase: &str) {
        let key = lookup_key(phrase);
        if !key.is_empty() {
            self.passphrase = Some(key);
        }
    }

    pub fn encounter(&self) -> &str {
        &self.encounter
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn starting(&self) -> f64 {
        self.starting
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn status(&self) -> MeterStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == MeterStatus::Active
    }

    pub fn is_armed(&self) -> bool {
        self.passphrase.is_some()
    }

    pub fn log(&self) -> &[TurnRecord] {
        &self.log
    }

    /// The guardian refused last turn: the encounter just opened, or the last
    /// turn did not lower resistance.
    pub fn last_turn_refused(&self) -> bool {
        self.log.last().map_or(true, |t| t.requested_delta >= 0.0)
    }

    fn ensure_active(&self) -> Result<(), EngineError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(EngineError::EncounterConcluded(self.encounter.clone()))
        }
    }

    /// Apply one turn's tactic hits. Zero hits still consume a turn.
    pub fn apply(&mut self, hits: Vec<TacticHit>) -> Result<&TurnRecord, EngineError> {
        self.ensure_active()?;
        let requested: f64 = hits.iter().map(|h| h.delta).sum();
        let before = self.value;
        self.value = (before + requested).clamp(MIN_RESISTANCE, MAX_RESISTANCE);
        self.turn += 1;
        if self.value <= MIN_RESISTANCE {
            self.status = MeterStatus::Defeated;
        }
        self.log.push(TurnRecord {
            turn: self.turn,
            hits,
            requested_delta: requested,
            before,
            after: self.value,
            passphrase: false,
        });
        Ok(&self.log[self.log.len() - 1])
    }

    /// Defeat the guardian if `form` is the armed passphrase. A miss changes nothing.
    pub fn try_passphrase(&mut self, form: &NormalizedForm) -> Result<bool, EngineError> {
        self.ensure_active()?;
        let matches = self
            .passphrase
            .as_deref()
            .is_some_and(|p| !form.text.is_empty() && form.text == p);
        if !matches {
            return Ok(false);
        }
        let before = self.value;
        self.turn += 1;
        self.value = MIN_RESISTANCE;
        self.status = MeterStatus::Defeated;
        self.passphrase_used = true;
        self.log.push(TurnRecord {
            turn: self.turn,
            hits: Vec::new(),
            requested_delta: 0.0,
            before,
            after: self.value,
            passphrase: true,
        });
        Ok(true)
    }

    pub fn forfeit(&mut self) -> Result<(), EngineError> {
        self.ensure_active()?;
        self.status = MeterStatus::Forfeited;
        Ok(())
    }

    pub fn achievements(&self) -> Achievements {
        let won = self.status == MeterStatus::Defeated;
        Achievements {
            flawless: won && self.log.iter().all(|t| t.requested_delta <= 0.0),
            speed: won && self.turn <= SPEED_TURN_LIMIT,
            one_shot: won && self.turn == 1,
            pacifist: won && self.passphrase_used,
        }
    }

    /// Summary once the meter has concluded.
    pub fn result(&self) -> Option<EncounterResult> {
        if self.is_active() {
            return None;
        }
        Some(EncounterResult {
            encounter: self.encounter.clone(),
            success: self.status == MeterStatus::Defeated,
            tactic_log: self.log.iter().flat_map(|t| t.hits.iter().cloned()).collect(),
            turns: self.turn,
            passphrase_used: self.passphrase_used,
            forfeited: self.status == MeterStatus::Forfeited,
            starting_resistance: self.starting,
            achievements: self.achievements(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::normalizer::normalize;

    fn hit(id: &str, delta: f64) -> TacticHit {
        TacticHit {
            id: id.into(),
            name: id.into(),
            delta,
            hidden: false,
        }
    }

    #[test]
    fn preparation_lowers_the_starting_value() {
        assert_eq!(starting_value(100.0, 0, 6, 80.0), 100.0);
        assert_eq!(starting_value(100.0, 6, 6, 80.0), 20.0);
        assert_eq!(starting_value(100.0, 9, 6, 80.0), 20.0);
        assert_eq!(starting_value(70.0, 0, 0, 80.0), 70.0);
        assert_eq!(starting_value(50.0, 6, 6, 80.0), 0.0);
        let five_of_six = starting_value(100.0, 5, 6, 80.0);
        assert!((five_of_six - 33.333).abs() < 0.01);
        assert!(starting_value(100.0, 2, 6, 80.0) > starting_value(100.0, 3, 6, 80.0));
    }

    #[test]
    fn value_stays_clamped() {
        let mut m = ResistanceMeter::new("boss", 90.0);
        m.apply(vec![hit("threat", 15.0), hit("jailbreak", 20.0)]).unwrap();
        assert_eq!(m.value(), 100.0);
        assert!(m.is_active());
        let rec = m.apply(vec![hit("combo", -150.0)]).unwrap();
        assert_eq!(rec.after, 0.0);
        assert_eq!(m.status(), MeterStatus::Defeated);
    }

    #[test]
    fn empty_turn_is_a_no_op_that_counts() {
        let mut m = ResistanceMeter::new("boss", 40.0);
        m.apply(Vec::new()).unwrap();
        assert_eq!(m.value(), 40.0);
        assert_eq!(m.turn(), 1);
        assert!(m.last_turn_refused());
    }

    #[test]
    fn concluded_meter_rejects_operations_without_mutating() {
        let mut m = ResistanceMeter::new("boss", 10.0);
        m.forfeit().unwrap();
        let before = m.clone();
        assert!(matches!(m.apply(vec![hit("x", -5.0)]), Err(EngineError::EncounterConcluded(_))));
        assert!(m.forfeit().is_err());
        assert!(m.try_passphrase(&normalize("anything")).is_err());
        assert_eq!(m, before);
        let result = m.result().unwrap();
        assert!(result.forfeited);
        assert!(!result.success);
    }

    #[test]
    fn passphrase_wins_regardless_of_value() {
        let mut m = ResistanceMeter::new("boss", 100.0);
        m.arm_passphrase("QUANTUM  Cascade");
        assert!(!m.try_passphrase(&normalize("quantum")).unwrap());
        assert_eq!(m.turn(), 0);
        assert!(m.try_passphrase(&normalize("  quantum cascade ")).unwrap());
        assert_eq!(m.status(), MeterStatus::Defeated);
        let a = m.achievements();
        assert!(a.pacifist && a.one_shot && a.speed && a.flawless);
        assert!(m.result().unwrap().passphrase_used);
    }

    #[test]
    fn unarmed_meter_ignores_passphrase_attempts() {
        let mut m = ResistanceMeter::new("boss", 100.0);
        assert!(!m.try_passphrase(&normalize("")).unwrap());
        assert!(m.is_active());
    }

    #[test]
    fn flawless_tolerates_net_zero_turns() {
        let mut m = ResistanceMeter::new("boss", 30.0);
        m.apply(vec![hit("likert", -10.0), hit("begging", 10.0)]).unwrap();
        m.apply(vec![hit("precision", -25.0)]).unwrap();
        assert!(m.is_active());
        m.apply(vec![hit("combo", -20.0)]).unwrap();
        let a = m.achievements();
        assert!(a.flawless);
        assert!(a.speed);
        assert!(!a.one_shot);
        assert!(!a.pacifist);
    }

    #[test]
    fn raising_turn_breaks_flawless() {
        let mut m = ResistanceMeter::new("boss", 20.0);
        m.apply(vec![hit("threat", 15.0)]).unwrap();
        for _ in 0..4 {
            m.apply(vec![hit("likert", -10.0)]).unwrap();
        }
        assert_eq!(m.status(), MeterStatus::Defeated);
        let a = m.achievements();
        assert!(!a.flawless);
        assert!(!a.speed);
        let result = m.result().unwrap();
        assert_eq!(result.turns, 5);
        assert_eq!(result.tactic_log.len(), 5);
        assert_eq!(result.tactic_log[0].id, "threat");
    }
}
