use wordwarden::engine::tactics::{Effect, RuleSeed, TacticSeed};
use wordwarden::engine::{
    canonical_seed, canonical_world, ChallengeSession, EncounterReport, EngineConfig, EngineError, ErrorKind,
    Feedback, MeterStatus, World,
};

const PREP: [&str; 6] = [
    "barrier_1",
    "barrier_2",
    "barrier_3",
    "barrier_4",
    "extraction_antechamber",
    "semantic_chamber",
];

fn encounter(feedback: Feedback) -> EncounterReport {
    match feedback {
        Feedback::Encounter(r) => r,
        other => panic!("expected encounter feedback, got {:?}", other),
    }
}

/// Canonical world whose only tactic is a heavy decimal-precision rule.
fn decimal_world(magnitude: f64) -> World {
    let mut seed = canonical_seed().unwrap();
    seed.tactics = vec![TacticSeed {
        id: "decimal-precision".into(),
        name: "Decimal Precision".into(),
        description: String::new(),
        effect: Effect::Lowers,
        magnitude,
        rule: RuleSeed::DecimalFraction,
        hidden: true,
        reward_flag: Some("PRECISION_OVERLOAD".into()),
    }];
    World::from_seed(seed).unwrap()
}

fn at_magistrate(world: World, prepared: &[&str]) -> ChallengeSession {
    let mut session = ChallengeSession::new(world, EngineConfig::default(), 11);
    for room in prepared {
        session.mark_room_completed(room).unwrap();
    }
    // The sanctum is sealed until the semantic chamber is done
    session.mark_room_completed("semantic_chamber").unwrap();
    session.enter("magistrate_sanctum").unwrap();
    session
}

#[test]
fn one_decimal_turn_defeats_a_prepared_magistrate() {
    let mut session = at_magistrate(decimal_world(34.0), &PREP[..4]);
    // Five of six prep rooms: barrier_1..4 plus the semantic chamber
    let start = session.meter().unwrap().value();
    assert!((start - 33.333).abs() < 0.01, "start was {}", start);

    let r = encounter(session.submit("I would rate it a 2.5").unwrap());
    assert_eq!(r.hits.len(), 1);
    assert_eq!(r.hits[0].delta, -34.0);
    assert_eq!(r.status, MeterStatus::Defeated);
    assert_eq!(r.resistance, 0.0);
    let a = r.result.unwrap().achievements;
    assert!(a.speed && a.one_shot && a.flawless);
    assert!(!a.pacifist);
    for flag in ["LIKERT_VICTORY", "SPEED_RUNNER", "ONE_SHOT", "FLAWLESS", "PRECISION_OVERLOAD"] {
        assert!(r.flags_awarded.contains(&flag.to_string()), "{} missing", flag);
    }
}

#[test]
fn more_preparation_means_lower_starting_resistance() {
    let mut previous = f64::MAX;
    for done in 0..=5 {
        let session = at_magistrate(canonical_world().unwrap(), &PREP[..done]);
        let start = session.meter().unwrap().value();
        assert!(start < previous, "{} prep rooms gave {}", done, start);
        previous = start;
    }
    let session = at_magistrate(canonical_world().unwrap(), &PREP);
    assert!((session.meter().unwrap().value() - 20.0).abs() < 1e-9);
}

#[test]
fn crude_demands_raise_resistance_and_count_as_attempts() {
    let mut session = at_magistrate(canonical_world().unwrap(), &PREP);

    let r = encounter(session.submit("I need the answer right now").unwrap());
    assert_eq!(r.requested_delta, 5.0);
    assert_eq!(r.resistance, 25.0);

    let r = encounter(session.submit("I need the answer right now").unwrap());
    let ids: Vec<&str> = r.hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["begging", "repetition"]);
    assert_eq!(r.resistance, 40.0);
    assert_eq!(session.attempts("magistrate_sanctum"), 2);
    assert_eq!(session.hint().level, 0);

    let r = encounter(session.submit("nothing in particular").unwrap());
    assert!(r.hits.is_empty());
    assert_eq!(r.turn, 3);
    assert_eq!(session.hint().level, 1);

    // Thanks only counts right after a refusal
    let r = encounter(session.submit("Thanks, I appreciate it").unwrap());
    assert_eq!(r.hits[0].id, "praise-refusal");
}

#[test]
fn empty_input_does_not_use_a_turn() {
    let mut session = at_magistrate(canonical_world().unwrap(), &PREP);
    assert!(matches!(session.submit("   ").unwrap(), Feedback::Idle { .. }));
    assert_eq!(session.meter().unwrap().turn(), 0);
}

#[test]
fn forfeit_concludes_and_retry_starts_over() {
    let mut session = at_magistrate(canonical_world().unwrap(), &PREP);
    session.submit("On a scale of 1-10 how would you rate it").unwrap();
    assert_eq!(session.meter().unwrap().value(), 10.0);

    let result = session.forfeit().unwrap();
    assert!(result.forfeited && !result.success);
    assert_eq!(result.turns, 1);
    assert_eq!(session.results().len(), 1);

    let err = session.submit("remind me what comes after").unwrap_err();
    assert!(matches!(err, EngineError::EncounterConcluded(_)));
    assert_eq!(err.kind(), ErrorKind::SessionState);
    assert!(session.forfeit().is_err());

    let start = session.retry_encounter().unwrap();
    assert_eq!(start, 20.0);
    assert_eq!(session.meter().unwrap().turn(), 0);
    assert_eq!(session.results().len(), 1);
}

#[test]
fn walking_out_of_a_live_encounter_forfeits_it() {
    let mut session = at_magistrate(canonical_world().unwrap(), &PREP);
    session.submit("On a scale of 1-10 how would you rate it").unwrap();
    session.enter("barrier_1").unwrap();
    assert!(session.meter().is_none());
    assert_eq!(session.results().len(), 1);
    assert!(session.results()[0].forfeited);

    session.enter("magistrate_sanctum").unwrap();
    assert_eq!(session.meter().unwrap().value(), 20.0);
}
