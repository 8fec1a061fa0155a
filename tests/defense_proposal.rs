use wordwarden::engine::{canonical_world, ChallengeSession, DefenseReport, EngineConfig, Feedback};

const STRONG: &str = "A robust filter cannot rely on blocklists alone, because attackers simply swap in \
    synonyms the list never anticipated. It should check the semantic intent of each request, run a \
    trained classifier over the whole conversation history, and stack multiple layers so one miss is \
    caught elsewhere. Unclear cases go to human review before anything sensitive is released.";

const NARROW: &str = "A filter should lean on a trained classifier and on careful human review of the \
    borderline cases it flags. Beyond that I would simply add more forbidden words to the list every \
    week, ask the team to read the logs, keep the rules simple, publish them widely, and hope that \
    attackers eventually get bored and give up trying.";

fn at_exit() -> ChallengeSession {
    let mut session = ChallengeSession::new(canonical_world().unwrap(), EngineConfig::default(), 3);
    session.mark_room_completed("semantic_chamber").unwrap();
    session.enter("gorge_exit").unwrap();
    session
}

fn defense(feedback: Feedback) -> DefenseReport {
    match feedback {
        Feedback::Defense(r) => r,
        other => panic!("expected defense feedback, got {:?}", other),
    }
}

#[test]
fn exit_is_sealed_until_the_semantic_chamber_falls() {
    let mut session = ChallengeSession::new(canonical_world().unwrap(), EngineConfig::default(), 3);
    assert!(session.enter("gorge_exit").is_err());
}

#[test]
fn thorough_proposal_earns_the_flag() {
    let mut session = at_exit();
    let r = defense(session.submit(STRONG).unwrap());
    assert!(r.passed, "{}", r.message);
    assert_eq!(r.covered, vec!["semantic", "layered", "classifier", "context", "oversight"]);
    assert_eq!(r.score, 150);
    assert!(r.words >= 50);
    assert_eq!(r.flags_awarded, vec!["KNOW_THY_ENEMY"]);
    assert!(r.next_room.is_none());
    assert!(session.is_completed("gorge_exit"));
    assert_eq!(session.total_points(), 250);

    // Accepted once; later proposals change nothing
    assert!(matches!(session.submit(STRONG).unwrap(), Feedback::Idle { .. }));
    assert_eq!(session.total_points(), 250);
}

#[test]
fn short_proposal_is_rejected_even_with_enough_ideas() {
    let mut session = at_exit();
    let r = defense(
        session
            .submit("Use semantic intent checks, a trained classifier, and human review.")
            .unwrap(),
    );
    assert!(!r.passed);
    assert_eq!(r.covered, vec!["semantic", "classifier", "oversight"]);
    assert!(r.words < 50);
    assert_eq!(r.score, 0);
    assert_eq!(r.attempts, 1);
    assert!(r.flags_awarded.is_empty());
    assert!(!session.is_completed("gorge_exit"));
}

#[test]
fn long_proposal_needs_three_ideas() {
    let mut session = at_exit();
    let r = defense(session.submit(NARROW).unwrap());
    assert!(!r.passed);
    assert!(r.words >= 50);
    assert_eq!(r.covered, vec!["classifier", "oversight"]);
    assert!(r.missing.contains(&"semantic".to_string()));
    assert_eq!(session.attempts("gorge_exit"), 1);
    assert!(session.flags().is_empty());
}

#[test]
fn empty_proposal_is_not_an_attempt() {
    let mut session = at_exit();
    assert!(matches!(session.submit("  ").unwrap(), Feedback::Idle { .. }));
    assert_eq!(session.attempts("gorge_exit"), 0);
}
