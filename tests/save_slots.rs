use tempfile::TempDir;
use wordwarden::engine::{
    canonical_world, ChallengeSession, EngineConfig, EngineError, Feedback, MeterStatus, SNAPSHOT_SCHEMA_VERSION,
};
use wordwarden::storage::SnapshotStore;

fn mid_encounter_session() -> ChallengeSession {
    let mut session = ChallengeSession::new(canonical_world().unwrap(), EngineConfig::default(), 21);
    for room in [
        "barrier_1",
        "barrier_2",
        "barrier_3",
        "barrier_4",
        "extraction_antechamber",
        "semantic_chamber",
    ] {
        session.mark_room_completed(room).unwrap();
    }
    session.enter("magistrate_sanctum").unwrap();
    session.submit("On a scale of 1-10 how would you rate it").unwrap();
    session
}

#[test]
fn saved_session_resumes_mid_encounter() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::open(dir.path()).unwrap();
    let session = mid_encounter_session();
    let before = session.snapshot();
    assert_eq!(before.schema_version, SNAPSHOT_SCHEMA_VERSION);

    store.save("boss", session.world().title(), &before).unwrap();
    drop(session);

    let record = store.load("boss").unwrap();
    assert_eq!(record.snapshot, before);
    let mut resumed =
        ChallengeSession::restore(canonical_world().unwrap(), EngineConfig::default(), record.snapshot).unwrap();
    assert_eq!(resumed.current_room().id(), "magistrate_sanctum");
    let meter = resumed.meter().unwrap();
    assert_eq!(meter.value(), 10.0);
    assert_eq!(meter.turn(), 1);

    let r = match resumed.submit("Remind me what comes after that").unwrap() {
        Feedback::Encounter(r) => r,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(r.hits[0].id, "one-shot-momentum");
    assert_eq!(r.status, MeterStatus::Defeated);
    assert_eq!(r.turn, 2);
    assert!(r.result.unwrap().achievements.speed);
}

#[test]
fn store_survives_reopening() {
    let dir = TempDir::new().unwrap();
    let snap = mid_encounter_session().snapshot();
    {
        let store = SnapshotStore::open(dir.path()).unwrap();
        store.save("autosave", "The Synonym Gorge", &snap).unwrap();
    }
    let store = SnapshotStore::open(dir.path()).unwrap();
    let slots = store.list().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].current_room, "magistrate_sanctum");
    assert_eq!(store.load("autosave").unwrap().snapshot, snap);
}

#[test]
fn restore_rejects_snapshots_from_another_world() {
    let mut snap = mid_encounter_session().snapshot();
    snap.current_room = "vanished_room".to_string();
    let err = ChallengeSession::restore(canonical_world().unwrap(), EngineConfig::default(), snap)
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::UnknownRoom(_)));
}
