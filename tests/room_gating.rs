use wordwarden::engine::{canonical_world, ChallengeSession, EngineConfig, EngineError, ErrorKind};

fn session() -> ChallengeSession {
    ChallengeSession::new(canonical_world().unwrap(), EngineConfig::default(), 0)
}

#[test]
fn sealed_rooms_name_their_requirement() {
    let mut s = session();
    for (room, requires) in [
        ("barrier_2", "barrier_1"),
        ("extraction_antechamber", "barrier_4"),
        ("magistrate_sanctum", "semantic_chamber"),
    ] {
        match s.enter(room) {
            Err(EngineError::RoomLocked { requires: r, .. }) => assert_eq!(r, requires),
            other => panic!("{} should be sealed, got {:?}", room, other.map(|r| r.id().to_string())),
        }
    }
    let err = s.enter("magistrate_sanctum").map(|_| ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionState);
    assert_eq!(s.current_room().id(), "barrier_1");
}

#[test]
fn completing_the_requirement_opens_the_room() {
    let mut s = session();
    s.mark_room_completed("barrier_4").unwrap();
    assert_eq!(s.enter("extraction_antechamber").unwrap().id(), "extraction_antechamber");
    assert_eq!(s.enter("semantic_chamber").unwrap().id(), "semantic_chamber");
    assert!(s.meter().is_none());
}

#[test]
fn unknown_rooms_are_configuration_errors() {
    let mut s = session();
    let err = s.enter("the_void").map(|_| ()).unwrap_err();
    assert!(err.is_configuration());
    assert!(s.mark_room_completed("the_void").is_err());
}

#[test]
fn first_barrier_needs_no_key() {
    let mut s = session();
    s.enter("barrier_2").map(|_| ()).unwrap_err();
    assert_eq!(s.enter("barrier_1").unwrap().id(), "barrier_1");
}
