//! # Challenge Engine
//!
//! The challenge engine decides whether a line of player text gets past a
//! guardian. Barriers run it through a five-stage filter ladder; encounters
//! score it against a catalog of persuasion tactics and move a resistance
//! meter.
//!
//! ## Components
//!
//! - [`normalizer`] - Case folding, tokenization and stemming
//! - [`lexicon`] - Concept to surface-form thesaurus
//! - [`intent`] - Stage 5 intent patterns and structural rule
//! - [`filters`] - The filter ladder and its verdicts
//! - [`tactics`] - Tactic catalog and classifier
//! - [`resistance`] - Encounter meter and achievements
//! - [`world`] - Validated world definition built from seeds, including defense rooms
//! - [`seed_loader`] - JSON seed files, built in or from a directory
//! - [`session`] - Per-player progress and the submit loop
//!
//! ## Flow
//!
//! ```text
//! input ─▶ normalize ─▶ Barrier:   FilterLadder ─▶ objective ─▶ vocabulary / flags
//!                     ├▶ Encounter: TacticClassifier ─▶ ResistanceMeter ─▶ awards
//!                     └▶ Defense:   lexicon concept coverage ─▶ score / flag
//! ```

pub mod errors;
pub mod filters;
pub mod intent;
pub mod lexicon;
pub mod normalizer;
pub mod passphrase;
pub mod resistance;
pub mod seed_loader;
pub mod session;
pub mod tactics;
pub mod vocabulary;
pub mod world;

pub use errors::{EngineError, ErrorKind};
pub use filters::{Block, BlockSpec, FilterLadder, FilterStage, Verdict};
pub use intent::{IntentKind, IntentMatch, IntentTable};
pub use lexicon::{Lexicon, ThesaurusEntry};
pub use normalizer::{normalize, NormalizedForm};
pub use resistance::{EncounterResult, MeterStatus, ResistanceMeter};
pub use seed_loader::{canonical_seed, canonical_world, load_world_from_dir, write_canonical_seeds, WorldSeed};
pub use session::{
    BarrierOutcome, BarrierReport, ChallengeSession, DefenseReport, EncounterReport, EngineConfig, Feedback, Hint,
    SessionSnapshot, SNAPSHOT_SCHEMA_VERSION,
};
pub use tactics::{TacticCatalog, TacticClassifier, TacticHit};
pub use vocabulary::BypassVocabulary;
pub use world::{Defense, Room, World};
