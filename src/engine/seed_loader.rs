//! Seed data loaders for data-driven worlds.
//!
//! A world is five JSON files under `data/seeds/`: `lexicon.json`,
//! `intents.json`, `tactics.json`, `rooms.json` and `flags.json`. The canonical
//! set is compiled into the binary; a directory with the same layout can
//! replace it without recompiling.

use std::fs;
use std::path::Path;

use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::errors::EngineError;
use super::intent::IntentTableSeed;
use super::lexicon::LexiconEntry;
use super::tactics::TacticSeed;
use super::world::{FlagDef, Room, World};
use crate::validation::secure_json_parse;

pub const LEXICON_FILE: &str = "lexicon.json";
pub const INTENTS_FILE: &str = "intents.json";
pub const TACTICS_FILE: &str = "tactics.json";
pub const ROOMS_FILE: &str = "rooms.json";
pub const FLAGS_FILE: &str = "flags.json";

/// Upper bound for a single seed file.
pub const MAX_SEED_BYTES: usize = 1024 * 1024;

const CANONICAL_LEXICON: &str = include_str!("../../data/seeds/lexicon.json");
const CANONICAL_INTENTS: &str = include_str!("../../data/seeds/intents.json");
const CANONICAL_TACTICS: &str = include_str!("../../data/seeds/tactics.json");
const CANONICAL_ROOMS: &str = include_str!("../../data/seeds/rooms.json");
const CANONICAL_FLAGS: &str = include_str!("../../data/seeds/flags.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LexiconFile {
    concepts: Vec<LexiconEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TacticsFile {
    tactics: Vec<TacticSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoomsFile {
    title: String,
    rooms: Vec<Room>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagCatalogSeed {
    #[serde(default)]
    pub vocabulary_flag: Option<String>,
    #[serde(default)]
    pub flags: Vec<FlagDef>,
}

/// Everything needed to build a [`World`], before validation.
#[derive(Debug, Clone)]
pub struct WorldSeed {
    pub title: String,
    pub lexicon: Vec<LexiconEntry>,
    pub intents: IntentTableSeed,
    pub tactics: Vec<TacticSeed>,
    pub rooms: Vec<Room>,
    pub flags: FlagCatalogSeed,
}

fn parse<T: DeserializeOwned>(file: &str, contents: &str) -> Result<T, EngineError> {
    secure_json_parse(contents, MAX_SEED_BYTES).map_err(|e| EngineError::Seed {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

fn read(dir: &Path, file: &str) -> Result<String, EngineError> {
    let path = dir.join(file);
    fs::read_to_string(&path).map_err(|e| EngineError::Seed {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn seed_from_strings(
    lexicon: &str,
    intents: &str,
    tactics: &str,
    rooms: &str,
    flags: &str,
) -> Result<WorldSeed, EngineError> {
    let lexicon: LexiconFile = parse(LEXICON_FILE, lexicon)?;
    let tactics: TacticsFile = parse(TACTICS_FILE, tactics)?;
    let rooms: RoomsFile = parse(ROOMS_FILE, rooms)?;
    Ok(WorldSeed {
        title: rooms.title,
        lexicon: lexicon.concepts,
        intents: parse(INTENTS_FILE, intents)?,
        tactics: tactics.tactics,
        rooms: rooms.rooms,
        flags: parse(FLAGS_FILE, flags)?,
    })
}

/// Raw seed of the built-in world.
pub fn canonical_seed() -> Result<WorldSeed, EngineError> {
    seed_from_strings(
        CANONICAL_LEXICON,
        CANONICAL_INTENTS,
        CANONICAL_TACTICS,
        CANONICAL_ROOMS,
        CANONICAL_FLAGS,
    )
}

/// The built-in world.
pub fn canonical_world() -> Result<World, EngineError> {
    World::from_seed(canonical_seed()?)
}

/// Load and validate a world from a directory of seed files.
pub fn load_world_from_dir<P: AsRef<Path>>(dir: P) -> Result<World, EngineError> {
    let dir = dir.as_ref();
    let seed = seed_from_strings(
        &read(dir, LEXICON_FILE)?,
        &read(dir, INTENTS_FILE)?,
        &read(dir, TACTICS_FILE)?,
        &read(dir, ROOMS_FILE)?,
        &read(dir, FLAGS_FILE)?,
    )?;
    let world = World::from_seed(seed)?;
    info!(
        "Loaded world '{}' from {} ({} rooms, {} concepts, {} tactics)",
        world.title(),
        dir.display(),
        world.rooms().len(),
        world.lexicon().len(),
        world.tactics().len()
    );
    Ok(world)
}

/// Write the canonical seed files into `dir` so they can be customised.
pub fn write_canonical_seeds<P: AsRef<Path>>(dir: P) -> Result<(), EngineError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    for (file, contents) in [
        (LEXICON_FILE, CANONICAL_LEXICON),
        (INTENTS_FILE, CANONICAL_INTENTS),
        (TACTICS_FILE, CANONICAL_TACTICS),
        (ROOMS_FILE, CANONICAL_ROOMS),
        (FLAGS_FILE, CANONICAL_FLAGS),
    ] {
        let path = dir.join(file);
        if !path.exists() {
            fs::write(&path, contents)?;
        }
    }
    Ok(())
}
