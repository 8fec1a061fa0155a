//! # Save Slot Storage
//!
//! Session snapshots live in a sled database, one value per named slot under
//! `slots:<name>`. Each value is a schema-version byte followed by the
//! bincode-encoded [`SlotRecord`]; a slot written by another layout is refused
//! before decoding.
//!
//! ```rust,no_run
//! use wordwarden::engine::{canonical_world, ChallengeSession, EngineConfig};
//! use wordwarden::storage::SnapshotStore;
//!
//! # fn main() -> Result<(), wordwarden::engine::EngineError> {
//! let session = ChallengeSession::new(canonical_world()?, EngineConfig::default(), 7);
//! let store = SnapshotStore::open("./data/slots")?;
//! store.save("autosave", session.world().title(), &session.snapshot())?;
//! let snapshot = store.load("autosave")?.snapshot;
//! # let _ = snapshot;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, SessionSnapshot, SNAPSHOT_SCHEMA_VERSION};
use crate::validation::validate_slot_name;

const TREE_SLOTS: &str = "wordwarden_slots";
const SLOT_PREFIX: &str = "slots:";

/// One saved session and when it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub slot: String,
    pub world_title: String,
    pub saved_at: DateTime<Utc>,
    pub snapshot: SessionSnapshot,
}

/// Listing entry; cheaper to show than the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot: String,
    pub world_title: String,
    pub saved_at: DateTime<Utc>,
    pub current_room: String,
    pub points: u32,
}

impl From<&SlotRecord> for SlotInfo {
    fn from(record: &SlotRecord) -> Self {
        Self {
            slot: record.slot.clone(),
            world_title: record.world_title.clone(),
            saved_at: record.saved_at,
            current_room: record.snapshot.current_room.clone(),
            points: record.snapshot.flags.values().sum(),
        }
    }
}

/// Sled-backed persistence for session snapshots.
pub struct SnapshotStore {
    _db: sled::Db,
    slots: sled::Tree,
}

impl SnapshotStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let slots = db.open_tree(TREE_SLOTS)?;
        debug!("Opened slot store at {}", path_ref.display());
        Ok(Self { _db: db, slots })
    }

    fn slot_key(slot: &str) -> Vec<u8> {
        format!("{}{}", SLOT_PREFIX, slot).into_bytes()
    }

    fn encode(record: &SlotRecord) -> Result<Vec<u8>, EngineError> {
        let mut bytes = vec![SNAPSHOT_SCHEMA_VERSION];
        bytes.extend(bincode::serialize(record)?);
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<SlotRecord, EngineError> {
        let Some((&version, body)) = bytes.split_first() else {
            return Err(EngineError::SchemaMismatch {
                entity: "slot",
                expected: SNAPSHOT_SCHEMA_VERSION,
                found: 0,
            });
        };
        if version != SNAPSHOT_SCHEMA_VERSION {
            return Err(EngineError::SchemaMismatch {
                entity: "slot",
                expected: SNAPSHOT_SCHEMA_VERSION,
                found: version,
            });
        }
        Ok(bincode::deserialize::<SlotRecord>(body)?)
    }

    /// Write `snapshot` into `slot`, replacing whatever was there.
    pub fn save(&self, slot: &str, world_title: &str, snapshot: &SessionSnapshot) -> Result<SlotInfo, EngineError> {
        let slot = validate_slot_name(slot)?;
        let record = SlotRecord {
            slot: slot.clone(),
            world_title: world_title.to_string(),
            saved_at: Utc::now(),
            snapshot: snapshot.clone(),
        };
        self.slots.insert(Self::slot_key(&slot), Self::encode(&record)?)?;
        self.slots.flush()?;
        info!("Saved slot '{}' at room '{}'", slot, record.snapshot.current_room);
        Ok(SlotInfo::from(&record))
    }

    pub fn load(&self, slot: &str) -> Result<SlotRecord, EngineError> {
        let slot = validate_slot_name(slot)?;
        let Some(bytes) = self.slots.get(Self::slot_key(&slot))? else {
            return Err(EngineError::SlotNotFound(slot));
        };
        Self::decode(&bytes)
    }

    pub fn exists(&self, slot: &str) -> Result<bool, EngineError> {
        let slot = validate_slot_name(slot)?;
        Ok(self.slots.contains_key(Self::slot_key(&slot))?)
    }

    /// Every readable slot, by name. Slots from another schema are skipped.
    pub fn list(&self) -> Result<Vec<SlotInfo>, EngineError> {
        let mut out = Vec::new();
        for entry in self.slots.scan_prefix(SLOT_PREFIX.as_bytes()) {
            let (key, bytes) = entry?;
            match Self::decode(&bytes) {
                Ok(record) => out.push(SlotInfo::from(&record)),
                Err(e) => debug!("Skipping slot {}: {}", String::from_utf8_lossy(&key), e),
            }
        }
        Ok(out)
    }

    /// Remove a slot. Returns false when it did not exist.
    pub fn delete(&self, slot: &str) -> Result<bool, EngineError> {
        let slot = validate_slot_name(slot)?;
        let removed = self.slots.remove(Self::slot_key(&slot))?.is_some();
        self.slots.flush()?;
        if removed {
            info!("Deleted slot '{}'", slot);
        }
        Ok(removed)
    }
}
