use thiserror::Error;

/// Broad classification used by callers to decide whether an error is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Broken world definition. Fatal at startup; a broken barrier is never played.
    Configuration,
    /// Operation not valid for the current session state. Recoverable.
    SessionState,
    /// Snapshot persistence failure. Recoverable.
    Storage,
}

/// Errors that can arise while loading a world or driving a challenge session.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A surface word was assigned to two distinct concepts.
    #[error("surface '{surface}' assigned to both '{first}' and '{second}'")]
    DuplicateSurface {
        surface: String,
        first: String,
        second: String,
    },

    /// A block spec, tactic rule or objective references a concept the lexicon lacks.
    #[error("unknown concept '{concept}' referenced by {context}")]
    UnknownConcept { concept: String, context: String },

    /// Blank concept ids or surface words.
    #[error("malformed lexicon: {0}")]
    MalformedLexicon(String),

    /// Tactic catalog or intent table that cannot be compiled.
    #[error("malformed catalog: {0}")]
    MalformedCatalog(String),

    /// A regex in a pattern table failed to compile.
    #[error("invalid pattern in '{id}': {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },

    /// Filter stage ranks run 1..=5.
    #[error("invalid filter stage {0} (expected 1..=5)")]
    InvalidStage(u8),

    #[error("unknown room '{0}'")]
    UnknownRoom(String),

    #[error("duplicate room id '{0}'")]
    DuplicateRoom(String),

    #[error("malformed room '{room}': {reason}")]
    MalformedRoom { room: String, reason: String },

    #[error("unknown flag '{flag}' referenced by {context}")]
    UnknownFlag { flag: String, context: String },

    #[error("unknown tactic '{tactic}' referenced by {context}")]
    UnknownTactic { tactic: String, context: String },

    #[error("world route is empty")]
    EmptyRoute,

    /// Seed file could not be parsed.
    #[error("seed error in {file}: {reason}")]
    Seed { file: String, reason: String },

    /// The encounter already reached a terminal state.
    #[error("encounter '{0}' already concluded")]
    EncounterConcluded(String),

    #[error("no encounter is active in this room")]
    NoActiveEncounter,

    #[error("room '{room}' is sealed until '{requires}' is completed")]
    RoomLocked { room: String, requires: String },

    #[error("room '{0}' is not an encounter")]
    NotAnEncounter(String),

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, seed files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a snapshot with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    #[error("save slot not found: {0}")]
    SlotNotFound(String),

    #[error("invalid save slot: {0}")]
    InvalidSlot(#[from] crate::validation::InputError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        use EngineError::*;
        match self {
            DuplicateSurface { .. }
            | UnknownConcept { .. }
            | MalformedLexicon(_)
            | MalformedCatalog(_)
            | InvalidPattern { .. }
            | InvalidStage(_)
            | UnknownRoom(_)
            | DuplicateRoom(_)
            | MalformedRoom { .. }
            | UnknownFlag { .. }
            | UnknownTactic { .. }
            | EmptyRoute
            | Seed { .. } => ErrorKind::Configuration,
            EncounterConcluded(_) | NoActiveEncounter | RoomLocked { .. } | NotAnEncounter(_) => {
                ErrorKind::SessionState
            }
            Sled(_) | Bincode(_) | Io(_) | SchemaMismatch { .. } | SlotNotFound(_) | InvalidSlot(_) => {
                ErrorKind::Storage
            }
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
