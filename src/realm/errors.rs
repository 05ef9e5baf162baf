use thiserror::Error;

use crate::realm::types::SkillKind;

/// Errors that can arise while resolving gameplay or touching the realm store.
#[derive(Debug, Error)]
pub enum RealmError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, seed files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Seed file could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when creating a record whose key is already taken.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Character name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Rules or seed data are inconsistent (bad XP table, inverted reward range...).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Action id is not in the catalog.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// Player cannot afford the energy cost of an action.
    #[error("not enough energy: need {needed}, have {available}")]
    InsufficientEnergy { needed: u32, available: u32 },

    /// Player lacks an input item (or gold, reported as item `gold`).
    #[error("not enough {item}: need {needed}, have {available}")]
    InsufficientResources {
        item: String,
        needed: u64,
        available: u64,
    },

    /// Player's skill is below the action's tier gate.
    #[error("{skill} level {required} required (current {current})")]
    LevelTooLow {
        skill: SkillKind,
        required: u8,
        current: u8,
    },

    /// Player is in a state that forbids the action (e.g. travelling).
    #[error("cannot do that right now: {0}")]
    InvalidActionState(String),
}

impl RealmError {
    /// True for user-facing gameplay rejections. Anything else is an infrastructure fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RealmError::InsufficientEnergy { .. }
                | RealmError::InsufficientResources { .. }
                | RealmError::LevelTooLow { .. }
                | RealmError::InvalidActionState(_)
        )
    }
}
