use haven_types::{Actor, RecordId, Role};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("caller {caller} does not hold the {role} role")]
    Unauthorized { caller: Actor, role: Role },

    #[error("fuzzy digest already registered")]
    DuplicateDigest,

    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("write conflict: {0}")]
    WriteConflict(String),
}
