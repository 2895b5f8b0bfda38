// ─── Error ──────────────────────────────────────────────────────────────────
use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Missing required field `{0}`")]
    MissingField(SmolStr),
    #[error("Alias resolved before it was bound")]
    UnboundAlias,
}

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Type index {0} is reserved for primitives")]
    ReservedTypeIndex(u32),
    #[error("Field `{0}` declared twice")]
    DuplicateField(SmolStr),
    #[error("Alias already bound")]
    AlreadyBound,
    #[error("Binding would create an alias cycle")]
    AliasCycle,
}
