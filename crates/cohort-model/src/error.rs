use thiserror::Error;

/// Errors raised when parsing model vocabulary from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown canonical field: {0}")]
    UnknownField(String),

    #[error("unknown timepoint stage: {0}")]
    UnknownStage(String),

    #[error("invalid patient id: {0:?}")]
    InvalidPatientId(String),
}
