// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Operation attempted from a state that does not allow it
    #[error("{message} (current state: {state})")]
    InvalidState { message: String, state: String },

    #[error("Invalid callback target: {0}")]
    InvalidCallback(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
