//! Errors raised while constructing or parsing the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("identity must not be empty")]
    EmptyIdentity,

    #[error("identity contains forbidden characters: {0}")]
    InvalidIdentity(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
