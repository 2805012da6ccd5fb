//! Participant identity (a decentralized identifier string).

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::TypesError;

/// Opaque identifier of a quorum participant, token owner or submitter.
///
/// The bridge never interprets the contents; it is only used as a map key
/// (connection registry, credit ledger, key store lookups).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap a raw identifier without validation.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parse an identifier supplied by a remote caller.
    ///
    /// Rejects empty strings and anything that could escape a directory when
    /// the identity is used as a path component.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyIdentity);
        }
        if trimmed.contains('/') || trimmed.contains('\\') || trimmed.contains("..") {
            return Err(TypesError::InvalidIdentity(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Return the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}
