//! Abstract storage traits for the quorum bridge.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod credit;
pub mod error;
pub mod provider;

pub use credit::{CreditRecord, CreditStore, CreditUpdate};
pub use error::StoreError;
pub use provider::{ProviderEndpoints, ProviderInfo, ProviderStore};

/// Serialize a record in the persisted JSON format.
pub fn encode_record<T: serde::Serialize>(record: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Deserialize a persisted JSON record; a malformed value is corruption.
pub fn decode_record<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corruption(e.to_string()))
}
