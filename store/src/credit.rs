//! Credit record storage trait.

use bridge_types::time::decimal_secs;
use bridge_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Persisted balance of one identity: `{"credit": 10, "timestamp": "1700000000"}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRecord {
    pub credit: u64,
    #[serde(with = "decimal_secs", default)]
    pub timestamp: Option<Timestamp>,
}

/// Read-modify-write closure passed to [`CreditStore::update_credit`].
///
/// Receives the current record (if any). Returning `None` declines the update
/// and nothing is written.
pub type CreditUpdate<'a> = dyn FnMut(Option<&CreditRecord>) -> Option<CreditRecord> + Send + 'a;

/// Persistent storage for per-identity credit balances.
pub trait CreditStore: Send + Sync {
    /// Get the record for an identity, `None` if it never received credit.
    fn get_credit(&self, identity: &Identity) -> Result<Option<CreditRecord>, StoreError>;

    /// Atomically read, transform and write the record for an identity.
    ///
    /// Implementations must run `update` and the write under one exclusive
    /// section so concurrent updates for the same identity serialize. Returns
    /// the record that was written, or `None` if `update` declined.
    fn update_credit(
        &self,
        identity: &Identity,
        update: &mut CreditUpdate<'_>,
    ) -> Result<Option<CreditRecord>, StoreError>;

    /// Number of identities with a credit record.
    fn credit_count(&self) -> Result<u64, StoreError>;
}
