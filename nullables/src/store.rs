//! Nullable stores: thread-safe in-memory storage for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use bridge_store::{CreditRecord, CreditStore, CreditUpdate, ProviderInfo, ProviderStore, StoreError};
use bridge_types::Identity;

/// An in-memory credit store. The whole map sits behind one lock, so
/// updates are serialized exactly like LMDB write transactions.
pub struct NullCreditStore {
    records: Mutex<HashMap<Identity, CreditRecord>>,
    failing: AtomicBool,
}

impl NullCreditStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail with a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Seed a record directly.
    pub fn insert(&self, identity: Identity, record: CreditRecord) {
        self.records.lock().unwrap().insert(identity, record);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store set to fail".into()));
        }
        Ok(())
    }
}

impl Default for NullCreditStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CreditStore for NullCreditStore {
    fn get_credit(&self, identity: &Identity) -> Result<Option<CreditRecord>, StoreError> {
        self.check()?;
        Ok(self.records.lock().unwrap().get(identity).cloned())
    }

    fn update_credit(
        &self,
        identity: &Identity,
        update: &mut CreditUpdate<'_>,
    ) -> Result<Option<CreditRecord>, StoreError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        let next = update(records.get(identity));
        if let Some(record) = &next {
            records.insert(identity.clone(), record.clone());
        }
        Ok(next)
    }

    fn credit_count(&self) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.records.lock().unwrap().len() as u64)
    }
}

/// An in-memory provider catalog.
pub struct NullProviderStore {
    providers: Mutex<BTreeMap<String, ProviderInfo>>,
}

impl NullProviderStore {
    pub fn new() -> Self {
        Self {
            providers: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for NullProviderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderStore for NullProviderStore {
    fn put_provider(&self, info: &ProviderInfo) -> Result<bool, StoreError> {
        Ok(self
            .providers
            .lock()
            .unwrap()
            .insert(info.provider_did.clone(), info.clone())
            .is_some())
    }

    fn get_provider(&self, provider_did: &str) -> Result<Option<ProviderInfo>, StoreError> {
        Ok(self.providers.lock().unwrap().get(provider_did).cloned())
    }

    fn iter_providers(&self) -> Result<Vec<ProviderInfo>, StoreError> {
        Ok(self.providers.lock().unwrap().values().cloned().collect())
    }
}
