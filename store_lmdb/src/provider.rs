//! LMDB implementation of ProviderStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use bridge_store::{decode_record, encode_record, ProviderInfo, ProviderStore, StoreError};

use crate::LmdbError;

pub struct LmdbProviderStore {
    pub(crate) env: Arc<Env>,
    pub(crate) providers_db: Database<Bytes, Bytes>,
}

impl ProviderStore for LmdbProviderStore {
    fn put_provider(&self, info: &ProviderInfo) -> Result<bool, StoreError> {
        let key = info.provider_did.as_bytes();
        let val = encode_record(info)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let replaced = self
            .providers_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
            .is_some();
        self.providers_db
            .put(&mut wtxn, key, &val)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(replaced)
    }

    fn get_provider(&self, provider_did: &str) -> Result<Option<ProviderInfo>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .providers_db
            .get(&rtxn, provider_did.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode_record(bytes)?)),
            None => Ok(None),
        }
    }

    fn iter_providers(&self) -> Result<Vec<ProviderInfo>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.providers_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for entry in iter {
            let (_key, val) = entry.map_err(LmdbError::from)?;
            match decode_record::<ProviderInfo>(val) {
                Ok(info) => results.push(info),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable provider record"),
            }
        }
        Ok(results)
    }
}
