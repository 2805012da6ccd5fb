//! LMDB implementation of CreditStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use bridge_store::{decode_record, encode_record, CreditRecord, CreditStore, CreditUpdate, StoreError};
use bridge_types::Identity;

use crate::LmdbError;

pub struct LmdbCreditStore {
    pub(crate) env: Arc<Env>,
    pub(crate) credits_db: Database<Bytes, Bytes>,
}

impl CreditStore for LmdbCreditStore {
    fn get_credit(&self, identity: &Identity) -> Result<Option<CreditRecord>, StoreError> {
        let key = identity.as_str().as_bytes();
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self.credits_db.get(&rtxn, key).map_err(LmdbError::from)? {
            Some(bytes) => Ok(Some(decode_record(bytes)?)),
            None => Ok(None),
        }
    }

    fn update_credit(
        &self,
        identity: &Identity,
        update: &mut CreditUpdate<'_>,
    ) -> Result<Option<CreditRecord>, StoreError> {
        let key = identity.as_str().as_bytes();
        // LMDB admits one write transaction at a time, so the read below and
        // the put cannot interleave with another update.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let current: Option<CreditRecord> =
            match self.credits_db.get(&wtxn, key).map_err(LmdbError::from)? {
                Some(bytes) => Some(decode_record(bytes)?),
                None => None,
            };

        let Some(next) = update(current.as_ref()) else {
            return Ok(None);
        };

        let val = encode_record(&next)?;
        self.credits_db
            .put(&mut wtxn, key, &val)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(Some(next))
    }

    fn credit_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.credits_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_types::Timestamp;
    use std::thread;

    fn open_test_env() -> (tempfile::TempDir, crate::LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = crate::LmdbEnvironment::open(dir.path(), 8, 1 << 20).unwrap();
        (dir, env)
    }

    fn record(credit: u64, secs: u64) -> CreditRecord {
        CreditRecord {
            credit,
            timestamp: Some(Timestamp::new(secs)),
        }
    }

    #[test]
    fn unknown_identity_has_no_record() {
        let (_dir, env) = open_test_env();
        let store = env.credit_store();
        assert_eq!(store.get_credit(&Identity::new("nobody")).unwrap(), None);
        assert_eq!(store.credit_count().unwrap(), 0);
    }

    #[test]
    fn update_writes_record() {
        let (_dir, env) = open_test_env();
        let store = env.credit_store();
        let id = Identity::new("did-alice");

        let written = store
            .update_credit(&id, &mut |current| {
                assert!(current.is_none());
                Some(record(10, 100))
            })
            .unwrap();
        assert_eq!(written, Some(record(10, 100)));
        assert_eq!(store.get_credit(&id).unwrap(), Some(record(10, 100)));
        assert_eq!(store.credit_count().unwrap(), 1);
    }

    #[test]
    fn declined_update_leaves_record_untouched() {
        let (_dir, env) = open_test_env();
        let store = env.credit_store();
        let id = Identity::new("did-bob");
        store.update_credit(&id, &mut |_| Some(record(3, 1))).unwrap();

        let written = store.update_credit(&id, &mut |_| None).unwrap();
        assert_eq!(written, None);
        assert_eq!(store.get_credit(&id).unwrap(), Some(record(3, 1)));
    }

    #[test]
    fn persisted_format_is_json_with_string_timestamp() {
        let (_dir, env) = open_test_env();
        let store = env.credit_store();
        let id = Identity::new("did-carol");
        store.update_credit(&id, &mut |_| Some(record(7, 1_700_000_000))).unwrap();

        let rtxn = store.env.read_txn().unwrap();
        let raw = store.credits_db.get(&rtxn, b"did-carol".as_slice()).unwrap().unwrap();
        assert_eq!(
            std::str::from_utf8(raw).unwrap(),
            r#"{"credit":7,"timestamp":"1700000000"}"#
        );
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let (_dir, env) = open_test_env();
        let store = Arc::new(env.credit_store());
        let id = Identity::new("did-racer");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = id.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .update_credit(&id, &mut |current| {
                                let credit = current.map(|r| r.credit).unwrap_or(0);
                                Some(record(credit + 1, 0))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get_credit(&id).unwrap().unwrap().credit, 200);
    }
}
