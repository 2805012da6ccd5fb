//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbCreditStore, LmdbError, LmdbProviderStore};

const CREDITS_DB: &str = "credits";
const PROVIDERS_DB: &str = "providers";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    credits_db: Database<Bytes, Bytes>,
    providers_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Io(e.to_string()))?;

        // SAFETY: the environment is opened once per process for this path and
        // the backing files are not modified by anything but this handle.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let credits_db = env.create_database(&mut wtxn, Some(CREDITS_DB))?;
        let providers_db = env.create_database(&mut wtxn, Some(PROVIDERS_DB))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            credits_db,
            providers_db,
        })
    }

    pub fn credit_store(&self) -> LmdbCreditStore {
        LmdbCreditStore {
            env: Arc::clone(&self.env),
            credits_db: self.credits_db,
        }
    }

    pub fn provider_store(&self) -> LmdbProviderStore {
        LmdbProviderStore {
            env: Arc::clone(&self.env),
            providers_db: self.providers_db,
        }
    }

    /// Flush buffers to disk.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}
