//! LMDB storage backend for the quorum bridge.
//!
//! Implements the storage traits from `bridge-store` using the `heed` LMDB
//! bindings. Each logical store maps to one named database within a single
//! environment.

pub mod credit;
pub mod environment;
pub mod error;
pub mod provider;

pub use credit::LmdbCreditStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use provider::LmdbProviderStore;
