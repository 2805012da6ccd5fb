//! Nullable infrastructure for deterministic testing.
//!
//! Everything the bridge talks to (storage, the blockchain node, the quorum
//! participant on the far side of a channel, the contract engine) is abstracted behind a trait or
//! a channel endpoint. This crate provides test-friendly implementations that:
//! - Return scripted, deterministic values
//! - Record what they were asked to do
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chain;
pub mod quorum;
pub mod sandbox;
pub mod store;

pub use chain::NullChain;
pub use quorum::{NullQuorum, QuorumReply};
pub use sandbox::{ScriptSandbox, ScriptSandboxFactory};
pub use store::{NullCreditStore, NullProviderStore};
