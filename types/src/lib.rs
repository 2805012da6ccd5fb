//! Fundamental types for the quorum bridge.
//!
//! This crate defines the small value types shared by every other crate in the
//! workspace: participant identities and wall-clock timestamps.

pub mod error;
pub mod identity;
pub mod time;

pub use error::TypesError;
pub use identity::Identity;
pub use time::Timestamp;
