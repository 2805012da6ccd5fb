//! Cryptographic primitives for the quorum bridge.
//!
//! - **secp256k1 ECDSA** verification of onboarding signatures, with the signed
//!   data used directly as the message digest
//! - PEM public key loading from the per-identity key directory

pub mod error;
pub mod keystore;
pub mod verify;

pub use error::CryptoError;
pub use keystore::KeyStore;
pub use verify::{parse_public_key_pem, verify_prehashed};
