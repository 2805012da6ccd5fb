use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),

    #[error("public key not found for {identity}: {reason}")]
    KeyNotFound { identity: String, reason: String },

    #[error("identity {0:?} cannot be used as a key directory name")]
    InvalidIdentity(String),
}
