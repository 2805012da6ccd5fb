use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database failed.
    #[error("store backend failed: {0}")]
    Backend(String),

    /// A record could not be encoded for writing.
    #[error("cannot encode record: {0}")]
    Serialization(String),

    /// A stored record no longer decodes.
    #[error("stored record is unreadable: {0}")]
    Corruption(String),
}
