use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("cannot encode frame: {0}")]
    Encode(String),
}
