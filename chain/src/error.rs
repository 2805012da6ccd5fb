use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("node rejected request: {0}")]
    Rejected(String),

    #[error("no contract data present for {0}")]
    NoContractData(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ChainError {
    /// True when the node could not be reached or did not answer properly.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, ChainError::Rejected(_) | ChainError::NoContractData(_))
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChainError::Unreachable(format!("request timed out: {e}"))
        } else if e.is_connect() {
            ChainError::Unreachable(format!("connection failed: {e}"))
        } else if e.is_decode() {
            ChainError::InvalidResponse(e.to_string())
        } else {
            ChainError::RequestFailed(e.to_string())
        }
    }
}
