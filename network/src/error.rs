use std::time::Duration;

use bridge_types::Identity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no connection registered for {0}")]
    NotConnected(Identity),

    #[error("channel closed")]
    Closed,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("channel desynchronized: {0} responses outstanding")]
    Desynchronized(usize),

    #[error("failed to encode request: {0}")]
    Encode(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("quorum rejected request: {0}")]
    Rejected(String),
}

impl ChannelError {
    /// Write failure, timeout or a vanished peer, as opposed to a decoded
    /// response that said no.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ChannelError::Closed | ChannelError::Timeout(_) | ChannelError::Desynchronized(_)
        )
    }
}
