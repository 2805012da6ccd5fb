use bridge_chain::ChainError;
use bridge_crypto::CryptoError;
use bridge_ledger::LedgerError;
use bridge_network::ChannelError;
use bridge_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid input for {function}: {reason}")]
    Decode { function: String, reason: String },

    #[error("execution has no quorum channel bound")]
    NoChannel,

    #[error("{action} failed: {source}")]
    Transport {
        action: String,
        #[source]
        source: ChannelError,
    },

    #[error("{action} rejected by quorum: {message}")]
    Rejected { action: String, message: String },

    #[error("NFT {nft_id} was created but deployment failed: {message}")]
    PartialMint { nft_id: String, message: String },

    #[error("node request failed: {0}")]
    Chain(#[from] ChainError),

    #[error("signature check failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("verification refused: {0}")]
    Verification(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl HostError {
    pub fn decode(function: &str, reason: impl ToString) -> Self {
        HostError::Decode {
            function: function.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Map a channel failure for `action`, keeping quorum refusals apart from
    /// transport trouble.
    pub fn from_channel(action: &str, err: ChannelError) -> Self {
        match err {
            ChannelError::Rejected(message) => HostError::Rejected {
                action: action.to_string(),
                message,
            },
            source => HostError::Transport {
                action: action.to_string(),
                source,
            },
        }
    }

    /// The request was understood but refused: by the quorum, by the node, or
    /// by a local rule.
    pub fn is_domain_rejection(&self) -> bool {
        match self {
            HostError::Decode { .. }
            | HostError::Rejected { .. }
            | HostError::PartialMint { .. }
            | HostError::Crypto(_)
            | HostError::Verification(_) => true,
            HostError::Chain(e) => !e.is_infrastructure(),
            HostError::Ledger(e) => matches!(
                e,
                LedgerError::InsufficientCredit { .. } | LedgerError::Overflow { .. }
            ),
            HostError::NoChannel | HostError::Transport { .. } | HostError::Store(_) => false,
        }
    }

    /// Something between the bridge and its peers is missing, down or
    /// answering out of protocol. An undecodable quorum reply lands here: the
    /// request may still have been applied.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            HostError::NoChannel | HostError::Transport { .. } => true,
            HostError::Chain(e) => e.is_infrastructure(),
            HostError::Ledger(LedgerError::Chain(e)) => e.is_infrastructure(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_types::Identity;
    use std::time::Duration;

    #[test]
    fn rejection_and_transport_are_distinct() {
        let rejected = HostError::from_channel("CREATE_FT", ChannelError::Rejected("no".into()));
        assert!(rejected.is_domain_rejection());
        assert!(!rejected.is_infrastructure());

        let timeout = HostError::from_channel(
            "CREATE_FT",
            ChannelError::Timeout(Duration::from_secs(1)),
        );
        assert!(timeout.is_infrastructure());
        assert!(!timeout.is_domain_rejection());

        let missing = HostError::from_channel(
            "CREATE_FT",
            ChannelError::NotConnected(Identity::new("did-a")),
        );
        assert!(missing.is_infrastructure());
    }

    #[test]
    fn undecodable_reply_is_infrastructure() {
        let err = HostError::from_channel(
            "CREATE_FT",
            ChannelError::Decode("expected value at line 1 column 1".into()),
        );
        assert!(matches!(err, HostError::Transport { .. }));
        assert!(err.is_infrastructure());
        assert!(!err.is_domain_rejection());

        let bad_input = HostError::decode("do_create_ft", "missing field `did`");
        assert!(bad_input.is_domain_rejection());
        assert!(!bad_input.is_infrastructure());
    }

    #[test]
    fn partial_mint_message_carries_id() {
        let err = HostError::PartialMint {
            nft_id: "nft-42".into(),
            message: "quorum rejected".into(),
        };
        let text = err.to_string();
        assert!(text.contains("nft-42"));
        assert!(text.contains("quorum rejected"));
        assert!(err.is_domain_rejection());
    }
}
