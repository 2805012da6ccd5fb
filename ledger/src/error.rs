use bridge_chain::ChainError;
use bridge_store::StoreError;
use bridge_types::Identity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("insufficient credit for {identity}: balance is {balance}")]
    InsufficientCredit { identity: Identity, balance: u64 },

    #[error("credit overflow for {identity}: {balance} + {amount}")]
    Overflow {
        identity: Identity,
        balance: u64,
        amount: u64,
    },
}
