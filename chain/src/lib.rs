//! Client for the blockchain node's REST API.
//!
//! The bridge only needs a handful of node endpoints: contract state
//! history, NFT listing and chain data, and NFT creation. [`ChainApi`] is the
//! seam the rest of the workspace depends on; [`NodeClient`] is the HTTP
//! implementation.

pub mod client;
pub mod error;
pub mod types;

pub use client::NodeClient;
pub use error::ChainError;
pub use types::{
    ContractState, ContractStateRequest, ContractStateResponse, CreateNftRequest, ListNftsResponse,
    NftChainResponse, NftSummary, NodeResponse,
};

use async_trait::async_trait;

/// Operations the bridge performs against the blockchain node.
#[async_trait]
pub trait ChainApi: Send + Sync {
    /// State history of a published contract.
    ///
    /// With `latest` set the node returns only the most recent snapshot.
    /// An unknown or empty contract yields an empty list.
    async fn contract_states(
        &self,
        token: &str,
        latest: bool,
    ) -> Result<Vec<ContractState>, ChainError>;

    /// All NFTs known to the node.
    async fn list_nfts(&self) -> Result<Vec<NftSummary>, ChainError>;

    /// Register a new NFT and return its id.
    async fn create_nft(&self, request: &CreateNftRequest) -> Result<String, ChainError>;

    /// Number of blocks in an NFT's token chain.
    async fn nft_chain_length(&self, nft: &str) -> Result<usize, ChainError>;
}
