//! Shared handler state.

use std::path::PathBuf;
use std::sync::Arc;

use bridge_chain::ChainApi;
use bridge_crypto::KeyStore;
use bridge_host::SandboxFactory;
use bridge_ledger::{CreditLedger, RatingAggregator};
use bridge_network::SharedRegistry;
use bridge_store::ProviderStore;

use crate::BridgeMetrics;

/// Static settings the handlers need.
#[derive(Clone, Debug)]
pub struct ApiSettings {
    /// Quorum type stamped on every command sent to a participant.
    pub quorum_type: i32,
    /// Directory holding the contract files executed by each route.
    pub artifacts_dir: PathBuf,
    /// Base for relative artifact/metadata paths in mint requests.
    pub asset_dir: Option<PathBuf>,
    /// Node's NFT directory, for metadata not inlined in `list-nfts`.
    pub nft_dir: Option<PathBuf>,
    /// Contract whose latest state carries onboarding submissions.
    pub onboarding_contract: String,
    /// Contracts whose state logs count towards the transaction total.
    pub tracked_contracts: Vec<String>,
}

pub struct AppState {
    pub registry: SharedRegistry,
    pub chain: Arc<dyn ChainApi>,
    pub ledger: CreditLedger,
    pub ratings: RatingAggregator,
    pub providers: Arc<dyn ProviderStore>,
    pub keys: KeyStore,
    pub sandboxes: Arc<dyn SandboxFactory>,
    pub metrics: Arc<BridgeMetrics>,
    pub settings: ApiSettings,
}
