//! NFT actions: the two-step mint saga (`do_mint_nft_trie`) and
//! `do_execute_nft`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bridge_chain::{ChainApi, CreateNftRequest};
use bridge_protocol::{DeployNftPayload, ExecuteNftPayload, ExtensionCommand};

use crate::{ExecutionContext, HostError, HostFunction, HostFunctionDescriptor};

/// Mint request as the contract sends it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MintNftInput {
    pub did: String,
    pub metadata: String,
    pub artifact: String,
    #[serde(rename = "nftData", default)]
    pub nft_data: String,
    #[serde(rename = "nftValue", default)]
    pub nft_value: f64,
}

/// Where a mint ended up.
#[derive(Debug)]
pub enum MintOutcome {
    /// Nothing was created.
    Failed { error: HostError },
    /// The node created the NFT but the quorum did not deploy it. A deploy
    /// retry with `nft_id` finishes the job.
    PartiallyCompleted { nft_id: String, error: HostError },
    Completed { nft_id: String, tx_id: String },
}

impl MintOutcome {
    /// Id of the created NFT, if the first step got that far.
    pub fn nft_id(&self) -> Option<&str> {
        match self {
            MintOutcome::Failed { .. } => None,
            MintOutcome::PartiallyCompleted { nft_id, .. } | MintOutcome::Completed { nft_id, .. } => {
                Some(nft_id)
            }
        }
    }
}

#[derive(Serialize)]
struct MintResult<'a> {
    #[serde(rename = "nftId")]
    nft_id: &'a str,
    #[serde(rename = "txId")]
    tx_id: &'a str,
}

/// Transaction id in a deploy confirmation: the last whitespace-separated
/// word of the message.
pub fn extract_transaction_id(message: &str) -> Option<&str> {
    message.split_whitespace().last()
}

pub struct MintNftAction {
    ctx: Arc<ExecutionContext>,
    chain: Arc<dyn ChainApi>,
    asset_dir: Option<PathBuf>,
}

impl MintNftAction {
    pub const NAME: &'static str = "do_mint_nft_trie";

    pub fn new(ctx: Arc<ExecutionContext>, chain: Arc<dyn ChainApi>) -> Self {
        Self {
            ctx,
            chain,
            asset_dir: None,
        }
    }

    /// Resolve relative artifact and metadata paths against `dir`.
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = Some(dir.into());
        self
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        match &self.asset_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Create the NFT on the node, then have the quorum deploy it.
    pub async fn run(&self, input: MintNftInput) -> MintOutcome {
        let request = CreateNftRequest {
            did: input.did.clone(),
            artifact: self.resolve(&input.artifact),
            metadata: self.resolve(&input.metadata),
        };

        let nft_id = match self.chain.create_nft(&request).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(did = %input.did, error = %e, "create-nft failed");
                return MintOutcome::Failed { error: e.into() };
            }
        };

        let deploy = ExtensionCommand::DeployNft(DeployNftPayload {
            did: input.did.clone(),
            nft: nft_id.clone(),
            quorum_type: self.ctx.quorum_type(),
            nft_data: input.nft_data,
            nft_value: input.nft_value,
        });

        match self.ctx.call(deploy).await {
            Ok(response) => {
                let tx_id = extract_transaction_id(&response.message)
                    .map(str::to_string)
                    .or(response.result)
                    .unwrap_or_default();
                tracing::info!(did = %input.did, nft = %nft_id, tx = %tx_id, "NFT deployed");
                MintOutcome::Completed { nft_id, tx_id }
            }
            Err(error) => {
                tracing::error!(
                    did = %input.did,
                    nft = %nft_id,
                    error = %error,
                    "NFT created but deploy failed"
                );
                MintOutcome::PartiallyCompleted { nft_id, error }
            }
        }
    }
}

#[async_trait]
impl HostFunction for MintNftAction {
    fn descriptor(&self) -> HostFunctionDescriptor {
        HostFunctionDescriptor::input_output(Self::NAME)
    }

    async fn call(&self, input: &[u8]) -> Result<String, HostError> {
        let input: MintNftInput =
            serde_json::from_slice(input).map_err(|e| HostError::decode(Self::NAME, e))?;
        match self.run(input).await {
            MintOutcome::Completed { nft_id, tx_id } => serde_json::to_string(&MintResult {
                nft_id: &nft_id,
                tx_id: &tx_id,
            })
            .map_err(|e| HostError::decode(Self::NAME, e)),
            MintOutcome::PartiallyCompleted { nft_id, error } => {
                let message = match error {
                    HostError::Rejected { message, .. } => message,
                    other => other.to_string(),
                };
                Err(HostError::PartialMint { nft_id, message })
            }
            MintOutcome::Failed { error } => Err(error),
        }
    }
}

pub struct ExecuteNftAction {
    ctx: Arc<ExecutionContext>,
}

impl ExecuteNftAction {
    pub const NAME: &'static str = "do_execute_nft";

    pub fn new(ctx: Arc<ExecutionContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl HostFunction for ExecuteNftAction {
    fn descriptor(&self) -> HostFunctionDescriptor {
        HostFunctionDescriptor::input_output(Self::NAME)
    }

    async fn call(&self, input: &[u8]) -> Result<String, HostError> {
        let payload: ExecuteNftPayload =
            serde_json::from_slice(input).map_err(|e| HostError::decode(Self::NAME, e))?;
        tracing::info!(nft = %payload.nft, executor = %payload.executor, "executing NFT");
        self.ctx.call(ExtensionCommand::ExecuteNft(payload)).await?;
        Ok("success".to_string())
    }
}
