//! Request and response bodies of the node API.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One snapshot in a contract's append-only state log.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractState {
    #[serde(rename = "BlockNo")]
    pub block_no: i64,
    #[serde(rename = "BlockId")]
    pub block_id: String,
    #[serde(rename = "SmartContractData")]
    pub smart_contract_data: String,
    #[serde(rename = "Epoch")]
    pub epoch: i64,
    #[serde(rename = "InitiatorSignature")]
    pub initiator_signature: String,
    #[serde(rename = "ExecutorDID")]
    pub executor_did: String,
    #[serde(rename = "InitiatorSignData")]
    pub initiator_sign_data: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractStateRequest {
    pub token: String,
    pub latest: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ContractStateResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "SCTDataReply", default)]
    pub states: Option<Vec<ContractState>>,
}

/// Generic `{status, message, result}` reply.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NodeResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NftSummary {
    pub nft: String,
    pub nft_value: f64,
    pub owner_did: String,
    pub nft_metadata: String,
    pub nft_file_name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListNftsResponse {
    #[serde(default)]
    pub nfts: Option<Vec<NftSummary>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NftChainResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "NFTDataReply", default)]
    pub blocks: Option<Vec<serde_json::Value>>,
}

/// Files and owner for a create-nft call.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateNftRequest {
    pub did: String,
    pub artifact: PathBuf,
    pub metadata: PathBuf,
}
