//! Extension commands sent to a quorum participant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload of a `CREATE_FT` command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateFtPayload {
    pub did: String,
    pub ft_name: String,
    pub ft_count: i32,
    pub token_count: i32,
    #[serde(default)]
    pub quorum_type: i32,
}

/// Payload of a `TRANSFER_FT` command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferFtPayload {
    pub sender: String,
    pub receiver: String,
    pub ft_name: String,
    pub ft_count: i32,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub quorum_type: i32,
    #[serde(
        rename = "creatorDID",
        alias = "creator_did",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub creator_did: Option<String>,
}

/// Payload of a `DEPLOY_NFT` command. `nft` is the asset id returned by the
/// node's create-nft call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeployNftPayload {
    pub did: String,
    pub nft: String,
    #[serde(default)]
    pub quorum_type: i32,
    #[serde(default)]
    pub nft_data: String,
    #[serde(default)]
    pub nft_value: f64,
}

/// Payload of an `EXECUTE_NFT` command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecuteNftPayload {
    pub nft: String,
    pub executor: String,
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub nft_value: f64,
    #[serde(default)]
    pub nft_data: String,
    #[serde(default)]
    pub quorum_type: i32,
}

/// One action the bridge asks a quorum participant to perform.
///
/// Serialized as `{"action": "<ACTION>", "payload": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtensionCommand {
    CreateFt(CreateFtPayload),
    TransferFt(TransferFtPayload),
    DeployNft(DeployNftPayload),
    ExecuteNft(ExecuteNftPayload),
}

/// Action tag without payload, used for logging and metrics labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    CreateFt,
    TransferFt,
    DeployNft,
    ExecuteNft,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateFt => "CREATE_FT",
            Action::TransferFt => "TRANSFER_FT",
            Action::DeployNft => "DEPLOY_NFT",
            Action::ExecuteNft => "EXECUTE_NFT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ExtensionCommand {
    pub fn action(&self) -> Action {
        match self {
            ExtensionCommand::CreateFt(_) => Action::CreateFt,
            ExtensionCommand::TransferFt(_) => Action::TransferFt,
            ExtensionCommand::DeployNft(_) => Action::DeployNft,
            ExtensionCommand::ExecuteNft(_) => Action::ExecuteNft,
        }
    }

    /// Overwrite the quorum type carried in the payload.
    pub fn set_quorum_type(&mut self, quorum_type: i32) {
        match self {
            ExtensionCommand::CreateFt(p) => p.quorum_type = quorum_type,
            ExtensionCommand::TransferFt(p) => p.quorum_type = quorum_type,
            ExtensionCommand::DeployNft(p) => p.quorum_type = quorum_type,
            ExtensionCommand::ExecuteNft(p) => p.quorum_type = quorum_type,
        }
    }

    pub fn quorum_type(&self) -> i32 {
        match self {
            ExtensionCommand::CreateFt(p) => p.quorum_type,
            ExtensionCommand::TransferFt(p) => p.quorum_type,
            ExtensionCommand::DeployNft(p) => p.quorum_type,
            ExtensionCommand::ExecuteNft(p) => p.quorum_type,
        }
    }
}

/// Outer frame of every request: `{"type": "OPEN_EXTENSION", "data": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Envelope {
    #[serde(rename = "OPEN_EXTENSION")]
    OpenExtension(ExtensionCommand),
}

impl Envelope {
    pub fn command(&self) -> &ExtensionCommand {
        match self {
            Envelope::OpenExtension(cmd) => cmd,
        }
    }

    pub fn into_command(self) -> ExtensionCommand {
        match self {
            Envelope::OpenExtension(cmd) => cmd,
        }
    }
}

impl From<ExtensionCommand> for Envelope {
    fn from(cmd: ExtensionCommand) -> Self {
        Envelope::OpenExtension(cmd)
    }
}
