//! Bridge configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use bridge_utils::LogFormat;

use crate::NodeError;

/// Configuration for a bridge node.
///
/// Can be loaded from a TOML file via [`BridgeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Interface the HTTP API and participant WebSocket listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: IpAddr,

    /// Port for the HTTP API and participant WebSocket.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the chain node's HTTP API.
    #[serde(default = "default_node_address")]
    pub node_address: String,

    /// Quorum type stamped on every command sent to a participant.
    #[serde(default = "default_quorum_type")]
    pub quorum_type: i32,

    /// Upper bound on a single participant call, and on chain node requests.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// How long a new participant connection may take to send its opening frame.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// Interval between keep-alive frames sent to each participant.
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,

    /// LMDB directory for credit records and onboarded providers.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Holds `<did>/pubKey.pem` for every identity that may sign onboarding data.
    #[serde(default = "default_did_dir")]
    pub did_dir: PathBuf,

    /// Contract files executed by the contract routes.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Base for relative artifact/metadata paths in mint requests.
    #[serde(default)]
    pub asset_dir: Option<PathBuf>,

    /// The chain node's NFT directory, read for asset metadata.
    #[serde(default)]
    pub nft_dir: Option<PathBuf>,

    /// Contract whose latest state carries onboarding submissions.
    #[serde(default)]
    pub onboarding_contract: String,

    /// Contract whose states carry asset ratings.
    #[serde(default = "default_rating_contract")]
    pub rating_contract: String,

    /// Contracts whose state logs count towards the transaction total.
    #[serde(default = "default_tracked_contracts")]
    pub tracked_contracts: Vec<String>,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_addr() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8082
}

fn default_node_address() -> String {
    "http://localhost:20007".to_string()
}

fn default_quorum_type() -> i32 {
    2
}

fn default_rpc_timeout_secs() -> u64 {
    300
}

fn default_handshake_timeout_secs() -> u64 {
    30
}

fn default_keepalive_interval_secs() -> u64 {
    15
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./bridge_data")
}

fn default_did_dir() -> PathBuf {
    PathBuf::from("./did")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}

fn default_rating_contract() -> String {
    "QmfEkQvWcLZEghJ1swffQg9nxcnT13j6xLiB3CqPXUvfg2".to_string()
}

fn default_tracked_contracts() -> Vec<String> {
    [
        "QmVRwuiYMES2vySvJwqZ1oFgxtDjWwQXWuhgTctgDNu9ye",
        "QmVAMKVR1Q9etqfwqfdSGWseNjRKdmHr6Zck2TL8MfeEyT",
        "QmfEkQvWcLZEghJ1swffQg9nxcnT13j6xLiB3CqPXUvfg2",
        "QmS5DogBfk96voS54hhE4KemToGRWgGC6Fbk5cZboTNh3m",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject settings the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        for (name, value) in [
            ("rpc_timeout_secs", self.rpc_timeout_secs),
            ("handshake_timeout_secs", self.handshake_timeout_secs),
            ("keepalive_interval_secs", self.keepalive_interval_secs),
        ] {
            if value == 0 {
                return Err(NodeError::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.node_address.trim().is_empty() {
            return Err(NodeError::Config("node_address must not be empty".into()));
        }
        self.log_format()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.port)
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format
            .parse()
            .map_err(|e: bridge_utils::UnknownLogFormat| NodeError::Config(e.to_string()))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            node_address: default_node_address(),
            quorum_type: default_quorum_type(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            data_dir: default_data_dir(),
            did_dir: default_did_dir(),
            artifacts_dir: default_artifacts_dir(),
            asset_dir: None,
            nft_dir: None,
            onboarding_contract: String::new(),
            rating_contract: default_rating_contract(),
            tracked_contracts: default_tracked_contracts(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
