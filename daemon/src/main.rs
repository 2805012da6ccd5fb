//! Bridge daemon: entry point for running a bridge node.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use bridge_node::{BridgeConfig, BridgeNode};
use clap::Parser;

#[derive(Parser)]
#[command(name = "bridge-daemon", about = "Quorum host action bridge")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to listen on.
    #[arg(long, env = "BRIDGE_LISTEN_ADDR")]
    listen_addr: Option<IpAddr>,

    /// Port for the HTTP API and participant WebSocket.
    #[arg(long, env = "BRIDGE_PORT")]
    port: Option<u16>,

    /// Base URL of the chain node's HTTP API.
    #[arg(long, env = "BRIDGE_NODE_ADDRESS")]
    node_address: Option<String>,

    /// LMDB directory for credits and providers.
    #[arg(long, env = "BRIDGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory of `<did>/pubKey.pem` files.
    #[arg(long, env = "BRIDGE_DID_DIR")]
    did_dir: Option<PathBuf>,

    /// Directory of contract files.
    #[arg(long, env = "BRIDGE_ARTIFACTS_DIR")]
    artifacts_dir: Option<PathBuf>,

    /// The chain node's NFT directory.
    #[arg(long, env = "RUBIX_NFT_DIR")]
    nft_dir: Option<PathBuf>,

    /// Log format: "human" or "json".
    #[arg(long, env = "BRIDGE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BRIDGE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the bridge until SIGINT/SIGTERM.
    Run,
    /// Print the effective configuration as TOML and exit.
    Config,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(BridgeConfig, Command)> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        if let Some(v) = self.listen_addr {
            config.listen_addr = v;
        }
        if let Some(v) = self.port {
            config.port = v;
        }
        if let Some(v) = self.node_address {
            config.node_address = v;
        }
        if let Some(v) = self.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = self.did_dir {
            config.did_dir = v;
        }
        if let Some(v) = self.artifacts_dir {
            config.artifacts_dir = v;
        }
        if self.nft_dir.is_some() {
            config.nft_dir = self.nft_dir;
        }
        if let Some(v) = self.log_format {
            config.log_format = v;
        }
        if let Some(v) = self.log_level {
            config.log_level = v;
        }

        config.validate()?;
        Ok((config, self.command))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded_from = cli.config.clone();
    let (config, command) = cli.into_config()?;

    match command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Run => {
            bridge_utils::init_logging(config.log_format()?, &config.log_level);
            if let Some(path) = loaded_from {
                tracing::info!(path = %path.display(), "loaded config");
            }

            let node = BridgeNode::new(config).context("building bridge node")?;
            node.run().await?;

            tracing::info!("shutdown signal received, stopping node");
            node.stop().await?;
            tracing::info!("bridge daemon exited cleanly");
        }
    }

    Ok(())
}
