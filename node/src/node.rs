//! Bridge node: owns storage, the participant registry and the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use bridge_chain::{ChainApi, NodeClient};
use bridge_crypto::KeyStore;
use bridge_host::WasmSandboxFactory;
use bridge_ledger::{CreditLedger, RatingAggregator};
use bridge_network::{ConnectionRegistry, SharedRegistry};
use bridge_rpc::{ApiSettings, AppState, BridgeMetrics, RpcServer};
use bridge_store_lmdb::LmdbEnvironment;
use bridge_websocket::{WsSettings, WsState};

use crate::{BridgeConfig, NodeError, ShutdownController};

/// Named databases: credits and providers.
const MAX_DBS: u32 = 4;
/// 1 GiB map; credit and provider records are small.
const DEFAULT_MAP_SIZE: usize = 1 << 30;

pub struct BridgeNode {
    config: BridgeConfig,
    env: LmdbEnvironment,
    registry: SharedRegistry,
    state: Arc<AppState>,
    ws: Arc<WsState>,
    shutdown: Arc<ShutdownController>,
}

impl BridgeNode {
    /// Build a node from `config`.
    ///
    /// Opens the LMDB environment at `config.data_dir` and wires every
    /// subsystem. Nothing listens until [`BridgeNode::bind`] is called.
    pub fn new(config: BridgeConfig) -> Result<Self, NodeError> {
        config.validate()?;

        let env = LmdbEnvironment::open(&config.data_dir, MAX_DBS, DEFAULT_MAP_SIZE)?;
        let registry = ConnectionRegistry::shared();

        let chain: Arc<dyn ChainApi> = Arc::new(NodeClient::with_timeout(
            config.node_address.clone(),
            config.rpc_timeout(),
        ));

        if config.onboarding_contract.is_empty() {
            tracing::warn!("no onboarding_contract configured; onboarding requests will fail");
        }

        let state = Arc::new(AppState {
            registry: Arc::clone(&registry),
            chain: Arc::clone(&chain),
            ledger: CreditLedger::new(Arc::new(env.credit_store())),
            ratings: RatingAggregator::new(Arc::clone(&chain), config.rating_contract.clone()),
            providers: Arc::new(env.provider_store()),
            keys: KeyStore::new(config.did_dir.clone()),
            sandboxes: Arc::new(WasmSandboxFactory::new()),
            metrics: Arc::new(BridgeMetrics::new()),
            settings: ApiSettings {
                quorum_type: config.quorum_type,
                artifacts_dir: config.artifacts_dir.clone(),
                asset_dir: config.asset_dir.clone(),
                nft_dir: config.nft_dir.clone(),
                onboarding_contract: config.onboarding_contract.clone(),
                tracked_contracts: config.tracked_contracts.clone(),
            },
        });

        let ws = Arc::new(WsState::new(
            Arc::clone(&registry),
            WsSettings {
                handshake_timeout: config.handshake_timeout(),
                keepalive_interval: config.keepalive_interval(),
                call_timeout: config.rpc_timeout(),
            },
        ));

        Ok(Self {
            config,
            env,
            registry,
            state,
            ws,
            shutdown: Arc::new(ShutdownController::new()),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Bind the configured listen address.
    pub async fn bind(&self) -> Result<TcpListener, NodeError> {
        Ok(TcpListener::bind(self.config.socket_addr()).await?)
    }

    /// Serve the API on `listener` until shutdown is triggered.
    ///
    /// Registered channels are closed as soon as shutdown fires, so
    /// participant sockets do not hold the server open.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), NodeError> {
        let addr: SocketAddr = listener.local_addr()?;
        let server = RpcServer::new(addr, Arc::clone(&self.state), Arc::clone(&self.ws));

        let registry = Arc::clone(&self.registry);
        let notified = self.shutdown.notified();
        let on_shutdown = async move {
            notified.await;
            let closed = registry.write().await.close_all();
            tracing::info!(closed, "participant channels closed");
        };

        server
            .serve(listener, on_shutdown)
            .await
            .map_err(|e| NodeError::Server(e.to_string()))
    }

    /// Serve until SIGINT/SIGTERM.
    pub async fn run(&self) -> Result<(), NodeError> {
        let listener = self.bind().await?;

        let shutdown = Arc::clone(&self.shutdown);
        let signals = tokio::spawn(async move { shutdown.wait_for_signal().await });

        tracing::info!(
            addr = %listener.local_addr()?,
            node = %self.config.node_address,
            quorum_type = self.config.quorum_type,
            "bridge node started"
        );
        let result = self.serve(listener).await;
        signals.abort();
        result
    }

    /// Stop the node: signal shutdown, close every participant channel and
    /// flush storage.
    pub async fn stop(&self) -> Result<(), NodeError> {
        tracing::info!("bridge node stopping");
        self.shutdown.trigger();

        let closed = self.registry.write().await.close_all();
        if closed > 0 {
            tracing::info!(closed, "participant channels closed");
        }

        self.env.sync()?;
        tracing::info!("storage flushed");
        Ok(())
    }
}
