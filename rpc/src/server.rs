//! Axum-based HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use bridge_websocket::WsState;

use crate::{handlers, AppState};

/// Every route of the bridge, the participant WebSocket included.
pub fn router(state: Arc<AppState>, ws: Arc<WsState>) -> Router {
    Router::new()
        .route("/connected-clients", get(handlers::connected_clients))
        .route("/ping-client", get(handlers::ping_client))
        .route("/api/create_token", post(handlers::create_token))
        .route("/api/upload_asset", post(handlers::upload_asset))
        .route("/api/use_asset", post(handlers::use_asset))
        .route("/api/pay_for_inference", post(handlers::pay_for_inference))
        .route("/api/add_credits", post(handlers::add_credits))
        .route(
            "/api/onboard_infra_provider",
            post(handlers::onboard_infra_provider),
        )
        .route("/api/deduct_credits", post(handlers::deduct_credits))
        .route("/api/credit_balance/:did", get(handlers::credit_balance))
        .route("/api/onboarded_providers", get(handlers::onboarded_providers))
        .route("/api/get_rating_by_asset", get(handlers::rating_by_asset))
        .route("/metrics/asset_count", get(handlers::asset_count))
        .route("/metrics/transaction_count", get(handlers::transaction_count))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
        .merge(bridge_websocket::router(ws))
        .layer(CorsLayer::permissive())
}

pub struct RpcServer {
    addr: SocketAddr,
    app: Router,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, state: Arc<AppState>, ws: Arc<WsState>) -> Self {
        Self {
            addr,
            app: router(state, ws),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.addr).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %listener.local_addr()?, "HTTP API listening");
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
