//! API error types and their HTTP mapping.
//!
//! Every failure leaves as `{"status": false, "message": ..}`. Status codes
//! fall in four classes: malformed requests (400), domain rejections (422),
//! missing or unreachable peers (503) and local storage faults (500).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use bridge_chain::ChainError;
use bridge_host::{HostError, SandboxError};
use bridge_ledger::LedgerError;
use bridge_network::ChannelError;
use bridge_store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

fn chain_status(e: &ChainError) -> StatusCode {
    if e.is_infrastructure() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

fn host_status(e: &HostError) -> StatusCode {
    if e.is_infrastructure() {
        StatusCode::SERVICE_UNAVAILABLE
    } else if e.is_domain_rejection() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn ledger_status(e: &LedgerError) -> StatusCode {
    match e {
        LedgerError::InsufficientCredit { .. } | LedgerError::Overflow { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        LedgerError::Chain(e) => chain_status(e),
        LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Channel(ChannelError::Rejected(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Channel(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Sandbox(e) => match e {
                SandboxError::Host { source, .. } => host_status(source),
                SandboxError::InvalidEntry(_) => StatusCode::BAD_REQUEST,
                SandboxError::UnknownFunction(_) | SandboxError::Trap(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                SandboxError::DuplicateFunction(_) | SandboxError::Load { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Ledger(e) => ledger_status(e),
            ApiError::Chain(e) => chain_status(e),
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the execution outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => "invalid",
            StatusCode::UNPROCESSABLE_ENTITY => "rejected",
            StatusCode::SERVICE_UNAVAILABLE => "unavailable",
            _ => "error",
        }
    }

    /// Id of an NFT that was created even though the request failed.
    fn partial_nft_id(&self) -> Option<&str> {
        match self {
            ApiError::Sandbox(e) => match e.host_error() {
                Some(HostError::PartialMint { nft_id, .. }) => Some(nft_id),
                _ => None,
            },
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request refused");
        }

        let mut body = serde_json::json!({
            "status": false,
            "message": self.to_string(),
        });
        if let Some(nft_id) = self.partial_nft_id() {
            body["nft_id"] = serde_json::Value::from(nft_id);
        }
        (status, Json(body)).into_response()
    }
}
