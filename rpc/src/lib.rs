//! HTTP API of the quorum bridge.
//!
//! Provides endpoints for:
//! - Contract execution with host actions bound to the caller's channel
//! - Connected participants and manual pings
//! - Credit balances and deductions
//! - Asset ratings and onboarded providers
//! - Asset/transaction counts and Prometheus metrics
//!
//! The participant WebSocket endpoint is merged in from `bridge-websocket`.

pub mod contracts;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod state;

pub use contracts::{ContractRequest, ContractRoute};
pub use error::ApiError;
pub use metrics::BridgeMetrics;
pub use server::{router, RpcServer};
pub use state::{ApiSettings, AppState};
