//! Bridge node: configuration, wiring and lifecycle.
//!
//! The node opens storage, builds the chain client, the credit ledger and
//! rating aggregator, and serves the HTTP API together with the participant
//! WebSocket endpoint until shutdown.

pub mod config;
pub mod error;
pub mod node;
pub mod shutdown;

pub use config::BridgeConfig;
pub use error::NodeError;
pub use node::BridgeNode;
pub use shutdown::ShutdownController;
