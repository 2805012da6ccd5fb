//! Per-identity RPC channels and the registry that owns them.
//!
//! A quorum participant connects once and is reachable through exactly one
//! [`RpcChannel`]. The protocol carries no request ids, so each channel admits
//! a single request in flight and pairs every response with the request that
//! preceded it. Transport (the WebSocket) lives elsewhere: it drives the
//! [`ChannelEndpoint`] half of the channel.

pub mod channel;
pub mod error;
pub mod registry;

pub use channel::{ChannelEndpoint, OutboundFrame, RpcChannel, MAX_ABANDONED_CALLS};
pub use error::ChannelError;
pub use registry::{ConnectionRegistry, SharedRegistry};
