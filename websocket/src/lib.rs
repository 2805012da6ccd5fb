//! WebSocket endpoint for quorum participants.
//!
//! A participant connects to `/ws?clientID=<did>`, sends one "open" message,
//! and from then on is reachable through an [`bridge_network::RpcChannel`]
//! registered under its identity. This crate owns the socket: it writes the
//! channel's outbound frames, forwards inbound text frames to it, emits
//! keep-alive frames, and removes the registration when the socket ends.

pub mod keepalive;
pub mod server;

pub use keepalive::spawn_keepalive;
pub use server::{router, ws_handler, WsSettings, WsState};
