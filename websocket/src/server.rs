//! WebSocket server implementation.
//!
//! Accepts connections at `/ws?clientID=<did>`. The flow per connection:
//! 1. Wait (bounded by the handshake window) for the participant's first
//!    message; nothing is registered before it arrives.
//! 2. Open an [`RpcChannel`] for the identity and register it, closing any
//!    channel it supersedes.
//! 3. Pump frames: a writer task drains the channel's outbound queue into the
//!    socket, the reader forwards text frames to the channel, and a
//!    keep-alive task runs alongside.
//! 4. When either side ends, close the channel and drop the registration if
//!    it is still ours.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use bridge_network::{ChannelEndpoint, OutboundFrame, RpcChannel, SharedRegistry};
use bridge_types::Identity;

use crate::keepalive::spawn_keepalive;

/// Timing knobs for accepted connections.
#[derive(Clone, Debug)]
pub struct WsSettings {
    /// How long a new connection may take to send its open message.
    pub handshake_timeout: Duration,
    pub keepalive_interval: Duration,
    /// Per-call timeout of the channels opened for participants.
    pub call_timeout: Duration,
}

impl Default for WsSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(15),
            call_timeout: Duration::from_secs(300),
        }
    }
}

/// Shared state for the WebSocket endpoint.
pub struct WsState {
    pub registry: SharedRegistry,
    pub settings: WsSettings,
}

impl WsState {
    pub fn new(registry: SharedRegistry, settings: WsSettings) -> Self {
        Self { registry, settings }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(rename = "clientID")]
    client_id: Option<String>,
}

/// Router serving `/ws`, ready to merge into the HTTP API.
pub fn router(state: Arc<WsState>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "status": false, "message": message })),
    )
        .into_response()
}

/// Axum handler that upgrades an HTTP request to a participant connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<WsState>>,
) -> Response {
    let identity = match params.client_id.as_deref().map(Identity::parse) {
        Some(Ok(identity)) => identity,
        Some(Err(e)) => return bad_request(format!("invalid clientID: {e}")),
        None => return bad_request("clientID is required".to_string()),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, identity, state))
}

async fn handle_socket(socket: WebSocket, identity: Identity, state: Arc<WsState>) {
    let (mut sink, mut stream) = socket.split();

    let handshake = tokio::time::timeout(
        state.settings.handshake_timeout,
        read_open_message(&mut stream),
    )
    .await;
    match handshake {
        Ok(Some(open)) => {
            info!(identity = %identity, open = %open, "participant sent open message");
        }
        Ok(None) => {
            debug!(identity = %identity, "connection ended before open message");
            return;
        }
        Err(_) => {
            warn!(
                identity = %identity,
                window = ?state.settings.handshake_timeout,
                "no open message within handshake window"
            );
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    }

    let (channel, endpoint) = RpcChannel::open(identity.clone(), state.settings.call_timeout);
    let ChannelEndpoint { outbound, inbound } = endpoint;

    let superseded = state.registry.write().await.register(Arc::clone(&channel));
    match superseded {
        Some(old) => info!(
            identity = %identity,
            channel = channel.id(),
            superseded = old.id(),
            "participant reconnected"
        ),
        None => info!(identity = %identity, channel = channel.id(), "participant registered"),
    }

    let mut writer = tokio::spawn(write_frames(sink, outbound, identity.clone()));
    let keepalive = spawn_keepalive(Arc::clone(&channel), state.settings.keepalive_interval);

    tokio::select! {
        _ = read_frames(&mut stream, inbound, &channel) => {}
        _ = &mut writer => {}
    }

    keepalive.abort();
    channel.close();
    if !writer.is_finished() {
        writer.abort();
    }

    let removed = state
        .registry
        .write()
        .await
        .remove_if_current(&identity, channel.id());
    info!(
        identity = %identity,
        channel = channel.id(),
        removed,
        "participant disconnected"
    );
}

/// First data message of a new connection, or `None` if the socket ends
/// first.
async fn read_open_message(stream: &mut SplitStream<WebSocket>) -> Option<String> {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Binary(data)) => return Some(String::from_utf8_lossy(&data).into_owned()),
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "read failed during handshake");
                return None;
            }
        }
    }
    None
}

/// Forward inbound data frames to the channel until the socket ends.
///
/// A full inbound queue means the participant is sending frames nobody asked
/// for. Responses can no longer be matched to requests, so the channel is
/// closed rather than losing a frame.
async fn read_frames(
    stream: &mut SplitStream<WebSocket>,
    inbound: mpsc::Sender<String>,
    channel: &RpcChannel,
) {
    let identity = channel.identity();
    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    warn!(identity = %identity, "dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(frame)) => {
                debug!(identity = %identity, ?frame, "participant sent close frame");
                return;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(identity = %identity, error = %e, "websocket receive error");
                return;
            }
        };

        match inbound.try_send(text) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(text)) => {
                warn!(
                    identity = %identity,
                    channel = channel.id(),
                    frame = %text,
                    "inbound queue full, closing desynchronized channel"
                );
                channel.close();
                return;
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return,
        }
    }
}

/// Write the channel's outbound frames to the socket until a close frame or a
/// write failure.
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<OutboundFrame>,
    identity: Identity,
) {
    while let Some(frame) = outbound.recv().await {
        let (message, last) = match frame {
            OutboundFrame::Text(text) => (Message::Text(text), false),
            OutboundFrame::KeepAlive => (Message::Pong(Vec::new()), false),
            OutboundFrame::Ping(payload) => (Message::Ping(payload), false),
            OutboundFrame::Close => (Message::Close(None), true),
        };
        if let Err(e) = sink.send(message).await {
            warn!(identity = %identity, error = %e, "websocket write failed");
            break;
        }
        if last {
            break;
        }
    }
}
