//! Request/response channel to one quorum participant.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};

use bridge_protocol::{decode_response, encode_request, ExtensionCommand, RpcResponse};
use bridge_types::Identity;

use crate::ChannelError;

/// Capacity of the outbound frame queue per channel.
const OUTBOUND_CAPACITY: usize = 64;

/// Capacity of the inbound text frame queue per channel.
const INBOUND_CAPACITY: usize = 16;

/// Timed-out calls whose responses may still arrive before the channel is
/// declared out of step and closed.
pub const MAX_ABANDONED_CALLS: usize = 4;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Frames queued for the transport writer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundFrame {
    /// An encoded request.
    Text(String),
    /// Liveness frame; never answered and never takes the request slot.
    KeepAlive,
    /// Explicit ping carrying a payload.
    Ping(Vec<u8>),
    /// Close the connection.
    Close,
}

/// Transport side of a channel: frames to write and a sink for text frames read.
pub struct ChannelEndpoint {
    pub outbound: mpsc::Receiver<OutboundFrame>,
    pub inbound: mpsc::Sender<String>,
}

struct CallSlot {
    inbound: mpsc::Receiver<String>,
    /// Calls that timed out; their responses will show up before ours.
    abandoned: usize,
}

/// One participant's channel. Cloned as `Arc<RpcChannel>` into the registry
/// and every execution bound to that participant.
pub struct RpcChannel {
    id: u64,
    identity: Identity,
    outbound: mpsc::Sender<OutboundFrame>,
    slot: Mutex<CallSlot>,
    call_timeout: Duration,
    closed: AtomicBool,
}

impl RpcChannel {
    /// Create a channel and the endpoint its transport task drives.
    pub fn open(identity: Identity, call_timeout: Duration) -> (Arc<Self>, ChannelEndpoint) {
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(INBOUND_CAPACITY);
        let channel = Arc::new(Self {
            id: NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed),
            identity,
            outbound: out_tx,
            slot: Mutex::new(CallSlot {
                inbound: in_rx,
                abandoned: 0,
            }),
            call_timeout,
            closed: AtomicBool::new(false),
        });
        let endpoint = ChannelEndpoint {
            outbound: out_rx,
            inbound: in_tx,
        };
        (channel, endpoint)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.outbound.is_closed()
    }

    /// Send one command and wait for its response.
    ///
    /// Holds the channel's request slot for the whole exchange, so concurrent
    /// callers on the same channel run one after another. The wait (queueing
    /// for the slot excluded) is bounded by the channel's call timeout.
    /// A response with `status == false` is returned as
    /// [`ChannelError::Rejected`].
    pub async fn call(&self, command: &ExtensionCommand) -> Result<RpcResponse, ChannelError> {
        let frame = encode_request(command).map_err(|e| ChannelError::Encode(e.to_string()))?;
        let action = command.action();

        let mut slot = self.slot.lock().await;
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }

        // Late answers to calls that already timed out.
        while let Ok(stale) = slot.inbound.try_recv() {
            slot.abandoned = slot.abandoned.saturating_sub(1);
            tracing::warn!(
                identity = %self.identity,
                frame = %stale,
                "discarding stale response"
            );
        }

        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.call_timeout;
        tracing::debug!(identity = %self.identity, action = %action, "sending request");

        // Frames this call threw away as answers to abandoned requests.
        let mut skipped = 0usize;
        let exchange = async {
            self.outbound
                .send(OutboundFrame::Text(frame))
                .await
                .map_err(|_| ChannelError::Closed)?;
            loop {
                let text = slot.inbound.recv().await.ok_or(ChannelError::Closed)?;
                if slot.abandoned > 0 {
                    slot.abandoned -= 1;
                    skipped += 1;
                    tracing::warn!(
                        identity = %self.identity,
                        frame = %text,
                        "discarding response to an abandoned request"
                    );
                    continue;
                }
                return Ok::<String, ChannelError>(text);
            }
        };

        let outcome = tokio::time::timeout_at(deadline, exchange).await;
        let text = match outcome {
            Ok(result) => result?,
            Err(_) => {
                slot.abandoned += 1;
                tracing::warn!(
                    identity = %self.identity,
                    action = %action,
                    abandoned = slot.abandoned,
                    timeout = ?self.call_timeout,
                    "request timed out"
                );
                // Skipping a frame and still timing out means some request
                // never got an answer: the skipped frame was probably ours.
                if skipped > 0 || slot.abandoned > MAX_ABANDONED_CALLS {
                    let outstanding = slot.abandoned;
                    drop(slot);
                    self.close();
                    return Err(ChannelError::Desynchronized(outstanding));
                }
                return Err(ChannelError::Timeout(self.call_timeout));
            }
        };
        drop(slot);

        let response = decode_response(&text).map_err(|e| ChannelError::Decode(e.to_string()))?;
        tracing::debug!(
            identity = %self.identity,
            action = %action,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "received response"
        );
        if !response.status {
            return Err(ChannelError::Rejected(response.message));
        }
        Ok(response)
    }

    /// Queue a keep-alive frame. Dropped silently if the writer is backed up.
    pub fn send_keepalive(&self) -> bool {
        self.outbound.try_send(OutboundFrame::KeepAlive).is_ok()
    }

    /// Queue a ping frame.
    pub async fn ping(&self, payload: Vec<u8>) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.outbound
            .send(OutboundFrame::Ping(payload))
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Mark the channel closed and ask the writer to close the connection.
    ///
    /// Callers already waiting fail once the transport shuts down; new calls
    /// fail immediately.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(identity = %self.identity, channel = self.id, "closing channel");
            let _ = self.outbound.try_send(OutboundFrame::Close);
        }
    }
}

impl std::fmt::Debug for RpcChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChannel")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_protocol::{decode_request, encode_response, CreateFtPayload};

    fn create_ft(name: &str) -> ExtensionCommand {
        ExtensionCommand::CreateFt(CreateFtPayload {
            did: "did-a".into(),
            ft_name: name.into(),
            ft_count: 1,
            token_count: 1,
            quorum_type: 2,
        })
    }

    fn ft_name(frame: &str) -> String {
        match decode_request(frame).unwrap() {
            ExtensionCommand::CreateFt(p) => p.ft_name,
            other => panic!("unexpected command {other:?}"),
        }
    }

    /// Answers every request with `ok(<ft_name>)` after `delay`.
    fn echo_peer(mut endpoint: ChannelEndpoint, delay: Duration) {
        tokio::spawn(async move {
            while let Some(frame) = endpoint.outbound.recv().await {
                if let OutboundFrame::Text(text) = frame {
                    tokio::time::sleep(delay).await;
                    let resp = RpcResponse::ok(ft_name(&text));
                    if endpoint
                        .inbound
                        .send(encode_response(&resp).unwrap())
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        });
    }

    #[tokio::test]
    async fn call_returns_matching_response() {
        let (channel, endpoint) = RpcChannel::open(Identity::new("did-a"), Duration::from_secs(5));
        echo_peer(endpoint, Duration::ZERO);

        let resp = channel.call(&create_ft("alpha")).await.unwrap();
        assert!(resp.status);
        assert_eq!(resp.message, "alpha");
    }

    #[tokio::test]
    async fn rejected_response_is_domain_error() {
        let (channel, mut endpoint) =
            RpcChannel::open(Identity::new("did-a"), Duration::from_secs(5));
        tokio::spawn(async move {
            while let Some(OutboundFrame::Text(_)) = endpoint.outbound.recv().await {
                let resp = RpcResponse::rejected("insufficient balance");
                endpoint
                    .inbound
                    .send(encode_response(&resp).unwrap())
                    .await
                    .unwrap();
            }
        });

        let err = channel.call(&create_ft("x")).await.unwrap_err();
        assert!(!err.is_transport());
        match err {
            ChannelError::Rejected(msg) => assert_eq!(msg, "insufficient balance"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_response_is_decode_error() {
        let (channel, mut endpoint) =
            RpcChannel::open(Identity::new("did-a"), Duration::from_secs(5));
        tokio::spawn(async move {
            while let Some(OutboundFrame::Text(_)) = endpoint.outbound.recv().await {
                endpoint.inbound.send("not json".into()).await.unwrap();
            }
        });

        assert!(matches!(
            channel.call(&create_ft("x")).await,
            Err(ChannelError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_calls_never_swap_responses() {
        let (channel, endpoint) = RpcChannel::open(Identity::new("did-a"), Duration::from_secs(5));
        echo_peer(endpoint, Duration::from_millis(2));

        let mut tasks = Vec::new();
        for i in 0..16 {
            let channel = Arc::clone(&channel);
            tasks.push(tokio::spawn(async move {
                let name = format!("token-{i}");
                let resp = channel.call(&create_ft(&name)).await.unwrap();
                assert_eq!(resp.message, name);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
    }

    #[tokio::test]
    async fn late_response_is_not_handed_to_next_caller() {
        let (channel, mut endpoint) =
            RpcChannel::open(Identity::new("did-a"), Duration::from_millis(400));
        tokio::spawn(async move {
            let mut first = true;
            while let Some(frame) = endpoint.outbound.recv().await {
                if let OutboundFrame::Text(text) = frame {
                    if first {
                        first = false;
                        tokio::time::sleep(Duration::from_millis(600)).await;
                    }
                    let resp = RpcResponse::ok(ft_name(&text));
                    endpoint
                        .inbound
                        .send(encode_response(&resp).unwrap())
                        .await
                        .unwrap();
                }
            }
        });

        let err = channel.call(&create_ft("slow")).await.unwrap_err();
        assert!(matches!(err, ChannelError::Timeout(_)));
        assert!(err.is_transport());

        let resp = channel.call(&create_ft("fast")).await.unwrap();
        assert_eq!(resp.message, "fast");
    }

    #[tokio::test]
    async fn dropped_transport_fails_call() {
        let (channel, endpoint) = RpcChannel::open(Identity::new("did-a"), Duration::from_secs(5));
        drop(endpoint);
        assert!(matches!(
            channel.call(&create_ft("x")).await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test]
    async fn close_queues_close_frame_and_blocks_new_calls() {
        let (channel, mut endpoint) =
            RpcChannel::open(Identity::new("did-a"), Duration::from_secs(5));
        channel.close();
        channel.close();
        assert_eq!(endpoint.outbound.recv().await, Some(OutboundFrame::Close));
        assert!(endpoint.outbound.try_recv().is_err());
        assert!(channel.is_closed());
        assert!(matches!(
            channel.call(&create_ft("x")).await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test]
    async fn keepalive_does_not_take_request_slot() {
        let (channel, mut endpoint) =
            RpcChannel::open(Identity::new("did-a"), Duration::from_secs(5));
        let _guard = channel.slot.lock().await;
        assert!(channel.send_keepalive());
        assert_eq!(endpoint.outbound.recv().await, Some(OutboundFrame::KeepAlive));
    }

    #[tokio::test]
    async fn unanswered_request_closes_channel_instead_of_wedging_it() {
        let (channel, mut endpoint) =
            RpcChannel::open(Identity::new("did-a"), Duration::from_millis(200));
        // Drops the first request, answers every later one at once.
        tokio::spawn(async move {
            let mut first = true;
            while let Some(frame) = endpoint.outbound.recv().await {
                if let OutboundFrame::Text(text) = frame {
                    if std::mem::take(&mut first) {
                        continue;
                    }
                    let resp = RpcResponse::ok(ft_name(&text));
                    if endpoint
                        .inbound
                        .send(encode_response(&resp).unwrap())
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        });

        assert!(matches!(
            channel.call(&create_ft("lost")).await,
            Err(ChannelError::Timeout(_))
        ));
        // The answer to this call is taken for the lost one's.
        let err = channel.call(&create_ft("second")).await.unwrap_err();
        assert!(matches!(err, ChannelError::Desynchronized(_)), "got {err:?}");
        assert!(channel.is_closed());
        assert!(matches!(
            channel.call(&create_ft("third")).await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test]
    async fn repeated_timeouts_close_channel() {
        let (channel, mut endpoint) =
            RpcChannel::open(Identity::new("did-a"), Duration::from_millis(10));
        // Keep the transport alive but never answer.
        let _inbound = endpoint.inbound.clone();
        tokio::spawn(async move { while endpoint.outbound.recv().await.is_some() {} });

        for _ in 0..MAX_ABANDONED_CALLS {
            assert!(matches!(
                channel.call(&create_ft("x")).await,
                Err(ChannelError::Timeout(_))
            ));
        }
        assert!(matches!(
            channel.call(&create_ft("x")).await,
            Err(ChannelError::Desynchronized(_))
        ));
        assert!(channel.is_closed());
    }
}
