//! Nullable quorum participant: answers requests on a channel endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use bridge_network::{ChannelEndpoint, OutboundFrame};
use bridge_protocol::{decode_request, encode_response, ExtensionCommand, RpcResponse};

/// What the fake participant sends back, and after how long.
#[derive(Clone, Debug)]
pub struct QuorumReply {
    pub delay: Duration,
    pub response: RpcResponse,
}

impl QuorumReply {
    pub fn now(response: RpcResponse) -> Self {
        Self {
            delay: Duration::ZERO,
            response,
        }
    }

    pub fn after(delay: Duration, response: RpcResponse) -> Self {
        Self { delay, response }
    }
}

type Responder = dyn Fn(&ExtensionCommand) -> QuorumReply + Send + Sync;

/// A participant that processes requests one at a time, like a real peer
/// reading from a single socket.
pub struct NullQuorum {
    received: Arc<Mutex<Vec<ExtensionCommand>>>,
    keepalives: Arc<Mutex<usize>>,
    task: JoinHandle<()>,
}

impl NullQuorum {
    /// Drive `endpoint`, answering each request with `responder`.
    pub fn spawn<F>(mut endpoint: ChannelEndpoint, responder: F) -> Self
    where
        F: Fn(&ExtensionCommand) -> QuorumReply + Send + Sync + 'static,
    {
        let received = Arc::new(Mutex::new(Vec::new()));
        let keepalives = Arc::new(Mutex::new(0usize));
        let responder: Arc<Responder> = Arc::new(responder);

        let task = {
            let received = Arc::clone(&received);
            let keepalives = Arc::clone(&keepalives);
            tokio::spawn(async move {
                while let Some(frame) = endpoint.outbound.recv().await {
                    match frame {
                        OutboundFrame::Text(text) => {
                            let command = match decode_request(&text) {
                                Ok(cmd) => cmd,
                                Err(e) => {
                                    tracing::warn!(error = %e, "null quorum got undecodable request");
                                    continue;
                                }
                            };
                            let reply = responder(&command);
                            received.lock().unwrap().push(command);
                            if !reply.delay.is_zero() {
                                tokio::time::sleep(reply.delay).await;
                            }
                            let Ok(frame) = encode_response(&reply.response) else {
                                continue;
                            };
                            if endpoint.inbound.send(frame).await.is_err() {
                                break;
                            }
                        }
                        OutboundFrame::KeepAlive | OutboundFrame::Ping(_) => {
                            *keepalives.lock().unwrap() += 1;
                        }
                        OutboundFrame::Close => break,
                    }
                }
            })
        };

        Self {
            received,
            keepalives,
            task,
        }
    }

    /// A participant that accepts everything with message `"ok"`.
    pub fn accepting(endpoint: ChannelEndpoint) -> Self {
        Self::spawn(endpoint, |_| QuorumReply::now(RpcResponse::ok("ok")))
    }

    /// Commands received so far, in arrival order.
    pub fn received(&self) -> Vec<ExtensionCommand> {
        self.received.lock().unwrap().clone()
    }

    /// Keep-alive and ping frames seen so far.
    pub fn keepalives(&self) -> usize {
        *self.keepalives.lock().unwrap()
    }

    /// Simulate the participant vanishing.
    pub fn disconnect(self) {
        self.task.abort();
    }
}

impl Drop for NullQuorum {
    fn drop(&mut self) {
        self.task.abort();
    }
}
