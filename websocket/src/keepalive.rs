//! Periodic liveness frames on an established connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use bridge_network::RpcChannel;

/// Shortest interval accepted; a zero interval would spin.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Queue a keep-alive frame on `channel` every `interval` until the channel
/// closes or the task is aborted.
///
/// Keep-alives go straight to the writer queue and never wait for the
/// request slot, so they keep flowing while a call is in flight.
pub fn spawn_keepalive(channel: Arc<RpcChannel>, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(MIN_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if channel.is_closed() {
                debug!(identity = %channel.identity(), "keep-alive stopped, channel closed");
                break;
            }
            if channel.send_keepalive() {
                trace!(identity = %channel.identity(), "keep-alive queued");
            } else {
                debug!(identity = %channel.identity(), "keep-alive skipped, writer backed up");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_network::OutboundFrame;
    use bridge_types::Identity;

    #[tokio::test]
    async fn emits_keepalives_until_closed() {
        let (channel, mut endpoint) =
            RpcChannel::open(Identity::new("did-k"), Duration::from_secs(1));
        let task = spawn_keepalive(Arc::clone(&channel), Duration::from_millis(20));

        for _ in 0..3 {
            let frame = tokio::time::timeout(Duration::from_secs(1), endpoint.outbound.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(frame, OutboundFrame::KeepAlive);
        }

        channel.close();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn no_frame_before_first_interval() {
        let (channel, mut endpoint) =
            RpcChannel::open(Identity::new("did-k"), Duration::from_secs(1));
        let task = spawn_keepalive(channel, Duration::from_millis(200));
        let early = tokio::time::timeout(Duration::from_millis(50), endpoint.outbound.recv()).await;
        assert!(early.is_err());
        task.abort();
    }
}
