//! Graceful shutdown for the bridge node.
//!
//! SIGINT/SIGTERM (or a programmatic trigger) is broadcast to every
//! subscriber through a `tokio::sync::broadcast` channel.

use std::future::Future;

use tokio::signal;
use tokio::sync::broadcast;

pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// A future that resolves once shutdown has been triggered.
    ///
    /// Subscribes immediately, so a trigger after this call but before the
    /// first poll is not missed.
    pub fn notified(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            // A closed channel means the controller is gone; treat it as shutdown.
            let _ = rx.recv().await;
        }
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
            _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
        }

        self.trigger();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_resolves_pending_notifications() {
        let controller = ShutdownController::new();
        let first = tokio::spawn(controller.notified());
        let second = tokio::spawn(controller.notified());
        controller.trigger();
        tokio::time::timeout(Duration::from_secs(1), async {
            first.await.unwrap();
            second.await.unwrap();
        })
        .await
        .expect("both waiters should be released");
    }

    #[tokio::test]
    async fn notification_is_pending_until_triggered() {
        let controller = ShutdownController::new();
        let waiter = controller.notified();
        assert!(tokio::time::timeout(Duration::from_millis(50), waiter)
            .await
            .is_err());
    }
}
