//! Process shutdown coordination.
//!
//! One [`GracefulShutdown`] owns a watch channel holding the shutdown reason.
//! The first trigger wins; anyone waiting on it, including waiters that
//! subscribe after the fact, sees that reason.
use std::time::Duration;

use eyre::Result;
use tokio::{signal, sync::watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT or SIGTERM
    Graceful,
    /// The coordinator went away before anything was triggered
    Force,
}

pub struct GracefulShutdown {
    reason: watch::Sender<Option<ShutdownReason>>,
    /// How long in-flight requests may drain once shutdown starts
    drain_timeout: Duration,
}

impl GracefulShutdown {
    pub fn with_timeout(drain_timeout: Duration) -> Self {
        let (reason, _) = watch::channel(None);
        Self {
            reason,
            drain_timeout,
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Record `reason` and wake every waiter. Returns false if shutdown was
    /// already under way.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        let first = self.reason.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });

        if first {
            tracing::info!(?reason, "Shutdown triggered");
        } else {
            tracing::debug!(?reason, "Shutdown already in progress");
        }
        first
    }

    /// Block until SIGINT or SIGTERM arrives, then trigger a graceful
    /// shutdown.
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::info!("Listening for SIGINT and SIGTERM");

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                tracing::info!("Received SIGINT");
            }
            _ = sigterm() => {
                tracing::info!("Received SIGTERM");
            }
        }

        self.trigger(ShutdownReason::Graceful);
        Ok(())
    }

    /// Resolve once shutdown has been triggered.
    pub async fn wait_for_shutdown_signal(&self) -> ShutdownReason {
        wait_on(self.reason.subscribe()).await
    }

    /// A handle that can be moved into the server's shutdown future.
    pub fn shutdown_token(&self) -> ShutdownToken {
        ShutdownToken {
            reason: self.reason.subscribe(),
        }
    }
}

pub struct ShutdownToken {
    reason: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownToken {
    pub async fn wait_for_shutdown(self) -> ShutdownReason {
        wait_on(self.reason).await
    }
}

async fn wait_on(mut reason: watch::Receiver<Option<ShutdownReason>>) -> ShutdownReason {
    let current = reason.wait_for(Option::is_some).await.map(|current| *current);
    current.ok().flatten().unwrap_or(ShutdownReason::Force)
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!("SIGTERM handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
