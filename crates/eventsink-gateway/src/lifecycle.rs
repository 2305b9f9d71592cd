//! Process lifecycle: bind, serve in the background, wait for a signal, drain.
//!
//! State machine: `Starting -> Running -> ShuttingDown -> Stopped`.
//!
//! Shutdown is driven by a `CancellationToken` rather than global signal
//! state: `shutdown_signal` cancels it on SIGINT/SIGTERM, and anything else
//! holding the token (tests, embedding code) can cancel it directly. Once
//! cancelled, the listener stops accepting and in-flight requests get up to
//! the grace period to finish.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use eventsink_core::error::{EventSinkError, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Starting = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::ShuttingDown => "shutting_down",
            Phase::Stopped => "stopped",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Phase::Starting,
            1 => Phase::Running,
            2 => Phase::ShuttingDown,
            _ => Phase::Stopped,
        }
    }
}

/// Observable lifecycle phase, shared between the server handle and callers.
#[derive(Debug)]
pub struct LifecycleState {
    phase: AtomicU8,
}

impl LifecycleState {
    fn new() -> Self {
        Self { phase: AtomicU8::new(Phase::Starting as u8) }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn advance(&self, to: Phase) {
        self.phase.store(to as u8, Ordering::Release);
        tracing::info!(phase = to.as_str(), "lifecycle transition");
    }
}

/// A bound listener that has not started serving yet.
pub struct Server {
    listener: TcpListener,
    state: Arc<LifecycleState>,
}

impl Server {
    /// Bind the listener. Failure here is fatal for the process.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| EventSinkError::Internal(format!("bind {addr} failed: {e}")))?;
        Ok(Self { listener, state: Arc::new(LifecycleState::new()) })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| EventSinkError::Internal(format!("local_addr: {e}")))
    }

    pub fn lifecycle(&self) -> Arc<LifecycleState> {
        Arc::clone(&self.state)
    }

    /// Start accepting on a background task until `shutdown` is cancelled.
    pub fn spawn(self, app: Router, shutdown: CancellationToken) -> RunningServer {
        let Server { listener, state } = self;

        let stop = shutdown.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
        });

        state.advance(Phase::Running);
        RunningServer { handle, shutdown, state }
    }
}

/// Handle to a serving listener.
pub struct RunningServer {
    handle: JoinHandle<io::Result<()>>,
    shutdown: CancellationToken,
    state: Arc<LifecycleState>,
}

impl RunningServer {
    pub fn lifecycle(&self) -> Arc<LifecycleState> {
        Arc::clone(&self.state)
    }

    /// Stop accepting, let in-flight requests finish within `grace`, then stop.
    ///
    /// Errors on this path are logged and never change the outcome.
    pub async fn shutdown(mut self, grace: Duration) -> Phase {
        self.state.advance(Phase::ShuttingDown);
        self.shutdown.cancel();

        match tokio::time::timeout(grace, &mut self.handle).await {
            Ok(Ok(Ok(()))) => tracing::info!("in-flight requests drained"),
            Ok(Ok(Err(e))) => tracing::warn!(error = %e, "server exited with error during shutdown"),
            Ok(Err(e)) => tracing::warn!(error = %e, "server task failed during shutdown"),
            Err(_) => {
                tracing::warn!(
                    grace_ms = grace.as_millis() as u64,
                    "grace period expired, dropping remaining connections"
                );
                self.handle.abort();
            }
        }

        self.state.advance(Phase::Stopped);
        Phase::Stopped
    }
}

/// Resolve on SIGINT, SIGTERM (unix), or external cancellation of `token`,
/// then make sure `token` is cancelled.
pub async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("interrupt received, starting graceful shutdown"),
        _ = terminate => tracing::info!("terminate received, starting graceful shutdown"),
        _ = token.cancelled() => tracing::info!("shutdown requested"),
    }
    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_round_trips_through_atomic() {
        let state = LifecycleState::new();
        assert_eq!(state.phase(), Phase::Starting);
        for p in [Phase::Running, Phase::ShuttingDown, Phase::Stopped] {
            state.advance(p);
            assert_eq!(state.phase(), p);
        }
    }

    #[tokio::test]
    async fn cancelled_token_ends_signal_wait() {
        let token = CancellationToken::new();
        let waiter = tokio::spawn(shutdown_signal(token.clone()));
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("shutdown_signal must return")
            .unwrap();
    }
}
