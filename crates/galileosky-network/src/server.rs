//! TCP accept loop. Deliberately thin: the spec places the accept loop
//! and connection lifecycle outside the protocol's core, as a named
//! collaborator rather than hand-tuned machinery. One [`tokio::spawn`]
//! per accepted connection, matching §5's "one logical task per TCP
//! connection" scheduling model.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::{NetworkError, NetworkResult};
use crate::session::{self, SessionContext};
use galileosky_metrics::MercuryMetrics;
use galileosky_sink::JsonlSink;

/// Listens on `bind_addr` and spawns a [`session::run`] task for every
/// accepted connection. Runs until the listener itself errors (bind
/// failure is reported up front; accept-loop errors after that point are
/// logged and do not stop the server, since they're almost always
/// transient per-connection issues, not listener failures).
pub struct Server {
    listener: TcpListener,
    sink: Arc<JsonlSink>,
    metrics: Option<Arc<MercuryMetrics>>,
    idle_timeout: Duration,
}

impl Server {
    pub async fn bind(
        bind_addr: SocketAddr,
        sink: Arc<JsonlSink>,
        metrics: Option<Arc<MercuryMetrics>>,
        idle_timeout: Duration,
    ) -> NetworkResult<Self> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|err| NetworkError::BindFailed(bind_addr, err))?;
        info!(addr = %bind_addr, "galileosky listener bound");
        Ok(Self { listener, sink, metrics, idle_timeout })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop forever. A failed `accept()` call is logged
    /// and retried; it never tears down already-running sessions. Returns
    /// only if the caller races it against another future (e.g. a
    /// shutdown signal) via `tokio::select!` — it never completes on its
    /// own.
    pub async fn serve(&self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(err) = stream.set_nodelay(true) {
                        warn!(peer = %addr, error = %err, "failed to set TCP_NODELAY");
                    }
                    let ctx = SessionContext {
                        sink: Arc::clone(&self.sink),
                        metrics: self.metrics.clone(),
                        idle_timeout: self.idle_timeout,
                    };
                    tokio::spawn(async move {
                        session::run(stream, addr, ctx).await;
                    });
                }
                Err(err) => {
                    error!(error = %err, "accept() failed, retrying");
                }
            }
        }
    }
}
