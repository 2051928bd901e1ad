//! Accept loop.
//!
//! # Responsibilities
//! - Accept client connections from the bounded listener
//! - Spawn one detached task per connection running the `ConnectionHandler`
//! - Keep handler failures inside their task
//! - Stop accepting on shutdown and drain in-flight connections (bounded)

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::Instrument;

use crate::cache::ResponseCache;
use crate::config::ProxyConfig;
use crate::http::error::ProxyError;
use crate::http::handler::{ConnectionHandler, Outcome};
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// The forward proxy server.
pub struct ProxyServer {
    handler: ConnectionHandler,
    tracker: ConnectionTracker,
    shutdown_grace: Duration,
}

impl ProxyServer {
    /// Create a server that answers from `cache` and forwards per `config`.
    pub fn new(config: &ProxyConfig, cache: Arc<ResponseCache>) -> Self {
        Self {
            handler: ConnectionHandler::new(cache, config.forwarding.clone()),
            tracker: ConnectionTracker::new(),
            shutdown_grace: Duration::from_secs(config.listener.shutdown_grace_secs),
        }
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(address = %addr, "Proxy accepting connections");

        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => accepted,
            };

            let (stream, peer_addr, permit) = match accepted {
                Ok(conn) => conn,
                Err(ListenerError::Closed) => return Err(ListenerError::Closed),
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            };

            let guard = self.tracker.track();
            let span = tracing::info_span!("connection", connection_id = %guard.id(), peer_addr = %peer_addr);
            let handler = self.handler.clone();

            tokio::spawn(
                async move {
                    let _permit = permit;
                    let _guard = guard;
                    log_outcome(handler.serve(stream).await);
                }
                .instrument(span),
            );
        }

        tracing::info!(
            active_connections = self.tracker.active_count(),
            "Stopped accepting, draining connections"
        );
        if !self.tracker.wait_idle(self.shutdown_grace).await {
            tracing::warn!(
                active_connections = self.tracker.active_count(),
                "Grace period elapsed with connections still open"
            );
        }
        tracing::info!("Proxy stopped");
        Ok(())
    }
}

fn log_outcome(result: Result<Outcome, ProxyError>) {
    match result {
        Ok(outcome) => tracing::trace!(?outcome, "Connection finished"),
        Err(e) => {
            metrics::record_request_error(e.kind());
            if e.is_origin_failure() {
                metrics::record_origin_error();
                tracing::warn!(error = %e, "Origin exchange failed");
            } else {
                tracing::debug!(error = %e, "Connection closed early");
            }
        }
    }
}
