//! Listeners: one axum server on the signaling port carrying the WebSocket
//! endpoint and the status routes, plus an optional dedicated status
//! listener. Both stop on one cancellation token.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::Router;
use signalhub_common::RelayError;
use signalhub_config::RelayConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::connection::{ws_handler, RelayState};
use crate::hub::SignalHub;
use crate::status::status_router;

/// Per-connection knobs handed to the signaling listener.
#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    pub outbound_queue: usize,
    /// Largest WebSocket message the transport will read at all.
    pub frame_ceiling: usize,
    pub shutdown_grace: Duration,
    /// Serve `/health`, `/meeting/:id` and `/meetings` next to the
    /// WebSocket endpoint.
    pub status_routes: bool,
}

impl From<&RelayConfig> for RelaySettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            outbound_queue: config.limits.outbound_queue,
            frame_ceiling: config.limits.transport_ceiling(),
            shutdown_grace: Duration::from_secs(config.limits.shutdown_grace_secs),
            status_routes: config.status.enabled,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

/// Bind the listeners from config and serve until `shutdown` fires.
pub async fn run(config: &RelayConfig, shutdown: CancellationToken) -> Result<(), RelayError> {
    let hub = SignalHub::with_max_message_bytes(config.limits.max_message_bytes);
    let settings = RelaySettings::from(config);

    let signal_addr = socket_addr(&config.server.bind_address, config.server.port)?;
    let listener = bind(signal_addr).await?;
    tracing::info!("signalhub-relay listening on ws://{}", signal_addr);
    if settings.status_routes {
        tracing::info!("Health check: http://{}/health", signal_addr);
    }

    let status_listener = match config.status.port.filter(|_| config.status.enabled) {
        Some(port) => {
            let status_addr = socket_addr(&config.status.bind_address, port)?;
            let listener = bind(status_addr).await?;
            tracing::info!("Dedicated status endpoint on http://{}/health", status_addr);
            Some(listener)
        }
        None => None,
    };

    serve(listener, status_listener, hub, settings, shutdown).await
}

/// Signaling router: status routes (when enabled) and a WebSocket upgrade
/// for every other path.
pub fn relay_router(state: RelayState) -> Router {
    let status_routes = state.settings.status_routes;
    let hub = state.hub.clone();
    let signaling = Router::new().fallback(ws_handler).with_state(state);
    if status_routes {
        status_router(hub).merge(signaling)
    } else {
        signaling
    }
}

/// Serve on already-bound listeners. Returns after `shutdown` is cancelled
/// and connections have drained (or the grace period ran out).
pub async fn serve(
    listener: TcpListener,
    status_listener: Option<TcpListener>,
    hub: SignalHub,
    settings: RelaySettings,
    shutdown: CancellationToken,
) -> Result<(), RelayError> {
    let status_task = status_listener.map(|status_listener| {
        let router = status_router(hub.clone());
        let token = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(status_listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        })
    });

    // Upgraded sockets outlive their HTTP request; the tracker is what
    // shutdown waits on.
    let tracker = TaskTracker::new();
    let app = relay_router(RelayState {
        hub,
        settings,
        tracker: tracker.clone(),
        shutdown: shutdown.clone(),
    });

    let token = shutdown.clone();
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { token.cancelled().await })
    .await;

    tracing::info!(connections = tracker.len(), "Shutting down, no longer accepting");
    tracker.close();

    if tokio::time::timeout(settings.shutdown_grace, tracker.wait())
        .await
        .is_err()
    {
        tracing::warn!(
            remaining = tracker.len(),
            grace_secs = settings.shutdown_grace.as_secs(),
            "Shutdown grace period elapsed with connections still open"
        );
    }

    if let Some(task) = status_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RelayError::Io(e)),
            Err(e) => tracing::warn!(error = %e, "Status server task failed"),
        }
    }

    served?;
    tracing::info!("Relay stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

fn socket_addr(bind_address: &str, port: u16) -> Result<SocketAddr, RelayError> {
    let ip: IpAddr = bind_address
        .parse()
        .map_err(|_| RelayError::Address(format!("{bind_address}:{port}")))?;
    Ok(SocketAddr::new(ip, port))
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, RelayError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| RelayError::Bind { addr, source })
}
