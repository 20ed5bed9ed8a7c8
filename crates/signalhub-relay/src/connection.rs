//! Per-connection handler: route inbound frames through the hub, write
//! queued outbound frames to the socket, clean up on close.

use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use signalhub_common::ProtocolError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::handle::ConnectionHandle;
use crate::hub::SignalHub;
use crate::server::RelaySettings;

/// Shared by every upgrade on the signaling listener.
#[derive(Clone)]
pub struct RelayState {
    pub hub: SignalHub,
    pub settings: RelaySettings,
    pub tracker: TaskTracker,
    pub shutdown: CancellationToken,
}

/// Upgrade any non-status request to a signaling WebSocket.
///
/// Frames larger than `frame_ceiling` fail at the reader and close the
/// connection without being buffered.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<RelayState>,
) -> Response {
    let ceiling = state.settings.frame_ceiling;
    ws.max_message_size(ceiling)
        .max_frame_size(ceiling)
        .on_upgrade(move |socket| {
            let RelayState {
                hub,
                settings,
                tracker,
                shutdown,
            } = state;
            tracker.track_future(handle_connection(
                socket,
                addr,
                hub,
                settings.outbound_queue,
                shutdown,
            ))
        })
}

/// Handle a single WebSocket connection until it closes or the server
/// shuts down.
pub async fn handle_connection(
    socket: WebSocket,
    addr: SocketAddr,
    hub: SignalHub,
    outbound_queue: usize,
    shutdown: CancellationToken,
) {
    let (mut sink, mut stream) = socket.split();
    let (handle, mut rx) = ConnectionHandle::channel(outbound_queue);
    let id = handle.id();

    tracing::info!(peer = %addr, connection = %id.short(), "Client connected");

    let reason = loop {
        tokio::select! {
            // Queued frames for this client -> its WebSocket
            Some(frame) = rx.recv() => {
                if sink.send(Message::Text(frame)).await.is_err() {
                    break "send failed";
                }
            }

            // Frames from this client -> the hub
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        hub.route(&handle, &text).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        hub.reject(&handle, ProtocolError::BinaryFrame);
                    }
                    Some(Ok(Message::Close(_))) | None => break "closed by peer",
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break "transport error";
                    }
                    // Pings are answered by the transport.
                    Some(Ok(_)) => {}
                }
            }

            _ = shutdown.cancelled() => break "server shutdown",
        }
    };

    // Leave the meeting first so nothing new is queued for us.
    let participant = hub.disconnect(id).await;

    tracing::info!(
        peer = %addr,
        connection = %id.short(),
        participant = participant.as_ref().map(|p| p.participant_id.as_str()).unwrap_or("-"),
        reason,
        "Client disconnected"
    );

    if shutdown.is_cancelled() {
        // Flush what was already queued, then close politely.
        rx.close();
        while let Ok(frame) = rx.try_recv() {
            if sink.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }
        if let Err(e) = sink.send(Message::Close(None)).await {
            tracing::debug!(peer = %addr, error = %e, "Close frame not sent");
        }
    }
    if let Err(e) = sink.close().await {
        tracing::debug!(peer = %addr, error = %e, "WS close failed");
    }
}
