//! Non-owning handle to a connection's outbound queue.
//!
//! The transport task owns the socket and the receiving end; everything
//! else holds a clone of this handle.

use signalhub_common::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Why a frame was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    QueueFull,
    Closed,
}

#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<String>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, tx: mpsc::Sender<String>) -> Self {
        Self { id, tx }
    }

    /// Fresh id plus a bounded outbound queue of `capacity` frames.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(ConnectionId::new(), tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a frame without waiting. A slow or gone peer never stalls the
    /// caller.
    pub fn deliver(&self, frame: String) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}
