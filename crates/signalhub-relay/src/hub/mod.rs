//! The signaling hub: one ownership boundary over the connection registry
//! and the meeting room table.
//!
//! Every operation takes the single `RwLock` once, so registry and rooms are
//! never observed out of step. Join and disconnect take the write lock;
//! routing and snapshots take the read lock. Sends inside the lock are
//! `try_send` only and never wait on a peer.

mod lifecycle;
mod router;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use signalhub_common::ConnectionId;
use tokio::sync::RwLock;

use crate::handle::DeliveryError;
use crate::protocol::RosterEntry;
use crate::registry::{ConnectionRegistry, Participant, Registration};
use crate::rooms::{ParticipantSummary, RoomTable};

pub use lifecycle::JoinOutcome;
pub use router::{DropReason, RouteOutcome};

/// Default cap on inbound text frames.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

#[derive(Debug, Default)]
struct HubState {
    registry: ConnectionRegistry,
    rooms: RoomTable,
    next_join_seq: u64,
}

impl HubState {
    /// Queue `frame` for every member of `meeting_id` except `exclude`.
    /// Returns how many members accepted it.
    fn broadcast(&self, meeting_id: &str, frame: &str, exclude: Option<ConnectionId>) -> usize {
        let mut sent = 0;
        for id in self.rooms.members(meeting_id) {
            if Some(id) == exclude {
                continue;
            }
            let Some(registration) = self.registry.get(id) else {
                continue;
            };
            if deliver_logged(registration, frame) {
                sent += 1;
            }
        }
        sent
    }

    /// Addressable registration for `participant_id` in a meeting. When two
    /// connections share the id, the most recent join wins.
    fn resolve_target(&self, meeting_id: &str, participant_id: &str) -> Option<&Registration> {
        self.rooms
            .members(meeting_id)
            .filter_map(|id| self.registry.get(id))
            .filter(|r| r.participant.participant_id == participant_id)
            .max_by_key(|r| r.join_seq)
    }

    /// Everyone in the meeting except `exclude`, in join order.
    fn roster(&self, meeting_id: &str, exclude: ConnectionId) -> Vec<RosterEntry> {
        let mut members: Vec<&Registration> = self
            .rooms
            .members(meeting_id)
            .filter(|id| *id != exclude)
            .filter_map(|id| self.registry.get(id))
            .collect();
        members.sort_by_key(|r| r.join_seq);
        members
            .into_iter()
            .map(|r| RosterEntry {
                participant_id: r.participant.participant_id.clone(),
                participant_name: r.participant.display_name.clone(),
                is_host: r.participant.is_host,
            })
            .collect()
    }
}

/// Best-effort send; failures are logged and reported as `false`.
fn deliver_logged(registration: &Registration, frame: &str) -> bool {
    match registration.connection.deliver(frame.to_string()) {
        Ok(()) => true,
        Err(DeliveryError::QueueFull) => {
            tracing::warn!(
                connection = %registration.connection.id().short(),
                participant = %registration.participant.participant_id,
                "Outbound queue full, dropping message"
            );
            false
        }
        Err(DeliveryError::Closed) => {
            tracing::debug!(
                connection = %registration.connection.id().short(),
                participant = %registration.participant.participant_id,
                "Connection closed, dropping message"
            );
            false
        }
    }
}

/// Consistent view of every active meeting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubSnapshot {
    pub room_count: usize,
    pub participant_count: usize,
    pub meetings: BTreeMap<String, Vec<ParticipantSummary>>,
}

/// Thread-safe, clonable handle to the shared signaling state.
#[derive(Clone)]
pub struct SignalHub {
    state: Arc<RwLock<HubState>>,
    max_message_bytes: usize,
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHub {
    pub fn new() -> Self {
        Self::with_max_message_bytes(DEFAULT_MAX_MESSAGE_BYTES)
    }

    pub fn with_max_message_bytes(max_message_bytes: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(HubState::default())),
            max_message_bytes,
        }
    }

    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    /// Participant behind a connection, if it has joined.
    pub async fn lookup(&self, id: ConnectionId) -> Option<Participant> {
        self.state.read().await.registry.lookup(id).cloned()
    }

    /// `(active meetings, active participants)`.
    pub async fn counts(&self) -> (usize, usize) {
        let state = self.state.read().await;
        (state.rooms.len(), state.registry.len())
    }

    pub async fn snapshot(&self) -> HubSnapshot {
        let state = self.state.read().await;
        HubSnapshot {
            room_count: state.rooms.len(),
            participant_count: state.registry.len(),
            meetings: state.rooms.snapshot(&state.registry),
        }
    }

    /// Participants of one meeting in join order; `None` if it does not exist.
    pub async fn meeting(&self, meeting_id: &str) -> Option<Vec<ParticipantSummary>> {
        let state = self.state.read().await;
        state.rooms.participants(meeting_id, &state.registry)
    }
}
