//! Join and disconnect: the only transitions that mutate the hub.
//!
//! Per connection: CONNECTED -> JOINED -> CLOSED, or CONNECTED -> CLOSED
//! when the transport goes away before a join.

use signalhub_common::ConnectionId;

use super::SignalHub;
use crate::handle::ConnectionHandle;
use crate::protocol::{JoinRequest, JoinedData, RosterData, RosterEntry, ServerMessage};
use crate::registry::Participant;

/// What a join did, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Roster sent back to the joiner (never includes the joiner).
    pub roster: Vec<RosterEntry>,
    /// Members that were queued a `participant-joined`.
    pub notified: usize,
    /// Identity this connection held before, when the join was a re-join.
    pub replaced: Option<Participant>,
}

impl SignalHub {
    /// Register `connection` as `request`'s participant and announce it.
    ///
    /// A connection that already joined is re-registered in place. Moving to
    /// another meeting first announces `participant-left` in the old one;
    /// staying in the same meeting only re-announces the new identity.
    pub async fn join(&self, connection: &ConnectionHandle, request: JoinRequest) -> JoinOutcome {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let id = connection.id();

        let replaced = match state.registry.unregister(id) {
            Some(previous) => {
                let old_meeting = previous.participant.meeting_id.as_str();
                state.rooms.remove_member(old_meeting, id);
                if old_meeting != request.meeting_id {
                    let left = ServerMessage::participant_left(
                        old_meeting,
                        &previous.participant.participant_id,
                    )
                    .to_frame();
                    state.broadcast(old_meeting, &left, None);
                }
                Some(previous.participant)
            }
            None => None,
        };

        let join_seq = state.next_join_seq;
        state.next_join_seq += 1;

        let participant = Participant {
            participant_id: request.participant_id,
            display_name: request.display_name,
            meeting_id: request.meeting_id,
            is_host: request.is_host,
        };
        let meeting_id = participant.meeting_id.clone();

        state.rooms.add_member(&meeting_id, id);
        state
            .registry
            .register(connection.clone(), participant.clone(), join_seq);

        let joined = ServerMessage::ParticipantJoined {
            meeting_id: meeting_id.clone(),
            from_participant: participant.participant_id.clone(),
            data: JoinedData {
                participant_id: participant.participant_id.clone(),
                participant_name: participant.display_name.clone(),
                is_host: participant.is_host,
            },
        }
        .to_frame();
        let notified = state.broadcast(&meeting_id, &joined, Some(id));

        let roster = state.roster(&meeting_id, id);
        let reply = ServerMessage::MeetingParticipants {
            meeting_id: meeting_id.clone(),
            data: RosterData {
                participants: roster.clone(),
            },
        }
        .to_frame();
        if let Err(e) = connection.deliver(reply) {
            tracing::warn!(
                connection = %id.short(),
                error = ?e,
                "Failed to queue roster for joiner"
            );
        }

        tracing::info!(
            connection = %id.short(),
            meeting = %meeting_id,
            participant = %participant.participant_id,
            name = %participant.display_name,
            rejoin = replaced.is_some(),
            notified,
            "Participant joined"
        );

        JoinOutcome {
            roster,
            notified,
            replaced,
        }
    }

    /// Tear down a closed connection. Idempotent: a connection that never
    /// joined, or was already removed, returns `None` and broadcasts nothing.
    pub async fn disconnect(&self, id: ConnectionId) -> Option<Participant> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let registration = state.registry.unregister(id)?;
        let participant = registration.participant;
        state.rooms.remove_member(&participant.meeting_id, id);

        let left =
            ServerMessage::participant_left(&participant.meeting_id, &participant.participant_id)
                .to_frame();
        let notified = state.broadcast(&participant.meeting_id, &left, None);

        tracing::info!(
            connection = %id.short(),
            meeting = %participant.meeting_id,
            participant = %participant.participant_id,
            notified,
            meeting_closed = !state.rooms.contains(&participant.meeting_id),
            "Participant left"
        );

        Some(participant)
    }
}
