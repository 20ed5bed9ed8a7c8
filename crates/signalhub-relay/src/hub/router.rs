//! Message routing: classify an inbound frame, then unicast, broadcast,
//! hand it to the lifecycle, or drop it.

use signalhub_common::ProtocolError;

use super::{deliver_logged, JoinOutcome, SignalHub};
use crate::handle::ConnectionHandle;
use crate::protocol::{Envelope, JoinRequest, MessageKind, ServerMessage};

/// Why a frame went nowhere. None of these are reported to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    UnknownType(String),
    NotJoined,
    /// `meetingId` names a meeting other than the sender's own.
    MeetingMismatch(String),
    MissingTarget,
    TargetNotFound(String),
    /// Target resolved but its queue is full or closed.
    TargetUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Joined(JoinOutcome),
    Delivered { to: String },
    Broadcast { recipients: usize },
    Dropped(DropReason),
    /// Malformed input; an `error` reply was queued to the sender.
    Rejected(ProtocolError),
}

impl SignalHub {
    /// Route one inbound text frame from `connection`.
    ///
    /// Offer, answer and ICE frames are forwarded verbatim, so the peer sees
    /// exactly what the sender wrote.
    pub async fn route(&self, connection: &ConnectionHandle, frame: &str) -> RouteOutcome {
        if frame.len() > self.max_message_bytes {
            return self.reject(
                connection,
                ProtocolError::MessageTooLarge {
                    size: frame.len(),
                    limit: self.max_message_bytes,
                },
            );
        }

        let envelope = match Envelope::parse(frame) {
            Ok(envelope) => envelope,
            Err(e) => return self.reject(connection, e),
        };

        match envelope.kind() {
            MessageKind::JoinMeeting => match JoinRequest::from_envelope(&envelope) {
                Ok(request) => RouteOutcome::Joined(self.join(connection, request).await),
                Err(e) => self.reject(connection, e),
            },
            MessageKind::Offer | MessageKind::Answer | MessageKind::IceCandidate => {
                self.forward(connection, &envelope, frame).await
            }
            MessageKind::ParticipantJoined | MessageKind::ParticipantLeft => {
                self.relay_broadcast(connection, &envelope, frame).await
            }
            MessageKind::Unknown(message_type) => {
                tracing::debug!(
                    connection = %connection.id().short(),
                    kind = %message_type,
                    "Dropping unknown message type"
                );
                RouteOutcome::Dropped(DropReason::UnknownType(message_type))
            }
        }
    }

    /// Reply to the sender with a single `error` message. The connection
    /// stays open.
    pub fn reject(&self, connection: &ConnectionHandle, error: ProtocolError) -> RouteOutcome {
        tracing::warn!(
            connection = %connection.id().short(),
            error = %error,
            "Rejecting malformed message"
        );
        if let Err(e) = connection.deliver(ServerMessage::error(&error).to_frame()) {
            tracing::debug!(connection = %connection.id().short(), error = ?e, "Error reply not queued");
        }
        RouteOutcome::Rejected(error)
    }

    async fn forward(
        &self,
        connection: &ConnectionHandle,
        envelope: &Envelope,
        frame: &str,
    ) -> RouteOutcome {
        let state = self.state.read().await;
        let Some(sender) = state.registry.lookup(connection.id()) else {
            tracing::debug!(
                connection = %connection.id().short(),
                kind = %envelope.message_type,
                "Dropping handshake from connection that has not joined"
            );
            return RouteOutcome::Dropped(DropReason::NotJoined);
        };

        if let Some(reason) = meeting_mismatch(envelope, &sender.meeting_id) {
            tracing::debug!(
                participant = %sender.participant_id,
                meeting = %sender.meeting_id,
                kind = %envelope.message_type,
                "Dropping message addressed to another meeting"
            );
            return RouteOutcome::Dropped(reason);
        }

        let Some(to) = envelope.to_participant.as_deref() else {
            tracing::debug!(
                participant = %sender.participant_id,
                kind = %envelope.message_type,
                "Dropping handshake without toParticipant"
            );
            return RouteOutcome::Dropped(DropReason::MissingTarget);
        };

        let Some(target) = state.resolve_target(&sender.meeting_id, to) else {
            tracing::debug!(
                meeting = %sender.meeting_id,
                from = %sender.participant_id,
                to = %to,
                kind = %envelope.message_type,
                "Target participant not found"
            );
            return RouteOutcome::Dropped(DropReason::TargetNotFound(to.to_string()));
        };

        if deliver_logged(target, frame) {
            tracing::debug!(
                meeting = %sender.meeting_id,
                from = %sender.participant_id,
                to = %to,
                kind = %envelope.message_type,
                "Forwarded"
            );
            RouteOutcome::Delivered { to: to.to_string() }
        } else {
            RouteOutcome::Dropped(DropReason::TargetUnavailable(to.to_string()))
        }
    }

    async fn relay_broadcast(
        &self,
        connection: &ConnectionHandle,
        envelope: &Envelope,
        frame: &str,
    ) -> RouteOutcome {
        let state = self.state.read().await;
        let Some(sender) = state.registry.lookup(connection.id()) else {
            tracing::debug!(
                connection = %connection.id().short(),
                kind = %envelope.message_type,
                "Dropping broadcast from connection that has not joined"
            );
            return RouteOutcome::Dropped(DropReason::NotJoined);
        };

        if let Some(reason) = meeting_mismatch(envelope, &sender.meeting_id) {
            return RouteOutcome::Dropped(reason);
        }

        let recipients = state.broadcast(&sender.meeting_id, frame, Some(connection.id()));
        tracing::debug!(
            meeting = %sender.meeting_id,
            kind = %envelope.message_type,
            recipients,
            "Broadcast"
        );
        RouteOutcome::Broadcast { recipients }
    }
}

/// A missing `meetingId` means "my meeting"; any other value must match.
fn meeting_mismatch(envelope: &Envelope, own_meeting: &str) -> Option<DropReason> {
    match envelope.meeting_id.as_deref() {
        Some(meeting_id) if meeting_id != own_meeting => {
            Some(DropReason::MeetingMismatch(meeting_id.to_string()))
        }
        _ => None,
    }
}
