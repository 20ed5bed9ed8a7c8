//! Signaling wire protocol. Only the envelope is parsed; offer, answer and
//! ICE payloads are forwarded as the original text frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use signalhub_common::ProtocolError;

/// Participant name used when a join carries none.
pub const DEFAULT_PARTICIPANT_NAME: &str = "Unknown";

/// Envelope fields common to every client message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub meeting_id: Option<String>,
    #[serde(default)]
    pub from_participant: Option<String>,
    #[serde(default)]
    pub to_participant: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Parse a text frame. Anything that is not a JSON object with a string
    /// `type` is malformed.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidFormat(e.to_string()))
    }

    pub fn kind(&self) -> MessageKind {
        MessageKind::classify(&self.message_type)
    }
}

/// Routing class of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    JoinMeeting,
    Offer,
    Answer,
    IceCandidate,
    ParticipantJoined,
    ParticipantLeft,
    Unknown(String),
}

impl MessageKind {
    pub fn classify(message_type: &str) -> Self {
        match message_type {
            "join-meeting" => Self::JoinMeeting,
            "offer" => Self::Offer,
            "answer" => Self::Answer,
            "ice-candidate" => Self::IceCandidate,
            "participant-joined" => Self::ParticipantJoined,
            "participant-left" => Self::ParticipantLeft,
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinData {
    #[serde(default)]
    participant_name: Option<String>,
    #[serde(default)]
    is_host: Option<bool>,
}

/// A validated `join-meeting` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub meeting_id: String,
    pub participant_id: String,
    pub display_name: String,
    pub is_host: bool,
}

impl JoinRequest {
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        let meeting_id = non_empty(envelope.meeting_id.as_deref())
            .ok_or_else(|| ProtocolError::InvalidJoin("missing meetingId".into()))?;
        let participant_id = non_empty(envelope.from_participant.as_deref())
            .ok_or_else(|| ProtocolError::InvalidJoin("missing fromParticipant".into()))?;

        let data: JoinData = if envelope.data.is_null() {
            JoinData::default()
        } else {
            serde_json::from_value(envelope.data.clone())
                .map_err(|e| ProtocolError::InvalidJoin(format!("bad data: {e}")))?
        };

        Ok(Self {
            meeting_id: meeting_id.to_string(),
            participant_id: participant_id.to_string(),
            display_name: non_empty(data.participant_name.as_deref())
                .unwrap_or(DEFAULT_PARTICIPANT_NAME)
                .to_string(),
            is_host: data.is_host.unwrap_or(false),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// One line of the roster sent to a joiner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub participant_id: String,
    pub participant_name: String,
    pub is_host: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedData {
    pub participant_id: String,
    pub participant_name: String,
    pub is_host: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeftData {
    pub participant_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterData {
    pub participants: Vec<RosterEntry>,
}

/// Messages the relay itself originates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    ParticipantJoined {
        meeting_id: String,
        from_participant: String,
        data: JoinedData,
    },

    #[serde(rename_all = "camelCase")]
    ParticipantLeft {
        meeting_id: String,
        from_participant: String,
        data: LeftData,
    },

    #[serde(rename_all = "camelCase")]
    MeetingParticipants { meeting_id: String, data: RosterData },

    Error { message: String },
}

impl ServerMessage {
    pub fn participant_left(meeting_id: &str, participant_id: &str) -> Self {
        Self::ParticipantLeft {
            meeting_id: meeting_id.to_string(),
            from_participant: participant_id.to_string(),
            data: LeftData {
                participant_id: participant_id.to_string(),
            },
        }
    }

    pub fn error(err: &ProtocolError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    /// Serialize as a JSON text frame.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!("{{\"type\":\"error\",\"message\":\"failed to serialize message: {e}\"}}")
        })
    }
}
