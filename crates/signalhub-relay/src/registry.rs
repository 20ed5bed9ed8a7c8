//! Connection registry: which participant, in which meeting, sits behind
//! each joined connection.

use std::collections::HashMap;

use serde::Serialize;
use signalhub_common::ConnectionId;

use crate::handle::ConnectionHandle;

/// Logical identity of one peer within one meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub participant_id: String,
    pub display_name: String,
    pub meeting_id: String,
    pub is_host: bool,
}

/// A joined connection: its identity, its outbound handle, and the order in
/// which it joined (used to break `participant_id` ties).
#[derive(Debug, Clone)]
pub struct Registration {
    pub participant: Participant,
    pub connection: ConnectionHandle,
    pub join_seq: u64,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<ConnectionId, Registration>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a connection. Returns the registration it
    /// replaced, if any.
    pub fn register(
        &mut self,
        connection: ConnectionHandle,
        participant: Participant,
        join_seq: u64,
    ) -> Option<Registration> {
        self.entries.insert(
            connection.id(),
            Registration {
                participant,
                connection,
                join_seq,
            },
        )
    }

    /// Participant behind a connection; `None` means "not joined yet".
    pub fn lookup(&self, id: ConnectionId) -> Option<&Participant> {
        self.entries.get(&id).map(|r| &r.participant)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Registration> {
        self.entries.get(&id)
    }

    pub fn unregister(&mut self, id: ConnectionId) -> Option<Registration> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = (&ConnectionId, &Registration)> {
        self.entries.iter()
    }
}
