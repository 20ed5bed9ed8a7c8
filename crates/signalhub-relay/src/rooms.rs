//! Meeting room table: meeting id -> set of joined connections.
//!
//! A room exists only while it has members; removing the last member
//! deletes it.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use signalhub_common::ConnectionId;

use crate::registry::ConnectionRegistry;

#[derive(Debug, Default)]
pub struct Room {
    members: HashSet<ConnectionId>,
}

impl Room {
    pub fn members(&self) -> &HashSet<ConnectionId> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// `{participantId, displayName}` as reported by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub participant_id: String,
    pub display_name: String,
}

#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<String, Room>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Room for `meeting_id`, created empty if absent. Callers must add a
    /// member before releasing the table.
    pub fn ensure_room(&mut self, meeting_id: &str) -> &mut Room {
        self.rooms.entry(meeting_id.to_string()).or_default()
    }

    /// Returns `true` if the connection was not already a member.
    pub fn add_member(&mut self, meeting_id: &str, id: ConnectionId) -> bool {
        self.ensure_room(meeting_id).members.insert(id)
    }

    /// Returns `true` if the connection was a member. Deletes the room when
    /// it becomes empty.
    pub fn remove_member(&mut self, meeting_id: &str, id: ConnectionId) -> bool {
        let Some(room) = self.rooms.get_mut(meeting_id) else {
            return false;
        };
        let removed = room.members.remove(&id);
        if room.is_empty() {
            self.rooms.remove(meeting_id);
            tracing::debug!(meeting = %meeting_id, "Removed empty meeting");
        }
        removed
    }

    /// Members of a meeting; empty for an unknown meeting.
    pub fn members(&self, meeting_id: &str) -> impl Iterator<Item = ConnectionId> + '_ {
        self.rooms
            .get(meeting_id)
            .into_iter()
            .flat_map(|room| room.members.iter().copied())
    }

    pub fn get(&self, meeting_id: &str) -> Option<&Room> {
        self.rooms.get(meeting_id)
    }

    pub fn contains(&self, meeting_id: &str) -> bool {
        self.rooms.contains_key(meeting_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Participants of one meeting in join order.
    pub fn participants(
        &self,
        meeting_id: &str,
        registry: &ConnectionRegistry,
    ) -> Option<Vec<ParticipantSummary>> {
        let room = self.rooms.get(meeting_id)?;
        let mut joined: Vec<_> = room
            .members
            .iter()
            .filter_map(|id| registry.get(*id))
            .collect();
        joined.sort_by_key(|r| r.join_seq);
        Some(
            joined
                .into_iter()
                .map(|r| ParticipantSummary {
                    participant_id: r.participant.participant_id.clone(),
                    display_name: r.participant.display_name.clone(),
                })
                .collect(),
        )
    }

    /// Every meeting with its participants in join order.
    pub fn snapshot(&self, registry: &ConnectionRegistry) -> BTreeMap<String, Vec<ParticipantSummary>> {
        self.rooms
            .keys()
            .filter_map(|meeting_id| {
                self.participants(meeting_id, registry)
                    .map(|list| (meeting_id.clone(), list))
            })
            .collect()
    }
}
