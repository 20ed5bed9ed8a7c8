//! Tests for join, leave and routing through the shared hub.

use super::*;
use crate::handle::ConnectionHandle;
use serde_json::{json, Value};
use signalhub_common::ProtocolError;
use tokio::sync::mpsc;

struct Client {
    conn: ConnectionHandle,
    rx: mpsc::Receiver<String>,
}

impl Client {
    fn new() -> Self {
        Self::with_capacity(64)
    }

    fn with_capacity(capacity: usize) -> Self {
        let (conn, rx) = ConnectionHandle::channel(capacity);
        Self { conn, rx }
    }

    /// Everything queued for this client so far.
    fn drain(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }
}

fn join_frame(meeting: &str, pid: &str, name: &str) -> String {
    json!({
        "type": "join-meeting",
        "meetingId": meeting,
        "fromParticipant": pid,
        "data": {"participantName": name}
    })
    .to_string()
}

fn signal_frame(kind: &str, meeting: &str, from: &str, to: &str) -> String {
    json!({
        "type": kind,
        "meetingId": meeting,
        "fromParticipant": from,
        "toParticipant": to,
        "data": {"sdp": format!("{kind} from {from}")}
    })
    .to_string()
}

async fn joined(hub: &SignalHub, meeting: &str, pid: &str, name: &str) -> Client {
    let mut client = Client::new();
    let outcome = hub.route(&client.conn, &join_frame(meeting, pid, name)).await;
    assert!(matches!(outcome, RouteOutcome::Joined(_)));
    client.drain();
    client
}

/// Registry and room table agree, and no room is empty.
async fn assert_consistent(hub: &SignalHub) {
    let state = hub.state.read().await;
    let mut members = 0;
    for (meeting_id, participants) in state.rooms.snapshot(&state.registry) {
        let room = state.rooms.get(&meeting_id).unwrap();
        assert!(!room.is_empty(), "empty room {meeting_id} is visible");
        assert_eq!(room.len(), participants.len());
        for id in room.members() {
            let registration = state.registry.get(*id).unwrap();
            assert_eq!(registration.participant.meeting_id, meeting_id);
        }
        members += room.len();
    }
    assert_eq!(members, state.registry.len());
    for (id, registration) in state.registry.iter() {
        let room = state.rooms.get(&registration.participant.meeting_id).unwrap();
        assert!(room.members().contains(id));
    }
}

#[tokio::test]
async fn first_joiner_gets_empty_roster() {
    let hub = SignalHub::new();
    let mut alice = Client::new();

    hub.route(&alice.conn, &join_frame("m", "a1", "Alice")).await;

    let msgs = alice.drain();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0]["type"], "meeting-participants");
    assert_eq!(msgs[0]["meetingId"], "m");
    assert_eq!(msgs[0]["data"]["participants"], json!([]));
    assert_consistent(&hub).await;
}

#[tokio::test]
async fn second_join_notifies_first_and_roster_excludes_self() {
    let hub = SignalHub::new();
    let mut p1 = joined(&hub, "m", "p1", "One").await;
    let mut p2 = Client::new();

    let outcome = hub.route(&p2.conn, &join_frame("m", "p2", "Two")).await;
    let RouteOutcome::Joined(outcome) = outcome else {
        panic!("expected join, got {outcome:?}");
    };
    assert_eq!(outcome.notified, 1);

    let to_p1 = p1.drain();
    assert_eq!(to_p1.len(), 1);
    assert_eq!(to_p1[0]["type"], "participant-joined");
    assert_eq!(to_p1[0]["fromParticipant"], "p2");
    assert_eq!(to_p1[0]["data"]["participantId"], "p2");
    assert_eq!(to_p1[0]["data"]["participantName"], "Two");

    let to_p2 = p2.drain();
    assert_eq!(to_p2.len(), 1);
    let roster = to_p2[0]["data"]["participants"].as_array().unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0]["participantId"], "p1");
    assert_eq!(roster[0]["participantName"], "One");
}

#[tokio::test]
async fn offer_reaches_only_its_target() {
    let hub = SignalHub::new();
    let mut a = joined(&hub, "m", "a", "A").await;
    let mut b = joined(&hub, "m", "b", "B").await;
    let mut c = joined(&hub, "m", "c", "C").await;
    let mut d = joined(&hub, "m", "d", "D").await;
    a.drain();
    b.drain();
    c.drain();

    let outcome = hub.route(&a.conn, &signal_frame("offer", "m", "a", "c")).await;
    assert_eq!(outcome, RouteOutcome::Delivered { to: "c".into() });

    assert!(a.drain().is_empty());
    assert!(b.drain().is_empty());
    assert!(d.drain().is_empty());
    let to_c = c.drain();
    assert_eq!(to_c.len(), 1);
    assert_eq!(to_c[0]["type"], "offer");
    assert_eq!(to_c[0]["fromParticipant"], "a");
}

#[tokio::test]
async fn room42_scenario() {
    let hub = SignalHub::new();
    let alice = joined(&hub, "room42", "a1", "Alice").await;
    let mut bob = joined(&hub, "room42", "b1", "Bob").await;

    let frame = signal_frame("offer", "room42", "a1", "b1");
    hub.route(&alice.conn, &frame).await;

    let to_bob = bob.drain();
    assert_eq!(to_bob.len(), 1);
    assert_eq!(to_bob[0]["type"], "offer");
    assert_eq!(to_bob[0]["fromParticipant"], "a1");
    assert_eq!(to_bob[0], serde_json::from_str::<Value>(&frame).unwrap());

    let participants = hub.meeting("room42").await.unwrap();
    assert_eq!(participants.len(), 2);
    assert_eq!(participants[0].display_name, "Alice");
    assert_eq!(participants[1].display_name, "Bob");
}

#[tokio::test]
async fn answer_and_ice_are_unicast_in_send_order() {
    let hub = SignalHub::new();
    let a = joined(&hub, "m", "a", "A").await;
    let mut b = joined(&hub, "m", "b", "B").await;

    hub.route(&a.conn, &signal_frame("answer", "m", "a", "b")).await;
    hub.route(&a.conn, &signal_frame("ice-candidate", "m", "a", "b")).await;
    hub.route(&a.conn, &signal_frame("ice-candidate", "m", "a", "b")).await;

    let kinds: Vec<_> = b.drain().into_iter().map(|m| m["type"].clone()).collect();
    assert_eq!(kinds, ["answer", "ice-candidate", "ice-candidate"]);
}

#[tokio::test]
async fn disconnect_announces_and_cleans_up() {
    let hub = SignalHub::new();
    let a = joined(&hub, "m", "a", "A").await;
    let mut b = joined(&hub, "m", "b", "B").await;

    let left = hub.disconnect(a.conn.id()).await.unwrap();
    assert_eq!(left.participant_id, "a");

    let to_b = b.drain();
    assert_eq!(to_b.len(), 1);
    assert_eq!(
        to_b[0],
        json!({"type": "participant-left", "meetingId": "m", "fromParticipant": "a", "data": {"participantId": "a"}})
    );
    assert_consistent(&hub).await;

    hub.disconnect(b.conn.id()).await;
    assert!(hub.meeting("m").await.is_none());
    assert_eq!(hub.counts().await, (0, 0));
    assert_consistent(&hub).await;
}

#[tokio::test]
async fn disconnect_twice_is_noop() {
    let hub = SignalHub::new();
    let a = joined(&hub, "m", "a", "A").await;
    let mut b = joined(&hub, "m", "b", "B").await;

    assert!(hub.disconnect(a.conn.id()).await.is_some());
    assert!(hub.disconnect(a.conn.id()).await.is_none());
    assert_eq!(b.drain().len(), 1);
}

#[tokio::test]
async fn disconnect_before_join_is_silent() {
    let hub = SignalHub::new();
    let mut a = joined(&hub, "m", "a", "A").await;
    let stranger = Client::new();

    assert!(hub.disconnect(stranger.conn.id()).await.is_none());
    assert!(a.drain().is_empty());
    assert_eq!(hub.counts().await, (1, 1));
}

#[tokio::test]
async fn malformed_frame_gets_error_and_connection_stays_usable() {
    let hub = SignalHub::new();
    let mut client = Client::new();

    let outcome = hub.route(&client.conn, "{not json").await;
    assert!(matches!(
        outcome,
        RouteOutcome::Rejected(ProtocolError::InvalidFormat(_))
    ));
    let msgs = client.drain();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0]["type"], "error");
    assert!(msgs[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid message format"));

    let outcome = hub.route(&client.conn, &join_frame("m", "a", "A")).await;
    assert!(matches!(outcome, RouteOutcome::Joined(_)));
}

#[tokio::test]
async fn join_without_meeting_is_rejected() {
    let hub = SignalHub::new();
    let mut client = Client::new();

    let frame = json!({"type": "join-meeting", "fromParticipant": "a"}).to_string();
    let outcome = hub.route(&client.conn, &frame).await;
    assert!(matches!(
        outcome,
        RouteOutcome::Rejected(ProtocolError::InvalidJoin(_))
    ));
    assert_eq!(client.drain()[0]["type"], "error");
    assert_eq!(hub.counts().await, (0, 0));
}

#[tokio::test]
async fn oversized_frame_is_rejected() {
    let hub = SignalHub::with_max_message_bytes(1024);
    let mut client = Client::new();

    let outcome = hub.route(&client.conn, &"x".repeat(2048)).await;
    assert_eq!(
        outcome,
        RouteOutcome::Rejected(ProtocolError::MessageTooLarge {
            size: 2048,
            limit: 1024
        })
    );
    assert_eq!(client.drain()[0]["type"], "error");
}

#[tokio::test]
async fn unknown_type_is_dropped_without_reply() {
    let hub = SignalHub::new();
    let mut a = joined(&hub, "m", "a", "A").await;
    let mut b = joined(&hub, "m", "b", "B").await;
    a.drain();

    let frame = json!({"type": "chat", "meetingId": "m", "fromParticipant": "a"}).to_string();
    let outcome = hub.route(&a.conn, &frame).await;
    assert_eq!(outcome, RouteOutcome::Dropped(DropReason::UnknownType("chat".into())));
    assert!(a.drain().is_empty());
    assert!(b.drain().is_empty());
}

#[tokio::test]
async fn handshake_before_join_is_dropped() {
    let hub = SignalHub::new();
    let mut b = joined(&hub, "m", "b", "B").await;
    let mut stranger = Client::new();

    let outcome = hub
        .route(&stranger.conn, &signal_frame("offer", "m", "x", "b"))
        .await;
    assert_eq!(outcome, RouteOutcome::Dropped(DropReason::NotJoined));
    assert!(b.drain().is_empty());
    assert!(stranger.drain().is_empty());
}

#[tokio::test]
async fn unknown_target_is_dropped_silently() {
    let hub = SignalHub::new();
    let mut a = joined(&hub, "m", "a", "A").await;

    let outcome = hub.route(&a.conn, &signal_frame("offer", "m", "a", "ghost")).await;
    assert_eq!(
        outcome,
        RouteOutcome::Dropped(DropReason::TargetNotFound("ghost".into()))
    );
    assert!(a.drain().is_empty());
}

#[tokio::test]
async fn missing_target_is_dropped() {
    let hub = SignalHub::new();
    let a = joined(&hub, "m", "a", "A").await;

    let frame = json!({"type": "ice-candidate", "meetingId": "m", "fromParticipant": "a"}).to_string();
    assert_eq!(
        hub.route(&a.conn, &frame).await,
        RouteOutcome::Dropped(DropReason::MissingTarget)
    );
}

#[tokio::test]
async fn target_in_other_meeting_is_not_reachable() {
    let hub = SignalHub::new();
    let a = joined(&hub, "m1", "a", "A").await;
    let mut b = joined(&hub, "m2", "b", "B").await;

    let outcome = hub.route(&a.conn, &signal_frame("offer", "m2", "a", "b")).await;
    assert_eq!(
        outcome,
        RouteOutcome::Dropped(DropReason::MeetingMismatch("m2".into()))
    );

    let outcome = hub.route(&a.conn, &signal_frame("offer", "m1", "a", "b")).await;
    assert_eq!(outcome, RouteOutcome::Dropped(DropReason::TargetNotFound("b".into())));
    assert!(b.drain().is_empty());
}

#[tokio::test]
async fn closed_target_is_dropped() {
    let hub = SignalHub::new();
    let a = joined(&hub, "m", "a", "A").await;
    let b = joined(&hub, "m", "b", "B").await;
    drop(b.rx);

    let outcome = hub.route(&a.conn, &signal_frame("offer", "m", "a", "b")).await;
    assert_eq!(
        outcome,
        RouteOutcome::Dropped(DropReason::TargetUnavailable("b".into()))
    );
}

#[tokio::test]
async fn full_target_queue_does_not_block_router() {
    let hub = SignalHub::new();
    let a = joined(&hub, "m", "a", "A").await;
    let mut slow = Client::with_capacity(1);
    hub.route(&slow.conn, &join_frame("m", "s", "Slow")).await;
    // Roster reply already fills the queue.

    let outcome = hub.route(&a.conn, &signal_frame("offer", "m", "a", "s")).await;
    assert_eq!(
        outcome,
        RouteOutcome::Dropped(DropReason::TargetUnavailable("s".into()))
    );
    assert_eq!(slow.drain().len(), 1);
}

#[tokio::test]
async fn client_broadcast_reaches_everyone_but_sender() {
    let hub = SignalHub::new();
    let mut a = joined(&hub, "m", "a", "A").await;
    let mut b = joined(&hub, "m", "b", "B").await;
    let mut c = joined(&hub, "m", "c", "C").await;
    a.drain();
    b.drain();

    let frame = json!({"type": "participant-left", "meetingId": "m", "fromParticipant": "c", "data": {}}).to_string();
    let outcome = hub.route(&c.conn, &frame).await;
    assert_eq!(outcome, RouteOutcome::Broadcast { recipients: 2 });
    assert_eq!(a.drain().len(), 1);
    assert_eq!(b.drain().len(), 1);
    assert!(c.drain().is_empty());
}

#[tokio::test]
async fn duplicate_participant_id_resolves_to_latest_join() {
    let hub = SignalHub::new();
    let a = joined(&hub, "m", "a", "A").await;
    let mut first = joined(&hub, "m", "dup", "First").await;
    let mut second = joined(&hub, "m", "dup", "Second").await;
    first.drain();

    hub.route(&a.conn, &signal_frame("offer", "m", "a", "dup")).await;
    assert!(first.drain().is_empty());
    assert_eq!(second.drain().len(), 1);

    // Once the latest leaves, the earlier one is addressable again.
    hub.disconnect(second.conn.id()).await;
    hub.route(&a.conn, &signal_frame("offer", "m", "a", "dup")).await;
    let to_first = first.drain();
    assert_eq!(to_first.last().unwrap()["type"], "offer");
    assert_consistent(&hub).await;
}

#[tokio::test]
async fn rejoin_same_meeting_updates_identity_once() {
    let hub = SignalHub::new();
    let mut a = joined(&hub, "m", "a", "A").await;
    let mut b = joined(&hub, "m", "b", "B").await;
    a.drain();

    let outcome = hub.route(&b.conn, &join_frame("m", "b2", "Bee")).await;
    let RouteOutcome::Joined(outcome) = outcome else {
        panic!("expected join");
    };
    assert_eq!(outcome.replaced.unwrap().participant_id, "b");
    assert_eq!(outcome.roster.len(), 1);

    let to_a = a.drain();
    assert_eq!(to_a.len(), 1);
    assert_eq!(to_a[0]["type"], "participant-joined");
    assert_eq!(to_a[0]["data"]["participantId"], "b2");

    assert_eq!(b.drain().len(), 1);
    assert_eq!(hub.counts().await, (1, 2));
    assert_eq!(hub.lookup(b.conn.id()).await.unwrap().participant_id, "b2");
    assert_consistent(&hub).await;
}

#[tokio::test]
async fn rejoin_other_meeting_leaves_the_old_one() {
    let hub = SignalHub::new();
    let mut a = joined(&hub, "m1", "a", "A").await;
    let b = joined(&hub, "m1", "b", "B").await;
    let mut c = joined(&hub, "m2", "c", "C").await;
    a.drain();

    hub.route(&b.conn, &join_frame("m2", "b", "B")).await;

    let to_a = a.drain();
    assert_eq!(to_a.len(), 1);
    assert_eq!(to_a[0]["type"], "participant-left");
    assert_eq!(c.drain()[0]["type"], "participant-joined");
    assert_eq!(hub.meeting("m1").await.unwrap().len(), 1);
    assert_eq!(hub.meeting("m2").await.unwrap().len(), 2);
    assert_consistent(&hub).await;

    hub.disconnect(a.conn.id()).await;
    assert!(hub.meeting("m1").await.is_none());
}

#[tokio::test]
async fn snapshot_reports_counts_and_names() {
    let hub = SignalHub::new();
    let _a = joined(&hub, "room42", "a1", "Alice").await;
    let _b = joined(&hub, "room42", "b1", "Bob").await;
    let _c = joined(&hub, "lobby", "c1", "Carol").await;

    let snapshot = hub.snapshot().await;
    assert_eq!(snapshot.room_count, 2);
    assert_eq!(snapshot.participant_count, 3);
    assert_eq!(snapshot.meetings["room42"].len(), 2);
    assert_eq!(snapshot.meetings["lobby"][0].participant_id, "c1");

    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["roomCount"], 2);
    assert_eq!(value["meetings"]["lobby"][0]["displayName"], "Carol");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_and_leaves_stay_consistent() {
    let hub = SignalHub::new();

    let mut tasks = Vec::new();
    for i in 0..40 {
        let hub = hub.clone();
        tasks.push(tokio::spawn(async move {
            let client = Client::new();
            let meeting = format!("m{}", i % 4);
            hub.route(&client.conn, &join_frame(&meeting, &format!("p{i}"), "P"))
                .await;
            client
        }));
    }
    let mut clients = Vec::new();
    for task in tasks {
        clients.push(task.await.unwrap());
    }
    assert_eq!(hub.counts().await, (4, 40));
    assert_consistent(&hub).await;

    let mut leaves = Vec::new();
    for client in clients.iter() {
        let hub = hub.clone();
        let id = client.conn.id();
        leaves.push(tokio::spawn(async move { hub.disconnect(id).await }));
    }
    for leave in leaves {
        assert!(leave.await.unwrap().is_some());
    }
    assert_eq!(hub.counts().await, (0, 0));
    assert_consistent(&hub).await;
}
