//! signalhub-relay: WebSocket signaling relay for WebRTC meetings.
//!
//! Peers join a meeting, learn who else is there, and exchange SDP offers,
//! answers and ICE candidates through the relay. The relay never touches
//! media; it only forwards signaling frames between connections in the same
//! meeting.

pub mod connection;
pub mod handle;
pub mod hub;
pub mod protocol;
pub mod registry;
pub mod rooms;
pub mod server;
pub mod status;

pub use connection::RelayState;
pub use handle::{ConnectionHandle, DeliveryError};
pub use hub::{DropReason, HubSnapshot, JoinOutcome, RouteOutcome, SignalHub};
pub use registry::{ConnectionRegistry, Participant};
pub use rooms::{ParticipantSummary, RoomTable};
pub use server::{relay_router, run, serve, shutdown_signal, RelaySettings};
