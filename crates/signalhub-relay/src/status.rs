//! Read-only HTTP status surface.
//!
//! - `GET /health` - liveness plus active meeting/participant counts
//! - `GET /meeting/{meetingId}` - one meeting's participants, 404 if absent
//! - `GET /meetings` - every meeting with its participants
//!
//! Each response is built from a single hub snapshot.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::hub::{HubSnapshot, SignalHub};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_meetings: usize,
    pub active_participants: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct MeetingParticipant {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingResponse {
    pub meeting_id: String,
    pub participant_count: usize,
    pub participants: Vec<MeetingParticipant>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

pub fn status_router(hub: SignalHub) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/meetings", get(meetings_handler))
        .route("/meeting/:meeting_id", get(meeting_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

async fn health_handler(State(hub): State<SignalHub>) -> Json<HealthResponse> {
    let (active_meetings, active_participants) = hub.counts().await;
    Json(HealthResponse {
        status: "healthy",
        active_meetings,
        active_participants,
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

async fn meetings_handler(State(hub): State<SignalHub>) -> Json<HubSnapshot> {
    Json(hub.snapshot().await)
}

async fn meeting_handler(
    State(hub): State<SignalHub>,
    Path(meeting_id): Path<String>,
) -> Response {
    match hub.meeting(&meeting_id).await {
        Some(participants) => Json(MeetingResponse {
            meeting_id,
            participant_count: participants.len(),
            participants: participants
                .into_iter()
                .map(|p| MeetingParticipant {
                    id: p.participant_id,
                    name: p.display_name,
                })
                .collect(),
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Meeting not found",
            }),
        )
            .into_response(),
    }
}
