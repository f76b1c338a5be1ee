use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::success;
use crate::error::{AppError, Result};
use crate::models::EventType;
use crate::services::TrackingService;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(track_event))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/:visitor_id", get(get_visitor))
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub visitor_id: String,
    pub session_id: String,
    pub event_type: String,
    pub page_path: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

async fn track_event(
    State(state): State<AppState>,
    Json(payload): Json<TrackRequest>,
) -> Result<Json<serde_json::Value>> {
    let event_type = EventType::parse(&payload.event_type).ok_or_else(|| {
        AppError::BadRequest(format!("Unknown event type: {}", payload.event_type))
    })?;

    let service = TrackingService::new(state.db.clone());
    let outcome = service
        .track(
            &payload.visitor_id,
            &payload.session_id,
            event_type,
            payload.page_path.as_deref(),
            payload.metadata,
        )
        .await?;

    Ok(success(outcome))
}

async fn get_visitor(
    State(state): State<AppState>,
    Path(visitor_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let service = TrackingService::new(state.db.clone());
    let profile = service
        .get_profile(&visitor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Visitor not found".to_string()))?;
    let events = service.recent_events(&visitor_id, 50).await?;

    Ok(success(serde_json::json!({
        "profile": profile,
        "events": events,
    })))
}
