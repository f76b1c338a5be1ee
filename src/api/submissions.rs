// Public lead-capture endpoint: validate, persist, score, fan out webhooks.
use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};

use crate::api::success;
use crate::error::Result;
use crate::services::{
    initial_lead_score, validate_submission, LeadService, SubmissionPayload, TrackingService,
    WebhookService,
};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/:form_id", post(submit))
}

async fn submit(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    Json(payload): Json<SubmissionPayload>,
) -> Result<Json<serde_json::Value>> {
    validate_submission(&payload)?;

    // Prior on-site activity feeds the initial score.
    let visitor_score = match &payload.visitor_id {
        Some(visitor_id) => TrackingService::new(state.db.clone())
            .get_profile(visitor_id)
            .await?
            .map(|p| p.lead_score)
            .unwrap_or(0),
        None => 0,
    };

    let score = initial_lead_score(&payload, visitor_score);

    let lead_service = LeadService::new(state.db.clone());
    let lead = lead_service
        .create_from_submission(&form_id, &payload, score)
        .await?;

    tracing::info!(lead_id = %lead.id, form_id = %form_id, "Lead captured");

    // Webhook fan-out is best effort and never fails the submission.
    let webhook_service = WebhookService::new(
        state.db.clone(),
        state.http.clone(),
        state.config.webhook.timeout_secs,
    );
    let webhooks_fired = match webhook_service.dispatch_for_lead(&lead).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(lead_id = %lead.id, "Webhook dispatch failed: {}", e);
            0
        }
    };

    Ok(success(serde_json::json!({
        "lead_id": lead.id,
        "score": lead.score,
        "webhooks_fired": webhooks_fired,
    })))
}
