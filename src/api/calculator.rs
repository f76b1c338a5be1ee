use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::api::success;
use crate::error::Result;
use crate::models::EventType;
use crate::services::{calculator_service, TrackingService};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/estimate", post(estimate))
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    #[serde(flatten)]
    pub input: calculator_service::EstimateInput,
    pub visitor_id: Option<String>,
    pub session_id: Option<String>,
}

async fn estimate(
    State(state): State<AppState>,
    Json(payload): Json<EstimateRequest>,
) -> Result<Json<serde_json::Value>> {
    let result = calculator_service::estimate(&payload.input)?;

    // Calculator use is a strong intent signal; track it when the caller
    // identifies itself. Tracking failure never fails the estimate.
    if let (Some(visitor_id), Some(session_id)) = (&payload.visitor_id, &payload.session_id) {
        let tracking = TrackingService::new(state.db.clone());
        if let Err(e) = tracking
            .track(
                visitor_id,
                session_id,
                EventType::CalculatorUsed,
                None,
                Some(serde_json::json!({ "monthly_bill": payload.input.monthly_bill })),
            )
            .await
        {
            tracing::warn!("Failed to track calculator use: {}", e);
        }
    }

    Ok(success(result))
}
