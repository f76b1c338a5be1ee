use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::success;
use crate::error::Result;
use crate::services::DashboardService;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/leads-chart", get(get_leads_chart))
        .route("/conversions-chart", get(get_conversions_chart))
        .route("/activity", get(get_activity))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let service = DashboardService::new(state.db.clone());
    let stats = service.get_stats().await?;
    Ok(success(stats))
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub days: Option<i32>,
}

fn clamp_days(days: Option<i32>) -> i32 {
    days.unwrap_or(30).clamp(1, 90)
}

async fn get_leads_chart(
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<serde_json::Value>> {
    let service = DashboardService::new(state.db.clone());
    let data = service.get_leads_chart(clamp_days(query.days)).await?;
    Ok(success(data))
}

async fn get_conversions_chart(
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<serde_json::Value>> {
    let service = DashboardService::new(state.db.clone());
    let data = service
        .get_conversions_chart(clamp_days(query.days))
        .await?;
    Ok(success(data))
}

async fn get_activity(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let service = DashboardService::new(state.db.clone());
    let activity = service.get_recent_activity(20).await?;
    Ok(success(activity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_days() {
        assert_eq!(clamp_days(None), 30);
        assert_eq!(clamp_days(Some(7)), 7);
        assert_eq!(clamp_days(Some(0)), 1);
        assert_eq!(clamp_days(Some(365)), 90);
    }
}
