use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::success;
use crate::error::{AppError, Result};
use crate::middleware::CurrentAdmin;
use crate::models::{AuditAction, CreateAuditLog, ResourceType, TestStatus};
use crate::services::{
    AbTestingService, AuditService, CreateTestParams, UpdateTestParams,
};
use crate::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/assign", post(assign))
        .route("/convert", post(convert))
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/tests", get(list_tests))
        .route("/tests/:id", get(get_test))
        .route("/tests/:id/metrics", get(get_metrics))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/tests", post(create_test))
        .route("/tests/:id", put(update_test).delete(delete_test))
        .route("/tests/:id/status", put(set_status))
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub visitor_id: String,
    pub test_id: Option<Uuid>,
    pub url: Option<String>,
}

async fn assign(
    State(state): State<AppState>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<serde_json::Value>> {
    if payload.visitor_id.trim().is_empty() {
        return Err(AppError::BadRequest("visitor_id is required".to_string()));
    }

    let service = AbTestingService::new(state.db.clone());
    let test = service
        .resolve_running_test(payload.test_id, payload.url.as_deref())
        .await?;

    // No running test for the target is an expected state, not an error.
    let Some(test) = test else {
        return Ok(success(serde_json::json!({ "assigned": false })));
    };

    let outcome = service.assign(&test, &payload.visitor_id).await?;
    Ok(success(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub visitor_id: String,
    pub test_id: Uuid,
}

async fn convert(
    State(state): State<AppState>,
    Json(payload): Json<ConvertRequest>,
) -> Result<Json<serde_json::Value>> {
    if payload.visitor_id.trim().is_empty() {
        return Err(AppError::BadRequest("visitor_id is required".to_string()));
    }

    let service = AbTestingService::new(state.db.clone());
    let converted = service.convert(payload.test_id, &payload.visitor_id).await?;

    Ok(success(serde_json::json!({ "converted": converted })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

async fn list_tests(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);

    let service = AbTestingService::new(state.db.clone());
    let (tests, total) = service.list_tests(page, limit).await?;

    Ok(success(serde_json::json!({
        "tests": tests,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

async fn get_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let service = AbTestingService::new(state.db.clone());
    let test = service.get_test(test_id).await?;
    Ok(success(test))
}

async fn get_metrics(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let service = AbTestingService::new(state.db.clone());
    let metrics = service.metrics(test_id).await?;
    Ok(success(metrics))
}

async fn create_test(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Json(params): Json<CreateTestParams>,
) -> Result<Json<serde_json::Value>> {
    let service = AbTestingService::new(state.db.clone());
    let test = service.create_test(params).await?;

    audit(&state, &current_admin, AuditAction::CreateTest, test.id).await;
    Ok(success(test))
}

async fn update_test(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(test_id): Path<Uuid>,
    Json(params): Json<UpdateTestParams>,
) -> Result<Json<serde_json::Value>> {
    let service = AbTestingService::new(state.db.clone());
    let test = service.update_test(test_id, params).await?;

    audit(&state, &current_admin, AuditAction::UpdateTest, test.id).await;
    Ok(success(test))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

async fn set_status(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let status = TestStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown status: {}", payload.status)))?;

    let service = AbTestingService::new(state.db.clone());
    let test = service.set_status(test_id, status).await?;

    audit(&state, &current_admin, AuditAction::UpdateTest, test.id).await;
    Ok(success(test))
}

async fn delete_test(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(test_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let service = AbTestingService::new(state.db.clone());
    service.delete_test(test_id).await?;

    audit(&state, &current_admin, AuditAction::DeleteTest, test_id).await;
    Ok(success(serde_json::json!({ "deleted": true })))
}

async fn audit(state: &AppState, admin: &CurrentAdmin, action: AuditAction, test_id: Uuid) {
    let audit_service = AuditService::new(state.db.clone());
    let _ = audit_service
        .log(CreateAuditLog {
            admin_id: admin.id.parse().unwrap_or_default(),
            action,
            resource_type: ResourceType::AbTest,
            resource_id: Some(test_id.to_string()),
            details: None,
            ip_address: None,
            user_agent: None,
        })
        .await;
}
