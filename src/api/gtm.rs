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
use crate::models::{AuditAction, CreateAuditLog, ResourceType};
use crate::services::{AuditService, CreateGtmParams, GtmService, UpdateGtmParams};
use crate::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/", get(scripts_for_path))
}

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/", get(list_scripts))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_script))
        .route("/:id", put(update_script).delete(delete_script))
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

async fn scripts_for_path(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<serde_json::Value>> {
    let path = query
        .path
        .ok_or_else(|| AppError::BadRequest("path is required".to_string()))?;

    let service = GtmService::new(state.db.clone());
    let scripts = service.active_for_path(&path).await?;
    Ok(success(scripts))
}

async fn list_scripts(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let service = GtmService::new(state.db.clone());
    let scripts = service.list().await?;
    Ok(success(scripts))
}

async fn create_script(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Json(params): Json<CreateGtmParams>,
) -> Result<Json<serde_json::Value>> {
    let service = GtmService::new(state.db.clone());
    let script = service.create(params).await?;

    audit(&state, &current_admin, AuditAction::CreateGtmScript, script.id).await;
    Ok(success(script))
}

async fn update_script(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(script_id): Path<Uuid>,
    Json(params): Json<UpdateGtmParams>,
) -> Result<Json<serde_json::Value>> {
    let service = GtmService::new(state.db.clone());
    let script = service.update(script_id, params).await?;

    audit(&state, &current_admin, AuditAction::UpdateGtmScript, script_id).await;
    Ok(success(script))
}

async fn delete_script(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(script_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let service = GtmService::new(state.db.clone());
    service.delete(script_id).await?;

    audit(&state, &current_admin, AuditAction::DeleteGtmScript, script_id).await;
    Ok(success(serde_json::json!({ "deleted": true })))
}

async fn audit(state: &AppState, admin: &CurrentAdmin, action: AuditAction, script_id: Uuid) {
    let audit_service = AuditService::new(state.db.clone());
    let _ = audit_service
        .log(CreateAuditLog {
            admin_id: admin.id.parse().unwrap_or_default(),
            action,
            resource_type: ResourceType::GtmScript,
            resource_id: Some(script_id.to_string()),
            details: None,
            ip_address: None,
            user_agent: None,
        })
        .await;
}
