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
use crate::models::{AuditAction, CreateAuditLog, LeadStatus, ResourceType};
use crate::services::{AuditService, LeadService, ListLeadsParams, UpdateLeadParams};
use crate::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_leads))
        .route("/:id", get(get_lead))
        .route("/:id/notes", get(list_notes))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/:id", put(update_lead).delete(delete_lead))
        .route("/:id/status", put(update_status))
        .route("/:id/notes", post(add_note))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);

    if let Some(status) = &query.status {
        LeadStatus::parse(status)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown status: {}", status)))?;
    }

    let service = LeadService::new(state.db.clone());
    let (leads, total) = service
        .list(ListLeadsParams {
            page,
            limit,
            status: query.status,
            search: query.search,
        })
        .await?;

    Ok(success(serde_json::json!({
        "leads": leads,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

async fn get_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let service = LeadService::new(state.db.clone());
    let lead = service.get(lead_id).await?;
    Ok(success(lead))
}

async fn update_lead(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(lead_id): Path<Uuid>,
    Json(params): Json<UpdateLeadParams>,
) -> Result<Json<serde_json::Value>> {
    let service = LeadService::new(state.db.clone());
    let lead = service.update(lead_id, params).await?;

    audit(&state, &current_admin, AuditAction::UpdateLead, lead_id, None).await;
    Ok(success(lead))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

async fn update_status(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let status = LeadStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown status: {}", payload.status)))?;

    let service = LeadService::new(state.db.clone());
    let lead = service.update_status(lead_id, status).await?;

    audit(
        &state,
        &current_admin,
        AuditAction::UpdateLead,
        lead_id,
        Some(serde_json::json!({ "status": payload.status })),
    )
    .await;
    Ok(success(lead))
}

async fn delete_lead(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let service = LeadService::new(state.db.clone());
    service.delete(lead_id).await?;

    audit(&state, &current_admin, AuditAction::DeleteLead, lead_id, None).await;
    Ok(success(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub body: String,
}

async fn add_note(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<AddNoteRequest>,
) -> Result<Json<serde_json::Value>> {
    let admin_id: Uuid = current_admin
        .id
        .parse()
        .map_err(|_| AppError::Unauthorized)?;

    let service = LeadService::new(state.db.clone());
    let note = service.add_note(lead_id, admin_id, &payload.body).await?;

    audit(&state, &current_admin, AuditAction::AddLeadNote, lead_id, None).await;
    Ok(success(note))
}

async fn list_notes(
    State(state): State<AppState>,
    Path(lead_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let service = LeadService::new(state.db.clone());
    let notes = service.list_notes(lead_id).await?;
    Ok(success(notes))
}

async fn audit(
    state: &AppState,
    admin: &CurrentAdmin,
    action: AuditAction,
    lead_id: Uuid,
    details: Option<serde_json::Value>,
) {
    let audit_service = AuditService::new(state.db.clone());
    let _ = audit_service
        .log(CreateAuditLog {
            admin_id: admin.id.parse().unwrap_or_default(),
            action,
            resource_type: ResourceType::Lead,
            resource_id: Some(lead_id.to_string()),
            details,
            ip_address: None,
            user_agent: None,
        })
        .await;
}
