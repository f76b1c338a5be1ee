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
use crate::models::{AuditAction, CreateAuditLog, PageStatus, ResourceType};
use crate::services::{AuditService, CreatePageParams, PageService, UpdatePageParams};
use crate::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/:slug", get(get_public_page))
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pages))
        .route("/:id", get(get_page))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_page))
        .route("/:id", put(update_page).delete(delete_page))
        .route("/:id/status", put(set_status))
}

async fn get_public_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let service = PageService::new(state.db.clone());
    let page = service.get_published_by_slug(&slug).await?;
    Ok(success(page))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

async fn list_pages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).min(100);

    let service = PageService::new(state.db.clone());
    let (pages, total) = service.list(page, limit, query.status).await?;

    Ok(success(serde_json::json!({
        "pages": pages,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

async fn get_page(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let service = PageService::new(state.db.clone());
    let page = service.get(page_id).await?;
    Ok(success(page))
}

async fn create_page(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Json(params): Json<CreatePageParams>,
) -> Result<Json<serde_json::Value>> {
    let service = PageService::new(state.db.clone());
    let page = service.create(params).await?;

    audit(&state, &current_admin, AuditAction::CreatePage, page.id).await;
    Ok(success(page))
}

async fn update_page(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(page_id): Path<Uuid>,
    Json(params): Json<UpdatePageParams>,
) -> Result<Json<serde_json::Value>> {
    let service = PageService::new(state.db.clone());
    let page = service.update(page_id, params).await?;

    audit(&state, &current_admin, AuditAction::UpdatePage, page_id).await;
    Ok(success(page))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

async fn set_status(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(page_id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let status = PageStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown status: {}", payload.status)))?;

    let service = PageService::new(state.db.clone());
    let page = service.set_status(page_id, status).await?;

    audit(&state, &current_admin, AuditAction::UpdatePage, page_id).await;
    Ok(success(page))
}

async fn delete_page(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(page_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let service = PageService::new(state.db.clone());
    service.delete(page_id).await?;

    audit(&state, &current_admin, AuditAction::DeletePage, page_id).await;
    Ok(success(serde_json::json!({ "deleted": true })))
}

async fn audit(state: &AppState, admin: &CurrentAdmin, action: AuditAction, page_id: Uuid) {
    let audit_service = AuditService::new(state.db.clone());
    let _ = audit_service
        .log(CreateAuditLog {
            admin_id: admin.id.parse().unwrap_or_default(),
            action,
            resource_type: ResourceType::Page,
            resource_id: Some(page_id.to_string()),
            details: None,
            ip_address: None,
            user_agent: None,
        })
        .await;
}
