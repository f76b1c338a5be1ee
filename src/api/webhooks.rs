use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{soft_fail, success};
use crate::error::Result;
use crate::middleware::CurrentAdmin;
use crate::models::{AuditAction, CreateAuditLog, ResourceType};
use crate::services::{AuditService, CreateWebhookParams, UpdateWebhookParams, WebhookService};
use crate::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_webhooks))
        .route("/:id", get(get_webhook))
        .route("/:id/deliveries", get(list_deliveries))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_webhook))
        .route("/:id", put(update_webhook).delete(delete_webhook))
        .route("/:id/test", post(test_webhook))
}

fn service(state: &AppState) -> WebhookService {
    WebhookService::new(
        state.db.clone(),
        state.http.clone(),
        state.config.webhook.timeout_secs,
    )
}

async fn list_webhooks(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let webhooks = service(&state).list().await?;
    Ok(success(webhooks))
}

async fn get_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let webhook = service(&state).get(webhook_id).await?;
    Ok(success(webhook))
}

#[derive(Debug, Deserialize)]
pub struct DeliveriesQuery {
    pub limit: Option<i64>,
}

async fn list_deliveries(
    State(state): State<AppState>,
    Path(webhook_id): Path<Uuid>,
    Query(query): Query<DeliveriesQuery>,
) -> Result<Json<serde_json::Value>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let deliveries = service(&state).recent_deliveries(webhook_id, limit).await?;
    Ok(success(deliveries))
}

async fn create_webhook(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Json(params): Json<CreateWebhookParams>,
) -> Result<Json<serde_json::Value>> {
    let webhook = service(&state).create(params).await?;

    audit(&state, &current_admin, AuditAction::CreateWebhook, webhook.id).await;
    Ok(success(webhook))
}

async fn update_webhook(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(webhook_id): Path<Uuid>,
    Json(params): Json<UpdateWebhookParams>,
) -> Result<Json<serde_json::Value>> {
    let webhook = service(&state).update(webhook_id, params).await?;

    audit(&state, &current_admin, AuditAction::UpdateWebhook, webhook_id).await;
    Ok(success(webhook))
}

async fn delete_webhook(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(webhook_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    service(&state).delete(webhook_id).await?;

    audit(&state, &current_admin, AuditAction::DeleteWebhook, webhook_id).await;
    Ok(success(serde_json::json!({ "deleted": true })))
}

/// Fire a sample payload at the endpoint. An unreachable endpoint is an
/// expected outcome here, so it reports as a soft failure rather than a 500.
async fn test_webhook(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(webhook_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let outcome = service(&state).test_fire(webhook_id).await?;

    audit(&state, &current_admin, AuditAction::TestWebhook, webhook_id).await;

    if outcome.success {
        Ok(success(outcome))
    } else {
        let message = outcome
            .error
            .clone()
            .unwrap_or_else(|| "Delivery failed".to_string());
        Ok(soft_fail("DELIVERY_FAILED", &message))
    }
}

async fn audit(state: &AppState, admin: &CurrentAdmin, action: AuditAction, webhook_id: Uuid) {
    let audit_service = AuditService::new(state.db.clone());
    let _ = audit_service
        .log(CreateAuditLog {
            admin_id: admin.id.parse().unwrap_or_default(),
            action,
            resource_type: ResourceType::Webhook,
            resource_id: Some(webhook_id.to_string()),
            details: None,
            ip_address: None,
            user_agent: None,
        })
        .await;
}
