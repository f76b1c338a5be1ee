// Admin-user management, super_admin only.
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::success;
use crate::error::{AppError, Result};
use crate::middleware::CurrentAdmin;
use crate::models::{
    AdminUser, AuditAction, CreateAuditLog, ResourceType, UpdateAdminUser,
};
use crate::services::{AuditService, AuthService};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_admins).post(create_admin))
        .route("/:id", put(update_admin))
}

#[derive(Debug, Serialize)]
pub struct AdminSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub status: String,
    pub last_login_at: Option<String>,
}

impl From<AdminUser> for AdminSummary {
    fn from(admin: AdminUser) -> Self {
        Self {
            id: admin.id.to_string(),
            email: admin.email,
            name: admin.name,
            role: admin.role,
            status: admin.status,
            last_login_at: admin.last_login_at.map(|t| t.to_rfc3339()),
        }
    }
}

async fn list_admins(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let admins: Vec<AdminUser> =
        sqlx::query_as("SELECT * FROM admin_users ORDER BY created_at")
            .fetch_all(&state.db.pg)
            .await?;

    let summaries: Vec<AdminSummary> = admins.into_iter().map(Into::into).collect();
    Ok(success(summaries))
}

#[derive(Debug, serde::Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub role: String,
}

async fn create_admin(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Json(payload): Json<CreateAdminRequest>,
) -> Result<Json<serde_json::Value>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if !matches!(payload.role.as_str(), "super_admin" | "admin" | "viewer") {
        return Err(AppError::BadRequest(format!(
            "Unknown role: {}",
            payload.role
        )));
    }

    let auth_service = AuthService::new(state.db.clone(), state.config.clone());
    let password_hash = auth_service.hash_password(&payload.password)?;

    let result = sqlx::query_as::<_, AdminUser>(
        r#"
        INSERT INTO admin_users (email, password_hash, name, role)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(&payload.name)
    .bind(&payload.role)
    .fetch_one(&state.db.pg)
    .await;

    let admin = match result {
        Ok(admin) => admin,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict(format!(
                "An admin with email '{}' already exists",
                payload.email
            )))
        }
        Err(e) => return Err(e.into()),
    };

    audit(&state, &current_admin, AuditAction::CreateAdmin, admin.id).await;
    Ok(success(AdminSummary::from(admin)))
}

async fn update_admin(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    Path(admin_id): Path<Uuid>,
    Json(params): Json<UpdateAdminUser>,
) -> Result<Json<serde_json::Value>> {
    if let Some(role) = &params.role {
        if !matches!(role.as_str(), "super_admin" | "admin" | "viewer") {
            return Err(AppError::BadRequest(format!("Unknown role: {}", role)));
        }
    }
    if let Some(status) = &params.status {
        if !matches!(status.as_str(), "active" | "disabled") {
            return Err(AppError::BadRequest(format!("Unknown status: {}", status)));
        }
    }

    let admin: AdminUser = sqlx::query_as(
        r#"
        UPDATE admin_users
        SET name = COALESCE($1, name),
            role = COALESCE($2, role),
            status = COALESCE($3, status),
            updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(params.name)
    .bind(params.role)
    .bind(params.status)
    .bind(admin_id)
    .fetch_optional(&state.db.pg)
    .await?
    .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;

    audit(&state, &current_admin, AuditAction::UpdateAdmin, admin_id).await;
    Ok(success(AdminSummary::from(admin)))
}

async fn audit(state: &AppState, admin: &CurrentAdmin, action: AuditAction, target: Uuid) {
    let audit_service = AuditService::new(state.db.clone());
    let _ = audit_service
        .log(CreateAuditLog {
            admin_id: admin.id.parse().unwrap_or_default(),
            action,
            resource_type: ResourceType::Admin,
            resource_id: Some(target.to_string()),
            details: None,
            ip_address: None,
            user_agent: None,
        })
        .await;
}
