use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use validator::Validate;

use crate::api::{soft_fail, success};
use crate::error::{AppError, Result};
use crate::middleware::{Claims, CurrentAdmin, TokenType};
use crate::models::{AuditAction, CreateAuditLog, ResourceType};
use crate::services::{AuditService, AuthService};
use crate::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_admin))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub admin: AdminInfo,
}

#[derive(Debug, Serialize)]
pub struct AdminInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let auth_service = AuthService::new(state.db.clone(), state.config.clone());
    let (admin, access_token, refresh_token) = auth_service
        .authenticate(&payload.email, &payload.password)
        .await?;

    let audit_service = AuditService::new(state.db.clone());
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let _ = audit_service
        .log(CreateAuditLog {
            admin_id: admin.id,
            action: AuditAction::Login,
            resource_type: ResourceType::Session,
            resource_id: Some(admin.id.to_string()),
            details: Some(serde_json::json!({
                "email": admin.email,
                "login_time": chrono::Utc::now().to_rfc3339()
            })),
            ip_address: Some(addr.ip().to_string()),
            user_agent,
        })
        .await;

    Ok(success(LoginResponse {
        access_token,
        refresh_token,
        admin: AdminInfo {
            id: admin.id.to_string(),
            email: admin.email,
            name: admin.name,
            role: admin.role,
        },
    }))
}

async fn logout(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    // Blacklist failure downgrades to a soft failure: the client still
    // discards its token, and an unavailable Redis must not 500 a logout.
    let auth_service = AuthService::new(state.db.clone(), state.config.clone());
    if let Err(e) = auth_service.invalidate_token(token).await {
        tracing::warn!("Token blacklist unavailable during logout: {}", e);
        return Ok(soft_fail(
            "BLACKLIST_UNAVAILABLE",
            "Logged out, but the token could not be revoked server-side",
        ));
    }

    let audit_service = AuditService::new(state.db.clone());
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let admin_id = current_admin.id.parse().unwrap_or_default();
    let _ = audit_service
        .log(CreateAuditLog {
            admin_id,
            action: AuditAction::Logout,
            resource_type: ResourceType::Session,
            resource_id: Some(current_admin.id.clone()),
            details: Some(serde_json::json!({
                "logout_time": chrono::Utc::now().to_rfc3339()
            })),
            ip_address: Some(addr.ip().to_string()),
            user_agent,
        })
        .await;

    Ok(success(serde_json::json!({ "message": "Logged out successfully" })))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>> {
    let claims = decode::<Claims>(
        &payload.refresh_token,
        &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?
    .claims;

    // Access tokens cannot be exchanged for fresh ones.
    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized);
    }

    // The admin must still exist and be active.
    let admin: crate::models::AdminUser = sqlx::query_as(
        "SELECT * FROM admin_users WHERE id = $1 AND status = 'active'",
    )
    .bind(uuid::Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?)
    .fetch_optional(&state.db.pg)
    .await?
    .ok_or(AppError::Unauthorized)?;

    let auth_service = AuthService::new(state.db.clone(), state.config.clone());
    let access_token = auth_service.generate_access_token(&admin)?;

    Ok(success(serde_json::json!({ "access_token": access_token })))
}

async fn get_current_admin(
    State(state): State<AppState>,
    Extension(current_admin): Extension<CurrentAdmin>,
) -> Result<Json<serde_json::Value>> {
    let admin: crate::models::AdminUser =
        sqlx::query_as("SELECT * FROM admin_users WHERE id = $1")
            .bind(
                uuid::Uuid::parse_str(&current_admin.id)
                    .map_err(|_| AppError::Unauthorized)?,
            )
            .fetch_optional(&state.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;

    Ok(success(AdminInfo {
        id: admin.id.to_string(),
        email: admin.email,
        name: admin.name,
        role: admin.role,
    }))
}
