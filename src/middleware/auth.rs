use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,       // Admin ID
    pub email: String,
    pub role: AdminRole,
    pub token_type: TokenType,
    pub exp: usize,        // Expiration time
    pub iat: usize,        // Issued at
}

/// Discriminates access tokens from the long-lived refresh tokens so
/// neither can stand in for the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    SuperAdmin,
    Admin,
    Viewer,
}

impl AdminRole {
    pub fn can_manage_admins(&self) -> bool {
        matches!(self, AdminRole::SuperAdmin)
    }

    pub fn can_write(&self) -> bool {
        matches!(self, AdminRole::SuperAdmin | AdminRole::Admin)
    }
}

#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub id: String,
    pub email: String,
    pub role: AdminRole,
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?
    .claims;

    // Refresh tokens live for 30 days and only buy a new access token.
    if claims.token_type != TokenType::Access {
        return Err(AppError::Unauthorized);
    }

    // Reject tokens blacklisted at logout. A Redis outage fails open so that
    // the blacklist cannot take down the whole admin API.
    match state.db.get_redis_conn().await {
        Ok(mut conn) => {
            let key = format!("token_blacklist:{}", token);
            let blacklisted: Option<String> = conn.get(&key).await.unwrap_or(None);
            if blacklisted.is_some() {
                return Err(AppError::Unauthorized);
            }
        }
        Err(e) => {
            tracing::warn!("Token blacklist check skipped, Redis unavailable: {}", e);
        }
    }

    let current_admin = CurrentAdmin {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    };

    request.extensions_mut().insert(current_admin);

    Ok(next.run(request).await)
}

/// Viewers are read-only; mutating admin routes sit behind this gate.
pub async fn require_writer(
    State(_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current_admin = request
        .extensions()
        .get::<CurrentAdmin>()
        .ok_or(AppError::Unauthorized)?;

    if !current_admin.role.can_write() {
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

pub async fn require_super_admin(
    State(_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current_admin = request
        .extensions()
        .get::<CurrentAdmin>()
        .ok_or(AppError::Unauthorized)?;

    if !current_admin.role.can_manage_admins() {
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    #[test]
    fn test_role_gates() {
        assert!(AdminRole::SuperAdmin.can_manage_admins());
        assert!(AdminRole::SuperAdmin.can_write());
        assert!(!AdminRole::Admin.can_manage_admins());
        assert!(AdminRole::Admin.can_write());
        assert!(!AdminRole::Viewer.can_manage_admins());
        assert!(!AdminRole::Viewer.can_write());
    }

    #[test]
    fn test_claims_round_trip() {
        let secret = "test-secret";
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            email: "ops@helios.energy".to_string(),
            role: AdminRole::Admin,
            token_type: TokenType::Access,
            iat: now,
            exp: now + 3600,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap()
        .claims;

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.email, claims.email);
        assert_eq!(decoded.role, AdminRole::Admin);
        assert_eq!(decoded.token_type, TokenType::Access);
    }

    #[test]
    fn test_refresh_tokens_carry_their_type() {
        // A decoded refresh token must be distinguishable from an access
        // token, so the auth gate can turn it away.
        let secret = "test-secret";
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            email: "ops@helios.energy".to_string(),
            role: AdminRole::Admin,
            token_type: TokenType::Refresh,
            iat: now,
            exp: now + 3600,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap()
        .claims;

        assert_eq!(decoded.token_type, TokenType::Refresh);
        assert_ne!(decoded.token_type, TokenType::Access);
    }

    #[test]
    fn test_claims_rejects_wrong_secret() {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "x".to_string(),
            email: "ops@helios.energy".to_string(),
            role: AdminRole::Viewer,
            token_type: TokenType::Access,
            iat: now,
            exp: now + 3600,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret-a"),
        )
        .unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret-b"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
