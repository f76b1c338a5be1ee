// GTM script registry: per-path tag snippets served to the public site.
use serde::Deserialize;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::GtmScript;

#[derive(Debug, Deserialize)]
pub struct CreateGtmParams {
    pub page_path: String,
    pub content: String,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGtmParams {
    pub page_path: Option<String>,
    pub content: Option<String>,
    pub active: Option<bool>,
}

pub struct GtmService {
    db: Database,
}

impl GtmService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, params: CreateGtmParams) -> Result<GtmScript> {
        if params.page_path.trim().is_empty() || params.content.trim().is_empty() {
            return Err(AppError::BadRequest(
                "page_path and content are required".to_string(),
            ));
        }

        let script: GtmScript = sqlx::query_as(
            r#"
            INSERT INTO gtm_scripts (page_path, content, active)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&params.page_path)
        .bind(&params.content)
        .bind(params.active.unwrap_or(true))
        .fetch_one(&self.db.pg)
        .await?;

        Ok(script)
    }

    pub async fn list(&self) -> Result<Vec<GtmScript>> {
        let scripts: Vec<GtmScript> =
            sqlx::query_as("SELECT * FROM gtm_scripts ORDER BY page_path")
                .fetch_all(&self.db.pg)
                .await?;

        Ok(scripts)
    }

    pub async fn update(&self, script_id: Uuid, params: UpdateGtmParams) -> Result<GtmScript> {
        let script: GtmScript = sqlx::query_as(
            r#"
            UPDATE gtm_scripts
            SET page_path = COALESCE($1, page_path),
                content = COALESCE($2, content),
                active = COALESCE($3, active),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(params.page_path)
        .bind(params.content)
        .bind(params.active)
        .bind(script_id)
        .fetch_optional(&self.db.pg)
        .await?
        .ok_or_else(|| AppError::NotFound("GTM script not found".to_string()))?;

        Ok(script)
    }

    pub async fn delete(&self, script_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM gtm_scripts WHERE id = $1")
            .bind(script_id)
            .execute(&self.db.pg)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("GTM script not found".to_string()));
        }
        Ok(())
    }

    /// Active scripts for a page: exact path match plus the `*` wildcard.
    pub async fn active_for_path(&self, path: &str) -> Result<Vec<GtmScript>> {
        let scripts: Vec<GtmScript> = sqlx::query_as(
            r#"
            SELECT * FROM gtm_scripts
            WHERE active AND (page_path = $1 OR page_path = '*')
            ORDER BY page_path
            "#,
        )
        .bind(path)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(scripts)
    }
}
