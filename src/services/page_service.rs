// Landing page management.
use serde::Deserialize;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{LandingPage, PageStatus};

#[derive(Debug, Deserialize)]
pub struct CreatePageParams {
    pub slug: String,
    pub title: String,
    pub content: Option<serde_json::Value>,
    pub meta_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePageParams {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub content: Option<serde_json::Value>,
    pub meta_description: Option<String>,
}

pub struct PageService {
    db: Database,
}

impl PageService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, params: CreatePageParams) -> Result<LandingPage> {
        if params.slug.trim().is_empty() || params.title.trim().is_empty() {
            return Err(AppError::BadRequest(
                "slug and title are required".to_string(),
            ));
        }

        let result = sqlx::query_as::<_, LandingPage>(
            r#"
            INSERT INTO landing_pages (slug, title, content, meta_description, status)
            VALUES ($1, $2, $3, $4, 'draft')
            RETURNING *
            "#,
        )
        .bind(&params.slug)
        .bind(&params.title)
        .bind(params.content.unwrap_or_else(|| serde_json::json!({})))
        .bind(&params.meta_description)
        .fetch_one(&self.db.pg)
        .await;

        match result {
            Ok(page) => Ok(page),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                format!("A page with slug '{}' already exists", params.slug),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list(&self, page: u32, limit: u32, status: Option<String>) -> Result<(Vec<LandingPage>, i64)> {
        let offset = super::page_offset(page, limit);

        let pages: Vec<LandingPage> = sqlx::query_as(
            r#"
            SELECT * FROM landing_pages
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY updated_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&status)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.db.pg)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM landing_pages WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(&status)
        .fetch_one(&self.db.pg)
        .await?;

        Ok((pages, total))
    }

    pub async fn get(&self, page_id: Uuid) -> Result<LandingPage> {
        sqlx::query_as("SELECT * FROM landing_pages WHERE id = $1")
            .bind(page_id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound("Page not found".to_string()))
    }

    /// Public path: only published pages are served by slug.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<LandingPage> {
        sqlx::query_as(
            "SELECT * FROM landing_pages WHERE slug = $1 AND status = 'published'",
        )
        .bind(slug)
        .fetch_optional(&self.db.pg)
        .await?
        .ok_or_else(|| AppError::NotFound("Page not found".to_string()))
    }

    pub async fn update(&self, page_id: Uuid, params: UpdatePageParams) -> Result<LandingPage> {
        let result = sqlx::query_as::<_, LandingPage>(
            r#"
            UPDATE landing_pages
            SET slug = COALESCE($1, slug),
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                meta_description = COALESCE($4, meta_description),
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(params.slug.clone())
        .bind(params.title)
        .bind(params.content)
        .bind(params.meta_description)
        .bind(page_id)
        .fetch_optional(&self.db.pg)
        .await;

        match result {
            Ok(Some(page)) => Ok(page),
            Ok(None) => Err(AppError::NotFound("Page not found".to_string())),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                "A page with that slug already exists".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set_status(&self, page_id: Uuid, status: PageStatus) -> Result<LandingPage> {
        let page: LandingPage = sqlx::query_as(
            "UPDATE landing_pages SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status.as_str())
        .bind(page_id)
        .fetch_optional(&self.db.pg)
        .await?
        .ok_or_else(|| AppError::NotFound("Page not found".to_string()))?;

        Ok(page)
    }

    pub async fn delete(&self, page_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM landing_pages WHERE id = $1")
            .bind(page_id)
            .execute(&self.db.pg)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Page not found".to_string()));
        }
        Ok(())
    }
}
