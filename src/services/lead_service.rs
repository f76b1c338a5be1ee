// Lead capture and back-office lead management.
use serde::Deserialize;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Lead, LeadNote, LeadStatus};

/// Incoming public form submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionPayload {
    pub name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub system_details: Option<serde_json::Value>,
    pub source: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_medium: Option<String>,
    pub visitor_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLeadsParams {
    pub page: u32,
    pub limit: u32,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeadParams {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub system_details: Option<serde_json::Value>,
}

/// Initial score for a freshly captured lead. Deterministic and additive:
/// completeness of the submission plus any prior on-site activity, with the
/// visitor contribution capped so browsing alone cannot dominate.
pub fn initial_lead_score(payload: &SubmissionPayload, visitor_score: i32) -> i32 {
    let mut score = 10;
    if payload.phone.as_deref().is_some_and(|p| !p.is_empty()) {
        score += 5;
    }
    if payload.address.as_deref().is_some_and(|a| !a.is_empty()) {
        score += 5;
    }
    if payload.system_details.is_some() {
        score += 5;
    }
    score + visitor_score.clamp(0, 50)
}

pub fn validate_submission(payload: &SubmissionPayload) -> Result<()> {
    if payload.email.trim().is_empty() {
        return Err(AppError::BadRequest("email is required".to_string()));
    }
    // Presence-level check only; full RFC validation is not worth the
    // false negatives on a capture form.
    if !payload.email.contains('@') || payload.email.trim().len() < 5 {
        return Err(AppError::BadRequest("email is not valid".to_string()));
    }
    let has_name = payload.name.as_deref().is_some_and(|n| !n.trim().is_empty());
    let has_phone = payload.phone.as_deref().is_some_and(|p| !p.trim().is_empty());
    if !has_name && !has_phone {
        return Err(AppError::BadRequest(
            "name or phone is required".to_string(),
        ));
    }
    Ok(())
}

pub struct LeadService {
    db: Database,
}

impl LeadService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a captured lead with status `new`. Duplicate emails are
    /// allowed; repeat submissions are a sales signal, not an error.
    pub async fn create_from_submission(
        &self,
        form_id: &str,
        payload: &SubmissionPayload,
        score: i32,
    ) -> Result<Lead> {
        let lead: Lead = sqlx::query_as(
            r#"
            INSERT INTO leads (form_id, name, email, phone, address, status, score,
                               system_details, source, utm_campaign, utm_medium, visitor_id)
            VALUES ($1, $2, $3, $4, $5, 'new', $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(form_id)
        .bind(&payload.name)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(&payload.address)
        .bind(score)
        .bind(&payload.system_details)
        .bind(&payload.source)
        .bind(&payload.utm_campaign)
        .bind(&payload.utm_medium)
        .bind(&payload.visitor_id)
        .fetch_one(&self.db.pg)
        .await?;

        Ok(lead)
    }

    pub async fn list(&self, params: ListLeadsParams) -> Result<(Vec<Lead>, i64)> {
        let offset = super::page_offset(params.page, params.limit);
        let search = params.search.map(|s| format!("%{}%", s));

        let leads: Vec<Lead> = sqlx::query_as(
            r#"
            SELECT * FROM leads
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR email ILIKE $2 OR name ILIKE $2 OR phone ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&params.status)
        .bind(&search)
        .bind(params.limit as i64)
        .bind(offset)
        .fetch_all(&self.db.pg)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM leads
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR email ILIKE $2 OR name ILIKE $2 OR phone ILIKE $2)
            "#,
        )
        .bind(&params.status)
        .bind(&search)
        .fetch_one(&self.db.pg)
        .await?;

        Ok((leads, total))
    }

    pub async fn get(&self, lead_id: Uuid) -> Result<Lead> {
        sqlx::query_as("SELECT * FROM leads WHERE id = $1")
            .bind(lead_id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))
    }

    pub async fn update_status(&self, lead_id: Uuid, status: LeadStatus) -> Result<Lead> {
        let lead: Lead = sqlx::query_as(
            "UPDATE leads SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status.as_str())
        .bind(lead_id)
        .fetch_optional(&self.db.pg)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;

        Ok(lead)
    }

    pub async fn update(&self, lead_id: Uuid, params: UpdateLeadParams) -> Result<Lead> {
        let lead: Lead = sqlx::query_as(
            r#"
            UPDATE leads
            SET name = COALESCE($1, name),
                phone = COALESCE($2, phone),
                address = COALESCE($3, address),
                system_details = COALESCE($4, system_details),
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(params.name)
        .bind(params.phone)
        .bind(params.address)
        .bind(params.system_details)
        .bind(lead_id)
        .fetch_optional(&self.db.pg)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;

        Ok(lead)
    }

    pub async fn delete(&self, lead_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(lead_id)
            .execute(&self.db.pg)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Lead not found".to_string()));
        }
        Ok(())
    }

    pub async fn add_note(&self, lead_id: Uuid, admin_id: Uuid, body: &str) -> Result<LeadNote> {
        if body.trim().is_empty() {
            return Err(AppError::BadRequest("note body is required".to_string()));
        }

        // Make sure the lead exists before attaching a note.
        self.get(lead_id).await?;

        let note: LeadNote = sqlx::query_as(
            r#"
            INSERT INTO lead_notes (lead_id, admin_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(admin_id)
        .bind(body)
        .fetch_one(&self.db.pg)
        .await?;

        Ok(note)
    }

    pub async fn list_notes(&self, lead_id: Uuid) -> Result<Vec<LeadNote>> {
        let notes: Vec<LeadNote> = sqlx::query_as(
            "SELECT * FROM lead_notes WHERE lead_id = $1 ORDER BY created_at DESC",
        )
        .bind(lead_id)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(email: &str) -> SubmissionPayload {
        SubmissionPayload {
            name: Some("Jordan Rivera".to_string()),
            email: email.to_string(),
            phone: None,
            address: None,
            system_details: None,
            source: None,
            utm_campaign: None,
            utm_medium: None,
            visitor_id: None,
        }
    }

    #[test]
    fn test_validate_accepts_name_only() {
        assert!(validate_submission(&payload("jordan@example.com")).is_ok());
    }

    #[test]
    fn test_validate_accepts_phone_only() {
        let mut p = payload("jordan@example.com");
        p.name = None;
        p.phone = Some("555-0100".to_string());
        assert!(validate_submission(&p).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_email() {
        assert!(validate_submission(&payload("")).is_err());
        assert!(validate_submission(&payload("no-at-sign")).is_err());
    }

    #[test]
    fn test_validate_rejects_anonymous_submission() {
        let mut p = payload("jordan@example.com");
        p.name = None;
        p.phone = None;
        assert!(validate_submission(&p).is_err());
        p.name = Some("   ".to_string());
        assert!(validate_submission(&p).is_err());
    }

    #[test]
    fn test_initial_score_base() {
        let p = payload("jordan@example.com");
        assert_eq!(initial_lead_score(&p, 0), 10);
    }

    #[test]
    fn test_initial_score_completeness_bonuses() {
        let mut p = payload("jordan@example.com");
        p.phone = Some("555-0100".to_string());
        p.address = Some("1 Solar Way".to_string());
        p.system_details = Some(serde_json::json!({"monthly_bill": 180}));
        assert_eq!(initial_lead_score(&p, 0), 25);
    }

    #[test]
    fn test_initial_score_visitor_contribution_capped() {
        let p = payload("jordan@example.com");
        assert_eq!(initial_lead_score(&p, 30), 40);
        assert_eq!(initial_lead_score(&p, 500), 60);
        // Negative history never subtracts.
        assert_eq!(initial_lead_score(&p, -10), 10);
    }
}
