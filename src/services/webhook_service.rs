// Webhook registry and outbound fan-out.
//
// Deliveries are single-attempt: one POST per active webhook per submission,
// fired concurrently with a per-request timeout. Failures are recorded and
// logged, never propagated to the submitter.
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Lead, Webhook, WebhookDelivery};

#[derive(Debug, Deserialize)]
pub struct CreateWebhookParams {
    pub name: String,
    pub url: String,
    pub form_id: String,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWebhookParams {
    pub name: Option<String>,
    pub url: Option<String>,
    pub form_id: Option<String>,
    pub active: Option<bool>,
}

/// Outcome of a single delivery attempt, before it is persisted.
#[derive(Debug, Serialize)]
pub struct DeliveryOutcome {
    pub webhook_id: Uuid,
    pub status_code: Option<i32>,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: i64,
}

/// Payload POSTed to subscriber endpoints on lead capture.
pub fn submission_payload(lead: &Lead) -> serde_json::Value {
    serde_json::json!({
        "event": "lead.created",
        "form_id": lead.form_id,
        "lead": lead,
        "sent_at": Utc::now().to_rfc3339(),
    })
}

/// Payload for the admin "test fire" endpoint.
pub fn test_payload(webhook: &Webhook) -> serde_json::Value {
    serde_json::json!({
        "event": "webhook.test",
        "webhook_id": webhook.id,
        "form_id": webhook.form_id,
        "sent_at": Utc::now().to_rfc3339(),
    })
}

pub struct WebhookService {
    db: Database,
    http: reqwest::Client,
    timeout: Duration,
}

impl WebhookService {
    pub fn new(db: Database, http: reqwest::Client, timeout_secs: u64) -> Self {
        Self {
            db,
            http,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub async fn create(&self, params: CreateWebhookParams) -> Result<Webhook> {
        if params.url.trim().is_empty() || params.form_id.trim().is_empty() {
            return Err(AppError::BadRequest(
                "url and form_id are required".to_string(),
            ));
        }

        let webhook: Webhook = sqlx::query_as(
            r#"
            INSERT INTO webhooks (name, url, form_id, active)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&params.name)
        .bind(&params.url)
        .bind(&params.form_id)
        .bind(params.active.unwrap_or(true))
        .fetch_one(&self.db.pg)
        .await?;

        Ok(webhook)
    }

    pub async fn list(&self) -> Result<Vec<Webhook>> {
        let webhooks: Vec<Webhook> =
            sqlx::query_as("SELECT * FROM webhooks ORDER BY created_at DESC")
                .fetch_all(&self.db.pg)
                .await?;

        Ok(webhooks)
    }

    pub async fn get(&self, webhook_id: Uuid) -> Result<Webhook> {
        sqlx::query_as("SELECT * FROM webhooks WHERE id = $1")
            .bind(webhook_id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound("Webhook not found".to_string()))
    }

    pub async fn update(&self, webhook_id: Uuid, params: UpdateWebhookParams) -> Result<Webhook> {
        let webhook: Webhook = sqlx::query_as(
            r#"
            UPDATE webhooks
            SET name = COALESCE($1, name),
                url = COALESCE($2, url),
                form_id = COALESCE($3, form_id),
                active = COALESCE($4, active),
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(params.name)
        .bind(params.url)
        .bind(params.form_id)
        .bind(params.active)
        .bind(webhook_id)
        .fetch_optional(&self.db.pg)
        .await?
        .ok_or_else(|| AppError::NotFound("Webhook not found".to_string()))?;

        Ok(webhook)
    }

    pub async fn delete(&self, webhook_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
            .bind(webhook_id)
            .execute(&self.db.pg)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Webhook not found".to_string()));
        }
        Ok(())
    }

    pub async fn recent_deliveries(
        &self,
        webhook_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WebhookDelivery>> {
        let deliveries: Vec<WebhookDelivery> = sqlx::query_as(
            r#"
            SELECT * FROM webhook_deliveries
            WHERE webhook_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(webhook_id)
        .bind(limit)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(deliveries)
    }

    /// Fan a captured lead out to every active webhook registered for its
    /// form. One attempt per webhook, no ordering guarantees between them.
    /// Returns the number of attempts made.
    pub async fn dispatch_for_lead(&self, lead: &Lead) -> Result<usize> {
        let webhooks: Vec<Webhook> = sqlx::query_as(
            "SELECT * FROM webhooks WHERE form_id = $1 AND active",
        )
        .bind(&lead.form_id)
        .fetch_all(&self.db.pg)
        .await?;

        if webhooks.is_empty() {
            return Ok(0);
        }

        let payload = submission_payload(lead);

        let attempts = webhooks
            .iter()
            .map(|webhook| self.deliver(webhook, &payload));
        let outcomes = join_all(attempts).await;

        let count = outcomes.len();
        for outcome in &outcomes {
            if !outcome.success {
                tracing::warn!(
                    webhook_id = %outcome.webhook_id,
                    error = ?outcome.error,
                    "Webhook delivery failed"
                );
            }
            self.record_delivery(outcome, Some(lead.id)).await;
        }

        Ok(count)
    }

    /// Fire a sample payload at one webhook and return the outcome inline.
    pub async fn test_fire(&self, webhook_id: Uuid) -> Result<DeliveryOutcome> {
        let webhook = self.get(webhook_id).await?;
        let payload = test_payload(&webhook);
        let outcome = self.deliver(&webhook, &payload).await;
        self.record_delivery(&outcome, None).await;
        Ok(outcome)
    }

    async fn deliver(&self, webhook: &Webhook, payload: &serde_json::Value) -> DeliveryOutcome {
        let start = Instant::now();
        let result = self
            .http
            .post(&webhook.url)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await;
        let duration_ms = start.elapsed().as_millis() as i64;

        match result {
            Ok(response) => {
                let status = response.status();
                DeliveryOutcome {
                    webhook_id: webhook.id,
                    status_code: Some(status.as_u16() as i32),
                    success: status.is_success(),
                    error: if status.is_success() {
                        None
                    } else {
                        Some(format!("HTTP {}", status))
                    },
                    duration_ms,
                }
            }
            Err(e) => DeliveryOutcome {
                webhook_id: webhook.id,
                status_code: None,
                success: false,
                error: Some(e.to_string()),
                duration_ms,
            },
        }
    }

    /// Best effort: a failed bookkeeping insert must not fail the request.
    async fn record_delivery(&self, outcome: &DeliveryOutcome, lead_id: Option<Uuid>) {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_deliveries (webhook_id, lead_id, status_code, success, error, duration_ms)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(outcome.webhook_id)
        .bind(lead_id)
        .bind(outcome.status_code)
        .bind(outcome.success)
        .bind(&outcome.error)
        .bind(outcome.duration_ms)
        .execute(&self.db.pg)
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to record webhook delivery: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_lead() -> Lead {
        Lead {
            id: Uuid::new_v4(),
            form_id: "solar-quote".to_string(),
            name: Some("Jordan Rivera".to_string()),
            email: "jordan@example.com".to_string(),
            phone: Some("555-0100".to_string()),
            address: None,
            status: "new".to_string(),
            score: 20,
            system_details: None,
            source: Some("landing".to_string()),
            utm_campaign: None,
            utm_medium: None,
            visitor_id: Some("v-1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_submission_payload_shape() {
        let lead = sample_lead();
        let payload = submission_payload(&lead);

        assert_eq!(payload["event"], "lead.created");
        assert_eq!(payload["form_id"], "solar-quote");
        assert_eq!(payload["lead"]["email"], "jordan@example.com");
        assert!(payload["sent_at"].is_string());
    }

    #[test]
    fn test_test_payload_shape() {
        let webhook = Webhook {
            id: Uuid::new_v4(),
            name: "CRM".to_string(),
            url: "https://crm.example.com/hook".to_string(),
            form_id: "solar-quote".to_string(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let payload = test_payload(&webhook);

        assert_eq!(payload["event"], "webhook.test");
        assert_eq!(payload["form_id"], "solar-quote");
        assert_eq!(payload["webhook_id"], serde_json::json!(webhook.id));
    }
}
