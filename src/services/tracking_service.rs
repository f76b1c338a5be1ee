// Visitor tracking and lead scoring.
use serde::Serialize;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{EventType, VisitorEvent, VisitorProfile};

#[derive(Debug, Serialize)]
pub struct TrackOutcome {
    pub visitor_id: String,
    pub lead_score: i32,
    pub page_views: i64,
}

pub struct TrackingService {
    db: Database,
}

impl TrackingService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a visitor event: upsert the profile, append the event, and
    /// bump the lead score. Scores only ever increase.
    pub async fn track(
        &self,
        visitor_id: &str,
        session_id: &str,
        event_type: EventType,
        page_path: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> Result<TrackOutcome> {
        if visitor_id.is_empty() || session_id.is_empty() {
            return Err(AppError::BadRequest(
                "visitor_id and session_id are required".to_string(),
            ));
        }

        let page_view_inc: i64 = if event_type == EventType::PageView { 1 } else { 0 };

        let profile: VisitorProfile = sqlx::query_as(
            r#"
            INSERT INTO visitor_profiles (visitor_id, page_views, lead_score, last_session_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (visitor_id) DO UPDATE
            SET last_seen = NOW(),
                page_views = visitor_profiles.page_views + $2,
                lead_score = visitor_profiles.lead_score + $3,
                last_session_id = $4
            RETURNING *
            "#,
        )
        .bind(visitor_id)
        .bind(page_view_inc)
        .bind(event_type.score_delta())
        .bind(session_id)
        .fetch_one(&self.db.pg)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO visitor_events (visitor_id, session_id, event_type, page_path, metadata)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(visitor_id)
        .bind(session_id)
        .bind(event_type.as_str())
        .bind(page_path)
        .bind(metadata)
        .execute(&self.db.pg)
        .await?;

        Ok(TrackOutcome {
            visitor_id: visitor_id.to_string(),
            lead_score: profile.lead_score,
            page_views: profile.page_views,
        })
    }

    pub async fn get_profile(&self, visitor_id: &str) -> Result<Option<VisitorProfile>> {
        let profile: Option<VisitorProfile> =
            sqlx::query_as("SELECT * FROM visitor_profiles WHERE visitor_id = $1")
                .bind(visitor_id)
                .fetch_optional(&self.db.pg)
                .await?;

        Ok(profile)
    }

    pub async fn recent_events(&self, visitor_id: &str, limit: i64) -> Result<Vec<VisitorEvent>> {
        let events: Vec<VisitorEvent> = sqlx::query_as(
            r#"
            SELECT * FROM visitor_events
            WHERE visitor_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(visitor_id)
        .bind(limit)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_deltas() {
        assert_eq!(EventType::PageView.score_delta(), 1);
        assert_eq!(EventType::CtaClicked.score_delta(), 3);
        assert_eq!(EventType::CalculatorUsed.score_delta(), 5);
        assert_eq!(EventType::FormStarted.score_delta(), 10);
        assert_eq!(EventType::FormSubmitted.score_delta(), 25);
    }

    #[test]
    fn test_all_deltas_positive() {
        for event in [
            EventType::PageView,
            EventType::CtaClicked,
            EventType::CalculatorUsed,
            EventType::FormStarted,
            EventType::FormSubmitted,
        ] {
            assert!(event.score_delta() > 0);
        }
    }

    #[test]
    fn test_event_type_round_trip() {
        for event in [
            EventType::PageView,
            EventType::CtaClicked,
            EventType::CalculatorUsed,
            EventType::FormStarted,
            EventType::FormSubmitted,
        ] {
            assert_eq!(EventType::parse(event.as_str()), Some(event));
        }
        assert_eq!(EventType::parse("unknown_event"), None);
    }
}
