use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VisitorProfile {
    pub id: Uuid,
    pub visitor_id: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub page_views: i64,
    pub lead_score: i32,
    pub last_session_id: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VisitorEvent {
    pub id: Uuid,
    pub visitor_id: String,
    pub session_id: String,
    pub event_type: String,
    pub page_path: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Trackable visitor events, each carrying a lead-score delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    CtaClicked,
    CalculatorUsed,
    FormStarted,
    FormSubmitted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "page_view",
            EventType::CtaClicked => "cta_clicked",
            EventType::CalculatorUsed => "calculator_used",
            EventType::FormStarted => "form_started",
            EventType::FormSubmitted => "form_submitted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "page_view" => Some(EventType::PageView),
            "cta_clicked" => Some(EventType::CtaClicked),
            "calculator_used" => Some(EventType::CalculatorUsed),
            "form_started" => Some(EventType::FormStarted),
            "form_submitted" => Some(EventType::FormSubmitted),
            _ => None,
        }
    }

    /// Additive lead-score contribution of this event.
    pub fn score_delta(&self) -> i32 {
        match self {
            EventType::PageView => 1,
            EventType::CtaClicked => 3,
            EventType::CalculatorUsed => 5,
            EventType::FormStarted => 10,
            EventType::FormSubmitted => 25,
        }
    }
}
