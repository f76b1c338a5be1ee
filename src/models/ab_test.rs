use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AbTest {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub status: String,
    pub assignment_mode: String,
    pub traffic_pct: i32,
    pub variants: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AbTest {
    /// Parse the JSON variants column into typed variants.
    pub fn parsed_variants(&self) -> Result<Vec<Variant>, serde_json::Error> {
        serde_json::from_value(self.variants.clone())
    }
}

/// One arm of an A/B test. Weights are relative positive integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub name: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Draft,
    Running,
    Paused,
    Completed,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Draft => "draft",
            TestStatus::Running => "running",
            TestStatus::Paused => "paused",
            TestStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TestStatus::Draft),
            "running" => Some(TestStatus::Running),
            "paused" => Some(TestStatus::Paused),
            "completed" => Some(TestStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentMode {
    Deterministic,
    Random,
}

impl AssignmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentMode::Deterministic => "deterministic",
            AssignmentMode::Random => "random",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deterministic" => Some(AssignmentMode::Deterministic),
            "random" => Some(AssignmentMode::Random),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AbAssignment {
    pub id: Uuid,
    pub test_id: Uuid,
    pub visitor_id: String,
    pub variant_id: String,
    pub converted: bool,
    pub assigned_at: DateTime<Utc>,
    pub converted_at: Option<DateTime<Utc>>,
}
