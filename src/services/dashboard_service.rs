// Dashboard service - lead-pipeline statistics and chart data.
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::db::Database;
use crate::error::Result;

pub struct DashboardService {
    db: Database,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_leads: i64,
    pub leads_today: i64,
    pub qualified_leads: i64,
    pub converted_leads: i64,
    pub running_tests: i64,
    pub active_webhooks: i64,
    pub webhook_success_rate: f64,
    pub visitors_today: i64,
}

#[derive(Debug, Serialize)]
pub struct ChartDataPoint {
    pub date: String,
    pub value: i64,
}

#[derive(Debug, sqlx::FromRow, Serialize)]
pub struct RecentActivity {
    pub id: uuid::Uuid,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub admin_name: String,
    pub admin_email: String,
}

/// Midnight of the given calendar day, pinned to UTC so day boundaries do
/// not drift with the database server's timezone.
fn utc_day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

impl DashboardService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn count(&self, query: &str) -> i64 {
        sqlx::query_scalar(query)
            .fetch_one(&self.db.pg)
            .await
            .unwrap_or(0)
    }

    async fn count_since(&self, query: &str, since: DateTime<Utc>) -> i64 {
        sqlx::query_scalar(query)
            .bind(since)
            .fetch_one(&self.db.pg)
            .await
            .unwrap_or(0)
    }

    /// Get dashboard statistics. The counts are independent and run
    /// concurrently; a failing count reports zero rather than taking the
    /// whole dashboard down.
    pub async fn get_stats(&self) -> Result<DashboardStats> {
        let today_start = utc_day_start(Utc::now().date_naive());

        let (
            total_leads,
            leads_today,
            qualified_leads,
            converted_leads,
            running_tests,
            active_webhooks,
            delivery_counts,
            visitors_today,
        ) = tokio::join!(
            self.count("SELECT COUNT(*) FROM leads"),
            self.count_since("SELECT COUNT(*) FROM leads WHERE created_at >= $1", today_start),
            self.count("SELECT COUNT(*) FROM leads WHERE status = 'qualified'"),
            self.count("SELECT COUNT(*) FROM leads WHERE status = 'converted'"),
            self.count("SELECT COUNT(*) FROM ab_tests WHERE status = 'running'"),
            self.count("SELECT COUNT(*) FROM webhooks WHERE active"),
            // Delivery success over the last 7 days.
            async {
                let counts: (i64, i64) = sqlx::query_as(
                    r#"
                    SELECT COUNT(*) FILTER (WHERE success), COUNT(*)
                    FROM webhook_deliveries
                    WHERE created_at >= NOW() - INTERVAL '7 days'
                    "#,
                )
                .fetch_one(&self.db.pg)
                .await
                .unwrap_or((0, 0));
                counts
            },
            self.count_since(
                "SELECT COUNT(*) FROM visitor_profiles WHERE last_seen >= $1",
                today_start,
            ),
        );

        let (successes, attempts) = delivery_counts;
        let webhook_success_rate = if attempts > 0 {
            (successes as f64 * 10_000.0 / attempts as f64).round() / 100.0
        } else {
            0.0
        };

        Ok(DashboardStats {
            total_leads,
            leads_today,
            qualified_leads,
            converted_leads,
            running_tests,
            active_webhooks,
            webhook_success_rate,
            visitors_today,
        })
    }

    /// Leads captured per day for the last N days.
    pub async fn get_leads_chart(&self, days: i32) -> Result<Vec<ChartDataPoint>> {
        self.daily_counts("leads", "created_at", days).await
    }

    /// A/B conversions per day for the last N days.
    pub async fn get_conversions_chart(&self, days: i32) -> Result<Vec<ChartDataPoint>> {
        self.daily_counts("ab_assignments", "converted_at", days)
            .await
    }

    async fn daily_counts(
        &self,
        table: &str,
        column: &str,
        days: i32,
    ) -> Result<Vec<ChartDataPoint>> {
        let mut data = Vec::new();
        let today = Utc::now().date_naive();

        for i in (0..days).rev() {
            let date = today - Duration::days(i as i64);
            let next_date = date + Duration::days(1);

            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {} WHERE {} >= $1 AND {} < $2",
                table, column, column
            ))
            .bind(utc_day_start(date))
            .bind(utc_day_start(next_date))
            .fetch_one(&self.db.pg)
            .await
            .unwrap_or(0);

            data.push(ChartDataPoint {
                date: date.format("%Y-%m-%d").to_string(),
                value: count,
            });
        }

        Ok(data)
    }

    /// Recent audit entries joined with admin names for the activity feed.
    pub async fn get_recent_activity(&self, limit: i64) -> Result<Vec<RecentActivity>> {
        let activities: Vec<RecentActivity> = sqlx::query_as(
            r#"
            SELECT
                al.id,
                al.action,
                al.resource_type,
                al.resource_id,
                al.created_at,
                a.name as admin_name,
                a.email as admin_email
            FROM audit_logs al
            JOIN admin_users a ON al.admin_id = a.id
            ORDER BY al.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db.pg)
        .await
        .unwrap_or_default();

        Ok(activities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_start_is_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let start = utc_day_start(date);
        assert_eq!(start.to_rfc3339(), "2026-08-26T00:00:00+00:00");
    }
}
