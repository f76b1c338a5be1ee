// A/B testing engine - visitor/variant binding, deterministic bucketing,
// conversion counting and per-variant metrics.
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{AbAssignment, AbTest, AssignmentMode, TestStatus, Variant};

/// Buckets are hundredths of a percent, so traffic_pct maps exactly onto
/// the bucket space without floating point.
pub const BUCKET_SPACE: u64 = 10_000;

/// Deterministic bucket in [0, 10000) for a (test, visitor) pair.
///
/// Pure function of the two ids: the same pair buckets identically across
/// processes and restarts.
pub fn bucket_for(test_id: Uuid, visitor_id: &str) -> u64 {
    let digest = pair_digest(test_id, visitor_id);
    u64::from_be_bytes(digest[0..8].try_into().unwrap()) % BUCKET_SPACE
}

/// Deterministic variant pick over cumulative weights.
///
/// Uses a different slice of the digest than `bucket_for` so the sampling
/// decision and the variant decision are independent.
pub fn pick_variant<'a>(
    test_id: Uuid,
    visitor_id: &str,
    variants: &'a [Variant],
) -> Option<&'a Variant> {
    let digest = pair_digest(test_id, visitor_id);
    let point = u64::from_be_bytes(digest[8..16].try_into().unwrap());
    pick_weighted(point, variants)
}

/// Uniform random variant pick honoring weights (random assignment mode).
pub fn pick_variant_random(variants: &[Variant]) -> Option<&Variant> {
    let total: u64 = variants.iter().map(|v| v.weight as u64).sum();
    if total == 0 {
        return None;
    }
    let point = rand::thread_rng().gen_range(0..total);
    pick_weighted(point, variants)
}

fn pick_weighted(point: u64, variants: &[Variant]) -> Option<&Variant> {
    let total: u64 = variants.iter().map(|v| v.weight as u64).sum();
    if total == 0 {
        return None;
    }
    let mut remaining = point % total;
    for variant in variants {
        let w = variant.weight as u64;
        if remaining < w {
            return Some(variant);
        }
        remaining -= w;
    }
    // Unreachable: cumulative weights cover [0, total).
    variants.last()
}

// The digest input is the hyphenated string form of the test id, not its
// raw bytes, so client-side code can reproduce buckets from the ids it sees
// on the wire.
fn pair_digest(test_id: Uuid, visitor_id: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(test_id.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(visitor_id.as_bytes());
    hasher.finalize().into()
}

/// Conversion rate as a percentage with two decimals.
pub fn conversion_rate_pct(conversions: i64, impressions: i64) -> f64 {
    if impressions <= 0 {
        return 0.0;
    }
    (conversions as f64 * 10_000.0 / impressions as f64).round() / 100.0
}

#[derive(Debug, Serialize)]
pub struct AssignOutcome {
    pub assigned: bool,
    pub test_id: Option<Uuid>,
    pub variant_id: Option<String>,
    pub variant_name: Option<String>,
}

impl AssignOutcome {
    fn unassigned() -> Self {
        Self {
            assigned: false,
            test_id: None,
            variant_id: None,
            variant_name: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VariantMetrics {
    pub variant_id: String,
    pub variant_name: String,
    pub impressions: i64,
    pub conversions: i64,
    pub conversion_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct TestMetrics {
    pub test_id: Uuid,
    pub status: String,
    pub variants: Vec<VariantMetrics>,
    pub total_impressions: i64,
    pub total_conversions: i64,
    pub overall_conversion_rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTestParams {
    pub name: String,
    pub url: String,
    pub assignment_mode: Option<String>,
    pub traffic_pct: Option<i32>,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTestParams {
    pub name: Option<String>,
    pub url: Option<String>,
    pub assignment_mode: Option<String>,
    pub traffic_pct: Option<i32>,
    pub variants: Option<Vec<Variant>>,
}

pub struct AbTestingService {
    db: Database,
}

impl AbTestingService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn validate_variants(variants: &[Variant]) -> Result<()> {
        if variants.len() < 2 {
            return Err(AppError::BadRequest(
                "A test needs at least two variants".to_string(),
            ));
        }
        let total: u64 = variants.iter().map(|v| v.weight as u64).sum();
        if total == 0 {
            return Err(AppError::BadRequest(
                "Variant weights must sum to a positive value".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_traffic_pct(pct: i32) -> Result<()> {
        if !(0..=100).contains(&pct) {
            return Err(AppError::BadRequest(
                "traffic_pct must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create_test(&self, params: CreateTestParams) -> Result<AbTest> {
        Self::validate_variants(&params.variants)?;
        let traffic_pct = params.traffic_pct.unwrap_or(100);
        Self::validate_traffic_pct(traffic_pct)?;

        let mode = params.assignment_mode.as_deref().unwrap_or("deterministic");
        AssignmentMode::parse(mode)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown assignment mode: {}", mode)))?;

        let test: AbTest = sqlx::query_as(
            r#"
            INSERT INTO ab_tests (name, url, status, assignment_mode, traffic_pct, variants)
            VALUES ($1, $2, 'draft', $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&params.name)
        .bind(&params.url)
        .bind(mode)
        .bind(traffic_pct)
        .bind(serde_json::to_value(&params.variants).map_err(anyhow::Error::from)?)
        .fetch_one(&self.db.pg)
        .await?;

        Ok(test)
    }

    pub async fn list_tests(&self, page: u32, limit: u32) -> Result<(Vec<AbTest>, i64)> {
        let offset = super::page_offset(page, limit);

        let tests: Vec<AbTest> = sqlx::query_as(
            "SELECT * FROM ab_tests ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.db.pg)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ab_tests")
            .fetch_one(&self.db.pg)
            .await?;

        Ok((tests, total))
    }

    pub async fn get_test(&self, test_id: Uuid) -> Result<AbTest> {
        sqlx::query_as("SELECT * FROM ab_tests WHERE id = $1")
            .bind(test_id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound("Test not found".to_string()))
    }

    pub async fn update_test(&self, test_id: Uuid, params: UpdateTestParams) -> Result<AbTest> {
        let existing = self.get_test(test_id).await?;

        // Variants and weights are frozen while the test is collecting data.
        if existing.status == TestStatus::Running.as_str() && params.variants.is_some() {
            return Err(AppError::Conflict(
                "Variants cannot change while a test is running".to_string(),
            ));
        }

        if let Some(variants) = &params.variants {
            Self::validate_variants(variants)?;
        }
        if let Some(pct) = params.traffic_pct {
            Self::validate_traffic_pct(pct)?;
        }
        if let Some(mode) = &params.assignment_mode {
            AssignmentMode::parse(mode).ok_or_else(|| {
                AppError::BadRequest(format!("Unknown assignment mode: {}", mode))
            })?;
        }

        let variants_json = match &params.variants {
            Some(v) => Some(serde_json::to_value(v).map_err(anyhow::Error::from)?),
            None => None,
        };

        let test: AbTest = sqlx::query_as(
            r#"
            UPDATE ab_tests
            SET name = COALESCE($1, name),
                url = COALESCE($2, url),
                assignment_mode = COALESCE($3, assignment_mode),
                traffic_pct = COALESCE($4, traffic_pct),
                variants = COALESCE($5, variants),
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(params.name)
        .bind(params.url)
        .bind(params.assignment_mode)
        .bind(params.traffic_pct)
        .bind(variants_json)
        .bind(test_id)
        .fetch_one(&self.db.pg)
        .await?;

        Ok(test)
    }

    pub async fn set_status(&self, test_id: Uuid, status: TestStatus) -> Result<AbTest> {
        let test: AbTest = sqlx::query_as(
            "UPDATE ab_tests SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status.as_str())
        .bind(test_id)
        .fetch_optional(&self.db.pg)
        .await?
        .ok_or_else(|| AppError::NotFound("Test not found".to_string()))?;

        Ok(test)
    }

    pub async fn delete_test(&self, test_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM ab_tests WHERE id = $1")
            .bind(test_id)
            .execute(&self.db.pg)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Test not found".to_string()));
        }
        Ok(())
    }

    /// Resolve the running test targeted by an assignment request, by id or
    /// by page url.
    pub async fn resolve_running_test(
        &self,
        test_id: Option<Uuid>,
        url: Option<&str>,
    ) -> Result<Option<AbTest>> {
        let test: Option<AbTest> = match (test_id, url) {
            (Some(id), _) => {
                sqlx::query_as("SELECT * FROM ab_tests WHERE id = $1 AND status = 'running'")
                    .bind(id)
                    .fetch_optional(&self.db.pg)
                    .await?
            }
            (None, Some(url)) => {
                sqlx::query_as(
                    r#"
                    SELECT * FROM ab_tests
                    WHERE url = $1 AND status = 'running'
                    ORDER BY created_at DESC
                    LIMIT 1
                    "#,
                )
                .bind(url)
                .fetch_optional(&self.db.pg)
                .await?
            }
            (None, None) => {
                return Err(AppError::BadRequest(
                    "Either test_id or url is required".to_string(),
                ))
            }
        };

        Ok(test)
    }

    /// Assign a visitor to a variant. The binding is stable: an existing
    /// assignment always wins, including under concurrent first requests.
    pub async fn assign(&self, test: &AbTest, visitor_id: &str) -> Result<AssignOutcome> {
        if visitor_id.is_empty() {
            return Err(AppError::BadRequest("visitor_id is required".to_string()));
        }

        if let Some(existing) = self.find_assignment(test.id, visitor_id).await? {
            return self.outcome_for(test, existing.variant_id);
        }

        // Sampling gate: traffic_pct percent of the bucket space.
        let bucket = bucket_for(test.id, visitor_id);
        if bucket >= test.traffic_pct as u64 * 100 {
            return Ok(AssignOutcome::unassigned());
        }

        let variants = test
            .parsed_variants()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt variants JSON: {}", e)))?;

        let mode = AssignmentMode::parse(&test.assignment_mode)
            .unwrap_or(AssignmentMode::Deterministic);
        let variant = match mode {
            AssignmentMode::Deterministic => pick_variant(test.id, visitor_id, &variants),
            AssignmentMode::Random => pick_variant_random(&variants),
        }
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Test has no pickable variant")))?;

        // Unique (test_id, visitor_id) resolves concurrent inserts; the row
        // that won is re-read and returned.
        sqlx::query(
            r#"
            INSERT INTO ab_assignments (test_id, visitor_id, variant_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (test_id, visitor_id) DO NOTHING
            "#,
        )
        .bind(test.id)
        .bind(visitor_id)
        .bind(&variant.id)
        .execute(&self.db.pg)
        .await?;

        let winner = self
            .find_assignment(test.id, visitor_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Assignment insert lost")))?;

        self.outcome_for(test, winner.variant_id)
    }

    fn outcome_for(&self, test: &AbTest, variant_id: String) -> Result<AssignOutcome> {
        let variants = test.parsed_variants().unwrap_or_default();
        let variant_name = variants
            .iter()
            .find(|v| v.id == variant_id)
            .map(|v| v.name.clone());

        Ok(AssignOutcome {
            assigned: true,
            test_id: Some(test.id),
            variant_id: Some(variant_id),
            variant_name,
        })
    }

    async fn find_assignment(
        &self,
        test_id: Uuid,
        visitor_id: &str,
    ) -> Result<Option<AbAssignment>> {
        let assignment: Option<AbAssignment> = sqlx::query_as(
            "SELECT * FROM ab_assignments WHERE test_id = $1 AND visitor_id = $2",
        )
        .bind(test_id)
        .bind(visitor_id)
        .fetch_optional(&self.db.pg)
        .await?;

        Ok(assignment)
    }

    /// Mark a visitor's assignment converted. Idempotent: repeated calls do
    /// not double count. Returns false when no assignment exists.
    pub async fn convert(&self, test_id: Uuid, visitor_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE ab_assignments
            SET converted = TRUE, converted_at = COALESCE(converted_at, NOW())
            WHERE test_id = $1 AND visitor_id = $2
            "#,
        )
        .bind(test_id)
        .bind(visitor_id)
        .execute(&self.db.pg)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Per-variant impressions, conversions and rates. Variants with no
    /// assignments yet still appear with zero counts.
    pub async fn metrics(&self, test_id: Uuid) -> Result<TestMetrics> {
        let test = self.get_test(test_id).await?;
        let variants = test
            .parsed_variants()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt variants JSON: {}", e)))?;

        let counts: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT variant_id,
                   COUNT(*) AS impressions,
                   COUNT(*) FILTER (WHERE converted) AS conversions
            FROM ab_assignments
            WHERE test_id = $1
            GROUP BY variant_id
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.db.pg)
        .await?;

        let mut total_impressions = 0i64;
        let mut total_conversions = 0i64;
        let mut per_variant = Vec::with_capacity(variants.len());

        for variant in &variants {
            let (impressions, conversions) = counts
                .iter()
                .find(|(id, _, _)| *id == variant.id)
                .map(|(_, i, c)| (*i, *c))
                .unwrap_or((0, 0));

            total_impressions += impressions;
            total_conversions += conversions;

            per_variant.push(VariantMetrics {
                variant_id: variant.id.clone(),
                variant_name: variant.name.clone(),
                impressions,
                conversions,
                conversion_rate: conversion_rate_pct(conversions, impressions),
            });
        }

        Ok(TestMetrics {
            test_id,
            status: test.status,
            variants: per_variant,
            total_impressions,
            total_conversions,
            overall_conversion_rate: conversion_rate_pct(total_conversions, total_impressions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variants(weights: &[u32]) -> Vec<Variant> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| Variant {
                id: format!("v{}", i),
                name: format!("Variant {}", i),
                weight: *w,
            })
            .collect()
    }

    #[test]
    fn test_bucket_is_deterministic() {
        let test_id = Uuid::new_v4();
        let first = bucket_for(test_id, "visitor-123");
        for _ in 0..10 {
            assert_eq!(bucket_for(test_id, "visitor-123"), first);
        }
    }

    #[test]
    fn test_bucket_matches_published_formula() {
        // Anyone holding the wire-format ids must be able to recompute the
        // bucket: sha256 of "{test_id}:{visitor_id}", first 8 bytes as a
        // big-endian u64, modulo the bucket space.
        let test_id = Uuid::parse_str("11111111-2222-3333-4444-555555555555").unwrap();
        let visitor_id = "visitor-abc";

        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}", test_id, visitor_id).as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        let expected = u64::from_be_bytes(digest[0..8].try_into().unwrap()) % BUCKET_SPACE;

        assert_eq!(bucket_for(test_id, visitor_id), expected);
    }

    #[test]
    fn test_bucket_in_range() {
        let test_id = Uuid::new_v4();
        for i in 0..1000 {
            let bucket = bucket_for(test_id, &format!("visitor-{}", i));
            assert!(bucket < BUCKET_SPACE);
        }
    }

    #[test]
    fn test_bucket_spread_roughly_uniform() {
        let test_id = Uuid::new_v4();
        let mut below_half = 0;
        let n = 10_000;
        for i in 0..n {
            if bucket_for(test_id, &format!("visitor-{}", i)) < BUCKET_SPACE / 2 {
                below_half += 1;
            }
        }
        // A 50/50 split over 10k visitors should land well inside 45-55%.
        assert!(below_half > n * 45 / 100, "below_half = {}", below_half);
        assert!(below_half < n * 55 / 100, "below_half = {}", below_half);
    }

    #[test]
    fn test_different_tests_bucket_independently() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut differs = false;
        for i in 0..100 {
            let v = format!("visitor-{}", i);
            if bucket_for(a, &v) != bucket_for(b, &v) {
                differs = true;
                break;
            }
        }
        assert!(differs);
    }

    #[test]
    fn test_pick_variant_is_deterministic() {
        let test_id = Uuid::new_v4();
        let vs = variants(&[50, 50]);
        let first = pick_variant(test_id, "visitor-abc", &vs).unwrap().id.clone();
        for _ in 0..10 {
            assert_eq!(pick_variant(test_id, "visitor-abc", &vs).unwrap().id, first);
        }
    }

    #[test]
    fn test_pick_variant_honors_zero_weight() {
        let test_id = Uuid::new_v4();
        let vs = vec![
            Variant { id: "a".into(), name: "A".into(), weight: 0 },
            Variant { id: "b".into(), name: "B".into(), weight: 10 },
        ];
        for i in 0..500 {
            let picked = pick_variant(test_id, &format!("visitor-{}", i), &vs).unwrap();
            assert_eq!(picked.id, "b");
        }
    }

    #[test]
    fn test_pick_variant_all_zero_weights_returns_none() {
        let vs = variants(&[0, 0]);
        assert!(pick_variant(Uuid::new_v4(), "v", &vs).is_none());
        assert!(pick_variant_random(&vs).is_none());
    }

    #[test]
    fn test_pick_variant_weight_proportions() {
        let test_id = Uuid::new_v4();
        let vs = vec![
            Variant { id: "a".into(), name: "A".into(), weight: 90 },
            Variant { id: "b".into(), name: "B".into(), weight: 10 },
        ];
        let n = 10_000;
        let mut a_count = 0;
        for i in 0..n {
            if pick_variant(test_id, &format!("visitor-{}", i), &vs).unwrap().id == "a" {
                a_count += 1;
            }
        }
        // Expect ~90%; allow a generous band.
        assert!(a_count > n * 85 / 100, "a_count = {}", a_count);
        assert!(a_count < n * 95 / 100, "a_count = {}", a_count);
    }

    #[test]
    fn test_pick_weighted_cumulative_boundaries() {
        let vs = variants(&[3, 2, 5]);
        assert_eq!(pick_weighted(0, &vs).unwrap().id, "v0");
        assert_eq!(pick_weighted(2, &vs).unwrap().id, "v0");
        assert_eq!(pick_weighted(3, &vs).unwrap().id, "v1");
        assert_eq!(pick_weighted(4, &vs).unwrap().id, "v1");
        assert_eq!(pick_weighted(5, &vs).unwrap().id, "v2");
        assert_eq!(pick_weighted(9, &vs).unwrap().id, "v2");
        // Points beyond the total wrap around.
        assert_eq!(pick_weighted(10, &vs).unwrap().id, "v0");
    }

    #[test]
    fn test_random_pick_returns_a_listed_variant() {
        let vs = variants(&[1, 1, 1]);
        for _ in 0..100 {
            let picked = pick_variant_random(&vs).unwrap();
            assert!(vs.iter().any(|v| v.id == picked.id));
        }
    }

    #[test]
    fn test_conversion_rate_math() {
        assert_eq!(conversion_rate_pct(0, 0), 0.0);
        assert_eq!(conversion_rate_pct(0, 100), 0.0);
        assert_eq!(conversion_rate_pct(100, 100), 100.0);
        assert_eq!(conversion_rate_pct(1, 3), 33.33);
        assert_eq!(conversion_rate_pct(2, 3), 66.67);
        assert_eq!(conversion_rate_pct(5, 200), 2.5);
    }

    #[test]
    fn test_validate_variants() {
        assert!(AbTestingService::validate_variants(&variants(&[50, 50])).is_ok());
        assert!(AbTestingService::validate_variants(&variants(&[100])).is_err());
        assert!(AbTestingService::validate_variants(&variants(&[0, 0])).is_err());
        assert!(AbTestingService::validate_variants(&[]).is_err());
    }

    #[test]
    fn test_validate_traffic_pct() {
        assert!(AbTestingService::validate_traffic_pct(0).is_ok());
        assert!(AbTestingService::validate_traffic_pct(100).is_ok());
        assert!(AbTestingService::validate_traffic_pct(101).is_err());
        assert!(AbTestingService::validate_traffic_pct(-1).is_err());
    }
}
