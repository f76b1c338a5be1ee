// Savings calculator - pure estimation math for the public landing pages.
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Installed cost per watt before incentives, in USD.
const COST_PER_WATT: f64 = 2.80;
/// Federal investment tax credit.
const FEDERAL_ITC: f64 = 0.30;
/// Assumed yearly utility price inflation.
const UTILITY_INFLATION: f64 = 0.025;
/// System losses (inverter, wiring, soiling).
const DERATE: f64 = 0.96;

const DEFAULT_UTILITY_RATE: f64 = 0.16;
const DEFAULT_SUN_HOURS: f64 = 4.5;

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateInput {
    /// Current monthly electric bill in USD.
    pub monthly_bill: f64,
    /// Utility rate in USD per kWh.
    pub utility_rate: Option<f64>,
    /// Average peak sun hours per day at the site.
    pub sun_hours_per_day: Option<f64>,
    /// Share of usage the system should cover, 10-100.
    pub coverage_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Estimate {
    pub system_size_kw: f64,
    pub annual_production_kwh: f64,
    pub first_year_savings: f64,
    pub gross_cost: f64,
    pub federal_credit: f64,
    pub net_cost: f64,
    pub payback_years: f64,
    pub twenty_five_year_savings: f64,
}

/// Compute a solar savings estimate. Deterministic; invalid input yields
/// a BadRequest.
pub fn estimate(input: &EstimateInput) -> Result<Estimate> {
    if !input.monthly_bill.is_finite() || input.monthly_bill <= 0.0 {
        return Err(AppError::BadRequest(
            "monthly_bill must be a positive number".to_string(),
        ));
    }

    let utility_rate = input.utility_rate.unwrap_or(DEFAULT_UTILITY_RATE);
    if !utility_rate.is_finite() || utility_rate <= 0.0 {
        return Err(AppError::BadRequest(
            "utility_rate must be a positive number".to_string(),
        ));
    }

    let sun_hours = input.sun_hours_per_day.unwrap_or(DEFAULT_SUN_HOURS);
    if !sun_hours.is_finite() || sun_hours <= 0.0 || sun_hours > 12.0 {
        return Err(AppError::BadRequest(
            "sun_hours_per_day must be between 0 and 12".to_string(),
        ));
    }

    let coverage = input.coverage_pct.unwrap_or(100.0).clamp(10.0, 100.0) / 100.0;

    let annual_usage_kwh = input.monthly_bill / utility_rate * 12.0;
    let target_production = annual_usage_kwh * coverage;

    let system_size_kw = target_production / (sun_hours * 365.0 * DERATE);
    let annual_production_kwh = system_size_kw * sun_hours * 365.0 * DERATE;
    let first_year_savings = annual_production_kwh * utility_rate;

    let gross_cost = system_size_kw * 1000.0 * COST_PER_WATT;
    let federal_credit = gross_cost * FEDERAL_ITC;
    let net_cost = gross_cost - federal_credit;

    let payback_years = net_cost / first_year_savings;

    // Savings compound with utility inflation over the 25-year panel warranty.
    let mut lifetime_savings = 0.0;
    for year in 0..25 {
        lifetime_savings += first_year_savings * (1.0 + UTILITY_INFLATION).powi(year);
    }
    let twenty_five_year_savings = lifetime_savings - net_cost;

    Ok(Estimate {
        system_size_kw: round2(system_size_kw),
        annual_production_kwh: round2(annual_production_kwh),
        first_year_savings: round2(first_year_savings),
        gross_cost: round2(gross_cost),
        federal_credit: round2(federal_credit),
        net_cost: round2(net_cost),
        payback_years: round2(payback_years),
        twenty_five_year_savings: round2(twenty_five_year_savings),
    })
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(monthly_bill: f64) -> EstimateInput {
        EstimateInput {
            monthly_bill,
            utility_rate: None,
            sun_hours_per_day: None,
            coverage_pct: None,
        }
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let a = estimate(&input(180.0)).unwrap();
        let b = estimate(&input(180.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_estimate_known_input() {
        // $160/mo at the default $0.16/kWh is exactly 12,000 kWh/yr.
        let result = estimate(&input(160.0)).unwrap();
        assert_eq!(result.annual_production_kwh, 12_000.0);
        // 12000 / (4.5 * 365 * 0.96) kW
        assert_eq!(result.system_size_kw, 7.61);
        assert_eq!(result.first_year_savings, 1_920.0);
        // Credit is exactly 30% of gross.
        assert!((result.federal_credit - result.gross_cost * 0.30).abs() < 0.01);
        assert!((result.net_cost - (result.gross_cost - result.federal_credit)).abs() < 0.01);
        assert!(result.payback_years > 0.0);
        assert!(result.twenty_five_year_savings > 0.0);
    }

    #[test]
    fn test_coverage_scales_production() {
        let full = estimate(&input(200.0)).unwrap();
        let half = estimate(&EstimateInput {
            coverage_pct: Some(50.0),
            ..input(200.0)
        })
        .unwrap();
        assert!((half.annual_production_kwh - full.annual_production_kwh / 2.0).abs() < 1.0);
    }

    #[test]
    fn test_coverage_clamped() {
        let low = estimate(&EstimateInput {
            coverage_pct: Some(1.0),
            ..input(200.0)
        })
        .unwrap();
        let floor = estimate(&EstimateInput {
            coverage_pct: Some(10.0),
            ..input(200.0)
        })
        .unwrap();
        assert_eq!(low, floor);

        let over = estimate(&EstimateInput {
            coverage_pct: Some(250.0),
            ..input(200.0)
        })
        .unwrap();
        let cap = estimate(&input(200.0)).unwrap();
        assert_eq!(over, cap);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(estimate(&input(0.0)).is_err());
        assert!(estimate(&input(-5.0)).is_err());
        assert!(estimate(&input(f64::NAN)).is_err());
        assert!(estimate(&EstimateInput {
            utility_rate: Some(0.0),
            ..input(100.0)
        })
        .is_err());
        assert!(estimate(&EstimateInput {
            sun_hours_per_day: Some(13.0),
            ..input(100.0)
        })
        .is_err());
    }

    #[test]
    fn test_money_rounded_to_cents() {
        let result = estimate(&input(137.53)).unwrap();
        for value in [
            result.first_year_savings,
            result.gross_cost,
            result.federal_credit,
            result.net_cost,
            result.twenty_five_year_savings,
        ] {
            assert!((value * 100.0 - (value * 100.0).round()).abs() < 1e-6);
        }
    }
}
