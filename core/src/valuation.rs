//! Customer lifetime value and retention economics.
//!
//! CLV is a discounted sum of projected annual spend, grown at the
//! customer's annualised trend:
//!
//!   clv = Σ_{y=0}^{H−1} annual · (1+g)^y / (1+r)^y
//!
//! The discount cost of a retention offer is compared against CLV to
//! give a simple ROI figure.

use crate::{config::ValuationConfig, metrics::CustomerMetrics};
use serde::{Deserialize, Serialize};

const MIN_GROWTH_RATE: f64 = -0.95;
const MAX_GROWTH_RATE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionValuation {
    pub annual_spend:      f64,
    pub growth_rate:       f64,
    pub clv:               f64,
    pub revenue_at_risk:   f64,
    pub discount_cost:     f64,
    pub retention_roi_pct: f64,
}

pub fn value_customer(
    metrics: &CustomerMetrics,
    discount_pct: u32,
    config: &ValuationConfig,
) -> RetentionValuation {
    let annual_spend = metrics.average_monthly_spend * 12.0;
    let growth_rate = annual_growth_rate(metrics);
    let clv = lifetime_value(annual_spend, growth_rate, config);
    let discount_cost = annual_spend * discount_pct as f64 / 100.0;
    let retention_roi_pct = (clv - discount_cost) / discount_cost.max(1.0) * 100.0;

    RetentionValuation {
        annual_spend,
        growth_rate,
        clv,
        revenue_at_risk: clv,
        discount_cost,
        retention_roi_pct,
    }
}

/// Trend slope as a fraction of average spend, annualised and clamped.
pub fn annual_growth_rate(metrics: &CustomerMetrics) -> f64 {
    if metrics.average_monthly_spend <= 0.0 {
        return 0.0;
    }
    let g = metrics.trend_slope / metrics.average_monthly_spend * 12.0;
    if g.is_finite() {
        g.clamp(MIN_GROWTH_RATE, MAX_GROWTH_RATE)
    } else {
        0.0
    }
}

pub fn lifetime_value(annual_spend: f64, growth_rate: f64, config: &ValuationConfig) -> f64 {
    let growth = 1.0 + growth_rate;
    let discount = 1.0 + config.discount_rate;
    let clv: f64 = (0..config.horizon_years)
        .map(|year| {
            let y = year as i32;
            annual_spend * growth.powi(y) / discount.powi(y)
        })
        .sum();
    clv.max(0.0)
}
