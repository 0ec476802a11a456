//! Risk scorer — turns customer metrics into a 0–100 composite score.
//!
//! Each raw signal is scaled into a 0–100 sub-score against a fixed
//! reference point from `NormalizationConfig`, then the four sub-scores
//! are combined with the configured weights:
//!
//!   composite = w_trend·trend + w_decline·decline
//!             + w_inactivity·inactivity + w_volatility·volatility
//!
//! The composite is rounded to one decimal and bucketed into a level.

use crate::{
    config::{EngineConfig, RiskLevelThresholds},
    metrics::CustomerMetrics,
    types::CustomerId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a composite score. Lower band edges are inclusive.
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Medium and High customers are flagged for attrition analysis.
    pub fn is_flagged(&self) -> bool {
        matches!(self, RiskLevel::Medium | RiskLevel::High)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low    => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High   => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub customer_id:     CustomerId,
    pub trend_risk:      f64,
    pub decline_risk:    f64,
    pub inactivity_risk: f64,
    pub volatility_risk: f64,
    pub composite_score: f64,
    pub risk_level:      RiskLevel,
}

// ── Scorer ───────────────────────────────────────────────────────────────────

/// Score one customer. Expects `config` to have passed `validate()`.
pub fn score_customer(metrics: &CustomerMetrics, config: &EngineConfig) -> RiskScore {
    let norm = &config.normalization;

    let trend_risk = if metrics.average_monthly_spend > 0.0 {
        let relative_slope = metrics.trend_slope / metrics.average_monthly_spend;
        scale_to_risk(-relative_slope, norm.trend_full_risk_slope)
    } else {
        0.0
    };

    let decline_risk = metrics
        .pct_decline
        .map(|pct| scale_to_risk(pct, norm.decline_floor))
        .unwrap_or(0.0);

    let inactivity_risk = if metrics.total_months > 0 {
        let ratio = metrics.zero_spend_months as f64 / metrics.total_months as f64;
        scale_to_risk(ratio, norm.inactivity_full_risk_ratio)
    } else {
        0.0
    };

    let volatility_risk = scale_to_risk(metrics.volatility, norm.volatility_ceiling);

    let composite_score = composite(
        trend_risk,
        decline_risk,
        inactivity_risk,
        volatility_risk,
        config,
    );
    let risk_level = RiskLevel::from_score(composite_score, &config.levels);

    log::debug!(
        "score: {} trend={trend_risk:.1} decline={decline_risk:.1} \
         inactivity={inactivity_risk:.1} volatility={volatility_risk:.1} \
         composite={composite_score:.1} level={risk_level}",
        metrics.customer_id,
    );

    RiskScore {
        customer_id: metrics.customer_id.clone(),
        trend_risk,
        decline_risk,
        inactivity_risk,
        volatility_risk,
        composite_score,
        risk_level,
    }
}

/// Weighted sum of sub-scores, clamped to [0, 100] and rounded to 0.1.
pub fn composite(
    trend_risk: f64,
    decline_risk: f64,
    inactivity_risk: f64,
    volatility_risk: f64,
    config: &EngineConfig,
) -> f64 {
    let w = &config.weights;
    let raw = w.trend * clamp_risk(trend_risk)
        + w.decline * clamp_risk(decline_risk)
        + w.inactivity * clamp_risk(inactivity_risk)
        + w.volatility * clamp_risk(volatility_risk);
    round_one_decimal(clamp_risk(raw))
}

/// Map `value` linearly so that 0 → 0 and `full_risk_at` → 100, clamped.
///
/// `full_risk_at` may be negative (e.g. a decline floor), in which case
/// values on the positive side map to 0.
pub fn scale_to_risk(value: f64, full_risk_at: f64) -> f64 {
    if !value.is_finite() || !full_risk_at.is_finite() || full_risk_at == 0.0 {
        return 0.0;
    }
    clamp_risk(value / full_risk_at * 100.0)
}

fn clamp_risk(value: f64) -> f64 {
    if value.is_finite() { value.clamp(0.0, 100.0) } else { 0.0 }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
