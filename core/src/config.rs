//! Engine configuration.
//!
//! Every threshold, weight and table the engine uses lives here.
//! Nothing in the scoring path reads a module-level constant; callers
//! build an `EngineConfig` (or load one from JSON) and the engine
//! validates it once before a run.

use crate::error::{ChurnError, ChurnResult};
use serde::{Deserialize, Serialize};

/// Tolerance used when checking that the risk weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ── Risk weights ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub trend:      f64,
    pub decline:    f64,
    pub inactivity: f64,
    pub volatility: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            trend:      0.35,
            decline:    0.35,
            inactivity: 0.20,
            volatility: 0.10,
        }
    }
}

impl RiskWeights {
    pub fn sum(&self) -> f64 {
        self.trend + self.decline + self.inactivity + self.volatility
    }

    fn as_array(&self) -> [(&'static str, f64); 4] {
        [
            ("trend",      self.trend),
            ("decline",    self.decline),
            ("inactivity", self.inactivity),
            ("volatility", self.volatility),
        ]
    }

    /// Check the weights, optionally rescaling them so they sum to 1.0.
    ///
    /// Non-finite or negative weights are always rejected, as is a zero
    /// sum. A sum away from 1.0 is rejected unless `renormalize` is set.
    pub fn resolve(&self, renormalize: bool) -> ChurnResult<RiskWeights> {
        for (name, w) in self.as_array() {
            if !w.is_finite() {
                return Err(ChurnError::InvalidWeights {
                    reason: format!("{name} weight is not a finite number"),
                });
            }
            if w < 0.0 {
                return Err(ChurnError::InvalidWeights {
                    reason: format!("{name} weight {w} is negative"),
                });
            }
        }

        let sum = self.sum();
        if sum <= 0.0 {
            return Err(ChurnError::InvalidWeights {
                reason: "weights sum to zero".into(),
            });
        }

        if (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE {
            return Ok(*self);
        }

        if !renormalize {
            return Err(ChurnError::InvalidWeights {
                reason: format!("weights sum to {sum}, expected 1.0"),
            });
        }

        log::warn!("risk weights sum to {sum:.4}; renormalizing");
        Ok(RiskWeights {
            trend:      self.trend / sum,
            decline:    self.decline / sum,
            inactivity: self.inactivity / sum,
            volatility: self.volatility / sum,
        })
    }
}

// ── Sub-score normalization ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Monthly decline, as a fraction of average monthly spend,
    /// that maps to trend_risk = 100.
    pub trend_full_risk_slope:     f64,
    /// pct_decline at which decline_risk reaches 100 (negative).
    pub decline_floor:             f64,
    /// Share of zero-spend months at which inactivity_risk reaches 100.
    pub inactivity_full_risk_ratio: f64,
    /// Coefficient of variation at which volatility_risk reaches 100.
    pub volatility_ceiling:        f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            trend_full_risk_slope:      0.05,
            decline_floor:              -0.50,
            inactivity_full_risk_ratio: 0.50,
            volatility_ceiling:         1.0,
        }
    }
}

// ── Risk levels ──────────────────────────────────────────────────────────────

/// Lower edges of the risk bands (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLevelThresholds {
    pub high:   f64,
    pub medium: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self { high: 70.0, medium: 45.0 }
    }
}

// ── Product attrition ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttritionConfig {
    /// A product is reported when its pct_decline is at or below this value.
    pub decline_threshold: f64,
}

impl Default for AttritionConfig {
    fn default() -> Self {
        Self { decline_threshold: -0.10 }
    }
}

// ── Retention strategy ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountTier {
    /// Composite score must be strictly above this to earn the tier.
    pub above_score:  f64,
    pub discount_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Ordered from the highest threshold to the lowest.
    /// Scores at or below the last tier get no strategy at all.
    pub discount_tiers:   Vec<DiscountTier>,
    pub urgent_above:     f64,
    pub high_above:       f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            discount_tiers: vec![
                DiscountTier { above_score: 80.0, discount_pct: 20 },
                DiscountTier { above_score: 70.0, discount_pct: 15 },
                DiscountTier { above_score: 60.0, discount_pct: 12 },
                DiscountTier { above_score: 45.0, discount_pct: 8 },
            ],
            urgent_above: 70.0,
            high_above:   50.0,
        }
    }
}

impl StrategyConfig {
    /// Score a customer must exceed before any strategy is emitted.
    pub fn emission_threshold(&self) -> f64 {
        self.discount_tiers
            .last()
            .map(|t| t.above_score)
            .unwrap_or(f64::INFINITY)
    }
}

// ── Valuation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    pub horizon_years: u32,
    pub discount_rate: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self { horizon_years: 5, discount_rate: 0.10 }
    }
}

// ── Top-level config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length K of the recent window, in months.
    pub window_months:       usize,
    /// Distinct months with spend required before a customer is scored.
    pub min_active_months:   usize,
    pub weights:             RiskWeights,
    pub renormalize_weights: bool,
    pub normalization:       NormalizationConfig,
    pub levels:              RiskLevelThresholds,
    pub attrition:           AttritionConfig,
    pub strategy:            StrategyConfig,
    pub valuation:           ValuationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_months:       6,
            min_active_months:   2,
            weights:             RiskWeights::default(),
            renormalize_weights: false,
            normalization:       NormalizationConfig::default(),
            levels:              RiskLevelThresholds::default(),
            attrition:           AttritionConfig::default(),
            strategy:            StrategyConfig::default(),
            valuation:           ValuationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    pub fn load(path: &str) -> ChurnResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut value: serde_json::Value = serde_json::from_str(&content)?;

        // Weights are parsed on their own so a bad entry reports as InvalidWeights.
        let weights = value
            .as_object_mut()
            .and_then(|section| section.remove("weights"))
            .map(|w| {
                serde_json::from_value::<RiskWeights>(w)
                    .map_err(|e| ChurnError::InvalidWeights { reason: e.to_string() })
            })
            .transpose()?;

        let mut config: EngineConfig = serde_json::from_value(value)?;
        if let Some(weights) = weights {
            config.weights = weights;
        }
        Ok(config)
    }

    /// Validate every section and return a copy with resolved weights.
    pub fn validate(&self) -> ChurnResult<EngineConfig> {
        let weights = self.weights.resolve(self.renormalize_weights)?;

        if self.window_months == 0 {
            return Err(invalid("window_months must be at least 1"));
        }
        if self.min_active_months == 0 {
            return Err(invalid("min_active_months must be at least 1"));
        }

        let n = &self.normalization;
        if !(n.trend_full_risk_slope.is_finite() && n.trend_full_risk_slope > 0.0) {
            return Err(invalid("trend_full_risk_slope must be positive"));
        }
        if !(n.decline_floor.is_finite() && n.decline_floor < 0.0) {
            return Err(invalid("decline_floor must be negative"));
        }
        if !(n.inactivity_full_risk_ratio.is_finite() && n.inactivity_full_risk_ratio > 0.0) {
            return Err(invalid("inactivity_full_risk_ratio must be positive"));
        }
        if !(n.volatility_ceiling.is_finite() && n.volatility_ceiling > 0.0) {
            return Err(invalid("volatility_ceiling must be positive"));
        }

        let l = &self.levels;
        if !(0.0..=100.0).contains(&l.medium) || !(0.0..=100.0).contains(&l.high) {
            return Err(invalid("risk level thresholds must lie in [0, 100]"));
        }
        if l.medium >= l.high {
            return Err(invalid("medium threshold must be below high threshold"));
        }

        if !(self.attrition.decline_threshold.is_finite()
            && self.attrition.decline_threshold < 0.0)
        {
            return Err(invalid("attrition decline_threshold must be negative"));
        }

        let s = &self.strategy;
        if s.discount_tiers.is_empty() {
            return Err(invalid("discount table is empty"));
        }
        for pair in s.discount_tiers.windows(2) {
            if pair[0].above_score <= pair[1].above_score {
                return Err(invalid("discount tiers must be ordered by descending score"));
            }
            if pair[0].discount_pct < pair[1].discount_pct {
                return Err(invalid("discount must not decrease as score rises"));
            }
        }
        if s.high_above > s.urgent_above {
            return Err(invalid("high priority threshold must not exceed urgent"));
        }

        let v = &self.valuation;
        if !(v.discount_rate.is_finite() && v.discount_rate > -1.0) {
            return Err(invalid("valuation discount_rate must be greater than -1"));
        }

        Ok(EngineConfig { weights, ..self.clone() })
    }
}

fn invalid(reason: &str) -> ChurnError {
    ChurnError::InvalidConfig { reason: reason.to_string() }
}
