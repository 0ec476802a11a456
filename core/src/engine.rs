//! The churn engine — one batch run over a ledger.
//!
//! PIPELINE (per customer, in customer_id order):
//!   1. Metrics calculator
//!   2. Risk scorer
//!   3. Product attrition detector   (Medium / High only)
//!   4. Strategy generator           (above the lowest discount tier only)
//!
//! RULES:
//!   - Customers are independent; no output depends on another customer.
//!   - Every output map is keyed by customer_id in ascending order.
//!   - Customers without enough data are excluded from all four maps
//!     and listed in the run summary.
//!   - The engine does no I/O.

use crate::{
    attrition::{detect_product_attrition, ProductAttrition},
    config::EngineConfig,
    error::{ChurnError, ChurnResult},
    ledger::Ledger,
    metrics::{compute_metrics, CustomerMetrics},
    scoring::{score_customer, RiskLevel, RiskScore},
    strategy::{generate_strategy, RetentionStrategy},
    types::CustomerId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Run output ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub customers_seen:        usize,
    pub customers_scored:      usize,
    /// Customers dropped with `InsufficientData`, ascending.
    pub excluded_customers:    Vec<CustomerId>,
    /// Ledger records dropped as malformed.
    pub skipped_records:       usize,
    pub low_risk_count:        usize,
    pub medium_risk_count:     usize,
    pub high_risk_count:       usize,
    pub avg_risk_score:        f64,
    pub strategies_emitted:    usize,
    pub total_revenue_at_risk: f64,
    pub total_discount_cost:   f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub metrics:    BTreeMap<CustomerId, CustomerMetrics>,
    pub scores:     BTreeMap<CustomerId, RiskScore>,
    pub attrition:  BTreeMap<CustomerId, Vec<ProductAttrition>>,
    pub strategies: BTreeMap<CustomerId, RetentionStrategy>,
    pub summary:    RunSummary,
}

impl RunOutput {
    /// Strategies ordered by composite score, highest first.
    pub fn strategies_by_score(&self) -> Vec<&RetentionStrategy> {
        let mut out: Vec<_> = self.strategies.values().collect();
        out.sort_by(|a, b| {
            b.composite_score
                .total_cmp(&a.composite_score)
                .then_with(|| a.customer_id.cmp(&b.customer_id))
        });
        out
    }

    /// Scores at the given level, in customer_id order.
    pub fn scores_at(&self, level: RiskLevel) -> impl Iterator<Item = &RiskScore> {
        self.scores.values().filter(move |s| s.risk_level == level)
    }
}

/// Everything one customer contributes to a run.
#[derive(Debug, Clone)]
pub struct CustomerOutcome {
    pub metrics:   CustomerMetrics,
    pub score:     RiskScore,
    pub attrition: Option<Vec<ProductAttrition>>,
    pub strategy:  Option<RetentionStrategy>,
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct ChurnEngine {
    config: EngineConfig,
}

impl ChurnEngine {
    /// Validate the configuration and build an engine.
    /// Fails with `InvalidWeights` or `InvalidConfig`.
    pub fn new(config: EngineConfig) -> ChurnResult<Self> {
        let config = config.validate()?;
        Ok(Self { config })
    }

    /// Engine with the documented default configuration.
    pub fn with_defaults() -> ChurnResult<Self> {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full pipeline for one customer.
    pub fn analyse_customer(
        &self,
        ledger: &Ledger,
        customer_id: &str,
    ) -> ChurnResult<CustomerOutcome> {
        let metrics = compute_metrics(ledger, customer_id, &self.config)?;
        let score = score_customer(&metrics, &self.config);

        let attrition = score
            .risk_level
            .is_flagged()
            .then(|| detect_product_attrition(ledger, &score, &self.config));

        let strategy = attrition
            .as_deref()
            .and_then(|products| generate_strategy(&score, products, &metrics, &self.config));

        Ok(CustomerOutcome { metrics, score, attrition, strategy })
    }

    /// Score every customer in the ledger.
    pub fn run(&self, ledger: &Ledger) -> ChurnResult<RunOutput> {
        let mut out = RunOutput::default();
        out.summary.customers_seen = ledger.customer_count();
        out.summary.skipped_records = ledger.skipped_records();

        for customer_id in ledger.customer_ids() {
            let outcome = match self.analyse_customer(ledger, customer_id) {
                Ok(o) => o,
                Err(ChurnError::InsufficientData { customer_id }) => {
                    log::warn!("engine: {customer_id} excluded (insufficient data)");
                    out.summary.excluded_customers.push(customer_id);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let id = customer_id.clone();
            match outcome.score.risk_level {
                RiskLevel::Low    => out.summary.low_risk_count += 1,
                RiskLevel::Medium => out.summary.medium_risk_count += 1,
                RiskLevel::High   => out.summary.high_risk_count += 1,
            }
            if let Some(attrition) = outcome.attrition {
                out.attrition.insert(id.clone(), attrition);
            }
            if let Some(strategy) = outcome.strategy {
                out.summary.total_revenue_at_risk += strategy.valuation.revenue_at_risk;
                out.summary.total_discount_cost += strategy.valuation.discount_cost;
                out.strategies.insert(id.clone(), strategy);
            }
            out.metrics.insert(id.clone(), outcome.metrics);
            out.scores.insert(id, outcome.score);
        }

        let scored = out.scores.len();
        out.summary.customers_scored = scored;
        out.summary.strategies_emitted = out.strategies.len();
        out.summary.avg_risk_score = if scored > 0 {
            out.scores.values().map(|s| s.composite_score).sum::<f64>() / scored as f64
        } else {
            0.0
        };

        log::info!(
            "engine: scored {scored} of {} customers ({} high, {} medium), \
             {} strategies, {} excluded, {} records skipped",
            out.summary.customers_seen,
            out.summary.high_risk_count,
            out.summary.medium_risk_count,
            out.summary.strategies_emitted,
            out.summary.excluded_customers.len(),
            out.summary.skipped_records,
        );

        Ok(out)
    }
}
