//! Product attrition detector.
//!
//! For a customer already flagged Medium or High, compare each
//! product's average monthly quantity in the recent window against the
//! historical window (same split as the spend metrics) and report the
//! products that fell by at least the configured threshold.
//!
//! Products without a historical baseline are never reported.

use crate::{
    config::EngineConfig,
    ledger::Ledger,
    metrics::{mean, split_windows},
    scoring::RiskScore,
    types::{CustomerId, ProductName},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAttrition {
    pub customer_id:       CustomerId,
    pub product:           ProductName,
    /// Average monthly quantity over the recent window.
    pub recent_qty:        f64,
    /// Average monthly quantity over the historical window.
    pub historical_qty:    f64,
    pub pct_decline:       f64,
    /// Quantity bought in the ledger's final month.
    pub latest_month_qty:  f64,
}

/// Products the customer is buying less of, biggest loss first.
///
/// Low-risk customers are not analysed and always get an empty list.
pub fn detect_product_attrition(
    ledger: &Ledger,
    score: &RiskScore,
    config: &EngineConfig,
) -> Vec<ProductAttrition> {
    if !score.risk_level.is_flagged() {
        log::debug!(
            "attrition: {} is {}, not analysed",
            score.customer_id, score.risk_level,
        );
        return Vec::new();
    }

    let Some((first, last)) = ledger.month_range() else {
        return Vec::new();
    };
    let len = (last - first + 1) as usize;
    let split = split_windows(len, config.window_months);
    let Some(historical) = split.historical else {
        return Vec::new();
    };

    // product → monthly quantity series
    let mut by_product: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for t in ledger.for_customer(&score.customer_id) {
        let series = by_product
            .entry(t.product.as_str())
            .or_insert_with(|| vec![0.0; len]);
        series[(t.month - first) as usize] += t.quantity;
    }

    let threshold = config.attrition.decline_threshold;
    let mut out: Vec<ProductAttrition> = by_product
        .into_iter()
        .filter_map(|(product, series)| {
            let historical_qty = mean(&series[historical.clone()]);
            if historical_qty <= 0.0 {
                return None;
            }
            let recent_qty = mean(&series[split.recent.clone()]);
            let pct_decline = (recent_qty - historical_qty) / historical_qty;
            if pct_decline > threshold {
                return None;
            }
            Some(ProductAttrition {
                customer_id: score.customer_id.clone(),
                product: product.to_string(),
                recent_qty,
                historical_qty,
                pct_decline,
                latest_month_qty: series[len - 1],
            })
        })
        .collect();

    out.sort_by(|a, b| {
        a.pct_decline
            .total_cmp(&b.pct_decline)
            .then_with(|| a.product.cmp(&b.product))
    });

    log::debug!(
        "attrition: {} has {} declining products",
        score.customer_id,
        out.len(),
    );
    out
}
