//! Retention strategy generator.
//!
//! Maps a risk score and its attrition list to a discount, a priority
//! and an action line for the account team. Customers at or below the
//! lowest discount tier get no strategy record at all.

use crate::{
    attrition::ProductAttrition,
    config::{EngineConfig, StrategyConfig},
    metrics::CustomerMetrics,
    scoring::RiskScore,
    types::{CustomerId, ProductName},
    valuation::{value_customer, RetentionValuation},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Medium => "Medium",
            Priority::High   => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionStrategy {
    pub customer_id:     CustomerId,
    pub composite_score: f64,
    pub priority:        Priority,
    pub discount_pct:    u32,
    /// Same order as the attrition list (biggest loss first).
    pub target_products: Vec<ProductName>,
    pub action_text:     String,
    pub valuation:       RetentionValuation,
}

/// Discount earned by a composite score, or `None` below every tier.
pub fn discount_for(score: f64, config: &StrategyConfig) -> Option<u32> {
    config
        .discount_tiers
        .iter()
        .find(|tier| score > tier.above_score)
        .map(|tier| tier.discount_pct)
}

pub fn priority_for(score: f64, config: &StrategyConfig) -> Priority {
    if score > config.urgent_above {
        Priority::Urgent
    } else if score > config.high_above {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Build the strategy for one scored customer, if it clears the
/// emission threshold.
pub fn generate_strategy(
    score: &RiskScore,
    attrition: &[ProductAttrition],
    metrics: &CustomerMetrics,
    config: &EngineConfig,
) -> Option<RetentionStrategy> {
    let discount_pct = discount_for(score.composite_score, &config.strategy)?;
    let priority = priority_for(score.composite_score, &config.strategy);
    let target_products: Vec<ProductName> =
        attrition.iter().map(|a| a.product.clone()).collect();
    let action_text = action_text(priority, discount_pct, &target_products);
    let valuation = value_customer(metrics, discount_pct, &config.valuation);

    log::debug!(
        "strategy: {} priority={priority} discount={discount_pct}% products={}",
        score.customer_id,
        target_products.len(),
    );

    Some(RetentionStrategy {
        customer_id: score.customer_id.clone(),
        composite_score: score.composite_score,
        priority,
        discount_pct,
        target_products,
        action_text,
        valuation,
    })
}

pub fn action_text(priority: Priority, discount_pct: u32, products: &[ProductName]) -> String {
    let target = if products.is_empty() {
        "overall spending".to_string()
    } else {
        products.join(", ")
    };
    format!("{priority} priority: proactive outreach with a {discount_pct}% discount on {target}")
}
