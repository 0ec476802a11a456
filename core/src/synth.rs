//! Synthetic B2B ledger generation.
//!
//! Produces the same record shape the engine consumes: one purchase per
//! customer, product and month. A random share of customers start
//! shrinking their orders from a common churn month onwards, so a
//! generated ledger always contains a mix of stable and churning
//! accounts.

use crate::{
    ledger::{Ledger, Transaction},
    rng::LedgerRng,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const PRODUCTS: [&str; 5] = [
    "Chicken Dips",
    "Cheese Dips",
    "Drinks",
    "Sauces",
    "Frozen Items",
];

const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    pub customers:   usize,
    pub months:      u32,
    /// Share of customers whose orders decline after the churn month.
    pub churn_share: f64,
    pub seed:        u64,
    pub start_date:  NaiveDate,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            customers:   50,
            months:      12,
            churn_share: 0.3,
            seed:        42,
            start_date:  NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
        }
    }
}

/// A generated ledger plus the ids that were made to churn.
#[derive(Debug, Clone)]
pub struct SynthLedger {
    pub transactions: Vec<Transaction>,
    pub churning:     Vec<String>,
    /// Zero-based month from which churning customers shrink.
    pub churn_start:  u32,
}

impl SynthLedger {
    pub fn into_ledger(self) -> Ledger {
        Ledger::from_transactions(self.transactions)
    }
}

pub fn customer_id(index: usize) -> String {
    format!("Customer_{index:03}")
}

pub fn generate(config: &SynthConfig) -> SynthLedger {
    let mut rng = LedgerRng::new(config.seed);

    // Baseline monthly quantity per customer and product.
    let baselines: Vec<Vec<i64>> = (0..config.customers)
        .map(|_| PRODUCTS.iter().map(|_| rng.range_i64(5, 50)).collect())
        .collect();

    let churn_count = (config.churn_share.clamp(0.0, 1.0) * config.customers as f64) as usize;
    let churning_idx = rng.sample_indices(config.customers, churn_count);
    let churn_start = rng.range_i64(6, 11) as u32;

    let mut transactions =
        Vec::with_capacity(config.customers * PRODUCTS.len() * config.months as usize);

    for month in 0..config.months {
        let date = config.start_date + Duration::days(DAYS_PER_MONTH * month as i64);

        for (c, baseline) in baselines.iter().enumerate() {
            let churning = churning_idx.binary_search(&c).is_ok();

            for (p, product) in PRODUCTS.iter().enumerate() {
                let mut qty = (baseline[p] + rng.range_i64(-5, 5)) as f64;

                if churning && month >= churn_start {
                    let progress =
                        (month - churn_start) as f64 / (config.months - churn_start) as f64;
                    let reduction = 1.0 - progress * rng.uniform(0.3, 0.8);
                    qty = (qty * reduction).trunc();
                }

                let qty = qty.max(0.0);
                let price = round_pennies(rng.uniform(5.0, 50.0));

                transactions.push(Transaction {
                    date,
                    customer_id: customer_id(c),
                    product:     product.to_string(),
                    quantity:    qty,
                    unit_price:  price,
                    total_value: round_pennies(qty * price),
                    month:       month + 1,
                });
            }
        }
    }

    log::info!(
        "synth: {} transactions, {} customers, {} churning from month {}",
        transactions.len(),
        config.customers,
        churning_idx.len(),
        churn_start + 1,
    );

    SynthLedger {
        transactions,
        churning: churning_idx.into_iter().map(customer_id).collect(),
        churn_start,
    }
}

fn round_pennies(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
