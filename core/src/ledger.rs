//! The transaction ledger — the engine's only input.
//!
//! Raw records arrive with every field optional. `Ledger::from_raw`
//! validates them once, skips (and counts) malformed records, and
//! indexes the survivors by customer so each customer's slice can be
//! analysed independently.
//!
//! total_value policy: a stored, finite, non-negative total_value is
//! trusted as-is. A missing one is computed as quantity × unit_price.
//!
//! Months are 1-based period indices and may not exceed `MAX_MONTH`.

use crate::{
    error::{ChurnError, ChurnResult},
    types::{CustomerId, Month, ProductName},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest accepted month index (100 years of monthly periods).
pub const MAX_MONTH: Month = 1200;

// ── Records ──────────────────────────────────────────────────────────────────

/// A purchase record exactly as supplied by the data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub date:        Option<NaiveDate>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub product:     Option<String>,
    #[serde(default)]
    pub quantity:    Option<f64>,
    #[serde(default)]
    pub unit_price:  Option<f64>,
    #[serde(default)]
    pub total_value: Option<f64>,
    #[serde(default)]
    pub month:       Option<Month>,
}

/// A validated purchase record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date:        NaiveDate,
    pub customer_id: CustomerId,
    pub product:     ProductName,
    pub quantity:    f64,
    pub unit_price:  f64,
    pub total_value: f64,
    pub month:       Month,
}

impl From<Transaction> for RawTransaction {
    fn from(t: Transaction) -> Self {
        RawTransaction {
            date:        Some(t.date),
            customer_id: Some(t.customer_id),
            product:     Some(t.product),
            quantity:    Some(t.quantity),
            unit_price:  Some(t.unit_price),
            total_value: Some(t.total_value),
            month:       Some(t.month),
        }
    }
}

impl RawTransaction {
    /// Validate into a `Transaction`. `index` is only used for the error.
    pub fn validate(self, index: usize) -> ChurnResult<Transaction> {
        let malformed = |reason: &str| ChurnError::MalformedTransaction {
            index,
            reason: reason.to_string(),
        };

        let date = self.date.ok_or_else(|| malformed("missing date"))?;
        let customer_id = self
            .customer_id
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| malformed("missing customer_id"))?;
        let product = self
            .product
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| malformed("missing product"))?;
        let month = self.month.ok_or_else(|| malformed("missing month"))?;
        if month == 0 || month > MAX_MONTH {
            return Err(malformed(&format!("month must lie between 1 and {MAX_MONTH}")));
        }

        let quantity = self.quantity.ok_or_else(|| malformed("missing quantity"))?;
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(malformed("quantity must be a non-negative number"));
        }
        let unit_price = self.unit_price.ok_or_else(|| malformed("missing unit_price"))?;
        if !unit_price.is_finite() || unit_price < 0.0 {
            return Err(malformed("unit_price must be a non-negative number"));
        }

        let total_value = match self.total_value {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            Some(_) => return Err(malformed("total_value must be a non-negative number")),
            None => quantity * unit_price,
        };

        Ok(Transaction {
            date,
            customer_id,
            product,
            quantity,
            unit_price,
            total_value,
            month,
        })
    }
}

// ── Ledger ───────────────────────────────────────────────────────────────────

/// An immutable, validated transaction set indexed by customer.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    by_customer:     BTreeMap<CustomerId, Vec<Transaction>>,
    first_month:     Option<Month>,
    last_month:      Option<Month>,
    skipped_records: usize,
}

impl Ledger {
    /// Build a ledger from raw records, skipping malformed ones.
    pub fn from_raw<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RawTransaction>,
    {
        Self::from_parsed(records.into_iter().map(Ok))
    }

    /// Records that failed to parse arrive as `Err` and are counted
    /// alongside the ones that fail validation.
    fn from_parsed<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ChurnResult<RawTransaction>>,
    {
        let mut ledger = Ledger::default();

        for (index, raw) in records.into_iter().enumerate() {
            match raw.and_then(|r| r.validate(index)) {
                Ok(txn) => ledger.push(txn),
                Err(e) => {
                    log::warn!("ledger: skipping record: {e}");
                    ledger.skipped_records += 1;
                }
            }
        }

        // Stable chronological order inside each customer's slice.
        for txns in ledger.by_customer.values_mut() {
            txns.sort_by(|a, b| {
                a.month
                    .cmp(&b.month)
                    .then(a.date.cmp(&b.date))
                    .then(a.product.cmp(&b.product))
            });
        }

        log::debug!(
            "ledger: {} customers, {} records skipped",
            ledger.by_customer.len(),
            ledger.skipped_records,
        );
        ledger
    }

    /// Build a ledger from already-validated transactions.
    pub fn from_transactions<I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = Transaction>,
    {
        Self::from_raw(transactions.into_iter().map(RawTransaction::from))
    }

    /// Load a JSON array of raw records from disk.
    ///
    /// The file itself must hold a JSON array. A record whose fields have
    /// the wrong type is skipped like any other malformed record.
    pub fn load_json(path: &str) -> ChurnResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let values: Vec<serde_json::Value> = serde_json::from_str(&content)?;

        let records = values.into_iter().enumerate().map(|(index, value)| {
            serde_json::from_value::<RawTransaction>(value).map_err(|e| {
                ChurnError::MalformedTransaction { index, reason: e.to_string() }
            })
        });
        Ok(Self::from_parsed(records))
    }

    fn push(&mut self, txn: Transaction) {
        self.first_month = Some(self.first_month.map_or(txn.month, |m| m.min(txn.month)));
        self.last_month = Some(self.last_month.map_or(txn.month, |m| m.max(txn.month)));
        self.by_customer
            .entry(txn.customer_id.clone())
            .or_default()
            .push(txn);
    }

    /// Inclusive month range observed across the whole ledger.
    pub fn month_range(&self) -> Option<(Month, Month)> {
        self.first_month.zip(self.last_month)
    }

    /// Number of months in the observed range (0 for an empty ledger).
    pub fn month_count(&self) -> usize {
        self.month_range()
            .map(|(first, last)| (last - first + 1) as usize)
            .unwrap_or(0)
    }

    /// Customer ids in ascending order.
    pub fn customer_ids(&self) -> impl Iterator<Item = &CustomerId> {
        self.by_customer.keys()
    }

    /// One customer's transactions, ordered by month then date.
    /// Empty when the customer never appears.
    pub fn for_customer(&self, customer_id: &str) -> &[Transaction] {
        self.by_customer
            .get(customer_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn customer_count(&self) -> usize {
        self.by_customer.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.by_customer.values().map(Vec::len).sum()
    }

    /// Records dropped as malformed while building the ledger.
    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }

    pub fn is_empty(&self) -> bool {
        self.by_customer.is_empty()
    }
}
