//! Metrics calculator — per-customer spend statistics.
//!
//! For one customer this module:
//!   1. Builds a monthly spend series over the ledger's full month range
//!      (months without purchases are explicit zeros)
//!   2. Fits an OLS trend line through the series
//!   3. Measures volatility as a coefficient of variation
//!   4. Compares the recent window against the window before it
//!   5. Counts zero-spend months and derives the purchase cadence
//!
//! Pure functions only: the same ledger always yields the same metrics.

use crate::{
    config::EngineConfig,
    error::{ChurnError, ChurnResult},
    ledger::{Ledger, Transaction},
    types::CustomerId,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::ops::Range;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetrics {
    pub customer_id:            CustomerId,
    /// Spend per month, first ledger month first.
    pub monthly_spend:          Vec<f64>,
    pub total_months:           usize,
    pub active_months:          usize,
    pub average_monthly_spend:  f64,
    /// OLS slope of spend against month index, in currency per month.
    pub trend_slope:            f64,
    /// Population standard deviation divided by the mean.
    pub volatility:             f64,
    pub recent_avg:             f64,
    /// Absent when the series is no longer than the recent window.
    pub historical_avg:         Option<f64>,
    /// (recent − historical) / historical; absent without a non-zero baseline.
    pub pct_decline:            Option<f64>,
    pub zero_spend_months:      usize,
    pub first_month_spend:      f64,
    pub latest_month_spend:     f64,
    pub last_purchase_date:     NaiveDate,
    /// Median gap between distinct purchase dates, in days.
    pub purchase_cycle_days:    Option<i64>,
    pub next_expected_purchase: Option<NaiveDate>,
}

/// Index ranges of the recent and historical windows within a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSplit {
    pub recent:     Range<usize>,
    pub historical: Option<Range<usize>>,
}

// ── Calculator ───────────────────────────────────────────────────────────────

/// Compute metrics for one customer.
///
/// Fails with `InsufficientData` when the customer has spend in fewer
/// than `config.min_active_months` distinct months (including never
/// appearing in the ledger at all).
pub fn compute_metrics(
    ledger: &Ledger,
    customer_id: &str,
    config: &EngineConfig,
) -> ChurnResult<CustomerMetrics> {
    let txns = ledger.for_customer(customer_id);
    let insufficient = || ChurnError::InsufficientData {
        customer_id: customer_id.to_string(),
    };

    let (first_month, last_month) = ledger.month_range().ok_or_else(insufficient)?;
    if txns.is_empty() {
        return Err(insufficient());
    }

    let series = monthly_series(txns, first_month, last_month);
    let active_months = series.iter().filter(|v| **v > 0.0).count();
    if active_months < config.min_active_months {
        return Err(insufficient());
    }

    let total_months = series.len();
    let average_monthly_spend = mean(&series);
    let trend_slope = ols_slope(&series);
    let volatility = coefficient_of_variation(&series);
    let zero_spend_months = total_months - active_months;

    let split = split_windows(total_months, config.window_months);
    let recent_avg = mean(&series[split.recent.clone()]);
    let historical_avg = split.historical.as_ref().map(|r| mean(&series[r.clone()]));
    let pct_decline = historical_avg
        .filter(|h| *h > 0.0)
        .map(|h| (recent_avg - h) / h);

    let mut dates: Vec<NaiveDate> = txns.iter().map(|t| t.date).collect();
    dates.sort();
    dates.dedup();
    // txns is non-empty, so dates is too.
    let last_purchase_date = dates[dates.len() - 1];
    let purchase_cycle_days = median_gap_days(&dates);
    let next_expected_purchase =
        purchase_cycle_days.map(|d| last_purchase_date + Duration::days(d));

    Ok(CustomerMetrics {
        customer_id: customer_id.to_string(),
        first_month_spend: series[0],
        latest_month_spend: series[total_months - 1],
        monthly_spend: series,
        total_months,
        active_months,
        average_monthly_spend,
        trend_slope,
        volatility,
        recent_avg,
        historical_avg,
        pct_decline,
        zero_spend_months,
        last_purchase_date,
        purchase_cycle_days,
        next_expected_purchase,
    })
}

/// Sum of total_value per month across `first..=last`. Missing months are 0.
pub fn monthly_series(txns: &[Transaction], first: u32, last: u32) -> Vec<f64> {
    let len = (last.saturating_sub(first) + 1) as usize;
    let mut series = vec![0.0; len];
    for t in txns {
        if t.month < first || t.month > last {
            continue;
        }
        series[(t.month - first) as usize] += t.total_value;
    }
    series
}

/// Split a series of `len` months into the last `window` months and the
/// up-to-`window` months before them.
pub fn split_windows(len: usize, window: usize) -> WindowSplit {
    let window = window.max(1);
    if len <= window {
        return WindowSplit { recent: 0..len, historical: None };
    }
    let recent_start = len - window;
    let historical_start = recent_start.saturating_sub(window);
    WindowSplit {
        recent:     recent_start..len,
        historical: Some(historical_start..recent_start),
    }
}

// ── Statistics ───────────────────────────────────────────────────────────────

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Least-squares slope of `values` against 0, 1, 2, …
///
/// Fewer than two points, or a degenerate fit, yields 0.
pub fn ols_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }

    let slope = sxy / sxx;
    if slope.is_finite() { slope } else { 0.0 }
}

/// Population standard deviation over the mean. A zero mean yields 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    let cv = variance.sqrt() / m;
    if cv.is_finite() { cv } else { 0.0 }
}

/// Median gap in whole days between consecutive sorted, distinct dates.
fn median_gap_days(dates: &[NaiveDate]) -> Option<i64> {
    let mut gaps: Vec<i64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .filter(|d| *d > 0)
        .collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_unstable();
    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) / 2
    } else {
        gaps[mid]
    };
    Some(median)
}
