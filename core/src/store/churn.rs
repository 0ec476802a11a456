use super::ChurnStore;
use crate::{
    attrition::ProductAttrition,
    engine::RunOutput,
    error::ChurnResult,
    scoring::{RiskLevel, RiskScore},
    strategy::Priority,
};
use rusqlite::{params, OptionalExtension};

/// A retention strategy row as read back from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredStrategy {
    pub customer_id:     String,
    pub composite_score: f64,
    pub priority:        Priority,
    pub discount_pct:    u32,
    pub target_products: Vec<String>,
    pub action_text:     String,
    pub clv:             f64,
}

impl ChurnStore {
    // ── Run output ─────────────────────────────────────────────

    /// Persist all four output maps and the summary in one transaction.
    pub fn save_run_output(&self, run_id: &str, output: &RunOutput) -> ChurnResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        for m in output.metrics.values() {
            tx.execute(
                "INSERT INTO customer_metrics (
                    run_id, customer_id, average_monthly_spend, trend_slope,
                    volatility, recent_avg, historical_avg, pct_decline,
                    zero_spend_months, total_months, last_purchase_date,
                    purchase_cycle_days
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
                params![
                    run_id,
                    m.customer_id,
                    m.average_monthly_spend,
                    m.trend_slope,
                    m.volatility,
                    m.recent_avg,
                    m.historical_avg,
                    m.pct_decline,
                    m.zero_spend_months as i64,
                    m.total_months as i64,
                    m.last_purchase_date.to_string(),
                    m.purchase_cycle_days,
                ],
            )?;
        }

        for s in output.scores.values() {
            tx.execute(
                "INSERT INTO risk_score (
                    run_id, customer_id, trend_risk, decline_risk,
                    inactivity_risk, volatility_risk, composite_score, risk_level
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                params![
                    run_id,
                    s.customer_id,
                    s.trend_risk,
                    s.decline_risk,
                    s.inactivity_risk,
                    s.volatility_risk,
                    s.composite_score,
                    s.risk_level.as_str(),
                ],
            )?;
        }

        for products in output.attrition.values() {
            for (position, a) in products.iter().enumerate() {
                tx.execute(
                    "INSERT INTO product_attrition (
                        run_id, customer_id, position, product, recent_qty,
                        historical_qty, pct_decline, latest_month_qty
                    ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                    params![
                        run_id,
                        a.customer_id,
                        position as i64,
                        a.product,
                        a.recent_qty,
                        a.historical_qty,
                        a.pct_decline,
                        a.latest_month_qty,
                    ],
                )?;
            }
        }

        for s in output.strategies.values() {
            tx.execute(
                "INSERT INTO retention_strategy (
                    run_id, customer_id, composite_score, priority, discount_pct,
                    target_products, action_text, clv, discount_cost, retention_roi_pct
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
                params![
                    run_id,
                    s.customer_id,
                    s.composite_score,
                    s.priority.as_str(),
                    s.discount_pct,
                    serde_json::to_string(&s.target_products)?,
                    s.action_text,
                    s.valuation.clv,
                    s.valuation.discount_cost,
                    s.valuation.retention_roi_pct,
                ],
            )?;
        }

        tx.execute(
            "UPDATE run SET skipped_records = ?2, summary_json = ?3 WHERE run_id = ?1",
            params![
                run_id,
                output.summary.skipped_records as i64,
                serde_json::to_string(&output.summary)?,
            ],
        )?;

        tx.commit()?;
        log::debug!(
            "store: saved run {run_id} ({} scores, {} strategies)",
            output.scores.len(),
            output.strategies.len(),
        );
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn risk_score_count(&self, run_id: &str) -> ChurnResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM risk_score WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn risk_level_count(&self, run_id: &str, level: RiskLevel) -> ChurnResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM risk_score WHERE run_id = ?1 AND risk_level = ?2",
            params![run_id, level.as_str()],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn strategy_count(&self, run_id: &str) -> ChurnResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM retention_strategy WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn get_risk_score(&self, run_id: &str, customer_id: &str) -> ChurnResult<Option<RiskScore>> {
        let row = self
            .conn
            .query_row(
                "SELECT customer_id, trend_risk, decline_risk, inactivity_risk,
                        volatility_risk, composite_score, risk_level
                 FROM risk_score WHERE run_id = ?1 AND customer_id = ?2",
                params![run_id, customer_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(customer_id, trend, decline, inactivity, volatility, composite, level)| -> ChurnResult<RiskScore> {
            Ok(RiskScore {
                customer_id,
                trend_risk: trend,
                decline_risk: decline,
                inactivity_risk: inactivity,
                volatility_risk: volatility,
                composite_score: composite,
                risk_level: parse_level(&level)?,
            })
        })
        .transpose()
    }

    /// Attrition rows for one customer, biggest loss first.
    pub fn product_attrition(&self, run_id: &str, customer_id: &str) -> ChurnResult<Vec<ProductAttrition>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, product, recent_qty, historical_qty,
                    pct_decline, latest_month_qty
             FROM product_attrition
             WHERE run_id = ?1 AND customer_id = ?2
             ORDER BY position ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, customer_id], |row| {
                Ok(ProductAttrition {
                    customer_id:      row.get(0)?,
                    product:          row.get(1)?,
                    recent_qty:       row.get(2)?,
                    historical_qty:   row.get(3)?,
                    pct_decline:      row.get(4)?,
                    latest_month_qty: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Strategies ordered by composite score, highest first.
    pub fn strategies_by_score(&self, run_id: &str) -> ChurnResult<Vec<StoredStrategy>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, composite_score, priority, discount_pct,
                    target_products, action_text, clv
             FROM retention_strategy
             WHERE run_id = ?1
             ORDER BY composite_score DESC, customer_id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, f64>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(customer_id, composite_score, priority, discount_pct, products, action_text, clv)| -> ChurnResult<StoredStrategy> {
                Ok(StoredStrategy {
                    customer_id,
                    composite_score,
                    priority: parse_priority(&priority)?,
                    discount_pct,
                    target_products: serde_json::from_str(&products)?,
                    action_text,
                    clv,
                })
            })
            .collect()
    }
}

fn parse_level(s: &str) -> ChurnResult<RiskLevel> {
    match s {
        "High"   => Ok(RiskLevel::High),
        "Medium" => Ok(RiskLevel::Medium),
        "Low"    => Ok(RiskLevel::Low),
        other    => Err(anyhow::anyhow!("unknown risk level '{other}' in database").into()),
    }
}

fn parse_priority(s: &str) -> ChurnResult<Priority> {
    match s {
        "Urgent" => Ok(Priority::Urgent),
        "High"   => Ok(Priority::High),
        "Medium" => Ok(Priority::Medium),
        other    => Err(anyhow::anyhow!("unknown priority '{other}' in database").into()),
    }
}
