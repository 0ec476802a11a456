//! churn-runner: headless batch runner for the churn engine.
//!
//! Usage:
//!   churn-runner --ledger transactions.json --db churn.db --out report.json
//!   churn-runner --seed 42 --customers 50 --months 12
//!   churn-runner --config engine.json --seed 7

use anyhow::Result;
use churnguard_core::{
    engine::{ChurnEngine, RunOutput},
    ledger::Ledger,
    scoring::RiskLevel,
    store::ChurnStore,
    synth::{self, SynthConfig},
    EngineConfig,
};
use std::env;

const TOP_CUSTOMERS: usize = 10;

#[derive(serde::Serialize)]
struct Report<'a> {
    run_id: &'a str,
    version: &'a str,
    output: &'a RunOutput,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let customers = parse_arg(&args, "--customers", 50usize);
    let months = parse_arg(&args, "--months", 12u32);
    let ledger_path = flag_value(&args, "--ledger");
    let config_path = flag_value(&args, "--config");
    let out_path = flag_value(&args, "--out");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");

    println!("Supplier churn detection — churn-runner");
    match ledger_path {
        Some(p) => println!("  ledger:    {p}"),
        None => println!("  ledger:    synthetic (seed {seed}, {customers} customers, {months} months)"),
    }
    println!("  config:    {}", config_path.unwrap_or("defaults"));
    println!("  db:        {db}");
    println!();

    let config = match config_path {
        Some(p) => EngineConfig::load(p)?,
        None => EngineConfig::default(),
    };
    let engine = ChurnEngine::new(config)?;

    let ledger = match ledger_path {
        Some(p) => Ledger::load_json(p)?,
        None => synth::generate(&SynthConfig {
            customers,
            months,
            seed,
            ..SynthConfig::default()
        })
        .into_ledger(),
    };

    let output = engine.run(&ledger)?;

    let store = ChurnStore::open(db)?;
    store.migrate()?;
    let run_id = format!("run-{}", uuid::Uuid::new_v4());
    let version = env!("CARGO_PKG_VERSION");
    store.insert_run(&run_id, version, engine.config())?;
    store.save_run_output(&run_id, &output)?;

    if let Some(path) = out_path {
        let report = Report { run_id: &run_id, version, output: &output };
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        log::info!("report written to {path}");
    }

    print_summary(&store, &run_id, &ledger, &output)?;
    Ok(())
}

fn print_summary(store: &ChurnStore, run_id: &str, ledger: &Ledger, output: &RunOutput) -> Result<()> {
    let s = &output.summary;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:            {run_id}");
    println!("  transactions:      {}", ledger.transaction_count());
    println!("  records skipped:   {}", s.skipped_records);
    println!("  customers seen:    {}", s.customers_seen);
    println!("  customers scored:  {}", s.customers_scored);
    println!("  excluded:          {}", s.excluded_customers.len());
    println!(
        "  high / med / low:  {} / {} / {}",
        store.risk_level_count(run_id, RiskLevel::High)?,
        store.risk_level_count(run_id, RiskLevel::Medium)?,
        store.risk_level_count(run_id, RiskLevel::Low)?,
    );
    println!("  avg risk score:    {:.1}/100", s.avg_risk_score);
    println!("  strategies:        {}", store.strategy_count(run_id)?);

    println!();
    println!("=== RETENTION ECONOMICS ===");
    println!("  revenue at risk:   £{:.0}", s.total_revenue_at_risk);
    println!("  discount cost:     £{:.0}", s.total_discount_cost);
    println!(
        "  potential savings: £{:.0}",
        s.total_revenue_at_risk - s.total_discount_cost
    );

    println!();
    println!("=== TOP AT-RISK CUSTOMERS ===");
    let strategies = store.strategies_by_score(run_id)?;
    if strategies.is_empty() {
        println!("  (No customers above the action threshold)");
    }
    for (i, st) in strategies.iter().take(TOP_CUSTOMERS).enumerate() {
        println!(
            "  {:>2}. {} | score {:.1} | {} | {}% | CLV £{:.0}",
            i + 1,
            st.customer_id,
            st.composite_score,
            st.priority,
            st.discount_pct,
            st.clv,
        );
        println!("      {}", st.action_text);
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
