//! Persisting a run and reading it back.

use churnguard_core::{
    engine::{ChurnEngine, RunOutput},
    scoring::RiskLevel,
    store::ChurnStore,
    strategy::Priority,
    synth::{self, SynthConfig},
    EngineConfig,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn build_store(run_id: &str) -> ChurnStore {
    let store = ChurnStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
        .insert_run(run_id, "0.1.0-test", &EngineConfig::default())
        .expect("insert run");
    store
}

fn run_synth(seed: u64) -> RunOutput {
    let ledger = synth::generate(&SynthConfig { seed, ..SynthConfig::default() }).into_ledger();
    ChurnEngine::with_defaults().unwrap().run(&ledger).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn saved_counts_match_run_output() {
    let store = build_store("store-count-test");
    let output = run_synth(42);
    store.save_run_output("store-count-test", &output).unwrap();

    let scores = store.risk_score_count("store-count-test").unwrap();
    assert_eq!(scores, output.scores.len() as i64, "score rows: {scores}");

    let strategies = store.strategy_count("store-count-test").unwrap();
    assert_eq!(strategies, output.strategies.len() as i64);

    let high = store.risk_level_count("store-count-test", RiskLevel::High).unwrap();
    assert_eq!(high, output.summary.high_risk_count as i64);
}

#[test]
fn scores_and_attrition_read_back_unchanged() {
    let store = build_store("store-read-test");
    let output = run_synth(1337);
    store.save_run_output("store-read-test", &output).unwrap();

    for (id, score) in &output.scores {
        let stored = store
            .get_risk_score("store-read-test", id)
            .unwrap()
            .expect("score row");
        assert_eq!(&stored, score, "score for {id} changed in storage");
    }

    for (id, products) in &output.attrition {
        let stored = store.product_attrition("store-read-test", id).unwrap();
        assert_eq!(&stored, products, "attrition for {id} changed in storage");
    }

    assert!(store.get_risk_score("store-read-test", "nobody").unwrap().is_none());
}

#[test]
fn strategies_come_back_highest_score_first() {
    let store = build_store("store-rank-test");
    let output = run_synth(7);
    store.save_run_output("store-rank-test", &output).unwrap();

    let stored = store.strategies_by_score("store-rank-test").unwrap();
    let expected = output.strategies_by_score();
    assert_eq!(stored.len(), expected.len());

    for (s, e) in stored.iter().zip(expected) {
        assert_eq!(s.customer_id, e.customer_id);
        assert_eq!(s.priority, e.priority);
        assert_eq!(s.discount_pct, e.discount_pct);
        assert_eq!(s.target_products, e.target_products);
        assert_eq!(s.action_text, e.action_text);
    }
    assert!(stored.windows(2).all(|w| w[0].composite_score >= w[1].composite_score));
    assert!(stored
        .iter()
        .all(|s| s.priority != Priority::Urgent || s.composite_score > 70.0));
}

#[test]
fn run_summary_round_trips() {
    let store = build_store("store-summary-test");
    assert!(store.run_summary("store-summary-test").unwrap().is_none());

    let output = run_synth(42);
    store.save_run_output("store-summary-test", &output).unwrap();

    let summary = store.run_summary("store-summary-test").unwrap().expect("summary");
    let expected = &output.summary;
    assert_eq!(summary.customers_scored, expected.customers_scored);
    assert_eq!(summary.excluded_customers, expected.excluded_customers);
    assert_eq!(summary.strategies_emitted, expected.strategies_emitted);
    assert!((summary.avg_risk_score - expected.avg_risk_score).abs() < 1e-9);
    assert!((summary.total_revenue_at_risk - expected.total_revenue_at_risk).abs() < 1e-6);
    assert_eq!(store.run_count().unwrap(), 1);
}

#[test]
fn runs_are_isolated_by_run_id() {
    let store = build_store("run-a");
    store.insert_run("run-b", "0.1.0-test", &EngineConfig::default()).unwrap();

    store.save_run_output("run-a", &run_synth(42)).unwrap();
    assert!(store.risk_score_count("run-a").unwrap() > 0);
    assert_eq!(store.risk_score_count("run-b").unwrap(), 0);
}
