//! Configuration loading and validation.

use churnguard_core::{
    config::{DiscountTier, EngineConfig, RiskWeights},
    error::ChurnError,
    ChurnEngine,
};

fn write_temp(name: &str, contents: &str) -> String {
    let path = std::env::temp_dir().join(format!("churnguard-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).expect("write temp config");
    path.to_string_lossy().into_owned()
}

#[test]
fn defaults_are_valid() {
    let config = EngineConfig::default().validate().expect("defaults must validate");
    assert_eq!(config.window_months, 6);
    assert_eq!(config.weights, RiskWeights::default());
    assert_eq!(config.strategy.emission_threshold(), 45.0);
}

#[test]
fn partial_file_falls_back_to_defaults() {
    let path = write_temp(
        "partial.json",
        r#"{
            "window_months": 3,
            "weights": {"trend": 0.25, "decline": 0.25, "inactivity": 0.25, "volatility": 0.25}
        }"#,
    );
    let config = EngineConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.window_months, 3);
    assert_eq!(config.weights.trend, 0.25);
    assert_eq!(config.levels.high, 70.0);
    assert_eq!(config.attrition.decline_threshold, -0.10);
    assert!(ChurnEngine::new(config).is_ok());
}

#[test]
fn missing_file_is_an_error() {
    let err = EngineConfig::load("/definitely/not/here.json").unwrap_err();
    assert!(err.to_string().contains("Cannot read"), "got {err}");
}

#[test]
fn malformed_json_is_a_serialization_error() {
    let path = write_temp("broken.json", "{ window_months: ");
    let err = EngineConfig::load(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, ChurnError::Serialization(_)), "got {err}");
}

#[test]
fn non_numeric_weight_is_an_invalid_weights_error() {
    let path = write_temp(
        "weights.json",
        r#"{"weights": {"trend": "high", "decline": 0.35, "inactivity": 0.2, "volatility": 0.1}}"#,
    );
    let err = EngineConfig::load(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, ChurnError::InvalidWeights { .. }), "got {err}");
}

#[test]
fn partial_nested_sections_keep_their_other_defaults() {
    let path = write_temp(
        "nested.json",
        r#"{
            "normalization": {"decline_floor": -0.4},
            "levels": {"high": 75.0},
            "valuation": {"horizon_years": 3}
        }"#,
    );
    let config = EngineConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.normalization.decline_floor, -0.4);
    assert_eq!(config.normalization.volatility_ceiling, 1.0);
    assert_eq!(config.levels.high, 75.0);
    assert_eq!(config.levels.medium, 45.0);
    assert_eq!(config.valuation.horizon_years, 3);
    assert_eq!(config.valuation.discount_rate, 0.10);
    assert!(config.validate().is_ok());
}

#[test]
fn partial_weights_fill_in_defaults_then_fail_the_sum_check() {
    let path = write_temp("half-weights.json", r#"{"weights": {"trend": 0.5}}"#);
    let config = EngineConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.weights.trend, 0.5);
    assert_eq!(config.weights.decline, 0.35);
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ChurnError::InvalidWeights { .. }), "got {err}");
}

#[test]
fn invalid_settings_are_rejected() {
    let mut zero_window = EngineConfig::default();
    zero_window.window_months = 0;

    let mut inverted_levels = EngineConfig::default();
    inverted_levels.levels.medium = 80.0;

    let mut positive_floor = EngineConfig::default();
    positive_floor.normalization.decline_floor = 0.5;

    let mut unordered_tiers = EngineConfig::default();
    unordered_tiers.strategy.discount_tiers = vec![
        DiscountTier { above_score: 45.0, discount_pct: 8 },
        DiscountTier { above_score: 80.0, discount_pct: 20 },
    ];

    let mut shrinking_discount = EngineConfig::default();
    shrinking_discount.strategy.discount_tiers = vec![
        DiscountTier { above_score: 80.0, discount_pct: 5 },
        DiscountTier { above_score: 45.0, discount_pct: 8 },
    ];

    for (name, config) in [
        ("zero window", zero_window),
        ("inverted levels", inverted_levels),
        ("positive decline floor", positive_floor),
        ("unordered tiers", unordered_tiers),
        ("shrinking discount", shrinking_discount),
    ] {
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ChurnError::InvalidConfig { .. }),
            "{name}: expected InvalidConfig, got {err}"
        );
    }
}
