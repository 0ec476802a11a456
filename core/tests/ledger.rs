//! Ledger validation: malformed records, total_value policy, month range.

use chrono::NaiveDate;
use churnguard_core::{
    engine::ChurnEngine,
    error::ChurnError,
    ledger::{Ledger, RawTransaction, MAX_MONTH},
};

fn write_temp(name: &str, contents: &str) -> String {
    let path = std::env::temp_dir().join(format!("churnguard-ledger-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).expect("write temp ledger");
    path.to_string_lossy().into_owned()
}

const GOOD_RECORDS: &str = r#"
    {"date": "2023-01-01", "customer_id": "Customer_001", "product": "Sauces",
     "quantity": 12, "unit_price": 4.5, "month": 1},
    {"date": "2023-01-31", "customer_id": "Customer_001", "product": "Sauces",
     "quantity": 10, "unit_price": 4.5, "month": 2}
"#;

fn raw(customer: &str, month: u32, qty: f64, price: f64) -> RawTransaction {
    RawTransaction {
        date:        NaiveDate::from_ymd_opt(2023, month, 1),
        customer_id: Some(customer.into()),
        product:     Some("Drinks".into()),
        quantity:    Some(qty),
        unit_price:  Some(price),
        total_value: None,
        month:       Some(month),
    }
}

#[test]
fn malformed_records_are_skipped_and_counted() {
    let mut missing_customer = raw("a", 1, 1.0, 1.0);
    missing_customer.customer_id = None;
    let negative_qty = raw("a", 1, -3.0, 1.0);
    let negative_price = raw("a", 1, 3.0, -1.0);
    let mut missing_date = raw("a", 1, 1.0, 1.0);
    missing_date.date = None;
    let mut negative_total = raw("a", 1, 1.0, 1.0);
    negative_total.total_value = Some(-10.0);
    let mut blank_product = raw("a", 1, 1.0, 1.0);
    blank_product.product = Some("  ".into());

    let ledger = Ledger::from_raw(vec![
        raw("a", 1, 2.0, 10.0),
        missing_customer,
        negative_qty,
        negative_price,
        missing_date,
        negative_total,
        blank_product,
        raw("a", 2, 2.0, 10.0),
    ]);

    assert_eq!(ledger.skipped_records(), 6, "expected 6 skipped records");
    assert_eq!(ledger.transaction_count(), 2);
}

#[test]
fn skipped_count_is_reported_in_run_summary() {
    let mut bad = raw("a", 1, 1.0, 1.0);
    bad.quantity = None;
    let ledger = Ledger::from_raw(vec![raw("a", 1, 2.0, 10.0), raw("a", 2, 2.0, 10.0), bad]);

    let output = ChurnEngine::with_defaults().unwrap().run(&ledger).unwrap();
    assert_eq!(output.summary.skipped_records, 1);
    assert_eq!(output.summary.customers_scored, 1);
}

#[test]
fn stored_total_value_is_trusted_and_missing_one_is_computed() {
    let mut stored = raw("a", 1, 2.0, 10.0);
    stored.total_value = Some(99.0);
    let computed = raw("a", 2, 2.0, 10.0);

    let ledger = Ledger::from_raw(vec![stored, computed]);
    let txns = ledger.for_customer("a");

    assert_eq!(txns[0].total_value, 99.0, "stored total_value should win");
    assert_eq!(txns[1].total_value, 20.0, "missing total_value should be qty × price");
}

#[test]
fn month_range_spans_all_customers() {
    let ledger = Ledger::from_raw(vec![
        raw("a", 3, 1.0, 1.0),
        raw("b", 1, 1.0, 1.0),
        raw("a", 9, 1.0, 1.0),
    ]);
    assert_eq!(ledger.month_range(), Some((1, 9)));
    assert_eq!(ledger.month_count(), 9);
    assert_eq!(ledger.customer_ids().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[test]
fn raw_records_parse_from_json() {
    let json = r#"[
        {"date": "2023-01-01", "customer_id": "Customer_001", "product": "Sauces",
         "quantity": 12, "unit_price": 4.5, "total_value": 54.0, "month": 1},
        {"date": "2023-01-31", "customer_id": "Customer_001", "product": "Sauces",
         "quantity": 10, "unit_price": 4.5, "month": 2},
        {"customer_id": "Customer_002", "product": "Sauces", "quantity": 1,
         "unit_price": 1.0, "month": 1}
    ]"#;
    let records: Vec<RawTransaction> = serde_json::from_str(json).unwrap();
    let ledger = Ledger::from_raw(records);

    assert_eq!(ledger.transaction_count(), 2);
    assert_eq!(ledger.skipped_records(), 1, "record without a date is malformed");
    assert_eq!(ledger.for_customer("Customer_001")[1].total_value, 45.0);
}

#[test]
fn unknown_customer_has_an_empty_slice() {
    let ledger = Ledger::from_raw(vec![raw("a", 1, 1.0, 1.0)]);
    assert!(ledger.for_customer("nobody").is_empty());
}

#[test]
fn badly_typed_record_in_a_file_is_skipped_not_fatal() {
    let bad_records = [
        ("bad-date.json", r#"{"date": "2023-13-45", "customer_id": "Customer_002", "product": "Drinks", "quantity": 1, "unit_price": 1.0, "month": 1}"#),
        ("neg-month.json", r#"{"date": "2023-01-01", "customer_id": "Customer_002", "product": "Drinks", "quantity": 1, "unit_price": 1.0, "month": -2}"#),
        ("text-qty.json", r#"{"date": "2023-01-01", "customer_id": "Customer_002", "product": "Drinks", "quantity": "lots", "unit_price": 1.0, "month": 1}"#),
        ("not-object.json", "42"),
    ];

    for (name, bad) in bad_records {
        let path = write_temp(name, &format!("[{GOOD_RECORDS}, {bad}]"));
        let ledger = Ledger::load_json(&path);
        std::fs::remove_file(&path).ok();

        let ledger = ledger.unwrap_or_else(|e| panic!("{name}: load failed: {e}"));
        assert_eq!(ledger.skipped_records(), 1, "{name}: one record should be skipped");
        assert_eq!(ledger.transaction_count(), 2, "{name}: good records must survive");
    }
}

#[test]
fn file_that_is_not_an_array_fails_to_load() {
    let path = write_temp("object.json", r#"{"records": []}"#);
    let err = Ledger::load_json(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, ChurnError::Serialization(_)), "got {err}");
}

#[test]
fn months_beyond_the_maximum_are_malformed() {
    let mut far_future = raw("a", 1, 1.0, 1.0);
    far_future.month = Some(1_000_000_000);
    let mut last_allowed = raw("a", 1, 1.0, 1.0);
    last_allowed.month = Some(MAX_MONTH);

    let ledger = Ledger::from_raw(vec![
        raw("a", 1, 2.0, 10.0),
        raw("a", 2, 2.0, 10.0),
        far_future,
        last_allowed,
    ]);

    assert_eq!(ledger.skipped_records(), 1);
    assert_eq!(ledger.month_range(), Some((1, MAX_MONTH)));
    assert_eq!(ledger.month_count(), MAX_MONTH as usize);

    let mut just_over = raw("a", 1, 1.0, 1.0);
    just_over.month = Some(MAX_MONTH + 1);
    let err = just_over.validate(0).unwrap_err();
    assert!(matches!(err, ChurnError::MalformedTransaction { index: 0, .. }), "got {err}");
}
