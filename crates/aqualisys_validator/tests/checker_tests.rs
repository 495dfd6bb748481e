//! End-to-end checker runs built from declarative specs.

use aqualisys_core::{
    DataFormat, DataSet, MemoryRunLogger, QualityError, RuleSpec, RuleSpecBuilder, RunLogger,
    RunOptions, Severity,
};
use aqualisys_validator::{BuildContext, DataQualityChecker, RuleRegistry, load_dataset};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn orders() -> DataSet {
    DataSet::from_columns([
        ("order_id", vec![json!(1), json!(2), json!(2), json!(4)]),
        ("customer_id", vec![json!(10), json!(11), json!(99), json!(null)]),
        (
            "status",
            vec![json!("pending"), json!("shipped"), json!("cancelled"), json!("pending")],
        ),
        ("total", vec![json!(12.5), json!(3), json!(-1), json!(0)]),
    ]
    .map(|(name, values)| {
        (
            name,
            values
                .iter()
                .map(aqualisys_core::DataValue::from_json)
                .collect::<Vec<_>>(),
        )
    }))
}

fn context() -> BuildContext {
    BuildContext::new().with_reference(
        "customers",
        DataSet::from_columns([("id", vec![10_i64, 11, 12])]),
    )
}

fn specs() -> Vec<RuleSpec> {
    vec![
        RuleSpecBuilder::new("not_null").column("order_id").build(),
        RuleSpecBuilder::new("unique").column("order_id").build(),
        RuleSpecBuilder::new("accepted_values")
            .column("status")
            .param("values", json!(["pending", "shipped"]))
            .build(),
        RuleSpecBuilder::new("relationship")
            .column("customer_id")
            .param("reference", json!({ "dataset": "customers", "column": "id" }))
            .severity(Severity::Warn)
            .build(),
        RuleSpecBuilder::new("expression")
            .name("non_negative_total")
            .param("expression", json!("total >= 0"))
            .tag("finance")
            .build(),
    ]
}

fn checker() -> DataQualityChecker {
    DataQualityChecker::from_specs(&RuleRegistry::with_builtin_rules(), &specs(), &context())
        .unwrap()
}

#[test]
fn test_full_suite_outcomes() {
    let result = checker().run(&orders(), "orders", &RunOptions::new()).unwrap();
    let report = &result.report;

    let summary: Vec<(&str, bool, f64)> = report
        .outcomes
        .iter()
        .map(|o| (o.rule_id.as_str(), o.passed, o.metric_value))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("NotNullRule::order_id", true, 0.0),
            ("UniqueRule::order_id", false, 1.0),
            ("AcceptedValuesRule::status", false, 1.0),
            ("RelationshipRule::customer_id", false, 1.0),
            ("non_negative_total", false, 1.0),
        ]
    );
    assert!(!report.passed());
    assert_eq!(report.warn_failures().count(), 1);
    assert_eq!(report.error_failures().count(), 3);
}

#[test]
fn test_tag_selection_and_overrides() {
    let options = RunOptions::new()
        .with_include_tags(["integrity", "finance"])
        .with_exclude_tags(["uniqueness"])
        .with_severity_override("non_negative_total", Severity::Warn);

    let result = checker().run(&orders(), "orders", &options).unwrap();
    let ids: Vec<&str> = result.report.outcomes.iter().map(|o| o.rule_id.as_str()).collect();

    assert_eq!(
        ids,
        vec![
            "NotNullRule::order_id",
            "RelationshipRule::customer_id",
            "non_negative_total",
        ]
    );
    assert!(result.passed());
}

#[test]
fn test_override_on_absent_rule_is_configuration_error() {
    let options = RunOptions::new().with_severity_override("UniqueRule::email", Severity::Warn);
    let err = checker().run(&orders(), "orders", &options).unwrap_err();

    assert!(matches!(err, QualityError::UnknownOverride { .. }));
    assert!(err.is_configuration_error());
}

#[test]
fn test_override_matching_two_rules_is_ambiguous() {
    let accepted = |name: &str, values: serde_json::Value| {
        RuleSpecBuilder::new("accepted_values")
            .name(name)
            .column("status")
            .param("values", values)
            .build()
    };
    let checker = checker_for(&[
        accepted("status_a", json!(["pending", "shipped"])),
        accepted("status_b", json!(["pending", "shipped", "cancelled"])),
    ]);

    let options =
        RunOptions::new().with_severity_override("AcceptedValuesRule::status", Severity::Warn);
    let err = checker.run(&orders(), "orders", &options).unwrap_err();
    assert!(matches!(err, QualityError::AmbiguousOverride { count: 2, .. }), "{err:?}");

    let options = RunOptions::new().with_severity_override("status_a", Severity::Warn);
    let result = checker.run(&orders(), "orders", &options).unwrap();
    assert_eq!(result.report.outcome("status_a").unwrap().severity, Severity::Warn);
    assert!(result.passed());
}

#[test]
fn test_override_by_canonical_key_of_named_rule() {
    let options =
        RunOptions::new().with_severity_override("ExpressionRule::total >= 0", Severity::Warn);
    let result = checker().run(&orders(), "orders", &options).unwrap();

    assert_eq!(
        result.report.outcome("non_negative_total").unwrap().severity,
        Severity::Warn
    );
}

#[test]
fn test_fail_fast_stops_after_first_blocking_failure() {
    let options = RunOptions::new().with_fail_fast(true);
    let result = checker().run(&orders(), "orders", &options).unwrap();

    assert_eq!(result.report.outcomes.len(), 2);
    assert!(result.report.fail_fast_triggered);
    assert_eq!(
        result.report.skipped_rules,
        vec![
            "AcceptedValuesRule::status",
            "RelationshipRule::customer_id",
            "non_negative_total",
        ]
    );
}

#[test]
fn test_repeated_runs_produce_same_outcomes() {
    let checker = checker();
    let logger = Arc::new(MemoryRunLogger::new());
    let checker = checker.with_logger(logger.clone());

    let first = checker.run(&orders(), "orders", &RunOptions::new()).unwrap();
    let second = checker.run(&orders(), "orders", &RunOptions::new()).unwrap();

    let content = |r: &aqualisys_core::Report| {
        r.outcomes
            .iter()
            .map(|o| (o.rule_id.clone(), o.severity, o.passed, o.metric_detail.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(content(&first.report), content(&second.report));
    assert_eq!(logger.len(), 2);
}

#[test]
fn test_retrying_a_run_id_replaces_the_record() {
    let logger = Arc::new(MemoryRunLogger::new());
    let checker = checker().with_logger(logger.clone());
    let options = RunOptions::new().with_run_id("nightly-1");

    checker.run(&orders(), "orders", &options).unwrap();
    let result = checker.run(&orders(), "orders", &options).unwrap();

    assert_eq!(logger.len(), 1);
    let (_, rows) = logger.get("nightly-1").unwrap();
    assert_eq!(rows.len(), result.report.outcomes.len());
    assert!(logger.record_run(&result.report).is_ok());
}

#[test]
fn test_checker_on_loaded_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.csv");
    std::fs::write(
        &path,
        "order_id,status,total\n1,pending,10\n2,shipped,5.5\n3,pending,0\n",
    )
    .unwrap();

    let dataset = load_dataset(&path, DataFormat::Csv).unwrap();
    let result = checker_for(&[
        RuleSpecBuilder::new("unique").column("order_id").build(),
        RuleSpecBuilder::new("expression")
            .param("expression", json!("total >= 0 AND status <> ''"))
            .build(),
    ])
    .run(&dataset, "orders", &RunOptions::new())
    .unwrap();

    assert!(result.passed(), "{:#?}", result.report.outcomes);
}

fn checker_for(specs: &[RuleSpec]) -> DataQualityChecker {
    DataQualityChecker::from_specs(
        &RuleRegistry::with_builtin_rules(),
        specs,
        &BuildContext::new(),
    )
    .unwrap()
}
