use aqualisys_core::{RuleOutcome, RuleResultRecord, RunRecord, Severity, SuiteConfig};
use aqualisys_validator::{LoggingStatus, RuleDefinition, RunPlan, RunResult};
use colored::*;
use serde_json::{Value, json};

pub fn print_run_result(result: &RunResult, format: &str) {
    match format {
        "json" => print_json(&run_result_json(result)),
        _ => print_text_run_result(result),
    }
}

fn print_text_run_result(result: &RunResult) {
    let report = &result.report;

    println!("\n{}", "═".repeat(60));
    println!("{}", "  DATA QUALITY REPORT".bold());
    println!("{}", "═".repeat(60));
    println!("  Dataset: {}", report.dataset_name);
    println!("  Run:     {}", report.run_id);

    if report.passed() {
        println!("\n{} {}", "✓".green().bold(), "Run PASSED".green().bold());
    } else {
        println!("\n{} {}", "✗".red().bold(), "Run FAILED".red().bold());
    }

    println!("\n{}", "Rules:".bold());
    for outcome in &report.outcomes {
        print_outcome(outcome);
    }

    if !report.skipped_rules.is_empty() {
        println!("\n{}", "Skipped (fail-fast):".yellow().bold());
        for rule_id in &report.skipped_rules {
            println!("  - {}", rule_id.yellow());
        }
    }

    println!("\n{}", "Summary:".bold());
    println!("  Evaluated:      {}", report.outcomes.len());
    println!("  Error failures: {}", report.error_failures().count());
    println!("  Warn failures:  {}", report.warn_failures().count());
    println!("  Skipped:        {}", report.skipped_rules.len());
    println!("  Duration:       {} ms", report.duration_ms());
    match &result.logging {
        LoggingStatus::Failed(err) => {
            println!("  Logging:        {}", format!("failed ({})", err).red())
        }
        status => println!("  Logging:        {}", status.label()),
    }
    println!("{}", "═".repeat(60));
}

fn print_outcome(outcome: &RuleOutcome) {
    let marker = match (outcome.passed, outcome.severity) {
        (true, _) => "✓".green().bold(),
        (false, Severity::Warn) => "!".yellow().bold(),
        (false, Severity::Error) => "✗".red().bold(),
    };
    let message = if outcome.passed {
        outcome.message.normal()
    } else if outcome.severity == Severity::Warn {
        outcome.message.yellow()
    } else {
        outcome.message.red()
    };
    println!(
        "  {} {} [{}] {}",
        marker, outcome.rule_id, outcome.severity, message
    );
}

fn run_result_json(result: &RunResult) -> Value {
    let report = &result.report;
    let failed: Vec<Value> = report
        .failed_outcomes()
        .map(|o| {
            json!({
                "rule_id": o.rule_id,
                "severity": o.severity.as_str(),
                "metric_value": o.metric_value,
                "message": o.message,
            })
        })
        .collect();
    let logging_error = match &result.logging {
        LoggingStatus::Failed(err) => Some(err.to_string()),
        _ => None,
    };

    json!({
        "run_id": report.run_id,
        "dataset": report.dataset_name,
        "passed": report.passed(),
        "fail_fast_triggered": report.fail_fast_triggered,
        "failed_rules": failed,
        "skipped_rules": report.skipped_rules,
        "summary": {
            "evaluated": report.outcomes.len(),
            "error_failures": report.error_failures().count(),
            "warn_failures": report.warn_failures().count(),
            "duration_ms": report.duration_ms(),
        },
        "logging": {
            "status": result.logging.label(),
            "error": logging_error,
        }
    })
}

pub fn print_plan(suite: &SuiteConfig, plan: &RunPlan, format: &str) {
    if format == "json" {
        let rules: Vec<Value> = plan
            .rules
            .iter()
            .map(|planned| {
                json!({
                    "rule_id": planned.id(),
                    "rule_type": planned.rule.meta().rule_type(),
                    "severity": planned.severity.as_str(),
                    "overridden": planned.overridden,
                    "tags": planned.rule.meta().tags(),
                })
            })
            .collect();
        print_json(&json!({
            "dataset": suite.dataset.name,
            "fail_fast": suite.fail_fast,
            "rules": rules,
            "deselected": plan.deselected,
        }));
        return;
    }

    print_success("Suite is valid");

    println!("\nSuite Summary:");
    println!("  Dataset:    {}", suite.dataset.name);
    println!("  Path:       {}", suite.dataset.path.display());
    println!("  Format:     {:?}", suite.dataset.format);
    println!("  References: {}", suite.references.len());
    println!("  Fail-fast:  {}", suite.fail_fast);
    println!("  Rules:      {} selected, {} deselected", plan.len(), plan.deselected.len());

    println!("\nPlanned Rules:");
    for planned in &plan.rules {
        let tags: Vec<&str> = planned.rule.meta().tags().iter().map(String::as_str).collect();
        let severity = if planned.overridden {
            format!("{} (override)", planned.severity)
        } else {
            planned.severity.to_string()
        };
        println!("  - {} [{}] tags: {}", planned.id(), severity, tags.join(", "));
    }

    if !plan.deselected.is_empty() {
        println!("\nDeselected:");
        for rule_id in &plan.deselected {
            println!("  - {}", rule_id.dimmed());
        }
    }
}

pub fn print_definitions(definitions: &[&RuleDefinition], format: &str) {
    if format == "json" {
        let items: Vec<Value> = definitions
            .iter()
            .map(|d| {
                json!({
                    "name": d.name(),
                    "description": d.description(),
                    "tags": d.tags(),
                })
            })
            .collect();
        print_json(&Value::Array(items));
        return;
    }

    println!("{}", "Registered rule types:".bold());
    for definition in definitions {
        let tags: Vec<&str> = definition.tags().iter().map(String::as_str).collect();
        println!(
            "  {:<16} {} [{}]",
            definition.name().cyan(),
            definition.description(),
            tags.join(", ")
        );
    }
}

pub fn print_runs(runs: &[RunRecord], format: &str) {
    if format == "json" {
        print_json(&json!(runs));
        return;
    }

    if runs.is_empty() {
        print_info("No runs recorded");
        return;
    }

    println!("{}", "Recent runs:".bold());
    for run in runs {
        let status = if run.passed {
            "PASSED".green()
        } else {
            "FAILED".red()
        };
        println!(
            "  {} {} {} {} ({} rules, {} failed, {} warn)",
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.run_id,
            run.dataset,
            status,
            run.total_rules,
            run.failed_rules,
            run.warn_failures
        );
    }
}

pub fn print_run_detail(run: &RunRecord, rows: &[RuleResultRecord], format: &str) {
    if format == "json" {
        print_json(&json!({ "run": run, "rule_results": rows }));
        return;
    }

    println!("{}", format!("Run {}", run.run_id).bold());
    println!("  Dataset:   {}", run.dataset);
    println!("  Started:   {}", run.started_at.to_rfc3339());
    println!("  Passed:    {}", run.passed);
    println!("  Fail-fast: {}", run.fail_fast_triggered);

    println!("\nRule results:");
    for row in rows {
        let marker = if row.passed { "✓".green() } else { "✗".red() };
        println!(
            "  {} {} [{}] metric={} {}",
            marker,
            row.rule_id,
            row.severity,
            row.metric_value,
            row.metric_detail.dimmed()
        );
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(err) => print_error(&format!("Failed to render JSON: {}", err)),
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}
