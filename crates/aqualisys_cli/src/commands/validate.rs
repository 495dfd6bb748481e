use anyhow::{Context, Result};
use aqualisys_core::QualityError;
use aqualisys_sqlite::SqliteRunLogger;
use aqualisys_validator::{
    BuildContext, DataQualityChecker, LoggingStatus, RuleRegistry, read_dataset,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::{SelectorArgs, load_suite};
use crate::output;

pub async fn execute(
    config_path: &str,
    selectors: SelectorArgs,
    format: &str,
    no_log: bool,
    run_id: Option<String>,
) -> Result<()> {
    info!("Validating suite: {}", config_path);

    let suite = load_suite(config_path, selectors)?;
    let quiet = format == "json";

    if !quiet {
        output::print_info(&format!(
            "Suite loaded: {} ({} rules, dataset {})",
            config_path,
            suite.rules.len(),
            suite.dataset.name
        ));
    }

    // Reference datasets must be loaded before relationship rules can be built
    let mut context = BuildContext::new();
    for (name, source) in &suite.references {
        info!("Loading reference dataset '{}' from {}", name, source.path.display());
        let reference = read_dataset(&source.path, source.format)
            .await
            .with_context(|| format!("Failed to load reference dataset '{}'", name))?;
        context = context.with_reference(name.clone(), reference);
    }

    let registry = RuleRegistry::with_builtin_rules();
    let mut checker = DataQualityChecker::from_specs(&registry, &suite.rules, &context)
        .context("Failed to build rules")?;

    // A run log that cannot be opened is reported next to the result, it
    // never decides the exit code
    let mut open_failure = None;
    if suite.logger.enabled && !no_log {
        match SqliteRunLogger::open(&suite.logger.path) {
            Ok(logger) => checker = checker.with_logger(Arc::new(logger)),
            Err(err) => {
                warn!(
                    "Failed to open run log {}: {}",
                    suite.logger.path.display(),
                    err
                );
                open_failure = Some(QualityError::from(err));
            }
        }
    } else {
        info!("Run logging disabled");
    }

    let mut options = suite.run_options();
    if let Some(run_id) = run_id {
        options = options.with_run_id(run_id);
    }
    // Surface selector and override mistakes before touching the data
    checker.plan(&options).context("Invalid run options")?;

    info!(
        "Loading dataset '{}' from {}",
        suite.dataset.name,
        suite.dataset.path.display()
    );
    let dataset = read_dataset(&suite.dataset.path, suite.dataset.format)
        .await
        .with_context(|| format!("Failed to load dataset '{}'", suite.dataset.name))?;

    let mut result = checker
        .run(&dataset, &suite.dataset.name, &options)
        .context("Run failed")?;
    if let Some(err) = open_failure {
        result.logging = LoggingStatus::Failed(err);
    }

    output::print_run_result(&result, format);

    if !result.passed() {
        std::process::exit(1);
    }

    Ok(())
}
