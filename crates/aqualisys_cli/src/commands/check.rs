use anyhow::{Context, Result};
use aqualisys_core::DataSet;
use aqualisys_validator::{BuildContext, DataQualityChecker, RuleRegistry};
use tracing::info;

use super::{SelectorArgs, load_suite};
use crate::output;

pub fn execute(config_path: &str, selectors: SelectorArgs, format: &str) -> Result<()> {
    info!("Checking suite: {}", config_path);

    let suite = load_suite(config_path, selectors)?;

    // Relationship rules only need a handle at build time, data is not read
    let context = suite
        .references
        .keys()
        .fold(BuildContext::new(), |ctx, name| {
            ctx.with_reference(name.clone(), DataSet::empty())
        });

    let registry = RuleRegistry::with_builtin_rules();
    let checker = DataQualityChecker::from_specs(&registry, &suite.rules, &context)
        .context("Failed to build rules")?;
    let plan = checker
        .plan(&suite.run_options())
        .context("Invalid run options")?;

    output::print_plan(&suite, &plan, format);

    Ok(())
}
