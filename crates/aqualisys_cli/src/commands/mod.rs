pub mod check;
pub mod history;
pub mod rules;
pub mod validate;

use anyhow::{Context, Result};
use aqualisys_core::{Severity, SuiteConfig, SuiteOverrides};
use aqualisys_parser::parse_file;
use clap::Args;
use std::path::Path;

/// Run-time selectors shared by `validate` and `check`.
#[derive(Args, Debug, Default)]
pub struct SelectorArgs {
    /// Only run rules carrying one of these tags
    #[arg(long = "include-tag", value_name = "TAG")]
    pub include_tags: Vec<String>,

    /// Skip rules carrying one of these tags
    #[arg(long = "exclude-tag", value_name = "TAG")]
    pub exclude_tags: Vec<String>,

    /// Override a rule's severity, e.g. UniqueRule::order_id=warn
    #[arg(long = "override-severity", value_name = "RULE_ID=LEVEL", value_parser = parse_override)]
    pub severity_overrides: Vec<(String, Severity)>,

    /// Stop after the first failing error-severity rule
    #[arg(long, conflicts_with = "no_fail_fast")]
    pub fail_fast: bool,

    /// Evaluate every rule even if the suite enables fail-fast
    #[arg(long)]
    pub no_fail_fast: bool,
}

impl SelectorArgs {
    pub fn into_overrides(self) -> SuiteOverrides {
        let fail_fast = match (self.fail_fast, self.no_fail_fast) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        SuiteOverrides {
            include_tags: self.include_tags,
            exclude_tags: self.exclude_tags,
            severity_overrides: self.severity_overrides.into_iter().collect(),
            fail_fast,
        }
    }
}

fn parse_override(value: &str) -> std::result::Result<(String, Severity), String> {
    let (rule_id, level) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected RULE_ID=LEVEL, got '{}'", value))?;
    let rule_id = rule_id.trim();
    if rule_id.is_empty() {
        return Err(format!("missing rule id in '{}'", value));
    }
    let severity = level.parse::<Severity>().map_err(|e| e.to_string())?;
    Ok((rule_id.to_string(), severity))
}

/// Parses a suite file and merges the command-line selectors into it.
pub fn load_suite(config_path: &str, selectors: SelectorArgs) -> Result<SuiteConfig> {
    let suite = parse_file(Path::new(config_path))
        .with_context(|| format!("Failed to parse suite file: {}", config_path))?;
    Ok(suite.with_overrides(selectors.into_overrides()))
}
