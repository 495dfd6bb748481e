use anyhow::{Context, Result, bail};
use aqualisys_sqlite::SqliteRunLogger;
use std::path::Path;
use tracing::info;

use crate::output;

pub fn execute(
    db_path: &str,
    dataset: Option<&str>,
    limit: usize,
    run_id: Option<&str>,
    format: &str,
) -> Result<()> {
    // Opening creates the file, so a typo would silently produce an empty log
    if !Path::new(db_path).exists() {
        bail!("Run log not found: {}", db_path);
    }

    info!("Reading run log: {}", db_path);
    let logger = SqliteRunLogger::open(db_path)
        .with_context(|| format!("Failed to open run log: {}", db_path))?;

    match run_id {
        Some(run_id) => {
            let run = logger
                .load_run(run_id)
                .context("Failed to read run")?
                .with_context(|| format!("Run not found: {}", run_id))?;
            let rows = logger
                .load_rule_results(run_id)
                .context("Failed to read rule results")?;
            output::print_run_detail(&run, &rows, format);
        }
        None => {
            let runs = logger
                .recent_runs(dataset, limit)
                .context("Failed to read runs")?;
            output::print_runs(&runs, format);
        }
    }

    Ok(())
}
