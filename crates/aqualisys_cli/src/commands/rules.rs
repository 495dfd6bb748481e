use anyhow::Result;
use aqualisys_validator::RuleRegistry;

use crate::output;

pub fn execute(tag: Option<&str>, format: &str) -> Result<()> {
    let registry = RuleRegistry::with_builtin_rules();
    let definitions = registry.list(tag);

    if definitions.is_empty() && format != "json" {
        output::print_info(&format!(
            "No rule types tagged '{}'",
            tag.unwrap_or_default()
        ));
        return Ok(());
    }

    output::print_definitions(&definitions, format);
    Ok(())
}
