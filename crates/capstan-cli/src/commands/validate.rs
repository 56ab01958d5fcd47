//! Validate command - admission check of an app against its capability

use capstan_core::validate_app;
use console::style;
use std::path::Path;

use super::{load_app, load_capability};
use crate::error::{CliError, Result};
use crate::exit_codes;

pub fn run(capability_path: &Path, app_path: &Path, json_output: bool) -> Result<()> {
    let capability = load_capability(capability_path)?;
    let app = load_app(app_path)?;

    if !json_output {
        println!(
            "{} Validating {} against {} {}",
            style("→").blue(),
            style(app.display_name()).cyan(),
            capability.kind,
            style(capability.name()).cyan()
        );
    }

    let verdict = validate_app(&capability, &app);

    if json_output {
        let output = serde_json::to_string_pretty(&verdict)
            .map_err(|e| CliError::internal(format!("failed to serialize verdict: {e}")))?;
        println!("{output}");
    } else if verdict.allowed {
        println!("{} Allowed: {}", style("✓").green().bold(), verdict.reason);
    } else {
        println!("{} Denied: {}", style("✗").red().bold(), verdict.reason);
    }

    if !verdict.allowed {
        std::process::exit(exit_codes::VALIDATION_ERROR);
    }

    Ok(())
}
