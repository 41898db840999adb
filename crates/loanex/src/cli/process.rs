use std::path::Path;

use anyhow::Result;
use loanex_core::{process_with_settings, Settings};

use super::Tuning;

/// Prints the outcome as JSON on stdout and reports whether it succeeded.
pub async fn run(file: &Path, tuning: &Tuning, table: Option<&str>) -> Result<bool> {
    let settings = Settings::from_env().map(|mut settings| {
        tuning.apply(&mut settings.pipeline);
        if let Some(table) = table {
            settings.pipeline.record_table = table.to_string();
        }
        settings
    });

    let outcome = process_with_settings(settings, file).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(outcome.success)
}
