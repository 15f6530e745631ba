//! Update command - run the ingestion pipeline.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the update command.
pub async fn run_update(limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Update, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let account = settings.instagram.target_account.clone();
    let orchestrator = Orchestrator::new(settings)?;

    Output::info(&format!(
        "Ingesting up to {} recent posts from @{}...",
        limit, account
    ));

    let report = orchestrator.run_batch(limit).await?;

    if report.failed > 0 {
        Output::warning(&report.status_line());
        for failure in &report.failures {
            Output::kv(
                &failure.media_id,
                &format!("{} failed: {}", failure.stage, failure.message),
            );
        }
    } else {
        Output::success(&report.status_line());
    }

    Ok(())
}
