use std::time::Duration;

use console::style;
use reposync::sync::{EnrichmentOutcome, PassOutcome, PassReport, RecordOutcome};
use reposync::{Orchestrator, RecordId};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::commands::shared::{build_orchestrator, open_store};
use crate::config::Config;
use crate::shutdown;

/// Run one pass, or sync a single record when `record` is given.
pub(crate) async fn handle_sync(
    record: Option<Uuid>,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(database_url).await?;
    let orchestrator = build_orchestrator(config, store)?;

    match record {
        Some(id) => {
            let outcome = orchestrator.sync_record(id).await?;
            println!("{}", describe_record(id, &outcome));
        }
        None => {
            let report = orchestrator.run_sync_pass().await;
            println!("{}", summarize_pass(&report));
        }
    }
    Ok(())
}

/// The scheduler: one pass per interval until Ctrl+C.
pub(crate) async fn handle_watch(
    interval_minutes: Option<u64>,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(database_url).await?;
    let orchestrator = build_orchestrator(config, store)?;
    let interval = config.interval(interval_minutes);

    tracing::info!(
        interval_minutes = interval.as_secs() / 60,
        "Watching for stale records (Ctrl+C to stop)"
    );
    watch_loop(&orchestrator, interval).await;
    tracing::info!("Watch stopped");
    Ok(())
}

async fn watch_loop(orchestrator: &Orchestrator, interval: Duration) {
    let mut stop = shutdown::subscribe();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !shutdown::is_shutdown_requested() {
        tokio::select! {
            _ = ticker.tick() => {
                // A pass that has started runs to completion.
                let report = orchestrator.run_sync_pass().await;
                tracing::info!("{}", summarize_pass(&report));
            }
            _ = stop.changed() => break,
        }
    }
}

pub(crate) fn summarize_pass(report: &PassReport) -> String {
    let budget = report
        .budget
        .map(|b| format!(", {} requests left", b.remaining))
        .unwrap_or_default();

    match &report.outcome {
        PassOutcome::Completed => format!(
            "{} synced, {} failed, {} skipped{budget}",
            style(report.synced()).green(),
            style(report.failed()).red(),
            report.skipped.len(),
        ),
        other => format!("{} {other}{budget}", style("Pass skipped:").yellow()),
    }
}

fn describe_enrichment(outcome: &EnrichmentOutcome) -> String {
    match outcome {
        EnrichmentOutcome::Updated(_) => "updated".to_string(),
        EnrichmentOutcome::Skipped(reason) => format!("skipped ({reason})"),
        EnrichmentOutcome::Failed(error) => format!("failed ({error})"),
    }
}

pub(crate) fn describe_record(id: RecordId, outcome: &RecordOutcome) -> String {
    match outcome {
        RecordOutcome::Synced { fields, enrichment } => format!(
            "{} {id}: {} fields written, {} kept local, {} failed; contributors {}; readme {}",
            style("Synced").green(),
            fields.written(),
            fields.vetoed(),
            fields.failed(),
            describe_enrichment(&enrichment.contributors),
            describe_enrichment(&enrichment.readme),
        ),
        RecordOutcome::Failed(err) => format!("{} {id}: {err}", style("Failed").red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reposync::RateLimitStatus;
    use reposync::fields::FieldReport;
    use reposync::sync::EnrichmentReport;

    fn plain(s: String) -> String {
        console::strip_ansi_codes(&s).into_owned()
    }

    #[test]
    fn summary_of_skipped_pass_names_the_reason() {
        let report = PassReport {
            outcome: PassOutcome::BudgetExhausted,
            budget: Some(RateLimitStatus::from_reported(5000, 4, 10)),
            records: Vec::new(),
            skipped: Vec::new(),
        };
        assert_eq!(
            plain(summarize_pass(&report)),
            "Pass skipped: rate limit budget exhausted, 0 requests left"
        );
    }

    #[test]
    fn record_description_lists_enrichment() {
        let outcome = RecordOutcome::Synced {
            fields: FieldReport::default(),
            enrichment: EnrichmentReport {
                contributors: EnrichmentOutcome::Updated(12_i64.into()),
                readme: EnrichmentOutcome::Skipped("README is curated locally"),
            },
        };
        let text = plain(describe_record(Uuid::nil(), &outcome));
        assert!(text.starts_with("Synced 00000000-0000-0000-0000-000000000000"));
        assert!(text.ends_with("contributors updated; readme skipped (README is curated locally)"));
    }
}
