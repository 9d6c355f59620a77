use reposync::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::PassStarted { eligible, budget } => {
                tracing::info!(
                    eligible,
                    remaining = budget.remaining,
                    total = budget.total,
                    "Sync pass started"
                );
            }

            SyncProgress::PassSkipped { reason } => {
                tracing::debug!(reason = %reason, "Sync pass skipped");
            }

            SyncProgress::RecordSkipped { record, reason } => {
                tracing::debug!(record = %record, reason = %reason, "Record skipped");
            }

            SyncProgress::SyncingRecord { record, api_url } => {
                tracing::debug!(record = %record, api_url = %api_url, "Syncing record");
            }

            SyncProgress::RecordSynced {
                record,
                fields_written,
                fields_failed,
            } => {
                if fields_failed > 0 {
                    tracing::warn!(record = %record, fields_written, fields_failed, "Record synced with field errors");
                } else {
                    tracing::info!(record = %record, fields_written, "Record synced");
                }
            }

            SyncProgress::RecordFailed { record, error } => {
                tracing::debug!(record = %record, error = %error, "Record failed");
            }

            SyncProgress::EnrichmentFailed {
                record,
                step,
                error,
            } => {
                tracing::debug!(record = %record, step, error = %error, "Enrichment failed");
            }

            SyncProgress::BatchCapReached { cap } => {
                tracing::info!(cap, "Batch cap reached, remaining records wait for the next pass");
            }

            SyncProgress::PassComplete {
                synced,
                failed,
                skipped,
            } => {
                tracing::info!(synced, failed, skipped, "Sync pass complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
