//! The sync orchestrator.
//!
//! One pass: budget check, eligibility query, then for each record in
//! least-recently-modified order: fetch, apply fields, enrich, stamp. Records
//! are processed strictly one at a time so every request is accounted
//! against the same budget.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{
    EnrichmentOutcome, EnrichmentReport, PassOutcome, PassReport, RecordOutcome, SkipReason,
    SyncOptions,
};
use crate::client::ApiClient;
use crate::error::{Result, SyncError, short_error_message};
use crate::fields::{
    CONTRIBUTORS_COUNT_FIELD, FieldContext, FieldSchema, FieldSpec, OVERRIDE_README_FIELD,
    README_FIELD, apply_fields,
};
use crate::hooks::{CustomFieldHook, ErrorNotifier, LocalOverrideHook, SyncFailure, TracingNotifier};
use crate::markdown::rewrite_relative_images;
use crate::rate_limit::{RateLimitStatus, get_rate_limit_status};
use crate::repo_url::DataSource;
use crate::store::{FieldValue, RecordId, RecordStore};

/// Drives sync passes over a record store.
///
/// Collaborators are injected at construction; the defaults are a
/// [`LocalOverrideHook`] over the same store and a [`TracingNotifier`].
pub struct Orchestrator {
    client: ApiClient,
    store: Arc<dyn RecordStore>,
    schema: Arc<FieldSchema>,
    hook: Arc<dyn CustomFieldHook>,
    notifier: Arc<dyn ErrorNotifier>,
    source: DataSource,
    options: SyncOptions,
    on_progress: Option<ProgressCallback>,
    pass_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(client: ApiClient, store: Arc<dyn RecordStore>, schema: FieldSchema) -> Self {
        Self {
            client,
            hook: Arc::new(LocalOverrideHook::new(Arc::clone(&store))),
            store,
            schema: Arc::new(schema),
            notifier: Arc::new(TracingNotifier),
            source: DataSource::default(),
            options: SyncOptions::default(),
            on_progress: None,
            pass_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn CustomFieldHook>) -> Self {
        self.hook = hook;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ErrorNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    #[must_use]
    pub fn source(&self) -> &DataSource {
        &self.source
    }

    #[must_use]
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    fn emit(&self, event: SyncProgress) {
        emit(self.on_progress.as_ref(), event);
    }

    /// Current padded request budget.
    ///
    /// # Errors
    ///
    /// Propagates any error from the rate-limit endpoint.
    pub async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        get_rate_limit_status(
            &self.client,
            &self.source.rate_limit_url,
            self.options.rate_padding,
        )
        .await
    }

    /// Run one pass. Never fails; everything that happened is in the report.
    pub async fn run_sync_pass(&self) -> PassReport {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            return self.skip_pass(PassOutcome::AlreadyRunning);
        };

        let Some(url_field) = self.schema.url_field() else {
            return self.skip_pass(PassOutcome::NoUrlField);
        };

        let budget = match self.rate_limit_status().await {
            Ok(budget) => budget,
            Err(err) => {
                return self.skip_pass(PassOutcome::RateLimitUnavailable(short_error_message(
                    &err,
                )));
            }
        };
        if budget.is_exhausted() {
            let mut report = self.skip_pass(PassOutcome::BudgetExhausted);
            report.budget = Some(budget);
            return report;
        }

        let scan = self.options.scan_limit.max(self.options.batch_cap);
        let candidates = match self.store.query_eligible(scan).await {
            Ok(ids) => ids,
            Err(err) => {
                return self.skip_pass(PassOutcome::StoreUnavailable(short_error_message(&err)));
            }
        };

        let mut report = PassReport::new(PassOutcome::Completed);
        report.budget = Some(budget);
        debug!(
            eligible = candidates.len(),
            remaining = budget.remaining,
            total = budget.total,
            "starting sync pass"
        );
        self.emit(SyncProgress::PassStarted {
            eligible: candidates.len(),
            budget,
        });

        for record in candidates {
            if report.records.len() >= self.options.batch_cap {
                self.emit(SyncProgress::BatchCapReached {
                    cap: self.options.batch_cap,
                });
                break;
            }

            let api_url = match self.resolve_api_url(record, url_field).await {
                Ok(url) => url,
                Err(reason) => {
                    debug!(record = %record, reason = %reason, "skipping record");
                    self.emit(SyncProgress::RecordSkipped {
                        record,
                        reason: reason.to_string(),
                    });
                    report.skipped.push((record, reason));
                    continue;
                }
            };

            let outcome = self.sync_resolved(record, &api_url).await;
            report.records.push((record, outcome));
        }

        debug!(
            synced = report.synced(),
            failed = report.failed(),
            skipped = report.skipped.len(),
            "sync pass complete"
        );
        self.emit(SyncProgress::PassComplete {
            synced: report.synced(),
            failed: report.failed(),
            skipped: report.skipped.len(),
        });
        report
    }

    /// Sync a single record immediately, outside the batch.
    ///
    /// # Errors
    ///
    /// - [`SyncError::RecordNotFound`] if the record does not exist
    /// - [`SyncError::FieldNotFound`] if its URL field is empty
    /// - [`SyncError::InvalidParameter`] if the URL is not a repository URL
    /// - the fetch error if the primary request fails (the notifier is
    ///   invoked as in a pass)
    pub async fn sync_record(&self, record: RecordId) -> Result<RecordOutcome> {
        let url_field = self
            .schema
            .url_field()
            .ok_or_else(|| SyncError::invalid_parameter("schema declares no URL field"))?;
        self.store.title(record).await?;

        let api_url = match self.resolve_api_url(record, url_field).await {
            Ok(url) => url,
            Err(SkipReason::MissingUrl) => {
                return Err(SyncError::FieldNotFound {
                    record,
                    field: url_field.name.clone(),
                });
            }
            Err(reason) => return Err(SyncError::invalid_parameter(reason.to_string())),
        };

        match self.sync_resolved(record, &api_url).await {
            RecordOutcome::Failed(err) => Err(err),
            synced => Ok(synced),
        }
    }

    fn skip_pass(&self, outcome: PassOutcome) -> PassReport {
        match outcome {
            PassOutcome::BudgetExhausted | PassOutcome::AlreadyRunning => {
                info!(reason = %outcome, "sync pass skipped");
            }
            _ => warn!(reason = %outcome, "sync pass skipped"),
        }
        self.emit(SyncProgress::PassSkipped {
            reason: outcome.to_string(),
        });
        PassReport::new(outcome)
    }

    async fn resolve_api_url(
        &self,
        record: RecordId,
        url_field: &FieldSpec,
    ) -> std::result::Result<String, SkipReason> {
        let value = self
            .store
            .get_field(record, &url_field.name)
            .await
            .map_err(|e| SkipReason::Unreadable(short_error_message(&e)))?;

        let raw = value.map(|v| v.to_string()).unwrap_or_default();
        if raw.trim().is_empty() {
            return Err(SkipReason::MissingUrl);
        }
        self.source
            .make_api_url(&raw)
            .map_err(|_| SkipReason::InvalidUrl(raw))
    }

    async fn sync_resolved(&self, record: RecordId, api_url: &str) -> RecordOutcome {
        self.emit(SyncProgress::SyncingRecord {
            record,
            api_url: api_url.to_string(),
        });

        let response = match self.client.get(api_url).await {
            Ok(response) => response,
            Err(err) => {
                warn!(record = %record, api_url, error = %err, "record sync failed");
                self.notify_failure(record, api_url, &err).await;
                self.emit(SyncProgress::RecordFailed {
                    record,
                    error: short_error_message(&err),
                });
                return RecordOutcome::Failed(err);
            }
        };

        let ctx = FieldContext {
            source_url: api_url,
            response: &response,
        };
        let fields = apply_fields(
            self.store.as_ref(),
            self.hook.as_ref(),
            record,
            &self.schema,
            &ctx,
        )
        .await;

        let enrichment = EnrichmentReport {
            contributors: self
                .enrichment_step(record, "contributors", self.enrich_contributors(record, &response))
                .await,
            readme: self
                .enrichment_step(record, "readme", self.enrich_readme(record, api_url, &response))
                .await,
        };

        if let Err(err) = self.store.touch_modified(record, Utc::now()).await {
            warn!(record = %record, error = %err, "failed to stamp record as synced");
        }

        self.emit(SyncProgress::RecordSynced {
            record,
            fields_written: fields.written(),
            fields_failed: fields.failed(),
        });
        RecordOutcome::Synced { fields, enrichment }
    }

    async fn enrichment_step(
        &self,
        record: RecordId,
        step: &'static str,
        work: impl Future<Output = Result<EnrichmentOutcome>>,
    ) -> EnrichmentOutcome {
        match work.await {
            Ok(outcome) => outcome,
            Err(err) => {
                let error = short_error_message(&err);
                warn!(record = %record, step, error = %error, "enrichment failed");
                self.emit(SyncProgress::EnrichmentFailed {
                    record,
                    step,
                    error: error.clone(),
                });
                EnrichmentOutcome::Failed(error)
            }
        }
    }

    /// One page of contributors; a full page is recorded as `"<page>+"`.
    async fn enrich_contributors(
        &self,
        record: RecordId,
        response: &Value,
    ) -> Result<EnrichmentOutcome> {
        let Some(url) = response.get("contributors_url").and_then(Value::as_str) else {
            return Ok(EnrichmentOutcome::Skipped("no contributors_url in response"));
        };

        let page_size = self.options.contributors_page_size;
        let url = format!("{url}?per_page={page_size}");
        let list = self.client.get(&url).await?;
        let count = list
            .as_array()
            .map(Vec::len)
            .ok_or_else(|| SyncError::invalid_json(&url, "expected an array of contributors"))?;

        let value = if count >= page_size {
            FieldValue::Text(format!("{page_size}+"))
        } else {
            FieldValue::Integer(i64::try_from(count).unwrap_or(i64::MAX))
        };
        self.store
            .upsert_field(record, CONTRIBUTORS_COUNT_FIELD, value.clone())
            .await?;
        Ok(EnrichmentOutcome::Updated(value))
    }

    async fn enrich_readme(
        &self,
        record: RecordId,
        api_url: &str,
        response: &Value,
    ) -> Result<EnrichmentOutcome> {
        let overridden = self
            .store
            .get_field(record, OVERRIDE_README_FIELD)
            .await?
            .is_some_and(|v| v.is_truthy());
        if overridden {
            return Ok(EnrichmentOutcome::Skipped("README is curated locally"));
        }

        let repo_url = response
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or(api_url)
            .trim_end_matches('/');
        let readme_url = format!("{repo_url}/readme");
        let body = self.client.get(&readme_url).await?;

        let encoded = body
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::invalid_json(&readme_url, "missing `content`"))?;
        // The API wraps base64 content at 60 columns.
        let compact: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| SyncError::invalid_json(&readme_url, format!("README is not base64: {e}")))?;

        let markdown = String::from_utf8_lossy(&bytes);
        let value = FieldValue::Text(rewrite_relative_images(&self.source, repo_url, &markdown));
        self.store
            .upsert_field(record, README_FIELD, value.clone())
            .await?;
        Ok(EnrichmentOutcome::Updated(value))
    }

    async fn notify_failure(&self, record: RecordId, api_url: &str, err: &SyncError) {
        let title = match self.store.title(record).await {
            Ok(title) => title,
            Err(title_err) => {
                debug!(record = %record, error = %title_err, "no title for failure notice");
                String::new()
            }
        };
        let failure = SyncFailure {
            record,
            title,
            api_url: Some(api_url.to_string()),
            kind: err.kind(),
            error: short_error_message(err),
        };
        self.notifier.on_sync_failure(&failure).await;
    }
}
