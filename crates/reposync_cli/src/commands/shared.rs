//! Wiring shared by the commands that talk to the API or the database.

use std::sync::Arc;

use reposync::fields::github_project_schema;
use reposync::hooks::{ErrorNotifier, FanoutNotifier, TracingNotifier, WebhookNotifier};
use reposync::sync::SyncProgress;
use reposync::{ApiClient, Orchestrator, RecordStore, SqlRecordStore};

use crate::config::Config;
use crate::progress::LoggingReporter;

/// Connect, apply pending migrations, and wrap the connection in a record store.
pub(crate) async fn open_store(
    database_url: &str,
) -> Result<Arc<SqlRecordStore>, Box<dyn std::error::Error>> {
    let db = reposync::connect_and_migrate(database_url).await?;
    Ok(Arc::new(SqlRecordStore::new(db)))
}

pub(crate) fn build_client(config: &Config) -> Result<ApiClient, reposync::SyncError> {
    ApiClient::new(&config.client_options(), Arc::new(config.credentials()))
}

/// Failures are always logged; the webhook is added when a URL is configured.
pub(crate) fn build_notifier(config: &Config, client: &ApiClient) -> Arc<dyn ErrorNotifier> {
    match &config.notify.webhook_url {
        Some(url) => Arc::new(FanoutNotifier::new(vec![
            Arc::new(TracingNotifier),
            Arc::new(WebhookNotifier::new(
                client.transport(),
                url.as_str(),
                config.notify.notify_failures,
            )),
        ])),
        None => {
            if config.notify.notify_failures {
                tracing::warn!("notify_failures is set but no webhook_url is configured");
            }
            Arc::new(TracingNotifier)
        }
    }
}

pub(crate) fn build_orchestrator(
    config: &Config,
    store: Arc<dyn RecordStore>,
) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let client = build_client(config)?;
    let notifier = build_notifier(config, &client);
    let reporter = LoggingReporter::new();

    Ok(Orchestrator::new(client, store, github_project_schema()?)
        .with_source(config.source.clone())
        .with_options(config.sync_options())
        .with_notifier(notifier)
        .with_progress(Box::new(move |event: SyncProgress| reporter.handle(event))))
}
