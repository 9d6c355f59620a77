use chrono::{DateTime, Utc};
use reposync::fields::github_project_schema;
use reposync::repo_url::sanitize_url;
use reposync::{FieldValue, RecordStore, RecordSummary};

use crate::commands::OutputFormat;
use crate::commands::shared::{build_orchestrator, open_store};
use crate::commands::sync::describe_record;
use crate::config::Config;

/// Create a record for `url`, then sync it unless `no_sync` is set.
pub(crate) async fn handle_add(
    url: &str,
    title: Option<String>,
    no_sync: bool,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let api_url = config.source.make_api_url(url)?;

    let schema = github_project_schema()?;
    let url_field = schema
        .url_field()
        .ok_or("the project schema declares no URL field")?;

    let store = open_store(database_url).await?;
    let title = title.unwrap_or_else(|| default_title(&api_url));
    let id = store.create_record(&title).await?;
    store
        .upsert_field(id, &url_field.name, FieldValue::Text(sanitize_url(url)?))
        .await?;
    tracing::info!(record = %id, api_url = %api_url, "Record added");
    println!("Added {title} ({id})");

    if no_sync {
        return Ok(());
    }
    let orchestrator = build_orchestrator(config, store)?;
    match orchestrator.sync_record(id).await {
        Ok(outcome) => println!("{}", describe_record(id, &outcome)),
        // The record stays queued for the next pass.
        Err(err) => tracing::warn!(record = %id, error = %err, "Initial sync failed"),
    }
    Ok(())
}

/// Last path segment of the API URL, i.e. the repository name.
fn default_title(api_url: &str) -> String {
    api_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(api_url)
        .to_string()
}

/// A record row for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct RecordRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Last Updated")]
    pub modified_at: String,
    #[tabled(rename = "Last Synced")]
    pub synced_at: String,
}

impl From<RecordSummary> for RecordRow {
    fn from(summary: RecordSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            title: summary.title,
            modified_at: format_time(summary.modified_at),
            synced_at: summary
                .synced_at
                .map(format_time)
                .unwrap_or_else(|| "never".to_string()),
        }
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub(crate) async fn handle_list(
    limit: usize,
    output: OutputFormat,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(database_url).await?;
    let rows: Vec<RecordRow> = store
        .list_recent(limit)
        .await?
        .into_iter()
        .map(RecordRow::from)
        .collect();

    if rows.is_empty() {
        println!("No records yet. Add one with: reposync add <url>");
        return Ok(());
    }
    output.print(rows)?;
    Ok(())
}
