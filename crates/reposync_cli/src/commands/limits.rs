use chrono::{DateTime, Utc};
use reposync::RateLimitStatus;
use reposync::rate_limit::get_rate_limit_status;

use crate::commands::OutputFormat;
use crate::commands::shared::build_client;
use crate::config::Config;

/// Rate limit information for display.
#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct RateLimitDisplay {
    #[tabled(rename = "Limit")]
    pub limit: u64,
    #[tabled(rename = "Available")]
    pub available: u64,
    #[tabled(rename = "Reserved")]
    pub reserved: u64,
    #[tabled(rename = "Resets At")]
    pub reset_at: String,
    #[tabled(rename = "Resets In")]
    pub reset_in: String,
}

impl RateLimitDisplay {
    pub(crate) fn new(status: &RateLimitStatus, padding: u64, now: DateTime<Utc>) -> Self {
        let (reset_at, reset_in) = match status.reset_at {
            Some(at) => {
                let remaining = at.signed_duration_since(now);
                let reset_in = if remaining.num_seconds() > 0 {
                    format_duration(remaining)
                } else {
                    "now".to_string()
                };
                (at.format("%Y-%m-%d %H:%M:%S UTC").to_string(), reset_in)
            }
            None => ("unknown".to_string(), "unknown".to_string()),
        };

        Self {
            limit: status.total,
            available: status.remaining,
            reserved: padding,
            reset_at,
            reset_in,
        }
    }
}

/// Print the padded request budget the next pass would see.
pub(crate) async fn handle_limits(
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_client(config)?;
    let padding = config.sync.rate_padding;
    let status = get_rate_limit_status(&client, &config.source.rate_limit_url, padding).await?;

    if status.is_exhausted() {
        tracing::warn!("Request budget exhausted; passes will be skipped until it resets");
    }
    output.print(vec![RateLimitDisplay::new(&status, padding, Utc::now())])?;
    Ok(())
}

/// Format a duration in a human-readable way.
fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds();
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        let (mins, secs) = (total_secs / 60, total_secs % 60);
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else {
        let (hours, mins) = (total_secs / 3600, (total_secs % 3600) / 60);
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    }
}
