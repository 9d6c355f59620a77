//! Request budget lookup and client-side request pacing.

use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::{Result, SyncError};

/// Remaining request budget after the safety padding is subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub total: u64,
    pub remaining: u64,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitStatus {
    /// Apply `padding` to the reported figures. Never goes below zero.
    #[must_use]
    pub fn from_reported(limit: i64, remaining: i64, padding: u64) -> Self {
        let padding = i64::try_from(padding).unwrap_or(i64::MAX);
        Self {
            total: u64::try_from(limit).unwrap_or(0),
            remaining: u64::try_from(remaining.saturating_sub(padding)).unwrap_or(0),
            reset_at: None,
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    rate: RateResource,
}

#[derive(Debug, Deserialize)]
struct RateResource {
    limit: i64,
    remaining: i64,
    #[serde(default)]
    reset: Option<i64>,
}

/// Query the rate-limit endpoint and return the padded budget.
///
/// # Errors
///
/// Any error from [`ApiClient::get`], or [`SyncError::InvalidJson`] when the
/// body lacks `rate.limit` / `rate.remaining`.
pub async fn get_rate_limit_status(
    client: &ApiClient,
    url: &str,
    padding: u64,
) -> Result<RateLimitStatus> {
    let body = client.get(url).await?;
    let parsed: RateLimitBody =
        serde_json::from_value(body).map_err(|e| SyncError::invalid_json(url, e.to_string()))?;

    let mut status = RateLimitStatus::from_reported(parsed.rate.limit, parsed.rate.remaining, padding);
    status.reset_at = parsed
        .rate
        .reset
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0));
    Ok(status)
}

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Caps outbound requests per second, independent of the server budget.
#[derive(Clone)]
pub struct RequestPacer {
    inner: Arc<GovernorRateLimiter>,
}

impl RequestPacer {
    /// A zero rate is treated as one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}
