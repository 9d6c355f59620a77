//! Options and report types for sync passes.

use std::fmt;

use crate::error::SyncError;
use crate::fields::FieldReport;
use crate::rate_limit::RateLimitStatus;
use crate::store::{FieldValue, RecordId};

/// Maximum records attempted per pass.
pub const DEFAULT_BATCH_CAP: usize = 30;

/// Requests held back from the reported remaining budget.
pub const DEFAULT_RATE_PADDING: u64 = 10;

/// Records examined per pass. Records without a usable URL are skipped
/// without counting toward the batch cap.
pub const DEFAULT_SCAN_LIMIT: usize = 100;

/// `per_page` for the contributors request; a full page is reported as `"100+"`.
pub const DEFAULT_CONTRIBUTORS_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub batch_cap: usize,
    pub scan_limit: usize,
    pub rate_padding: u64,
    pub contributors_page_size: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_cap: DEFAULT_BATCH_CAP,
            scan_limit: DEFAULT_SCAN_LIMIT,
            rate_padding: DEFAULT_RATE_PADDING,
            contributors_page_size: DEFAULT_CONTRIBUTORS_PAGE_SIZE,
        }
    }
}

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Records were processed (possibly zero).
    Completed,
    /// The padded budget was zero; nothing ran.
    BudgetExhausted,
    /// The rate-limit endpoint failed; nothing ran.
    RateLimitUnavailable(String),
    /// Another pass held the lock.
    AlreadyRunning,
    /// The schema has no URL field, so no record can be synced.
    NoUrlField,
    /// The eligibility query failed.
    StoreUnavailable(String),
}

impl fmt::Display for PassOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::BudgetExhausted => f.write_str("rate limit budget exhausted"),
            Self::RateLimitUnavailable(err) => write!(f, "rate limit unavailable: {err}"),
            Self::AlreadyRunning => f.write_str("another pass is already running"),
            Self::NoUrlField => f.write_str("schema declares no URL field"),
            Self::StoreUnavailable(err) => write!(f, "record store unavailable: {err}"),
        }
    }
}

/// Why a record was passed over without a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingUrl,
    InvalidUrl(String),
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUrl => f.write_str("no repository URL"),
            Self::InvalidUrl(url) => write!(f, "not a repository URL: {url}"),
            Self::Unreadable(err) => write!(f, "could not read URL field: {err}"),
        }
    }
}

/// Result of one enrichment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    Updated(FieldValue),
    Skipped(&'static str),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub contributors: EnrichmentOutcome,
    pub readme: EnrichmentOutcome,
}

#[derive(Debug)]
pub enum RecordOutcome {
    Synced {
        fields: FieldReport,
        enrichment: EnrichmentReport,
    },
    /// The primary fetch failed. No field was written.
    Failed(SyncError),
}

impl RecordOutcome {
    #[must_use]
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

/// Everything a pass did, in processing order.
#[derive(Debug)]
pub struct PassReport {
    pub outcome: PassOutcome,
    pub budget: Option<RateLimitStatus>,
    pub records: Vec<(RecordId, RecordOutcome)>,
    pub skipped: Vec<(RecordId, SkipReason)>,
}

impl PassReport {
    pub(crate) fn new(outcome: PassOutcome) -> Self {
        Self {
            outcome,
            budget: None,
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }

    #[must_use]
    pub fn synced(&self) -> usize {
        self.records.iter().filter(|(_, o)| o.is_synced()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.records.len() - self.synced()
    }

    #[must_use]
    pub fn outcome_for(&self, record: RecordId) -> Option<&RecordOutcome> {
        self.records
            .iter()
            .find(|(id, _)| *id == record)
            .map(|(_, outcome)| outcome)
    }
}
