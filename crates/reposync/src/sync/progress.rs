//! Progress events emitted by a sync pass.
//!
//! The orchestrator never prints; callers subscribe with a
//! [`ProgressCallback`] and render events however they like.

use crate::rate_limit::RateLimitStatus;
use crate::store::RecordId;

/// Progress events emitted during a sync pass.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// The budget check passed and records were selected.
    PassStarted {
        /// Records returned by the eligibility query.
        eligible: usize,
        /// Padded request budget at the start of the pass.
        budget: RateLimitStatus,
    },

    /// The pass ended before touching any record.
    PassSkipped {
        /// Human-readable reason (budget exhausted, already running, ...).
        reason: String,
    },

    /// A record was passed over without spending a request.
    RecordSkipped {
        record: RecordId,
        /// Why the record was not synced.
        reason: String,
    },

    /// Fetching the primary payload of a record.
    SyncingRecord {
        record: RecordId,
        /// API URL being fetched.
        api_url: String,
    },

    /// A record was fetched and its fields applied.
    RecordSynced {
        record: RecordId,
        /// Fields written, including defaulted ones.
        fields_written: usize,
        /// Fields whose write failed.
        fields_failed: usize,
    },

    /// The primary fetch failed; the record keeps its previous values.
    RecordFailed {
        record: RecordId,
        /// Short error message.
        error: String,
    },

    /// A secondary request failed. The record still counts as synced.
    EnrichmentFailed {
        record: RecordId,
        /// Which enrichment step failed (`contributors` or `readme`).
        step: &'static str,
        /// Short error message.
        error: String,
    },

    /// The batch cap stopped the pass with records left over.
    BatchCapReached {
        /// Maximum records attempted per pass.
        cap: usize,
    },

    /// The pass finished.
    PassComplete {
        synced: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Callback for progress updates during a sync pass.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    #[test]
    fn emit_invokes_callback_per_event() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let callback: ProgressCallback = Box::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(Some(&callback), SyncProgress::BatchCapReached { cap: 30 });
        emit(
            Some(&callback),
            SyncProgress::PassComplete {
                synced: 2,
                failed: 1,
                skipped: 0,
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn emit_without_callback_is_a_no_op() {
        emit(
            None,
            SyncProgress::PassSkipped {
                reason: "budget exhausted".into(),
            },
        );
    }

    #[test]
    fn debug_output_names_the_record() {
        let event = SyncProgress::RecordFailed {
            record: Uuid::nil(),
            error: "HTTP 500".into(),
        };
        let debug_str = format!("{event:?}");
        assert!(debug_str.contains("RecordFailed"));
        assert!(debug_str.contains("00000000-0000-0000-0000-000000000000"));
    }
}
