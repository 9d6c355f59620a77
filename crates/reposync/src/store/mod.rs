//! Record storage seam.
//!
//! A record is an opaque id, a title, timestamps, and a set of named fields.
//! The pipeline only ever talks to [`RecordStore`]; [`MemoryRecordStore`] and
//! [`SqlRecordStore`] are the two shipped backends.

mod memory;
mod sql;
mod value;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::MemoryRecordStore;
pub use sql::SqlRecordStore;
pub use value::FieldValue;

pub type RecordId = Uuid;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Listing row for operator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current value of a field, `None` when unset.
    async fn get_field(&self, record: RecordId, name: &str) -> StoreResult<Option<FieldValue>>;

    /// Create or replace a field value.
    async fn upsert_field(&self, record: RecordId, name: &str, value: FieldValue)
    -> StoreResult<()>;

    async fn title(&self, record: RecordId) -> StoreResult<String>;

    async fn set_title(&self, record: RecordId, title: &str) -> StoreResult<()>;

    /// Stamp a successful sync: sets both the modification and sync times.
    async fn touch_modified(&self, record: RecordId, at: DateTime<Utc>) -> StoreResult<()>;

    /// Up to `limit` record ids, least recently modified first.
    async fn query_eligible(&self, limit: usize) -> StoreResult<Vec<RecordId>>;

    async fn create_record(&self, title: &str) -> StoreResult<RecordId>;

    /// Up to `limit` records, most recently modified first.
    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<RecordSummary>>;
}
