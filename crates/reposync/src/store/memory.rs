use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{FieldValue, RecordId, RecordStore, RecordSummary, StoreResult};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct MemoryRecord {
    title: String,
    fields: BTreeMap<String, FieldValue>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    synced_at: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    fn summary(&self, id: RecordId) -> RecordSummary {
        RecordSummary {
            id,
            title: self.title.clone(),
            created_at: self.created_at,
            modified_at: self.modified_at,
            synced_at: self.synced_at,
        }
    }
}

/// Process-local store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<RecordId, MemoryRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record with an explicit modification time.
    pub async fn insert_record(
        &self,
        title: &str,
        modified_at: DateTime<Utc>,
        fields: impl IntoIterator<Item = (String, FieldValue)>,
    ) -> RecordId {
        let id = Uuid::new_v4();
        let record = MemoryRecord {
            title: title.to_string(),
            fields: fields.into_iter().collect(),
            created_at: modified_at,
            modified_at,
            synced_at: None,
        };
        self.records.lock().await.insert(id, record);
        id
    }

    /// All fields of a record, sorted by name.
    pub async fn fields(&self, record: RecordId) -> StoreResult<BTreeMap<String, FieldValue>> {
        self.records
            .lock()
            .await
            .get(&record)
            .map(|r| r.fields.clone())
            .ok_or(StoreError::RecordNotFound(record))
    }

    pub async fn summary(&self, record: RecordId) -> StoreResult<RecordSummary> {
        self.records
            .lock()
            .await
            .get(&record)
            .map(|r| r.summary(record))
            .ok_or(StoreError::RecordNotFound(record))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_field(&self, record: RecordId, name: &str) -> StoreResult<Option<FieldValue>> {
        let records = self.records.lock().await;
        let entry = records.get(&record).ok_or(StoreError::RecordNotFound(record))?;
        Ok(entry.fields.get(name).cloned())
    }

    async fn upsert_field(
        &self,
        record: RecordId,
        name: &str,
        value: FieldValue,
    ) -> StoreResult<()> {
        let mut records = self.records.lock().await;
        let entry = records
            .get_mut(&record)
            .ok_or(StoreError::RecordNotFound(record))?;
        entry.fields.insert(name.to_string(), value);
        Ok(())
    }

    async fn title(&self, record: RecordId) -> StoreResult<String> {
        let records = self.records.lock().await;
        records
            .get(&record)
            .map(|r| r.title.clone())
            .ok_or(StoreError::RecordNotFound(record))
    }

    async fn set_title(&self, record: RecordId, title: &str) -> StoreResult<()> {
        let mut records = self.records.lock().await;
        let entry = records
            .get_mut(&record)
            .ok_or(StoreError::RecordNotFound(record))?;
        entry.title = title.to_string();
        Ok(())
    }

    async fn touch_modified(&self, record: RecordId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut records = self.records.lock().await;
        let entry = records
            .get_mut(&record)
            .ok_or(StoreError::RecordNotFound(record))?;
        entry.modified_at = at;
        entry.synced_at = Some(at);
        Ok(())
    }

    async fn query_eligible(&self, limit: usize) -> StoreResult<Vec<RecordId>> {
        let records = self.records.lock().await;
        let mut ordered: Vec<(DateTime<Utc>, RecordId)> = records
            .iter()
            .map(|(id, r)| (r.modified_at, *id))
            .collect();
        ordered.sort();
        Ok(ordered.into_iter().take(limit).map(|(_, id)| id).collect())
    }

    async fn create_record(&self, title: &str) -> StoreResult<RecordId> {
        Ok(self.insert_record(title, Utc::now(), []).await)
    }

    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<RecordSummary>> {
        let records = self.records.lock().await;
        let mut rows: Vec<RecordSummary> =
            records.iter().map(|(id, r)| r.summary(*id)).collect();
        rows.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then(a.id.cmp(&b.id)));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn fields_round_trip_and_missing_record_errors() {
        let store = MemoryRecordStore::new();
        let id = store.create_record("serde").await.expect("create");

        assert_eq!(store.get_field(id, "stars").await.expect("get"), None);
        store
            .upsert_field(id, "stars", FieldValue::Integer(9000))
            .await
            .expect("upsert");
        store
            .upsert_field(id, "stars", FieldValue::Integer(9001))
            .await
            .expect("replace");
        assert_eq!(
            store.get_field(id, "stars").await.expect("get"),
            Some(FieldValue::Integer(9001))
        );

        let missing = Uuid::new_v4();
        let err = store
            .upsert_field(missing, "stars", FieldValue::Integer(1))
            .await
            .expect_err("unknown record");
        assert!(matches!(err, StoreError::RecordNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn query_eligible_returns_oldest_first_up_to_limit() {
        let store = MemoryRecordStore::new();
        let now = Utc::now();
        let newest = store.insert_record("new", now, []).await;
        let oldest = store.insert_record("old", now - Duration::days(3), []).await;
        let middle = store.insert_record("mid", now - Duration::days(1), []).await;

        assert_eq!(
            store.query_eligible(10).await.expect("query"),
            vec![oldest, middle, newest]
        );
        assert_eq!(store.query_eligible(2).await.expect("query"), vec![oldest, middle]);
    }

    #[tokio::test]
    async fn touch_modified_moves_record_to_back_of_queue() {
        let store = MemoryRecordStore::new();
        let now = Utc::now();
        let a = store.insert_record("a", now - Duration::hours(2), []).await;
        let b = store.insert_record("b", now - Duration::hours(1), []).await;

        store.touch_modified(a, now).await.expect("touch");
        assert_eq!(store.query_eligible(2).await.expect("query"), vec![b, a]);

        let summary = store.summary(a).await.expect("summary");
        assert_eq!(summary.synced_at, Some(now));
        assert_eq!(summary.modified_at, now);
    }

    #[tokio::test]
    async fn list_recent_is_newest_first() {
        let store = MemoryRecordStore::new();
        let now = Utc::now();
        store.insert_record("old", now - Duration::days(1), []).await;
        store.insert_record("new", now, []).await;

        let rows = store.list_recent(1).await.expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "new");
    }
}
