use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::{FieldValue, RecordId, RecordStore, RecordSummary, StoreResult};
use crate::entity::record::{self, Entity as Record};
use crate::entity::record_field::{self, Entity as RecordField};
use crate::error::StoreError;

/// Record store on a SeaORM connection (SQLite or Postgres).
///
/// Share it behind an `Arc`; a mock connection cannot be cloned.
#[derive(Debug)]
pub struct SqlRecordStore {
    db: DatabaseConnection,
}

impl SqlRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn ensure_exists(&self, id: RecordId) -> StoreResult<()> {
        Record::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|_| ())
            .ok_or(StoreError::RecordNotFound(id))
    }
}

fn summary(model: record::Model) -> RecordSummary {
    RecordSummary {
        id: model.id,
        title: model.title,
        created_at: model.created_at.with_timezone(&Utc),
        modified_at: model.modified_at.with_timezone(&Utc),
        synced_at: model.synced_at.map(|t| t.with_timezone(&Utc)),
    }
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn get_field(&self, record: RecordId, name: &str) -> StoreResult<Option<FieldValue>> {
        let Some(row) = RecordField::find_by_id((record, name.to_string()))
            .one(&self.db)
            .await?
        else {
            self.ensure_exists(record).await?;
            return Ok(None);
        };

        serde_json::from_value(row.value)
            .map(Some)
            .map_err(|e| StoreError::InvalidValue {
                field: name.to_string(),
                message: e.to_string(),
            })
    }

    async fn upsert_field(
        &self,
        record: RecordId,
        name: &str,
        value: FieldValue,
    ) -> StoreResult<()> {
        self.ensure_exists(record).await?;

        let json = serde_json::to_value(&value).map_err(|e| StoreError::InvalidValue {
            field: name.to_string(),
            message: e.to_string(),
        })?;
        let model = record_field::ActiveModel {
            record_id: Set(record),
            name: Set(name.to_string()),
            value: Set(json),
            updated_at: Set(Utc::now().fixed_offset()),
        };

        RecordField::insert(model)
            .on_conflict(
                OnConflict::columns([record_field::Column::RecordId, record_field::Column::Name])
                    .update_columns([record_field::Column::Value, record_field::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn title(&self, record: RecordId) -> StoreResult<String> {
        Record::find_by_id(record)
            .one(&self.db)
            .await?
            .map(|m| m.title)
            .ok_or(StoreError::RecordNotFound(record))
    }

    async fn set_title(&self, record: RecordId, title: &str) -> StoreResult<()> {
        let result = Record::update_many()
            .col_expr(record::Column::Title, Expr::value(title.to_string()))
            .filter(record::Column::Id.eq(record))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::RecordNotFound(record));
        }
        Ok(())
    }

    async fn touch_modified(&self, record: RecordId, at: DateTime<Utc>) -> StoreResult<()> {
        let at = at.fixed_offset();
        let result = Record::update_many()
            .col_expr(record::Column::ModifiedAt, Expr::value(at))
            .col_expr(record::Column::SyncedAt, Expr::value(Some(at)))
            .filter(record::Column::Id.eq(record))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::RecordNotFound(record));
        }
        Ok(())
    }

    async fn query_eligible(&self, limit: usize) -> StoreResult<Vec<RecordId>> {
        let ids = Record::find()
            .select_only()
            .column(record::Column::Id)
            .order_by_asc(record::Column::ModifiedAt)
            .order_by_asc(record::Column::Id)
            .limit(limit as u64)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;
        Ok(ids)
    }

    async fn create_record(&self, title: &str) -> StoreResult<RecordId> {
        let now = Utc::now().fixed_offset();
        let id = Uuid::new_v4();
        let model = record::ActiveModel {
            id: Set(id),
            title: Set(title.to_string()),
            created_at: Set(now),
            modified_at: Set(now),
            synced_at: Set(None),
        };
        Record::insert(model).exec_without_returning(&self.db).await?;
        Ok(id)
    }

    async fn list_recent(&self, limit: usize) -> StoreResult<Vec<RecordSummary>> {
        let rows = Record::find()
            .order_by_desc(record::Column::ModifiedAt)
            .order_by_asc(record::Column::Id)
            .limit(limit as u64)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(summary).collect())
    }
}


#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use super::*;
    use crate::db::connect_and_migrate;
    use chrono::Duration;

    async fn setup() -> SqlRecordStore {
        let db = connect_and_migrate("sqlite::memory:")
            .await
            .expect("test db should migrate");
        SqlRecordStore::new(db)
    }

    #[tokio::test]
    async fn field_values_keep_their_variant() {
        let store = setup().await;
        let id = store.create_record("tokio").await.expect("create");

        let values = [
            ("description", FieldValue::from("async runtime")),
            ("stars", FieldValue::Integer(25_000)),
            ("archived", FieldValue::Boolean(false)),
        ];
        for (name, value) in values.clone() {
            store.upsert_field(id, name, value).await.expect("upsert");
        }
        for (name, value) in values {
            assert_eq!(store.get_field(id, name).await.expect("get"), Some(value));
        }
        assert_eq!(store.get_field(id, "missing").await.expect("get"), None);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_value() {
        let store = setup().await;
        let id = store.create_record("tokio").await.expect("create");

        store.upsert_field(id, "stars", FieldValue::Integer(1)).await.expect("first");
        store.upsert_field(id, "stars", FieldValue::Integer(2)).await.expect("second");

        assert_eq!(
            store.get_field(id, "stars").await.expect("get"),
            Some(FieldValue::Integer(2))
        );
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let store = setup().await;
        let missing = Uuid::new_v4();

        assert!(matches!(
            store.upsert_field(missing, "stars", FieldValue::Integer(1)).await,
            Err(StoreError::RecordNotFound(_))
        ));
        assert!(matches!(
            store.get_field(missing, "stars").await,
            Err(StoreError::RecordNotFound(_))
        ));
        assert!(matches!(
            store.set_title(missing, "x").await,
            Err(StoreError::RecordNotFound(_))
        ));
        assert!(matches!(
            store.title(missing).await,
            Err(StoreError::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn touch_modified_reorders_eligibility() {
        let store = setup().await;
        let first = store.create_record("first").await.expect("create");
        let second = store.create_record("second").await.expect("create");

        let past = Utc::now() - Duration::days(1);
        store.touch_modified(second, past).await.expect("touch second");
        let future = Utc::now() + Duration::days(1);
        store.touch_modified(first, future).await.expect("touch first");

        assert_eq!(
            store.query_eligible(10).await.expect("query"),
            vec![second, first]
        );
        assert_eq!(store.query_eligible(1).await.expect("query"), vec![second]);

        let recent = store.list_recent(10).await.expect("list");
        assert_eq!(recent[0].id, first);
        assert!(recent[0].synced_at.is_some());
    }

    #[tokio::test]
    async fn set_title_updates_row() {
        let store = setup().await;
        let id = store.create_record("placeholder").await.expect("create");

        store.set_title(id, "serde").await.expect("set title");
        assert_eq!(store.title(id).await.expect("title"), "serde");
    }
}
