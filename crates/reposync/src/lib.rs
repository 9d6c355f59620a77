//! Reposync - keeps locally stored project records in step with GitHub.
//!
//! Each record carries a repository URL. A sync pass checks the remaining API
//! budget, picks the least recently synced records, fetches their repository
//! metadata and writes the mapped fields back to the store.
//!
//! # Features
//!
//! - `sqlite` / `postgres` - Database backends for [`SqlRecordStore`].
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to create the schema on connection.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reposync::{
//!     ApiClient, ClientOptions, Orchestrator, SqlRecordStore, StaticCredentials,
//!     connect_and_migrate, fields::github_project_schema,
//! };
//!
//! let db = connect_and_migrate("sqlite://reposync.db?mode=rwc").await?;
//! let store = Arc::new(SqlRecordStore::new(db));
//! let client = ApiClient::new(&ClientOptions::default(), Arc::new(StaticCredentials::anonymous()))?;
//!
//! let report = Orchestrator::new(client, store, github_project_schema()?)
//!     .run_sync_pass()
//!     .await;
//! ```

pub mod client;
pub mod credentials;
pub mod db;
pub mod entity;
pub mod error;
pub mod fields;
pub mod hooks;
pub mod http;
pub mod markdown;
pub mod rate_limit;
pub mod repo_url;
pub mod store;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use client::{ApiClient, ClientOptions};
pub use credentials::{CredentialStore, Credentials, StaticCredentials};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use error::{ErrorKind, Result, StoreError, SyncError};
pub use fields::{FieldKind, FieldSchema, FieldSpec, SchemaError};
pub use hooks::{
    CustomFieldAction, CustomFieldHook, ErrorNotifier, FanoutNotifier, LocalOverrideHook,
    SyncFailure, TracingNotifier, WebhookNotifier, WriteThrough,
};
pub use http::{HttpError, HttpTransport};
pub use rate_limit::RateLimitStatus;
pub use repo_url::DataSource;
pub use store::{FieldValue, MemoryRecordStore, RecordId, RecordStore, RecordSummary, SqlRecordStore};
pub use sync::{Orchestrator, PassOutcome, PassReport, SyncOptions, SyncProgress};
