//! Host callouts: the custom field hook and the failure notifier.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{ErrorKind, SyncError};
use crate::fields::{FieldContext, OVERRIDE_PREFIX};
use crate::http::{HttpRequest, HttpTransport};
use crate::store::{FieldValue, RecordId, RecordStore};

/// Decision returned by a [`CustomFieldHook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomFieldAction {
    /// Store this value (possibly transformed).
    Write(FieldValue),
    /// Leave the stored value alone.
    Skip,
}

/// Intercepts fields declared with `FieldKind::Custom`.
#[async_trait]
pub trait CustomFieldHook: Send + Sync {
    async fn on_custom_field(
        &self,
        record: RecordId,
        field: &str,
        value: FieldValue,
        ctx: &FieldContext<'_>,
    ) -> Result<CustomFieldAction, SyncError>;
}

/// Writes every custom field unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteThrough;

#[async_trait]
impl CustomFieldHook for WriteThrough {
    async fn on_custom_field(
        &self,
        _record: RecordId,
        _field: &str,
        value: FieldValue,
        _ctx: &FieldContext<'_>,
    ) -> Result<CustomFieldAction, SyncError> {
        Ok(CustomFieldAction::Write(value))
    }
}

/// Skips a custom field when the record's `override_<field>` flag is truthy.
///
/// This is how a user-curated description survives syncs.
#[derive(Clone)]
pub struct LocalOverrideHook {
    store: Arc<dyn RecordStore>,
}

impl LocalOverrideHook {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CustomFieldHook for LocalOverrideHook {
    async fn on_custom_field(
        &self,
        record: RecordId,
        field: &str,
        value: FieldValue,
        _ctx: &FieldContext<'_>,
    ) -> Result<CustomFieldAction, SyncError> {
        let flag = format!("{OVERRIDE_PREFIX}{field}");
        let overridden = self
            .store
            .get_field(record, &flag)
            .await?
            .is_some_and(|v| v.is_truthy());

        if overridden {
            debug!(record = %record, field, "local override set, keeping stored value");
            return Ok(CustomFieldAction::Skip);
        }
        Ok(CustomFieldAction::Write(value))
    }
}

/// Context handed to an [`ErrorNotifier`] when a record fails to sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub record: RecordId,
    pub title: String,
    pub api_url: Option<String>,
    #[serde(serialize_with = "serialize_kind")]
    pub kind: ErrorKind,
    pub error: String,
}

fn serialize_kind<S: serde::Serializer>(kind: &ErrorKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(kind.as_str())
}

impl SyncFailure {
    #[must_use]
    pub fn subject(&self) -> String {
        if self.title.is_empty() {
            format!("Sync failed for record {}", self.record)
        } else {
            format!("Sync failed for {}", self.title)
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        match &self.api_url {
            Some(url) => format!("{} ({url}): {}", self.record, self.error),
            None => format!("{}: {}", self.record, self.error),
        }
    }
}

/// Fire-and-forget alert for a failed record. Implementations swallow their
/// own errors.
#[async_trait]
pub trait ErrorNotifier: Send + Sync {
    async fn on_sync_failure(&self, failure: &SyncFailure);
}

/// Logs failures at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl ErrorNotifier for TracingNotifier {
    async fn on_sync_failure(&self, failure: &SyncFailure) {
        error!(
            record = %failure.record,
            title = %failure.title,
            api_url = failure.api_url.as_deref().unwrap_or(""),
            kind = failure.kind.as_str(),
            "{}",
            failure.error
        );
    }
}

/// POSTs `{"subject", "message", "failure"}` JSON to a webhook when enabled.
#[derive(Clone)]
pub struct WebhookNotifier {
    transport: Arc<dyn HttpTransport>,
    url: String,
    enabled: bool,
}

impl WebhookNotifier {
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>, enabled: bool) -> Self {
        Self {
            transport,
            url: url.into(),
            enabled,
        }
    }
}

#[async_trait]
impl ErrorNotifier for WebhookNotifier {
    async fn on_sync_failure(&self, failure: &SyncFailure) {
        if !self.enabled {
            debug!(record = %failure.record, "failure notifications disabled");
            return;
        }

        let payload = serde_json::json!({
            "subject": failure.subject(),
            "message": failure.message(),
            "failure": failure,
        });
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "failed to encode failure notification");
                return;
            }
        };

        let request = HttpRequest::post(self.url.as_str(), body)
            .with_header("Content-Type", "application/json");
        match self.transport.send(request).await {
            Ok(resp) if (200..300).contains(&resp.status) => {
                debug!(record = %failure.record, status = resp.status, "failure notification sent");
            }
            Ok(resp) => {
                warn!(record = %failure.record, status = resp.status, "failure webhook rejected notification");
            }
            Err(err) => {
                warn!(record = %failure.record, error = %err, "failure webhook unreachable");
            }
        }
    }
}

/// Forwards each failure to every inner notifier in order.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn ErrorNotifier>>,
}

impl FanoutNotifier {
    pub fn new(notifiers: Vec<Arc<dyn ErrorNotifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl ErrorNotifier for FanoutNotifier {
    async fn on_sync_failure(&self, failure: &SyncFailure) {
        for notifier in &self.notifiers {
            notifier.on_sync_failure(failure).await;
        }
    }
}
