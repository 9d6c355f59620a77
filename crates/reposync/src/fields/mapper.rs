use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, warn};

use super::{FieldKind, FieldSchema, FieldSpec, lookup_path};
use crate::hooks::{CustomFieldAction, CustomFieldHook};
use crate::store::{FieldValue, RecordId, RecordStore};

/// What the custom field hook sees besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    /// API URL the response was fetched from.
    pub source_url: &'a str,
    /// The full primary response.
    pub response: &'a Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Value stored. `defaulted` is set when the source path was absent.
    Written { defaulted: bool },
    /// The custom field hook declined the write.
    Vetoed,
    Failed(String),
}

/// Per-field results of one [`apply_fields`] call, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldReport {
    pub outcomes: Vec<(String, FieldOutcome)>,
    pub title_updated: bool,
}

impl FieldReport {
    #[must_use]
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, FieldOutcome::Written { .. }))
    }

    #[must_use]
    pub fn vetoed(&self) -> usize {
        self.count(|o| matches!(o, FieldOutcome::Vetoed))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FieldOutcome::Failed(_)))
    }

    #[must_use]
    pub fn outcome(&self, field: &str) -> Option<&FieldOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&FieldOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Parse a timestamp in any of the shapes the API and users produce.
///
/// Accepts RFC 3339 (normalized to UTC), `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS`, a bare date, or integer Unix seconds.
///
/// # Errors
///
/// Returns a description of the rejected input.
pub fn parse_datetime(value: &FieldValue) -> Result<NaiveDateTime, String> {
    match value {
        FieldValue::DateTime(dt) => Ok(*dt),
        FieldValue::Integer(secs) => DateTime::from_timestamp(*secs, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| format!("timestamp {secs} is out of range")),
        FieldValue::Text(raw) => {
            let raw = raw.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Ok(dt.naive_utc());
            }
            for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
                    return Ok(dt);
                }
            }
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| format!("`{raw}` is not a recognized timestamp"))
        }
        FieldValue::Boolean(b) => Err(format!("boolean `{b}` is not a timestamp")),
    }
}

/// Extract every synced field of `schema` from `response` and write it.
///
/// Fields are independent: a failed write is recorded in the report and the
/// remaining fields are still attempted. Nothing is rolled back.
pub async fn apply_fields(
    store: &dyn RecordStore,
    hook: &dyn CustomFieldHook,
    record: RecordId,
    schema: &FieldSchema,
    ctx: &FieldContext<'_>,
) -> FieldReport {
    let mut report = FieldReport::default();

    for spec in schema.fields() {
        let Some(path) = spec.source_path.as_deref() else {
            continue;
        };

        let extracted = lookup_path(ctx.response, path).and_then(FieldValue::from_json);
        let defaulted = extracted.is_none();
        let value = extracted.unwrap_or_else(|| spec.default.clone());

        if spec.is_title_field && value != spec.default {
            match store.set_title(record, &value.to_string()).await {
                Ok(()) => report.title_updated = true,
                Err(err) => warn!(record = %record, field = %spec.name, error = %err, "failed to update title"),
            }
        }

        let outcome = write_field(store, hook, record, spec, value, defaulted, ctx).await;
        if let FieldOutcome::Failed(reason) = &outcome {
            warn!(record = %record, field = %spec.name, reason = %reason, "field not updated");
        }
        report.outcomes.push((spec.name.clone(), outcome));
    }

    debug!(
        record = %record,
        written = report.written(),
        vetoed = report.vetoed(),
        failed = report.failed(),
        "applied fields"
    );
    report
}

async fn write_field(
    store: &dyn RecordStore,
    hook: &dyn CustomFieldHook,
    record: RecordId,
    spec: &FieldSpec,
    value: FieldValue,
    defaulted: bool,
    ctx: &FieldContext<'_>,
) -> FieldOutcome {
    let value = match spec.kind {
        FieldKind::DateTime if !defaulted => match parse_datetime(&value) {
            Ok(dt) => FieldValue::DateTime(dt),
            Err(reason) => return FieldOutcome::Failed(reason),
        },
        _ => value,
    };

    let value = if spec.kind == FieldKind::Custom {
        match hook.on_custom_field(record, &spec.name, value, ctx).await {
            Ok(CustomFieldAction::Write(value)) => value,
            Ok(CustomFieldAction::Skip) => return FieldOutcome::Vetoed,
            Err(err) => return FieldOutcome::Failed(err.to_string()),
        }
    } else {
        value
    };

    match store.upsert_field(record, &spec.name, value).await {
        Ok(()) => FieldOutcome::Written { defaulted },
        Err(err) => FieldOutcome::Failed(err.to_string()),
    }
}
