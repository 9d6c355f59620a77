//! Declarative field schema and JSON path lookup.
//!
//! A [`FieldSchema`] lists every field of a record type. Fields with a
//! `source_path` are populated from the API response by [`apply_fields`];
//! fields without one are form-only and never touched by sync.

mod mapper;

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::store::FieldValue;

pub use mapper::{FieldContext, FieldOutcome, FieldReport, apply_fields, parse_datetime};

/// Written by contributor enrichment: an integer, or `"100+"` at the page cap.
pub const CONTRIBUTORS_COUNT_FIELD: &str = "contributors_count";
/// Written by README enrichment.
pub const README_FIELD: &str = "readme";
/// Truthy when the README is curated locally and must not be fetched.
pub const OVERRIDE_README_FIELD: &str = "override_readme";
/// Prefix of the per-field flags honored by `LocalOverrideHook`.
pub const OVERRIDE_PREFIX: &str = "override_";

/// How an extracted value is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Plain,
    /// Parsed as a timestamp and stored as [`FieldValue::DateTime`].
    DateTime,
    /// Routed through the custom field hook instead of written directly.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub default: FieldValue,
    /// Colon-delimited path into the API response, e.g. `license:name`.
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub is_url_field: bool,
    #[serde(default)]
    pub is_title_field: bool,
}

impl FieldSpec {
    /// A form-only field, never written by sync.
    pub fn form(name: impl Into<String>, default: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            source_path: None,
            kind: FieldKind::Plain,
            is_url_field: false,
            is_title_field: false,
        }
    }

    /// A field populated from `path` in the API response.
    pub fn api(
        name: impl Into<String>,
        default: impl Into<FieldValue>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            source_path: Some(path.into()),
            ..Self::form(name, default)
        }
    }

    #[must_use]
    pub fn datetime(mut self) -> Self {
        self.kind = FieldKind::DateTime;
        self
    }

    #[must_use]
    pub fn custom(mut self) -> Self {
        self.kind = FieldKind::Custom;
        self
    }

    #[must_use]
    pub fn url_field(mut self) -> Self {
        self.is_url_field = true;
        self
    }

    #[must_use]
    pub fn title_field(mut self) -> Self {
        self.is_title_field = true;
        self
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.source_path.is_some()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field name must not be empty")]
    EmptyName,

    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("field `{field}` has an empty segment in source path `{path}`")]
    InvalidSourcePath { field: String, path: String },

    #[error("fields `{first}` and `{second}` are both marked as the URL field")]
    MultipleUrlFields { first: String, second: String },

    #[error("fields `{first}` and `{second}` are both marked as the title field")]
    MultipleTitleFields { first: String, second: String },
}

/// A validated field list: unique names, at most one URL and one title field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
    url_field: Option<usize>,
    title_field: Option<usize>,
}

impl FieldSchema {
    /// # Errors
    ///
    /// Returns a [`SchemaError`] describing the first invalid declaration.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        let mut url_field: Option<usize> = None;
        let mut title_field: Option<usize> = None;

        for (idx, spec) in fields.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateField(spec.name.clone()));
            }
            if let Some(path) = &spec.source_path
                && path.split(':').any(str::is_empty)
            {
                return Err(SchemaError::InvalidSourcePath {
                    field: spec.name.clone(),
                    path: path.clone(),
                });
            }
            if spec.is_url_field {
                if let Some(prev) = url_field {
                    return Err(SchemaError::MultipleUrlFields {
                        first: fields[prev].name.clone(),
                        second: spec.name.clone(),
                    });
                }
                url_field = Some(idx);
            }
            if spec.is_title_field {
                if let Some(prev) = title_field {
                    return Err(SchemaError::MultipleTitleFields {
                        first: fields[prev].name.clone(),
                        second: spec.name.clone(),
                    });
                }
                title_field = Some(idx);
            }
        }

        Ok(Self {
            fields,
            url_field,
            title_field,
        })
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    #[must_use]
    pub fn url_field(&self) -> Option<&FieldSpec> {
        self.url_field.map(|idx| &self.fields[idx])
    }

    #[must_use]
    pub fn title_field(&self) -> Option<&FieldSpec> {
        self.title_field.map(|idx| &self.fields[idx])
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }
}

/// Walk a colon-delimited path through objects and arrays.
///
/// A missing key, an out-of-range index, or a `null` at any step yields
/// `None`; the walk never descends further once a token is absent.
#[must_use]
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let (head, rest) = match path.split_once(':') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    let child = match value {
        Value::Object(map) => map.get(head)?,
        Value::Array(items) => items.get(head.parse::<usize>().ok()?)?,
        _ => return None,
    };
    if child.is_null() {
        return None;
    }

    match rest {
        Some(rest) => lookup_path(child, rest),
        None => Some(child),
    }
}

/// The stock schema for tracked GitHub repositories.
///
/// # Errors
///
/// Never fails for the built-in list; validation still runs so edits to it
/// are caught.
pub fn github_project_schema() -> Result<FieldSchema, SchemaError> {
    let fields = vec![
        FieldSpec::form("github_url", "").url_field(),
        FieldSpec::form("website", ""),
        FieldSpec::form("override_description", false),
        FieldSpec::form(OVERRIDE_README_FIELD, false),
        FieldSpec::form(README_FIELD, ""),
        FieldSpec::form(CONTRIBUTORS_COUNT_FIELD, ""),
        FieldSpec::api("github_id", "", "id"),
        FieldSpec::api("name", "", "name").title_field(),
        FieldSpec::api("full_name", "", "full_name"),
        FieldSpec::api("private", "", "private"),
        FieldSpec::api("html_url", "", "html_url"),
        FieldSpec::api("description", "", "description").custom(),
        FieldSpec::api("fork", "", "fork"),
        FieldSpec::api("url", "", "url"),
        FieldSpec::api("created_at", "", "created_at").datetime(),
        FieldSpec::api("updated_at", "", "updated_at").datetime(),
        FieldSpec::api("pushed_at", "", "pushed_at").datetime(),
        FieldSpec::api("git_url", "", "git_url"),
        FieldSpec::api("ssh_url", "", "ssh_url"),
        FieldSpec::api("homepage", "", "homepage"),
        FieldSpec::api("size", "", "size"),
        FieldSpec::api("stargazers_count", "", "stargazers_count"),
        FieldSpec::api("watchers_count", "", "watchers_count"),
        FieldSpec::api("language", "", "language"),
        FieldSpec::api("has_issues", "", "has_issues"),
        FieldSpec::api("has_projects", "", "has_projects"),
        FieldSpec::api("has_downloads", "", "has_downloads"),
        FieldSpec::api("has_wiki", "", "has_wiki"),
        FieldSpec::api("has_pages", "", "has_pages"),
        FieldSpec::api("forks_count", "", "forks_count"),
        FieldSpec::api("mirror_url", "", "mirror_url"),
        FieldSpec::api("archived", "", "archived"),
        FieldSpec::api("open_issues_count", "", "open_issues_count"),
        FieldSpec::api("license", "", "license:name"),
        FieldSpec::api("forks", "", "forks"),
        FieldSpec::api("open_issues", "", "open_issues"),
        FieldSpec::api("watchers", "", "watchers"),
        FieldSpec::api("default_branch", "master", "default_branch"),
        FieldSpec::api("network_count", "", "network_count"),
        FieldSpec::api("subscribers_count", "", "subscribers_count"),
    ];

    FieldSchema::new(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_walks_nested_objects() {
        let doc = json!({"license": {"name": "MIT", "spdx_id": "MIT"}});
        assert_eq!(lookup_path(&doc, "license:name"), Some(&json!("MIT")));
        assert_eq!(lookup_path(&doc, "license"), Some(&doc["license"]));
    }

    #[test]
    fn lookup_treats_null_and_missing_as_absent() {
        assert_eq!(lookup_path(&json!({"license": null}), "license:name"), None);
        assert_eq!(lookup_path(&json!({"license": null}), "license"), None);
        assert_eq!(lookup_path(&json!({}), "license:name"), None);
        assert_eq!(lookup_path(&json!({"license": "MIT"}), "license:name"), None);
    }

    #[test]
    fn lookup_indexes_arrays() {
        let doc = json!({"topics": ["rust", "serde"]});
        assert_eq!(lookup_path(&doc, "topics:1"), Some(&json!("serde")));
        assert_eq!(lookup_path(&doc, "topics:9"), None);
        assert_eq!(lookup_path(&doc, "topics:first"), None);
    }

    #[test]
    fn lookup_handles_deep_paths() {
        let doc = json!({"a": {"b": {"c": {"d": {"e": 5}}}}});
        assert_eq!(lookup_path(&doc, "a:b:c:d:e"), Some(&json!(5)));
    }

    #[test]
    fn schema_rejects_two_url_fields() {
        let err = FieldSchema::new(vec![
            FieldSpec::form("github_url", "").url_field(),
            FieldSpec::form("mirror", "").url_field(),
        ])
        .expect_err("two url fields");
        assert_eq!(
            err,
            SchemaError::MultipleUrlFields {
                first: "github_url".into(),
                second: "mirror".into()
            }
        );
    }

    #[test]
    fn schema_rejects_two_title_fields() {
        let err = FieldSchema::new(vec![
            FieldSpec::api("name", "", "name").title_field(),
            FieldSpec::api("full_name", "", "full_name").title_field(),
        ])
        .expect_err("two title fields");
        assert!(matches!(err, SchemaError::MultipleTitleFields { .. }));
    }

    #[test]
    fn schema_rejects_duplicates_and_bad_paths() {
        assert_eq!(
            FieldSchema::new(vec![
                FieldSpec::form("a", ""),
                FieldSpec::form("a", "")
            ]),
            Err(SchemaError::DuplicateField("a".into()))
        );
        assert!(matches!(
            FieldSchema::new(vec![FieldSpec::api("license", "", "license::name")]),
            Err(SchemaError::InvalidSourcePath { .. })
        ));
        assert_eq!(
            FieldSchema::new(vec![FieldSpec::form(" ", "")]),
            Err(SchemaError::EmptyName)
        );
    }

    #[test]
    fn schema_deserializes_from_config() {
        let spec: FieldSpec = serde_json::from_value(json!({
            "name": "license",
            "default": {"text": "none"},
            "source_path": "license:name"
        }))
        .expect("deserialize");
        assert_eq!(spec, FieldSpec::api("license", "none", "license:name"));
    }

    #[test]
    fn stock_schema_marks_url_and_title_fields() {
        let schema = github_project_schema().expect("stock schema is valid");
        assert_eq!(schema.url_field().map(|f| f.name.as_str()), Some("github_url"));
        assert_eq!(schema.title_field().map(|f| f.name.as_str()), Some("name"));
        assert_eq!(
            schema.get("description").map(|f| f.kind),
            Some(FieldKind::Custom)
        );
        assert_eq!(
            schema.get("license").and_then(|f| f.source_path.as_deref()),
            Some("license:name")
        );
        assert!(!schema.get(README_FIELD).expect("readme field").is_synced());
        assert_eq!(
            schema.fields().iter().filter(|f| f.kind == FieldKind::DateTime).count(),
            3
        );
    }
}
