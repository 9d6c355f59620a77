//! Error types shared by the sync pipeline.

use sea_orm::DbErr;
use thiserror::Error;

use crate::store::RecordId;

/// Coarse classification of a [`SyncError`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameter,
    RecordNotFound,
    FieldNotFound,
    HttpRequestFailed,
    InvalidJson,
    Store,
}

impl ErrorKind {
    /// Machine-readable identifier used in logs and notifications.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::RecordNotFound => "record_not_found",
            ErrorKind::FieldNotFound => "field_not_found",
            ErrorKind::HttpRequestFailed => "http_request_failed",
            ErrorKind::InvalidJson => "invalid_json",
            ErrorKind::Store => "store",
        }
    }
}

/// Errors raised while syncing a record against the remote API.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required argument was empty or malformed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The record does not exist in the store.
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    /// The record exists but a required field is unset.
    #[error("Field `{field}` not set on record {record}")]
    FieldNotFound { record: RecordId, field: String },

    /// Transport failure or a non-200 response.
    #[error("HTTP request to {url} failed: {message}")]
    HttpRequestFailed {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The body was not a non-empty JSON document.
    #[error("Invalid JSON from {url}: {message}")]
    InvalidJson { url: String, message: String },

    /// The record store rejected a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    #[inline]
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    #[inline]
    pub fn http(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::HttpRequestFailed {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    #[inline]
    pub fn invalid_json(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidJson {
            url: url.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::RecordNotFound(_) | Self::Store(StoreError::RecordNotFound(_)) => {
                ErrorKind::RecordNotFound
            }
            Self::FieldNotFound { .. } => ErrorKind::FieldNotFound,
            Self::HttpRequestFailed { .. } => ErrorKind::HttpRequestFailed,
            Self::InvalidJson { .. } => ErrorKind::InvalidJson,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    /// HTTP status of the failed response, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpRequestFailed { status, .. } => *status,
            _ => None,
        }
    }
}

/// Errors from a [`RecordStore`](crate::store::RecordStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Stored value for field `{field}` is unreadable: {message}")]
    InvalidValue { field: String, message: String },
}

/// Take the first line of an error message for compact log and table output.
#[must_use]
pub fn short_error_message(err: &impl std::fmt::Display) -> String {
    let full = err.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

pub type Result<T> = std::result::Result<T, SyncError>;
