//! Error types and handling for hygiene-core operations.
//!
//! Every failure a build can hit is a variant of [`Error`]. The variants fall
//! into a small number of categories:
//!
//! - **Schema**: a raw dataset or authority listing breaks a structural rule
//! - **Identity**: identifier derivation would produce an unusable path
//! - **Configuration**: the authority listing and datasets disagree, or the
//!   build settings are invalid
//! - **Scheduling**: a scheduled build task failed and halted dispatch
//! - **Fetch**: the network or the dataset cache could not supply a document
//! - **I/O**: artifact writes and cache reads
//!
//! The core never retries. [`Error::is_recoverable`] exists so that callers
//! layering retry policy on top can tell transient failures apart:
//!
//! ```rust
//! use hygiene_core::Error;
//!
//! let err = Error::ReservedNameCollision { name: "com5".to_string() };
//! assert!(!err.is_recoverable());
//! assert_eq!(err.category(), "identity");
//! ```

use thiserror::Error;

/// The main error type for hygiene-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A raw dataset or listing broke a structural invariant.
    ///
    /// Fatal for the whole dataset: validation never accepts part of a
    /// dataset and never coerces an out-of-domain value.
    #[error("schema violation at {field}: {rule}")]
    SchemaViolation {
        /// Path of the offending field, e.g. `EstablishmentCollection[3].RatingKey`.
        field: String,
        /// Description of the rule that was broken.
        rule: String,
    },

    /// Identifier derivation produced a legacy reserved device name.
    #[error("'{name}' is a reserved device name and cannot be used as a path segment")]
    ReservedNameCollision {
        /// The encoded name that collided.
        name: String,
    },

    /// An authority code has no region mapping.
    ///
    /// Means the authority listing and the datasets are out of sync.
    #[error("authority code '{code}' has no region mapping")]
    UnknownRegionCode {
        /// The unmapped authority code.
        code: String,
    },

    /// A scheduled task failed and halted further dispatch.
    #[error("task {index} ({label}) failed: {source}")]
    TaskFailed {
        /// Input index of the failed task.
        index: usize,
        /// Human readable label of the task, e.g. an authority code.
        label: String,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A remote document answered with a non-success status.
    #[error("fetching '{url}' failed with HTTP {status}")]
    FetchStatus {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No cached copy exists and the fetch policy forbids the network.
    #[error("no cached dataset for key '{key}'")]
    CacheMiss {
        /// The cache key that was looked up.
        key: String,
    },

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL is malformed or cannot be used.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Shorthand for a [`Error::SchemaViolation`].
    pub fn schema(field: impl Into<String>, rule: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            rule: rule.into(),
        }
    }

    /// Check if the error might succeed when the operation is retried.
    ///
    /// Only transient network and I/O conditions qualify. Schema, identity
    /// and configuration errors are deterministic and never recoverable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::FetchStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            Self::TaskFailed { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Get the error category as a string identifier for log fields.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::SchemaViolation { .. } => "schema",
            Self::ReservedNameCollision { .. } => "identity",
            Self::UnknownRegionCode { .. } | Self::Config(_) => "config",
            Self::TaskFailed { .. } => "task",
            Self::Io(_) => "io",
            Self::Network(_) | Self::FetchStatus { .. } | Self::NotFound(_) => "fetch",
            Self::CacheMiss { .. } => "cache",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Follow `TaskFailed` wrappers down to the originating error.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::TaskFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_schema_violation_names_field_and_rule() {
        let err = Error::schema("EstablishmentCollection[2].RatingKey", "unknown rating key");
        assert_eq!(
            err.to_string(),
            "schema violation at EstablishmentCollection[2].RatingKey: unknown rating key"
        );
        assert_eq!(err.category(), "schema");
    }

    #[test]
    fn test_error_categories() {
        let cases = vec![
            (Error::schema("f", "r"), "schema"),
            (
                Error::ReservedNameCollision {
                    name: "aux".to_string(),
                },
                "identity",
            ),
            (
                Error::UnknownRegionCode {
                    code: "42".to_string(),
                },
                "config",
            ),
            (Error::Config("bad".to_string()), "config"),
            (Error::Io(io::Error::other("x")), "io"),
            (Error::NotFound("x".to_string()), "fetch"),
            (
                Error::CacheMiss {
                    key: "k".to_string(),
                },
                "cache",
            ),
            (Error::InvalidUrl("x".to_string()), "invalid_url"),
            (Error::Serialization("x".to_string()), "serialization"),
        ];

        for (err, expected) in cases {
            assert_eq!(err.category(), expected, "category of {err}");
        }
    }

    #[test]
    fn test_error_recoverability() {
        assert!(Error::Io(io::Error::new(io::ErrorKind::TimedOut, "slow")).is_recoverable());
        assert!(
            Error::FetchStatus {
                url: "https://example.org".to_string(),
                status: 503,
            }
            .is_recoverable()
        );
        assert!(
            !Error::FetchStatus {
                url: "https://example.org".to_string(),
                status: 400,
            }
            .is_recoverable()
        );
        assert!(!Error::schema("f", "r").is_recoverable());
        assert!(
            !Error::UnknownRegionCode {
                code: "1".to_string()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_task_failed_exposes_root_cause() {
        let err = Error::TaskFailed {
            index: 3,
            label: "authority 999".to_string(),
            source: Box::new(Error::UnknownRegionCode {
                code: "999".to_string(),
            }),
        };

        assert_eq!(err.category(), "task");
        assert!(matches!(err.root(), Error::UnknownRegionCode { code } if code == "999"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("task 3 (authority 999) failed"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        match err {
            Error::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("expected Io, got {other:?}"),
        }
    }
}
