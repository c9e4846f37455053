//! Error taxonomy for query dispatch.
//!
//! Every failure a caller can observe is one [`QueryError`] variant. Retryable
//! server conditions are not errors: they come back as a
//! [`QueryResult`](crate::QueryResult) with `should_retry() == true`.

use serde::{Deserialize, Serialize};
use std::fmt;
use strata_core::CoreError;
use thiserror::Error;

/// One error entry reported by a query service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Numeric service error code, when the service reports one.
    pub code: Option<u32>,
    /// Server-provided message.
    #[serde(alias = "msg")]
    pub message: String,
    /// Whether the server tagged this error as retriable.
    #[serde(default)]
    pub retriable: bool,
}

impl ErrorDetail {
    /// Create a detail with a numeric code.
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            retriable: false,
        }
    }

    /// Create a detail with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            retriable: false,
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Discriminant of a [`QueryError`], for branching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Analytics link does not exist.
    LinkNotFound,
    /// Dataverse already exists.
    DataverseExists,
    /// Dataset already exists.
    DatasetExists,
    /// Dataverse does not exist.
    DataverseNotFound,
    /// Dataset does not exist.
    DatasetNotFound,
    /// Service rejected the job at admission.
    JobQueueFull,
    /// Statement failed to compile.
    CompilationFailure,
    /// Server-side internal fault.
    InternalServerFailure,
    /// Credentials were rejected.
    AuthenticationFailure,
    /// Transient server fault not flagged as retriable.
    TemporaryFailure,
    /// Statement failed to parse.
    ParsingFailure,
    /// Index does not exist.
    IndexNotFound,
    /// Index already exists.
    IndexExists,
    /// View or design document does not exist.
    ViewNotFound,
    /// Deadline hit on a read-only request.
    UnambiguousTimeout,
    /// Deadline hit on a request that may have had side effects.
    AmbiguousTimeout,
    /// Connection-level failure before a response was received.
    RequestCanceled,
    /// Unrecognized non-success response.
    Query,
    /// Topology or configuration problem.
    Core,
    /// Response body could not be mapped.
    Deserialize,
    /// Response was well-formed JSON but not the expected shape.
    InvalidResponse,
    /// HTTP client or request construction failure.
    Http,
    /// Invalid endpoint or request URL.
    InvalidUrl,
    /// Runtime for a blocking call could not be created.
    Runtime,
}

/// Errors returned by the analytics and view clients.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Analytics link does not exist.
    #[error("Link not found: {0}")]
    LinkNotFound(ErrorDetail),

    /// Dataverse already exists.
    #[error("Dataverse already exists: {0}")]
    DataverseExists(ErrorDetail),

    /// Dataset already exists.
    #[error("Dataset already exists: {0}")]
    DatasetExists(ErrorDetail),

    /// Dataverse does not exist.
    #[error("Dataverse not found: {0}")]
    DataverseNotFound(ErrorDetail),

    /// Dataset does not exist.
    #[error("Dataset not found: {0}")]
    DatasetNotFound(ErrorDetail),

    /// Service rejected the job at admission.
    #[error("Job queue full: {0}")]
    JobQueueFull(ErrorDetail),

    /// Statement failed to compile.
    #[error("Compilation failure: {0}")]
    CompilationFailure(ErrorDetail),

    /// Server-side internal fault.
    #[error("Internal server failure: {0}")]
    InternalServerFailure(ErrorDetail),

    /// Credentials were rejected.
    #[error("Authentication failure: {0}")]
    AuthenticationFailure(ErrorDetail),

    /// Transient server fault not flagged as retriable.
    #[error("Temporary failure: {0}")]
    TemporaryFailure(ErrorDetail),

    /// Statement failed to parse.
    #[error("Parsing failure: {0}")]
    ParsingFailure(ErrorDetail),

    /// Index does not exist.
    #[error("Index not found: {0}")]
    IndexNotFound(ErrorDetail),

    /// Index already exists.
    #[error("Index already exists: {0}")]
    IndexExists(ErrorDetail),

    /// View or design document does not exist.
    #[error("View not found at {uri}: {detail}")]
    ViewNotFound {
        /// The view URI that was queried.
        uri: String,
        /// Server-provided error.
        detail: ErrorDetail,
    },

    /// Deadline or cancellation on a read-only request. Safe to retry.
    #[error("Unambiguous timeout: {0}")]
    UnambiguousTimeout(String),

    /// Deadline or cancellation on a request that may have taken effect.
    #[error("Ambiguous timeout: {0}")]
    AmbiguousTimeout(String),

    /// Connection-level failure; the request may not have reached the server.
    #[error("Request canceled: {message}")]
    RequestCanceled {
        /// Context for the failure.
        message: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Unrecognized non-success response.
    #[error("Query failed (status {status}): {body}")]
    Query {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Topology or configuration problem, including no node for the service.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Failed to deserialize a response body.
    #[error("Failed to deserialize response: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// Invalid response format.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// HTTP client or request construction failure.
    #[error("HTTP client error: {0}")]
    Http(reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to create the runtime backing a blocking call.
    #[error("Failed to start blocking runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl QueryError {
    /// Timeout error for a request, split on its read-only flag.
    pub(crate) fn timeout(read_only: bool, message: impl Into<String>) -> Self {
        if read_only {
            QueryError::UnambiguousTimeout(message.into())
        } else {
            QueryError::AmbiguousTimeout(message.into())
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::LinkNotFound(_) => ErrorKind::LinkNotFound,
            QueryError::DataverseExists(_) => ErrorKind::DataverseExists,
            QueryError::DatasetExists(_) => ErrorKind::DatasetExists,
            QueryError::DataverseNotFound(_) => ErrorKind::DataverseNotFound,
            QueryError::DatasetNotFound(_) => ErrorKind::DatasetNotFound,
            QueryError::JobQueueFull(_) => ErrorKind::JobQueueFull,
            QueryError::CompilationFailure(_) => ErrorKind::CompilationFailure,
            QueryError::InternalServerFailure(_) => ErrorKind::InternalServerFailure,
            QueryError::AuthenticationFailure(_) => ErrorKind::AuthenticationFailure,
            QueryError::TemporaryFailure(_) => ErrorKind::TemporaryFailure,
            QueryError::ParsingFailure(_) => ErrorKind::ParsingFailure,
            QueryError::IndexNotFound(_) => ErrorKind::IndexNotFound,
            QueryError::IndexExists(_) => ErrorKind::IndexExists,
            QueryError::ViewNotFound { .. } => ErrorKind::ViewNotFound,
            QueryError::UnambiguousTimeout(_) => ErrorKind::UnambiguousTimeout,
            QueryError::AmbiguousTimeout(_) => ErrorKind::AmbiguousTimeout,
            QueryError::RequestCanceled { .. } => ErrorKind::RequestCanceled,
            QueryError::Query { .. } => ErrorKind::Query,
            QueryError::Core(_) => ErrorKind::Core,
            QueryError::Deserialize(_) => ErrorKind::Deserialize,
            QueryError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            QueryError::Http(_) => ErrorKind::Http,
            QueryError::InvalidUrl(_) => ErrorKind::InvalidUrl,
            QueryError::Runtime(_) => ErrorKind::Runtime,
        }
    }

    /// The server error detail, for classified server failures.
    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            QueryError::LinkNotFound(d)
            | QueryError::DataverseExists(d)
            | QueryError::DatasetExists(d)
            | QueryError::DataverseNotFound(d)
            | QueryError::DatasetNotFound(d)
            | QueryError::JobQueueFull(d)
            | QueryError::CompilationFailure(d)
            | QueryError::InternalServerFailure(d)
            | QueryError::AuthenticationFailure(d)
            | QueryError::TemporaryFailure(d)
            | QueryError::ParsingFailure(d)
            | QueryError::IndexNotFound(d)
            | QueryError::IndexExists(d)
            | QueryError::ViewNotFound { detail: d, .. } => Some(d),
            _ => None,
        }
    }

    /// Whether this is one of the two timeout kinds.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            QueryError::UnambiguousTimeout(_) | QueryError::AmbiguousTimeout(_)
        )
    }

    /// Whether re-dispatching the same request cannot duplicate side effects.
    ///
    /// True for unambiguous timeouts, admission rejections and topology
    /// misses, where the request is known not to have executed. Ambiguous
    /// timeouts and canceled requests need idempotency checks first.
    pub fn is_retry_safe(&self) -> bool {
        matches!(
            self,
            QueryError::UnambiguousTimeout(_)
                | QueryError::JobQueueFull(_)
                | QueryError::Core(CoreError::NoNodeAvailable(_))
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ServiceType;

    #[test]
    fn test_timeout_split_on_read_only() {
        let err = QueryError::timeout(true, "deadline");
        assert_eq!(err.kind(), ErrorKind::UnambiguousTimeout);
        assert!(err.is_retry_safe());

        let err = QueryError::timeout(false, "deadline");
        assert_eq!(err.kind(), ErrorKind::AmbiguousTimeout);
        assert!(err.is_timeout());
        assert!(!err.is_retry_safe());
    }

    #[test]
    fn test_no_node_is_retry_safe() {
        let err = QueryError::from(CoreError::NoNodeAvailable(ServiceType::Analytics));
        assert_eq!(err.kind(), ErrorKind::Core);
        assert!(err.is_retry_safe());
        assert!(err.to_string().contains("analytics"));
    }

    #[test]
    fn test_error_display() {
        let err = QueryError::CompilationFailure(ErrorDetail::new(24001, "bad statement"));
        let display = err.to_string();
        assert!(display.contains("Compilation failure"));
        assert!(display.contains("24001"));
        assert!(display.contains("bad statement"));

        let err = QueryError::Query {
            status: 418,
            body: "teapot".to_string(),
        };
        assert!(err.to_string().contains("418"));
    }
}
