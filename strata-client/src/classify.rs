//! Response classification.
//!
//! Non-success responses are mapped to exactly one outcome: a retryable
//! result, or a fatal [`QueryError`]. Analytics responses are classified by
//! the numeric codes in their `errors` array, view responses by HTTP status
//! and the `error` field of the body.

use crate::codes;
use crate::error::{ErrorDetail, QueryError};
use reqwest::StatusCode;
use serde::Deserialize;

/// Outcome of classifying a non-success response.
#[derive(Debug)]
pub(crate) enum Classification {
    /// Transient condition; hand a retryable result back to the caller.
    Retry(Vec<ErrorDetail>),
    /// Fatal for this call.
    Failure(QueryError),
}

/// Which service's success and classification rules apply to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseRules {
    Analytics,
    Views,
}

impl ResponseRules {
    /// Whether `status` carries a result body.
    pub(crate) fn accepts(self, status: StatusCode) -> bool {
        match self {
            ResponseRules::Analytics => status == StatusCode::OK,
            ResponseRules::Views => status.is_success(),
        }
    }

    /// Classify a response that [`accepts`](Self::accepts) rejected.
    pub(crate) fn classify(self, status: StatusCode, body: &[u8], uri: &str) -> Classification {
        match self {
            ResponseRules::Analytics => classify_analytics(status, body),
            ResponseRules::Views => classify_view(status, body, uri),
        }
    }
}

/// A (predicate, outcome) pair. Rules are evaluated in order; first match wins.
struct Rule {
    matches: fn(u32) -> bool,
    build: fn(ErrorDetail) -> QueryError,
}

static ANALYTICS_RULES: [Rule; 13] = [
    Rule {
        matches: |c| c == codes::LINK_NOT_FOUND,
        build: QueryError::LinkNotFound,
    },
    Rule {
        matches: |c| c == codes::DATAVERSE_EXISTS,
        build: QueryError::DataverseExists,
    },
    Rule {
        matches: |c| c == codes::DATASET_EXISTS,
        build: QueryError::DatasetExists,
    },
    Rule {
        matches: |c| c == codes::DATAVERSE_NOT_FOUND,
        build: QueryError::DataverseNotFound,
    },
    Rule {
        matches: |c| codes::DATASET_NOT_FOUND_CODES.contains(&c),
        build: QueryError::DatasetNotFound,
    },
    Rule {
        matches: |c| c == codes::JOB_QUEUE_FULL,
        build: QueryError::JobQueueFull,
    },
    Rule {
        // Codes with a dedicated kind further down keep that kind.
        matches: |c| {
            codes::COMPILATION_RANGE.contains(&c)
                && !matches!(
                    c,
                    codes::PARSING_FAILURE | codes::INDEX_NOT_FOUND | codes::INDEX_EXISTS
                )
        },
        build: QueryError::CompilationFailure,
    },
    Rule {
        matches: |c| codes::INTERNAL_RANGE.contains(&c),
        build: QueryError::InternalServerFailure,
    },
    Rule {
        matches: |c| codes::AUTHENTICATION_RANGE.contains(&c),
        build: QueryError::AuthenticationFailure,
    },
    Rule {
        matches: |c| codes::SERVICE_STATE_RANGE.contains(&c),
        build: QueryError::TemporaryFailure,
    },
    Rule {
        matches: |c| c == codes::PARSING_FAILURE,
        build: QueryError::ParsingFailure,
    },
    Rule {
        matches: |c| c == codes::INDEX_NOT_FOUND,
        build: QueryError::IndexNotFound,
    },
    Rule {
        matches: |c| c == codes::INDEX_EXISTS,
        build: QueryError::IndexExists,
    },
];

#[derive(Debug, Deserialize)]
struct AnalyticsErrorBody {
    #[serde(default)]
    errors: Vec<AnalyticsErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct AnalyticsErrorEntry {
    code: u32,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    retriable: bool,
}

impl From<AnalyticsErrorEntry> for ErrorDetail {
    fn from(e: AnalyticsErrorEntry) -> Self {
        ErrorDetail {
            code: Some(e.code),
            message: e.msg,
            retriable: e.retriable,
        }
    }
}

fn is_retryable(detail: &ErrorDetail) -> bool {
    detail.retriable || detail.code.is_some_and(|c| codes::RETRYABLE.contains(&c))
}

fn generic_failure(status: StatusCode, body: &[u8]) -> QueryError {
    QueryError::Query {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

/// Classify a non-200 analytics response.
///
/// A retryable error anywhere in the payload wins over every fatal code.
pub(crate) fn classify_analytics(status: StatusCode, body: &[u8]) -> Classification {
    let errors: Vec<ErrorDetail> = match serde_json::from_slice::<AnalyticsErrorBody>(body) {
        Ok(parsed) => parsed.errors.into_iter().map(ErrorDetail::from).collect(),
        Err(_) => Vec::new(),
    };

    if errors.is_empty() {
        return Classification::Failure(generic_failure(status, body));
    }

    if errors.iter().any(is_retryable) {
        return Classification::Retry(errors);
    }

    for rule in &ANALYTICS_RULES {
        if let Some(detail) = errors.iter().find(|e| e.code.is_some_and(rule.matches)) {
            return Classification::Failure((rule.build)(detail.clone()));
        }
    }

    Classification::Failure(generic_failure(status, body))
}

/// HTTP statuses on which a view request is worth re-dispatching.
const VIEW_RETRY_STATUSES: [StatusCode; 9] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::CONFLICT,
    StatusCode::PRECONDITION_FAILED,
    StatusCode::RANGE_NOT_SATISFIABLE,
    StatusCode::EXPECTATION_FAILED,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Deserialize)]
struct ViewErrorBody {
    error: Option<String>,
    reason: Option<String>,
}

/// Classify a non-2xx view response.
pub(crate) fn classify_view(status: StatusCode, body: &[u8], uri: &str) -> Classification {
    let text = String::from_utf8_lossy(body);
    let parsed = serde_json::from_slice::<ViewErrorBody>(body).ok();

    let detail = match &parsed {
        Some(ViewErrorBody {
            error: Some(error),
            reason,
        }) => ErrorDetail::message(match reason {
            Some(reason) => format!("{}: {}", error, reason),
            None => error.clone(),
        }),
        _ => ErrorDetail::message(text.clone()),
    };

    let not_found = match &parsed {
        Some(ViewErrorBody { error: Some(e), .. }) => e == "not_found",
        _ => text.contains("not_found"),
    };

    if not_found {
        return Classification::Failure(QueryError::ViewNotFound {
            uri: uri.to_string(),
            detail,
        });
    }

    if VIEW_RETRY_STATUSES.contains(&status) {
        return Classification::Retry(vec![detail]);
    }

    Classification::Failure(generic_failure(status, body))
}
