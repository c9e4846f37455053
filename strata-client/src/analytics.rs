//! Analytics service client.

use crate::classify::ResponseRules;
use crate::dispatch::Dispatcher;
use crate::error::{ErrorDetail, QueryError, Result};
use crate::request::{AnalyticsRequest, QueryRequest};
use crate::result::QueryResult;
use crate::service::{self, HttpService};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use strata_core::{ClockProvider, ClusterContext, RealClock};
use tokio_util::sync::CancellationToken;

/// Client for the analytics query service.
///
/// Cheap to clone; clones share the HTTP connection pool and the
/// last-activity timestamp.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use strata_client::{AnalyticsClient, AnalyticsRequest};
/// use strata_core::{ClusterContext, ClusterOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = ClusterOptions::builder()
///     .connection_string("couchbase://db1.example.com")?
///     .credentials("Administrator", "password")?
///     .build()?;
/// let client = AnalyticsClient::new(Arc::new(ClusterContext::bootstrap(options)?))?;
///
/// let result = client
///     .query(&AnalyticsRequest::new("SELECT VALUE 1").read_only(true))
///     .await?;
///
/// if result.should_retry() {
///     // back off and dispatch again
/// } else {
///     let rows = result.analytics_rows::<i64>().await?;
///     println!("{:?}", rows.results);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    inner: Arc<HttpService>,
}

impl AnalyticsClient {
    /// Create a client for the nodes in `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(context: Arc<ClusterContext>) -> Result<Self> {
        Self::with_clock(context, Arc::new(RealClock::new()))
    }

    /// Create a client that stamps last activity with `clock`.
    pub fn with_clock(
        context: Arc<ClusterContext>,
        clock: Arc<dyn ClockProvider>,
    ) -> Result<Self> {
        let dispatcher = Dispatcher::new(context.options())?;
        Ok(Self {
            inner: Arc::new(HttpService::new(context, dispatcher, clock)),
        })
    }

    /// Run a query.
    ///
    /// Transient server conditions come back as a result with
    /// [`should_retry`](QueryResult::should_retry) set; everything else that
    /// is not a success is an error.
    pub async fn query(&self, request: &AnalyticsRequest) -> Result<QueryResult> {
        self.query_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Run a query that stops when `token` is cancelled.
    ///
    /// Cancellation before the response arrives is reported as a timeout,
    /// unambiguous for read-only requests and ambiguous otherwise.
    pub async fn query_with_cancellation(
        &self,
        request: &AnalyticsRequest,
        token: &CancellationToken,
    ) -> Result<QueryResult> {
        let deadline = self.deadline(request);
        self.inner
            .execute(request, ResponseRules::Analytics, deadline, token)
            .await
    }

    /// Run a query to completion on the calling thread.
    ///
    /// The body of a successful result is read into memory before returning.
    /// Must not be called from inside an async runtime.
    pub fn query_blocking(&self, request: &AnalyticsRequest) -> Result<QueryResult> {
        service::block_on(self.query(request))
    }

    /// Milliseconds since the UNIX epoch of the last received response.
    pub fn last_activity(&self) -> Option<u64> {
        self.inner.last_activity()
    }

    /// Time since the last received response.
    pub fn idle_for(&self) -> Option<Duration> {
        self.inner.idle_for()
    }

    fn deadline(&self, request: &AnalyticsRequest) -> Duration {
        request
            .server_timeout()
            .unwrap_or_else(|| self.inner.context().options().analytics_timeout())
    }
}

/// Execution metrics reported with an analytics response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsMetrics {
    /// Total elapsed time, as reported (e.g. `"12.3ms"`).
    pub elapsed_time: String,
    /// Execution time, as reported.
    pub execution_time: String,
    /// Number of rows returned.
    pub result_count: u64,
    /// Size of the results in bytes.
    pub result_size: u64,
    /// Number of errors.
    pub error_count: u64,
    /// Number of warnings.
    pub warning_count: u64,
    /// Number of objects processed.
    pub processed_objects: u64,
}

/// A decoded analytics response.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsRows<T> {
    /// Server-assigned request id.
    #[serde(rename = "requestID", default)]
    pub request_id: Option<String>,
    /// Client context id echoed back by the server.
    #[serde(rename = "clientContextID", default)]
    pub client_context_id: Option<String>,
    /// Final request status, e.g. `success`.
    #[serde(default)]
    pub status: Option<String>,
    /// Result rows.
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    /// Execution metrics.
    #[serde(default)]
    pub metrics: Option<AnalyticsMetrics>,
    /// Non-fatal warnings.
    #[serde(default)]
    pub warnings: Vec<ErrorDetail>,
}

impl QueryResult {
    /// Decode the body as an analytics response with rows of type `T`.
    ///
    /// # Errors
    ///
    /// Fails on a retryable result, a body read failure, or rows that do not
    /// deserialize as `T`.
    pub async fn analytics_rows<T: DeserializeOwned>(self) -> Result<AnalyticsRows<T>> {
        let rows: AnalyticsRows<T> = self.decode().await?;
        if let Some(status) = rows.status.as_deref().filter(|s| *s != "success") {
            return Err(QueryError::InvalidResponse(format!(
                "analytics response status {}",
                status
            )));
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::QueryStream;
    use bytes::Bytes;
    use reqwest::StatusCode;
    use serde_json::json;

    fn result(body: serde_json::Value) -> QueryResult {
        QueryResult::success(
            StatusCode::OK,
            QueryStream::from_bytes(Bytes::from(body.to_string())),
        )
    }

    #[tokio::test]
    async fn test_analytics_rows_with_metadata() {
        let body = json!({
            "requestID": "req-1",
            "clientContextID": "ctx-1",
            "signature": { "*": "*" },
            "results": [{ "name": "a" }, { "name": "b" }],
            "status": "success",
            "metrics": {
                "elapsedTime": "12.5ms",
                "executionTime": "10.1ms",
                "resultCount": 2,
                "resultSize": 28,
                "processedObjects": 2
            },
            "warnings": [{ "code": 1001, "msg": "careful" }]
        });

        let rows = result(body)
            .analytics_rows::<serde_json::Value>()
            .await
            .unwrap();

        assert_eq!(rows.request_id.as_deref(), Some("req-1"));
        assert_eq!(rows.client_context_id.as_deref(), Some("ctx-1"));
        assert_eq!(rows.results.len(), 2);
        assert_eq!(rows.results[1]["name"], json!("b"));

        let metrics = rows.metrics.unwrap();
        assert_eq!(metrics.result_count, 2);
        assert_eq!(metrics.elapsed_time, "12.5ms");
        assert_eq!(metrics.error_count, 0);

        assert_eq!(rows.warnings, vec![ErrorDetail::new(1001, "careful")]);
    }

    #[tokio::test]
    async fn test_analytics_rows_typed() {
        let rows = result(json!({ "status": "success", "results": [1, 2, 3] }))
            .analytics_rows::<i64>()
            .await
            .unwrap();
        assert_eq!(rows.results, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_analytics_rows_rejects_non_success_status() {
        let err = result(json!({ "status": "timeout", "results": [] }))
            .analytics_rows::<i64>()
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidResponse(_)));
    }
}
