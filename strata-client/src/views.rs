//! View service client.

use crate::classify::ResponseRules;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::result::QueryResult;
use crate::service::{self, HttpService};
use crate::view_query::ViewQuery;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use strata_core::{ClockProvider, ClusterContext, RealClock};
use tokio_util::sync::CancellationToken;

/// Client for the map/reduce view service.
#[derive(Debug, Clone)]
pub struct ViewClient {
    inner: Arc<HttpService>,
}

impl ViewClient {
    /// Create a client for the nodes in `context`.
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

    /// Execute a view query.
    pub async fn execute(&self, query: &ViewQuery) -> Result<QueryResult> {
        self.execute_with_cancellation(query, &CancellationToken::new())
            .await
    }

    /// Execute a view query that stops when `token` is cancelled.
    ///
    /// View queries are read-only, so cancellation and deadlines surface as
    /// unambiguous timeouts. Some other clients report every view timeout as
    /// ambiguous; this one intentionally applies the same read-only rule as
    /// analytics.
    pub async fn execute_with_cancellation(
        &self,
        query: &ViewQuery,
        token: &CancellationToken,
    ) -> Result<QueryResult> {
        let timeout = self.inner.context().options().view_timeout();

        let query = if query.has_connection_timeout() {
            Cow::Borrowed(query)
        } else {
            Cow::Owned(query.clone().connection_timeout(timeout))
        };

        self.inner
            .execute(query.as_ref(), ResponseRules::Views, timeout, token)
            .await
    }

    /// Execute a view query to completion on the calling thread.
    ///
    /// Must not be called from inside an async runtime.
    pub fn execute_blocking(&self, query: &ViewQuery) -> Result<QueryResult> {
        service::block_on(self.execute(query))
    }

    /// Milliseconds since the UNIX epoch of the last received response.
    pub fn last_activity(&self) -> Option<u64> {
        self.inner.last_activity()
    }

    /// Time since the last received response.
    pub fn idle_for(&self) -> Option<Duration> {
        self.inner.idle_for()
    }
}

/// One row of a view response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewRow<K, V> {
    /// Document id. Absent for reduced rows.
    #[serde(default)]
    pub id: Option<String>,
    /// Emitted key.
    pub key: K,
    /// Emitted value.
    pub value: V,
}

/// A per-node error reported alongside partial view results.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewRowError {
    /// Node that reported the error.
    #[serde(default)]
    pub from: String,
    /// Error reason.
    #[serde(default)]
    pub reason: String,
}

/// A decoded view response.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewRows<K, V> {
    /// Rows in the index. Absent for reduced queries.
    #[serde(default)]
    pub total_rows: Option<u64>,
    /// Result rows.
    #[serde(default = "Vec::new")]
    pub rows: Vec<ViewRow<K, V>>,
    /// Errors from individual nodes.
    #[serde(default)]
    pub errors: Vec<ViewRowError>,
}

impl QueryResult {
    /// Decode the body as a view response.
    pub async fn view_rows<K, V>(self) -> Result<ViewRows<K, V>>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
    {
        self.decode().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::QueryStream;
    use bytes::Bytes;
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_view_rows() {
        let body = json!({
            "total_rows": 7303,
            "rows": [
                { "id": "21st_amendment", "key": "21st Amendment", "value": null },
                { "id": "357", "key": "357", "value": 1 }
            ]
        });
        let result = QueryResult::success(
            StatusCode::OK,
            QueryStream::from_bytes(Bytes::from(body.to_string())),
        );

        let rows = result.view_rows::<String, Value>().await.unwrap();
        assert_eq!(rows.total_rows, Some(7303));
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(rows.rows[0].id.as_deref(), Some("21st_amendment"));
        assert_eq!(rows.rows[1].value, json!(1));
        assert!(rows.errors.is_empty());
    }

    #[tokio::test]
    async fn test_reduced_view_rows() {
        let body = json!({ "rows": [{ "key": null, "value": 42 }] });
        let result = QueryResult::success(
            StatusCode::OK,
            QueryStream::from_bytes(Bytes::from(body.to_string())),
        );

        let rows = result.view_rows::<Value, u64>().await.unwrap();
        assert_eq!(rows.total_rows, None);
        assert_eq!(rows.rows[0].id, None);
        assert_eq!(rows.rows[0].value, 42);
    }
}
