//! Query request types.

use crate::error::{QueryError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use strata_core::ServiceType;

/// Header carrying a non-zero analytics priority.
pub const PRIORITY_HEADER: &str = "Analytics-Priority";

/// A request the dispatcher can send to a node.
///
/// Implementations are immutable descriptions of one query. The dispatcher
/// borrows them for the duration of a call.
pub trait QueryRequest: Send + Sync {
    /// Service the request targets.
    fn service(&self) -> ServiceType;

    /// Full request URI given the service's base URL on the chosen node.
    fn uri(&self, base: &Url) -> Result<Url>;

    /// JSON request body.
    fn body(&self) -> Result<String>;

    /// Whether the request is free of server-side side effects.
    ///
    /// Decides between unambiguous and ambiguous timeouts.
    fn is_read_only(&self) -> bool;

    /// Scheduling priority. Zero means unset and emits no header.
    fn priority_value(&self) -> i32 {
        0
    }

    /// Server-side timeout, if the request carries its own.
    fn server_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Scan consistency for analytics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanConsistency {
    /// Return whatever is indexed now.
    #[default]
    NotBounded,
    /// Wait for all mutations up to the request time.
    RequestPlus,
}

impl ScanConsistency {
    fn as_str(&self) -> &'static str {
        match self {
            ScanConsistency::NotBounded => "not_bounded",
            ScanConsistency::RequestPlus => "request_plus",
        }
    }
}

/// An analytics query.
///
/// # Example
///
/// ```
/// use strata_client::AnalyticsRequest;
/// use serde_json::json;
///
/// let request = AnalyticsRequest::new("SELECT * FROM airlines WHERE country = $country")
///     .named_parameter("country", json!("France"))
///     .read_only(true)
///     .priority(-1);
///
/// let body = request.body_parameters();
/// assert_eq!(body["$country"], json!("France"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AnalyticsRequest {
    statement: Option<String>,
    named: Map<String, Value>,
    positional: Vec<Value>,
    client_context_id: Option<String>,
    timeout: Option<Duration>,
    scan_consistency: Option<ScanConsistency>,
    raw: Map<String, Value>,
    read_only: bool,
    priority: i32,
}

impl AnalyticsRequest {
    /// Create a request for a statement with a random client context id.
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: Some(statement.into()),
            client_context_id: Some(uuid::Uuid::new_v4().to_string()),
            ..Self::default()
        }
    }

    /// Create a request from a free-form parameter mapping.
    ///
    /// The mapping becomes the request body as-is.
    pub fn from_parameters(parameters: Map<String, Value>) -> Self {
        Self {
            raw: parameters,
            ..Self::default()
        }
    }

    /// Add a named parameter. A leading `$` is added if missing.
    #[must_use]
    pub fn named_parameter(mut self, name: impl AsRef<str>, value: Value) -> Self {
        let name = name.as_ref();
        let key = if name.starts_with('$') {
            name.to_string()
        } else {
            format!("${}", name)
        };
        self.named.insert(key, value);
        self
    }

    /// Append a positional parameter.
    #[must_use]
    pub fn positional_parameter(mut self, value: Value) -> Self {
        self.positional.push(value);
        self
    }

    /// Set the client context id.
    #[must_use]
    pub fn client_context_id(mut self, id: impl Into<String>) -> Self {
        self.client_context_id = Some(id.into());
        self
    }

    /// Set a server-side timeout. Also bounds the client-side deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the scan consistency.
    #[must_use]
    pub fn scan_consistency(mut self, consistency: ScanConsistency) -> Self {
        self.scan_consistency = Some(consistency);
        self
    }

    /// Set an arbitrary body parameter.
    #[must_use]
    pub fn raw(mut self, name: impl Into<String>, value: Value) -> Self {
        self.raw.insert(name.into(), value);
        self
    }

    /// Mark the request as read-only.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the scheduling priority. Zero clears it.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Shorthand for a raised priority (`-1`) or none (`0`).
    #[must_use]
    pub fn with_priority(self, prioritize: bool) -> Self {
        self.priority(if prioritize { -1 } else { 0 })
    }

    /// The statement, if the request was built from one.
    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    /// The client context id, if set.
    pub fn context_id(&self) -> Option<&str> {
        self.client_context_id.as_deref()
    }

    /// The body parameters as a JSON object.
    pub fn body_parameters(&self) -> Map<String, Value> {
        let mut body = self.raw.clone();

        if let Some(statement) = &self.statement {
            body.insert("statement".to_string(), Value::String(statement.clone()));
        }
        if let Some(id) = &self.client_context_id {
            body.insert("client_context_id".to_string(), Value::String(id.clone()));
        }
        if !self.positional.is_empty() {
            body.insert("args".to_string(), Value::Array(self.positional.clone()));
        }
        for (name, value) in &self.named {
            body.insert(name.clone(), value.clone());
        }
        if let Some(timeout) = self.timeout {
            body.insert(
                "timeout".to_string(),
                Value::String(format!("{}ms", timeout.as_millis())),
            );
        }
        if let Some(consistency) = self.scan_consistency {
            body.insert(
                "scan_consistency".to_string(),
                Value::String(consistency.as_str().to_string()),
            );
        }
        if self.read_only {
            body.insert("readonly".to_string(), Value::Bool(true));
        }

        body
    }
}

impl QueryRequest for AnalyticsRequest {
    fn service(&self) -> ServiceType {
        ServiceType::Analytics
    }

    fn uri(&self, base: &Url) -> Result<Url> {
        base.join("analytics/service")
            .map_err(|e| QueryError::InvalidUrl(format!("{}: {}", base, e)))
    }

    fn body(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.body_parameters())?)
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn priority_value(&self) -> i32 {
        self.priority
    }

    fn server_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
