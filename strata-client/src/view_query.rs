//! Map/reduce view queries.

use crate::error::{QueryError, Result};
use crate::request::QueryRequest;
use reqwest::Url;
use serde_json::{Value, json};
use std::time::Duration;
use strata_core::ServiceType;

/// Index staleness accepted by a view query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleState {
    /// Update the index before answering.
    False,
    /// Answer from the index as it is.
    Ok,
    /// Answer from the index, then trigger an update.
    UpdateAfter,
}

impl StaleState {
    fn as_str(&self) -> &'static str {
        match self {
            StaleState::False => "false",
            StaleState::Ok => "ok",
            StaleState::UpdateAfter => "update_after",
        }
    }
}

/// What a view query does when a node reports an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    /// Keep going and report partial results.
    Continue,
    /// Stop at the first error.
    Stop,
}

impl OnError {
    fn as_str(&self) -> &'static str {
        match self {
            OnError::Continue => "continue",
            OnError::Stop => "stop",
        }
    }
}

/// A query against a view in a design document.
///
/// View queries never have side effects, so a timed-out view query is always
/// reported as an unambiguous timeout.
///
/// # Example
///
/// ```
/// use strata_client::{StaleState, ViewQuery};
/// use serde_json::json;
///
/// let query = ViewQuery::new("beer-sample", "beer", "by_name")
///     .stale(StaleState::False)
///     .start_key(json!("a"))
///     .end_key(json!("b"))
///     .limit(10);
/// ```
#[derive(Debug, Clone)]
pub struct ViewQuery {
    bucket: String,
    design_doc: String,
    view_name: String,
    development: bool,
    stale: Option<StaleState>,
    limit: Option<u32>,
    skip: Option<u32>,
    descending: Option<bool>,
    key: Option<Value>,
    keys: Option<Vec<Value>>,
    start_key: Option<Value>,
    end_key: Option<Value>,
    inclusive_end: Option<bool>,
    group: Option<bool>,
    group_level: Option<u32>,
    reduce: Option<bool>,
    full_set: Option<bool>,
    on_error: Option<OnError>,
    connection_timeout: Option<Duration>,
}

impl ViewQuery {
    /// Create a query for `bucket/_design/design_doc/_view/view_name`.
    pub fn new(
        bucket: impl Into<String>,
        design_doc: impl Into<String>,
        view_name: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            design_doc: design_doc.into(),
            view_name: view_name.into(),
            development: false,
            stale: None,
            limit: None,
            skip: None,
            descending: None,
            key: None,
            keys: None,
            start_key: None,
            end_key: None,
            inclusive_end: None,
            group: None,
            group_level: None,
            reduce: None,
            full_set: None,
            on_error: None,
            connection_timeout: None,
        }
    }

    /// Query the development copy of the design document.
    #[must_use]
    pub fn development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }

    /// Set the accepted staleness.
    #[must_use]
    pub fn stale(mut self, stale: StaleState) -> Self {
        self.stale = Some(stale);
        self
    }

    /// Limit the number of rows.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip rows before returning.
    #[must_use]
    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Return rows in descending key order.
    #[must_use]
    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = Some(descending);
        self
    }

    /// Only return rows with this key.
    #[must_use]
    pub fn key(mut self, key: Value) -> Self {
        self.key = Some(key);
        self
    }

    /// Only return rows with one of these keys. Sent in the request body.
    #[must_use]
    pub fn keys(mut self, keys: Vec<Value>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Start of the key range.
    #[must_use]
    pub fn start_key(mut self, key: Value) -> Self {
        self.start_key = Some(key);
        self
    }

    /// End of the key range.
    #[must_use]
    pub fn end_key(mut self, key: Value) -> Self {
        self.end_key = Some(key);
        self
    }

    /// Whether the end key is included.
    #[must_use]
    pub fn inclusive_end(mut self, inclusive: bool) -> Self {
        self.inclusive_end = Some(inclusive);
        self
    }

    /// Group reduce results by key.
    #[must_use]
    pub fn group(mut self, group: bool) -> Self {
        self.group = Some(group);
        self
    }

    /// Group reduce results by a key prefix of this length.
    #[must_use]
    pub fn group_level(mut self, level: u32) -> Self {
        self.group_level = Some(level);
        self
    }

    /// Run the reduce function.
    #[must_use]
    pub fn reduce(mut self, reduce: bool) -> Self {
        self.reduce = Some(reduce);
        self
    }

    /// Query the full cluster data set.
    #[must_use]
    pub fn full_set(mut self, full_set: bool) -> Self {
        self.full_set = Some(full_set);
        self
    }

    /// Set the error policy.
    #[must_use]
    pub fn on_error(mut self, on_error: OnError) -> Self {
        self.on_error = Some(on_error);
        self
    }

    /// Server-side connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    pub(crate) fn has_connection_timeout(&self) -> bool {
        self.connection_timeout.is_some()
    }

    /// The bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Design document name, including the `dev_` prefix in development mode.
    pub fn design_doc_name(&self) -> String {
        if self.development && !self.design_doc.starts_with("dev_") {
            format!("dev_{}", self.design_doc)
        } else {
            self.design_doc.clone()
        }
    }

    /// The view name.
    pub fn view_name(&self) -> &str {
        &self.view_name
    }

    fn query_pairs(&self) -> Result<Vec<(&'static str, String)>> {
        let mut pairs = Vec::new();

        if let Some(stale) = self.stale {
            pairs.push(("stale", stale.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("skip", skip.to_string()));
        }
        if let Some(descending) = self.descending {
            pairs.push(("descending", descending.to_string()));
        }
        if let Some(key) = &self.key {
            pairs.push(("key", serde_json::to_string(key)?));
        }
        if let Some(start) = &self.start_key {
            pairs.push(("startkey", serde_json::to_string(start)?));
        }
        if let Some(end) = &self.end_key {
            pairs.push(("endkey", serde_json::to_string(end)?));
        }
        if let Some(inclusive) = self.inclusive_end {
            pairs.push(("inclusive_end", inclusive.to_string()));
        }
        if let Some(group) = self.group {
            pairs.push(("group", group.to_string()));
        }
        if let Some(level) = self.group_level {
            pairs.push(("group_level", level.to_string()));
        }
        if let Some(reduce) = self.reduce {
            pairs.push(("reduce", reduce.to_string()));
        }
        if let Some(full_set) = self.full_set {
            pairs.push(("full_set", full_set.to_string()));
        }
        if let Some(on_error) = self.on_error {
            pairs.push(("on_error", on_error.as_str().to_string()));
        }
        if let Some(timeout) = self.connection_timeout {
            pairs.push(("connection_timeout", timeout.as_millis().to_string()));
        }

        Ok(pairs)
    }
}

impl QueryRequest for ViewQuery {
    fn service(&self) -> ServiceType {
        ServiceType::Views
    }

    fn uri(&self, base: &Url) -> Result<Url> {
        let mut path = format!(
            "{}/_design/{}/_view/{}",
            urlencoding::encode(&self.bucket),
            urlencoding::encode(&self.design_doc_name()),
            urlencoding::encode(&self.view_name)
        );

        let pairs = self.query_pairs()?;
        if !pairs.is_empty() {
            let query: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            path = format!("{}?{}", path, query.join("&"));
        }

        base.join(&path)
            .map_err(|e| QueryError::InvalidUrl(format!("{}{}: {}", base, path, e)))
    }

    fn body(&self) -> Result<String> {
        let body = match &self.keys {
            Some(keys) => json!({ "keys": keys }),
            None => json!({}),
        };
        Ok(body.to_string())
    }

    fn is_read_only(&self) -> bool {
        true
    }
}
