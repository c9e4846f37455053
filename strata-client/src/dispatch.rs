//! Request dispatcher: builds the wire request, sends it, and maps transport
//! failures onto the timeout and cancellation kinds.

use crate::error::{QueryError, Result};
use crate::request::{PRIORITY_HEADER, QueryRequest};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Response, Url};
use std::fmt;
use std::time::Duration;
use strata_core::{ClusterOptions, CoreError, Node};
use tokio_util::sync::CancellationToken;

/// Sends query requests over a shared, pooled HTTP client.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    http: HttpClient,
    credentials: Option<(String, String)>,
}

impl Dispatcher {
    /// Build a dispatcher with an HTTP client configured from `options`.
    pub(crate) fn new(options: &ClusterOptions) -> Result<Self> {
        let mut builder = HttpClient::builder()
            .connect_timeout(options.connect_timeout())
            .pool_max_idle_per_host(options.max_http_connections_per_server);

        if let Some(keepalive) = options.tcp_keepalive() {
            builder = builder.tcp_keepalive(keepalive);
        }

        let http = builder.build().map_err(QueryError::Http)?;
        Ok(Self::from_client(http, options))
    }

    /// Wrap an existing HTTP client.
    pub(crate) fn from_client(http: HttpClient, options: &ClusterOptions) -> Self {
        Self {
            http,
            credentials: options
                .credentials()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
        }
    }

    /// Send `request` to `node` and wait for the response headers.
    ///
    /// `deadline` bounds the send-and-headers phase only. Cancellation of
    /// `token` or an elapsed deadline yields a timeout error whose kind
    /// follows the request's read-only flag.
    pub(crate) async fn send<R: QueryRequest + ?Sized>(
        &self,
        request: &R,
        node: &Node,
        deadline: Duration,
        token: &CancellationToken,
    ) -> Result<Response> {
        let service = request.service();
        let base = node
            .endpoint(service)
            .ok_or(CoreError::NoNodeAvailable(service))?;
        let uri = request.uri(base)?;
        let read_only = request.is_read_only();

        let mut builder = self
            .http
            .post(uri.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(request.body()?);

        if let Some((user, pass)) = &self.credentials {
            builder = builder.basic_auth(user, Some(pass));
        }

        let priority = request.priority_value();
        if priority != 0 {
            builder = builder.header(PRIORITY_HEADER, priority.to_string());
        }

        tracing::debug!(
            node = %node.hostname(),
            %uri,
            priority,
            read_only,
            "Dispatching query"
        );

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return Err(QueryError::timeout(
                    read_only,
                    format!("request to {} was cancelled", uri),
                ));
            }
            outcome = tokio::time::timeout(deadline, builder.send()) => outcome,
        };

        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(transport_error(e, read_only, &uri)),
            Err(_) => Err(QueryError::timeout(
                read_only,
                format!("no response from {} within {:?}", uri, deadline),
            )),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("authenticated", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

/// Read a non-success response body for classification.
///
/// `remaining` is whatever is left of the request deadline once headers
/// arrived; a body that stalls past it is a timeout like any other.
pub(crate) async fn read_body(
    response: Response,
    remaining: Duration,
    token: &CancellationToken,
    read_only: bool,
) -> Result<Bytes> {
    let uri = response.url().clone();

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(QueryError::timeout(
            read_only,
            format!("reading response from {} was cancelled", uri),
        )),
        body = tokio::time::timeout(remaining, response.bytes()) => match body {
            Ok(body) => body.map_err(|e| transport_error(e, read_only, &uri)),
            Err(_) => Err(QueryError::timeout(
                read_only,
                format!("response body from {} not received within {:?}", uri, remaining),
            )),
        },
    }
}

fn transport_error(err: reqwest::Error, read_only: bool, uri: &Url) -> QueryError {
    if err.is_timeout() {
        QueryError::timeout(read_only, format!("request to {} timed out: {}", uri, err))
    } else if err.is_builder() {
        QueryError::Http(err)
    } else {
        QueryError::RequestCanceled {
            message: format!("request to {} failed", uri),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AnalyticsRequest;
    use strata_core::ServiceType;

    #[test]
    fn test_debug_hides_credentials() {
        let options = ClusterOptions::builder()
            .servers(["http://127.0.0.1:8091"])
            .unwrap()
            .credentials("admin", "secret")
            .unwrap()
            .build()
            .unwrap();
        let dispatcher = Dispatcher::new(&options).unwrap();

        let debug = format!("{:?}", dispatcher);
        assert!(debug.contains("authenticated: true"));
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_no_node() {
        let dispatcher = Dispatcher::new(&ClusterOptions::default()).unwrap();
        let node = Node::new("views-only")
            .with_service_str(ServiceType::Views, "http://127.0.0.1:8092")
            .unwrap();

        let err = dispatcher
            .send(
                &AnalyticsRequest::new("SELECT 1"),
                &node,
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            QueryError::Core(CoreError::NoNodeAvailable(ServiceType::Analytics))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_token_before_send() {
        let dispatcher = Dispatcher::new(&ClusterOptions::default()).unwrap();
        let node = Node::new("a1")
            .with_service_str(ServiceType::Analytics, "http://127.0.0.1:8095")
            .unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let read_only = AnalyticsRequest::new("SELECT 1").read_only(true);
        let err = dispatcher
            .send(&read_only, &node, Duration::from_secs(1), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::UnambiguousTimeout(_)));

        let write = AnalyticsRequest::new("INSERT INTO ds ({'a': 1})");
        let err = dispatcher
            .send(&write, &node, Duration::from_secs(1), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::AmbiguousTimeout(_)));
    }
}
