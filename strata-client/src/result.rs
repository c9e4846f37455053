//! Query results and response body streams.

use crate::error::{ErrorDetail, QueryError, Result};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Single-pass stream over a successful response body.
///
/// Consumed by value; dropping it releases the underlying connection.
pub struct QueryStream {
    inner: BoxStream<'static, Result<Bytes>>,
}

impl QueryStream {
    pub(crate) fn from_response(response: Response) -> Self {
        let inner = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| QueryError::RequestCanceled {
                    message: "response body interrupted".to_string(),
                    source: e,
                })
            })
            .boxed();
        Self { inner }
    }

    pub(crate) fn from_bytes(bytes: Bytes) -> Self {
        Self {
            inner: stream::once(async move { Ok(bytes) }).boxed(),
        }
    }

    /// Read the remaining body into memory.
    pub async fn collect_bytes(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.inner.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Read the remaining body and deserialize it as JSON.
    pub async fn decode<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.collect_bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl Stream for QueryStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for QueryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryStream").finish_non_exhaustive()
    }
}

/// Outcome of a dispatched query that was not a fatal error.
///
/// Either a success carrying the body stream, or a retryable result carrying
/// the server's error entries. The stream is present exactly when the result
/// is a success.
#[derive(Debug)]
pub struct QueryResult {
    status: StatusCode,
    success: bool,
    should_retry: bool,
    errors: Vec<ErrorDetail>,
    data: Option<QueryStream>,
}

impl QueryResult {
    pub(crate) fn success(status: StatusCode, data: QueryStream) -> Self {
        Self {
            status,
            success: true,
            should_retry: false,
            errors: Vec::new(),
            data: Some(data),
        }
    }

    pub(crate) fn retry(status: StatusCode, errors: Vec<ErrorDetail>) -> Self {
        Self {
            status,
            success: false,
            should_retry: true,
            errors,
            data: None,
        }
    }

    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the query succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Whether the server reported a transient condition worth re-dispatching.
    pub fn should_retry(&self) -> bool {
        self.should_retry
    }

    /// Error entries of a retryable result. Empty on success.
    pub fn errors(&self) -> &[ErrorDetail] {
        &self.errors
    }

    /// Take the body stream. `None` for retryable results.
    pub fn into_stream(self) -> Option<QueryStream> {
        self.data
    }

    /// Read the whole body and deserialize it as JSON.
    pub async fn decode<T: DeserializeOwned>(self) -> Result<T> {
        match self.data {
            Some(stream) => stream.decode().await,
            None => Err(QueryError::InvalidResponse(format!(
                "retryable result (status {}) carries no data",
                self.status
            ))),
        }
    }

    /// Replace the body stream with an in-memory copy.
    pub(crate) async fn buffered(mut self) -> Result<Self> {
        if let Some(stream) = self.data.take() {
            let bytes = stream.collect_bytes().await?;
            self.data = Some(QueryStream::from_bytes(bytes));
        }
        Ok(self)
    }
}
