//! Shared plumbing behind the analytics and view clients.

use crate::classify::{Classification, ResponseRules};
use crate::dispatch::{self, Dispatcher};
use crate::error::{QueryError, Result};
use crate::request::QueryRequest;
use crate::result::{QueryResult, QueryStream};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use strata_core::{ClockProvider, ClusterContext};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Dispatcher, cluster context and last-activity bookkeeping for one client.
#[derive(Debug)]
pub(crate) struct HttpService {
    context: Arc<ClusterContext>,
    dispatcher: Dispatcher,
    clock: Arc<dyn ClockProvider>,
    /// Milliseconds since the UNIX epoch; zero until the first response.
    /// Stamps are clamped to at least 1 so a clock reading of epoch zero
    /// still counts as activity.
    last_activity: AtomicU64,
}

impl HttpService {
    pub(crate) fn new(
        context: Arc<ClusterContext>,
        dispatcher: Dispatcher,
        clock: Arc<dyn ClockProvider>,
    ) -> Self {
        Self {
            context,
            dispatcher,
            clock,
            last_activity: AtomicU64::new(0),
        }
    }

    pub(crate) fn context(&self) -> &ClusterContext {
        &self.context
    }

    fn touch(&self) {
        self.last_activity
            .store(self.clock.system_time_millis().max(1), Ordering::Relaxed);
    }

    pub(crate) fn last_activity(&self) -> Option<u64> {
        match self.last_activity.load(Ordering::Relaxed) {
            0 => None,
            millis => Some(millis),
        }
    }

    pub(crate) fn idle_for(&self) -> Option<Duration> {
        self.last_activity().map(|last| {
            Duration::from_millis(self.clock.system_time_millis().saturating_sub(last))
        })
    }

    /// Pick a node, send, and turn the response into a result or an error.
    ///
    /// The deadline covers both the wait for headers and the read of an
    /// error body. Last activity is stamped once a response has been
    /// received and classified. Cancellation and transport failures leave
    /// it untouched.
    pub(crate) async fn execute<R: QueryRequest + ?Sized>(
        &self,
        request: &R,
        rules: ResponseRules,
        deadline: Duration,
        token: &CancellationToken,
    ) -> Result<QueryResult> {
        let node = self.context.pick_node(request.service())?;
        let started = Instant::now();

        let response = match self
            .dispatcher
            .send(request, &node, deadline, token)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    node = %node.hostname(),
                    service = %request.service(),
                    error = %e,
                    "Query dispatch failed"
                );
                return Err(e);
            }
        };

        let status = response.status();
        if rules.accepts(status) {
            self.touch();
            return Ok(QueryResult::success(
                status,
                QueryStream::from_response(response),
            ));
        }

        let uri = response.url().to_string();
        let remaining = deadline.saturating_sub(started.elapsed());
        let body = dispatch::read_body(response, remaining, token, request.is_read_only()).await?;
        self.touch();

        match rules.classify(status, &body, &uri) {
            Classification::Retry(errors) => {
                tracing::debug!(
                    node = %node.hostname(),
                    status = status.as_u16(),
                    errors = errors.len(),
                    "Query returned a retryable result"
                );
                Ok(QueryResult::retry(status, errors))
            }
            Classification::Failure(e) => {
                tracing::warn!(
                    node = %node.hostname(),
                    status = status.as_u16(),
                    kind = ?e.kind(),
                    error = %e,
                    "Query failed"
                );
                Err(e)
            }
        }
    }
}

/// Run `future` to completion on a current-thread runtime owned by the
/// calling thread.
///
/// The runtime is dropped on return, so a successful body is read into
/// memory before it goes away.
pub(crate) fn block_on<F>(future: F) -> Result<QueryResult>
where
    F: Future<Output = Result<QueryResult>>,
{
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(QueryError::Runtime(io::Error::other(
            "blocking query called from inside an async runtime",
        )));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move { future.await?.buffered().await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{ClusterOptions, MockClock};

    fn service(clock: Arc<MockClock>) -> HttpService {
        let options = ClusterOptions::default();
        let dispatcher = Dispatcher::new(&options).unwrap();
        HttpService::new(Arc::new(ClusterContext::new(options)), dispatcher, clock)
    }

    #[test]
    fn test_last_activity_starts_unset() {
        let svc = service(Arc::new(MockClock::new()));
        assert_eq!(svc.last_activity(), None);
        assert_eq!(svc.idle_for(), None);
    }

    #[test]
    fn test_idle_for_tracks_clock() {
        let clock = Arc::new(MockClock::fixed("2024-01-15T10:30:00Z").unwrap());
        let svc = service(Arc::clone(&clock));

        svc.touch();
        assert_eq!(svc.last_activity(), Some(1_705_314_600_000));

        clock.advance(Duration::from_secs(30));
        assert_eq!(svc.idle_for(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_touch_at_epoch_counts_as_activity() {
        let clock = Arc::new(MockClock::new());
        let svc = service(Arc::clone(&clock));

        svc.touch();
        assert_eq!(svc.last_activity(), Some(1));

        clock.advance(Duration::from_millis(500));
        assert_eq!(svc.idle_for(), Some(Duration::from_millis(499)));
    }

    #[tokio::test]
    async fn test_block_on_inside_runtime_is_rejected() {
        let future = async {
            Ok::<_, QueryError>(QueryResult::retry(reqwest::StatusCode::OK, Vec::new()))
        };
        let err = block_on(future).unwrap_err();
        assert!(matches!(err, QueryError::Runtime(_)));
    }
}
