//! # Strata Client
//!
//! Query dispatch for a cluster's analytics and view HTTP services.
//!
//! A request is routed to a node advertising the service, sent as a JSON
//! `POST`, and the response is turned into one of three outcomes:
//!
//! - a successful [`QueryResult`] carrying a single-pass body stream
//! - a retryable [`QueryResult`] (`should_retry() == true`) for transient
//!   server conditions
//! - a [`QueryError`] whose [`ErrorKind`] names the failure
//!
//! Timeouts are split by the request's read-only flag: read-only requests
//! fail with [`QueryError::UnambiguousTimeout`], anything else with
//! [`QueryError::AmbiguousTimeout`]. Connection-level failures are
//! [`QueryError::RequestCanceled`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use strata_client::{AnalyticsClient, AnalyticsRequest, ErrorKind};
//! use strata_core::{ClusterContext, ClusterOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ClusterOptions::builder()
//!     .connection_string("couchbase://db1.example.com")?
//!     .credentials("Administrator", "password")?
//!     .build()?;
//! let client = AnalyticsClient::new(Arc::new(ClusterContext::bootstrap(options)?))?;
//!
//! let request = AnalyticsRequest::new("SELECT VALUE COUNT(*) FROM airlines")
//!     .read_only(true);
//!
//! match client.query(&request).await {
//!     Ok(result) if result.should_retry() => println!("transient: {:?}", result.errors()),
//!     Ok(result) => println!("{:?}", result.analytics_rows::<u64>().await?.results),
//!     Err(e) if e.kind() == ErrorKind::DatasetNotFound => println!("no such dataset"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analytics;
mod classify;
pub mod codes;
mod dispatch;
pub mod error;
pub mod request;
pub mod result;
mod service;
pub mod view_query;
pub mod views;

pub use analytics::{AnalyticsClient, AnalyticsMetrics, AnalyticsRows};
pub use error::{ErrorDetail, ErrorKind, QueryError, Result};
pub use request::{AnalyticsRequest, PRIORITY_HEADER, QueryRequest, ScanConsistency};
pub use result::{QueryResult, QueryStream};
pub use view_query::{OnError, StaleState, ViewQuery};
pub use views::{ViewClient, ViewRow, ViewRowError, ViewRows};
