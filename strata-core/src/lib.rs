//! Cluster-side building blocks for the strata query client.
//!
//! This crate holds what the query dispatch layer consumes but does not own:
//!
//! - **Options**: credentials, per-service timeouts, ports, TLS and pooling flags
//! - **Connection strings**: `couchbase://host1,host2?key=value` parsing
//! - **Topology**: [`Node`]s tagged with the services they advertise, and a
//!   [`ClusterContext`] that picks a node for a service
//! - **Clock**: a mockable wall clock for last-activity bookkeeping
//! - **Logging**: `tracing-subscriber` setup for applications
//!
//! # Example
//!
//! ```
//! use strata_core::{ClusterContext, ClusterOptions, ServiceType};
//!
//! # fn example() -> strata_core::Result<()> {
//! let options = ClusterOptions::builder()
//!     .connection_string("couchbase://db1.example.com,db2.example.com")?
//!     .credentials("Administrator", "password")?
//!     .build()?;
//!
//! let context = ClusterContext::bootstrap(options)?;
//! let node = context.pick_node(ServiceType::Analytics)?;
//! println!("analytics node: {}", node);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod connection_string;
pub mod context;
pub mod error;
pub mod logging;
pub mod node;
pub mod options;
pub mod service;

pub use clock::{ClockProvider, MockClock, RealClock};
pub use connection_string::{ConnectionString, HostEntry, Scheme};
pub use context::ClusterContext;
pub use error::{CoreError, Result};
pub use node::Node;
pub use options::{ClusterOptions, ClusterOptionsBuilder, PortConfig, TimeoutConfig};
pub use service::ServiceType;
