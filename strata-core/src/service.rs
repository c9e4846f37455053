//! Cluster service types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A category of cluster functionality reachable on its own port and URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Cluster management REST interface.
    Management,
    /// Binary key-value protocol. Tracked for topology only.
    KeyValue,
    /// Map/reduce view service.
    Views,
    /// SQL++ query service.
    Query,
    /// Full-text search service.
    Search,
    /// Analytical query service.
    Analytics,
}

impl ServiceType {
    /// All service types in a stable order.
    pub const ALL: [ServiceType; 6] = [
        ServiceType::Management,
        ServiceType::KeyValue,
        ServiceType::Views,
        ServiceType::Query,
        ServiceType::Search,
        ServiceType::Analytics,
    ];

    /// Lowercase name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Management => "management",
            ServiceType::KeyValue => "kv",
            ServiceType::Views => "views",
            ServiceType::Query => "query",
            ServiceType::Search => "search",
            ServiceType::Analytics => "analytics",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
