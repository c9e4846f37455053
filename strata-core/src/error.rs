//! Error types for cluster configuration and topology.

use crate::service::ServiceType;
use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while configuring a cluster or selecting a node.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No node in the current topology advertises the requested service.
    #[error("No node available for service {0}")]
    NoNodeAvailable(ServiceType),

    /// A builder argument was rejected.
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The connection string could not be parsed.
    #[error("Invalid connection string `{input}`: {reason}")]
    InvalidConnectionString {
        /// The raw connection string.
        input: String,
        /// Parse failure detail.
        reason: String,
    },

    /// A server or endpoint address is not a valid URL.
    #[error("Invalid URL `{input}`: {source}")]
    InvalidUrl {
        /// The raw address.
        input: String,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// Options failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        CoreError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}
