//! Subscriber setup for applications embedding the client.
//!
//! The client crates only emit `tracing` events. [`init_tracing`] installs a
//! global subscriber configured from two variables:
//!
//! - `STRATA_LOG`: an `EnvFilter` directive, falling back to `RUST_LOG` and
//!   then `info`
//! - `STRATA_LOG_FORMAT`: `json`, `pretty` or `compact`; when unset, pretty
//!   on a terminal and JSON lines otherwise
//!
//! ```no_run
//! use strata_core::logging::{LogConfig, init_tracing};
//!
//! init_tracing(&LogConfig::from_env())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::error::CoreError;
use anyhow::Context;
use std::io::IsTerminal;
use std::str::FromStr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Filter directive variable.
pub const FILTER_VAR: &str = "STRATA_LOG";
/// Output format variable.
pub const FORMAT_VAR: &str = "STRATA_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// How events are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, fields flattened.
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

impl LogFormat {
    /// `Pretty` when stderr is a terminal, `Json` otherwise.
    pub fn detect() -> Self {
        if std::io::stderr().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(CoreError::Config(format!("unknown log format `{}`", other))),
        }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `warn,strata_client=debug`.
    pub filter: String,
}

impl LogConfig {
    /// Settings with an explicit format and filter.
    pub fn new(format: LogFormat, filter: impl Into<String>) -> Self {
        Self {
            format,
            filter: filter.into(),
        }
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    ///
    /// An unrecognised format is ignored in favour of [`LogFormat::detect`],
    /// and a blank filter counts as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = lookup(FORMAT_VAR)
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(LogFormat::detect);

        let filter = [FILTER_VAR, "RUST_LOG"]
            .into_iter()
            .filter_map(&lookup)
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        Self { format, filter }
    }
}

/// Install a global subscriber built from `config`.
///
/// An unparsable filter falls back to `info`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer().json().flatten_event(true).boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::new(LogFormat::Compact, "not a [valid filter");
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
