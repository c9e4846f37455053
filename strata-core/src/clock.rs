//! Clock provider for time abstraction.
//!
//! Service clients stamp their last-activity time through a clock so that
//! idle-connection checks can be tested with a mock clock instead of sleeps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Provider trait for wall-clock time.
pub trait ClockProvider: Send + Sync + std::fmt::Debug {
    /// Current system time as milliseconds since the UNIX epoch.
    fn system_time_millis(&self) -> u64;

    /// Advance time (mock-only; real clocks ignore it).
    fn advance(&self, duration: Duration);

    /// Check if this is a mock clock.
    fn is_mock(&self) -> bool;
}

/// Real clock backed by [`SystemTime`].
#[derive(Debug, Clone, Default)]
pub struct RealClock;

impl RealClock {
    /// Create a new real clock.
    pub fn new() -> Self {
        Self
    }
}

impl ClockProvider for RealClock {
    fn system_time_millis(&self) -> u64 {
        // A clock set before 1970 reads as the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn advance(&self, _duration: Duration) {}

    fn is_mock(&self) -> bool {
        false
    }
}

/// Mock clock that only moves when told to.
#[derive(Debug, Default)]
pub struct MockClock {
    system_time_millis: AtomicU64,
}

impl MockClock {
    /// Create a mock clock at the UNIX epoch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock clock fixed at an RFC 3339 timestamp.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_core::clock::{ClockProvider, MockClock};
    ///
    /// let clock = MockClock::fixed("2024-01-15T10:30:00Z").unwrap();
    /// assert_eq!(clock.system_time_millis(), 1_705_314_600_000);
    /// ```
    pub fn fixed(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        let dt = chrono::DateTime::parse_from_rfc3339(rfc3339)?;
        Ok(Self {
            system_time_millis: AtomicU64::new(dt.timestamp_millis().max(0) as u64),
        })
    }
}

impl ClockProvider for MockClock {
    fn system_time_millis(&self) -> u64 {
        self.system_time_millis.load(Ordering::SeqCst)
    }

    fn advance(&self, duration: Duration) {
        self.system_time_millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    fn is_mock(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_clock_is_after_epoch() {
        let clock = RealClock::new();
        assert!(clock.system_time_millis() > 1_600_000_000_000);
        assert!(!clock.is_mock());
    }

    #[test]
    fn mock_clock_does_not_advance_automatically() {
        let clock = MockClock::new();
        let t1 = clock.system_time_millis();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.system_time_millis(), t1);
    }

    #[test]
    fn mock_clock_advance() {
        let clock = MockClock::fixed("2024-01-15T10:30:00Z").unwrap();
        let t1 = clock.system_time_millis();

        clock.advance(Duration::from_secs(60));
        assert_eq!(clock.system_time_millis() - t1, 60_000);
    }

    #[test]
    fn mock_clock_rejects_bad_timestamp() {
        assert!(MockClock::fixed("yesterday").is_err());
    }
}
