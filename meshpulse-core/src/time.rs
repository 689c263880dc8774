//! Time management for mesh nodes
//!
//! The cadence engine never reads a hardware timer directly. All timing goes
//! through the [`TimeSource`] trait so the host can supply whatever clock the
//! platform has (tick counter, RTC, OS monotonic clock) and so tests can
//! advance virtual time deterministically.
//!
//! All timestamps are milliseconds on a monotonic axis. Wall-clock time is
//! deliberately not modeled: publication cadence only cares about elapsed
//! time since the last publish.

/// Timestamp in milliseconds since device boot (monotonic)
pub type Timestamp = u64;

/// Source of time for the engine
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    ///
    /// The engine requires a monotonic axis; a wall clock source is only
    /// acceptable if the host guarantees it never steps backwards.
    fn is_wall_clock(&self) -> bool;
}

/// Monotonic clock backed by [`std::time::Instant`]
///
/// Starts at 0 when constructed, always increases.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Create a clock whose origin (timestamp 0) is now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Manually driven clock for tests and host simulations
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: Timestamp,
}

impl FixedClock {
    /// Create a clock pinned at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Move the clock to an absolute timestamp
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Advance the clock by `ms` milliseconds
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Milliseconds elapsed between two timestamps, saturating at zero
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}
