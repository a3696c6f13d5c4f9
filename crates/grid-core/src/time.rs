// crates/grid-core/src/time.rs
// ============================================================================
// Module: Grid Core Timestamps
// Description: Canonical wall-clock timestamp type used across the crate.
// Purpose: Give every record a consistent, serializable point in time.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! [`Timestamp`] wraps a Unix-epoch millisecond count. Construction from
//! `SystemTime::now()` is the only source of "current" time; everything else
//! takes a `Timestamp` explicitly so tests can supply deterministic values.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

/// Wall-clock timestamp, milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Builds a timestamp from a raw millisecond count.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the raw millisecond count.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Returns the duration in seconds since `earlier`, saturating at zero.
    #[must_use]
    pub fn seconds_since(self, earlier: Self) -> f64 {
        let delta = self.0.saturating_sub(earlier.0);
        (delta.max(0) as f64) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_since_is_nonnegative_and_monotonic() {
        let t0 = Timestamp::from_millis(1_000);
        let t1 = Timestamp::from_millis(61_000);
        assert!((t1.seconds_since(t0) - 60.0).abs() < 1e-9);
        assert_eq!(t0.seconds_since(t1), 0.0);
    }
}
