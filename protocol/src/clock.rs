// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Clock
//!
//! The settlement contract never asks the operating system what time it is.
//! It asks a [`Clock`]. Production uses [`SystemClock`]; tests use
//! [`ManualClock`] and move time forward by hand, which is how a one-day
//! challenge period gets tested in a few microseconds.
//!
//! Time is whole seconds since the Unix epoch. The settlement cycle is a
//! fixed window of [`CYCLE_LENGTH_SECS`]; every receipt in a batch is bound
//! to the end of the window in which the batch is posted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::config::CYCLE_LENGTH_SECS;

/// Source of the current time and settlement cycle.
pub trait Clock {
    /// Current time, seconds since the Unix epoch.
    fn now(&self) -> u64;

    /// Expiry timestamp of the current settlement cycle.
    fn current_cycle_expiry(&self) -> u32 {
        cycle_expiry_at(self.now())
    }
}

/// End of the cycle containing `timestamp`. A timestamp exactly on a
/// boundary belongs to the cycle that starts there.
///
/// Saturates at `u32::MAX`, which is somewhere in 2106 and not our problem.
pub fn cycle_expiry_at(timestamp: u64) -> u32 {
    let end = (timestamp / CYCLE_LENGTH_SECS)
        .saturating_add(1)
        .saturating_mul(CYCLE_LENGTH_SECS);
    u32::try_from(end).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// SystemClock
// ---------------------------------------------------------------------------

/// Wall-clock time via chrono.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Before 1970 means the host clock is broken; treat it as zero.
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle
/// and give the other to the contract.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at `now`.
    pub fn new(now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_expiry_rounds_up_to_next_boundary() {
        assert_eq!(cycle_expiry_at(0), 3_600);
        assert_eq!(cycle_expiry_at(1), 3_600);
        assert_eq!(cycle_expiry_at(3_599), 3_600);
        assert_eq!(cycle_expiry_at(3_600), 7_200);
    }

    #[test]
    fn cycle_expiry_saturates() {
        assert_eq!(cycle_expiry_at(u64::MAX), u32::MAX);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();
        handle.advance(500);
        assert_eq!(clock.now(), 1_500);
        handle.set(10);
        assert_eq!(clock.now(), 10);
        assert_eq!(clock.current_cycle_expiry(), 3_600);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
        assert!(u64::from(SystemClock.current_cycle_expiry()) > SystemClock.now());
    }
}
