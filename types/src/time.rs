//! Wall-clock instants recorded on ledger records and journal entries.
//!
//! Whole seconds since the Unix epoch, UTC. Ledgers stamp records with block
//! time at this resolution, so nothing finer is kept.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Current wall-clock time. A clock set before the epoch reads as
    /// [`Timestamp::EPOCH`].
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Self(d.as_secs()))
            .unwrap_or(Self::EPOCH)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// This instant shifted `secs` into the future, saturating.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds between this instant and `now`; zero if `now` is earlier.
    pub fn age(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether at least `grace_secs` have passed between this instant and
    /// `now`.
    pub fn is_older_than(&self, grace_secs: u64, now: Timestamp) -> bool {
        now >= self.plus_secs(grace_secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of "now" for journal entries and reconciliation sweeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grace_boundary_is_inclusive() {
        let written = Timestamp::new(1_000);
        assert!(!written.is_older_than(60, Timestamp::new(1_059)));
        assert!(written.is_older_than(60, Timestamp::new(1_060)));
        assert!(Timestamp::new(u64::MAX).plus_secs(1) == Timestamp::new(u64::MAX));
    }

    #[test]
    fn serializes_as_bare_seconds() {
        assert_eq!(serde_json::to_string(&Timestamp::new(42)).unwrap(), "42");
    }
}
