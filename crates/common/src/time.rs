use serde::{Deserialize, Serialize};
use std::ops::Add;
use std::time::Duration;

/// Nominal length of one server tick.
pub const TICK: Duration = Duration::from_millis(50);

/// Simulation clock reading in milliseconds since the clock started.
///
/// Every deadline in the core (temp block expiry, cooldowns, input ignore
/// windows) is a `Timestamp` compared against the current tick's reading,
/// never a wall-clock wait.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Whether this deadline has been reached at `now`.
    pub fn has_passed(self, now: Timestamp) -> bool {
        now >= self
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
