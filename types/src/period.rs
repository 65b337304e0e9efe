//! Period: the staking contract's native time unit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete period index counted from the network epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Period(u64);

impl Period {
    pub const ZERO: Self = Self(0);

    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn index(&self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn checked_add(self, periods: u64) -> Option<Self> {
        self.0.checked_add(periods).map(Self)
    }

    /// Number of periods from `earlier` to `self` (zero if `earlier` is later).
    pub fn since(self, earlier: Period) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for Period {
    fn from(index: u64) -> Self {
        Self(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_saturates() {
        assert_eq!(Period::new(10).since(Period::new(4)), 6);
        assert_eq!(Period::new(4).since(Period::new(10)), 0);
    }

    #[test]
    fn checked_add_overflow() {
        assert_eq!(Period::new(u64::MAX).checked_add(1), None);
        assert_eq!(Period::new(5).checked_add(3), Some(Period::new(8)));
    }
}
