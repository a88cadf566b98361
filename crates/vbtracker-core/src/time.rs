use serde::{Deserialize, Serialize};

use crate::Real;

/// Time stamp split into whole seconds and microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeValue {
    pub seconds: i64,
    pub microseconds: i32,
}

impl TimeValue {
    pub const fn new(seconds: i64, microseconds: i32) -> Self {
        Self {
            seconds,
            microseconds,
        }
    }

    /// Build a time value from fractional seconds, rounding to the nearest microsecond.
    pub fn from_seconds(secs: Real) -> Self {
        let total_us = (secs * 1e6).round() as i64;
        Self {
            seconds: total_us.div_euclid(1_000_000),
            microseconds: total_us.rem_euclid(1_000_000) as i32,
        }
    }

    pub fn as_seconds(&self) -> Real {
        self.seconds as Real + self.microseconds as Real * 1e-6
    }

    /// Signed duration `self - earlier` in seconds.
    pub fn duration_since(&self, earlier: &TimeValue) -> Real {
        (self.seconds - earlier.seconds) as Real
            + (self.microseconds - earlier.microseconds) as Real * 1e-6
    }
}

impl std::fmt::Display for TimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:06}", self.seconds, self.microseconds)
    }
}
