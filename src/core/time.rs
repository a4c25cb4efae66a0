//! Layer 0: Time primitives
//!
//! WallClock for creation stamps, deadlines, and closure dates.
//! Clock for generating monotone stamps within one process.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall clock in milliseconds since the Unix epoch.
///
/// Copy is fine here - it's just a measurement. All protocol deadlines
/// (clock window, warning threshold) are arithmetic on this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WallClock(pub u64);

impl WallClock {
    pub fn now() -> Self {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(ms)
    }

    pub const fn from_ms(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn as_ms(self) -> u64 {
        self.0
    }

    pub const fn plus_ms(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Milliseconds remaining until `deadline` (zero if already past).
    pub const fn until(self, deadline: WallClock) -> u64 {
        deadline.0.saturating_sub(self.0)
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Monotone stamp generator.
///
/// Guarantees each stamp is strictly greater than the previous one from
/// this clock, even if the wall clock jumps backward. Challenges are
/// single-writer, so no logical counter is needed - a 1ms bump suffices.
pub struct Clock {
    last_ms: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            last_ms: WallClock::now().as_ms(),
        }
    }

    /// Generate a new stamp, advancing the clock.
    pub fn tick(&mut self) -> WallClock {
        let now = WallClock::now().as_ms();
        if now > self.last_ms {
            self.last_ms = now;
        } else {
            self.last_ms += 1;
        }
        WallClock(self.last_ms)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
