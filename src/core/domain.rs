//! Layer 2: Domain enums
//!
//! Side: orange/blue assignment
//! TeamSize: allowed match sizes {2, 3, 4}
//! Score: reported score pair
//! ChallengePhase: derived lifecycle phase (never stored)

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ChallengeError;

/// Side assignment for a challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Orange,
    Blue,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orange => "orange",
            Self::Blue => "blue",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Self::Orange => Self::Blue,
            Self::Blue => Self::Orange,
        }
    }
}

/// Players per side: 2, 3, or 4.
///
/// Validated at construction - invalid values are unrepresentable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamSize(u8);

impl TeamSize {
    pub const MIN: u8 = 2;
    pub const MAX: u8 = 4;

    pub fn new(n: u8) -> Result<Self, ChallengeError> {
        if !(Self::MIN..=Self::MAX).contains(&n) {
            Err(ChallengeError::ValueRejected {
                field: "team_size",
                reason: format!("{n} is outside the allowed set {{2, 3, 4}}"),
            })
        } else {
            Ok(Self(n))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for TeamSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{0}v{0}", self.0)
    }
}

/// A reported score from the reporting team's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub own: u32,
    pub opponent: u32,
}

impl Score {
    pub fn new(own: u32, opponent: u32) -> Self {
        Self { own, opponent }
    }

    pub fn is_tie(&self) -> bool {
        self.own == self.opponent
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.own, self.opponent)
    }
}

/// Derived lifecycle phase of a challenge.
///
/// Computed from sub-component state, never stored. `Negotiating`,
/// `Clocked`, and `Scheduled` are progressive; `Reported`, `Closed`,
/// and `Voided` are mutually exclusive terminal-leaning phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengePhase {
    Negotiating,
    Clocked,
    Scheduled,
    Reported,
    Closed,
    Voided,
}

impl ChallengePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negotiating => "negotiating",
            Self::Clocked => "clocked",
            Self::Scheduled => "scheduled",
            Self::Reported => "reported",
            Self::Closed => "closed",
            Self::Voided => "voided",
        }
    }

    /// Closed or voided: no further negotiation of any kind.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Voided)
    }
}

impl fmt::Display for ChallengePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
