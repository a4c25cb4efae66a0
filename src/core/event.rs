//! Typed notification events.
//!
//! The core emits one event per state transition; it never talks to a
//! messaging client directly. The `Notifier` capability consumes these
//! and owns all formatting and delivery.

use serde::{Deserialize, Serialize};

use super::domain::{Score, TeamSize};
use super::identity::{ChallengeId, MapName, TeamId};
use super::time::WallClock;

/// A value settled (or proposed) on one negotiable field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Map(MapName),
    Server(String),
    TeamSize(TeamSize),
    Time(WallClock),
}

impl FieldValue {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Map(_) => "map",
            Self::Server(_) => "server",
            Self::TeamSize(_) => "team_size",
            Self::Time(_) => "time",
        }
    }
}

/// One state transition on a challenge.
///
/// Every variant carries the challenge id, the affected team id(s), and
/// the relevant value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChallengeEvent {
    /// A team proposed a value for a negotiable field.
    Proposed {
        challenge: ChallengeId,
        by: TeamId,
        #[serde(flatten)]
        value: FieldValue,
    },

    /// The home-map team picked directly from its registered home maps.
    Picked {
        challenge: ChallengeId,
        by: TeamId,
        map: MapName,
    },

    /// A negotiable field settled; no further proposals are accepted.
    Locked {
        challenge: ChallengeId,
        #[serde(flatten)]
        value: FieldValue,
    },

    /// A scheduling deadline was imposed.
    Clocked {
        challenge: ChallengeId,
        by: TeamId,
        deadline: WallClock,
    },

    /// The clock deadline was reset to a fresh window.
    ClockExtended {
        challenge: ChallengeId,
        by: TeamId,
        deadline: WallClock,
    },

    /// The deadline is inside the warning window.
    DeadlineApproaching {
        challenge: ChallengeId,
        clocked_by: TeamId,
        deadline: WallClock,
    },

    /// The deadline passed; the challenge is forfeit-eligible.
    ///
    /// Signal only - forfeiture policy belongs to the league-rules layer.
    DeadlineExpired {
        challenge: ChallengeId,
        clocked_by: TeamId,
        deadline: WallClock,
    },

    /// A score was reported and awaits the other team's confirmation.
    Reported {
        challenge: ChallengeId,
        by: TeamId,
        score: Score,
    },

    /// An overtime period was recorded to resolve a tie.
    OvertimeAdded {
        challenge: ChallengeId,
        by: TeamId,
        periods: u8,
    },

    /// The report was confirmed; the challenge is closed.
    Closed {
        challenge: ChallengeId,
        reported_by: TeamId,
        confirmed_by: TeamId,
        score: Score,
    },

    /// The challenge was voided and ceases to exist for scheduling.
    /// `by` is absent when an administrator voided from outside the pair.
    Voided {
        challenge: ChallengeId,
        by: Option<TeamId>,
    },

    /// Both teams requested a rematch; a successor challenge exists.
    RematchLinked {
        challenge: ChallengeId,
        successor: ChallengeId,
    },
}

impl ChallengeEvent {
    /// Stable event kind for logging and dispatch.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Proposed { .. } => "proposed",
            Self::Picked { .. } => "picked",
            Self::Locked { .. } => "locked",
            Self::Clocked { .. } => "clocked",
            Self::ClockExtended { .. } => "clock_extended",
            Self::DeadlineApproaching { .. } => "deadline_approaching",
            Self::DeadlineExpired { .. } => "deadline_expired",
            Self::Reported { .. } => "reported",
            Self::OvertimeAdded { .. } => "overtime_added",
            Self::Closed { .. } => "closed",
            Self::Voided { .. } => "voided",
            Self::RematchLinked { .. } => "rematch_linked",
        }
    }

    pub fn challenge(&self) -> ChallengeId {
        match self {
            Self::Proposed { challenge, .. }
            | Self::Picked { challenge, .. }
            | Self::Locked { challenge, .. }
            | Self::Clocked { challenge, .. }
            | Self::ClockExtended { challenge, .. }
            | Self::DeadlineApproaching { challenge, .. }
            | Self::DeadlineExpired { challenge, .. }
            | Self::Reported { challenge, .. }
            | Self::OvertimeAdded { challenge, .. }
            | Self::Closed { challenge, .. }
            | Self::Voided { challenge, .. }
            | Self::RematchLinked { challenge, .. } => *challenge,
        }
    }
}
