//! Rematch linking.
//!
//! Detects mutual rematch requests on a closed challenge. A successor
//! is derived exactly once, when both participants have asked.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::TeamSize;
use super::identity::{ChallengeId, TeamId};

/// Set of teams that have requested a rematch on one challenge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RematchLinker {
    requested: BTreeSet<TeamId>,
}

/// Outcome of recording one rematch request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RematchRequest {
    /// Request recorded (or repeated); the other side has not asked yet.
    Pending,
    /// Both participants have now requested - spawn the successor.
    Mutual,
}

impl RematchLinker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request. Idempotent per team; reports `Mutual` exactly
    /// when the second distinct participant joins in.
    pub fn request(&mut self, team: TeamId, a: TeamId, b: TeamId) -> RematchRequest {
        self.requested.insert(team);
        if self.requested.contains(&a) && self.requested.contains(&b) {
            RematchRequest::Mutual
        } else {
            RematchRequest::Pending
        }
    }

    pub fn clear(&mut self) {
        self.requested.clear();
    }

    pub fn has_requested(&self, team: TeamId) -> bool {
        self.requested.contains(&team)
    }
}

/// Derived initial state for a rematch successor.
///
/// Roles and sides swap, the home-map team swaps (neutral stays
/// neutral), team size copies, and the start time is "now".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RematchSeed {
    pub challenging: TeamId,
    pub challenged: TeamId,
    pub home_map_team: Option<TeamId>,
    pub team_size: Option<TeamSize>,
    pub predecessor: ChallengeId,
}
