//! The negotiable-field primitive.
//!
//! One propose -> confirm cell, reused for server, team size, and start
//! time, plus the map field's privileged pick / neutral-suggest variant.
//! Locked is monotone: a field never unlocks.

use serde::{Deserialize, Serialize};

use super::identity::{MapName, TeamId};
use super::time::WallClock;

/// A pending proposal on a field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal<T> {
    pub value: T,
    pub by: TeamId,
    pub at: WallClock,
}

/// Field-level rejections, converted by the aggregate into
/// `ChallengeError` with the field's name attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldError {
    Locked,
    NoProposal,
    SelfConfirm { team: TeamId },
}

/// A match parameter settled via propose/confirm.
///
/// Starts empty (or pre-locked, e.g. in a rematch successor); transitions
/// through proposed -> locked; never unlocks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Negotiable<T> {
    value: Option<T>,
    proposal: Option<Proposal<T>>,
    locked: bool,
}

impl<T> Default for Negotiable<T> {
    fn default() -> Self {
        Self {
            value: None,
            proposal: None,
            locked: false,
        }
    }
}

impl<T: Clone> Negotiable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A field settled at construction (rematch successors copy team size
    /// and start immediately).
    pub fn locked_to(value: T) -> Self {
        Self {
            value: Some(value),
            proposal: None,
            locked: true,
        }
    }

    /// Propose a value. The latest proposal from a team supersedes its
    /// own previous one; a counter-proposal from the other team replaces
    /// the pending one outright.
    pub fn propose(&mut self, team: TeamId, value: T, at: WallClock) -> Result<(), FieldError> {
        if self.locked {
            return Err(FieldError::Locked);
        }
        self.proposal = Some(Proposal { value, by: team, at });
        Ok(())
    }

    /// Confirm the pending proposal. Only the team that did not make it
    /// may confirm; on success the field locks permanently.
    pub fn confirm(&mut self, team: TeamId) -> Result<T, FieldError> {
        if self.locked {
            return Err(FieldError::Locked);
        }
        let proposal = self.proposal.take().ok_or(FieldError::NoProposal)?;
        if proposal.by == team {
            self.proposal = Some(proposal);
            return Err(FieldError::SelfConfirm { team });
        }
        self.value = Some(proposal.value.clone());
        self.locked = true;
        Ok(proposal.value)
    }

    /// Lock directly, bypassing confirmation (privileged pick).
    pub(crate) fn lock_to(&mut self, value: T) -> Result<(), FieldError> {
        if self.locked {
            return Err(FieldError::Locked);
        }
        self.value = Some(value);
        self.proposal = None;
        self.locked = true;
        Ok(())
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn pending(&self) -> Option<&Proposal<T>> {
        self.proposal.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Map-field rejections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MapFieldError {
    Locked,
    NoSuggestion,
    SelfConfirm { team: TeamId },
    /// Pick attempted by a team without home-map privilege.
    NotHomeTeam { team: TeamId },
    /// Pick index outside the registered home map set.
    BadIndex { index: usize, len: usize },
    /// A neutral suggestion named one of the home team's reserved maps.
    HomeMapReserved { map: MapName },
}

/// The map field.
///
/// The home-map team picks directly from its pre-registered home maps;
/// the other side may instead suggest a neutral map, which the home-map
/// team must confirm. Only one of {pick, suggest+confirm} settles the
/// field per challenge. With no home-map team the field is fully neutral:
/// nobody picks, either side suggests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapField {
    home_team: Option<TeamId>,
    candidates: Vec<MapName>,
    inner: Negotiable<MapName>,
}

impl MapField {
    pub fn new(home_team: Option<TeamId>, candidates: Vec<MapName>) -> Self {
        Self {
            home_team,
            candidates,
            inner: Negotiable::new(),
        }
    }

    /// Direct pick by the home-map team - propose + auto-lock.
    pub fn pick(&mut self, team: TeamId, index: usize) -> Result<MapName, MapFieldError> {
        if self.inner.is_locked() {
            return Err(MapFieldError::Locked);
        }
        if self.home_team != Some(team) {
            return Err(MapFieldError::NotHomeTeam { team });
        }
        let map = self
            .candidates
            .get(index)
            .cloned()
            .ok_or(MapFieldError::BadIndex {
                index,
                len: self.candidates.len(),
            })?;
        self.inner
            .lock_to(map.clone())
            .map_err(|_| MapFieldError::Locked)?;
        Ok(map)
    }

    /// Neutral-map suggestion by the non-privileged side.
    pub fn suggest(
        &mut self,
        team: TeamId,
        map: MapName,
        at: WallClock,
    ) -> Result<(), MapFieldError> {
        if self.inner.is_locked() {
            return Err(MapFieldError::Locked);
        }
        if self.home_team == Some(team) {
            // The home team picks; it does not suggest.
            return Err(MapFieldError::NotHomeTeam { team });
        }
        if self.candidates.contains(&map) {
            return Err(MapFieldError::HomeMapReserved { map });
        }
        self.inner
            .propose(team, map, at)
            .map_err(|_| MapFieldError::Locked)
    }

    pub fn confirm(&mut self, team: TeamId) -> Result<MapName, MapFieldError> {
        match self.inner.confirm(team) {
            Ok(map) => Ok(map),
            Err(FieldError::Locked) => Err(MapFieldError::Locked),
            Err(FieldError::NoProposal) => Err(MapFieldError::NoSuggestion),
            Err(FieldError::SelfConfirm { team }) => Err(MapFieldError::SelfConfirm { team }),
        }
    }

    pub fn value(&self) -> Option<&MapName> {
        self.inner.value()
    }

    pub fn pending(&self) -> Option<&Proposal<MapName>> {
        self.inner.pending()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    pub fn home_team(&self) -> Option<TeamId> {
        self.home_team
    }

    pub fn candidates(&self) -> &[MapName] {
        &self.candidates
    }
}
