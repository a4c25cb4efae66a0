//! The challenge aggregate.
//!
//! Composes one map field, three negotiable fields (server, team size,
//! start time), a clock controller, a result ledger, and the rematch
//! request set. Every command validates eligibility, routes to the
//! right sub-component, and returns the notification events produced -
//! never a direct side effect.

use serde::{Deserialize, Serialize};

use super::clock::{ClockController, ClockError};
use super::domain::{ChallengePhase, Score, Side, TeamSize};
use super::error::ChallengeError;
use super::event::{ChallengeEvent, FieldValue};
use super::field::{FieldError, MapField, MapFieldError, Negotiable};
use super::identity::{ChallengeId, MapName, TeamId};
use super::ledger::{LedgerError, ResultLedger};
use super::rematch::{RematchLinker, RematchRequest, RematchSeed};
use super::time::WallClock;

/// Initial state for a new challenge, assembled by the registry.
#[derive(Clone, Debug)]
pub struct NewChallenge {
    pub challenging: TeamId,
    pub challenged: TeamId,
    /// Whose home maps are in play; `None` for a fully neutral match.
    pub home_map_team: Option<TeamId>,
    /// The home-map team's registered maps (empty when neutral).
    pub home_maps: Vec<MapName>,
    pub challenging_penalized: bool,
    pub challenged_penalized: bool,
    pub admin_created: bool,
    pub predecessor: Option<ChallengeId>,
    /// Pre-settled team size (rematch successors copy the original's).
    pub locked_team_size: Option<TeamSize>,
    /// Pre-settled start time (rematch successors start "now").
    pub locked_time: Option<WallClock>,
}

/// One head-to-head match between two teams.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Challenge {
    id: ChallengeId,
    challenging: TeamId,
    challenged: TeamId,
    home_map_team: Option<TeamId>,
    challenging_penalized: bool,
    challenged_penalized: bool,
    admin_created: bool,
    created_at: WallClock,
    predecessor: Option<ChallengeId>,
    successor: Option<ChallengeId>,

    map: MapField,
    server: Negotiable<String>,
    team_size: Negotiable<TeamSize>,
    time: Negotiable<WallClock>,
    clock: ClockController,
    ledger: ResultLedger,
    rematch: RematchLinker,
}

impl Challenge {
    pub fn create(id: ChallengeId, spec: NewChallenge, now: WallClock) -> Self {
        let team_size = match spec.locked_team_size {
            Some(size) => Negotiable::locked_to(size),
            None => Negotiable::new(),
        };
        let time = match spec.locked_time {
            Some(at) => Negotiable::locked_to(at),
            None => Negotiable::new(),
        };
        Self {
            id,
            challenging: spec.challenging,
            challenged: spec.challenged,
            home_map_team: spec.home_map_team,
            challenging_penalized: spec.challenging_penalized,
            challenged_penalized: spec.challenged_penalized,
            admin_created: spec.admin_created,
            created_at: now,
            predecessor: spec.predecessor,
            successor: None,
            map: MapField::new(spec.home_map_team, spec.home_maps),
            server: Negotiable::new(),
            team_size,
            time,
            clock: ClockController::new(),
            ledger: ResultLedger::new(),
            rematch: RematchLinker::new(),
        }
    }

    // ------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------

    /// Lifecycle phase, derived from sub-component state.
    pub fn phase(&self) -> ChallengePhase {
        if self.ledger.is_voided() {
            ChallengePhase::Voided
        } else if self.ledger.is_confirmed() {
            ChallengePhase::Closed
        } else if self.ledger.pending_report().is_some() {
            ChallengePhase::Reported
        } else if self.time.is_locked() {
            ChallengePhase::Scheduled
        } else if self.clock.is_clocked() {
            ChallengePhase::Clocked
        } else {
            ChallengePhase::Negotiating
        }
    }

    pub fn is_participant(&self, team: TeamId) -> bool {
        team == self.challenging || team == self.challenged
    }

    /// Orange is the challenging side; the rematch successor swaps both
    /// roles and sides.
    pub fn side_of(&self, team: TeamId) -> Option<Side> {
        if team == self.challenging {
            Some(Side::Orange)
        } else if team == self.challenged {
            Some(Side::Blue)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, team: TeamId) -> Option<TeamId> {
        if team == self.challenging {
            Some(self.challenged)
        } else if team == self.challenged {
            Some(self.challenging)
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------

    fn ensure_participant(&self, team: TeamId) -> Result<(), ChallengeError> {
        if self.is_participant(team) {
            Ok(())
        } else {
            Err(ChallengeError::NotEligible { team })
        }
    }

    /// No field may be mutated once the ledger is confirmed or voided.
    fn ensure_open(&self, op: &'static str) -> Result<(), ChallengeError> {
        let phase = self.phase();
        if phase.is_terminal() {
            Err(ChallengeError::InvalidState { op, phase })
        } else {
            Ok(())
        }
    }

    fn field_error(field: &'static str, err: FieldError) -> ChallengeError {
        match err {
            FieldError::Locked => ChallengeError::FieldAlreadyLocked { field },
            FieldError::NoProposal => ChallengeError::NoProposal { field },
            FieldError::SelfConfirm { team } => ChallengeError::SelfConfirm { team },
        }
    }

    fn map_error(err: MapFieldError) -> ChallengeError {
        match err {
            MapFieldError::Locked => ChallengeError::FieldAlreadyLocked { field: "map" },
            MapFieldError::NoSuggestion => ChallengeError::NoProposal { field: "map" },
            MapFieldError::SelfConfirm { team } => ChallengeError::SelfConfirm { team },
            MapFieldError::NotHomeTeam { team } => ChallengeError::NotEligible { team },
            MapFieldError::BadIndex { index, len } => ChallengeError::ValueRejected {
                field: "map",
                reason: format!("home map number {index} does not exist (the team has {len})"),
            },
            MapFieldError::HomeMapReserved { map } => ChallengeError::ValueRejected {
                field: "map",
                reason: format!("{map} is one of the home team's reserved maps"),
            },
        }
    }

    // ------------------------------------------------------------------
    // Map negotiation
    // ------------------------------------------------------------------

    /// Direct pick by the home-map team from its registered home maps.
    pub fn pick_map(
        &mut self,
        team: TeamId,
        index: usize,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("pick map")?;
        let map = self.map.pick(team, index).map_err(Self::map_error)?;
        Ok(vec![
            ChallengeEvent::Picked {
                challenge: self.id,
                by: team,
                map: map.clone(),
            },
            ChallengeEvent::Locked {
                challenge: self.id,
                value: FieldValue::Map(map),
            },
        ])
    }

    /// Neutral-map suggestion by the non-privileged side.
    pub fn suggest_map(
        &mut self,
        team: TeamId,
        map: &str,
        now: WallClock,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("suggest map")?;
        let map = MapName::parse(map)?;
        self.map
            .suggest(team, map.clone(), now)
            .map_err(Self::map_error)?;
        Ok(vec![ChallengeEvent::Proposed {
            challenge: self.id,
            by: team,
            value: FieldValue::Map(map),
        }])
    }

    pub fn confirm_map(&mut self, team: TeamId) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("confirm map")?;
        let map = self.map.confirm(team).map_err(Self::map_error)?;
        Ok(vec![ChallengeEvent::Locked {
            challenge: self.id,
            value: FieldValue::Map(map),
        }])
    }

    // ------------------------------------------------------------------
    // Server, team size, time negotiation
    // ------------------------------------------------------------------

    pub fn suggest_server(
        &mut self,
        team: TeamId,
        server: &str,
        now: WallClock,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("suggest server")?;
        let server = server.trim().to_string();
        if server.is_empty() {
            return Err(ChallengeError::ValueRejected {
                field: "server",
                reason: "server name is empty".into(),
            });
        }
        self.server
            .propose(team, server.clone(), now)
            .map_err(|e| Self::field_error("server", e))?;
        Ok(vec![ChallengeEvent::Proposed {
            challenge: self.id,
            by: team,
            value: FieldValue::Server(server),
        }])
    }

    pub fn confirm_server(&mut self, team: TeamId) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("confirm server")?;
        let server = self
            .server
            .confirm(team)
            .map_err(|e| Self::field_error("server", e))?;
        Ok(vec![ChallengeEvent::Locked {
            challenge: self.id,
            value: FieldValue::Server(server),
        }])
    }

    pub fn suggest_team_size(
        &mut self,
        team: TeamId,
        size: u8,
        now: WallClock,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("suggest team size")?;
        let size = TeamSize::new(size)?;
        self.team_size
            .propose(team, size, now)
            .map_err(|e| Self::field_error("team_size", e))?;
        Ok(vec![ChallengeEvent::Proposed {
            challenge: self.id,
            by: team,
            value: FieldValue::TeamSize(size),
        }])
    }

    pub fn confirm_team_size(
        &mut self,
        team: TeamId,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("confirm team size")?;
        let size = self
            .team_size
            .confirm(team)
            .map_err(|e| Self::field_error("team_size", e))?;
        Ok(vec![ChallengeEvent::Locked {
            challenge: self.id,
            value: FieldValue::TeamSize(size),
        }])
    }

    pub fn suggest_time(
        &mut self,
        team: TeamId,
        at: WallClock,
        now: WallClock,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("suggest time")?;
        self.time
            .propose(team, at, now)
            .map_err(|e| Self::field_error("time", e))?;
        Ok(vec![ChallengeEvent::Proposed {
            challenge: self.id,
            by: team,
            value: FieldValue::Time(at),
        }])
    }

    pub fn confirm_time(&mut self, team: TeamId) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("confirm time")?;
        let at = self
            .time
            .confirm(team)
            .map_err(|e| Self::field_error("time", e))?;
        Ok(vec![ChallengeEvent::Locked {
            challenge: self.id,
            value: FieldValue::Time(at),
        }])
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Put the challenge on the clock. Valid only while the match is
    /// open, unreported, and not yet fully scheduled.
    pub fn start_clock(
        &mut self,
        team: TeamId,
        now: WallClock,
        window_ms: u64,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("clock")?;
        let phase = self.phase();
        if matches!(phase, ChallengePhase::Reported | ChallengePhase::Scheduled) {
            return Err(ChallengeError::InvalidState { op: "clock", phase });
        }
        let deadline = self
            .clock
            .start(team, now, window_ms)
            .map_err(|_: ClockError| ChallengeError::InvalidState { op: "clock", phase })?;
        Ok(vec![ChallengeEvent::Clocked {
            challenge: self.id,
            by: team,
            deadline,
        }])
    }

    /// Reset the clock deadline to a fresh window.
    pub fn extend_clock(
        &mut self,
        team: TeamId,
        now: WallClock,
        window_ms: u64,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        self.ensure_open("extend clock")?;
        let deadline = self.clock.extend(now, window_ms).map_err(|_: ClockError| {
            ChallengeError::InvalidState {
                op: "extend clock",
                phase: self.phase(),
            }
        })?;
        Ok(vec![ChallengeEvent::ClockExtended {
            challenge: self.id,
            by: team,
            deadline,
        }])
    }

    // ------------------------------------------------------------------
    // Result
    // ------------------------------------------------------------------

    pub fn report(
        &mut self,
        team: TeamId,
        score: Score,
        now: WallClock,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        let phase = self.phase();
        self.ledger
            .report(team, score, now)
            .map_err(|e| Self::ledger_error("report", phase, e))?;
        Ok(vec![ChallengeEvent::Reported {
            challenge: self.id,
            by: team,
            score,
        }])
    }

    pub fn confirm_result(
        &mut self,
        team: TeamId,
        now: WallClock,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        let phase = self.phase();
        let report = self
            .ledger
            .confirm(team, now)
            .map_err(|e| Self::ledger_error("confirm", phase, e))?;
        Ok(vec![ChallengeEvent::Closed {
            challenge: self.id,
            reported_by: report.by,
            confirmed_by: team,
            score: report.score,
        }])
    }

    pub fn add_overtime_period(
        &mut self,
        team: TeamId,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        self.ensure_participant(team)?;
        let phase = self.phase();
        let periods = self
            .ledger
            .add_overtime_period()
            .map_err(|e| Self::ledger_error("add overtime", phase, e))?;
        Ok(vec![ChallengeEvent::OvertimeAdded {
            challenge: self.id,
            by: team,
            periods,
        }])
    }

    /// Void the challenge. Terminal; no rematch can follow. `by` is a
    /// participant cancelling, or `None` on the administrative path.
    pub fn void(
        &mut self,
        by: Option<TeamId>,
        now: WallClock,
    ) -> Result<Vec<ChallengeEvent>, ChallengeError> {
        if let Some(team) = by {
            self.ensure_participant(team)?;
        }
        let phase = self.phase();
        self.ledger
            .void(now)
            .map_err(|e| Self::ledger_error("void", phase, e))?;
        Ok(vec![ChallengeEvent::Voided {
            challenge: self.id,
            by,
        }])
    }

    fn ledger_error(op: &'static str, phase: ChallengePhase, err: LedgerError) -> ChallengeError {
        match err {
            LedgerError::Terminal => ChallengeError::InvalidState { op, phase },
            LedgerError::TiedScoreRequiresOvertime => ChallengeError::TiedScoreRequiresOvertime,
            LedgerError::NoReport => ChallengeError::NoReport,
            LedgerError::SelfConfirm { team } => ChallengeError::SelfConfirm { team },
        }
    }

    // ------------------------------------------------------------------
    // Rematch
    // ------------------------------------------------------------------

    /// Record a rematch request. Returns the successor seed exactly once,
    /// when both participants have asked on a closed (never voided)
    /// challenge.
    pub fn request_rematch(
        &mut self,
        team: TeamId,
    ) -> Result<Option<RematchSeed>, ChallengeError> {
        self.ensure_participant(team)?;
        let phase = self.phase();
        if phase != ChallengePhase::Closed {
            return Err(ChallengeError::InvalidState {
                op: "rematch",
                phase,
            });
        }
        if self.successor.is_some() {
            // Successor already spawned; repeated requests are a no-op.
            return Ok(None);
        }
        match self
            .rematch
            .request(team, self.challenging, self.challenged)
        {
            RematchRequest::Pending => Ok(None),
            RematchRequest::Mutual => {
                // The successor exists from here on; the set resets with it.
                self.rematch.clear();
                Ok(Some(self.rematch_seed()))
            }
        }
    }

    /// Successor initial state: roles/sides swap, home-map team swaps
    /// (neutral stays neutral), team size copies.
    fn rematch_seed(&self) -> RematchSeed {
        let home_map_team = self.home_map_team.map(|team| {
            if team == self.challenging {
                self.challenged
            } else {
                self.challenging
            }
        });
        RematchSeed {
            challenging: self.challenged,
            challenged: self.challenging,
            home_map_team,
            team_size: self.team_size.value().copied(),
            predecessor: self.id,
        }
    }

    pub(crate) fn set_successor(&mut self, id: ChallengeId) {
        self.successor = Some(id);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> ChallengeId {
        self.id
    }

    pub fn challenging(&self) -> TeamId {
        self.challenging
    }

    pub fn challenged(&self) -> TeamId {
        self.challenged
    }

    pub fn home_map_team(&self) -> Option<TeamId> {
        self.home_map_team
    }

    pub fn challenging_penalized(&self) -> bool {
        self.challenging_penalized
    }

    pub fn challenged_penalized(&self) -> bool {
        self.challenged_penalized
    }

    pub fn admin_created(&self) -> bool {
        self.admin_created
    }

    pub fn created_at(&self) -> WallClock {
        self.created_at
    }

    pub fn predecessor(&self) -> Option<ChallengeId> {
        self.predecessor
    }

    pub fn successor(&self) -> Option<ChallengeId> {
        self.successor
    }

    pub fn map(&self) -> &MapField {
        &self.map
    }

    pub fn server(&self) -> &Negotiable<String> {
        &self.server
    }

    pub fn team_size(&self) -> &Negotiable<TeamSize> {
        &self.team_size
    }

    pub fn time(&self) -> &Negotiable<WallClock> {
        &self.time
    }

    pub fn clock(&self) -> &ClockController {
        &self.clock
    }

    pub(crate) fn clock_mut(&mut self) -> &mut ClockController {
        &mut self.clock
    }

    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }
}
