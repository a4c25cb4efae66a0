//! The challenge registry.
//!
//! Owns every live challenge, enforces the one-active-challenge-per-pair
//! rule, routes commands to aggregates, persists after each mutation, and
//! fans resulting events out to the notifier. The periodic deadline sweep
//! lives here too.
//!
//! Locking: the index mutex guards only the id and pair maps and is never
//! held while a challenge mutex is taken. Each challenge is locked on its
//! own for the duration of one command.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LeagueConfig;
use crate::core::{
    Challenge, ChallengeError, ChallengeEvent, ChallengeId, Clock, DeadlineStatus, MapName,
    NewChallenge, Score, StoreError, TeamId, WallClock,
};
use crate::error::Error;

// ----------------------------------------------------------------------
// Capabilities
// ----------------------------------------------------------------------

/// What the registry needs to know about a team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub id: TeamId,
    pub name: String,
    /// Registered home maps, in the team's preferred order.
    pub home_maps: Vec<MapName>,
    /// Carries a league penalty into any new challenge.
    pub penalized: bool,
}

/// Lookup into the league's team roster.
pub trait TeamDirectory {
    fn profile(&self, team: TeamId) -> Option<TeamProfile>;
}

/// Fixed in-memory roster.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    teams: BTreeMap<TeamId, TeamProfile>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: TeamProfile) {
        self.teams.insert(profile.id, profile);
    }
}

impl TeamDirectory for StaticDirectory {
    fn profile(&self, team: TeamId) -> Option<TeamProfile> {
        self.teams.get(&team).cloned()
    }
}

/// Outbound event sink.
pub trait Notifier {
    fn notify(&self, event: &ChallengeEvent);
}

/// Discards every event. Handy default for embedders that poll state.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &ChallengeEvent) {}
}

/// Fans events into a crossbeam channel; subscribers drain the receiver.
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: Sender<ChallengeEvent>,
}

impl ChannelNotifier {
    pub fn unbounded() -> (Self, Receiver<ChallengeEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: &ChallengeEvent) {
        // A hung or departed subscriber must never block a command.
        if self.tx.send(event.clone()).is_err() {
            debug!(kind = event.kind(), "notifier channel closed, event dropped");
        }
    }
}

/// Durable mirror of challenge state.
///
/// `save` is an idempotent upsert keyed by challenge id: after a failed
/// save the in-memory aggregate keeps its state and the write is retried
/// (next mutation or [`ChallengeRegistry::flush`]) rather than rolled back.
pub trait ChallengeStore {
    fn save(&self, challenge: &Challenge) -> Result<(), StoreError>;
    fn load(&self, id: ChallengeId) -> Result<Challenge, StoreError>;
    fn load_all(&self) -> Result<Vec<Challenge>, StoreError>;

    fn find_active_by_pair(
        &self,
        a: TeamId,
        b: TeamId,
    ) -> Result<Option<Challenge>, StoreError> {
        let pair = TeamPair::new(a, b);
        Ok(self.load_all()?.into_iter().find(|c| {
            !c.phase().is_terminal() && TeamPair::new(c.challenging(), c.challenged()) == pair
        }))
    }

    fn list_clocked(&self) -> Result<Vec<Challenge>, StoreError> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|c| c.clock().is_clocked() && !c.phase().is_terminal())
            .collect())
    }
}

impl<T: ChallengeStore> ChallengeStore for Arc<T> {
    fn save(&self, challenge: &Challenge) -> Result<(), StoreError> {
        (**self).save(challenge)
    }

    fn load(&self, id: ChallengeId) -> Result<Challenge, StoreError> {
        (**self).load(id)
    }

    fn load_all(&self) -> Result<Vec<Challenge>, StoreError> {
        (**self).load_all()
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<BTreeMap<ChallengeId, Challenge>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChallengeStore for MemoryStore {
    fn save(&self, challenge: &Challenge) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.insert(challenge.id(), challenge.clone());
        Ok(())
    }

    fn load(&self, id: ChallengeId) -> Result<Challenge, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.get(&id).cloned().ok_or(StoreError::NotFound { id })
    }

    fn load_all(&self) -> Result<Vec<Challenge>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.values().cloned().collect())
    }
}

// ----------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------

/// Unordered team pair, the key for the one-active-challenge rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TeamPair(TeamId, TeamId);

impl TeamPair {
    pub fn new(a: TeamId, b: TeamId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

/// Parameters for a new challenge.
#[derive(Clone, Debug)]
pub struct CreateParams {
    pub challenging: TeamId,
    pub challenged: TeamId,
    /// Whose home maps are in play; `None` for a fully neutral match.
    pub home_map_team: Option<TeamId>,
    /// Admin-created challenges skip the home-map-count requirement.
    pub admin_created: bool,
}

/// A command addressed at one challenge.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    PickMap { team: TeamId, index: usize },
    SuggestMap { team: TeamId, map: String },
    ConfirmMap { team: TeamId },
    SuggestServer { team: TeamId, server: String },
    ConfirmServer { team: TeamId },
    SuggestTeamSize { team: TeamId, size: u8 },
    ConfirmTeamSize { team: TeamId },
    SuggestTime { team: TeamId, at: WallClock },
    ConfirmTime { team: TeamId },
    StartClock { team: TeamId },
    ExtendClock { team: TeamId },
    Report { team: TeamId, score: Score },
    ConfirmResult { team: TeamId },
    AddOvertimePeriod { team: TeamId },
    Void { by: Option<TeamId> },
}

#[derive(Default)]
struct Index {
    by_id: BTreeMap<ChallengeId, Arc<Mutex<Challenge>>>,
    by_pair: BTreeMap<TeamPair, ChallengeId>,
}

/// The league's live challenge table.
pub struct ChallengeRegistry<S, D, N> {
    store: S,
    directory: D,
    notifier: N,
    config: LeagueConfig,
    clock: Mutex<Clock>,
    index: Mutex<Index>,
}

impl<S, D, N> ChallengeRegistry<S, D, N>
where
    S: ChallengeStore,
    D: TeamDirectory,
    N: Notifier,
{
    pub fn new(store: S, directory: D, notifier: N, config: LeagueConfig) -> Self {
        Self {
            store,
            directory,
            notifier,
            config,
            clock: Mutex::new(Clock::new()),
            index: Mutex::new(Index::default()),
        }
    }

    /// Rehydrate the index from the store (process restart).
    pub fn restore(&self) -> Result<usize, Error> {
        let challenges = self.store.load_all()?;
        let count = challenges.len();
        let mut index = self.lock_index();
        for challenge in challenges {
            let id = challenge.id();
            let pair = TeamPair::new(challenge.challenging(), challenge.challenged());
            if !challenge.phase().is_terminal() {
                index.by_pair.insert(pair, id);
            }
            index.by_id.insert(id, Arc::new(Mutex::new(challenge)));
        }
        info!(count, "challenge index restored");
        Ok(count)
    }

    fn lock_index(&self) -> std::sync::MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn now(&self) -> WallClock {
        self.clock
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .tick()
    }

    fn profile_of(&self, team: TeamId) -> Result<TeamProfile, Error> {
        self.directory
            .profile(team)
            .ok_or_else(|| ChallengeError::NotEligible { team }.into())
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Open a new challenge between two teams.
    pub fn create(&self, params: CreateParams) -> Result<ChallengeId, Error> {
        if params.challenging == params.challenged {
            return Err(ChallengeError::ValueRejected {
                field: "opponent",
                reason: "a team cannot challenge itself".into(),
            }
            .into());
        }
        let challenging = self.profile_of(params.challenging)?;
        let challenged = self.profile_of(params.challenged)?;

        let home_maps = match params.home_map_team {
            None => Vec::new(),
            Some(team) => {
                let profile = if team == challenging.id {
                    &challenging
                } else if team == challenged.id {
                    &challenged
                } else {
                    return Err(ChallengeError::ValueRejected {
                        field: "home_map_team",
                        reason: format!("team {team} is not a participant"),
                    }
                    .into());
                };
                if !params.admin_created && profile.home_maps.len() < self.config.home_maps_required
                {
                    return Err(ChallengeError::ValueRejected {
                        field: "map",
                        reason: format!(
                            "{} has {} of the {} required home maps",
                            profile.name,
                            profile.home_maps.len(),
                            self.config.home_maps_required
                        ),
                    }
                    .into());
                }
                profile.home_maps.clone()
            }
        };

        let init = NewChallenge {
            challenging: challenging.id,
            challenged: challenged.id,
            home_map_team: params.home_map_team,
            home_maps,
            challenging_penalized: challenging.penalized,
            challenged_penalized: challenged.penalized,
            admin_created: params.admin_created,
            predecessor: None,
            locked_team_size: None,
            locked_time: None,
        };
        self.spawn(init, None)
    }

    /// Shared tail of `create` and the rematch path: duplicate check,
    /// pair-slot reservation, store write, index insert. `replacing`
    /// names a challenge already known terminal (the rematch predecessor,
    /// whose mutex the caller holds), so it is exempt from the liveness
    /// probe.
    fn spawn(
        &self,
        init: NewChallenge,
        replacing: Option<ChallengeId>,
    ) -> Result<ChallengeId, Error> {
        let pair = TeamPair::new(init.challenging, init.challenged);
        let (team_a, team_b) = (init.challenging, init.challenged);
        let duplicate =
            || Error::from(ChallengeError::DuplicateActiveChallenge { team_a, team_b });

        // Duplicate check; a terminal leftover in the pair slot is
        // replaced. The index lock is released before the challenge lock
        // is taken.
        let observed = {
            let index = self.lock_index();
            index
                .by_pair
                .get(&pair)
                .map(|id| (*id, index.by_id.get(id).cloned()))
        };
        if let Some((existing_id, arc)) = &observed {
            if Some(*existing_id) != replacing {
                let live = match arc {
                    Some(arc) => {
                        let challenge = arc.lock().unwrap_or_else(|e| e.into_inner());
                        !challenge.phase().is_terminal()
                    }
                    // A pair entry with no aggregate yet is another
                    // creator's in-flight reservation.
                    None => true,
                };
                if live {
                    return Err(duplicate());
                }
            }
        }
        let observed_id = observed.map(|(id, _)| id);

        // Reserve the pair slot in the same lock acquisition that
        // re-validates it, so two concurrent creators cannot both pass
        // the check. Whoever finds the slot changed lost the race.
        let id = ChallengeId::generate();
        {
            let mut index = self.lock_index();
            if index.by_pair.get(&pair).copied() != observed_id {
                return Err(duplicate());
            }
            index.by_pair.insert(pair, id);
        }

        let challenge = Challenge::create(id, init, self.now());
        if let Err(e) = self.store.save(&challenge) {
            // Roll the reservation back so the pair is not wedged.
            let mut index = self.lock_index();
            if index.by_pair.get(&pair).copied() == Some(id) {
                match observed_id {
                    Some(old) => index.by_pair.insert(pair, old),
                    None => index.by_pair.remove(&pair),
                };
            }
            return Err(e.into());
        }

        let mut index = self.lock_index();
        index.by_id.insert(id, Arc::new(Mutex::new(challenge)));
        info!(challenge = %id, team_a = %team_a, team_b = %team_b, "challenge created");
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    fn arc_of(&self, id: ChallengeId) -> Result<Arc<Mutex<Challenge>>, Error> {
        self.lock_index()
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id }.into())
    }

    /// Point-in-time snapshot of one challenge.
    pub fn get(&self, id: ChallengeId) -> Result<Challenge, Error> {
        let arc = self.arc_of(id)?;
        let challenge = arc.lock().unwrap_or_else(|e| e.into_inner());
        Ok(challenge.clone())
    }

    /// The non-terminal challenge between two teams, if any.
    pub fn active_by_pair(&self, a: TeamId, b: TeamId) -> Option<ChallengeId> {
        let pair = TeamPair::new(a, b);
        let (id, arc) = {
            let index = self.lock_index();
            let id = *index.by_pair.get(&pair)?;
            (id, Arc::clone(index.by_id.get(&id)?))
        };
        let challenge = arc.lock().unwrap_or_else(|e| e.into_inner());
        if challenge.phase().is_terminal() {
            None
        } else {
            Some(id)
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Apply one command to one challenge, persist, and fan out events.
    pub fn apply(&self, id: ChallengeId, command: Command) -> Result<Vec<ChallengeEvent>, Error> {
        let arc = self.arc_of(id)?;
        let mut challenge = arc.lock().unwrap_or_else(|e| e.into_inner());
        let now = self.now();
        let window = self.config.clock_window_ms();

        let events = match command {
            Command::PickMap { team, index } => challenge.pick_map(team, index),
            Command::SuggestMap { team, map } => challenge.suggest_map(team, &map, now),
            Command::ConfirmMap { team } => challenge.confirm_map(team),
            Command::SuggestServer { team, server } => {
                challenge.suggest_server(team, &server, now)
            }
            Command::ConfirmServer { team } => challenge.confirm_server(team),
            Command::SuggestTeamSize { team, size } => {
                challenge.suggest_team_size(team, size, now)
            }
            Command::ConfirmTeamSize { team } => challenge.confirm_team_size(team),
            Command::SuggestTime { team, at } => challenge.suggest_time(team, at, now),
            Command::ConfirmTime { team } => challenge.confirm_time(team),
            Command::StartClock { team } => challenge.start_clock(team, now, window),
            Command::ExtendClock { team } => challenge.extend_clock(team, now, window),
            Command::Report { team, score } => challenge.report(team, score, now),
            Command::ConfirmResult { team } => challenge.confirm_result(team, now),
            Command::AddOvertimePeriod { team } => challenge.add_overtime_period(team),
            Command::Void { by } => challenge.void(by, now),
        }?;

        self.commit(&challenge, events)
    }

    /// Persist the mutated aggregate, then notify. On a failed save the
    /// in-memory state stands and the caller sees a retryable error; the
    /// upsert is repeated by the next mutation or by `flush`.
    fn commit(
        &self,
        challenge: &Challenge,
        events: Vec<ChallengeEvent>,
    ) -> Result<Vec<ChallengeEvent>, Error> {
        if let Err(e) = self.store.save(challenge) {
            warn!(challenge = %challenge.id(), error = %e, "save failed, durable mirror behind");
            return Err(e.into());
        }
        for event in &events {
            debug!(challenge = %event.challenge(), kind = event.kind(), "event");
            self.notifier.notify(event);
        }
        Ok(events)
    }

    /// Re-save every challenge. Recovers the durable mirror after store
    /// outages.
    pub fn flush(&self) -> Result<usize, Error> {
        let arcs: Vec<_> = self.lock_index().by_id.values().cloned().collect();
        let mut written = 0;
        for arc in arcs {
            let challenge = arc.lock().unwrap_or_else(|e| e.into_inner());
            self.store.save(&challenge)?;
            written += 1;
        }
        Ok(written)
    }

    // ------------------------------------------------------------------
    // Rematch
    // ------------------------------------------------------------------

    /// Record a rematch request; spawns and links the successor when the
    /// request becomes mutual.
    pub fn request_rematch(
        &self,
        id: ChallengeId,
        team: TeamId,
    ) -> Result<Option<ChallengeId>, Error> {
        let arc = self.arc_of(id)?;
        let mut challenge = arc.lock().unwrap_or_else(|e| e.into_inner());

        let Some(seed) = challenge.request_rematch(team)? else {
            self.store.save(&challenge)?;
            return Ok(None);
        };

        // The successor's home maps come from the roster as it stands now,
        // not from the predecessor.
        let home_maps = match seed.home_map_team {
            None => Vec::new(),
            Some(team) => self.profile_of(team)?.home_maps,
        };
        let challenging = self.profile_of(seed.challenging)?;
        let challenged = self.profile_of(seed.challenged)?;
        let now = self.now();

        let init = NewChallenge {
            challenging: challenging.id,
            challenged: challenged.id,
            home_map_team: seed.home_map_team,
            home_maps,
            challenging_penalized: challenging.penalized,
            challenged_penalized: challenged.penalized,
            admin_created: false,
            predecessor: Some(seed.predecessor),
            locked_team_size: seed.team_size,
            locked_time: Some(now),
        };
        let successor = self.spawn(init, Some(id))?;

        challenge.set_successor(successor);
        let events = vec![ChallengeEvent::RematchLinked {
            challenge: id,
            successor,
        }];
        self.commit(&challenge, events)?;
        Ok(Some(successor))
    }

    // ------------------------------------------------------------------
    // Deadline sweep
    // ------------------------------------------------------------------

    /// Check every clocked challenge against its deadline. Each threshold
    /// fires at most one event per clock window; repeated sweeps are
    /// no-ops until state changes. Expiry only signals; it never voids.
    pub fn sweep_deadlines(&self) -> Vec<ChallengeEvent> {
        let arcs: Vec<_> = self.lock_index().by_id.values().cloned().collect();
        let now = self.now();
        let warning = self.config.deadline_warning_ms();
        let mut fired = Vec::new();

        for arc in arcs {
            let mut challenge = arc.lock().unwrap_or_else(|e| e.into_inner());
            if challenge.phase().is_terminal() {
                continue;
            }
            let status = challenge.clock().check_deadline(now, warning);
            if matches!(status, DeadlineStatus::Idle | DeadlineStatus::Ok) {
                continue;
            }
            let (Some(clocked_by), Some(deadline)) =
                (challenge.clock().clocked_by(), challenge.clock().deadline())
            else {
                continue;
            };
            let event = match status {
                DeadlineStatus::Idle | DeadlineStatus::Ok => None,
                DeadlineStatus::Approaching => challenge.clock_mut().mark_warned().then(|| {
                    ChallengeEvent::DeadlineApproaching {
                        challenge: challenge.id(),
                        clocked_by,
                        deadline,
                    }
                }),
                DeadlineStatus::Expired => challenge.clock_mut().mark_expired().then(|| {
                    ChallengeEvent::DeadlineExpired {
                        challenge: challenge.id(),
                        clocked_by,
                        deadline,
                    }
                }),
            };
            let Some(event) = event else { continue };
            match self.commit(&challenge, vec![event]) {
                Ok(mut events) => fired.append(&mut events),
                // Flag stays set in memory; flush repairs the mirror.
                Err(e) => warn!(challenge = %challenge.id(), error = %e, "sweep save failed"),
            }
        }
        fired
    }

    pub fn config(&self) -> &LeagueConfig {
        &self.config
    }
}
