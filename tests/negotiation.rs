//! End-to-end negotiation flows through the registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use faceoff::registry::ChallengeStore;
use faceoff::{
    Challenge, ChallengeError, ChallengeEvent, ChallengeId, ChallengePhase, ChallengeRegistry,
    ChannelNotifier, Command, CreateParams, Error, LeagueConfig, MapName, MemoryStore,
    Notifier, NullNotifier, Score, StaticDirectory, StoreError, TeamId, TeamProfile, WallClock,
};

fn team(n: u64) -> TeamId {
    TeamId::new(n).unwrap()
}

fn maps(names: &[&str]) -> Vec<MapName> {
    names.iter().map(|n| MapName::parse(*n).unwrap()).collect()
}

fn roster() -> StaticDirectory {
    let mut directory = StaticDirectory::new();
    directory.insert(TeamProfile {
        id: team(1),
        name: "Vortex".into(),
        home_maps: maps(&["Vault", "Keg", "Burning Indika"]),
        penalized: false,
    });
    directory.insert(TeamProfile {
        id: team(2),
        name: "Overkill".into(),
        home_maps: maps(&["Terminal", "Sync", "Foundry"]),
        penalized: false,
    });
    directory
}

fn registry_with_config(
    config: LeagueConfig,
) -> ChallengeRegistry<MemoryStore, StaticDirectory, NullNotifier> {
    ChallengeRegistry::new(MemoryStore::new(), roster(), NullNotifier, config)
}

fn registry() -> ChallengeRegistry<MemoryStore, StaticDirectory, NullNotifier> {
    registry_with_config(LeagueConfig::default())
}

fn standard_params() -> CreateParams {
    CreateParams {
        challenging: team(1),
        challenged: team(2),
        home_map_team: Some(team(2)),
        admin_created: false,
    }
}

fn report_and_confirm<N: Notifier>(
    registry: &ChallengeRegistry<MemoryStore, StaticDirectory, N>,
    id: ChallengeId,
) {
    registry
        .apply(
            id,
            Command::Report {
                team: team(1),
                score: Score::new(63, 45),
            },
        )
        .unwrap();
    registry
        .apply(id, Command::ConfirmResult { team: team(2) })
        .unwrap();
}

// ----------------------------------------------------------------------
// Field negotiation
// ----------------------------------------------------------------------

#[test]
fn full_negotiation_settles_every_field() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();

    // Home team picks its map directly.
    registry
        .apply(id, Command::PickMap { team: team(2), index: 0 })
        .unwrap();

    // Server and team size go through propose/confirm.
    registry
        .apply(
            id,
            Command::SuggestServer {
                team: team(1),
                server: "us-east".into(),
            },
        )
        .unwrap();
    registry
        .apply(id, Command::ConfirmServer { team: team(2) })
        .unwrap();
    registry
        .apply(id, Command::SuggestTeamSize { team: team(2), size: 3 })
        .unwrap();
    registry
        .apply(id, Command::ConfirmTeamSize { team: team(1) })
        .unwrap();

    let challenge = registry.get(id).unwrap();
    assert_eq!(challenge.map().value().unwrap().as_str(), "Terminal");
    assert_eq!(challenge.server().value().unwrap(), "us-east");
    assert!(challenge.team_size().is_locked());
}

#[test]
fn settled_field_rejects_further_proposals() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();

    registry
        .apply(
            id,
            Command::SuggestServer {
                team: team(1),
                server: "us-east".into(),
            },
        )
        .unwrap();
    registry
        .apply(id, Command::ConfirmServer { team: team(2) })
        .unwrap();

    let err = registry
        .apply(
            id,
            Command::SuggestServer {
                team: team(2),
                server: "eu-west".into(),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        Error::Challenge(ChallengeError::FieldAlreadyLocked { field: "server" })
    );
}

#[test]
fn proposer_cannot_confirm_own_value() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();

    registry
        .apply(id, Command::SuggestTeamSize { team: team(1), size: 2 })
        .unwrap();
    let err = registry
        .apply(id, Command::ConfirmTeamSize { team: team(1) })
        .unwrap_err();
    assert_eq!(
        err,
        Error::Challenge(ChallengeError::SelfConfirm { team: team(1) })
    );

    // The proposal survives and the other team can still settle it.
    registry
        .apply(id, Command::ConfirmTeamSize { team: team(2) })
        .unwrap();
}

#[test]
fn away_team_suggests_neutral_map_home_team_confirms() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();

    // A reserved home map cannot be smuggled in as "neutral".
    let err = registry
        .apply(
            id,
            Command::SuggestMap {
                team: team(1),
                map: "sync".into(),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Challenge(ChallengeError::ValueRejected { field: "map", .. })
    ));

    registry
        .apply(
            id,
            Command::SuggestMap {
                team: team(1),
                map: "Wreckage".into(),
            },
        )
        .unwrap();
    registry
        .apply(id, Command::ConfirmMap { team: team(2) })
        .unwrap();

    // The pick path is gone once the field settled.
    let err = registry
        .apply(id, Command::PickMap { team: team(2), index: 1 })
        .unwrap_err();
    assert_eq!(
        err,
        Error::Challenge(ChallengeError::FieldAlreadyLocked { field: "map" })
    );
}

// ----------------------------------------------------------------------
// Clock and deadline sweep
// ----------------------------------------------------------------------

#[test]
fn deadline_warning_fires_once_per_window() {
    // A one-hour window with a 48-hour warning threshold puts a freshly
    // clocked challenge straight into the warning band.
    let config = LeagueConfig {
        clock_window_hours: 1,
        deadline_warning_hours: 48,
        ..LeagueConfig::default()
    };
    let registry = registry_with_config(config);
    let id = registry.create(standard_params()).unwrap();
    registry
        .apply(id, Command::StartClock { team: team(1) })
        .unwrap();

    let events = registry.sweep_deadlines();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        ChallengeEvent::DeadlineApproaching { challenge, clocked_by, .. }
            if challenge == id && clocked_by == team(1)
    ));

    // Repeated sweeps stay quiet until the clock changes.
    assert!(registry.sweep_deadlines().is_empty());

    // Extending resets the window and re-arms the warning.
    registry
        .apply(id, Command::ExtendClock { team: team(2) })
        .unwrap();
    assert_eq!(registry.sweep_deadlines().len(), 1);
}

#[test]
fn expired_deadline_signals_without_voiding() {
    // Zero-hour window: the deadline is the moment the clock starts.
    let config = LeagueConfig {
        clock_window_hours: 0,
        deadline_warning_hours: 0,
        ..LeagueConfig::default()
    };
    let registry = registry_with_config(config);
    let id = registry.create(standard_params()).unwrap();
    registry
        .apply(id, Command::StartClock { team: team(1) })
        .unwrap();

    let events = registry.sweep_deadlines();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ChallengeEvent::DeadlineExpired { .. }));
    assert!(registry.sweep_deadlines().is_empty());

    // Expiry is a signal: the challenge still accepts a result.
    report_and_confirm(&registry, id);
    assert_eq!(registry.get(id).unwrap().phase(), ChallengePhase::Closed);
}

#[test]
fn second_clock_on_same_challenge_is_rejected() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();

    registry
        .apply(id, Command::StartClock { team: team(1) })
        .unwrap();
    let err = registry
        .apply(id, Command::StartClock { team: team(2) })
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Challenge(ChallengeError::InvalidState { op: "clock", .. })
    ));
}

// ----------------------------------------------------------------------
// Results
// ----------------------------------------------------------------------

#[test]
fn tied_score_needs_an_overtime_period() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();

    let err = registry
        .apply(
            id,
            Command::Report {
                team: team(1),
                score: Score::new(50, 50),
            },
        )
        .unwrap_err();
    assert_eq!(
        err,
        Error::Challenge(ChallengeError::TiedScoreRequiresOvertime)
    );

    registry
        .apply(id, Command::AddOvertimePeriod { team: team(1) })
        .unwrap();
    registry
        .apply(
            id,
            Command::Report {
                team: team(1),
                score: Score::new(50, 50),
            },
        )
        .unwrap();
    registry
        .apply(id, Command::ConfirmResult { team: team(2) })
        .unwrap();

    let challenge = registry.get(id).unwrap();
    assert_eq!(challenge.ledger().overtime_periods(), 1);
    assert_eq!(challenge.phase(), ChallengePhase::Closed);
}

#[test]
fn confirm_without_report_and_self_confirm_are_rejected() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();

    let err = registry
        .apply(id, Command::ConfirmResult { team: team(2) })
        .unwrap_err();
    assert_eq!(err, Error::Challenge(ChallengeError::NoReport));

    registry
        .apply(
            id,
            Command::Report {
                team: team(1),
                score: Score::new(63, 45),
            },
        )
        .unwrap();
    let err = registry
        .apply(id, Command::ConfirmResult { team: team(1) })
        .unwrap_err();
    assert_eq!(
        err,
        Error::Challenge(ChallengeError::SelfConfirm { team: team(1) })
    );
}

#[test]
fn voided_challenge_is_inert_and_frees_the_pair() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();
    registry.apply(id, Command::Void { by: None }).unwrap();

    let err = registry
        .apply(
            id,
            Command::Report {
                team: team(1),
                score: Score::new(1, 0),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Challenge(ChallengeError::InvalidState {
            op: "report",
            phase: ChallengePhase::Voided
        })
    ));

    assert_eq!(registry.active_by_pair(team(1), team(2)), None);
    registry.create(standard_params()).unwrap();
}

// ----------------------------------------------------------------------
// Pair uniqueness
// ----------------------------------------------------------------------

#[test]
fn one_active_challenge_per_pair() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();
    assert_eq!(registry.active_by_pair(team(2), team(1)), Some(id));

    // Reversed roles still hit the same pair slot.
    let err = registry
        .create(CreateParams {
            challenging: team(2),
            challenged: team(1),
            home_map_team: None,
            admin_created: false,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Challenge(ChallengeError::DuplicateActiveChallenge { .. })
    ));

    report_and_confirm(&registry, id);
    registry.create(standard_params()).unwrap();
}

// ----------------------------------------------------------------------
// Rematch
// ----------------------------------------------------------------------

#[test]
fn mutual_rematch_spawns_swapped_successor() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();
    registry
        .apply(id, Command::SuggestTeamSize { team: team(1), size: 4 })
        .unwrap();
    registry
        .apply(id, Command::ConfirmTeamSize { team: team(2) })
        .unwrap();
    report_and_confirm(&registry, id);

    assert_eq!(registry.request_rematch(id, team(1)).unwrap(), None);
    let successor = registry.request_rematch(id, team(2)).unwrap().unwrap();

    let old = registry.get(id).unwrap();
    assert_eq!(old.successor(), Some(successor));

    let new = registry.get(successor).unwrap();
    assert_eq!(new.challenging(), team(2));
    assert_eq!(new.challenged(), team(1));
    assert_eq!(new.predecessor(), Some(id));
    // Home-map privilege swaps; the map itself is renegotiated from the
    // new home team's roster maps.
    assert_eq!(new.home_map_team(), Some(team(1)));
    assert_eq!(new.map().candidates(), &maps(&["Vault", "Keg", "Burning Indika"])[..]);
    assert!(new.map().value().is_none());
    // Team size carries over already locked.
    assert_eq!(new.team_size().value().unwrap().value(), 4);
}

#[test]
fn rematch_requests_are_idempotent_after_linking() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();
    report_and_confirm(&registry, id);

    registry.request_rematch(id, team(1)).unwrap();
    registry.request_rematch(id, team(1)).unwrap();
    let successor = registry.request_rematch(id, team(2)).unwrap().unwrap();

    // Further requests do not spawn a second successor.
    assert_eq!(registry.request_rematch(id, team(1)).unwrap(), None);
    assert_eq!(registry.request_rematch(id, team(2)).unwrap(), None);
    assert_eq!(registry.get(id).unwrap().successor(), Some(successor));
}

#[test]
fn rematch_requires_a_closed_challenge() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();

    let err = registry.request_rematch(id, team(1)).unwrap_err();
    assert!(matches!(
        err,
        Error::Challenge(ChallengeError::InvalidState { op: "rematch", .. })
    ));
}

// ----------------------------------------------------------------------
// Event fan-out
// ----------------------------------------------------------------------

#[test]
fn notifier_sees_every_transition_in_order() {
    let (notifier, events) = ChannelNotifier::unbounded();
    let registry = ChallengeRegistry::new(
        MemoryStore::new(),
        roster(),
        notifier,
        LeagueConfig::default(),
    );
    let id = registry.create(standard_params()).unwrap();

    registry
        .apply(
            id,
            Command::SuggestServer {
                team: team(1),
                server: "us-east".into(),
            },
        )
        .unwrap();
    registry
        .apply(id, Command::ConfirmServer { team: team(2) })
        .unwrap();
    report_and_confirm(&registry, id);

    let kinds: Vec<&str> = events.try_iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, ["proposed", "locked", "reported", "closed"]);
}

// ----------------------------------------------------------------------
// Store failure
// ----------------------------------------------------------------------

struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ChallengeStore for FlakyStore {
    fn save(&self, challenge: &Challenge) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "backend offline".into(),
            });
        }
        self.inner.save(challenge)
    }

    fn load(&self, id: ChallengeId) -> Result<Challenge, StoreError> {
        self.inner.load(id)
    }

    fn load_all(&self) -> Result<Vec<Challenge>, StoreError> {
        self.inner.load_all()
    }
}

struct SlowStore {
    inner: MemoryStore,
}

impl ChallengeStore for SlowStore {
    fn save(&self, challenge: &Challenge) -> Result<(), StoreError> {
        // Widen the window between the duplicate check and the insert.
        std::thread::sleep(std::time::Duration::from_millis(50));
        self.inner.save(challenge)
    }

    fn load(&self, id: ChallengeId) -> Result<Challenge, StoreError> {
        self.inner.load(id)
    }

    fn load_all(&self) -> Result<Vec<Challenge>, StoreError> {
        self.inner.load_all()
    }
}

#[test]
fn concurrent_creates_for_one_pair_yield_a_single_challenge() {
    let registry = ChallengeRegistry::new(
        SlowStore {
            inner: MemoryStore::new(),
        },
        roster(),
        NullNotifier,
        LeagueConfig::default(),
    );
    let barrier = std::sync::Barrier::new(2);

    let (first, second) = std::thread::scope(|s| {
        let a = s.spawn(|| {
            barrier.wait();
            registry.create(standard_params())
        });
        let b = s.spawn(|| {
            barrier.wait();
            registry.create(CreateParams {
                challenging: team(2),
                challenged: team(1),
                home_map_team: None,
                admin_created: false,
            })
        });
        (a.join().unwrap(), b.join().unwrap())
    });

    // Exactly one creator wins; the other sees the duplicate rejection.
    let (winner, loser) = match (&first, &second) {
        (Ok(id), Err(e)) | (Err(e), Ok(id)) => (*id, e.clone()),
        other => panic!("expected one success and one rejection, got {other:?}"),
    };
    assert!(matches!(
        loser,
        Error::Challenge(ChallengeError::DuplicateActiveChallenge { .. })
    ));
    assert_eq!(registry.active_by_pair(team(1), team(2)), Some(winner));
}

#[test]
fn failed_save_is_retryable_and_flush_repairs_the_mirror() {
    let store = Arc::new(FlakyStore::new());
    let registry = ChallengeRegistry::new(
        Arc::clone(&store),
        roster(),
        NullNotifier,
        LeagueConfig::default(),
    );
    let id = registry.create(standard_params()).unwrap();

    store.set_failing(true);
    let err = registry
        .apply(
            id,
            Command::SuggestServer {
                team: team(1),
                server: "us-east".into(),
            },
        )
        .unwrap_err();
    assert!(err.transience().is_retryable());

    // The in-memory aggregate kept the mutation; only the mirror lags.
    let challenge = registry.get(id).unwrap();
    assert!(challenge.server().pending().is_some());
    assert!(store.load(id).unwrap().server().pending().is_none());

    store.set_failing(false);
    registry.flush().unwrap();
    assert!(store.load(id).unwrap().server().pending().is_some());
}

#[test]
fn failed_create_does_not_wedge_the_pair() {
    let store = Arc::new(FlakyStore::new());
    let registry = ChallengeRegistry::new(
        Arc::clone(&store),
        roster(),
        NullNotifier,
        LeagueConfig::default(),
    );

    store.set_failing(true);
    assert!(registry.create(standard_params()).is_err());

    // The reservation rolled back; the pair is free again.
    store.set_failing(false);
    registry.create(standard_params()).unwrap();
}

#[test]
fn suggest_time_schedules_the_match() {
    let registry = registry();
    let id = registry.create(standard_params()).unwrap();

    registry
        .apply(
            id,
            Command::SuggestTime {
                team: team(1),
                at: WallClock::from_ms(1_900_000_000_000),
            },
        )
        .unwrap();
    registry
        .apply(id, Command::ConfirmTime { team: team(2) })
        .unwrap();
    assert_eq!(registry.get(id).unwrap().phase(), ChallengePhase::Scheduled);

    // A scheduled match can no longer be put on the clock.
    let err = registry
        .apply(id, Command::StartClock { team: team(1) })
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Challenge(ChallengeError::InvalidState {
            op: "clock",
            phase: ChallengePhase::Scheduled
        })
    ));
}
