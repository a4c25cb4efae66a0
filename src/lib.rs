//! Challenge negotiation for a head-to-head league.
//!
//! One team challenges another; the match parameters (map, server, team
//! size, start time) are settled field by field through propose/confirm,
//! an optional scheduling clock imposes a deadline, the result goes
//! through a report/confirm cycle, and a mutual rematch request spawns a
//! linked successor with roles swapped.
//!
//! The [`core`] module is pure state-machine logic; [`registry`] adds
//! persistence, uniqueness enforcement, event fan-out, and the deadline
//! sweep on top of pluggable capabilities ([`registry::ChallengeStore`],
//! [`registry::TeamDirectory`], [`registry::Notifier`]).

#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod error;
pub mod registry;
pub mod telemetry;

pub use config::LeagueConfig;
pub use crate::core::{
    Challenge, ChallengeError, ChallengeEvent, ChallengeId, ChallengePhase, MapName, Score, Side,
    StoreError, TeamId, TeamSize, WallClock,
};
pub use error::{Effect, Error, Transience};
pub use registry::{
    ChallengeRegistry, ChallengeStore, ChannelNotifier, Command, CreateParams, MemoryStore,
    Notifier, NullNotifier, StaticDirectory, TeamDirectory, TeamPair, TeamProfile,
};

pub type Result<T> = std::result::Result<T, Error>;
