//! Core challenge-negotiation logic, layered bottom-up:
//!
//! - Layer 0: `time`, `identity`, `domain` (atoms: clocks, ids, scores)
//! - Layer 1: `error`, `event` (classified errors, notification events)
//! - Layer 2: `field`, `clock`, `ledger`, `rematch` (sub-state machines)
//! - Layer 3: `challenge` (the aggregate)
//!
//! Nothing in here performs I/O. Commands return the events they imply;
//! persistence and notification fan-out live in the registry layer.

pub mod challenge;
pub mod clock;
pub mod domain;
pub mod error;
pub mod event;
pub mod field;
pub mod identity;
pub mod ledger;
pub mod rematch;
pub mod time;

pub use challenge::{Challenge, NewChallenge};
pub use clock::{ClockController, DeadlineStatus};
pub use domain::{ChallengePhase, Score, Side, TeamSize};
pub use error::{ChallengeError, StoreError};
pub use event::{ChallengeEvent, FieldValue};
pub use field::{MapField, Negotiable, Proposal};
pub use identity::{ChallengeId, MapName, TeamId};
pub use ledger::{Report, ResultLedger};
pub use rematch::{RematchLinker, RematchRequest, RematchSeed};
pub use time::{Clock, WallClock};
