//! Core protocol errors.
//!
//! These are bounded and stable: every variant is a request-rejection
//! error, deterministic given current state, and surfaced verbatim to
//! the initiating command's caller. None of them require retry logic.

use thiserror::Error;

use crate::error::{Effect, Transience};

use super::domain::ChallengePhase;
use super::identity::{ChallengeId, TeamId};

/// Canonical error enum for the challenge protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChallengeError {
    /// Operation not valid in the current lifecycle phase.
    #[error("`{op}` is not valid while the challenge is {phase}")]
    InvalidState {
        op: &'static str,
        phase: ChallengePhase,
    },

    /// Actor is not a participant or lacks the required role.
    #[error("team {team} is not eligible for this operation")]
    NotEligible { team: TeamId },

    /// A team cannot confirm its own proposal or report.
    #[error("team {team} cannot confirm its own submission")]
    SelfConfirm { team: TeamId },

    /// Domain validation failure (disallowed map, bad team size, ...).
    #[error("{field} rejected: {reason}")]
    ValueRejected { field: &'static str, reason: String },

    /// The unordered team pair already has a non-terminal challenge.
    #[error("teams {team_a} and {team_b} already have an active challenge")]
    DuplicateActiveChallenge { team_a: TeamId, team_b: TeamId },

    /// The field settled already; no further proposals are accepted.
    #[error("the {field} field is already locked")]
    FieldAlreadyLocked { field: &'static str },

    /// A tied score needs an explicit overtime period before reporting.
    #[error("a tied score requires at least one overtime period")]
    TiedScoreRequiresOvertime,

    /// Nothing to confirm on this field.
    #[error("no pending proposal on the {field} field")]
    NoProposal { field: &'static str },

    /// Nothing to confirm on the ledger.
    #[error("no reported score to confirm")]
    NoReport,
}

impl ChallengeError {
    pub fn transience(&self) -> Transience {
        // Pure domain/input failures - retrying without changing state
        // will never help.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

/// Persistence failures, kept apart from domain validation.
///
/// A failed save never corrupts in-memory state: the aggregate keeps its
/// post-mutation state and the registry retries the write (idempotent
/// upsert) rather than undoing the mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("challenge {id} not found in store")]
    NotFound { id: ChallengeId },

    #[error("challenge store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn transience(&self) -> Transience {
        match self {
            StoreError::NotFound { .. } => Transience::Permanent,
            StoreError::Unavailable { .. } => Transience::Retryable,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            StoreError::NotFound { .. } => Effect::None,
            // The in-memory mutation may already have applied; only the
            // durable mirror is behind.
            StoreError::Unavailable { .. } => Effect::Unknown,
        }
    }
}
