//! Crate-level error surface.
//!
//! Every error carries two classifications: whether retrying could help
//! (`Transience`) and whether the failed operation may have mutated
//! state anyway (`Effect`). Callers branch on those instead of matching
//! variants they do not otherwise care about.

use thiserror::Error;

use crate::core::{ChallengeError, StoreError};

/// Whether a retry of the failed operation could succeed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transience {
    /// Retrying cannot help; the rejection is inherent to the request.
    Permanent,
    /// Retrying the same operation may succeed.
    Retryable,
    /// Not enough information to say.
    Unknown,
}

impl Transience {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// Whether the failed operation may have left a side effect behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// The operation definitely changed nothing.
    None,
    /// The operation definitely changed something before failing.
    Some,
    /// The effect is indeterminate (e.g. a store write timed out).
    Unknown,
}

/// Any failure the registry layer can surface.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub fn transience(&self) -> Transience {
        match self {
            Error::Challenge(e) => e.transience(),
            Error::Store(e) => e.transience(),
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Error::Challenge(e) => e.effect(),
            Error::Store(e) => e.effect(),
        }
    }
}
