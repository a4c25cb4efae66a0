//! Layer 1: Identity atoms
//!
//! TeamId: league team identifier
//! ChallengeId: challenge identifier (registry-assigned)
//! MapName: validated map name with case-insensitive matching

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ChallengeError;

/// Team identifier - non-zero integer assigned by the league roster.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(u64);

impl TeamId {
    pub fn new(id: u64) -> Result<Self, ChallengeError> {
        if id == 0 {
            Err(ChallengeError::ValueRejected {
                field: "team",
                reason: "team id must be non-zero".into(),
            })
        } else {
            Ok(Self(id))
        }
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TeamId({})", self.0)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Challenge identifier.
///
/// Only the registry generates new ids.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(Uuid);

impl ChallengeId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, ChallengeError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ChallengeError::ValueRejected {
                field: "challenge",
                reason: format!("invalid challenge id `{s}`: {e}"),
            })
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChallengeId({})", self.0)
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Map name - trimmed, non-empty, case-preserving.
///
/// Equality and ordering use a case-folded key so that "Vault" and
/// "vault" refer to the same map in candidate checks.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MapName {
    display: String,
}

impl MapName {
    pub fn parse(s: impl Into<String>) -> Result<Self, ChallengeError> {
        let display = s.into().trim().to_string();
        if display.is_empty() {
            return Err(ChallengeError::ValueRejected {
                field: "map",
                reason: "map name is empty".into(),
            });
        }
        Ok(Self { display })
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    fn key(&self) -> String {
        self.display.to_lowercase()
    }
}

impl PartialEq for MapName {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for MapName {}

impl PartialOrd for MapName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MapName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Debug for MapName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MapName({:?})", self.display)
    }
}

impl fmt::Display for MapName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

impl TryFrom<String> for MapName {
    type Error = ChallengeError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        MapName::parse(s)
    }
}

impl From<MapName> for String {
    fn from(m: MapName) -> String {
        m.display
    }
}
