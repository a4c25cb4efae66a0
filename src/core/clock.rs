//! The scheduling clock.
//!
//! A team may put a challenge "on the clock": a fixed window (28 days by
//! default) after which the match is forfeit-eligible. The registry's
//! sweep polls `check_deadline`; the notified-once flags keep each
//! threshold from firing twice.

use serde::{Deserialize, Serialize};

use super::identity::TeamId;
use super::time::WallClock;

/// Clock-level rejections, converted by the aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockError {
    AlreadyClocked,
    NotClocked,
}

/// Where a clocked challenge stands relative to its deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeadlineStatus {
    /// No clock has been started.
    Idle,
    /// Clocked, deadline comfortably ahead.
    Ok,
    /// Deadline inside the warning window.
    Approaching,
    /// Deadline passed; the challenge is forfeit-eligible.
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct ClockState {
    clocked_at: WallClock,
    deadline: WallClock,
    by: TeamId,
    warning_sent: bool,
    expiry_sent: bool,
}

/// Tracks the optional scheduling deadline attached to a challenge.
///
/// The deadline is set at most once per challenge (extension resets it
/// within the same clock; it never starts a second clock).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockController {
    state: Option<ClockState>,
}

impl ClockController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock. Fails if one is already running.
    pub fn start(
        &mut self,
        team: TeamId,
        now: WallClock,
        window_ms: u64,
    ) -> Result<WallClock, ClockError> {
        if self.state.is_some() {
            return Err(ClockError::AlreadyClocked);
        }
        let deadline = now.plus_ms(window_ms);
        self.state = Some(ClockState {
            clocked_at: now,
            deadline,
            by: team,
            warning_sent: false,
            expiry_sent: false,
        });
        Ok(deadline)
    }

    /// Reset the deadline to a fresh window. A fresh deadline gets fresh
    /// reminders, so both notified flags clear.
    pub fn extend(&mut self, now: WallClock, window_ms: u64) -> Result<WallClock, ClockError> {
        let state = self.state.as_mut().ok_or(ClockError::NotClocked)?;
        state.deadline = now.plus_ms(window_ms);
        state.warning_sent = false;
        state.expiry_sent = false;
        Ok(state.deadline)
    }

    /// Pure deadline check, called by the registry's periodic sweep.
    pub fn check_deadline(&self, now: WallClock, warning_ms: u64) -> DeadlineStatus {
        let Some(state) = &self.state else {
            return DeadlineStatus::Idle;
        };
        if now >= state.deadline {
            DeadlineStatus::Expired
        } else if now.until(state.deadline) <= warning_ms {
            DeadlineStatus::Approaching
        } else {
            DeadlineStatus::Ok
        }
    }

    /// Flag the warning notification. Returns true the first time only.
    pub fn mark_warned(&mut self) -> bool {
        match self.state.as_mut() {
            Some(state) if !state.warning_sent => {
                state.warning_sent = true;
                true
            }
            _ => false,
        }
    }

    /// Flag the expiry notification. Returns true the first time only.
    pub fn mark_expired(&mut self) -> bool {
        match self.state.as_mut() {
            Some(state) if !state.expiry_sent => {
                state.expiry_sent = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_clocked(&self) -> bool {
        self.state.is_some()
    }

    pub fn deadline(&self) -> Option<WallClock> {
        self.state.as_ref().map(|s| s.deadline)
    }

    pub fn clocked_by(&self) -> Option<TeamId> {
        self.state.as_ref().map(|s| s.by)
    }
}
