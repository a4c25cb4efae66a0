//! The result ledger.
//!
//! Records a reported score, runs the confirm/dispute cycle, and
//! finalizes the outcome. A report from one team can only be confirmed
//! by the other; confirmation is terminal. Voiding is the administrative
//! escape hatch, mutually exclusive with confirmation.

use serde::{Deserialize, Serialize};

use super::domain::Score;
use super::identity::TeamId;
use super::time::WallClock;

/// Ledger-level rejections, converted by the aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerError {
    /// Already confirmed or voided.
    Terminal,
    TiedScoreRequiresOvertime,
    NoReport,
    SelfConfirm { team: TeamId },
}

/// A reported score awaiting confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub score: Score,
    pub by: TeamId,
    pub at: WallClock,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLedger {
    report: Option<Report>,
    confirmed: bool,
    overtime_periods: u8,
    closed_at: Option<WallClock>,
    voided_at: Option<WallClock>,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a score. A newer report supersedes any unconfirmed one -
    /// the confirm step is the agreement point, so the latest claim is
    /// what the other side confirms.
    pub fn report(
        &mut self,
        team: TeamId,
        score: Score,
        now: WallClock,
    ) -> Result<(), LedgerError> {
        if self.is_terminal() {
            return Err(LedgerError::Terminal);
        }
        if score.is_tie() && self.overtime_periods == 0 {
            return Err(LedgerError::TiedScoreRequiresOvertime);
        }
        self.report = Some(Report {
            score,
            by: team,
            at: now,
        });
        Ok(())
    }

    /// Confirm the pending report. Terminal: closes the challenge.
    pub fn confirm(&mut self, team: TeamId, now: WallClock) -> Result<Report, LedgerError> {
        if self.is_terminal() {
            return Err(LedgerError::Terminal);
        }
        let report = self.report.ok_or(LedgerError::NoReport)?;
        if report.by == team {
            return Err(LedgerError::SelfConfirm { team });
        }
        self.confirmed = true;
        self.closed_at = Some(now);
        Ok(report)
    }

    /// Record an overtime period so a tied score becomes reportable.
    pub fn add_overtime_period(&mut self) -> Result<u8, LedgerError> {
        if self.is_terminal() {
            return Err(LedgerError::Terminal);
        }
        self.overtime_periods = self.overtime_periods.saturating_add(1);
        Ok(self.overtime_periods)
    }

    /// Administrative void. Terminal, mutually exclusive with confirm.
    pub fn void(&mut self, now: WallClock) -> Result<(), LedgerError> {
        if self.is_terminal() {
            return Err(LedgerError::Terminal);
        }
        self.voided_at = Some(now);
        Ok(())
    }

    pub fn pending_report(&self) -> Option<&Report> {
        if self.confirmed {
            None
        } else {
            self.report.as_ref()
        }
    }

    pub fn confirmed_report(&self) -> Option<&Report> {
        if self.confirmed {
            self.report.as_ref()
        } else {
            None
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn is_voided(&self) -> bool {
        self.voided_at.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.confirmed || self.is_voided()
    }

    pub fn overtime_periods(&self) -> u8 {
        self.overtime_periods
    }

    pub fn closed_at(&self) -> Option<WallClock> {
        self.closed_at
    }

    pub fn voided_at(&self) -> Option<WallClock> {
        self.voided_at
    }
}
