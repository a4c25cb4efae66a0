//! League configuration.
//!
//! Loaded from a TOML file; every knob has a default so a missing or
//! partial file still yields a working configuration. A malformed file
//! logs a warning and falls back to defaults rather than failing the
//! process.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tunable parameters for challenge negotiation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LeagueConfig {
    /// Scheduling window once a challenge is put on the clock.
    pub clock_window_hours: u64,
    /// How far before the deadline the warning notification fires.
    pub deadline_warning_hours: u64,
    /// Cadence of the registry's deadline sweep.
    pub sweep_interval_minutes: u64,
    /// Home maps a team must have registered to receive challenges.
    pub home_maps_required: usize,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            clock_window_hours: 28 * 24,
            deadline_warning_hours: 48,
            sweep_interval_minutes: 60,
            home_maps_required: 3,
        }
    }
}

impl LeagueConfig {
    /// Read the config file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                return Self::default();
            }
        };
        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config malformed, using defaults");
                Self::default()
            }
        }
    }

    /// Write the config atomically (temp file + rename) so a crash never
    /// leaves a half-written file behind.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(raw.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn clock_window_ms(&self) -> u64 {
        self.clock_window_hours.saturating_mul(60 * 60 * 1000)
    }

    pub fn deadline_warning_ms(&self) -> u64 {
        self.deadline_warning_hours.saturating_mul(60 * 60 * 1000)
    }

    pub fn sweep_interval_ms(&self) -> u64 {
        self.sweep_interval_minutes.saturating_mul(60 * 1000)
    }
}
