//! Sync configuration - per-entity tuning knobs
//!
//! Everything here is set by the host, usually once at spawn, and may be
//! loaded from RON:
//!
//! ```
//! use glide_netcode::SyncConfig;
//!
//! let config = SyncConfig::from_ron_str("(client_authority: true, send_interval: 0.1)").unwrap();
//! assert!(config.client_authority);
//! assert_eq!(config.buffer_size_limit, 64);
//! ```
//!
//! `buffer_time_multiplier` and the catch-up threshold describe the same
//! thing in different units (seconds vs. entries). They are only tied
//! together by [`SyncConfig::validate`], which nudges the counts up to a
//! sensible minimum. The interpolation step never derives one from the
//! other.

use crate::codec::SyncFields;
use crate::interpolation::CatchupSettings;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Upper bound for `buffer_time_multiplier`; the buffer limit is raised to
/// match it, so it also bounds per-entity memory
pub const MAX_BUFFER_TIME_MULTIPLIER: f64 = 1024.0;

/// Configuration for one synchronized entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Moves come from the owning client instead of the server
    pub client_authority: bool,
    /// Seconds between sends
    pub send_interval: f64,

    pub sync_position: bool,
    pub sync_rotation: bool,
    pub sync_scale: bool,

    /// Apply interpolated values (true) or jump to the goal (false)
    pub interpolate_position: bool,
    pub interpolate_rotation: bool,
    pub interpolate_scale: bool,

    /// Desired buffer depth as a multiple of `send_interval`
    pub buffer_time_multiplier: f64,
    /// Hard cap on buffered snapshots per direction
    pub buffer_size_limit: usize,
    /// Buffer length above which playback accelerates
    pub catchup_threshold: usize,
    /// Acceleration per excess buffered snapshot, 0 to 1
    pub catchup_multiplier: f64,

    /// Skip sends while the position is unchanged
    pub only_send_on_move: bool,
    /// With `only_send_on_move`, a receive gap longer than this many send
    /// intervals resets the buffers
    pub time_multiplier_to_reset_buffers: f64,

    /// Never send automatically; the host triggers sends
    pub manual_trigger_send: bool,
    /// Join the shared batch so all such entities send on the same tick
    pub sync_send_interval: bool,
}

impl SyncConfig {
    /// Parse a configuration from RON, then validate it
    pub fn from_ron_str(content: &str) -> Result<Self> {
        let mut config: SyncConfig = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a RON configuration file
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Reject unusable values and raise the buffer counts to their minimums
    ///
    /// For a buffer time multiplier of 3 there are usually at least 3
    /// snapshots buffered, often 4-5, so catch-up should not start before
    /// `ceil(multiplier) + 3` entries, and the size limit must hold at least
    /// `ceil(multiplier)`.
    pub fn validate(&mut self) -> Result<()> {
        if !self.send_interval.is_finite() || self.send_interval <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "send_interval must be positive, got {}",
                self.send_interval
            )));
        }
        if !(0.0..=MAX_BUFFER_TIME_MULTIPLIER).contains(&self.buffer_time_multiplier) {
            return Err(Error::InvalidConfig(format!(
                "buffer_time_multiplier must be within 0..={}, got {}",
                MAX_BUFFER_TIME_MULTIPLIER, self.buffer_time_multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.catchup_multiplier) {
            return Err(Error::InvalidConfig(format!(
                "catchup_multiplier must be within 0..=1, got {}",
                self.catchup_multiplier
            )));
        }
        if !self.time_multiplier_to_reset_buffers.is_finite()
            || self.time_multiplier_to_reset_buffers < 0.0
        {
            return Err(Error::InvalidConfig(format!(
                "time_multiplier_to_reset_buffers must be non-negative, got {}",
                self.time_multiplier_to_reset_buffers
            )));
        }
        if self.buffer_size_limit == 0 {
            return Err(Error::InvalidConfig(
                "buffer_size_limit must be at least 1".to_string(),
            ));
        }

        let multiplier_ceil = self.buffer_time_multiplier.ceil() as usize;

        let min_threshold = multiplier_ceil.saturating_add(3);
        if self.catchup_threshold < min_threshold {
            debug!(
                from = self.catchup_threshold,
                to = min_threshold,
                "raising catchup_threshold"
            );
            self.catchup_threshold = min_threshold;
        }

        if self.buffer_size_limit < multiplier_ceil {
            debug!(
                from = self.buffer_size_limit,
                to = multiplier_ceil,
                "raising buffer_size_limit"
            );
            self.buffer_size_limit = multiplier_ceil;
        }

        Ok(())
    }

    /// Desired buffer depth in seconds
    pub fn buffer_time(&self) -> f64 {
        self.send_interval * self.buffer_time_multiplier
    }

    /// Receive gap that triggers a buffer reset with `only_send_on_move`
    pub fn reset_gap(&self) -> f64 {
        self.time_multiplier_to_reset_buffers * self.send_interval
    }

    /// Components to put on the wire
    pub fn sync_fields(&self) -> SyncFields {
        SyncFields {
            position: self.sync_position,
            rotation: self.sync_rotation,
            scale: self.sync_scale,
        }
    }

    /// Catch-up settings for the interpolator
    pub fn catchup(&self) -> CatchupSettings {
        CatchupSettings::new(self.catchup_threshold, self.catchup_multiplier)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            client_authority: false,
            send_interval: 0.050,
            sync_position: true,
            sync_rotation: true,
            sync_scale: false,
            interpolate_position: true,
            interpolate_rotation: true,
            interpolate_scale: false,
            buffer_time_multiplier: 1.0,
            buffer_size_limit: 64,
            catchup_threshold: 4,
            catchup_multiplier: 0.10,
            only_send_on_move: false,
            time_multiplier_to_reset_buffers: 3.0,
            manual_trigger_send: false,
            sync_send_interval: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert!(!config.client_authority);
        assert_eq!(config.send_interval, 0.05);
        assert_eq!(config.buffer_size_limit, 64);
        assert_eq!(config.catchup_threshold, 4);
        assert!(config.sync_send_interval);
        assert_eq!(config.sync_fields(), SyncFields::default());
    }

    #[test]
    fn test_default_survives_validation_unchanged() {
        let mut config = SyncConfig::default();
        config.validate().unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_load_partial_ron() {
        let content = r#"
        (
            client_authority: true,
            send_interval: 0.1,
            sync_scale: true,
            only_send_on_move: true,
        )
        "#;

        let config = SyncConfig::from_ron_str(content).unwrap();
        assert!(config.client_authority);
        assert_eq!(config.send_interval, 0.1);
        assert!(config.sync_scale);
        assert!(config.only_send_on_move);
        // Unlisted fields keep their defaults
        assert_eq!(config.catchup_multiplier, 0.10);
    }

    #[test]
    fn test_validate_raises_counts() {
        let mut config = SyncConfig {
            buffer_time_multiplier: 2.5,
            catchup_threshold: 2,
            buffer_size_limit: 2,
            ..SyncConfig::default()
        };
        config.validate().unwrap();

        assert_eq!(config.catchup_threshold, 6);
        assert_eq!(config.buffer_size_limit, 3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            SyncConfig {
                send_interval: 0.0,
                ..SyncConfig::default()
            },
            SyncConfig {
                send_interval: f64::NAN,
                ..SyncConfig::default()
            },
            SyncConfig {
                catchup_multiplier: 1.5,
                ..SyncConfig::default()
            },
            SyncConfig {
                buffer_size_limit: 0,
                ..SyncConfig::default()
            },
            SyncConfig {
                buffer_time_multiplier: -1.0,
                ..SyncConfig::default()
            },
            SyncConfig {
                buffer_time_multiplier: 1e30,
                ..SyncConfig::default()
            },
            SyncConfig {
                buffer_time_multiplier: f64::INFINITY,
                ..SyncConfig::default()
            },
        ];

        for mut config in bad {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_huge_multiplier_from_ron_is_rejected() {
        let result = SyncConfig::from_ron_str("(buffer_time_multiplier: 1e30)");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        let config = SyncConfig::from_ron_str("(buffer_time_multiplier: 1024.0)").unwrap();
        assert_eq!(config.catchup_threshold, 1027);
        assert_eq!(config.buffer_size_limit, 1024);
    }

    #[test]
    fn test_bad_ron_is_parse_error() {
        let result = SyncConfig::from_ron_str("(send_interval: \"fast\")");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_derived_times() {
        let config = SyncConfig {
            send_interval: 0.1,
            buffer_time_multiplier: 3.0,
            time_multiplier_to_reset_buffers: 2.0,
            ..SyncConfig::default()
        };
        assert!((config.buffer_time() - 0.3).abs() < 1e-12);
        assert!((config.reset_gap() - 0.2).abs() < 1e-12);
    }
}
