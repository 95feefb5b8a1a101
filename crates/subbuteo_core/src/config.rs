//! Tunable match rules.
//!
//! All constants the rule engine and the flick controller consult live in
//! [`RulesConfig`]. `Default` reproduces the reference table-football rules;
//! a RON file can override any subset of fields.
//!
//! # Example RON
//!
//! ```ron
//! RulesConfig(
//!     match_duration_secs: 90,
//!     coin_toss_delay_ms: 0,
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed};

/// Longest accepted regulation match, in seconds.
pub const MAX_MATCH_DURATION_SECS: u64 = 24 * 60 * 60;

/// Longest accepted delay, interval or hold time, in milliseconds.
pub const MAX_DELAY_MS: u64 = 60 * 60 * 1000;

/// Rules and controller tuning for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Consecutive touches by one side that force a turnover.
    pub max_hits_per_turn: u8,
    /// Regulation length of a non-practice match, in seconds.
    pub match_duration_secs: u64,
    /// Presentation delay between starting a coin toss and its result.
    pub coin_toss_delay_ms: u64,
    /// How often the match clock is sampled against the duration limit.
    pub clock_sample_interval_ms: u64,
    /// Flick activation ring, inner radius (world units).
    #[serde(with = "fixed_decimal")]
    pub activation_inner_radius: Fixed,
    /// Flick activation ring, outer radius (world units).
    #[serde(with = "fixed_decimal")]
    pub activation_outer_radius: Fixed,
    /// Hold time that yields full power; holding this long or longer overcharges.
    pub max_hold_ms: u64,
    /// Impulse magnitude at full power.
    #[serde(with = "fixed_decimal")]
    pub max_force: Fixed,
    /// Releases at or below this power do nothing.
    #[serde(with = "fixed_decimal")]
    pub min_power: Fixed,
    /// Minimum figure-to-hold distance for a usable direction.
    #[serde(with = "fixed_decimal")]
    pub min_flick_distance: Fixed,
    /// Lockout after a successful flick.
    pub flick_cooldown_ms: u64,
    /// Combined planar speed above which play counts as "in motion".
    #[serde(with = "fixed_decimal")]
    pub motion_threshold: Fixed,
    /// Consecutive quiet frames before motion is declared stopped.
    pub settle_frames: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            max_hits_per_turn: 3,
            match_duration_secs: 60,
            coin_toss_delay_ms: 1500,
            clock_sample_interval_ms: 1000,
            activation_inner_radius: Fixed::from_num(0.08),
            activation_outer_radius: Fixed::from_num(0.30),
            max_hold_ms: 2000,
            max_force: Fixed::from_num(0.15),
            min_power: Fixed::from_num(0.05),
            min_flick_distance: Fixed::from_num(0.01),
            flick_cooldown_ms: 500,
            motion_threshold: Fixed::from_num(0.01),
            settle_frames: 30,
        }
    }
}

impl RulesConfig {
    /// Parse a RON document; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed input and
    /// [`GameError::InvalidConfig`] if the values are inconsistent.
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        let config: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: label.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a RON rules file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Io`] if the file cannot be read, otherwise the
    /// errors of [`RulesConfig::from_ron_str`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&source, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), "Loaded rules");
        Ok(config)
    }

    /// Render as pretty RON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_ron_string(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Check that the values describe a playable match.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.max_hits_per_turn < 2 {
            return Err(GameError::InvalidConfig(
                "max_hits_per_turn must be at least 2".into(),
            ));
        }
        if self.match_duration_secs > MAX_MATCH_DURATION_SECS {
            return Err(GameError::InvalidConfig(format!(
                "match_duration_secs must not exceed {MAX_MATCH_DURATION_SECS}"
            )));
        }
        for (name, value) in [
            ("coin_toss_delay_ms", self.coin_toss_delay_ms),
            ("clock_sample_interval_ms", self.clock_sample_interval_ms),
            ("max_hold_ms", self.max_hold_ms),
            ("flick_cooldown_ms", self.flick_cooldown_ms),
        ] {
            if value > MAX_DELAY_MS {
                return Err(GameError::InvalidConfig(format!(
                    "{name} must not exceed {MAX_DELAY_MS}"
                )));
            }
        }
        if self.clock_sample_interval_ms == 0 {
            return Err(GameError::InvalidConfig(
                "clock_sample_interval_ms must be positive".into(),
            ));
        }
        if self.max_hold_ms == 0 {
            return Err(GameError::InvalidConfig("max_hold_ms must be positive".into()));
        }
        if self.activation_inner_radius < Fixed::ZERO
            || self.activation_inner_radius >= self.activation_outer_radius
        {
            return Err(GameError::InvalidConfig(format!(
                "activation ring must satisfy 0 <= inner < outer (got {} / {})",
                self.activation_inner_radius, self.activation_outer_radius
            )));
        }
        if self.min_power < Fixed::ZERO || self.min_power >= Fixed::ONE {
            return Err(GameError::InvalidConfig(
                "min_power must lie in [0, 1)".into(),
            ));
        }
        if self.max_force <= Fixed::ZERO {
            return Err(GameError::InvalidConfig("max_force must be positive".into()));
        }
        Ok(())
    }

    /// Match length in milliseconds.
    #[must_use]
    pub const fn match_duration_ms(&self) -> u64 {
        self.match_duration_secs.saturating_mul(1000)
    }
}
