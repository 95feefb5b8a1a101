//! Persistent match state.
//!
//! A [`MatchSnapshot`] is everything needed to rebuild a [`MatchSession`]
//! elsewhere: score and goals, possession, phase, toss, and elapsed time.
//! Pending timers are not stored; [`MatchSession::restore`] re-arms them.
//!
//! [`MatchSession`]: crate::session::MatchSession
//! [`MatchSession::restore`]: crate::session::MatchSession::restore

use serde::{Deserialize, Serialize};

use crate::coin_toss::CoinToss;
use crate::config::MAX_MATCH_DURATION_SECS;
use crate::error::{GameError, Result};
use crate::phase::{MatchPhase, Team, Touch};
use crate::scoring::{GoalRecord, Score};

/// Snapshot format version for compatibility.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable state of one match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Format version.
    pub version: u32,
    /// Match identifier.
    pub match_id: String,
    /// Phase at capture time.
    pub phase: MatchPhase,
    /// Side in possession.
    pub current_team: Team,
    /// Consecutive touches by the side in possession.
    pub hit_count: u8,
    /// Most recent accepted touch.
    pub last_touch: Option<Touch>,
    /// Whether a kick-off strike is awaited.
    pub kick_off_pending: bool,
    /// Whether the last touch was a kick-off strike.
    pub last_touch_was_kick_off: bool,
    /// Cached score; must agree with `goals`.
    pub score: Score,
    /// Goals in order.
    pub goals: Vec<GoalRecord>,
    /// Coin toss state.
    pub coin_toss: CoinToss,
    /// Elapsed match time.
    pub elapsed_ms: u64,
    /// Match length limit.
    pub match_duration_secs: u64,
    /// Practice mode flag.
    pub practice: bool,
}

impl MatchSnapshot {
    /// Check version, score consistency and the possession fields.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::VersionMismatch`], [`GameError::ScoreMismatch`]
    /// or [`GameError::InvalidState`].
    pub fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(GameError::VersionMismatch {
                kind: "snapshot",
                expected: SNAPSHOT_VERSION,
                found: self.version,
            });
        }
        let counted = Score::from_goals(&self.goals);
        if counted != self.score {
            tracing::warn!(match_id = %self.match_id, "Rejected snapshot with inconsistent score");
            return Err(GameError::ScoreMismatch {
                home: self.score.home,
                away: self.score.away,
                goal_home: counted.home,
                goal_away: counted.away,
            });
        }
        if self.match_duration_secs > MAX_MATCH_DURATION_SECS {
            return Err(GameError::InvalidState(format!(
                "match duration {} s exceeds {MAX_MATCH_DURATION_SECS} s",
                self.match_duration_secs
            )));
        }
        if self.kick_off_pending && (self.hit_count != 0 || self.last_touch.is_some()) {
            return Err(GameError::InvalidState(
                "kick-off pending after a touch".into(),
            ));
        }
        if self.hit_count > 0 && self.last_touch.is_none() {
            return Err(GameError::InvalidState(format!(
                "hit count {} without a last touch",
                self.hit_count
            )));
        }
        Ok(())
    }

    /// Encode with bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bincode and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed or the snapshot is invalid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Self = bincode::deserialize(bytes)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Encode as pretty RON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Decode from RON and validate. `label` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is malformed or the snapshot is invalid.
    pub fn from_ron(source: &str, label: &str) -> Result<Self> {
        let snapshot: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: label.to_string(),
            message: e.to_string(),
        })?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MatchSnapshot {
        let goals = vec![
            GoalRecord {
                team: Team::Home,
                scorer_name: "Watkins".into(),
                scorer_number: 11,
                elapsed_seconds: 14,
            },
            GoalRecord {
                team: Team::Away,
                scorer_name: "Own goal".into(),
                scorer_number: 4,
                elapsed_seconds: 40,
            },
        ];
        MatchSnapshot {
            version: SNAPSHOT_VERSION,
            match_id: "cup-final".into(),
            phase: MatchPhase::InProgress,
            current_team: Team::Away,
            hit_count: 2,
            last_touch: Some(Touch::new(Team::Away, 7)),
            kick_off_pending: false,
            last_touch_was_kick_off: false,
            score: Score::from_goals(&goals),
            goals,
            coin_toss: CoinToss {
                result: Some(Team::Home),
                animating: false,
            },
            elapsed_ms: 45_250,
            match_duration_secs: 60,
            practice: false,
        }
    }

    #[test]
    fn test_bincode_round_trip() {
        let snap = sample();
        let bytes = snap.to_bytes().unwrap();
        assert_eq!(MatchSnapshot::from_bytes(&bytes).unwrap(), snap);
    }

    #[test]
    fn test_ron_round_trip() {
        let snap = sample();
        let text = snap.to_ron().unwrap();
        assert!(text.contains("Watkins"));
        assert_eq!(MatchSnapshot::from_ron(&text, "test").unwrap(), snap);
    }

    #[test]
    fn test_rejects_inconsistent_score() {
        let mut snap = sample();
        snap.score.home = 5;
        assert!(matches!(
            snap.validate(),
            Err(GameError::ScoreMismatch { home: 5, goal_home: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let mut snap = sample();
        snap.version = 99;
        let bytes = snap.to_bytes().unwrap();
        assert!(matches!(
            MatchSnapshot::from_bytes(&bytes),
            Err(GameError::VersionMismatch { found: 99, .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_duration() {
        let mut snap = sample();
        snap.match_duration_secs = u64::MAX;
        assert!(matches!(snap.validate(), Err(GameError::InvalidState(_))));
    }

    #[test]
    fn test_rejects_kick_off_pending_after_touch() {
        let mut snap = sample();
        snap.kick_off_pending = true;
        assert!(matches!(snap.validate(), Err(GameError::InvalidState(_))));

        snap.hit_count = 0;
        snap.last_touch = None;
        assert!(snap.validate().is_ok());
    }
}
