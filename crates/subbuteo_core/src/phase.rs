//! Sides, touches and the match lifecycle phase.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two sides on the pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Home side.
    #[default]
    Home,
    /// Away side.
    Away,
}

impl Team {
    /// Both sides, home first.
    pub const ALL: [Self; 2] = [Self::Home, Self::Away];

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Home => Self::Away,
            Self::Away => Self::Home,
        }
    }

    /// Lowercase name, matching the wire format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A figure touching the ball: side plus roster slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Touch {
    /// Side of the touching figure.
    pub team: Team,
    /// Roster slot of the figure within its side.
    pub player_index: u8,
}

impl Touch {
    /// Create a touch record.
    #[must_use]
    pub const fn new(team: Team, player_index: u8) -> Self {
        Self { team, player_index }
    }
}

/// Lifecycle of a single match.
///
/// ```text
/// not_started -> positioning -> coin_toss -> kick_off <-> in_progress <-> paused
///                                               \            |
///                                                `----------> completed
/// ```
///
/// `kick_off` and `in_progress` alternate through goals and kick-off strikes;
/// `start_positioning` re-enters `positioning` from any phase as a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Nothing has happened yet.
    #[default]
    NotStarted,
    /// Players arrange their figures.
    Positioning,
    /// Toss deciding kick-off possession.
    CoinToss,
    /// Waiting for the kick-off strike.
    KickOff,
    /// Open play.
    InProgress,
    /// Play suspended; the clock is frozen.
    Paused,
    /// Final whistle.
    Completed,
}

impl MatchPhase {
    /// Whether ball touches are resolved in this phase.
    #[must_use]
    pub const fn accepts_touches(self) -> bool {
        matches!(self, Self::KickOff | Self::InProgress)
    }

    /// Whether the match clock counts toward the duration limit.
    #[must_use]
    pub const fn clock_running(self) -> bool {
        matches!(self, Self::KickOff | Self::InProgress)
    }

    /// Whether flick controllers should accept gestures.
    #[must_use]
    pub const fn allows_flick(self) -> bool {
        self.accepts_touches()
    }

    /// Whether figures may be dragged into place.
    #[must_use]
    pub const fn allows_positioning(self) -> bool {
        matches!(self, Self::Positioning)
    }

    /// Lowercase name, matching the wire format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Positioning => "positioning",
            Self::CoinToss => "coin_toss",
            Self::KickOff => "kick_off",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
