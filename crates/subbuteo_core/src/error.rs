//! Error types for the match engine.
//!
//! Rule violations (a second touch by the kick-off taker, a call from the
//! wrong phase, a refused flick) are *not* errors: they are reported as
//! structured outcomes by the operations themselves. The variants below cover
//! genuinely exceptional conditions such as persistence and decoding failures.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the match engine.
#[derive(Debug, Error)]
pub enum GameError {
    /// No stored match with this identifier.
    #[error("Match not found: {0}")]
    MatchNotFound(String),

    /// Snapshot or replay was written by an incompatible format version.
    #[error("Unsupported {kind} version: expected {expected}, got {found}")]
    VersionMismatch {
        /// What was being decoded (snapshot, replay).
        kind: &'static str,
        /// Version this build understands.
        expected: u32,
        /// Version found in the data.
        found: u32,
    },

    /// A snapshot's cached score disagrees with its goal list.
    #[error("Score {home}-{away} does not match recorded goals ({goal_home}-{goal_away})")]
    ScoreMismatch {
        /// Cached home score.
        home: u32,
        /// Cached away score.
        away: u32,
        /// Home goals in the goal list.
        goal_home: u32,
        /// Away goals in the goal list.
        goal_away: u32,
    },

    /// Binary encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] bincode::Error),

    /// RON encoding failed.
    #[error("Failed to encode RON: {0}")]
    RonEncode(#[from] ron::Error),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Rules configuration is internally inconsistent.
    #[error("Invalid rules configuration: {0}")]
    InvalidConfig(String),

    /// Underlying IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
