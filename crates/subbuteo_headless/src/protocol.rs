//! JSON protocol for headless match control.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses and match events
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers each command, then prints any match events it caused
//! 4. Time only moves on `advance`; every other command happens "now"
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","match_id":"headless","now_ms":0}
//! -> {"cmd":"start_positioning"}
//! <- {"type":"phase","cmd":"start_positioning","phase":"positioning"}
//! <- {"type":"event","event":{"event":"phase_changed","from":"not_started","to":"positioning"}}
//! -> {"cmd":"advance","ms":1500}
//! <- {"type":"ack","cmd":"advance"}
//! -> {"cmd":"hit","team":"home","player":9}
//! <- {"type":"hit","report":{"success":true,...}}
//! ```

use serde::{Deserialize, Serialize};
use subbuteo_core::command::{CommandOutcome, MatchCommand};
use subbuteo_core::phase::{MatchPhase, Team};
use subbuteo_core::scoring::{GoalRecord, Score};
use subbuteo_core::session::{MatchEvent, MatchSession, PhaseRejection};
use subbuteo_core::snapshot::MatchSnapshot;
use subbuteo_core::turn::HitReport;
use thiserror::Error;

/// Protocol version reported in [`Response::Ready`].
pub const PROTOCOL_VERSION: &str = "1.0";

/// Failures that end a protocol session.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Reading commands or writing responses failed.
    #[error("Protocol IO failed: {0}")]
    Io(#[from] std::io::Error),
    /// A response could not be encoded.
    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Start a new match (clears score, possession and clock).
    StartPositioning,
    /// Finish placing figures and flip the coin.
    FinishPositioning,
    /// Flip the coin again after a reset.
    TossCoin,
    /// Kick off once the toss has landed.
    StartKickOff,
    /// A figure touched the ball.
    Hit {
        /// Toucher's side.
        team: Team,
        /// Roster slot.
        player: u8,
    },
    /// A goal was scored.
    Goal {
        /// Scoring side.
        team: Team,
        /// Scorer's name.
        #[serde(default)]
        scorer_name: String,
        /// Scorer's shirt number.
        #[serde(default)]
        scorer_number: u8,
    },
    /// Pause play.
    Pause,
    /// Resume play.
    Resume,
    /// Advance the runner's clock, firing due timers.
    Advance {
        /// Milliseconds to advance (default: 1000).
        #[serde(default = "default_advance_ms")]
        ms: u64,
    },
    /// Toggle practice mode.
    SetPractice {
        /// Practice on or off.
        enabled: bool,
    },
    /// Query current match state.
    Query,
    /// Report the state hash (for determinism verification).
    Hash,
    /// Save a snapshot to the match store.
    Save,
    /// Restore a match from the store.
    Load {
        /// Stored match id.
        match_id: String,
    },
    /// Print every future snapshot saved under `match_id`. Watching a
    /// match twice has no further effect.
    Watch {
        /// Match to follow.
        match_id: String,
    },
    /// Stop printing snapshots saved under `match_id`.
    Unwatch {
        /// Match to stop following.
        match_id: String,
    },
    /// Write the recorded replay log.
    SaveReplay {
        /// Output file.
        path: String,
    },
    /// Quit the runner.
    Quit,
}

fn default_advance_ms() -> u64 {
    1_000
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartPositioning => "start_positioning",
            Self::FinishPositioning => "finish_positioning",
            Self::TossCoin => "toss_coin",
            Self::StartKickOff => "start_kick_off",
            Self::Hit { .. } => "hit",
            Self::Goal { .. } => "goal",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Advance { .. } => "advance",
            Self::SetPractice { .. } => "set_practice",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::Save => "save",
            Self::Load { .. } => "load",
            Self::Watch { .. } => "watch",
            Self::Unwatch { .. } => "unwatch",
            Self::SaveReplay { .. } => "save_replay",
            Self::Quit => "quit",
        }
    }

    /// The session operation this command stands for, if it is one.
    #[must_use]
    pub fn to_match_command(&self) -> Option<MatchCommand> {
        let command = match self {
            Self::StartPositioning => MatchCommand::StartPositioning,
            Self::FinishPositioning => MatchCommand::FinishPositioning,
            Self::TossCoin => MatchCommand::TossCoin,
            Self::StartKickOff => MatchCommand::StartKickOff,
            Self::Hit { team, player } => MatchCommand::Hit {
                team: *team,
                player: *player,
            },
            Self::Goal {
                team,
                scorer_name,
                scorer_number,
            } => MatchCommand::Goal {
                team: *team,
                scorer_name: scorer_name.clone(),
                scorer_number: *scorer_number,
            },
            Self::Pause => MatchCommand::Pause,
            Self::Resume => MatchCommand::Resume,
            Self::SetPractice { enabled } => MatchCommand::SetPractice { enabled: *enabled },
            _ => return None,
        };
        Some(command)
    }
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Match being played.
        match_id: String,
        /// Runner clock.
        now_ms: u64,
    },

    /// Acknowledgment of a command.
    Ack {
        /// Command name.
        cmd: String,
    },

    /// A lifecycle call succeeded.
    Phase {
        /// Command name.
        cmd: String,
        /// Phase afterwards.
        phase: MatchPhase,
    },

    /// A lifecycle call or goal was refused.
    Rejected {
        /// Command name.
        cmd: String,
        /// Why.
        rejection: PhaseRejection,
    },

    /// A touch was resolved.
    Hit {
        /// Rules verdict.
        report: HitReport,
    },

    /// A goal was recorded.
    Goal {
        /// The goal.
        goal: GoalRecord,
    },

    /// Something happened in the match.
    Event {
        /// The event.
        event: MatchEvent,
    },

    /// Current match state.
    State(MatchView),

    /// State hash for determinism verification.
    StateHash {
        /// Runner clock.
        now_ms: u64,
        /// Hash of the match state.
        hash: u64,
    },

    /// A snapshot was stored.
    Saved {
        /// Stored match id.
        match_id: String,
    },

    /// A match was restored from the store.
    Loaded {
        /// Restored match id.
        match_id: String,
        /// Phase after restoring.
        phase: MatchPhase,
    },

    /// A watched match was saved.
    Snapshot {
        /// The saved snapshot.
        snapshot: MatchSnapshot,
    },

    /// Error processing a command.
    Error {
        /// What went wrong.
        message: String,
        /// Command name, if the line parsed.
        cmd: Option<String>,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Match state as reported to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    /// Match id.
    pub match_id: String,
    /// Runner clock.
    pub now_ms: u64,
    /// Current phase.
    pub phase: MatchPhase,
    /// Side in possession.
    pub current_team: Team,
    /// Touches by the side in possession.
    pub hit_count: u8,
    /// Whether the next touch is a kick-off strike.
    pub kick_off_pending: bool,
    /// Score.
    pub score: Score,
    /// Goals in order.
    pub goals: Vec<GoalRecord>,
    /// Toss winner, once known.
    pub toss: Option<Team>,
    /// Match seconds played.
    pub elapsed_seconds: u64,
    /// Match seconds left, `None` in practice.
    pub remaining_seconds: Option<u64>,
    /// Practice mode.
    pub practice: bool,
}

impl MatchView {
    /// Read `session` at `now_ms`.
    #[must_use]
    pub fn from_session(session: &MatchSession, now_ms: u64) -> Self {
        Self {
            match_id: session.match_id().to_string(),
            now_ms,
            phase: session.phase(),
            current_team: session.current_team(),
            hit_count: session.hit_count(),
            kick_off_pending: session.kick_off_pending(),
            score: session.score(),
            goals: session.goals().to_vec(),
            toss: session.coin_toss().result,
            elapsed_seconds: session.elapsed_seconds(now_ms),
            remaining_seconds: session.remaining_seconds(now_ms),
            practice: session.is_practice(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(match_id: &str, now_ms: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            match_id: match_id.to_string(),
            now_ms,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Translate a session outcome for command `cmd`.
    pub fn from_outcome(cmd: &str, outcome: CommandOutcome) -> Self {
        match outcome {
            CommandOutcome::Phase { phase } => Self::Phase {
                cmd: cmd.to_string(),
                phase,
            },
            CommandOutcome::Rejected { rejection } => Self::Rejected {
                cmd: cmd.to_string(),
                rejection,
            },
            CommandOutcome::Hit { report } => Self::Hit { report },
            CommandOutcome::Goal { goal } => Self::Goal { goal },
            CommandOutcome::Done => Self::ack(cmd),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hit_command() {
        let json = r#"{"cmd":"hit","team":"away","player":4}"#;
        let cmd = Command::from_json(json).unwrap();
        assert_eq!(
            cmd,
            Command::Hit {
                team: Team::Away,
                player: 4
            }
        );
        assert_eq!(cmd.name(), "hit");
    }

    #[test]
    fn test_default_advance() {
        let cmd = Command::from_json(r#"{"cmd":"advance"}"#).unwrap();
        assert_eq!(cmd, Command::Advance { ms: 1_000 });
        assert!(cmd.to_match_command().is_none());
    }

    #[test]
    fn test_goal_defaults() {
        let cmd = Command::from_json(r#"{"cmd":"goal","team":"home"}"#).unwrap();
        assert_eq!(
            cmd.to_match_command(),
            Some(MatchCommand::Goal {
                team: Team::Home,
                scorer_name: String::new(),
                scorer_number: 0
            })
        );
    }

    #[test]
    fn test_unknown_command_fails() {
        assert!(Command::from_json(r#"{"cmd":"teleport"}"#).is_err());
    }

    #[test]
    fn test_serialize_responses() {
        let json = Response::Phase {
            cmd: "start_kick_off".into(),
            phase: MatchPhase::KickOff,
        }
        .to_json_line();
        assert!(json.contains(r#""type":"phase""#));
        assert!(json.contains(r#""phase":"kick_off""#));
        assert!(json.ends_with('\n'));

        let json = Response::Event {
            event: MatchEvent::TossResolved { winner: Team::Away },
        }
        .to_json_line();
        assert!(json.contains(r#""event":"toss_resolved""#));
        assert!(json.contains(r#""winner":"away""#));

        let json = Response::Rejected {
            cmd: "start_kick_off".into(),
            rejection: PhaseRejection::TossPending,
        }
        .to_json_line();
        assert!(json.contains(r#""reason":"toss_pending""#));
    }

    #[test]
    fn test_state_view_serializes_flat() {
        let session = MatchSession::new("view", subbuteo_core::config::RulesConfig::default());
        let json = Response::State(MatchView::from_session(&session, 0)).to_json_line();
        assert!(json.contains(r#""type":"state""#));
        assert!(json.contains(r#""phase":"not_started""#));
        assert!(json.contains(r#""remaining_seconds":60"#));
    }
}
