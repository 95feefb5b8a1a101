//! Session operations as data.
//!
//! Replay logs, scenario scripts and the headless protocol all speak in
//! [`MatchCommand`]s, so a match driven from any of them can be recorded and
//! played back through [`MatchSession::apply`].

use serde::{Deserialize, Serialize};

use crate::phase::{MatchPhase, Team};
use crate::scoring::GoalRecord;
use crate::session::{MatchSession, PhaseRejection, PhaseResult};
use crate::turn::HitReport;

/// One session operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchCommand {
    /// Reset and enter `positioning`.
    StartPositioning,
    /// Leave `positioning` and toss the coin.
    FinishPositioning,
    /// Toss the coin again (rejected once a result exists).
    TossCoin,
    /// Start the kick-off.
    StartKickOff,
    /// A figure touched the ball.
    Hit {
        /// Side of the figure.
        team: Team,
        /// Roster slot of the figure.
        player: u8,
    },
    /// The ball crossed a goal line.
    Goal {
        /// Side credited with the goal.
        team: Team,
        /// Scorer display name.
        scorer_name: String,
        /// Scorer shirt number.
        scorer_number: u8,
    },
    /// Pause play.
    Pause,
    /// Resume play.
    Resume,
    /// Toggle practice mode.
    SetPractice {
        /// New practice flag.
        enabled: bool,
    },
    /// Only fire due timers.
    Tick,
    /// Cancel all timers.
    Teardown,
}

impl MatchCommand {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartPositioning => "start_positioning",
            Self::FinishPositioning => "finish_positioning",
            Self::TossCoin => "toss_coin",
            Self::StartKickOff => "start_kick_off",
            Self::Hit { .. } => "hit",
            Self::Goal { .. } => "goal",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::SetPractice { .. } => "set_practice",
            Self::Tick => "tick",
            Self::Teardown => "teardown",
        }
    }
}

/// What applying a [`MatchCommand`] produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// A lifecycle call moved (or kept) the match in `phase`.
    Phase {
        /// Phase afterwards.
        phase: MatchPhase,
    },
    /// A lifecycle call or goal was refused.
    Rejected {
        /// Why.
        rejection: PhaseRejection,
    },
    /// A touch was resolved.
    Hit {
        /// Resolution details.
        report: HitReport,
    },
    /// A goal was recorded.
    Goal {
        /// The new goal.
        goal: GoalRecord,
    },
    /// Nothing to report.
    Done,
}

impl From<PhaseResult> for CommandOutcome {
    fn from(result: PhaseResult) -> Self {
        match result {
            Ok(phase) => Self::Phase { phase },
            Err(rejection) => Self::Rejected { rejection },
        }
    }
}

impl CommandOutcome {
    /// Whether the command took effect.
    #[must_use]
    pub const fn accepted(&self) -> bool {
        match self {
            Self::Phase { .. } | Self::Goal { .. } | Self::Done => true,
            Self::Rejected { .. } => false,
            Self::Hit { report } => report.success,
        }
    }
}

impl MatchSession {
    /// Apply `command` at `now_ms`.
    pub fn apply(&mut self, command: &MatchCommand, now_ms: u64) -> CommandOutcome {
        match command {
            MatchCommand::StartPositioning => self.start_positioning(now_ms).into(),
            MatchCommand::FinishPositioning => self.finish_positioning(now_ms).into(),
            MatchCommand::TossCoin => self.toss_coin(now_ms).into(),
            MatchCommand::StartKickOff => self.start_kick_off(now_ms).into(),
            MatchCommand::Hit { team, player } => CommandOutcome::Hit {
                report: self.record_ball_hit(*team, *player, now_ms),
            },
            MatchCommand::Goal {
                team,
                scorer_name,
                scorer_number,
            } => match self.record_goal(*team, scorer_name.clone(), *scorer_number, now_ms) {
                Ok(goal) => CommandOutcome::Goal { goal },
                Err(rejection) => CommandOutcome::Rejected { rejection },
            },
            MatchCommand::Pause => self.pause(now_ms).into(),
            MatchCommand::Resume => self.resume(now_ms).into(),
            MatchCommand::SetPractice { enabled } => {
                self.tick(now_ms);
                self.set_practice(*enabled);
                CommandOutcome::Done
            }
            MatchCommand::Tick => {
                self.tick(now_ms);
                CommandOutcome::Done
            }
            MatchCommand::Teardown => {
                self.teardown();
                CommandOutcome::Done
            }
        }
    }
}
