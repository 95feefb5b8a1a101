//! Replay logs for recording and playing back matches.
//!
//! A [`MatchLog`] stores the rules, the toss source and the stream of timed
//! commands issued during a match. Because the session never reads system
//! time or randomness, feeding the same commands at the same instants
//! recreates the match exactly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coin_toss::TossSource;
use crate::command::{CommandOutcome, MatchCommand};
use crate::config::RulesConfig;
use crate::error::{GameError, Result};
use crate::session::MatchSession;
use crate::snapshot::MatchSnapshot;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// A command and the instant it was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedCommand {
    /// Caller clock when the command was applied.
    pub at_ms: u64,
    /// The command.
    pub command: MatchCommand,
}

/// Complete record of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLog {
    /// Replay format version.
    pub version: u32,
    /// Match identifier.
    pub match_id: String,
    /// Rules the match was played under.
    pub config: RulesConfig,
    /// Toss source at the start of the match.
    pub toss_source: TossSource,
    /// Practice flag at the start of the match.
    pub practice: bool,
    /// Commands in the order they were applied.
    pub commands: Vec<TimedCommand>,
    /// Caller clock when recording stopped.
    pub final_ms: u64,
    /// State at `final_ms`, once finalized.
    pub final_snapshot: Option<MatchSnapshot>,
}

impl MatchLog {
    /// Start a log for a session built from these inputs.
    #[must_use]
    pub fn new(match_id: impl Into<String>, config: RulesConfig, toss_source: TossSource) -> Self {
        Self {
            version: REPLAY_VERSION,
            match_id: match_id.into(),
            config,
            toss_source,
            practice: false,
            commands: Vec::new(),
            final_ms: 0,
            final_snapshot: None,
        }
    }

    /// Record that the match started in practice mode.
    #[must_use]
    pub const fn with_practice(mut self, practice: bool) -> Self {
        self.practice = practice;
        self
    }

    /// A fresh session matching the log's starting inputs.
    #[must_use]
    pub fn session(&self) -> MatchSession {
        MatchSession::new(self.match_id.clone(), self.config.clone())
            .with_toss_source(self.toss_source.clone())
            .with_practice(self.practice)
    }

    /// Record a command without applying it.
    pub fn record(&mut self, at_ms: u64, command: MatchCommand) {
        self.commands.push(TimedCommand { at_ms, command });
    }

    /// Apply `command` to `session` and record it.
    pub fn apply(
        &mut self,
        session: &mut MatchSession,
        command: MatchCommand,
        at_ms: u64,
    ) -> CommandOutcome {
        let outcome = session.apply(&command, at_ms);
        self.record(at_ms, command);
        outcome
    }

    /// Close the log with the session's state at `final_ms`, firing any
    /// timers due by then.
    pub fn finalize(&mut self, session: &mut MatchSession, final_ms: u64) {
        session.tick(final_ms);
        self.final_ms = final_ms;
        self.final_snapshot = Some(session.snapshot(final_ms));
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Rebuild the session by applying every command, then ticking to `final_ms`.
    #[must_use]
    pub fn replay(&self) -> MatchSession {
        self.replay_until(self.final_ms)
    }

    /// Rebuild the session as it was at `until_ms`.
    #[must_use]
    pub fn replay_until(&self, until_ms: u64) -> MatchSession {
        let mut session = self.session();
        for timed in self.commands.iter().take_while(|c| c.at_ms <= until_ms) {
            session.apply(&timed.command, timed.at_ms);
        }
        session.tick(until_ms);
        session
    }

    /// Replay and compare against the recorded final snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if the log was never finalized.
    pub fn verify(&self) -> Result<bool> {
        let expected = self
            .final_snapshot
            .as_ref()
            .ok_or_else(|| GameError::InvalidState("replay has no final snapshot".into()))?;
        let actual = self.replay().snapshot(self.final_ms);
        if &actual != expected {
            tracing::warn!(match_id = %self.match_id, "Replay diverged from recorded state");
            return Ok(false);
        }
        Ok(true)
    }

    /// Save the log to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    /// Load a log from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or decoding fails, or on a version mismatch.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let log: Self = bincode::deserialize(&bytes)?;
        if log.version != REPLAY_VERSION {
            return Err(GameError::VersionMismatch {
                kind: "replay",
                expected: REPLAY_VERSION,
                found: log.version,
            });
        }
        Ok(log)
    }
}
