//! Scenario loading and execution.
//!
//! A scenario is a RON script: rule overrides, how the coin lands, a list of
//! timed [`MatchCommand`]s with optional expectations, and the state the
//! match must be in at the end. Scenarios back CI checks of the rules and
//! are validated by `subbuteo_tools`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use subbuteo_core::coin_toss::TossSource;
use subbuteo_core::command::MatchCommand;
use subbuteo_core::config::RulesConfig;
use subbuteo_core::error::GameError;
use subbuteo_core::phase::{MatchPhase, Team};
use subbuteo_core::replay::MatchLog;
use subbuteo_core::scoring::Score;
use subbuteo_core::session::MatchSession;
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Rule overrides are unusable.
    #[error("Invalid scenario rules: {0}")]
    Rules(#[from] GameError),
    /// The script itself is malformed.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// What must hold after a step, or at the end. Unset fields are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expectation {
    /// Match phase.
    pub phase: Option<MatchPhase>,
    /// Score.
    pub score: Option<Score>,
    /// Side in possession.
    pub current_team: Option<Team>,
    /// Touches by the side in possession.
    pub hit_count: Option<u8>,
    /// Whole match seconds on the clock.
    pub elapsed_seconds: Option<u64>,
    /// Whether the step's command was accepted. Ignored at the end.
    pub accepted: Option<bool>,
}

impl Expectation {
    /// Compare against `session` at `now_ms`; `accepted` is the step's
    /// verdict, if any. Returns one message per mismatch.
    #[must_use]
    pub fn check(&self, session: &MatchSession, now_ms: u64, accepted: Option<bool>) -> Vec<String> {
        let mut failures = Vec::new();
        if let Some(phase) = self.phase {
            if session.phase() != phase {
                failures.push(format!("phase: expected {phase}, got {}", session.phase()));
            }
        }
        if let Some(score) = self.score {
            if session.score() != score {
                let got = session.score();
                failures.push(format!(
                    "score: expected {}-{}, got {}-{}",
                    score.home, score.away, got.home, got.away
                ));
            }
        }
        if let Some(team) = self.current_team {
            if session.current_team() != team {
                failures.push(format!(
                    "current_team: expected {team}, got {}",
                    session.current_team()
                ));
            }
        }
        if let Some(count) = self.hit_count {
            if session.hit_count() != count {
                failures.push(format!(
                    "hit_count: expected {count}, got {}",
                    session.hit_count()
                ));
            }
        }
        if let Some(seconds) = self.elapsed_seconds {
            let elapsed = session.elapsed_seconds(now_ms);
            if elapsed != seconds {
                failures.push(format!(
                    "elapsed_seconds: expected {seconds}, got {elapsed}"
                ));
            }
        }
        if let (Some(expected), Some(actual)) = (self.accepted, accepted) {
            if expected != actual {
                failures.push(format!("accepted: expected {expected}, got {actual}"));
            }
        }
        failures
    }
}

/// One timed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Clock reading when the command is applied.
    pub at_ms: u64,
    /// The command.
    pub command: MatchCommand,
    /// Checked right after the command.
    #[serde(default)]
    pub expect: Option<Expectation>,
}

/// A complete scenario script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Rule overrides; omitted fields keep their defaults.
    #[serde(default)]
    pub rules: RulesConfig,
    /// Force every toss to this side; otherwise tosses come from `seed`.
    #[serde(default)]
    pub toss: Option<Team>,
    /// Toss seed.
    #[serde(default)]
    pub seed: u64,
    /// Start in practice mode.
    #[serde(default)]
    pub practice: bool,
    /// Commands in time order.
    pub steps: Vec<ScenarioStep>,
    /// Clock reading at which the match is checked; defaults to the last step.
    #[serde(default)]
    pub end_ms: Option<u64>,
    /// Checked at `end_ms`.
    #[serde(default)]
    pub expect_final: Option<Expectation>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a scenario.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Check rule overrides and step ordering.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.rules.validate()?;
        if self.steps.is_empty() {
            return Err(ScenarioError::Invalid(format!("'{}' has no steps", self.name)));
        }
        if let Some(pair) = self.steps.windows(2).find(|w| w[1].at_ms < w[0].at_ms) {
            return Err(ScenarioError::Invalid(format!(
                "step at {} ms follows step at {} ms",
                pair[1].at_ms, pair[0].at_ms
            )));
        }
        let last = self.last_step_ms();
        if let Some(end) = self.end_ms.filter(|end| *end < last) {
            return Err(ScenarioError::Invalid(format!(
                "end_ms {end} is before the last step at {last} ms"
            )));
        }
        Ok(())
    }

    /// Toss source described by `toss` / `seed`.
    #[must_use]
    pub fn toss_source(&self) -> TossSource {
        self.toss
            .map_or_else(|| TossSource::seeded(self.seed), TossSource::Fixed)
    }

    /// Empty replay log for this scenario's match.
    #[must_use]
    pub fn log(&self) -> MatchLog {
        MatchLog::new(self.name.clone(), self.rules.clone(), self.toss_source())
            .with_practice(self.practice)
    }

    fn last_step_ms(&self) -> u64 {
        self.steps.last().map_or(0, |step| step.at_ms)
    }

    /// Clock reading at which the final expectation is checked.
    #[must_use]
    pub fn end_ms(&self) -> u64 {
        self.end_ms.unwrap_or_else(|| self.last_step_ms())
    }
}

/// A failed expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioFailure {
    /// Step index, `None` for the final check.
    pub step: Option<usize>,
    /// Clock reading of the check.
    pub at_ms: u64,
    /// What differed.
    pub message: String,
}

/// Outcome of running a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Every expectation held.
    pub passed: bool,
    /// Steps applied.
    pub steps_run: usize,
    /// Mismatches in order.
    pub failures: Vec<ScenarioFailure>,
    /// Phase at the end.
    pub final_phase: MatchPhase,
    /// Score at the end.
    pub final_score: Score,
    /// State hash at the end.
    pub state_hash: u64,
}

/// Play a scenario, recording it into a replay log.
///
/// # Errors
///
/// Returns an error if the scenario fails [`Scenario::validate`].
pub fn run_scenario(scenario: &Scenario) -> Result<(ScenarioReport, MatchLog), ScenarioError> {
    scenario.validate()?;
    tracing::info!(scenario = %scenario.name, steps = scenario.steps.len(), "Running scenario");

    let mut log = scenario.log();
    let mut session = log.session();
    let mut failures = Vec::new();

    for (index, step) in scenario.steps.iter().enumerate() {
        let outcome = log.apply(&mut session, step.command.clone(), step.at_ms);
        let accepted = outcome.accepted();
        tracing::debug!(step = index, cmd = step.command.name(), accepted, "Scenario step");

        if let Some(expect) = &step.expect {
            failures.extend(expect.check(&session, step.at_ms, Some(accepted)).into_iter().map(|message| {
                ScenarioFailure {
                    step: Some(index),
                    at_ms: step.at_ms,
                    message,
                }
            }));
        }
    }

    let end_ms = scenario.end_ms();
    log.finalize(&mut session, end_ms);
    if let Some(expect) = &scenario.expect_final {
        failures.extend(
            expect
                .check(&session, end_ms, None)
                .into_iter()
                .map(|message| ScenarioFailure {
                    step: None,
                    at_ms: end_ms,
                    message,
                }),
        );
    }

    for failure in &failures {
        tracing::warn!(scenario = %scenario.name, step = ?failure.step, "{}", failure.message);
    }

    let report = ScenarioReport {
        name: scenario.name.clone(),
        passed: failures.is_empty(),
        steps_run: scenario.steps.len(),
        failures,
        final_phase: session.phase(),
        final_score: session.score(),
        state_hash: session.state_hash(end_ms),
    };
    Ok((report, log))
}
