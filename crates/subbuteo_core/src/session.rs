//! The match session: phase state machine, possession, goals and clock.
//!
//! [`MatchSession`] owns every piece of match state and is the only thing
//! that mutates it. All operations take the caller's `now_ms`; before doing
//! anything else they fire timers that fell due at or before `now_ms`, so a
//! touch that arrives after the final whistle is refused even if the host
//! never called [`MatchSession::tick`] in between.
//!
//! # Example
//!
//! ```
//! use subbuteo_core::prelude::*;
//!
//! let mut session = MatchSession::new("friendly", RulesConfig::default())
//!     .with_toss_source(TossSource::Fixed(Team::Home));
//!
//! session.start_positioning(0).unwrap();
//! session.finish_positioning(0).unwrap();
//! session.tick(1_500); // coin toss lands
//! session.start_kick_off(2_000).unwrap();
//!
//! let report = session.record_ball_hit(Team::Home, 9, 2_500);
//! assert!(report.success);
//! assert_eq!(session.phase(), MatchPhase::InProgress);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::clock::MatchClock;
use crate::coin_toss::{CoinToss, TossSource};
use crate::config::RulesConfig;
use crate::error::{GameError, Result};
use crate::phase::{MatchPhase, Team, Touch};
use crate::scoring::{GoalRecord, Score, ScoreSheet};
use crate::snapshot::{MatchSnapshot, SNAPSHOT_VERSION};
use crate::timers::{TimerHandle, TimerQueue};
use crate::turn::{apply_hit, HitReason, HitReport, TurnState};

/// Timed work the session schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum MatchTimer {
    /// The coin lands.
    CoinTossResult,
    /// Compare elapsed time against the match limit.
    ClockSample,
}

/// Why a lifecycle call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PhaseRejection {
    /// The call does not apply to the current phase.
    WrongPhase {
        /// Phase at the time of the call.
        phase: MatchPhase,
    },
    /// A toss is already in the air.
    TossInProgress,
    /// This coin-toss phase already has a result.
    AlreadyTossed,
    /// Kick-off needs a toss result first.
    TossPending,
}

/// Result of a lifecycle call: the phase afterwards, or why nothing happened.
pub type PhaseResult = std::result::Result<MatchPhase, PhaseRejection>;

/// Something collaborators (UI, network sync, logs) may want to react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MatchEvent {
    /// The phase changed.
    PhaseChanged {
        /// Previous phase.
        from: MatchPhase,
        /// New phase.
        to: MatchPhase,
    },
    /// The coin was flipped; the result follows after the toss delay.
    TossStarted,
    /// The coin landed.
    TossResolved {
        /// Side that takes the kick-off.
        winner: Team,
    },
    /// Possession changed hands.
    TurnChanged {
        /// Side now in possession.
        team: Team,
        /// Cause of the turnover.
        reason: HitReason,
    },
    /// A goal was recorded.
    GoalScored(GoalRecord),
    /// Full time.
    MatchCompleted {
        /// Final score.
        score: Score,
        /// Match seconds on the clock at the whistle.
        elapsed_seconds: u64,
    },
}

/// Authoritative state of one match.
#[derive(Debug, Clone)]
pub struct MatchSession {
    match_id: String,
    config: RulesConfig,
    phase: MatchPhase,
    turn: TurnState,
    sheet: ScoreSheet,
    coin_toss: CoinToss,
    clock: MatchClock,
    practice: bool,
    toss_source: TossSource,
    timers: TimerQueue<MatchTimer>,
    toss_timer: Option<TimerHandle>,
    clock_timer: Option<TimerHandle>,
    events: Vec<MatchEvent>,
}

impl MatchSession {
    /// A session in `not_started`.
    #[must_use]
    pub fn new(match_id: impl Into<String>, config: RulesConfig) -> Self {
        Self {
            match_id: match_id.into(),
            config,
            phase: MatchPhase::NotStarted,
            turn: TurnState::default(),
            sheet: ScoreSheet::new(),
            coin_toss: CoinToss::default(),
            clock: MatchClock::new(),
            practice: false,
            toss_source: TossSource::default(),
            timers: TimerQueue::new(),
            toss_timer: None,
            clock_timer: None,
            events: Vec::new(),
        }
    }

    /// Use `source` for coin tosses.
    #[must_use]
    pub fn with_toss_source(mut self, source: TossSource) -> Self {
        self.toss_source = source;
        self
    }

    /// Start in practice mode (no duration limit).
    #[must_use]
    pub fn with_practice(mut self, practice: bool) -> Self {
        self.practice = practice;
        self
    }

    /// Replace the toss source.
    pub fn set_toss_source(&mut self, source: TossSource) {
        self.toss_source = source;
    }

    /// Toggle practice mode. Takes effect at the next clock sample.
    pub fn set_practice(&mut self, practice: bool) {
        if self.practice != practice {
            tracing::info!(match_id = %self.match_id, practice, "Practice mode changed");
        }
        self.practice = practice;
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Match identifier.
    #[must_use]
    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    /// Rules in force.
    #[must_use]
    pub const fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Possession state.
    #[must_use]
    pub const fn turn(&self) -> &TurnState {
        &self.turn
    }

    /// Side in possession.
    #[must_use]
    pub const fn current_team(&self) -> Team {
        self.turn.current_team
    }

    /// Consecutive touches by the side in possession.
    #[must_use]
    pub const fn hit_count(&self) -> u8 {
        self.turn.hit_count
    }

    /// Most recent accepted touch.
    #[must_use]
    pub const fn last_touch(&self) -> Option<Touch> {
        self.turn.last_touch
    }

    /// Whether the next touch is a kick-off strike.
    #[must_use]
    pub const fn kick_off_pending(&self) -> bool {
        self.turn.kick_off_pending
    }

    /// Current score.
    #[must_use]
    pub const fn score(&self) -> Score {
        self.sheet.score()
    }

    /// Goals in order.
    #[must_use]
    pub fn goals(&self) -> &[GoalRecord] {
        self.sheet.goals()
    }

    /// Coin toss state.
    #[must_use]
    pub const fn coin_toss(&self) -> CoinToss {
        self.coin_toss
    }

    /// Whether practice mode is on.
    #[must_use]
    pub const fn is_practice(&self) -> bool {
        self.practice
    }

    /// Elapsed match milliseconds at `now_ms`.
    #[must_use]
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.clock.elapsed_ms(now_ms)
    }

    /// Elapsed whole match seconds at `now_ms`.
    #[must_use]
    pub fn elapsed_seconds(&self, now_ms: u64) -> u64 {
        self.clock.elapsed_seconds(now_ms)
    }

    /// Seconds left on the clock, or `None` in practice mode.
    #[must_use]
    pub fn remaining_seconds(&self, now_ms: u64) -> Option<u64> {
        if self.practice {
            return None;
        }
        Some(
            self.config
                .match_duration_secs
                .saturating_sub(self.elapsed_seconds(now_ms)),
        )
    }

    /// Number of timers still waiting to fire.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Earliest pending timer deadline, so hosts can sleep until then.
    #[must_use]
    pub fn next_timer_due(&self) -> Option<u64> {
        self.timers.next_due()
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Begin a new match: clear score, possession, toss and clock, cancel
    /// pending timers and enter `positioning`. Accepted from every phase.
    pub fn start_positioning(&mut self, now_ms: u64) -> PhaseResult {
        self.tick(now_ms);
        self.cancel_timers();
        self.turn = TurnState::default();
        self.sheet = ScoreSheet::new();
        self.coin_toss = CoinToss::default();
        self.clock.reset();
        tracing::info!(match_id = %self.match_id, "New match: positioning");
        self.set_phase(MatchPhase::Positioning);
        Ok(self.phase)
    }

    /// Leave `positioning` and start the coin toss.
    pub fn finish_positioning(&mut self, now_ms: u64) -> PhaseResult {
        self.tick(now_ms);
        if self.phase != MatchPhase::Positioning {
            return self.reject(PhaseRejection::WrongPhase { phase: self.phase });
        }
        self.coin_toss = CoinToss::default();
        self.set_phase(MatchPhase::CoinToss);
        self.begin_toss(now_ms);
        Ok(self.phase)
    }

    /// Flip the coin. A no-op while a toss is in the air, refused once
    /// this coin-toss phase has a result.
    pub fn toss_coin(&mut self, now_ms: u64) -> PhaseResult {
        self.tick(now_ms);
        if self.phase != MatchPhase::CoinToss {
            return self.reject(PhaseRejection::WrongPhase { phase: self.phase });
        }
        if self.coin_toss.animating {
            return self.reject(PhaseRejection::TossInProgress);
        }
        if self.coin_toss.result.is_some() {
            return self.reject(PhaseRejection::AlreadyTossed);
        }
        self.begin_toss(now_ms);
        Ok(self.phase)
    }

    /// Move from the coin toss to kick-off and start the match clock.
    pub fn start_kick_off(&mut self, now_ms: u64) -> PhaseResult {
        self.tick(now_ms);
        if self.phase != MatchPhase::CoinToss {
            return self.reject(PhaseRejection::WrongPhase { phase: self.phase });
        }
        let Some(winner) = self.coin_toss.result else {
            return self.reject(PhaseRejection::TossPending);
        };
        self.turn = TurnState::awaiting_kick_off(winner);
        self.clock.start(now_ms);
        self.schedule_clock_sample(now_ms.saturating_add(self.config.clock_sample_interval_ms));
        tracing::info!(match_id = %self.match_id, kick_off = %winner, "Kick-off");
        self.set_phase(MatchPhase::KickOff);
        Ok(self.phase)
    }

    /// Resolve a ball touch by `team`'s figure in roster slot `player_index`.
    pub fn record_ball_hit(&mut self, team: Team, player_index: u8, now_ms: u64) -> HitReport {
        self.tick(now_ms);
        if !self.phase.accepts_touches() {
            tracing::debug!(phase = %self.phase, %team, player_index, "Touch ignored outside play");
            return HitReport::rejected(&self.turn, HitReason::NotInPlay);
        }

        let touch = Touch::new(team, player_index);
        let (next, report) = apply_hit(&self.turn, touch, self.config.max_hits_per_turn);
        if !report.success {
            tracing::debug!(%team, player_index, reason = ?report.reason, "Touch rejected");
            return report;
        }

        self.turn = next;
        tracing::debug!(
            %team,
            player_index,
            hit_count = report.hit_count,
            current = %report.current_team,
            "Touch resolved"
        );
        if report.turn_changed {
            if let Some(reason) = report.reason {
                self.events.push(MatchEvent::TurnChanged {
                    team: report.current_team,
                    reason,
                });
            }
        }
        if report.kick_off_strike {
            self.set_phase(MatchPhase::InProgress);
        }
        report
    }

    /// Record a goal for `team`. The conceding side restarts with a kick-off.
    pub fn record_goal(
        &mut self,
        team: Team,
        scorer_name: impl Into<String>,
        scorer_number: u8,
        now_ms: u64,
    ) -> std::result::Result<GoalRecord, PhaseRejection> {
        self.tick(now_ms);
        if !self.phase.accepts_touches() {
            tracing::debug!(phase = %self.phase, %team, "Goal ignored outside play");
            return Err(PhaseRejection::WrongPhase { phase: self.phase });
        }

        let goal = GoalRecord {
            team,
            scorer_name: scorer_name.into(),
            scorer_number,
            elapsed_seconds: self.clock.elapsed_seconds(now_ms),
        };
        self.sheet.record(goal.clone());
        self.turn = TurnState::awaiting_kick_off(team.opponent());

        let score = self.sheet.score();
        tracing::info!(
            match_id = %self.match_id,
            %team,
            scorer = %goal.scorer_name,
            number = goal.scorer_number,
            second = goal.elapsed_seconds,
            home = score.home,
            away = score.away,
            "GOAL"
        );
        self.events.push(MatchEvent::GoalScored(goal.clone()));
        self.set_phase(MatchPhase::KickOff);
        Ok(goal)
    }

    /// Suspend play and freeze the clock. Timers keep running; the clock
    /// sampler simply ignores a paused match.
    pub fn pause(&mut self, now_ms: u64) -> PhaseResult {
        self.tick(now_ms);
        if !matches!(self.phase, MatchPhase::InProgress | MatchPhase::KickOff) {
            return self.reject(PhaseRejection::WrongPhase { phase: self.phase });
        }
        self.clock.pause(now_ms);
        self.set_phase(MatchPhase::Paused);
        Ok(self.phase)
    }

    /// Resume play with the clock continuing from where it was frozen.
    pub fn resume(&mut self, now_ms: u64) -> PhaseResult {
        self.tick(now_ms);
        if self.phase != MatchPhase::Paused {
            return self.reject(PhaseRejection::WrongPhase { phase: self.phase });
        }
        self.clock.resume(now_ms);
        self.set_phase(MatchPhase::InProgress);
        Ok(self.phase)
    }

    /// Drop all pending timers, e.g. when the host tears the match down.
    pub fn teardown(&mut self) {
        self.cancel_timers();
        self.coin_toss.animating = false;
        tracing::debug!(match_id = %self.match_id, "Session torn down");
    }

    /// Fire every timer due at or before `now_ms`.
    pub fn tick(&mut self, now_ms: u64) {
        while let Some((handle, due_ms, timer)) = self.timers.pop_due(now_ms) {
            match timer {
                MatchTimer::CoinTossResult => self.on_toss_landed(handle),
                MatchTimer::ClockSample => self.on_clock_sample(handle, due_ms, now_ms),
            }
        }
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Capture the persistent state at `now_ms`.
    #[must_use]
    pub fn snapshot(&self, now_ms: u64) -> MatchSnapshot {
        MatchSnapshot {
            version: SNAPSHOT_VERSION,
            match_id: self.match_id.clone(),
            phase: self.phase,
            current_team: self.turn.current_team,
            hit_count: self.turn.hit_count,
            last_touch: self.turn.last_touch,
            kick_off_pending: self.turn.kick_off_pending,
            last_touch_was_kick_off: self.turn.last_touch_was_kick_off,
            score: self.sheet.score(),
            goals: self.sheet.goals().to_vec(),
            coin_toss: self.coin_toss,
            elapsed_ms: self.clock.elapsed_ms(now_ms),
            match_duration_secs: self.config.match_duration_secs,
            practice: self.practice,
        }
    }

    /// Rebuild a live session from a snapshot, re-arming its timers at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot has the wrong version, its score
    /// disagrees with its goals, or its possession state is impossible under
    /// `config`.
    pub fn restore(snapshot: &MatchSnapshot, mut config: RulesConfig, now_ms: u64) -> Result<Self> {
        snapshot.validate()?;
        if snapshot.hit_count >= config.max_hits_per_turn {
            tracing::warn!(match_id = %snapshot.match_id, hit_count = snapshot.hit_count, "Rejected snapshot");
            return Err(GameError::InvalidState(format!(
                "hit count {} reaches the limit of {}",
                snapshot.hit_count, config.max_hits_per_turn
            )));
        }
        config.match_duration_secs = snapshot.match_duration_secs;

        let mut session = Self::new(snapshot.match_id.clone(), config);
        session.phase = snapshot.phase;
        session.turn = TurnState {
            current_team: snapshot.current_team,
            hit_count: snapshot.hit_count,
            last_touch: snapshot.last_touch,
            kick_off_pending: snapshot.kick_off_pending,
            last_touch_was_kick_off: snapshot.last_touch_was_kick_off,
        };
        session.sheet = ScoreSheet::from_goals(snapshot.goals.clone());
        session.coin_toss = snapshot.coin_toss;
        session.practice = snapshot.practice;

        let clock_frozen = matches!(snapshot.phase, MatchPhase::Paused | MatchPhase::Completed);
        if matches!(
            snapshot.phase,
            MatchPhase::KickOff | MatchPhase::InProgress | MatchPhase::Paused | MatchPhase::Completed
        ) {
            session.clock = MatchClock::restored(snapshot.elapsed_ms, now_ms, clock_frozen);
        }
        if matches!(
            snapshot.phase,
            MatchPhase::KickOff | MatchPhase::InProgress | MatchPhase::Paused
        ) {
            let interval = session.config.clock_sample_interval_ms;
            session.schedule_clock_sample(now_ms.saturating_add(interval));
        }
        if snapshot.phase == MatchPhase::CoinToss && snapshot.coin_toss.animating {
            // The toss was in the air when saved; flip it again.
            session.coin_toss.animating = false;
            session.begin_toss(now_ms);
        }

        tracing::debug!(match_id = %session.match_id, phase = %session.phase, "Session restored");
        Ok(session)
    }

    /// Hash of the persistent state at `now_ms`, for determinism checks.
    #[must_use]
    pub fn state_hash(&self, now_ms: u64) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.snapshot(now_ms).hash(&mut hasher);
        hasher.finish()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn set_phase(&mut self, to: MatchPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        tracing::debug!(match_id = %self.match_id, %from, %to, "Phase changed");
        self.events.push(MatchEvent::PhaseChanged { from, to });
    }

    fn reject(&self, rejection: PhaseRejection) -> PhaseResult {
        tracing::debug!(match_id = %self.match_id, phase = %self.phase, ?rejection, "Lifecycle call ignored");
        Err(rejection)
    }

    fn begin_toss(&mut self, now_ms: u64) {
        self.coin_toss.animating = true;
        let handle = self
            .timers
            .schedule(
                now_ms.saturating_add(self.config.coin_toss_delay_ms),
                MatchTimer::CoinTossResult,
            );
        self.toss_timer = Some(handle);
        self.events.push(MatchEvent::TossStarted);
    }

    fn on_toss_landed(&mut self, handle: TimerHandle) {
        if self.toss_timer != Some(handle) || self.phase != MatchPhase::CoinToss {
            return;
        }
        self.toss_timer = None;
        let winner = self.toss_source.next_winner();
        self.coin_toss = CoinToss {
            result: Some(winner),
            animating: false,
        };
        self.turn.current_team = winner;
        tracing::info!(match_id = %self.match_id, %winner, "Coin toss won");
        self.events.push(MatchEvent::TossResolved { winner });
    }

    fn schedule_clock_sample(&mut self, due_ms: u64) {
        if let Some(old) = self.clock_timer.take() {
            self.timers.cancel(old);
        }
        self.clock_timer = Some(self.timers.schedule(due_ms, MatchTimer::ClockSample));
    }

    fn on_clock_sample(&mut self, handle: TimerHandle, due_ms: u64, now_ms: u64) {
        if self.clock_timer != Some(handle) {
            return;
        }
        self.clock_timer = None;

        match self.phase {
            MatchPhase::KickOff | MatchPhase::InProgress => {
                let elapsed_ms = self.clock.elapsed_ms(due_ms);
                tracing::trace!(match_id = %self.match_id, elapsed_ms, "Clock sample");
                let limit_ms = self.config.match_duration_ms();
                if !self.practice && elapsed_ms >= limit_ms {
                    // Stop the clock at the limit even if the sample came late.
                    self.complete(limit_ms);
                    return;
                }
            }
            MatchPhase::Paused => {}
            _ => return,
        }

        // Catch up in one step when the host skipped several intervals.
        let interval = self.config.clock_sample_interval_ms;
        let next = if due_ms.saturating_add(interval) <= now_ms {
            due_ms + ((now_ms - due_ms) / interval) * interval
        } else {
            due_ms.saturating_add(interval)
        };
        self.schedule_clock_sample(next);
    }

    fn complete(&mut self, elapsed_ms: u64) {
        self.clock.freeze_at(elapsed_ms);
        self.cancel_timers();
        let score = self.sheet.score();
        let elapsed_seconds = elapsed_ms / 1000;
        tracing::info!(
            match_id = %self.match_id,
            home = score.home,
            away = score.away,
            elapsed_seconds,
            "Full time"
        );
        self.set_phase(MatchPhase::Completed);
        self.events.push(MatchEvent::MatchCompleted {
            score,
            elapsed_seconds,
        });
    }

    fn cancel_timers(&mut self) {
        self.timers.cancel_all();
        self.toss_timer = None;
        self.clock_timer = None;
    }
}
