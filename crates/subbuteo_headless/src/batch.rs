//! Batch match runner for rules soak testing.
//!
//! Plays many seeded random matches in parallel using rayon. Every match
//! is recorded, and after each command the runner checks the bookkeeping
//! that must never break: the score agrees with the goal list and the touch
//! count stays below the turnover limit. Each finished match must also
//! replay to the same final state.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use subbuteo_core::coin_toss::TossSource;
use subbuteo_core::command::MatchCommand;
use subbuteo_core::config::RulesConfig;
use subbuteo_core::phase::{MatchPhase, Team};
use subbuteo_core::replay::MatchLog;
use subbuteo_core::scoring::Score;
use subbuteo_core::session::{MatchEvent, MatchSession};
use tracing::{debug, info, warn};

/// Figures per side addressed by random touches.
const ROSTER: u8 = 11;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of matches to play
    pub game_count: u32,
    /// Maximum parallel matches (0 = use rayon default)
    pub parallel_games: u32,
    /// Starting seed for deterministic runs
    pub seed_start: u64,
    /// Command budget per match; a match still running afterwards is cut off
    pub max_commands: u32,
    /// Rules every match is played under
    pub rules: RulesConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_commands: 500,
            rules: RulesConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` matches with default rules
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set rules
    #[must_use]
    pub fn with_rules(mut self, rules: RulesConfig) -> Self {
        self.rules = rules;
        self
    }
}

/// What happened in one random match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Index within the batch
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Phase when play stopped
    pub final_phase: MatchPhase,
    /// Final score
    pub score: Score,
    /// Toss winner
    pub toss_winner: Option<Team>,
    /// Commands applied
    pub commands: u32,
    /// Touches the rules accepted
    pub touches: u32,
    /// Touches the rules refused
    pub refused_touches: u32,
    /// Possession changes (interceptions and forced turnovers)
    pub turnovers: u32,
    /// Match seconds played
    pub elapsed_seconds: u64,
    /// Final state hash
    pub state_hash: u64,
}

impl GameSummary {
    /// Winning side, `None` for a draw
    #[must_use]
    pub fn winner(&self) -> Option<Team> {
        match self.score.home.cmp(&self.score.away) {
            std::cmp::Ordering::Greater => Some(Team::Home),
            std::cmp::Ordering::Less => Some(Team::Away),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Aggregate over all matches of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches played to the end of the clock
    pub completed: u32,
    /// Home wins
    pub home_wins: u32,
    /// Away wins
    pub away_wins: u32,
    /// Draws
    pub draws: u32,
    /// Goals over all matches
    pub total_goals: u32,
    /// Mean goals per match
    pub average_goals: f64,
    /// Mean possession changes per match
    pub average_turnovers: f64,
}

impl BatchSummary {
    /// Summarise `games`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_games(games: &[GameSummary]) -> Self {
        let mut summary = Self::default();
        let mut turnovers = 0_u64;
        for game in games {
            if game.final_phase == MatchPhase::Completed {
                summary.completed += 1;
            }
            match game.winner() {
                Some(Team::Home) => summary.home_wins += 1,
                Some(Team::Away) => summary.away_wins += 1,
                None => summary.draws += 1,
            }
            summary.total_goals += game.score.home + game.score.away;
            turnovers += u64::from(game.turnovers);
        }
        if !games.is_empty() {
            summary.average_goals = f64::from(summary.total_goals) / games.len() as f64;
            summary.average_turnovers = turnovers as f64 / games.len() as f64;
        }
        summary
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual match summaries
    pub games: Vec<GameSummary>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Matches that broke an invariant
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// xorshift64* generator for random commands.
#[derive(Debug, Clone)]
struct CommandRng(u64);

impl CommandRng {
    fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        Self(seed ^ 0x2545_F491_4F6C_DD1D | 1)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n.max(1)
    }

    fn team(&mut self) -> Team {
        if self.next_u64() & 1 == 0 {
            Team::Home
        } else {
            Team::Away
        }
    }

    fn player(&mut self) -> u8 {
        u8::try_from(self.below(u64::from(ROSTER))).unwrap_or(0)
    }
}

/// Pick the next command for a match in `phase`.
fn random_command(rng: &mut CommandRng, session: &MatchSession) -> MatchCommand {
    match session.phase() {
        MatchPhase::Paused => {
            if rng.below(3) == 0 {
                MatchCommand::Tick
            } else {
                MatchCommand::Resume
            }
        }
        _ => match rng.below(100) {
            0..=81 => MatchCommand::Hit {
                team: rng.team(),
                player: rng.player(),
            },
            82..=89 => {
                let team = rng.team();
                let player = rng.player();
                MatchCommand::Goal {
                    team,
                    scorer_name: format!("{team} {}", player + 1),
                    scorer_number: player + 1,
                }
            }
            90..=93 => MatchCommand::Pause,
            _ => MatchCommand::Tick,
        },
    }
}

fn check_invariants(session: &MatchSession, max_hits: u8) -> Result<(), String> {
    let from_goals = Score::from_goals(session.goals());
    if session.score() != from_goals {
        return Err(format!(
            "score {}-{} disagrees with goals {}-{}",
            session.score().home,
            session.score().away,
            from_goals.home,
            from_goals.away
        ));
    }
    if session.hit_count() >= max_hits {
        return Err(format!(
            "hit count {} reached the turnover limit {max_hits}",
            session.hit_count()
        ));
    }
    Ok(())
}

/// Play one seeded random match, returning its summary and replay log.
///
/// # Errors
///
/// Returns a description of the first broken invariant, or of a replay
/// that does not reproduce the match.
pub fn play_random_match(
    game_index: u32,
    seed: u64,
    rules: &RulesConfig,
    max_commands: u32,
) -> Result<(GameSummary, MatchLog), String> {
    let mut rng = CommandRng::new(seed);
    let mut log = MatchLog::new(format!("batch_{seed}"), rules.clone(), TossSource::seeded(seed));
    let mut session = log.session();
    let max_hits = rules.max_hits_per_turn;

    let mut now = 0;
    log.apply(&mut session, MatchCommand::StartPositioning, now);
    log.apply(&mut session, MatchCommand::FinishPositioning, now);
    now += rules.coin_toss_delay_ms;
    log.apply(&mut session, MatchCommand::StartKickOff, now);
    if session.phase() != MatchPhase::KickOff {
        return Err(format!("kick-off refused in phase {}", session.phase()));
    }

    let mut summary = GameSummary {
        game_index,
        seed,
        final_phase: session.phase(),
        score: Score::default(),
        toss_winner: session.coin_toss().result,
        commands: 3,
        touches: 0,
        refused_touches: 0,
        turnovers: 0,
        elapsed_seconds: 0,
        state_hash: 0,
    };

    while session.phase() != MatchPhase::Completed && summary.commands < max_commands {
        now += 100 + rng.below(2_400);
        let command = random_command(&mut rng, &session);
        let is_touch = matches!(command, MatchCommand::Hit { .. });
        let outcome = log.apply(&mut session, command, now);
        summary.commands += 1;

        if is_touch {
            if outcome.accepted() {
                summary.touches += 1;
            } else {
                summary.refused_touches += 1;
            }
        }
        for event in session.drain_events() {
            if matches!(event, MatchEvent::TurnChanged { .. }) {
                summary.turnovers += 1;
            }
        }
        check_invariants(&session, max_hits)
            .map_err(|e| format!("after command {} at {now} ms: {e}", summary.commands))?;
    }

    log.finalize(&mut session, now);
    match log.verify() {
        Ok(true) => {}
        Ok(false) => return Err("replay diverged from the played match".to_string()),
        Err(e) => return Err(e.to_string()),
    }

    summary.final_phase = session.phase();
    summary.score = session.score();
    summary.elapsed_seconds = session.elapsed_seconds(now);
    summary.state_hash = session.state_hash(now);
    Ok((summary, log))
}

/// Run a batch of matches
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        games = config.game_count,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    // Configure thread pool if specified
    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<GameSummary, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match play_random_match(i, seed, &config.rules, config.max_commands) {
                Ok((summary, _)) => {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 100 == 0 {
                        debug!("Progress: {}/{}", done, config.game_count);
                    }
                    Ok(summary)
                }
                Err(message) => {
                    warn!(game = i, seed, %message, "Match failed");
                    Err(BatchError {
                        game_index: i,
                        seed,
                        message,
                    })
                }
            }
        })
        .collect();

    let (games, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let games: Vec<GameSummary> = games.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        games = games.len(),
        failed = errors.len(),
        "Batch complete in {:.1}s",
        duration_seconds
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Verify determinism by playing the same seed several times
pub fn verify_determinism(seed: u64, runs: u32, rules: &RulesConfig) -> bool {
    let hashes: Vec<Option<u64>> = (0..runs)
        .map(|_| {
            play_random_match(0, seed, rules, BatchConfig::default().max_commands)
                .ok()
                .map(|(summary, _)| summary.state_hash)
        })
        .collect();

    match hashes.first() {
        Some(Some(first)) => hashes.iter().all(|h| *h == Some(*first)),
        _ => false,
    }
}
