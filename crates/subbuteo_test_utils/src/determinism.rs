//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a match produces identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and remote views only work if a match is a pure function of its
//! commands. Sources of non-determinism include:
//!
//! - **System time**: the session only ever sees the caller's `now_ms`.
//! - **System randomness**: coin tosses come from a seeded [`TossSource`].
//! - **Floating-point math**: flick geometry uses fixed-point
//!   ([`subbuteo_core::math::Fixed`]).
//!
//! [`TossSource`]: subbuteo_core::coin_toss::TossSource

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use subbuteo_core::replay::MatchLog;
use subbuteo_core::session::MatchSession;
use subbuteo_core::snapshot::MatchSnapshot;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps applied per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic match).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Match is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance by one step (receives the step index)
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for index in 0..steps {
            step(&mut state, index);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Replay `log` `runs` times and compare final state hashes.
#[must_use]
pub fn verify_log_determinism(log: &MatchLog, runs: usize) -> DeterminismResult {
    let hashes: Vec<u64> = (0..runs)
        .map(|_| log.replay().state_hash(log.final_ms))
        .collect();
    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps: log.commands.len() as u64,
    }
}

/// Replay `log` on `threads` scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a replay thread panics.
#[must_use]
pub fn replay_in_parallel(log: &MatchLog, threads: usize) -> DeterminismResult {
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| s.spawn(|| log.replay().state_hash(log.final_ms)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("replay thread panicked"))
            .collect()
    });
    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps: log.commands.len() as u64,
    }
}

/// Compare two logs command by command, finding the first divergence.
///
/// # Returns
///
/// `None` if both logs produce the same state after every command,
/// `Some(index)` for the first command after which they differ.
#[must_use]
pub fn find_first_divergence(a: &MatchLog, b: &MatchLog) -> Option<usize> {
    let mut left = a.session();
    let mut right = b.session();
    let len = a.commands.len().max(b.commands.len());

    for index in 0..len {
        let (Some(ca), Some(cb)) = (a.commands.get(index), b.commands.get(index)) else {
            return Some(index);
        };
        left.apply(&ca.command, ca.at_ms);
        right.apply(&cb.command, cb.at_ms);
        let now = ca.at_ms.max(cb.at_ms);
        if left.state_hash(now) != right.state_hash(now) {
            tracing::debug!(index, left = ca.command.name(), right = cb.command.name(), "Logs diverge");
            return Some(index);
        }
    }
    None
}

/// Verify that a snapshot round trip preserves the session exactly.
#[must_use]
pub fn verify_snapshot_round_trip(session: &MatchSession, now_ms: u64) -> bool {
    let snapshot = session.snapshot(now_ms);
    let Ok(bytes) = snapshot.to_bytes() else {
        return false;
    };
    let Ok(decoded) = MatchSnapshot::from_bytes(&bytes) else {
        return false;
    };
    let Ok(restored) = MatchSession::restore(&decoded, session.config().clone(), now_ms) else {
        return false;
    };
    restored.state_hash(now_ms) == session.state_hash(now_ms)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::session_in_play;
    use subbuteo_core::coin_toss::TossSource;
    use subbuteo_core::command::MatchCommand;
    use subbuteo_core::config::RulesConfig;
    use subbuteo_core::phase::Team;

    fn log() -> MatchLog {
        let mut log = MatchLog::new("det", RulesConfig::default(), TossSource::seeded(3));
        let mut session = log.session();
        log.apply(&mut session, MatchCommand::StartPositioning, 0);
        log.apply(&mut session, MatchCommand::FinishPositioning, 0);
        log.apply(&mut session, MatchCommand::StartKickOff, 1_600);
        log.apply(&mut session, MatchCommand::Hit { team: Team::Home, player: 2 }, 2_000);
        log.finalize(&mut session, 70_000);
        log
    }

    #[test]
    fn test_log_replays_identically() {
        verify_log_determinism(&log(), 4).assert_deterministic();
        replay_in_parallel(&log(), 4).assert_deterministic();
    }

    #[test]
    fn test_divergence_found() {
        let a = log();
        let mut b = log();
        b.commands[3].command = MatchCommand::Hit { team: Team::Away, player: 2 };
        assert_eq!(find_first_divergence(&a, &a), None);
        assert_eq!(find_first_divergence(&a, &b), Some(3));
    }

    #[test]
    fn test_snapshot_round_trip() {
        assert!(verify_snapshot_round_trip(&session_in_play(Team::Home), 10_000));
    }

    #[test]
    fn test_generic_harness() {
        let result = verify_determinism(
            3,
            50,
            || session_in_play(Team::Home),
            |session, i| {
                let team = if i % 4 == 0 { Team::Away } else { Team::Home };
                session.record_ball_hit(team, (i % 11) as u8, 3_000 + i * 100);
            },
            |session| session.state_hash(10_000),
        );
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }
}
