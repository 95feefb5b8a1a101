//! Headless match runner.
//!
//! This binary runs a match without graphics, controlled via JSON on stdin/stdout.
//! Designed for scripted controllers, CI testing, and replay verification.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p subbuteo_headless
//!
//! # Run a scenario script
//! cargo run -p subbuteo_headless -- run-scenario scenarios/full_match.ron
//!
//! # Soak test the rules with random matches
//! cargo run -p subbuteo_headless -- batch --count 1000 --output results/batch.json
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use subbuteo_core::coin_toss::TossSource;
use subbuteo_core::config::RulesConfig;
use subbuteo_core::phase::Team;
use subbuteo_core::replay::MatchLog;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subbuteo_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::{run_scenario, Scenario},
};

#[derive(Parser)]
#[command(name = "subbuteo_headless")]
#[command(about = "Headless table-football match runner for scripted testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Rules file (RON); defaults to the standard rules
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one match over the JSON-lines protocol
    Run {
        /// Match id used for saves
        #[arg(long, default_value = "headless")]
        match_id: String,

        /// Toss seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Force every toss to this side ("home" or "away")
        #[arg(long)]
        toss: Option<String>,

        /// Start in practice mode (no time limit)
        #[arg(long)]
        practice: bool,

        /// Directory for saved matches
        #[arg(long, default_value = "matches")]
        store: PathBuf,
    },

    /// Run a scenario script and check its expectations
    RunScenario {
        /// Scenario file
        path: PathBuf,

        /// Save the recorded replay here
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// Play a batch of seeded random matches
    Batch {
        /// Number of matches to play
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Command budget per match
        #[arg(long, default_value = "500")]
        max_commands: u32,

        /// Output file for results
        #[arg(short, long, default_value = "results/batch_results.json")]
        output: PathBuf,
    },

    /// Replay a recorded match
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Verify replay reproduces the recorded final state
        #[arg(long)]
        verify: bool,
    },

    /// Verify determinism by playing the same seed multiple times
    Verify {
        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let rules = load_rules(cli.rules.as_deref());

    match cli.command {
        Some(Commands::Run {
            match_id,
            seed,
            toss,
            practice,
            store,
        }) => {
            cmd_run(match_id, rules, seed, toss.as_deref(), practice, store);
        }
        Some(Commands::RunScenario { path, replay }) => {
            cmd_run_scenario(&path, replay);
        }
        Some(Commands::Batch {
            count,
            parallel,
            seed,
            max_commands,
            output,
        }) => {
            cmd_batch(rules, count, parallel, seed, max_commands, &output);
        }
        Some(Commands::Replay { file, verify }) => {
            cmd_replay(&file, verify);
        }
        Some(Commands::Verify { seed, runs }) => {
            cmd_verify(&rules, seed, runs);
        }
        None => {
            // Default: interactive mode
            cmd_run(
                "headless".to_string(),
                rules,
                0,
                None,
                false,
                PathBuf::from("matches"),
            );
        }
    }
}

fn load_rules(path: Option<&Path>) -> RulesConfig {
    let Some(path) = path else {
        return RulesConfig::default();
    };
    match RulesConfig::load(path) {
        Ok(rules) => {
            tracing::info!(path = %path.display(), "Loaded rules");
            rules
        }
        Err(e) => {
            eprintln!("FATAL: Cannot load rules '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Play one match over stdin/stdout
fn cmd_run(
    match_id: String,
    rules: RulesConfig,
    seed: u64,
    toss: Option<&str>,
    practice: bool,
    store: PathBuf,
) {
    let toss = match toss {
        None => TossSource::seeded(seed),
        Some("home") => TossSource::Fixed(Team::Home),
        Some("away") => TossSource::Fixed(Team::Away),
        Some(other) => {
            eprintln!("Unknown side '{other}', expected 'home' or 'away'");
            std::process::exit(2);
        }
    };
    tracing::info!(%match_id, practice, "Starting interactive session");

    let mut runner = HeadlessRunner::with_config(HeadlessConfig {
        match_id,
        rules,
        toss,
        practice,
        store_dir: store,
        record: true,
    });

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(e) = runner.run(stdin.lock(), stdout.lock()) {
        tracing::error!(error = %e, "Protocol session failed");
        std::process::exit(1);
    }
}

/// Run a scenario script
fn cmd_run_scenario(path: &Path, replay: Option<PathBuf>) {
    let scenario = match Scenario::load(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load scenario: {e}");
            std::process::exit(1);
        }
    };

    let (report, log) = match run_scenario(&scenario) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Scenario rejected: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to encode report: {e}"),
    }

    if let Some(replay_path) = replay {
        if let Err(e) = log.save(&replay_path) {
            eprintln!("Failed to save replay: {e}");
            std::process::exit(1);
        }
        eprintln!("Replay saved to: {}", replay_path.display());
    }

    if report.passed {
        eprintln!("PASS: {} ({} steps)", report.name, report.steps_run);
    } else {
        eprintln!("FAIL: {}", report.name);
        for failure in &report.failures {
            match failure.step {
                Some(step) => eprintln!("  step {step} @ {} ms: {}", failure.at_ms, failure.message),
                None => eprintln!("  final @ {} ms: {}", failure.at_ms, failure.message),
            }
        }
        std::process::exit(1);
    }
}

/// Play a batch of random matches
fn cmd_batch(
    rules: RulesConfig,
    count: u32,
    parallel: u32,
    seed: u64,
    max_commands: u32,
    output: &Path,
) {
    let config = BatchConfig {
        game_count: count,
        parallel_games: parallel,
        seed_start: seed,
        max_commands,
        rules,
    };
    let results = run_batch(config);

    if let Err(e) = results.save(output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    // Print summary
    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Matches played: {}", results.games.len());
    eprintln!("Played to full time: {}", summary.completed);
    eprintln!(
        "Home {} / Away {} / Draws {}",
        summary.home_wins, summary.away_wins, summary.draws
    );
    eprintln!("Goals per match: {:.2}", summary.average_goals);
    eprintln!("Turnovers per match: {:.1}", summary.average_turnovers);
    eprintln!("Duration: {:.1}s", results.duration_seconds);

    if !results.errors.is_empty() {
        eprintln!("\nMATCH FAILURES: {}", results.errors.len());
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Match {} (seed {}): {}",
                error.game_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", output.display());
    if !results.errors.is_empty() {
        std::process::exit(1);
    }
}

/// Replay a recorded match
fn cmd_replay(file: &Path, verify: bool) {
    let log = match MatchLog::load(file) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Failed to load replay: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("Loaded replay:");
    eprintln!("  Match: {}", log.match_id);
    eprintln!("  Commands: {}", log.command_count());
    eprintln!("  Duration: {} ms", log.final_ms);

    if verify {
        match log.verify() {
            Ok(true) => eprintln!("PASS: Replay verification successful"),
            Ok(false) => {
                eprintln!("FAIL: Replay produced a different final state!");
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("FAIL: Error during verification: {e}");
                std::process::exit(1);
            }
        }
    }

    let session = log.replay();
    let score = session.score();
    eprintln!("\nFinal State:");
    eprintln!("  Phase: {}", session.phase());
    eprintln!("  Score: {} - {}", score.home, score.away);
    for goal in session.goals() {
        eprintln!(
            "  {}' {} {} #{}",
            goal.elapsed_seconds, goal.team, goal.scorer_name, goal.scorer_number
        );
    }
    eprintln!("  State hash: {:016x}", session.state_hash(log.final_ms));
}

/// Verify determinism
fn cmd_verify(rules: &RulesConfig, seed: u64, runs: u32) {
    tracing::info!("Verifying determinism with seed {} ({} runs)", seed, runs);

    if verify_determinism(seed, runs, rules) {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}
