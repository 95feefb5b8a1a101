//! Subbuteo - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use subbuteo_core::config::RulesConfig;
use subbuteo_tools::validate::{validate_path, FileKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "subbuteo-tools")]
#[command(about = "Development tools for the Subbuteo match engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate rules, scenario and snapshot files
    Validate {
        /// File or directory to check
        #[arg(default_value = "assets")]
        path: PathBuf,

        /// Treat every file as this kind instead of detecting it
        #[arg(long, value_enum)]
        kind: Option<FileKind>,
    },

    /// Print the default rules as RON
    Defaults,
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path, kind } => {
            tracing::info!("Validating data files in: {}", path.display());
            let reports = match validate_path(&path, kind) {
                Ok(reports) => reports,
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            };

            let mut failed = 0;
            for report in &reports {
                match &report.result {
                    Ok(kind) => println!("ok    {:<9} {}", kind, report.path.display()),
                    Err(e) => {
                        failed += 1;
                        println!("FAIL  {e}");
                    }
                }
            }
            if failed > 0 {
                tracing::error!("{failed} of {} files failed validation", reports.len());
                std::process::exit(1);
            }
            tracing::info!("Validation passed ({} files)", reports.len());
        }
        Commands::Defaults => match RulesConfig::default().to_ron_string() {
            Ok(text) => println!("{text}"),
            Err(e) => {
                tracing::error!("Cannot encode rules: {e}");
                std::process::exit(1);
            }
        },
    }
}
