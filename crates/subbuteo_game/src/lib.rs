//! # Subbuteo Game
//!
//! Main game client for Subbuteo.
//!
//! This crate wires the deterministic rules core into Bevy: rapier bodies
//! stand in for the core's physics handles, mouse input drives the flick
//! controller, and contact events become touch and goal reports.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_rapier3d::prelude::{NoUserData, RapierPhysicsPlugin};
use subbuteo_core::config::RulesConfig;
use subbuteo_core::error::GameError;
use thiserror::Error;

pub mod camera;
pub mod components;
pub mod flick;
pub mod hud;
pub mod match_flow;
pub mod pitch;
pub mod plugins;

pub use plugins::{GamePlugins, HeadlessGamePlugins};

/// Environment variable naming an optional rules file.
pub const RULES_ENV: &str = "SUBBUTEO_RULES";

/// Errors raised while starting the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The rules file could not be loaded.
    #[error("Failed to load rules from {path}: {source}")]
    Rules {
        /// File named by [`RULES_ENV`].
        path: String,
        /// Underlying error.
        #[source]
        source: GameError,
    },
}

/// Rules the client plays under.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct GameRules(pub RulesConfig);

/// Load rules from the file named by [`RULES_ENV`], or the defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_rules() -> Result<RulesConfig, ClientError> {
    let Ok(path) = std::env::var(RULES_ENV) else {
        return Ok(RulesConfig::default());
    };
    let config = RulesConfig::load(&path).map_err(|source| ClientError::Rules {
        path: path.clone(),
        source,
    })?;
    tracing::info!(%path, "Loaded rules");
    Ok(config)
}

/// Run the game.
///
/// # Errors
///
/// Returns an error if the game fails to initialize.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let rules = load_rules()?;

    let mut app = App::new();

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Subbuteo".into(),
                    resolution: (1600.0, 900.0).into(),
                    ..default()
                }),
                ..default()
            })
            .disable::<LogPlugin>(), // Logging already initialized in main.rs
    );

    app.insert_resource(GameRules(rules));
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());

    #[cfg(feature = "debug-physics")]
    app.add_plugins(bevy_rapier3d::render::RapierDebugRenderPlugin::default());

    app.add_plugins(GamePlugins);

    // Dark stadium background
    app.insert_resource(ClearColor(Color::srgb(0.06, 0.08, 0.1)));

    #[cfg(feature = "dev-tools")]
    {
        tracing::info!("Development tools enabled");
    }

    app.run();

    Ok(())
}
