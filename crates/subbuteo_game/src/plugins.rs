//! Game plugins for Bevy.
//!
//! This module provides the plugin groups for the game client,
//! aggregating all match plugins into a single registration point.

use bevy::app::PluginGroupBuilder;
use bevy::prelude::*;

use crate::camera::CameraPlugin;
use crate::flick::{FlickPlugin, PointerInputPlugin};
use crate::hud::HudPlugin;
use crate::match_flow::{MatchControlsPlugin, MatchFlowPlugin};
use crate::pitch::PitchPlugin;

// Re-export commonly used types for convenience
pub use crate::flick::{FlickInput, FlickPointer, FlickSignalFired};
pub use crate::match_flow::{MatchEventFired, MatchState, TouchResolved};

// ============================================================================
// Plugin Groups
// ============================================================================

/// Main plugin group containing all game client plugins.
///
/// Expects `DefaultPlugins` and the rapier physics plugin to be added first.
///
/// # Example
/// ```ignore
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(GamePlugins)
///     .run();
/// ```
pub struct GamePlugins;

impl PluginGroup for GamePlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::start::<Self>()
            .add(MatchFlowPlugin) // Session first; everything reads it
            .add(MatchControlsPlugin)
            .add(CameraPlugin)
            .add(PitchPlugin)
            .add(FlickPlugin)
            .add(PointerInputPlugin)
            .add(HudPlugin)
    }
}

/// Headless plugin group for rules-only testing.
///
/// This runs the match session and flick controller without rendering,
/// windows or mouse input. Contact and pointer events are sent by the test.
///
/// # Example
/// ```ignore
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(HeadlessGamePlugins)
///     .run();
/// ```
pub struct HeadlessGamePlugins;

impl PluginGroup for HeadlessGamePlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::start::<Self>()
            .add(MatchFlowPlugin)
            .add(FlickPlugin)
    }
}
