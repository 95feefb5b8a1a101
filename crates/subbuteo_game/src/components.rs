//! ECS components for the Bevy client.
//!
//! Rules state lives in the core session; these components only tag the
//! physics entities so contact events can be translated into touches.

use bevy::prelude::*;
use subbuteo_core::phase::Team;

/// A playing figure.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Figure {
    /// Side the figure plays for.
    pub team: Team,
    /// Roster slot, as reported to the rules.
    pub player_index: u8,
    /// Shirt number shown in goal records.
    pub shirt_number: u8,
    /// Display name.
    pub name: String,
}

impl Figure {
    /// Create a figure in `team`'s roster slot `player_index`.
    #[must_use]
    pub fn new(team: Team, player_index: u8, name: impl Into<String>) -> Self {
        Self {
            team,
            player_index,
            shirt_number: player_index + 1,
            name: name.into(),
        }
    }
}

/// The match ball.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Ball;

/// Goal sensor behind a goal line.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalMouth {
    /// Side that defends this goal.
    pub defended_by: Team,
}

impl GoalMouth {
    /// Side credited when the ball enters this goal.
    #[must_use]
    pub const fn scoring_team(&self) -> Team {
        self.defended_by.opponent()
    }
}

/// Where an entity is placed when play restarts.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct HomePosition(pub Vec3);

/// Marker for the figure currently being charged.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ControlledFigure;

/// Team kit colour.
#[must_use]
pub fn team_color(team: Team) -> Color {
    match team {
        Team::Home => Color::srgb(0.8, 0.1, 0.12),
        Team::Away => Color::srgb(0.1, 0.25, 0.85),
    }
}
