//! Pitch plugin: the table, the goals, the ball and both teams.
//!
//! Home defends the goal at -x and attacks towards +x. Every body is a
//! rapier collider; goals are sensors so the ball entering one produces a
//! contact event without bouncing off.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{
    ActiveEvents, Ccd, Collider, ColliderMassProperties, Damping, ExternalImpulse, Friction,
    LockedAxes, Restitution, RigidBody, Sensor, Velocity,
};
use subbuteo_core::phase::{MatchPhase, Team};
use subbuteo_core::session::MatchEvent;

use crate::components::{team_color, Ball, Figure, GoalMouth, HomePosition};
use crate::match_flow::{MatchEventFired, MatchFlowSet};

/// Figures per side.
pub const SQUAD_SIZE: u8 = 11;

/// 4-4-2 for a side attacking +x, as fractions of the half-pitch.
pub const FORMATION: [(f32, f32); SQUAD_SIZE as usize] = [
    (-0.95, 0.0),
    (-0.65, -0.6),
    (-0.65, -0.2),
    (-0.65, 0.2),
    (-0.65, 0.6),
    (-0.35, -0.6),
    (-0.35, -0.2),
    (-0.35, 0.2),
    (-0.35, 0.6),
    (-0.12, -0.15),
    (-0.12, 0.15),
];

/// Plugin that builds the table and restarts play.
///
/// Provides:
/// - Ground, walls and goal sensors
/// - Ball and both squads as rapier bodies
/// - Returning everything to its home spot after goals and new matches
pub struct PitchPlugin;

impl Plugin for PitchPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PitchDimensions>()
            .add_systems(Startup, spawn_pitch)
            .add_systems(Update, restart_positions.after(MatchFlowSet::Publish));
    }
}

/// Table measurements in metres.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct PitchDimensions {
    /// Goal line to goal line.
    pub length: f32,
    /// Touchline to touchline.
    pub width: f32,
    /// Distance between the posts.
    pub goal_width: f32,
    /// Ball radius.
    pub ball_radius: f32,
    /// Figure base radius.
    pub figure_radius: f32,
    /// Figure height.
    pub figure_height: f32,
}

impl Default for PitchDimensions {
    fn default() -> Self {
        Self {
            length: 1.2,
            width: 0.8,
            goal_width: 0.14,
            ball_radius: 0.011,
            figure_radius: 0.012,
            figure_height: 0.035,
        }
    }
}

impl PitchDimensions {
    /// Half the pitch length.
    #[must_use]
    pub fn half_length(&self) -> f32 {
        self.length / 2.0
    }

    /// Half the pitch width.
    #[must_use]
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    /// Whether a ground point lies on the playing surface.
    #[must_use]
    pub fn contains(&self, x: f32, z: f32) -> bool {
        x.abs() <= self.half_length() && z.abs() <= self.half_width()
    }

    /// Kick-off spot of `team`'s roster slot.
    #[must_use]
    pub fn formation_spot(&self, team: Team, slot: u8) -> Vec3 {
        let (fx, fz) = FORMATION[usize::from(slot) % FORMATION.len()];
        let side = match team {
            Team::Home => 1.0,
            Team::Away => -1.0,
        };
        Vec3::new(
            fx * side * self.half_length(),
            self.figure_height / 2.0,
            fz * side * self.half_width(),
        )
    }

    /// Centre-spot resting place of the ball.
    #[must_use]
    pub fn ball_spot(&self) -> Vec3 {
        Vec3::new(0.0, self.ball_radius, 0.0)
    }
}

fn spawn_pitch(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    dims: Res<PitchDimensions>,
) {
    let hl = dims.half_length();
    let hw = dims.half_width();

    // Cloth
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Plane3d::default().mesh().size(dims.length + 0.1, dims.width + 0.1)),
            material: materials.add(StandardMaterial {
                base_color: Color::srgb(0.12, 0.45, 0.16),
                perceptual_roughness: 0.9,
                ..default()
            }),
            transform: Transform::from_xyz(0.0, -0.005, 0.0),
            ..default()
        },
        RigidBody::Fixed,
        Collider::cuboid(hl + 0.05, 0.005, hw + 0.05),
        Friction::coefficient(0.5),
    ));

    // Boards around the table
    let board = materials.add(Color::srgb(0.35, 0.22, 0.12));
    let boards = [
        (Vec3::new(hl + 0.05, 0.02, 0.0), Vec3::new(0.005, 0.02, hw + 0.05)),
        (Vec3::new(-hl - 0.05, 0.02, 0.0), Vec3::new(0.005, 0.02, hw + 0.05)),
        (Vec3::new(0.0, 0.02, hw + 0.05), Vec3::new(hl + 0.05, 0.02, 0.005)),
        (Vec3::new(0.0, 0.02, -hw - 0.05), Vec3::new(hl + 0.05, 0.02, 0.005)),
    ];
    for (centre, half) in boards {
        commands.spawn((
            PbrBundle {
                mesh: meshes.add(Cuboid::new(half.x * 2.0, half.y * 2.0, half.z * 2.0)),
                material: board.clone(),
                transform: Transform::from_translation(centre),
                ..default()
            },
            RigidBody::Fixed,
            Collider::cuboid(half.x, half.y, half.z),
            Restitution::coefficient(0.7),
        ));
    }

    // Goals: a net mesh with a sensor just behind the line
    let net = materials.add(StandardMaterial {
        base_color: Color::srgba(0.95, 0.95, 0.95, 0.5),
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    for team in Team::ALL {
        let side = match team {
            Team::Home => -1.0,
            Team::Away => 1.0,
        };
        commands.spawn((
            PbrBundle {
                mesh: meshes.add(Cuboid::new(0.03, 0.04, dims.goal_width)),
                material: net.clone(),
                transform: Transform::from_xyz(side * (hl + 0.015), 0.02, 0.0),
                ..default()
            },
            Collider::cuboid(0.015, 0.02, dims.goal_width / 2.0),
            Sensor,
            GoalMouth { defended_by: team },
        ));
    }

    // Ball
    let ball_spot = dims.ball_spot();
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Sphere::new(dims.ball_radius)),
            material: materials.add(Color::srgb(0.95, 0.95, 0.9)),
            transform: Transform::from_translation(ball_spot),
            ..default()
        },
        RigidBody::Dynamic,
        Collider::ball(dims.ball_radius),
        ColliderMassProperties::Mass(0.005),
        Restitution::coefficient(0.6),
        Damping {
            linear_damping: 0.8,
            angular_damping: 0.8,
        },
        Velocity::zero(),
        ExternalImpulse::default(),
        ActiveEvents::COLLISION_EVENTS,
        Ccd::enabled(),
        Ball,
        HomePosition(ball_spot),
    ));

    // Squads
    let figure_mesh = meshes.add(Cylinder::new(dims.figure_radius, dims.figure_height));
    for team in Team::ALL {
        let kit = materials.add(team_color(team));
        for slot in 0..SQUAD_SIZE {
            let spot = dims.formation_spot(team, slot);
            let figure = Figure::new(team, slot, format!("{team} {}", slot + 1));
            commands.spawn((
                PbrBundle {
                    mesh: figure_mesh.clone(),
                    material: kit.clone(),
                    transform: Transform::from_translation(spot),
                    ..default()
                },
                RigidBody::Dynamic,
                Collider::cylinder(dims.figure_height / 2.0, dims.figure_radius),
                ColliderMassProperties::Mass(0.02),
                LockedAxes::ROTATION_LOCKED,
                Friction::coefficient(0.4),
                Damping {
                    linear_damping: 2.0,
                    angular_damping: 2.0,
                },
                Velocity::zero(),
                ExternalImpulse::default(),
                figure,
                HomePosition(spot),
            ));
        }
    }

    tracing::info!(figures = SQUAD_SIZE * 2, "Pitch spawned");
}

/// Puts the ball and every figure back on their spots after a goal or when
/// a new match starts positioning.
pub fn restart_positions(
    mut events: EventReader<MatchEventFired>,
    mut bodies: Query<(&HomePosition, &mut Transform, Option<&mut Velocity>)>,
) {
    let restart = events.read().any(|MatchEventFired(event)| {
        matches!(
            event,
            MatchEvent::GoalScored(_)
                | MatchEvent::PhaseChanged {
                    to: MatchPhase::Positioning,
                    ..
                }
        )
    });
    if !restart {
        return;
    }

    for (home, mut transform, velocity) in &mut bodies {
        transform.translation = home.0;
        if let Some(mut velocity) = velocity {
            *velocity = Velocity::zero();
        }
    }
    tracing::debug!("Positions restored");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formation_inside_own_half() {
        let dims = PitchDimensions::default();
        for slot in 0..SQUAD_SIZE {
            let home = dims.formation_spot(Team::Home, slot);
            let away = dims.formation_spot(Team::Away, slot);
            assert!(home.x < 0.0 && away.x > 0.0);
            assert!(dims.contains(home.x, home.z));
            assert_eq!(home.x, -away.x);
        }
    }

    #[test]
    fn test_ball_spot_on_centre() {
        let dims = PitchDimensions::default();
        let spot = dims.ball_spot();
        assert_eq!((spot.x, spot.z), (0.0, 0.0));
        assert!(!dims.contains(dims.half_length() + 0.01, 0.0));
    }
}
