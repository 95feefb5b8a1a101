//! Test fixtures and helpers.
//!
//! Sessions parked at well-known points of the match lifecycle, plus a
//! synthetic rigid body and projector for driving flick controllers
//! without a physics engine.

use fixed::types::I32F32;
use subbuteo_core::coin_toss::TossSource;
use subbuteo_core::command::MatchCommand;
use subbuteo_core::config::RulesConfig;
use subbuteo_core::flick::{GroundProjector, PhysicsBody, ScreenPoint};
use subbuteo_core::math::PlanarVec;
use subbuteo_core::phase::{MatchPhase, Team};
use subbuteo_core::session::MatchSession;

/// Caller clock at which [`session_at_kick_off`] starts the match clock.
pub const KICK_OFF_AT_MS: u64 = 2_000;

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real rules code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Session whose toss always goes to `winner`.
#[must_use]
pub fn session_with_toss(winner: Team) -> MatchSession {
    MatchSession::new("fixture", RulesConfig::default()).with_toss_source(TossSource::Fixed(winner))
}

/// Session in `kick_off`, with `winner` to take it and the clock started
/// at [`KICK_OFF_AT_MS`].
///
/// # Panics
///
/// Panics if the lifecycle refuses a step, which would be a rules bug.
#[must_use]
pub fn session_at_kick_off(winner: Team) -> MatchSession {
    let mut session = session_with_toss(winner);
    session.start_positioning(0).expect("start positioning");
    session.finish_positioning(0).expect("finish positioning");
    session.tick(KICK_OFF_AT_MS);
    session.start_kick_off(KICK_OFF_AT_MS).expect("kick off");
    session
}

/// Session in `in_progress` after `winner`'s figure 9 took the kick-off
/// half a second after [`KICK_OFF_AT_MS`].
///
/// # Panics
///
/// Panics if the kick-off strike is refused.
#[must_use]
pub fn session_in_play(winner: Team) -> MatchSession {
    let mut session = session_at_kick_off(winner);
    let report = session.record_ball_hit(winner, 9, KICK_OFF_AT_MS + 500);
    assert!(report.success && session.phase() == MatchPhase::InProgress);
    session
}

/// Apply `(at_ms, command)` pairs in order to a fresh session.
#[must_use]
pub fn scripted_session(config: RulesConfig, toss: TossSource, script: &[(u64, MatchCommand)]) -> MatchSession {
    let mut session = MatchSession::new("scripted", config).with_toss_source(toss);
    for (at_ms, command) in script {
        session.apply(command, *at_ms);
    }
    session
}

/// Rigid body that records the impulses it receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestBody {
    /// Position on the ground plane.
    pub position: PlanarVec,
    /// Planar velocity.
    pub velocity: PlanarVec,
    /// Every impulse applied, in order.
    pub impulses: Vec<PlanarVec>,
}

impl TestBody {
    /// Body at rest at `(x, z)`.
    #[must_use]
    pub fn at(x: f32, z: f32) -> Self {
        Self {
            position: PlanarVec::from_f32(x, z),
            ..Self::default()
        }
    }

    /// Body moving with velocity `(x, z)`.
    #[must_use]
    pub fn moving(x: f32, z: f32) -> Self {
        Self {
            velocity: PlanarVec::from_f32(x, z),
            ..Self::default()
        }
    }

    /// Sum of all impulses received.
    #[must_use]
    pub fn total_impulse(&self) -> PlanarVec {
        self.impulses
            .iter()
            .fold(PlanarVec::ZERO, |acc, impulse| acc + *impulse)
    }
}

impl PhysicsBody for TestBody {
    fn position(&self) -> PlanarVec {
        self.position
    }

    fn planar_velocity(&self) -> PlanarVec {
        self.velocity
    }

    fn apply_impulse(&mut self, impulse: PlanarVec) {
        self.impulses.push(impulse);
    }
}

/// Top-down projector: screen pixels scale straight onto the pitch.
///
/// Points outside `[0, width) x [0, height)` miss the pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatProjector {
    /// World units per pixel.
    pub units_per_pixel: f32,
    /// Screen width in pixels.
    pub width: f32,
    /// Screen height in pixels.
    pub height: f32,
}

impl Default for FlatProjector {
    fn default() -> Self {
        Self {
            units_per_pixel: 0.001,
            width: 2_000.0,
            height: 2_000.0,
        }
    }
}

impl FlatProjector {
    /// Screen point that projects onto world `(x, z)`.
    #[must_use]
    pub fn screen_for(&self, x: f32, z: f32) -> ScreenPoint {
        ScreenPoint::new(x / self.units_per_pixel, z / self.units_per_pixel)
    }
}

impl GroundProjector for FlatProjector {
    fn project_to_ground(&self, point: ScreenPoint) -> Option<PlanarVec> {
        if point.x < 0.0 || point.y < 0.0 || point.x >= self.width || point.y >= self.height {
            return None;
        }
        Some(PlanarVec::from_f32(
            point.x * self.units_per_pixel,
            point.y * self.units_per_pixel,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_phases() {
        assert_eq!(session_at_kick_off(Team::Home).phase(), MatchPhase::KickOff);
        let session = session_in_play(Team::Away);
        assert_eq!(session.phase(), MatchPhase::InProgress);
        assert_eq!(session.current_team(), Team::Away);
    }

    #[test]
    fn test_projector_bounds() {
        let projector = FlatProjector::default();
        assert!(projector
            .project_to_ground(ScreenPoint::new(-1.0, 10.0))
            .is_none());
        let point = projector.screen_for(0.5, 0.25);
        let ground = projector.project_to_ground(point).unwrap();
        let (x, z) = ground.to_f32();
        assert!((x - 0.5).abs() < 1e-4 && (z - 0.25).abs() < 1e-4);
    }
}
