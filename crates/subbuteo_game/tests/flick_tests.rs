//! Flick input tests.
//!
//! Pointer events go through the headless plugin group; time advances in
//! fixed 100 ms steps so charge durations are predictable.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_rapier3d::prelude::{ExternalImpulse, Velocity};
use subbuteo_core::flick::{FlickResponse, FlickSignal, IgnoreReason, PointerEvent, ScreenPoint};
use subbuteo_core::math::PlanarVec;
use subbuteo_core::prelude::{MatchPhase, MatchSession, RulesConfig, Team, TossSource};

use subbuteo_game::camera::CameraMode;
use subbuteo_game::components::{Ball, ControlledFigure, Figure};
use subbuteo_game::plugins::{FlickInput, FlickPointer, FlickSignalFired, MatchState};
use subbuteo_game::HeadlessGamePlugins;

fn kick_off_session() -> MatchSession {
    let config = RulesConfig {
        coin_toss_delay_ms: 0,
        ..RulesConfig::default()
    };
    let mut session =
        MatchSession::new("flick", config).with_toss_source(TossSource::Fixed(Team::Home));
    session.start_positioning(0).unwrap();
    session.finish_positioning(0).unwrap();
    session.start_kick_off(0).unwrap();
    session
}

fn setup_app() -> (App, Entity) {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)));
    app.add_plugins(HeadlessGamePlugins);
    app.insert_resource(MatchState::new(kick_off_session()));

    let figure = app
        .world_mut()
        .spawn((
            Figure::new(Team::Home, 9, "Striker"),
            Transform::from_xyz(0.0, 0.0175, 0.0),
            Velocity::zero(),
            ExternalImpulse::default(),
        ))
        .id();
    app.world_mut().spawn((
        Ball,
        Transform::from_xyz(0.05, 0.011, 0.0),
        Velocity::zero(),
    ));
    app.update();
    (app, figure)
}

fn pointer(app: &mut App, event: PointerEvent, x: f32, z: f32) {
    app.world_mut().send_event(FlickPointer {
        event,
        ground: Some(PlanarVec::from_f32(x, z)),
    });
}

fn last_response(app: &App) -> Option<FlickResponse> {
    app.world().resource::<FlickInput>().last_response
}

fn run_frames(app: &mut App, frames: usize) {
    for _ in 0..frames {
        app.update();
    }
}

const AT: ScreenPoint = ScreenPoint::new(0.0, 0.0);

#[test]
fn press_in_ring_starts_charge() {
    let (mut app, figure) = setup_app();
    pointer(&mut app, PointerEvent::Down(AT), 0.15, 0.0);
    app.update();

    assert_eq!(last_response(&app), Some(FlickResponse::ChargeStarted));
    assert!(app.world().resource::<FlickInput>().controller.is_charging());
    assert!(app.world().get::<ControlledFigure>(figure).is_some());
}

#[test]
fn press_off_ring_is_ignored() {
    let (mut app, figure) = setup_app();
    pointer(&mut app, PointerEvent::Down(AT), 0.5, 0.0);
    app.update();

    assert_eq!(
        last_response(&app),
        Some(FlickResponse::Ignored {
            reason: IgnoreReason::OutsideActivationRing
        })
    );
    assert!(app.world().get::<ControlledFigure>(figure).is_none());
}

#[test]
fn hold_and_release_flicks_the_figure() {
    let (mut app, figure) = setup_app();
    pointer(&mut app, PointerEvent::Down(AT), 0.15, 0.0);
    app.update();
    run_frames(&mut app, 10);
    pointer(&mut app, PointerEvent::Up(AT), 0.2, 0.0);
    app.update();

    let Some(FlickResponse::Flicked { power, .. }) = last_response(&app) else {
        panic!("expected a flick, got {:?}", last_response(&app));
    };
    let power = power.to_num::<f32>();
    assert!(power > 0.4 && power < 0.7, "power {power}");

    let impulse = app.world().get::<ExternalImpulse>(figure).unwrap().impulse;
    assert!(impulse.x > 0.0);
    assert_eq!(impulse.y, 0.0);
    assert!(app.world().get::<ControlledFigure>(figure).is_none());

    let signals = app.world().resource::<Events<FlickSignalFired>>();
    let flicked = signals
        .get_reader()
        .read(signals)
        .filter(|FlickSignalFired(signal)| matches!(signal, FlickSignal::Flicked { .. }))
        .count();
    assert_eq!(flicked, 1);
}

#[test]
fn overcharged_release_does_nothing() {
    let (mut app, figure) = setup_app();
    pointer(&mut app, PointerEvent::Down(AT), 0.15, 0.0);
    app.update();
    run_frames(&mut app, 25);
    pointer(&mut app, PointerEvent::Up(AT), 0.2, 0.0);
    app.update();

    assert_eq!(
        last_response(&app),
        Some(FlickResponse::Ignored {
            reason: IgnoreReason::Overcharged
        })
    );
    assert_eq!(
        app.world().get::<ExternalImpulse>(figure).unwrap().impulse,
        Vec3::ZERO
    );
}

#[test]
fn pause_cancels_the_charge() {
    let (mut app, _) = setup_app();
    pointer(&mut app, PointerEvent::Down(AT), 0.15, 0.0);
    app.update();

    app.world_mut()
        .resource_mut::<MatchState>()
        .session
        .pause(200)
        .unwrap();
    app.update();

    let input = app.world().resource::<FlickInput>();
    assert_eq!(
        app.world().resource::<MatchState>().session.phase(),
        MatchPhase::Paused
    );
    assert!(!input.controller.is_enabled());
    assert!(!input.controller.is_charging());
}

#[test]
fn manual_camera_blocks_flicks() {
    let (mut app, _) = setup_app();
    app.world_mut().resource_mut::<CameraMode>().manual = true;
    app.update();

    pointer(&mut app, PointerEvent::Down(AT), 0.15, 0.0);
    app.update();
    assert_eq!(
        last_response(&app),
        Some(FlickResponse::Ignored {
            reason: IgnoreReason::ManualCamera
        })
    );
}

#[test]
fn moving_ball_blocks_flicks() {
    let (mut app, _) = setup_app();
    let mut balls = app.world_mut().query_filtered::<&mut Velocity, With<Ball>>();
    for mut velocity in balls.iter_mut(app.world_mut()) {
        velocity.linvel = Vec3::new(0.5, 0.0, 0.0);
    }
    app.update();

    pointer(&mut app, PointerEvent::Down(AT), 0.15, 0.0);
    app.update();
    assert_eq!(
        last_response(&app),
        Some(FlickResponse::Ignored {
            reason: IgnoreReason::InMotion
        })
    );
}
