//! Flick controller tests with synthetic bodies.

use subbuteo_core::prelude::*;
use subbuteo_test_utils::fixtures::{fixed_f, FlatProjector, TestBody};
use subbuteo_test_utils::proptest::prelude::*;

fn setup() -> (FlickController, TestBody, TestBody, FlatProjector) {
    (
        FlickController::new(&RulesConfig::default()),
        TestBody::at(1.0, 1.0),
        TestBody::at(1.5, 1.0),
        FlatProjector::default(),
    )
}

#[test]
fn test_flick_points_from_figure_to_release() {
    let (mut ctl, mut figure, ball, projector) = setup();
    let press = projector.screen_for(1.0, 1.2);
    assert_eq!(
        ctl.on_pointer(PointerEvent::Down(press), 0, &mut figure, &projector),
        FlickResponse::ChargeStarted
    );

    // Held for 1.2 s at 60 fps.
    for frame in 1..=72u64 {
        ctl.on_frame(frame * 1_000 / 60, &figure, &ball);
    }
    let power = ctl.charge_power().unwrap();
    assert!((power - fixed_f(0.6)).abs() < fixed_f(0.001));

    let release = projector.screen_for(0.8, 1.0);
    let response = ctl.on_pointer(PointerEvent::Up(release), 1_200, &mut figure, &projector);
    let FlickResponse::Flicked { impulse, power } = response else {
        panic!("expected a flick, got {response:?}");
    };
    assert!((power - fixed_f(0.6)).abs() < fixed_f(0.001));

    // 0.6 * 0.15 = 0.09 toward -x.
    assert!((impulse.x + fixed_f(0.09)).abs() < fixed_f(0.001));
    assert!(impulse.z.abs() < fixed_f(0.001));
    assert_eq!(figure.total_impulse(), impulse);
}

#[test]
fn test_controller_follows_session_phase() {
    let (mut ctl, mut figure, _ball, projector) = setup();
    let mut session = MatchSession::new("flick", RulesConfig::default())
        .with_toss_source(TossSource::Fixed(Team::Home));
    let press = projector.screen_for(1.0, 1.2);

    session.start_positioning(0).unwrap();
    ctl.sync_phase(session.phase());
    assert_eq!(
        ctl.on_pointer(PointerEvent::Down(press), 0, &mut figure, &projector),
        FlickResponse::Ignored {
            reason: IgnoreReason::Disabled
        }
    );

    session.finish_positioning(0).unwrap();
    session.start_kick_off(2_000).unwrap();
    ctl.sync_phase(session.phase());
    assert_eq!(
        ctl.on_pointer(PointerEvent::Down(press), 2_000, &mut figure, &projector),
        FlickResponse::ChargeStarted
    );

    // Pausing mid-charge abandons it.
    session.record_ball_hit(Team::Home, 9, 2_100);
    session.pause(2_200).unwrap();
    ctl.sync_phase(session.phase());
    assert!(!ctl.is_charging());
    assert!(ctl
        .drain_signals()
        .ends_with(&[FlickSignal::ChargingChanged(false)]));
}

#[test]
fn test_ball_motion_gates_presses() {
    let (mut ctl, mut figure, _ball, projector) = setup();
    let rolling_ball = TestBody::moving(0.0, 0.4);
    ctl.on_frame(0, &figure, &rolling_ball);

    let press = projector.screen_for(1.0, 1.2);
    assert_eq!(
        ctl.on_pointer(PointerEvent::Down(press), 10, &mut figure, &projector),
        FlickResponse::Ignored {
            reason: IgnoreReason::InMotion
        }
    );
}

proptest! {
    #[test]
    fn prop_no_impulse_at_or_below_min_power(held in 0u64..=100) {
        let (mut ctl, mut figure, _ball, projector) = setup();
        let press = projector.screen_for(1.0, 1.2);
        ctl.on_pointer(PointerEvent::Down(press), 0, &mut figure, &projector);
        let response = ctl.on_pointer(PointerEvent::Up(press), held, &mut figure, &projector);
        prop_assert_eq!(response, FlickResponse::Ignored { reason: IgnoreReason::TooWeak });
        prop_assert!(figure.impulses.is_empty());
    }

    #[test]
    fn prop_impulse_never_exceeds_max_force(held in 101u64..2_000) {
        let (mut ctl, mut figure, _ball, projector) = setup();
        let press = projector.screen_for(1.0, 1.25);
        ctl.on_pointer(PointerEvent::Down(press), 0, &mut figure, &projector);
        ctl.on_pointer(PointerEvent::Up(press), held, &mut figure, &projector);
        let impulse = figure.total_impulse();
        prop_assert!(impulse.length() <= fixed_f(0.1501));
        prop_assert!(figure.impulses.len() == 1);
    }
}
