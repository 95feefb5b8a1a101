//! Press-and-hold flick input for one figure.
//!
//! A [`FlickController`] turns pointer gestures into a single impulse on the
//! figure it controls:
//!
//! 1. **Press** inside the activation ring around the figure starts a charge.
//! 2. **Hold**: power grows with hold time; holding past the limit
//!    overcharges and the release does nothing.
//! 3. **Release**: the impulse points from the figure toward the release
//!    point, scaled by power.
//!
//! The controller is engine-agnostic: the host supplies a [`PhysicsBody`]
//! for the figure (and ball) and a [`GroundProjector`] that maps screen
//! points onto the pitch. Refusals are never errors; every call returns a
//! [`FlickResponse`] and state changes are queued as [`FlickSignal`]s.

use serde::{Deserialize, Serialize};

use crate::config::RulesConfig;
use crate::math::{Fixed, PlanarVec};
use crate::motion::MotionMonitor;
use crate::phase::MatchPhase;
use crate::power::PowerChargeSession;

/// A rigid body as seen by the controller.
pub trait PhysicsBody {
    /// Position on the ground plane.
    fn position(&self) -> PlanarVec;
    /// Velocity on the ground plane.
    fn planar_velocity(&self) -> PlanarVec;
    /// Apply an instantaneous planar impulse.
    fn apply_impulse(&mut self, impulse: PlanarVec);
}

/// Maps screen coordinates to the pitch surface.
pub trait GroundProjector {
    /// Ground point under `point`, or `None` if the ray misses the pitch.
    fn project_to_ground(&self, point: ScreenPoint) -> Option<PlanarVec>;
}

/// Pointer position in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// Horizontal pixel.
    pub x: f32,
    /// Vertical pixel.
    pub y: f32,
}

impl ScreenPoint {
    /// Create a screen point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Raw pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    /// Button pressed.
    Down(ScreenPoint),
    /// Pointer moved.
    Move(ScreenPoint),
    /// Button released.
    Up(ScreenPoint),
    /// Pointer left the window.
    Leave,
}

/// Why a gesture did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The camera is under manual control.
    ManualCamera,
    /// The match phase does not allow flicks.
    Disabled,
    /// A flick happened too recently.
    Cooldown,
    /// Figures or ball are still moving.
    InMotion,
    /// A charge is already running.
    AlreadyCharging,
    /// The pointer is not over the pitch.
    OffSurface,
    /// The press was too close to or too far from the figure.
    OutsideActivationRing,
    /// Move or release without a charge.
    NotCharging,
    /// Held past the limit.
    Overcharged,
    /// Released before reaching the minimum power.
    TooWeak,
    /// Released too close to the figure for a direction.
    NoDirection,
}

impl IgnoreReason {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManualCamera => "manual_camera",
            Self::Disabled => "disabled",
            Self::Cooldown => "cooldown",
            Self::InMotion => "in_motion",
            Self::AlreadyCharging => "already_charging",
            Self::OffSurface => "off_surface",
            Self::OutsideActivationRing => "outside_activation_ring",
            Self::NotCharging => "not_charging",
            Self::Overcharged => "overcharged",
            Self::TooWeak => "too_weak",
            Self::NoDirection => "no_direction",
        }
    }
}

/// Result of one pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum FlickResponse {
    /// A charge began.
    ChargeStarted,
    /// The charge continues.
    Charging {
        /// Power at this moment.
        #[serde(with = "crate::math::fixed_serde")]
        power: Fixed,
    },
    /// The release produced an impulse.
    Flicked {
        /// Impulse applied to the figure.
        impulse: PlanarVec,
        /// Power of the release.
        #[serde(with = "crate::math::fixed_serde")]
        power: Fixed,
    },
    /// The charge was abandoned without an impulse.
    Cancelled,
    /// Nothing happened.
    Ignored {
        /// Why.
        reason: IgnoreReason,
    },
}

impl FlickResponse {
    const fn ignored(reason: IgnoreReason) -> Self {
        Self::Ignored { reason }
    }
}

/// State changes observers may react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlickSignal {
    /// A charge started or ended.
    ChargingChanged(bool),
    /// Play started or stopped moving.
    MotionChanged(bool),
    /// An impulse was applied.
    Flicked {
        /// Impulse applied to the figure.
        impulse: PlanarVec,
        /// Power of the release.
        #[serde(with = "crate::math::fixed_serde")]
        power: Fixed,
    },
}

/// Controller tuning, taken from [`RulesConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlickTuning {
    /// Inner activation radius.
    pub inner_radius: Fixed,
    /// Outer activation radius.
    pub outer_radius: Fixed,
    /// Hold time for full power.
    pub max_hold_ms: u64,
    /// Impulse at full power.
    pub max_force: Fixed,
    /// Power at or below which releases are ignored.
    pub min_power: Fixed,
    /// Minimum figure-to-release distance.
    pub min_distance: Fixed,
    /// Lockout after a flick.
    pub cooldown_ms: u64,
}

impl From<&RulesConfig> for FlickTuning {
    fn from(config: &RulesConfig) -> Self {
        Self {
            inner_radius: config.activation_inner_radius,
            outer_radius: config.activation_outer_radius,
            max_hold_ms: config.max_hold_ms,
            max_force: config.max_force,
            min_power: config.min_power,
            min_distance: config.min_flick_distance,
            cooldown_ms: config.flick_cooldown_ms,
        }
    }
}

/// Flick input state for one controlled figure.
#[derive(Debug, Clone)]
pub struct FlickController {
    tuning: FlickTuning,
    enabled: bool,
    manual_camera: bool,
    charge: Option<PowerChargeSession>,
    cooldown_until_ms: Option<u64>,
    motion: MotionMonitor,
    signals: Vec<FlickSignal>,
}

impl FlickController {
    /// Enabled controller at rest, tuned from `config`.
    #[must_use]
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            tuning: FlickTuning::from(config),
            enabled: true,
            manual_camera: false,
            charge: None,
            cooldown_until_ms: None,
            motion: MotionMonitor::new(config.motion_threshold, config.settle_frames),
            signals: Vec::new(),
        }
    }

    /// Current tuning.
    #[must_use]
    pub const fn tuning(&self) -> &FlickTuning {
        &self.tuning
    }

    /// Whether the controller accepts presses.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable. Disabling abandons a running charge.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.cancel_charge();
        }
    }

    /// Follow the match phase: flicks only during kick-off and open play.
    pub fn sync_phase(&mut self, phase: MatchPhase) {
        self.set_enabled(phase.allows_flick());
    }

    /// Whether the camera is under manual control.
    #[must_use]
    pub const fn manual_camera(&self) -> bool {
        self.manual_camera
    }

    /// Set the manual-camera mode. Entering it abandons a running charge.
    pub fn set_manual_camera(&mut self, manual: bool) {
        self.manual_camera = manual;
        if manual {
            self.cancel_charge();
        }
    }

    /// Whether a charge is running.
    #[must_use]
    pub const fn is_charging(&self) -> bool {
        self.charge.is_some()
    }

    /// The running charge.
    #[must_use]
    pub const fn charge(&self) -> Option<&PowerChargeSession> {
        self.charge.as_ref()
    }

    /// Power of the running charge as of the last frame.
    #[must_use]
    pub fn charge_power(&self) -> Option<Fixed> {
        self.charge.map(|c| c.power(self.tuning.max_hold_ms))
    }

    /// Whether play is moving.
    #[must_use]
    pub const fn in_motion(&self) -> bool {
        self.motion.in_motion()
    }

    /// Milliseconds of cooldown left at `now_ms`.
    #[must_use]
    pub fn cooldown_remaining(&self, now_ms: u64) -> u64 {
        self.cooldown_until_ms
            .map_or(0, |until| until.saturating_sub(now_ms))
    }

    /// Take queued signals.
    pub fn drain_signals(&mut self) -> Vec<FlickSignal> {
        std::mem::take(&mut self.signals)
    }

    /// Per-frame update: advance the charge clock and the motion monitor.
    pub fn on_frame<F, B>(&mut self, now_ms: u64, figure: &F, ball: &B)
    where
        F: PhysicsBody + ?Sized,
        B: PhysicsBody + ?Sized,
    {
        if let Some(charge) = self.charge.as_mut() {
            if charge.update_time(now_ms, self.tuning.max_hold_ms) {
                tracing::debug!(held_ms = charge.elapsed_hold_ms, "Charge overcharged");
            }
        }

        let speed = figure.planar_velocity().length() + ball.planar_velocity().length();
        if let Some(moving) = self.motion.sample(speed) {
            tracing::trace!(moving, "Motion changed");
            self.signals.push(FlickSignal::MotionChanged(moving));
        }
    }

    /// Handle one pointer event for `figure`.
    pub fn on_pointer<F, P>(
        &mut self,
        event: PointerEvent,
        now_ms: u64,
        figure: &mut F,
        projector: &P,
    ) -> FlickResponse
    where
        F: PhysicsBody + ?Sized,
        P: GroundProjector + ?Sized,
    {
        let response = match event {
            PointerEvent::Down(point) => self.press(point, now_ms, &*figure, projector),
            PointerEvent::Move(point) => self.drag(point, now_ms, &*figure, projector),
            PointerEvent::Up(point) => self.release(point, now_ms, figure, projector),
            PointerEvent::Leave => {
                if self.cancel_charge() {
                    FlickResponse::Cancelled
                } else {
                    FlickResponse::ignored(IgnoreReason::NotCharging)
                }
            }
        };
        if let FlickResponse::Ignored { reason } = response {
            tracing::trace!(reason = reason.as_str(), "Pointer event ignored");
        }
        response
    }

    fn press<F, P>(&mut self, point: ScreenPoint, now_ms: u64, figure: &F, projector: &P) -> FlickResponse
    where
        F: PhysicsBody + ?Sized,
        P: GroundProjector + ?Sized,
    {
        if !self.enabled {
            return FlickResponse::ignored(IgnoreReason::Disabled);
        }
        if self.manual_camera {
            return FlickResponse::ignored(IgnoreReason::ManualCamera);
        }
        if self.cooldown_remaining(now_ms) > 0 {
            return FlickResponse::ignored(IgnoreReason::Cooldown);
        }
        if self.motion.in_motion() {
            return FlickResponse::ignored(IgnoreReason::InMotion);
        }
        if self.charge.is_some() {
            return FlickResponse::ignored(IgnoreReason::AlreadyCharging);
        }
        let Some(ground) = projector.project_to_ground(point) else {
            return FlickResponse::ignored(IgnoreReason::OffSurface);
        };

        let centre = figure.position();
        let distance_sq = ground.distance_squared(centre);
        let inner = self.tuning.inner_radius;
        let outer = self.tuning.outer_radius;
        if distance_sq < inner * inner || distance_sq > outer * outer {
            return FlickResponse::ignored(IgnoreReason::OutsideActivationRing);
        }

        let mut charge = PowerChargeSession::begin(now_ms, ground);
        charge.update_hold(ground, centre, self.tuning.min_distance);
        self.charge = Some(charge);
        self.signals.push(FlickSignal::ChargingChanged(true));
        tracing::debug!("Charge started");
        FlickResponse::ChargeStarted
    }

    fn drag<F, P>(&mut self, point: ScreenPoint, now_ms: u64, figure: &F, projector: &P) -> FlickResponse
    where
        F: PhysicsBody + ?Sized,
        P: GroundProjector + ?Sized,
    {
        let tuning = self.tuning;
        let Some(charge) = self.charge.as_mut() else {
            return FlickResponse::ignored(IgnoreReason::NotCharging);
        };
        charge.update_time(now_ms, tuning.max_hold_ms);
        // Off the pitch: keep the last good hold point.
        if let Some(ground) = projector.project_to_ground(point) {
            charge.update_hold(ground, figure.position(), tuning.min_distance);
        }
        FlickResponse::Charging {
            power: charge.power(tuning.max_hold_ms),
        }
    }

    fn release<F, P>(
        &mut self,
        point: ScreenPoint,
        now_ms: u64,
        figure: &mut F,
        projector: &P,
    ) -> FlickResponse
    where
        F: PhysicsBody + ?Sized,
        P: GroundProjector + ?Sized,
    {
        let tuning = self.tuning;
        let Some(mut charge) = self.charge.take() else {
            return FlickResponse::ignored(IgnoreReason::NotCharging);
        };
        self.signals.push(FlickSignal::ChargingChanged(false));

        charge.update_time(now_ms, tuning.max_hold_ms);
        if let Some(ground) = projector.project_to_ground(point) {
            charge.update_hold(ground, figure.position(), tuning.min_distance);
        }

        if charge.overcharged {
            return FlickResponse::ignored(IgnoreReason::Overcharged);
        }
        let power = charge.power(tuning.max_hold_ms);
        if power <= tuning.min_power {
            return FlickResponse::ignored(IgnoreReason::TooWeak);
        }
        let Some(direction) = charge.direction else {
            return FlickResponse::ignored(IgnoreReason::NoDirection);
        };

        let impulse = direction.scale(power.saturating_mul(tuning.max_force));
        figure.apply_impulse(impulse);
        self.cooldown_until_ms = Some(now_ms + tuning.cooldown_ms);
        self.signals.push(FlickSignal::Flicked { impulse, power });
        tracing::debug!(%power, held_ms = charge.elapsed_hold_ms, "Flick");
        FlickResponse::Flicked { impulse, power }
    }

    fn cancel_charge(&mut self) -> bool {
        if self.charge.take().is_some() {
            self.signals.push(FlickSignal::ChargingChanged(false));
            tracing::debug!("Charge cancelled");
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal body for unit tests.
    #[derive(Default)]
    struct Body {
        position: PlanarVec,
        velocity: PlanarVec,
        impulses: Vec<PlanarVec>,
    }

    impl PhysicsBody for Body {
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

    /// Screen pixels map 1:1000 onto the pitch; negative x is off the pitch.
    struct Projector;

    impl GroundProjector for Projector {
        fn project_to_ground(&self, point: ScreenPoint) -> Option<PlanarVec> {
            if point.x < 0.0 {
                return None;
            }
            Some(PlanarVec::from_f32(point.x / 1000.0, point.y / 1000.0))
        }
    }

    fn controller() -> FlickController {
        FlickController::new(&RulesConfig::default())
    }

    fn ring_point() -> ScreenPoint {
        ScreenPoint::new(150.0, 0.0)
    }

    #[test]
    fn test_full_flick() {
        let mut ctl = controller();
        let mut body = Body::default();
        let down = ctl.on_pointer(PointerEvent::Down(ring_point()), 0, &mut body, &Projector);
        assert_eq!(down, FlickResponse::ChargeStarted);
        assert!(ctl.is_charging());

        let up = ctl.on_pointer(PointerEvent::Up(ring_point()), 1_000, &mut body, &Projector);
        let FlickResponse::Flicked { impulse, power } = up else {
            panic!("expected flick, got {up:?}");
        };
        assert_eq!(power, Fixed::from_num(0.5));
        assert_eq!(body.impulses, vec![impulse]);
        // 0.5 * 0.15 along +x.
        let expected = Fixed::from_num(0.075);
        assert!((impulse.x - expected).abs() < Fixed::from_num(0.0001));
        assert_eq!(impulse.z, Fixed::ZERO);

        assert_eq!(
            ctl.drain_signals(),
            vec![
                FlickSignal::ChargingChanged(true),
                FlickSignal::ChargingChanged(false),
                FlickSignal::Flicked { impulse, power },
            ]
        );
    }

    #[test]
    fn test_activation_ring() {
        let mut ctl = controller();
        let mut body = Body::default();
        let too_close = ctl.on_pointer(
            PointerEvent::Down(ScreenPoint::new(50.0, 0.0)),
            0,
            &mut body,
            &Projector,
        );
        assert_eq!(
            too_close,
            FlickResponse::Ignored {
                reason: IgnoreReason::OutsideActivationRing
            }
        );
        let too_far = ctl.on_pointer(
            PointerEvent::Down(ScreenPoint::new(0.0, 400.0)),
            0,
            &mut body,
            &Projector,
        );
        assert_eq!(
            too_far,
            FlickResponse::Ignored {
                reason: IgnoreReason::OutsideActivationRing
            }
        );
        assert!(!ctl.is_charging());
    }

    #[test]
    fn test_off_surface_press() {
        let mut ctl = controller();
        let mut body = Body::default();
        let response = ctl.on_pointer(
            PointerEvent::Down(ScreenPoint::new(-1.0, 0.0)),
            0,
            &mut body,
            &Projector,
        );
        assert_eq!(
            response,
            FlickResponse::Ignored {
                reason: IgnoreReason::OffSurface
            }
        );
    }

    #[test]
    fn test_overcharge_releases_nothing() {
        let mut ctl = controller();
        let mut body = Body::default();
        ctl.on_pointer(PointerEvent::Down(ring_point()), 0, &mut body, &Projector);
        let ball = Body::default();
        ctl.on_frame(2_500, &body, &ball);
        assert_eq!(ctl.charge_power(), Some(Fixed::ZERO));

        let up = ctl.on_pointer(PointerEvent::Up(ring_point()), 2_600, &mut body, &Projector);
        assert_eq!(
            up,
            FlickResponse::Ignored {
                reason: IgnoreReason::Overcharged
            }
        );
        assert!(body.impulses.is_empty());
        assert!(!ctl.is_charging());
    }

    #[test]
    fn test_weak_release_is_silent() {
        let mut ctl = controller();
        let mut body = Body::default();
        ctl.on_pointer(PointerEvent::Down(ring_point()), 0, &mut body, &Projector);
        // 100 ms of 2000 is exactly 0.05, which is not enough.
        let up = ctl.on_pointer(PointerEvent::Up(ring_point()), 100, &mut body, &Projector);
        assert_eq!(
            up,
            FlickResponse::Ignored {
                reason: IgnoreReason::TooWeak
            }
        );
        assert!(body.impulses.is_empty());
    }

    #[test]
    fn test_release_on_figure_has_no_direction() {
        let mut ctl = controller();
        let mut body = Body::default();
        ctl.on_pointer(PointerEvent::Down(ring_point()), 0, &mut body, &Projector);
        let up = ctl.on_pointer(
            PointerEvent::Up(ScreenPoint::new(5.0, 0.0)),
            1_000,
            &mut body,
            &Projector,
        );
        assert_eq!(
            up,
            FlickResponse::Ignored {
                reason: IgnoreReason::NoDirection
            }
        );
    }

    #[test]
    fn test_cooldown_after_flick() {
        let mut ctl = controller();
        let mut body = Body::default();
        ctl.on_pointer(PointerEvent::Down(ring_point()), 0, &mut body, &Projector);
        ctl.on_pointer(PointerEvent::Up(ring_point()), 1_000, &mut body, &Projector);

        let early = ctl.on_pointer(PointerEvent::Down(ring_point()), 1_400, &mut body, &Projector);
        assert_eq!(
            early,
            FlickResponse::Ignored {
                reason: IgnoreReason::Cooldown
            }
        );
        let later = ctl.on_pointer(PointerEvent::Down(ring_point()), 1_500, &mut body, &Projector);
        assert_eq!(later, FlickResponse::ChargeStarted);
    }

    #[test]
    fn test_motion_blocks_press() {
        let mut ctl = controller();
        let mut body = Body::default();
        let rolling = Body {
            velocity: PlanarVec::from_f32(0.3, 0.0),
            ..Body::default()
        };
        ctl.on_frame(0, &body, &rolling);
        assert!(ctl.in_motion());
        let response = ctl.on_pointer(PointerEvent::Down(ring_point()), 10, &mut body, &Projector);
        assert_eq!(
            response,
            FlickResponse::Ignored {
                reason: IgnoreReason::InMotion
            }
        );

        let still = Body::default();
        for frame in 1..=30 {
            ctl.on_frame(frame * 16, &body, &still);
        }
        assert!(!ctl.in_motion());
        assert_eq!(
            ctl.drain_signals(),
            vec![FlickSignal::MotionChanged(true), FlickSignal::MotionChanged(false)]
        );
    }

    #[test]
    fn test_manual_camera_and_disabled() {
        let mut ctl = controller();
        let mut body = Body::default();
        ctl.set_manual_camera(true);
        assert_eq!(
            ctl.on_pointer(PointerEvent::Down(ring_point()), 0, &mut body, &Projector),
            FlickResponse::Ignored {
                reason: IgnoreReason::ManualCamera
            }
        );
        ctl.set_manual_camera(false);
        ctl.sync_phase(MatchPhase::Paused);
        assert_eq!(
            ctl.on_pointer(PointerEvent::Down(ring_point()), 0, &mut body, &Projector),
            FlickResponse::Ignored {
                reason: IgnoreReason::Disabled
            }
        );
    }

    #[test]
    fn test_second_press_while_charging() {
        let mut ctl = controller();
        let mut body = Body::default();
        ctl.on_pointer(PointerEvent::Down(ring_point()), 0, &mut body, &Projector);
        assert_eq!(
            ctl.on_pointer(PointerEvent::Down(ring_point()), 10, &mut body, &Projector),
            FlickResponse::Ignored {
                reason: IgnoreReason::AlreadyCharging
            }
        );
    }

    #[test]
    fn test_leave_cancels_charge() {
        let mut ctl = controller();
        let mut body = Body::default();
        ctl.on_pointer(PointerEvent::Down(ring_point()), 0, &mut body, &Projector);
        assert_eq!(
            ctl.on_pointer(PointerEvent::Leave, 500, &mut body, &Projector),
            FlickResponse::Cancelled
        );
        assert!(!ctl.is_charging());
        assert_eq!(
            ctl.on_pointer(PointerEvent::Up(ring_point()), 900, &mut body, &Projector),
            FlickResponse::Ignored {
                reason: IgnoreReason::NotCharging
            }
        );
        assert!(body.impulses.is_empty());
    }

    #[test]
    fn test_drag_reports_power_and_keeps_last_hold() {
        let mut ctl = controller();
        let mut body = Body::default();
        ctl.on_pointer(PointerEvent::Down(ring_point()), 0, &mut body, &Projector);
        let response = ctl.on_pointer(
            PointerEvent::Move(ScreenPoint::new(0.0, 200.0)),
            500,
            &mut body,
            &Projector,
        );
        assert_eq!(
            response,
            FlickResponse::Charging {
                power: Fixed::from_num(0.25)
            }
        );
        ctl.on_pointer(
            PointerEvent::Move(ScreenPoint::new(-5.0, 0.0)),
            600,
            &mut body,
            &Projector,
        );
        let hold = ctl.charge().map(|c| c.hold_position).unwrap();
        assert_eq!(hold, PlanarVec::from_f32(0.0, 0.2));
    }
}
