//! Flick plugin: mouse input to figure impulses.
//!
//! The rules-side [`FlickController`] owns the gesture logic; this module
//! adapts rapier bodies and the 3D camera to the controller's
//! [`PhysicsBody`] and [`GroundProjector`] seams and keeps the controller in
//! step with the match phase and the camera mode.

use bevy::prelude::*;
use bevy::window::CursorLeft;
use bevy_rapier3d::prelude::{ExternalImpulse, Velocity};
use subbuteo_core::config::RulesConfig;
use subbuteo_core::flick::{
    FlickController, FlickResponse, FlickSignal, GroundProjector, PhysicsBody, PointerEvent,
    ScreenPoint,
};
use subbuteo_core::math::{Fixed, PlanarVec};

use crate::camera::{CameraMode, MainCamera};
use crate::components::{Ball, ControlledFigure, Figure};
use crate::match_flow::{now_ms, MatchFlowSet, MatchState};
use crate::pitch::PitchDimensions;
use crate::GameRules;

/// Plugin for the flick controller.
///
/// Provides:
/// - [`FlickInput`] resource synced with the match phase and camera mode
/// - [`FlickPointer`] events applied to the chosen figure
/// - [`FlickSignalFired`] events for UI and audio hooks
pub struct FlickPlugin;

impl Plugin for FlickPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FlickInput>()
            .init_resource::<CameraMode>()
            .add_event::<FlickPointer>()
            .add_event::<FlickSignalFired>()
            .add_systems(
                Update,
                (
                    sync_flick_controller,
                    flick_frame,
                    apply_flick_pointer,
                    forward_flick_signals,
                )
                    .chain()
                    .after(MatchFlowSet::Publish),
            );
    }
}

/// Reads the mouse and emits [`FlickPointer`] events.
pub struct PointerInputPlugin;

impl Plugin for PointerInputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, read_mouse_pointer.before(apply_flick_pointer));
    }
}

/// Flick controller plus the figure it is currently aimed at.
#[derive(Resource, Debug)]
pub struct FlickInput {
    /// Rules-side gesture controller.
    pub controller: FlickController,
    /// Figure picked on the last press, if any.
    pub active: Option<Entity>,
    /// Last response, for the HUD.
    pub last_response: Option<FlickResponse>,
}

impl FlickInput {
    /// Controller tuned from `config`.
    #[must_use]
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            controller: FlickController::new(config),
            active: None,
            last_response: None,
        }
    }
}

impl FromWorld for FlickInput {
    fn from_world(world: &mut World) -> Self {
        let config = world
            .get_resource::<GameRules>()
            .map(|rules| rules.0.clone())
            .unwrap_or_default();
        Self::new(&config)
    }
}

/// A pointer event with its ground projection already resolved.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct FlickPointer {
    /// Raw pointer event.
    pub event: PointerEvent,
    /// Pitch point under the pointer, `None` off the table.
    pub ground: Option<PlanarVec>,
}

/// A controller signal, republished for Bevy systems.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlickSignalFired(pub FlickSignal);

/// Rigid body view over rapier components.
///
/// Impulses accumulate in [`RapierBody::impulse`] and are written back to
/// the entity's [`ExternalImpulse`] by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RapierBody {
    /// World translation.
    pub translation: Vec3,
    /// Linear velocity.
    pub linvel: Vec3,
    /// Impulse applied through [`PhysicsBody::apply_impulse`].
    pub impulse: Vec3,
}

impl RapierBody {
    /// Snapshot of a body's transform and velocity.
    #[must_use]
    pub fn new(transform: &Transform, velocity: &Velocity) -> Self {
        Self {
            translation: transform.translation,
            linvel: velocity.linvel,
            impulse: Vec3::ZERO,
        }
    }
}

impl PhysicsBody for RapierBody {
    fn position(&self) -> PlanarVec {
        PlanarVec::from_f32(self.translation.x, self.translation.z)
    }

    fn planar_velocity(&self) -> PlanarVec {
        PlanarVec::from_f32(self.linvel.x, self.linvel.z)
    }

    fn apply_impulse(&mut self, impulse: PlanarVec) {
        let (x, z) = impulse.to_f32();
        self.impulse += Vec3::new(x, 0.0, z);
    }
}

/// Projector that returns a point resolved earlier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected(pub Option<PlanarVec>);

impl GroundProjector for Projected {
    fn project_to_ground(&self, _point: ScreenPoint) -> Option<PlanarVec> {
        self.0
    }
}

/// Casts camera rays onto the table surface.
pub struct CameraProjector<'a> {
    /// Camera to cast from.
    pub camera: &'a Camera,
    /// Camera placement.
    pub transform: &'a GlobalTransform,
    /// Bounds of the playing surface.
    pub pitch: PitchDimensions,
}

impl GroundProjector for CameraProjector<'_> {
    fn project_to_ground(&self, point: ScreenPoint) -> Option<PlanarVec> {
        let ray = self
            .camera
            .viewport_to_world(self.transform, Vec2::new(point.x, point.y))?;
        let distance = ray.intersect_plane(Vec3::ZERO, InfinitePlane3d::new(Vec3::Y))?;
        let hit = ray.get_point(distance);
        self.pitch
            .contains(hit.x, hit.z)
            .then(|| PlanarVec::from_f32(hit.x, hit.z))
    }
}

/// Nearest figure whose activation ring contains `ground`, falling back to
/// the nearest figure overall so the controller can report the miss.
#[must_use]
pub fn pick_figure(
    ground: PlanarVec,
    candidates: impl IntoIterator<Item = (Entity, PlanarVec)>,
    inner: Fixed,
    outer: Fixed,
) -> Option<Entity> {
    let (inner_sq, outer_sq) = (inner * inner, outer * outer);
    let mut nearest: Option<(Entity, Fixed)> = None;
    let mut in_ring: Option<(Entity, Fixed)> = None;

    for (entity, position) in candidates {
        let d = ground.distance_squared(position);
        if nearest.map_or(true, |(_, best)| d < best) {
            nearest = Some((entity, d));
        }
        if d >= inner_sq && d <= outer_sq && in_ring.map_or(true, |(_, best)| d < best) {
            in_ring = Some((entity, d));
        }
    }

    in_ring.or(nearest).map(|(entity, _)| entity)
}

/// Keeps the controller in step with the phase and camera mode.
pub fn sync_flick_controller(
    state: Res<MatchState>,
    mode: Res<CameraMode>,
    mut input: ResMut<FlickInput>,
) {
    let phase = state.session.phase();
    if input.controller.is_enabled() != phase.allows_flick() {
        input.controller.sync_phase(phase);
    }
    if input.controller.manual_camera() != mode.manual {
        input.controller.set_manual_camera(mode.manual);
    }
    if !input.controller.is_charging() {
        input.active = None;
    }
}

/// Advances the charge clock and samples motion of play.
///
/// The watched figure is the one being charged, or else the fastest figure
/// on the table.
pub fn flick_frame(
    time: Res<Time>,
    mut input: ResMut<FlickInput>,
    figures: Query<(Entity, &Transform, &Velocity), With<Figure>>,
    balls: Query<(&Transform, &Velocity), With<Ball>>,
) {
    let now = now_ms(&time);

    let watched = input
        .active
        .and_then(|entity| figures.get(entity).ok())
        .or_else(|| {
            figures.iter().max_by(|(_, _, a), (_, _, b)| {
                a.linvel.length_squared().total_cmp(&b.linvel.length_squared())
            })
        })
        .map(|(_, transform, velocity)| RapierBody::new(transform, velocity))
        .unwrap_or_default();
    let ball = balls
        .get_single()
        .map(|(transform, velocity)| RapierBody::new(transform, velocity))
        .unwrap_or_default();

    input.controller.on_frame(now, &watched, &ball);
}

/// Applies pointer events to the figure picked on press.
pub fn apply_flick_pointer(
    mut commands: Commands,
    time: Res<Time>,
    state: Res<MatchState>,
    mut pointer: EventReader<FlickPointer>,
    mut input: ResMut<FlickInput>,
    mut figures: Query<(Entity, &Figure, &Transform, &Velocity, &mut ExternalImpulse)>,
) {
    let now = now_ms(&time);
    let team = state.session.current_team();

    for FlickPointer { event, ground } in pointer.read().copied() {
        if let (PointerEvent::Down(_), Some(point)) = (event, ground) {
            if !input.controller.is_charging() {
                let tuning = *input.controller.tuning();
                let candidates = figures
                    .iter()
                    .filter(|(_, figure, ..)| figure.team == team)
                    .map(|(entity, _, transform, ..)| {
                        (entity, PlanarVec::from_f32(transform.translation.x, transform.translation.z))
                    });
                input.active =
                    pick_figure(point, candidates, tuning.inner_radius, tuning.outer_radius);
            }
        }

        let target = input.active.and_then(|entity| figures.get_mut(entity).ok());
        let response = match target {
            Some((entity, _, transform, velocity, mut external)) => {
                let mut body = RapierBody::new(transform, velocity);
                let response =
                    input
                        .controller
                        .on_pointer(event, now, &mut body, &Projected(ground));
                if body.impulse != Vec3::ZERO {
                    external.impulse += body.impulse;
                }
                match response {
                    FlickResponse::ChargeStarted => {
                        commands.entity(entity).insert(ControlledFigure);
                    }
                    FlickResponse::Charging { .. } => {}
                    _ => {
                        commands.entity(entity).remove::<ControlledFigure>();
                    }
                }
                response
            }
            None => {
                // Nobody to flick; the controller still reports why.
                let mut idle = RapierBody::default();
                input
                    .controller
                    .on_pointer(event, now, &mut idle, &Projected(ground))
            }
        };

        if !input.controller.is_charging() {
            input.active = None;
        }
        input.last_response = Some(response);
    }
}

/// Republishes controller signals as [`FlickSignalFired`] events.
pub fn forward_flick_signals(
    mut input: ResMut<FlickInput>,
    mut signals: EventWriter<FlickSignalFired>,
) {
    for signal in input.controller.drain_signals() {
        if let FlickSignal::Flicked { power, .. } = signal {
            tracing::info!(power = %power, "Flick");
        }
        signals.send(FlickSignalFired(signal));
    }
}

fn read_mouse_pointer(
    mouse: Res<ButtonInput<MouseButton>>,
    mut cursor_moved: EventReader<CursorMoved>,
    mut cursor_left: EventReader<CursorLeft>,
    windows: Query<&Window>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    pitch: Res<PitchDimensions>,
    input: Res<FlickInput>,
    mut pointer: EventWriter<FlickPointer>,
) {
    let left = cursor_left.read().count() > 0;
    let moved = cursor_moved.read().count() > 0;

    let Ok(window) = windows.get_single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.get_single() else {
        return;
    };
    let projector = CameraProjector {
        camera,
        transform: camera_transform,
        pitch: *pitch,
    };

    if left {
        pointer.send(FlickPointer {
            event: PointerEvent::Leave,
            ground: None,
        });
        return;
    }

    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let point = ScreenPoint::new(cursor.x, cursor.y);
    let ground = projector.project_to_ground(point);

    if mouse.just_pressed(MouseButton::Left) {
        pointer.send(FlickPointer {
            event: PointerEvent::Down(point),
            ground,
        });
    }
    if moved && input.controller.is_charging() {
        pointer.send(FlickPointer {
            event: PointerEvent::Move(point),
            ground,
        });
    }
    if mouse.just_released(MouseButton::Left) {
        pointer.send(FlickPointer {
            event: PointerEvent::Up(point),
            ground,
        });
    }
}
