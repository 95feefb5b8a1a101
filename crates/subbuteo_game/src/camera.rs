//! Camera plugin for the table-top view.
//!
//! The camera sits over the pitch looking down at an angle. Pressing C
//! switches to manual mode, where WASD/arrow keys pan and the mouse wheel
//! zooms; flicks are refused while manual mode is on.

use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;

/// Plugin for the pitch camera.
///
/// Provides:
/// - Spawning the main 3D camera and lighting
/// - C to toggle manual camera mode
/// - WASD/Arrow key panning and mouse wheel zoom in manual mode
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .init_resource::<CameraMode>()
            .add_systems(Startup, spawn_camera)
            .add_systems(
                Update,
                (
                    toggle_camera_mode,
                    (camera_keyboard_pan, camera_mouse_zoom).run_if(manual_camera),
                )
                    .chain(),
            );
    }
}

/// Settings for camera behavior.
#[derive(Resource, Debug, Clone, Copy)]
pub struct CameraSettings {
    /// Pan speed in world units per second.
    pub pan_speed: f32,
    /// Height change per wheel notch.
    pub zoom_step: f32,
    /// Lowest camera height.
    pub min_height: f32,
    /// Highest camera height.
    pub max_height: f32,
    /// Default camera placement.
    pub home: Vec3,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            pan_speed: 0.6,
            zoom_step: 0.05,
            min_height: 0.25,
            max_height: 2.0,
            home: Vec3::new(0.0, 1.0, 0.75),
        }
    }
}

/// Whether the player is steering the camera instead of flicking.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraMode {
    /// Manual camera control is active.
    pub manual: bool,
}

/// Marker component for the main game camera.
#[derive(Component)]
pub struct MainCamera;

fn manual_camera(mode: Res<CameraMode>) -> bool {
    mode.manual
}

/// Spawns the main camera and a key light.
fn spawn_camera(mut commands: Commands, settings: Res<CameraSettings>) {
    commands.spawn((
        Camera3dBundle {
            transform: Transform::from_translation(settings.home).looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        },
        MainCamera,
    ));

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(0.4, 1.5, 0.3).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });
}

/// Toggles manual camera mode; leaving it snaps back to the default view.
fn toggle_camera_mode(
    keyboard: Res<ButtonInput<KeyCode>>,
    settings: Res<CameraSettings>,
    mut mode: ResMut<CameraMode>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyC) {
        return;
    }
    mode.manual = !mode.manual;
    tracing::info!(manual = mode.manual, "Camera mode changed");

    if !mode.manual {
        if let Ok(mut transform) = camera_query.get_single_mut() {
            *transform =
                Transform::from_translation(settings.home).looking_at(Vec3::ZERO, Vec3::Y);
        }
    }
}

/// Handles keyboard-based camera panning over the pitch plane.
fn camera_keyboard_pan(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    settings: Res<CameraSettings>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    let Ok(mut transform) = camera_query.get_single_mut() else {
        return;
    };

    let mut direction = Vec2::ZERO;

    if keyboard.pressed(KeyCode::KeyA) || keyboard.pressed(KeyCode::ArrowLeft) {
        direction.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) || keyboard.pressed(KeyCode::ArrowRight) {
        direction.x += 1.0;
    }
    // Screen up is towards -z on the pitch
    if keyboard.pressed(KeyCode::KeyW) || keyboard.pressed(KeyCode::ArrowUp) {
        direction.y -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) || keyboard.pressed(KeyCode::ArrowDown) {
        direction.y += 1.0;
    }

    if direction != Vec2::ZERO {
        direction = direction.normalize();
    }

    let delta = direction * settings.pan_speed * time.delta_seconds();
    transform.translation.x += delta.x;
    transform.translation.z += delta.y;
}

/// Handles mouse wheel zoom by raising and lowering the camera.
fn camera_mouse_zoom(
    mut scroll_events: EventReader<MouseWheel>,
    settings: Res<CameraSettings>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    let Ok(mut transform) = camera_query.get_single_mut() else {
        return;
    };

    for event in scroll_events.read() {
        let height = (transform.translation.y - event.y * settings.zoom_step)
            .clamp(settings.min_height, settings.max_height);
        transform.translation.y = height;
    }
}
