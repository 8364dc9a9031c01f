//! Bevy systems driving the [`CameraRig`]: mouse look, pointer capture and
//! copying the rig's transform onto the camera entity.

use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::window::{CursorGrabMode, PrimaryWindow};

use super::{CameraRig, PointerLock};
use crate::input::{InputFlag, InputLatch};
use crate::settings::Settings;

/// Feed relative mouse motion into the rig, one sample per event so spike
/// rejection sees individual platform samples.
#[allow(clippy::needless_pass_by_value)]
pub fn camera_look(
    mut motion_events: EventReader<MouseMotion>,
    settings: Res<Settings>,
    mut rigs: Query<&mut CameraRig>,
) {
    let Ok(mut rig) = rigs.get_single_mut() else {
        motion_events.clear();
        return;
    };
    for ev in motion_events.read() {
        let mut delta = ev.delta;
        if settings.controls.invert_x { delta.x = -delta.x; }
        if settings.controls.invert_y { delta.y = -delta.y; }
        rig.apply_pointer_delta(delta.x, delta.y);
    }
}

/// Release pointer capture on the release-cursor key. Works whether or not a
/// player exists, alive or dead.
pub fn release_cursor(mut latch: ResMut<InputLatch>, mut rigs: Query<&mut CameraRig>) {
    if !latch.take(InputFlag::ReleaseCursor) {
        return;
    }
    for mut rig in &mut rigs {
        rig.unlock();
    }
}

/// Reconcile the rig's capture state with the primary window.
///
/// A left click requests capture. The request is applied to the window and
/// checked on the following frame: a window that lost focus or had its grab
/// mode reset in between counts as a refusal, which is reported and leaves
/// the rig released.
///
/// The winit backend only logs a failed grab and leaves `grab_mode` as
/// written, so a refusal that keeps the window focused is not seen here.
#[allow(clippy::needless_pass_by_value)]
pub fn apply_pointer_lock(
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
    mouse: Res<ButtonInput<MouseButton>>,
    mut rigs: Query<&mut CameraRig>,
    mut awaiting_platform: Local<bool>,
) {
    let Ok(mut window) = windows.get_single_mut() else { return };
    let Ok(mut rig) = rigs.get_single_mut() else { return };

    if mouse.just_pressed(MouseButton::Left) {
        rig.lock();
    }

    match rig.pointer_lock() {
        PointerLock::Requested if *awaiting_platform => {
            *awaiting_platform = false;
            let captured = window.cursor.grab_mode == CursorGrabMode::Locked && window.focused;
            if let Err(e) = rig.on_lock_change(captured) {
                warn!("{e}; mouse look stays off until the next click");
                window.cursor.grab_mode = CursorGrabMode::None;
                window.cursor.visible = true;
            }
        }
        PointerLock::Requested => {
            window.cursor.grab_mode = CursorGrabMode::Locked;
            window.cursor.visible = false;
            *awaiting_platform = true;
        }
        PointerLock::Captured => {
            if window.cursor.grab_mode != CursorGrabMode::Locked || !window.focused {
                rig.unlock();
            }
        }
        PointerLock::Released => {
            *awaiting_platform = false;
            if window.cursor.grab_mode != CursorGrabMode::None {
                window.cursor.grab_mode = CursorGrabMode::None;
                window.cursor.visible = true;
            }
        }
    }
}

/// Copy the rig's transform onto its camera entity.
pub fn sync_camera_transform(mut rigs: Query<(&CameraRig, &mut Transform)>) {
    for (rig, mut transform) in &mut rigs {
        *transform = rig.transform;
    }
}

/// Push reloaded camera and mouse tuning into the rig.
#[allow(clippy::needless_pass_by_value)]
pub fn apply_camera_settings(settings: Res<Settings>, mut rigs: Query<&mut CameraRig>) {
    if !settings.is_changed() {
        return;
    }
    for mut rig in &mut rigs {
        rig.apply_settings(&settings.camera, &settings.controls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Keybinds;
    use crate::settings::{CameraSettings, ControlsSettings};
    use bevy::ecs::system::RunSystemOnce;

    fn captured_rig() -> CameraRig {
        let mut rig = CameraRig::from_settings(Vec3::ZERO, &CameraSettings::default(), &ControlsSettings::default());
        rig.lock();
        rig.on_lock_change(true).expect("capture granted");
        rig
    }

    #[test]
    fn release_key_unlocks_without_a_player() {
        let mut world = World::new();
        let mut latch = InputLatch::new(Keybinds::default());
        latch.on_key_down(KeyCode::Escape);
        world.insert_resource(latch);
        let camera = world.spawn(captured_rig()).id();

        world.run_system_once(release_cursor);

        let rig = world.get::<CameraRig>(camera).expect("rig");
        assert_eq!(rig.pointer_lock(), PointerLock::Released);
        assert!(!world.resource::<InputLatch>().is_held(InputFlag::ReleaseCursor));
    }

    #[test]
    fn captured_rig_stays_locked_without_release_key() {
        let mut world = World::new();
        world.insert_resource(InputLatch::new(Keybinds::default()));
        let camera = world.spawn(captured_rig()).id();
        world.run_system_once(release_cursor);
        assert!(world.get::<CameraRig>(camera).expect("rig").is_locked());
    }
}
