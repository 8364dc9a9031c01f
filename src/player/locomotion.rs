//! Turning latched input into a horizontal velocity and an action label.
//!
//! Movement is relative to a flattened facing direction. In third person the
//! facing is from the camera towards the body; in first person it is the
//! camera's own forward. Cardinal and diagonal moves both have length
//! `speed`.

use std::f32::consts::FRAC_1_SQRT_2;

use bevy::math::Vec3;

use super::animation::ActionLabel;
use crate::camera::CameraMode;
use crate::input::{InputFlag, InputState};

/// Horizontal velocity and the label that goes with it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Locomotion {
    /// Y is always zero; vertical motion belongs to physics and jumping.
    pub velocity: Vec3,
    pub action: ActionLabel,
}

impl Locomotion {
    pub const IDLE: Locomotion = Locomotion { velocity: Vec3::ZERO, action: ActionLabel::Idle };
}

/// Flattened, normalized direction the player moves "forward" in.
///
/// Returns `Vec3::ZERO` when the view is vertical and no horizontal
/// direction exists.
#[must_use]
pub fn facing_direction(mode: CameraMode, camera_forward: Vec3, camera_position: Vec3, body_position: Vec3) -> Vec3 {
    let raw = match mode {
        CameraMode::FirstPerson => camera_forward,
        CameraMode::ThirdPerson => body_position - camera_position,
    };
    Vec3::new(raw.x, 0.0, raw.z).normalize_or_zero()
}

/// Right-hand vector for a flattened facing direction.
#[must_use]
pub fn sideways(direction: Vec3) -> Vec3 {
    direction.cross(Vec3::Y)
}

fn exactly(input: &InputState, a: InputFlag, b: InputFlag) -> bool {
    [InputFlag::Forward, InputFlag::Back, InputFlag::Left, InputFlag::Right]
        .into_iter()
        .all(|flag| input.is_held(flag) == (flag == a || flag == b))
}

/// Resolve held movement keys into velocity and label.
///
/// A diagonal label is chosen only when its two keys are the whole held set.
/// Otherwise forward, back, left and right are applied in that order and the
/// last held one wins. No movement keys, or no horizontal facing direction
/// (looking straight up or down), resolves to [`Locomotion::IDLE`].
#[must_use]
pub fn resolve_locomotion(input: &InputState, direction: Vec3, speed: f32) -> Locomotion {
    if direction == Vec3::ZERO {
        return Locomotion::IDLE;
    }
    let side = sideways(direction);
    let diagonal = speed * FRAC_1_SQRT_2;

    if exactly(input, InputFlag::Forward, InputFlag::Left) {
        return Locomotion { velocity: (direction - side) * diagonal, action: ActionLabel::LeftRun };
    }
    if exactly(input, InputFlag::Forward, InputFlag::Right) {
        return Locomotion { velocity: (direction + side) * diagonal, action: ActionLabel::RightRun };
    }
    if exactly(input, InputFlag::Back, InputFlag::Left) {
        return Locomotion { velocity: -(direction + side) * diagonal, action: ActionLabel::LeftBackwards };
    }
    if exactly(input, InputFlag::Back, InputFlag::Right) {
        return Locomotion { velocity: (side - direction) * diagonal, action: ActionLabel::RightBackwards };
    }

    let mut out = Locomotion::IDLE;
    if input.is_held(InputFlag::Forward) {
        out = Locomotion { velocity: direction * speed, action: ActionLabel::Run };
    }
    if input.is_held(InputFlag::Back) {
        out = Locomotion { velocity: -direction * speed, action: ActionLabel::Backwards };
    }
    if input.is_held(InputFlag::Left) {
        out = Locomotion { velocity: -side * speed, action: ActionLabel::Left };
    }
    if input.is_held(InputFlag::Right) {
        out = Locomotion { velocity: side * speed, action: ActionLabel::Right };
    }
    out
}

/// Airborne overrides whatever the keys asked for.
#[must_use]
pub fn grounded_action(action: ActionLabel, grounded: bool) -> ActionLabel {
    if grounded { action } else { ActionLabel::Fall }
}

/// Model yaw that turns `model_forward` onto `direction`.
///
/// `None` for a zero direction.
#[must_use]
pub fn heading_yaw(model_forward: Vec3, direction: Vec3) -> Option<f32> {
    if direction.length_squared() < 1e-12 || model_forward.length_squared() < 1e-12 {
        return None;
    }
    let angle = model_forward.angle_between(direction);
    Some(if direction.x < 0.0 { -angle } else { angle })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(flags: &[InputFlag]) -> InputState {
        let mut state = InputState::default();
        for flag in flags {
            state.set(*flag, true);
        }
        state
    }

    fn horizontal_speed(v: Vec3) -> f32 {
        Vec3::new(v.x, 0.0, v.z).length()
    }

    #[test]
    fn every_key_combination_moves_at_zero_or_full_speed() {
        let dir = Vec3::new(0.6, 0.0, 0.8);
        let flags = [InputFlag::Forward, InputFlag::Back, InputFlag::Left, InputFlag::Right];
        for bits in 0u8..16 {
            let set: Vec<InputFlag> = flags.iter().enumerate().filter(|(i, _)| bits & (1 << i) != 0).map(|(_, f)| *f).collect();
            let loco = resolve_locomotion(&held(&set), dir, 4.0);
            let s = horizontal_speed(loco.velocity);
            assert!(s.abs() < 1e-5 || (s - 4.0).abs() < 1e-4, "{set:?} gave speed {s}");
            assert_eq!(loco.velocity.y, 0.0);
        }
    }

    #[test]
    fn forward_right_is_right_run() {
        let dir = Vec3::Z;
        let loco = resolve_locomotion(&held(&[InputFlag::Forward, InputFlag::Right]), dir, 4.0);
        assert_eq!(loco.action, ActionLabel::RightRun);
        assert!((horizontal_speed(loco.velocity) - 4.0).abs() < 1e-4);
        let expected = (dir + sideways(dir)) * 4.0 * FRAC_1_SQRT_2;
        assert!((loco.velocity - expected).length() < 1e-5);
    }

    #[test]
    fn releasing_one_diagonal_key_falls_back_to_cardinal() {
        let loco = resolve_locomotion(&held(&[InputFlag::Right]), Vec3::Z, 4.0);
        assert_eq!(loco.action, ActionLabel::Right);
        let loco = resolve_locomotion(&held(&[InputFlag::Back]), Vec3::Z, 4.0);
        assert_eq!(loco.action, ActionLabel::Backwards);
    }

    #[test]
    fn backward_diagonals_move_back_and_sideways() {
        let dir = Vec3::Z;
        let side = sideways(dir);
        let loco = resolve_locomotion(&held(&[InputFlag::Back, InputFlag::Left]), dir, 4.0);
        assert_eq!(loco.action, ActionLabel::LeftBackwards);
        assert!(loco.velocity.dot(dir) < 0.0 && loco.velocity.dot(side) < 0.0);
        let loco = resolve_locomotion(&held(&[InputFlag::Back, InputFlag::Right]), dir, 4.0);
        assert_eq!(loco.action, ActionLabel::RightBackwards);
        assert!(loco.velocity.dot(dir) < 0.0 && loco.velocity.dot(side) > 0.0);
    }

    #[test]
    fn three_keys_resolve_to_last_cardinal() {
        let loco = resolve_locomotion(&held(&[InputFlag::Forward, InputFlag::Left, InputFlag::Right]), Vec3::Z, 4.0);
        assert_eq!(loco.action, ActionLabel::Right);
    }

    #[test]
    fn no_keys_is_idle() {
        assert_eq!(resolve_locomotion(&InputState::default(), Vec3::Z, 4.0), Locomotion::IDLE);
        assert_eq!(grounded_action(ActionLabel::Idle, false), ActionLabel::Fall);
        assert_eq!(grounded_action(ActionLabel::Run, true), ActionLabel::Run);
    }

    #[test]
    fn vertical_look_does_not_run_in_place() {
        let dir = facing_direction(CameraMode::FirstPerson, Vec3::NEG_Y, Vec3::ZERO, Vec3::ZERO);
        for keys in [&[InputFlag::Forward][..], &[InputFlag::Back, InputFlag::Right], &[InputFlag::Left]] {
            assert_eq!(resolve_locomotion(&held(keys), dir, 4.0), Locomotion::IDLE);
        }
    }

    #[test]
    fn third_person_faces_from_camera_to_body() {
        let dir = facing_direction(CameraMode::ThirdPerson, Vec3::NEG_Z, Vec3::new(0.0, 2.0, -2.0), Vec3::new(0.0, 0.8, 0.0));
        assert!((dir - Vec3::Z).length() < 1e-6);
        let dir = facing_direction(CameraMode::FirstPerson, Vec3::new(1.0, -0.5, 0.0), Vec3::ZERO, Vec3::ZERO);
        assert!((dir - Vec3::X).length() < 1e-6);
        assert_eq!(facing_direction(CameraMode::FirstPerson, Vec3::NEG_Y, Vec3::ZERO, Vec3::ZERO), Vec3::ZERO);
    }

    #[test]
    fn heading_signs_follow_x() {
        let yaw = heading_yaw(Vec3::Z, Vec3::X).expect("non-zero");
        assert!((yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        let yaw = heading_yaw(Vec3::Z, Vec3::NEG_X).expect("non-zero");
        assert!((yaw + std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert_eq!(heading_yaw(Vec3::Z, Vec3::ZERO), None);
    }
}
