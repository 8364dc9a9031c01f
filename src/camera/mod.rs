//! Dual-mode camera rig: third-person orbit and first-person look.
//!
//! The rig keeps its own world transform and the last known target position.
//! It is not parented to the player in the scene graph; the player tick
//! calls [`CameraRig::follow`] after the body has moved, so the player
//! transform is authoritative and the camera is derived from it.
//!
//! In third person the camera sits on a sphere around the orbit centre
//! (`target + target_offset`) and always looks at it. In first person it is
//! pinned to `target + first_person_offset` and orientation is free yaw/pitch.

use bevy::math::EulerRot;
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;
use std::fmt;

use crate::settings::{CameraSettings, ControlsSettings};

pub mod controls;

pub use controls::{apply_camera_settings, apply_pointer_lock, camera_look, release_cursor, sync_camera_transform};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraMode {
    FirstPerson,
    ThirdPerson,
}

/// Pointer capture state. Mouse deltas only count while `Captured`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerLock {
    Released,
    /// Capture asked for, platform has not answered yet.
    Requested,
    Captured,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerLockError {
    /// The platform refused to capture the pointer (e.g. no user gesture).
    Denied,
}

impl fmt::Display for PointerLockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerLockError::Denied => write!(f, "pointer capture was denied by the platform"),
        }
    }
}

impl std::error::Error for PointerLockError {}

/// Spherical coordinates with Y up: `phi` from +Y, `theta` around Y from +Z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    #[must_use]
    pub fn from_vec3(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self { radius, phi: 0.0, theta: 0.0 };
        }
        Self {
            radius,
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
            theta: v.x.atan2(v.z),
        }
    }

    #[must_use]
    pub fn to_vec3(self) -> Vec3 {
        let sin_phi_r = self.phi.sin() * self.radius;
        Vec3::new(sin_phi_r * self.theta.sin(), self.phi.cos() * self.radius, sin_phi_r * self.theta.cos())
    }
}

/// Tunables copied out of settings so a hot reload can swap them in place.
#[derive(Clone, Debug, PartialEq)]
pub struct RigLimits {
    pub sensitivity: f32,
    pub spike_range: f32,
    pub min_polar_bound: f32,
    pub max_polar_bound: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub degenerate_look_min_y: f32,
    pub degenerate_look_max_y: f32,
}

impl RigLimits {
    #[must_use]
    pub fn from_settings(camera: &CameraSettings, controls: &ControlsSettings) -> Self {
        Self {
            sensitivity: controls.mouse_sensitivity,
            spike_range: controls.pointer_spike_range,
            min_polar_bound: camera.min_polar_bound,
            max_polar_bound: camera.max_polar_bound,
            min_polar_angle: camera.min_polar_angle,
            max_polar_angle: camera.max_polar_angle,
            degenerate_look_min_y: camera.degenerate_look_min_y,
            degenerate_look_max_y: camera.degenerate_look_max_y,
        }
    }
}

impl Default for RigLimits {
    fn default() -> Self {
        Self::from_settings(&CameraSettings::default(), &ControlsSettings::default())
    }
}

#[derive(Component, Clone, Debug)]
pub struct CameraRig {
    /// Camera world transform, written to the camera entity every frame.
    pub transform: Transform,
    /// Mouse input is ignored while disabled (after the player dies).
    pub enabled: bool,
    mode: CameraMode,
    first_person_offset: Vec3,
    third_person_offset: Vec3,
    target_offset: Vec3,
    target: Vec3,
    lock: PointerLock,
    limits: RigLimits,
}

impl CameraRig {
    /// Place the camera in third person at `target + third_person_offset`,
    /// looking at the orbit centre.
    #[must_use]
    pub fn initialize(
        target: Vec3,
        first_person_offset: Vec3,
        third_person_offset: Vec3,
        target_offset: Vec3,
        limits: RigLimits,
    ) -> Self {
        let mut transform = Transform::from_translation(target + third_person_offset);
        transform.look_at(target + target_offset, Dir3::Y);
        Self {
            transform,
            enabled: true,
            mode: CameraMode::ThirdPerson,
            first_person_offset,
            third_person_offset,
            target_offset,
            target,
            lock: PointerLock::Released,
            limits,
        }
    }

    #[must_use]
    pub fn from_settings(target: Vec3, camera: &CameraSettings, controls: &ControlsSettings) -> Self {
        Self::initialize(
            target,
            camera.first_person_offset(),
            camera.third_person_offset(),
            camera.target_offset(),
            RigLimits::from_settings(camera, controls),
        )
    }

    /// Swap in new tunables and re-place the camera against the new offsets.
    ///
    /// Third person keeps the viewing direction and moves onto the new orbit
    /// sphere; first person snaps to the new eye offset.
    pub fn apply_settings(&mut self, camera: &CameraSettings, controls: &ControlsSettings) {
        let forward = self.forward();
        self.first_person_offset = camera.first_person_offset();
        self.third_person_offset = camera.third_person_offset();
        self.target_offset = camera.target_offset();
        self.limits = RigLimits::from_settings(camera, controls);
        match self.mode {
            CameraMode::ThirdPerson => {
                let center = self.orbit_center();
                self.transform.translation = center - forward * self.orbit_radius();
                self.transform.look_at(center, Dir3::Y);
            }
            CameraMode::FirstPerson => self.transform.translation = self.target + self.first_person_offset,
        }
    }

    #[must_use]
    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    #[must_use]
    pub fn orbit_center(&self) -> Vec3 {
        self.target + self.target_offset
    }

    /// Distance kept from the orbit centre in third person.
    #[must_use]
    pub fn orbit_radius(&self) -> f32 {
        (self.third_person_offset - self.target_offset).length()
    }

    /// Viewing direction (camera -Z) in world space.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.transform.rotation * Vec3::NEG_Z
    }

    /// Current polar angle of the camera around the orbit centre.
    #[must_use]
    pub fn polar_angle(&self) -> f32 {
        Spherical::from_vec3(self.transform.translation - self.orbit_center()).phi
    }

    #[must_use]
    pub fn pointer_lock(&self) -> PointerLock {
        self.lock
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock == PointerLock::Captured
    }

    /// Ask for exclusive pointer capture. Ignored while the rig is disabled.
    pub fn lock(&mut self) {
        if self.enabled && self.lock == PointerLock::Released {
            self.lock = PointerLock::Requested;
        }
    }

    /// Release pointer capture. Always safe, takes effect immediately.
    pub fn unlock(&mut self) {
        self.lock = PointerLock::Released;
    }

    /// Report the platform's capture state back to the rig.
    ///
    /// # Errors
    /// [`PointerLockError::Denied`] when a pending request ended without
    /// capture. The rig is left released; a later [`CameraRig::lock`] retries.
    pub fn on_lock_change(&mut self, captured: bool) -> Result<(), PointerLockError> {
        if captured {
            self.lock = PointerLock::Captured;
            return Ok(());
        }
        let was_requested = self.lock == PointerLock::Requested;
        self.lock = PointerLock::Released;
        if was_requested { Err(PointerLockError::Denied) } else { Ok(()) }
    }

    /// Rotate the camera by a relative pointer movement.
    ///
    /// Returns `false` when the sample was ignored: rig disabled, pointer not
    /// captured, or a spike larger than the configured range on either axis.
    pub fn apply_pointer_delta(&mut self, dx: f32, dy: f32) -> bool {
        if !self.enabled || !self.is_locked() {
            return false;
        }
        let range = self.limits.spike_range;
        if dx.abs() > range || dy.abs() > range {
            debug!("dropping pointer spike ({dx}, {dy})");
            return false;
        }

        match self.mode {
            CameraMode::ThirdPerson => self.orbit(dx, dy),
            CameraMode::FirstPerson => self.look(dx, dy),
        }
        true
    }

    fn orbit(&mut self, dx: f32, dy: f32) {
        let k = self.limits.sensitivity;
        let (min_phi, max_phi) = (self.limits.min_polar_bound, self.limits.max_polar_bound);
        let center = self.orbit_center();

        let mut polar = Spherical::from_vec3(self.transform.translation - center);
        polar.theta -= dx * k;
        polar.phi -= dy * k;
        if polar.phi < min_phi || polar.phi > max_phi {
            // bounce: undo the vertical step that crossed the bound
            polar.phi += dy * k;
        }
        polar.phi = polar.phi.clamp(min_phi, max_phi);

        self.transform.translation = center + polar.to_vec3();
        self.transform.look_at(center, Dir3::Y);
    }

    fn look(&mut self, dx: f32, dy: f32) {
        let k = self.limits.sensitivity;
        let (mut yaw, mut pitch, _) = self.transform.rotation.to_euler(EulerRot::YXZ);
        yaw -= dx * k;
        pitch -= dy * k;
        pitch = pitch.clamp(FRAC_PI_2 - self.limits.max_polar_angle, FRAC_PI_2 - self.limits.min_polar_angle);
        self.transform.rotation = Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0);
    }

    /// Switch between first and third person without a visual pop.
    ///
    /// Third to first moves the eye onto the target and keeps the current
    /// orientation. First to third keeps the viewing direction: the camera
    /// backs away from the orbit centre along the look vector by the orbit
    /// radius, after flattening looks that are too steep to orbit from.
    pub fn toggle_perspective(&mut self) {
        match self.mode {
            CameraMode::ThirdPerson => {
                self.transform.translation = self.target + self.first_person_offset;
                self.mode = CameraMode::FirstPerson;
            }
            CameraMode::FirstPerson => {
                let dir = self.safe_orbit_direction();
                let center = self.orbit_center();
                self.transform.translation = center - dir * self.orbit_radius();
                self.transform.look_at(center, Dir3::Y);
                self.mode = CameraMode::ThirdPerson;
            }
        }
        info!("perspective changed to {:?}", self.mode);
    }

    fn safe_orbit_direction(&self) -> Vec3 {
        let forward = self.forward();
        if forward.y >= self.limits.degenerate_look_min_y && forward.y <= self.limits.degenerate_look_max_y {
            return forward.normalize();
        }
        debug!("flattening steep look {forward:?} for third person placement");
        let flat = Vec3::new(forward.x, 0.0, forward.z);
        if let Some(dir) = flat.try_normalize() {
            return dir;
        }
        // straight up or down: the camera's up vector points along the horizon
        let up = self.transform.rotation * Vec3::Y;
        let fallback = up * -forward.y.signum();
        Vec3::new(fallback.x, 0.0, fallback.z).try_normalize().unwrap_or(Vec3::NEG_Z)
    }

    /// Track the target's new position.
    pub fn follow(&mut self, target: Vec3) {
        let delta = target - self.target;
        self.target = target;
        match self.mode {
            CameraMode::ThirdPerson => self.transform.translation += delta,
            CameraMode::FirstPerson => self.transform.translation = target + self.first_person_offset,
        }
    }
}
