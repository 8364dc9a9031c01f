//! Ground detection.
//!
//! A short vertical ray below the body centre decides whether the player is
//! standing on something. Only ground-like colliders are considered, so the
//! ray never hits the player's own body.

use bevy::math::Vec3;

use crate::physics::{CollisionFilter, PhysicsWorld};
use crate::settings::ProbeSettings;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundProbe {
    /// Ray start, relative to the body centre.
    pub from_offset: f32,
    /// Ray end, relative to the body centre.
    pub to_offset: f32,
}

impl Default for GroundProbe {
    fn default() -> Self {
        Self::from_settings(&ProbeSettings::default())
    }
}

impl GroundProbe {
    #[must_use]
    pub fn from_settings(settings: &ProbeSettings) -> Self {
        Self { from_offset: settings.from_offset, to_offset: settings.to_offset }
    }

    #[must_use]
    pub fn segment(&self, body_position: Vec3) -> (Vec3, Vec3) {
        (body_position + Vec3::Y * self.from_offset, body_position + Vec3::Y * self.to_offset)
    }

    /// Cast the probe from `body_position`.
    pub fn is_grounded<W: PhysicsWorld + ?Sized>(&self, world: &W, body_position: Vec3) -> bool {
        let (from, to) = self.segment(body_position);
        world.raycast(from, to, CollisionFilter::GROUND_PROBE)
    }
}

/// Change in contact since the previous probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroundTransition {
    Unchanged,
    Landed,
    LeftGround,
}

/// Remembers last tick's probe result to detect edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroundContact {
    grounded: bool,
}

impl Default for GroundContact {
    /// Starts grounded so spawning on the floor does not count as a landing.
    fn default() -> Self {
        Self { grounded: true }
    }
}

impl GroundContact {
    #[must_use]
    pub fn grounded(&self) -> bool {
        self.grounded
    }

    pub fn update(&mut self, grounded: bool) -> GroundTransition {
        let transition = match (self.grounded, grounded) {
            (false, true) => GroundTransition::Landed,
            (true, false) => GroundTransition::LeftGround,
            _ => GroundTransition::Unchanged,
        };
        self.grounded = grounded;
        transition
    }
}
