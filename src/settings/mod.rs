//! Settings, types and defaults.
//!
//! Settings are stored as a RON file under `data/settings/` and are hot-reloadable
//! using the RON watcher utilities (see `ron::setup_ron_watcher`). Every field
//! carries a serde default so a partial file only overrides what it names.
use bevy::prelude::{KeyCode, Resource, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod loader;

/// Mouse and keyboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsSettings {
    #[serde(default = "ControlsSettings::default_sensitivity")]
    pub mouse_sensitivity: f32, // Radians of rotation per unit of pointer movement
    #[serde(default = "ControlsSettings::default_spike_range")]
    pub pointer_spike_range: f32, // Pointer deltas larger than this on either axis are dropped
    #[serde(default)]
    pub invert_x: bool,
    #[serde(default)]
    pub invert_y: bool,
    #[serde(default = "ControlsSettings::default_keybinds")]
    pub keybinds: HashMap<String, String>, // Action name -> key identifier
}

impl ControlsSettings {
    fn default_sensitivity() -> f32 { 0.002 }
    fn default_spike_range() -> f32 { 200.0 }

    fn default_keybinds() -> HashMap<String, String> {
        [
            ("forward", "W"),
            ("back", "S"),
            ("left", "A"),
            ("right", "D"),
            ("toggle_perspective", "F"),
            ("jump", "Space"),
            ("release_cursor", "Escape"),
        ]
        .into_iter()
        .map(|(action, key)| (action.to_string(), key.to_string()))
        .collect()
    }
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            mouse_sensitivity: Self::default_sensitivity(),
            pointer_spike_range: Self::default_spike_range(),
            invert_x: false,
            invert_y: false,
            keybinds: Self::default_keybinds(),
        }
    }
}

/// Camera rig placement and orbit limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    #[serde(default = "CameraSettings::default_first_person_offset")]
    pub first_person_offset: [f32; 3], // Eye position relative to the player's feet
    #[serde(default = "CameraSettings::default_third_person_offset")]
    pub third_person_offset: [f32; 3], // Initial orbit position relative to the player's feet
    #[serde(default = "CameraSettings::default_target_offset")]
    pub target_offset: [f32; 3], // Orbit centre / look-at point relative to the player's feet
    #[serde(default = "CameraSettings::default_min_polar_bound")]
    pub min_polar_bound: f32, // Third person: smallest inclination from straight up (radians)
    #[serde(default = "CameraSettings::default_max_polar_bound")]
    pub max_polar_bound: f32, // Third person: largest inclination from straight up (radians)
    #[serde(default)]
    pub min_polar_angle: f32, // First person pitch limit, 0..PI
    #[serde(default = "CameraSettings::default_max_polar_angle")]
    pub max_polar_angle: f32, // First person pitch limit, 0..PI
    #[serde(default = "CameraSettings::default_degenerate_look_min_y")]
    pub degenerate_look_min_y: f32, // Looks steeper than this are flattened when leaving first person
    #[serde(default = "CameraSettings::default_degenerate_look_max_y")]
    pub degenerate_look_max_y: f32,
    #[serde(default = "CameraSettings::default_fov_degrees")]
    pub fov_degrees: f32,
}

impl CameraSettings {
    fn default_first_person_offset() -> [f32; 3] { [0.0, 1.6, 0.0] }
    fn default_third_person_offset() -> [f32; 3] { [0.0, 2.0, -2.0] }
    fn default_target_offset() -> [f32; 3] { [0.0, 1.4, 0.0] }
    fn default_min_polar_bound() -> f32 { 0.1 }
    fn default_max_polar_bound() -> f32 { 2.2 }
    fn default_max_polar_angle() -> f32 { std::f32::consts::PI }
    fn default_degenerate_look_min_y() -> f32 { -0.98 }
    fn default_degenerate_look_max_y() -> f32 { 0.55 }
    fn default_fov_degrees() -> f32 { 75.0 }

    #[must_use]
    pub fn first_person_offset(&self) -> Vec3 { Vec3::from_array(self.first_person_offset) }

    #[must_use]
    pub fn third_person_offset(&self) -> Vec3 { Vec3::from_array(self.third_person_offset) }

    #[must_use]
    pub fn target_offset(&self) -> Vec3 { Vec3::from_array(self.target_offset) }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            first_person_offset: Self::default_first_person_offset(),
            third_person_offset: Self::default_third_person_offset(),
            target_offset: Self::default_target_offset(),
            min_polar_bound: Self::default_min_polar_bound(),
            max_polar_bound: Self::default_max_polar_bound(),
            min_polar_angle: 0.0,
            max_polar_angle: Self::default_max_polar_angle(),
            degenerate_look_min_y: Self::default_degenerate_look_min_y(),
            degenerate_look_max_y: Self::default_degenerate_look_max_y(),
            fov_degrees: Self::default_fov_degrees(),
        }
    }
}

/// Player body and locomotion tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementSettings {
    #[serde(default = "MovementSettings::default_speed")]
    pub speed: f32, // Horizontal speed in world units per second, cardinal or diagonal
    #[serde(default = "MovementSettings::default_jump_speed")]
    pub jump_speed: f32, // Vertical velocity applied on jump
    #[serde(default = "MovementSettings::default_body_half_extents")]
    pub body_half_extents: [f32; 3], // Collider box half size; y is also the feet offset
    #[serde(default = "MovementSettings::default_body_mass")]
    pub body_mass: f32,
    #[serde(default = "MovementSettings::default_model_forward")]
    pub model_forward: [f32; 3], // Direction the unrotated model faces
}

impl MovementSettings {
    fn default_speed() -> f32 { 4.0 }
    fn default_jump_speed() -> f32 { 6.0 }
    fn default_body_half_extents() -> [f32; 3] { [0.125, 0.8, 0.125] }
    fn default_body_mass() -> f32 { 1.0 }
    fn default_model_forward() -> [f32; 3] { [0.0, 0.0, 1.0] }

    #[must_use]
    pub fn body_half_extents(&self) -> Vec3 { Vec3::from_array(self.body_half_extents) }

    #[must_use]
    pub fn model_forward(&self) -> Vec3 { Vec3::from_array(self.model_forward).normalize_or_zero() }
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            speed: Self::default_speed(),
            jump_speed: Self::default_jump_speed(),
            body_half_extents: Self::default_body_half_extents(),
            body_mass: Self::default_body_mass(),
            model_forward: Self::default_model_forward(),
        }
    }
}

/// Ground probe ray, in body-local vertical offsets from the body centre.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    #[serde(default = "ProbeSettings::default_from")]
    pub from_offset: f32,
    #[serde(default = "ProbeSettings::default_to")]
    pub to_offset: f32,
}

impl ProbeSettings {
    fn default_from() -> f32 { -0.7 }
    fn default_to() -> f32 { -1.0 }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self { from_offset: Self::default_from(), to_offset: Self::default_to() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeathSettings {
    #[serde(default = "DeathSettings::default_drown_height")]
    pub drown_height: f32, // Body centre below this height counts as drowning
}

impl DeathSettings {
    fn default_drown_height() -> f32 { -1.0 }
}

impl Default for DeathSettings {
    fn default() -> Self {
        Self { drown_height: Self::default_drown_height() }
    }
}

/// Tuning for the built-in physics world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsSettings {
    #[serde(default = "PhysicsSettings::default_gravity")]
    pub gravity: f32,
    #[serde(default = "PhysicsSettings::default_fixed_timestep")]
    pub fixed_timestep: f32,
    #[serde(default = "PhysicsSettings::default_max_substeps")]
    pub max_substeps: u32, // Upper bound on fixed steps taken per frame
}

impl PhysicsSettings {
    fn default_gravity() -> f32 { -9.81 }
    fn default_fixed_timestep() -> f32 { 1.0 / 60.0 }
    fn default_max_substeps() -> u32 { 10 }
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Self::default_gravity(),
            fixed_timestep: Self::default_fixed_timestep(),
            max_substeps: Self::default_max_substeps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    #[serde(default = "AudioSettings::default_master")]
    pub master_volume: f32,
    #[serde(default = "AudioSettings::default_effects")]
    pub effects_volume: f32,
    #[serde(default = "AudioSettings::default_land")]
    pub land_volume: f32, // Landing thud is quieter than the other cues
    #[serde(default = "AudioSettings::default_ambient")]
    pub ambient_volume: f32, // Looping water ambience
}

impl AudioSettings {
    fn default_master() -> f32 { 1.0 }
    fn default_effects() -> f32 { 0.8 }
    fn default_land() -> f32 { 0.5 }
    fn default_ambient() -> f32 { 0.5 }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_volume: Self::default_master(),
            effects_volume: Self::default_effects(),
            land_volume: Self::default_land(),
            ambient_volume: Self::default_ambient(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSettings {
    #[serde(default = "LevelSettings::default_countdown")]
    pub countdown_seconds: f32, // Time from the player's first move until detonation
}

impl LevelSettings {
    fn default_countdown() -> f32 { 60.0 }
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self { countdown_seconds: Self::default_countdown() }
    }
}

/// Atmosphere settings to configure the `bevy_atmosphere` crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtmosphereSettings {
    #[serde(default = "AtmosphereSettings::default_enabled")]
    pub enabled: bool, // Requires a restart to take effect
    #[serde(default = "AtmosphereSettings::default_resolution")]
    pub resolution: u32, // Resolution of each skybox face (multiple of 8)
    #[serde(default = "AtmosphereSettings::default_dithering")]
    pub dithering: bool,
}

impl AtmosphereSettings {
    fn default_enabled() -> bool { true }
    fn default_resolution() -> u32 { 512 }
    fn default_dithering() -> bool { true }
}

impl Default for AtmosphereSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            resolution: Self::default_resolution(),
            dithering: Self::default_dithering(),
        }
    }
}

/// Top-level Settings
#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub controls: ControlsSettings,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub movement: MovementSettings,
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub death: DeathSettings,
    #[serde(default)]
    pub physics: PhysicsSettings,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub level: LevelSettings,
    #[serde(default)]
    pub atmosphere: AtmosphereSettings,
}

const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("SPACE", KeyCode::Space),
    ("ESC", KeyCode::Escape),
    ("ESCAPE", KeyCode::Escape),
    ("TAB", KeyCode::Tab),
    ("ENTER", KeyCode::Enter),
    ("RETURN", KeyCode::Enter),
    ("BACKSPACE", KeyCode::Backspace),
    ("LEFT", KeyCode::ArrowLeft),
    ("ARROWLEFT", KeyCode::ArrowLeft),
    ("RIGHT", KeyCode::ArrowRight),
    ("ARROWRIGHT", KeyCode::ArrowRight),
    ("UP", KeyCode::ArrowUp),
    ("ARROWUP", KeyCode::ArrowUp),
    ("DOWN", KeyCode::ArrowDown),
    ("ARROWDOWN", KeyCode::ArrowDown),
    ("LSHIFT", KeyCode::ShiftLeft),
    ("SHIFT", KeyCode::ShiftLeft),
    ("RSHIFT", KeyCode::ShiftRight),
    ("LCTRL", KeyCode::ControlLeft),
    ("CTRL", KeyCode::ControlLeft),
    ("RCTRL", KeyCode::ControlRight),
    ("LALT", KeyCode::AltLeft),
    ("ALT", KeyCode::AltLeft),
    ("RALT", KeyCode::AltRight),
    ("F1", KeyCode::F1),
    ("F2", KeyCode::F2),
    ("F3", KeyCode::F3),
    ("F4", KeyCode::F4),
    ("F5", KeyCode::F5),
    ("F6", KeyCode::F6),
    ("F7", KeyCode::F7),
    ("F8", KeyCode::F8),
    ("F9", KeyCode::F9),
    ("F10", KeyCode::F10),
    ("F11", KeyCode::F11),
    ("F12", KeyCode::F12),
];

const LETTER_KEYS: [KeyCode; 26] = [
    KeyCode::KeyA, KeyCode::KeyB, KeyCode::KeyC, KeyCode::KeyD, KeyCode::KeyE,
    KeyCode::KeyF, KeyCode::KeyG, KeyCode::KeyH, KeyCode::KeyI, KeyCode::KeyJ,
    KeyCode::KeyK, KeyCode::KeyL, KeyCode::KeyM, KeyCode::KeyN, KeyCode::KeyO,
    KeyCode::KeyP, KeyCode::KeyQ, KeyCode::KeyR, KeyCode::KeyS, KeyCode::KeyT,
    KeyCode::KeyU, KeyCode::KeyV, KeyCode::KeyW, KeyCode::KeyX, KeyCode::KeyY,
    KeyCode::KeyZ,
];

const DIGIT_KEYS: [KeyCode; 10] = [
    KeyCode::Digit0, KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3, KeyCode::Digit4,
    KeyCode::Digit5, KeyCode::Digit6, KeyCode::Digit7, KeyCode::Digit8, KeyCode::Digit9,
];

impl Settings {
    #[must_use]
    pub fn defaults() -> Self { Settings::default() }

    /// Convert a key identifier from `controls.keybinds` into a `KeyCode`.
    ///
    /// Single letters and digits map to their key, longer names (e.g. "Space",
    /// "Escape", "F1", "LShift") are matched case-insensitively.
    ///
    /// # Returns
    /// `None` when the identifier is not a known key.
    #[must_use]
    pub fn keycode_from_str(name: &str) -> Option<KeyCode> {
        let s = name.trim().to_ascii_uppercase();
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_ascii_uppercase() {
                return Some(LETTER_KEYS[(c as u8 - b'A') as usize]);
            }
            if c.is_ascii_digit() {
                return Some(DIGIT_KEYS[(c as u8 - b'0') as usize]);
            }
        }
        NAMED_KEYS
            .iter()
            .find(|(n, _)| *n == s)
            .map(|(_, k)| *k)
    }

    /// Resolve the key bound to `action`, falling back to `default` when the
    /// binding is missing or names an unknown key.
    #[must_use]
    pub fn key_for(&self, action: &str, default: KeyCode) -> KeyCode {
        self.controls
            .keybinds
            .get(action)
            .and_then(|s| Self::keycode_from_str(s))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keycode_lookup_handles_letters_digits_and_names() {
        assert_eq!(Settings::keycode_from_str("w"), Some(KeyCode::KeyW));
        assert_eq!(Settings::keycode_from_str("F"), Some(KeyCode::KeyF));
        assert_eq!(Settings::keycode_from_str("7"), Some(KeyCode::Digit7));
        assert_eq!(Settings::keycode_from_str("Space"), Some(KeyCode::Space));
        assert_eq!(Settings::keycode_from_str("escape"), Some(KeyCode::Escape));
        assert_eq!(Settings::keycode_from_str("F10"), Some(KeyCode::F10));
        assert_eq!(Settings::keycode_from_str("NotAKey"), None);
        assert_eq!(Settings::keycode_from_str(""), None);
    }

    #[test]
    fn key_for_falls_back_on_unknown_binding() {
        let mut settings = Settings::default();
        assert_eq!(settings.key_for("jump", KeyCode::KeyJ), KeyCode::Space);
        settings.controls.keybinds.insert("jump".into(), "???".into());
        assert_eq!(settings.key_for("jump", KeyCode::KeyJ), KeyCode::KeyJ);
        assert_eq!(settings.key_for("crouch", KeyCode::KeyC), KeyCode::KeyC);
    }

    #[test]
    fn partial_ron_keeps_defaults_for_missing_fields() {
        let parsed: Settings = ron::from_str("(movement: (speed: 7.5))").expect("valid ron");
        assert_eq!(parsed.movement.speed, 7.5);
        assert_eq!(parsed.movement.jump_speed, 6.0);
        assert_eq!(parsed.controls.pointer_spike_range, 200.0);
        assert_eq!(parsed.camera.third_person_offset(), Vec3::new(0.0, 2.0, -2.0));
    }

    #[test]
    fn shipped_settings_file_parses() {
        let text = include_str!("../../data/settings/settings.ron");
        let parsed: Settings = ron::from_str(text).expect("shipped settings parse");
        assert_eq!(parsed.death.drown_height, -1.0);
        assert_eq!(parsed.key_for("toggle_perspective", KeyCode::KeyQ), KeyCode::KeyF);
    }
}
