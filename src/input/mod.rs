//! Input latch: turns key press/release edges into persistent named flags.
//!
//! The latch is fed by an explicit system (`latch_keyboard_input`) rather than
//! global listeners, so the player logic can be driven by hand in tests.
//! Held actions (movement, jump) stay set until their key is released. The
//! perspective toggle is one-shot: the consumer clears it with
//! [`InputLatch::take`] after acting on it, so holding the key switches once.

use bevy::prelude::*;

use crate::settings::Settings;

/// Named actions tracked by the latch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputFlag {
    Forward,
    Back,
    Left,
    Right,
    TogglePerspective,
    Jump,
    ReleaseCursor,
}

impl InputFlag {
    pub const ALL: [InputFlag; 7] = [
        InputFlag::Forward,
        InputFlag::Back,
        InputFlag::Left,
        InputFlag::Right,
        InputFlag::TogglePerspective,
        InputFlag::Jump,
        InputFlag::ReleaseCursor,
    ];

    /// Keybind action name used in `controls.keybinds`.
    #[must_use]
    pub fn action_name(self) -> &'static str {
        match self {
            InputFlag::Forward => "forward",
            InputFlag::Back => "back",
            InputFlag::Left => "left",
            InputFlag::Right => "right",
            InputFlag::TogglePerspective => "toggle_perspective",
            InputFlag::Jump => "jump",
            InputFlag::ReleaseCursor => "release_cursor",
        }
    }

    #[must_use]
    pub fn default_key(self) -> KeyCode {
        match self {
            InputFlag::Forward => KeyCode::KeyW,
            InputFlag::Back => KeyCode::KeyS,
            InputFlag::Left => KeyCode::KeyA,
            InputFlag::Right => KeyCode::KeyD,
            InputFlag::TogglePerspective => KeyCode::KeyF,
            InputFlag::Jump => KeyCode::Space,
            InputFlag::ReleaseCursor => KeyCode::Escape,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Key code to action mapping, resolved from settings.
#[derive(Debug, Clone)]
pub struct Keybinds {
    keys: [KeyCode; 7],
}

impl Default for Keybinds {
    fn default() -> Self {
        Self { keys: InputFlag::ALL.map(InputFlag::default_key) }
    }
}

impl Keybinds {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self { keys: InputFlag::ALL.map(|flag| settings.key_for(flag.action_name(), flag.default_key())) }
    }

    #[must_use]
    pub fn key(&self, flag: InputFlag) -> KeyCode {
        self.keys[flag.index()]
    }

    /// First action bound to `code`, if any.
    #[must_use]
    pub fn flag_for(&self, code: KeyCode) -> Option<InputFlag> {
        InputFlag::ALL.into_iter().find(|flag| self.keys[flag.index()] == code)
    }
}

/// Snapshot of every latched flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    flags: [bool; 7],
}

impl InputState {
    #[must_use]
    pub fn is_held(&self, flag: InputFlag) -> bool {
        self.flags[flag.index()]
    }

    /// True when any of forward/back/left/right is held.
    #[must_use]
    pub fn any_movement(&self) -> bool {
        [InputFlag::Forward, InputFlag::Back, InputFlag::Left, InputFlag::Right]
            .into_iter()
            .any(|flag| self.is_held(flag))
    }

    pub(crate) fn set(&mut self, flag: InputFlag, value: bool) {
        self.flags[flag.index()] = value;
    }
}

/// Process-wide input latch resource.
#[derive(Resource, Debug, Clone, Default)]
pub struct InputLatch {
    binds: Keybinds,
    state: InputState,
}

impl InputLatch {
    #[must_use]
    pub fn new(binds: Keybinds) -> Self {
        Self { binds, state: InputState::default() }
    }

    pub fn set_keybinds(&mut self, binds: Keybinds) {
        self.binds = binds;
    }

    #[must_use]
    pub fn keybinds(&self) -> &Keybinds {
        &self.binds
    }

    /// Set the flag bound to `code`. Unmapped codes are ignored.
    pub fn on_key_down(&mut self, code: KeyCode) {
        if let Some(flag) = self.binds.flag_for(code) {
            self.state.set(flag, true);
        }
    }

    /// Clear the flag bound to `code`. Unmapped codes are ignored.
    pub fn on_key_up(&mut self, code: KeyCode) {
        if let Some(flag) = self.binds.flag_for(code) {
            self.state.set(flag, false);
        }
    }

    #[must_use]
    pub fn is_held(&self, flag: InputFlag) -> bool {
        self.state.is_held(flag)
    }

    /// Read a flag and clear it. Used for one-shot actions.
    pub fn take(&mut self, flag: InputFlag) -> bool {
        let was_set = self.state.is_held(flag);
        self.state.set(flag, false);
        was_set
    }

    #[must_use]
    pub fn state(&self) -> InputState {
        self.state
    }
}

/// Feed this frame's key edges into the latch.
#[allow(clippy::needless_pass_by_value)]
pub fn latch_keyboard_input(keys: Res<ButtonInput<KeyCode>>, mut latch: ResMut<InputLatch>) {
    for code in keys.get_just_pressed() {
        latch.on_key_down(*code);
    }
    for code in keys.get_just_released() {
        latch.on_key_up(*code);
    }
}

/// Rebuild the latch's keybinds after a settings reload.
#[allow(clippy::needless_pass_by_value)]
pub fn sync_keybinds(settings: Res<Settings>, mut latch: ResMut<InputLatch>) {
    if settings.is_changed() {
        latch.set_keybinds(Keybinds::from_settings(&settings));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_down_and_up_toggle_the_mapped_flag() {
        let mut latch = InputLatch::default();
        latch.on_key_down(KeyCode::KeyW);
        assert!(latch.is_held(InputFlag::Forward));
        assert!(latch.state().any_movement());
        latch.on_key_up(KeyCode::KeyW);
        assert!(!latch.is_held(InputFlag::Forward));
        assert!(!latch.state().any_movement());
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut latch = InputLatch::default();
        latch.on_key_down(KeyCode::KeyZ);
        assert_eq!(latch.state(), InputState::default());
    }

    #[test]
    fn take_clears_one_shot_flag() {
        let mut latch = InputLatch::default();
        latch.on_key_down(KeyCode::KeyF);
        assert!(latch.take(InputFlag::TogglePerspective));
        // key still physically held, but no new edge arrived
        assert!(!latch.take(InputFlag::TogglePerspective));
    }

    #[test]
    fn rebinding_follows_settings() {
        let mut settings = Settings::default();
        settings.controls.keybinds.insert("jump".into(), "J".into());
        let mut latch = InputLatch::new(Keybinds::from_settings(&settings));
        latch.on_key_down(KeyCode::Space);
        assert!(!latch.is_held(InputFlag::Jump));
        latch.on_key_down(KeyCode::KeyJ);
        assert!(latch.is_held(InputFlag::Jump));
    }
}
