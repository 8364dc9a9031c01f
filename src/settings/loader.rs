//! Settings loading and hot-reloading.
//!
//! Settings are loaded from RON files in the `data/settings` directory. If multiple
//! RON files are present, the first successfully parsed `Settings` is used; if none
//! parse, defaults are used. A filesystem watcher flags edits so the running game
//! picks up new tuning without a restart.
use crate::ron_loader::{load_ron_files, setup_ron_watcher};
use crate::settings::Settings;
use bevy::prelude::{info, warn, Res, ResMut, Resource};

/// Default location of the settings directory, relative to the working directory.
pub const SETTINGS_DIR: &str = "data/settings";

#[derive(Resource)]
pub struct SettingsWatcher {
    pub watcher: crate::ron::RonWatcher,
    pub dir: String,
}

/// Load settings from `path` (directory). If multiple `.ron` files are present
/// the first parsed `Settings` will be used. If none exist the `Default` is used.
///
/// # Example
/// ```ignore
/// let settings = load_settings_from_dir("data/settings");
/// ```
#[must_use]
pub fn load_settings_from_dir(path: &str) -> Settings {
    let items: Vec<Settings> = load_ron_files(path);
    items.into_iter().next().unwrap_or_else(Settings::defaults)
}

/// Create a watcher for the settings directory.
///
/// # Errors
/// Returns the `notify::Error` raised when the OS watcher cannot be created
/// or registered for `path`. Callers usually fall back to [`SettingsWatcher::stub`].
pub fn setup_settings_watcher(path: &str) -> Result<SettingsWatcher, notify::Error> {
    setup_ron_watcher(path).map(|watcher| SettingsWatcher { watcher, dir: path.to_string() })
}

/// Reload the `Settings` resource when the watcher reports a change.
#[allow(clippy::needless_pass_by_value)]
pub fn check_settings_changes(watcher: Res<SettingsWatcher>, mut settings: ResMut<Settings>) {
    let mut flag = match watcher.watcher.changed.lock() {
        Ok(flag) => flag,
        Err(poisoned) => {
            warn!("settings watcher mutex poisoned, recovering");
            poisoned.into_inner()
        }
    };
    if *flag {
        info!("settings changed, reloading from {}", watcher.dir);
        *settings = load_settings_from_dir(&watcher.dir);
        *flag = false;
    }
}

impl SettingsWatcher {
    #[must_use]
    pub fn stub() -> Self {
        SettingsWatcher { watcher: crate::ron::RonWatcher::stub(), dir: SETTINGS_DIR.to_string() }
    }
}
