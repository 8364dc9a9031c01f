//! Sky settings sync for `bevy_atmosphere`.
use bevy::prelude::*;
use bevy_atmosphere::prelude::AtmosphereSettings as BevyAtmosphereSettings;
use disarm::settings::Settings;

/// Push reloaded `Settings.atmosphere` values into the running sky.
///
/// `enabled` only takes effect on restart since the plugin is added at
/// startup.
///
/// # Arguments
/// - `settings`: The current settings resource.
/// - `last`: The last applied `(resolution, dithering)` pair, to skip redundant updates.
/// - `sky`: The plugin's settings resource.
#[allow(clippy::needless_pass_by_value)]
pub fn sync_atmosphere_settings(
    settings: Res<Settings>,
    mut last: Local<Option<(u32, bool)>>,
    mut sky: ResMut<BevyAtmosphereSettings>,
) {
    let wanted = (settings.atmosphere.resolution, settings.atmosphere.dithering);
    if *last == Some(wanted) {
        return;
    }
    sky.resolution = wanted.0;
    sky.dithering = wanted.1;
    *last = Some(wanted);
}
