use bevy::diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin};
use bevy::prelude::*;
use bevy::window::{PresentMode, Window, WindowPlugin};
use bevy_atmosphere::prelude::*;
use disarm::camera::{apply_camera_settings, apply_pointer_lock, camera_look, release_cursor, sync_camera_transform};
use disarm::input::{latch_keyboard_input, sync_keybinds, InputLatch, Keybinds};
use disarm::level::{level_tick, sync_nuke_transform, Countdown, LevelEvent};
use disarm::physics::{apply_physics_settings, step_physics, RapierWorld};
use disarm::player::{apply_player_settings, player_tick, sync_player_model, PlayerEvent};
use disarm::settings::loader as settings_loader;

mod app;

fn main() {
    let settings = settings_loader::load_settings_from_dir(settings_loader::SETTINGS_DIR);
    let settings_watcher = settings_loader::setup_settings_watcher(settings_loader::SETTINGS_DIR)
        .unwrap_or_else(|_| settings_loader::SettingsWatcher::stub());

    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Disarm".into(),
                position: WindowPosition::Centered(MonitorSelection::Primary),
                present_mode: PresentMode::AutoVsync,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(FrameTimeDiagnosticsPlugin)
        .add_plugins(LogDiagnosticsPlugin::default());

    if settings.atmosphere.enabled {
        app.add_plugins(AtmospherePlugin)
            .insert_resource(AtmosphereModel::default())
            .insert_resource(AtmosphereSettings {
                resolution: settings.atmosphere.resolution,
                dithering: settings.atmosphere.dithering,
                ..Default::default()
            });
        app.add_systems(Update, app::sync_atmosphere_settings);
    }

    app.add_event::<PlayerEvent>();
    app.add_event::<LevelEvent>();

    app.insert_resource(RapierWorld::from_settings(&settings.physics));
    app.insert_resource(InputLatch::new(Keybinds::from_settings(&settings)));
    app.insert_resource(Countdown::from_settings(&settings));
    app.insert_resource(settings);
    app.insert_resource(settings_watcher);

    app.add_systems(Startup, (app::setup, app::load_player_assets, app::load_sound_cues));

    // one frame: input, physics step, player tick, level rules, then
    // copy simulation state onto the rendered entities
    app.add_systems(
        Update,
        (
            settings_loader::check_settings_changes,
            (sync_keybinds, apply_camera_settings, apply_player_settings, apply_physics_settings::<RapierWorld>),
            latch_keyboard_input,
            release_cursor,
            apply_pointer_lock,
            camera_look,
            step_physics::<RapierWorld>,
            player_tick::<RapierWorld>,
            level_tick::<RapierWorld>,
            (sync_player_model, sync_nuke_transform::<RapierWorld>, sync_camera_transform),
        )
            .chain(),
    );
    app.add_systems(
        Update,
        (
            app::spawn_player_when_ready.before(player_tick::<RapierWorld>),
            app::attach_animation_graph,
            app::mirror_player_animation.after(player_tick::<RapierWorld>),
            app::play_sound_cues.after(level_tick::<RapierWorld>),
        ),
    );

    app.run();
}
