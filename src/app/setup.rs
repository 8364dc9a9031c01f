//! Startup systems for the island scene.
//!
//! Builds the static level geometry in both the physics world and the
//! renderer, lights the scene, spawns the bomb and the camera rig.
use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use bevy_atmosphere::prelude::AtmosphereCamera;
use disarm::camera::CameraRig;
use disarm::level::Nuke;
use disarm::player::SHADOW_ONLY_LAYER;
use disarm::physics::{CollisionFilter, PhysicsWorld, RapierWorld};
use disarm::settings::Settings;

/// Feet position the player spawns at.
pub const PLAYER_SPAWN: Vec3 = Vec3::ZERO;
pub const NUKE_SPAWN: Vec3 = Vec3::new(2.5, 0.5, 3.0);

/// Island pieces: centre, half extents and sRGB colour.
const ISLAND: [([f32; 3], [f32; 3], [f32; 3]); 5] = [
    // sand, walkable top at y = 0
    ([0.0, -1.0, 0.0], [6.0, 1.0, 6.0], [0.76, 0.70, 0.50]),
    ([-3.5, 0.25, -3.5], [1.5, 0.25, 1.5], [0.45, 0.42, 0.40]),
    ([-4.5, 0.75, -4.5], [0.75, 0.25, 0.75], [0.45, 0.42, 0.40]),
    ([4.0, 0.4, -4.0], [0.4, 0.4, 0.4], [0.55, 0.38, 0.20]),
    ([-1.0, 0.15, 4.5], [2.0, 0.15, 0.3], [0.40, 0.27, 0.15]),
];

/// Spawn level geometry, lights, the bomb and the camera.
///
/// # Arguments
/// - `commands`: Commands used to spawn entities and insert resources.
/// - `meshes`: Asset storage for the island and water meshes.
/// - `materials`: Asset storage for standard materials.
/// - `asset_server`: Loads the bomb model.
/// - `world`: Physics world receiving the static island boxes.
/// - `settings`: Camera tuning for the rig.
#[allow(clippy::needless_pass_by_value)]
pub fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
    mut world: ResMut<RapierWorld>,
    settings: Res<Settings>,
) {
    for (center, half, [r, g, b]) in ISLAND {
        let center = Vec3::from_array(center);
        let half = Vec3::from_array(half);
        world.add_static_box(center, half, CollisionFilter::LEVEL);
        commands.spawn(PbrBundle {
            mesh: meshes.add(Cuboid::from_size(half * 2.0)),
            material: materials.add(StandardMaterial {
                base_color: Color::srgb(r, g, b),
                perceptual_roughness: 0.9,
                ..default()
            }),
            transform: Transform::from_translation(center),
            ..default()
        });
    }

    // water surface sits at the drowning height
    commands.spawn(PbrBundle {
        mesh: meshes.add(Plane3d::default().mesh().size(400.0, 400.0)),
        material: materials.add(StandardMaterial {
            base_color: Color::srgba(0.05, 0.30, 0.45, 0.85),
            alpha_mode: AlphaMode::Blend,
            perceptual_roughness: 0.1,
            ..default()
        }),
        transform: Transform::from_xyz(0.0, settings.death.drown_height, 0.0),
        ..default()
    });

    let nuke = Nuke::spawn(&mut *world, NUKE_SPAWN);
    commands.spawn((
        SceneBundle {
            scene: asset_server.load("models/nuke.glb#Scene0"),
            transform: Transform::from_translation(NUKE_SPAWN),
            ..default()
        },
        nuke,
    ));

    // sees the shadow-only layer so the first person model still casts a shadow
    commands.spawn((
        DirectionalLightBundle {
            directional_light: DirectionalLight {
                shadows_enabled: true,
                illuminance: 8000.0,
                ..default()
            },
            transform: Transform::from_xyz(-10.0, 10.0, -10.0).looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        },
        RenderLayers::layer(0).with(SHADOW_ONLY_LAYER),
    ));
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
    });

    let rig = CameraRig::from_settings(PLAYER_SPAWN, &settings.camera, &settings.controls);
    commands.spawn((
        Camera3dBundle {
            transform: rig.transform,
            projection: PerspectiveProjection {
                fov: settings.camera.fov_degrees.to_radians(),
                ..default()
            }
            .into(),
            ..default()
        },
        AtmosphereCamera::default(),
        rig,
    ));
}
