//! Player model loading and animation playback.
//!
//! The controller's clip tracks are the source of truth for what plays and
//! where. Every frame they are mirrored onto the scene's `AnimationPlayer`
//! with playback speed zero, so the engine only samples poses.
use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use disarm::physics::RapierWorld;
use disarm::player::{AnimationClip as _, AnimationSet, BaseClip, ClipTrack, Player, PlayerModel};
use disarm::settings::Settings;

use super::setup::PLAYER_SPAWN;

const PLAYER_MODEL: &str = "models/alex.glb";

#[derive(Resource)]
pub struct PlayerAssets {
    pub gltf: Handle<Gltf>,
    /// Set once the player was spawned or spawning was given up.
    pub settled: bool,
}

/// Graph nodes in [`BaseClip::ALL`] order.
#[derive(Resource)]
pub struct PlayerAnimations {
    pub graph: Handle<AnimationGraph>,
    pub nodes: Vec<AnimationNodeIndex>,
}

#[allow(clippy::needless_pass_by_value)]
pub fn load_player_assets(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.insert_resource(PlayerAssets { gltf: asset_server.load(PLAYER_MODEL), settled: false });
}

/// Spawn the player once its model and clips are loaded.
///
/// Every base clip must be present as a named animation in the model; if
/// any is missing the player is not spawned.
#[allow(clippy::needless_pass_by_value, clippy::too_many_arguments)]
pub fn spawn_player_when_ready(
    mut commands: Commands,
    mut assets: ResMut<PlayerAssets>,
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
    clips: Res<Assets<bevy::animation::AnimationClip>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    mut world: ResMut<RapierWorld>,
    settings: Res<Settings>,
) {
    if assets.settled {
        return;
    }
    if let Some(LoadState::Failed(err)) = asset_server.get_load_state(&assets.gltf) {
        error!("failed to load {PLAYER_MODEL}: {err}");
        assets.settled = true;
        return;
    }
    let Some(gltf) = gltfs.get(&assets.gltf) else { return };

    let set = AnimationSet::from_lookup(|clip| {
        let handle = gltf.named_animations.get(clip.name())?;
        clips.get(handle).map(|c| ClipTrack::new(c.duration()))
    });
    let set = match set {
        Ok(set) => set,
        Err(e) => {
            error!("{e}; player not spawned");
            assets.settled = true;
            return;
        }
    };
    let Some(scene) = gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned()) else {
        error!("{PLAYER_MODEL} has no scene; player not spawned");
        assets.settled = true;
        return;
    };

    let handles = BaseClip::ALL
        .iter()
        .filter_map(|clip| gltf.named_animations.get(clip.name()).cloned());
    let mut graph = AnimationGraph::new();
    let root = graph.root;
    let nodes: Vec<_> = graph.add_clips(handles, 1.0, root).collect();
    commands.insert_resource(PlayerAnimations { graph: graphs.add(graph), nodes });

    let player = Player::spawn(&mut *world, PLAYER_SPAWN, set, &settings);
    commands.spawn((
        SceneBundle {
            scene,
            transform: Transform::from_translation(player.model().translation),
            ..default()
        },
        PlayerModel,
        player,
    ));
    assets.settled = true;
}

/// Give newly spawned animation players the player's graph.
#[allow(clippy::needless_pass_by_value)]
pub fn attach_animation_graph(
    mut commands: Commands,
    animations: Option<Res<PlayerAnimations>>,
    added: Query<Entity, Added<AnimationPlayer>>,
) {
    let Some(animations) = animations else { return };
    for entity in &added {
        commands.entity(entity).insert(animations.graph.clone());
    }
}

/// Mirror the controller's clip tracks onto the engine animation player.
#[allow(clippy::needless_pass_by_value)]
pub fn mirror_player_animation(
    players: Query<&Player>,
    animations: Option<Res<PlayerAnimations>>,
    mut animation_players: Query<&mut AnimationPlayer>,
) {
    let Some(animations) = animations else { return };
    let Ok(player) = players.get_single() else { return };
    for mut animation_player in &mut animation_players {
        for ((_, track), node) in player.animation().clips().iter().zip(animations.nodes.iter().copied()) {
            if track.is_playing() {
                animation_player.play(node).repeat().set_speed(0.0).seek_to(track.time());
            } else if animation_player.is_playing_animation(node) {
                animation_player.stop(node);
            }
        }
    }
}
