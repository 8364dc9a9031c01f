//! The player: body, model pose, ground contact, locomotion and animation.
//!
//! [`Player::tick`] runs once per frame after the physics step. Everything it
//! touches outside itself (the input latch, the camera rig and the physics
//! world) is passed in, so the whole controller can be driven from tests
//! without an `App`.
//!
//! # Example:
//!
//! ```ignore
//! let mut player = Player::spawn(&mut world, Vec3::ZERO, clips, &settings);
//! let mut rig = CameraRig::from_settings(player.model().translation, &settings.camera, &settings.controls);
//! let events = player.tick(&mut latch, &mut rig, &mut world, dt);
//! ```

pub mod animation;
pub mod ground;
pub mod locomotion;

use bevy::prelude::*;
use bevy::render::view::RenderLayers;

pub use animation::{ActionLabel, AnimationBlend, AnimationClip, AnimationSet, BaseClip, ClipTrack, MissingClipError};
pub use ground::{GroundContact, GroundProbe, GroundTransition};
pub use locomotion::{Locomotion, facing_direction, heading_yaw, resolve_locomotion};

use crate::camera::{CameraMode, CameraRig};
use crate::input::{InputFlag, InputLatch};
use crate::physics::{AxisVelocity, BodyDesc, BodyHandle, CollisionFilter, PhysicsWorld, groups};
use crate::settings::Settings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KillKind {
    /// Stop control; the body keeps colliding with the level.
    Soft,
    /// Also drop the body out of every collision group so it falls through.
    Hard,
}

/// Things that happened during a tick, for audio and UI.
#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerEvent {
    Jumped,
    Landed,
    /// Fell into the water.
    Splashed,
    PerspectiveChanged(CameraMode),
    Died(KillKind),
}

/// Observable controller state.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub alive: bool,
    pub death: Option<KillKind>,
    /// Latches once the player has moved horizontally.
    pub has_moved_ever: bool,
    pub grounded: bool,
    pub can_jump: bool,
    pub current_action: ActionLabel,
    /// Horizontal velocity written this tick.
    pub velocity: Vec3,
    /// Mirrors the camera rig's mode.
    pub perspective: CameraMode,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            alive: true,
            death: None,
            has_moved_ever: false,
            grounded: true,
            can_jump: true,
            current_action: ActionLabel::Idle,
            velocity: Vec3::ZERO,
            perspective: CameraMode::ThirdPerson,
        }
    }
}

/// Where the visible model sits. The model's origin is at its feet.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModelPose {
    pub translation: Vec3,
    pub yaw: f32,
}

/// Movement constants resolved from settings.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerTuning {
    pub speed: f32,
    pub jump_speed: f32,
    pub model_forward: Vec3,
    /// Distance from body centre down to the feet.
    pub feet_offset: f32,
    pub drown_height: f32,
    pub probe: GroundProbe,
}

impl PlayerTuning {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            speed: settings.movement.speed,
            jump_speed: settings.movement.jump_speed,
            model_forward: settings.movement.model_forward(),
            feet_offset: settings.movement.body_half_extents().y,
            drown_height: settings.death.drown_height,
            probe: GroundProbe::from_settings(&settings.probe),
        }
    }
}

/// Marker for the entity showing the player's model.
#[derive(Component)]
pub struct PlayerModel;

/// Render layer the player camera does not draw. Lights do, so a model on
/// this layer alone is invisible but still casts its shadow.
pub const SHADOW_ONLY_LAYER: usize = 1;

/// Layers for the model's meshes: hidden from the camera in first person.
#[must_use]
pub fn model_render_layers(mode: CameraMode) -> RenderLayers {
    match mode {
        CameraMode::ThirdPerson => RenderLayers::layer(0).with(SHADOW_ONLY_LAYER),
        CameraMode::FirstPerson => RenderLayers::layer(SHADOW_ONLY_LAYER),
    }
}

#[derive(Component, Clone, Debug)]
pub struct Player {
    body: BodyHandle,
    state: PlayerState,
    tuning: PlayerTuning,
    contact: GroundContact,
    jump_spent: bool,
    land_muted: bool,
    model: ModelPose,
    animation: AnimationBlend<ClipTrack>,
}

impl Player {
    /// Create the player's body with its feet at `feet`.
    pub fn spawn<W: PhysicsWorld + ?Sized>(
        world: &mut W,
        feet: Vec3,
        clips: AnimationSet<ClipTrack>,
        settings: &Settings,
    ) -> Self {
        let tuning = PlayerTuning::from_settings(settings);
        let body = world.create_body(BodyDesc {
            position: feet + Vec3::Y * tuning.feet_offset,
            half_extents: settings.movement.body_half_extents(),
            mass: settings.movement.body_mass,
            filter: CollisionFilter::PLAYER,
            // slides along walls instead of sticking to them
            friction: 0.0,
        });
        info!("player spawned at {feet:?}");
        Self {
            body,
            state: PlayerState::default(),
            tuning,
            contact: GroundContact::default(),
            jump_spent: false,
            land_muted: false,
            model: ModelPose { translation: feet, yaw: 0.0 },
            animation: AnimationBlend::new(clips),
        }
    }

    #[must_use]
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    #[must_use]
    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    #[must_use]
    pub fn model(&self) -> ModelPose {
        self.model
    }

    #[must_use]
    pub fn animation(&self) -> &AnimationBlend<ClipTrack> {
        &self.animation
    }

    #[must_use]
    pub fn tuning(&self) -> &PlayerTuning {
        &self.tuning
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.tuning = PlayerTuning::from_settings(settings);
    }

    /// Advance the controller by one frame.
    ///
    /// # Arguments
    /// * `input` - latched key state; the perspective toggle is consumed
    /// * `rig` - the camera rig following this player
    /// * `world` - physics world holding the body, already stepped this frame
    /// * `dt` - frame time in seconds, used for animation playback
    pub fn tick<W: PhysicsWorld + ?Sized>(
        &mut self,
        input: &mut InputLatch,
        rig: &mut CameraRig,
        world: &mut W,
        dt: f32,
    ) -> Vec<PlayerEvent> {
        let mut events = Vec::new();

        if input.take(InputFlag::TogglePerspective) && self.state.alive {
            rig.toggle_perspective();
            events.push(PlayerEvent::PerspectiveChanged(rig.mode()));
        }
        self.state.perspective = rig.mode();

        let body_position = world.transform(self.body).position;
        self.update_ground(world, body_position, &mut events);

        if self.state.alive && body_position.y < self.tuning.drown_height {
            events.push(PlayerEvent::Splashed);
            events.extend(self.kill(KillKind::Hard, rig, world));
        }

        let keys = input.state();
        let direction = facing_direction(rig.mode(), rig.forward(), rig.transform.translation, body_position);
        let (velocity, action) = if self.state.alive {
            if rig.mode() == CameraMode::FirstPerson || keys.any_movement() {
                if let Some(yaw) = heading_yaw(self.tuning.model_forward, direction) {
                    self.model.yaw = yaw;
                }
            }
            let loco = resolve_locomotion(&keys, direction, self.tuning.speed);
            if keys.is_held(InputFlag::Jump) && self.state.can_jump {
                world.set_velocity(self.body, AxisVelocity::vertical(self.tuning.jump_speed));
                self.jump_spent = true;
                self.state.can_jump = false;
                events.push(PlayerEvent::Jumped);
                debug!("jump");
            }
            (loco.velocity, loco.action)
        } else {
            (Vec3::ZERO, ActionLabel::Idle)
        };
        let action = locomotion::grounded_action(action, self.state.grounded);

        if velocity.x != 0.0 || velocity.z != 0.0 {
            self.state.has_moved_ever = true;
        }
        world.set_velocity(self.body, AxisVelocity::horizontal(velocity.x, velocity.z));
        self.state.velocity = velocity;

        self.model.translation = world.transform(self.body).position - Vec3::Y * self.tuning.feet_offset;
        if self.state.alive {
            rig.follow(self.model.translation);
        }

        self.state.current_action = action;
        self.animation.select(action);
        self.animation.advance(dt);

        events
    }

    fn update_ground<W: PhysicsWorld + ?Sized>(&mut self, world: &W, body_position: Vec3, events: &mut Vec<PlayerEvent>) {
        let grounded = self.tuning.probe.is_grounded(world, body_position);
        if self.contact.update(grounded) == GroundTransition::Landed {
            self.jump_spent = false;
            if !self.land_muted {
                events.push(PlayerEvent::Landed);
            }
        }
        // a jump blocked before leaving the ground must not lock jumping out
        if grounded && world.velocity(self.body).y <= 0.0 {
            self.jump_spent = false;
        }
        self.state.grounded = grounded;
        self.state.can_jump = grounded && !self.jump_spent;
    }

    /// End player control. Only the first call has any effect.
    ///
    /// Disables and releases the camera and snaps to idle when standing.
    /// A hard kill also moves the body out of every collision group and
    /// mutes further landing cues.
    pub fn kill<W: PhysicsWorld + ?Sized>(
        &mut self,
        kind: KillKind,
        rig: &mut CameraRig,
        world: &mut W,
    ) -> Option<PlayerEvent> {
        if !self.state.alive {
            return None;
        }
        self.state.alive = false;
        self.state.death = Some(kind);
        rig.enabled = false;
        rig.unlock();
        if self.state.grounded {
            self.state.current_action = ActionLabel::Idle;
            self.animation.transition(ActionLabel::Idle);
        }
        if kind == KillKind::Hard {
            self.land_muted = true;
            world.set_collision_group(self.body, groups::DISABLED);
        }
        info!("player died ({kind:?})");
        Some(PlayerEvent::Died(kind))
    }
}

/// Run the player controller for this frame.
#[allow(clippy::needless_pass_by_value)]
pub fn player_tick<W: PhysicsWorld + Resource>(
    time: Res<Time>,
    mut latch: ResMut<InputLatch>,
    mut world: ResMut<W>,
    mut players: Query<&mut Player>,
    mut rigs: Query<&mut CameraRig>,
    mut events: EventWriter<PlayerEvent>,
) {
    let Ok(mut player) = players.get_single_mut() else { return };
    let Ok(mut rig) = rigs.get_single_mut() else { return };
    let out = player.tick(&mut latch, &mut rig, &mut *world, time.delta_seconds());
    events.send_batch(out);
}

/// Copy the model pose onto the model entity and move its meshes between
/// render layers so it vanishes from view in first person.
#[allow(clippy::needless_pass_by_value)]
pub fn sync_player_model(
    mut commands: Commands,
    players: Query<&Player>,
    rigs: Query<&CameraRig>,
    children: Query<&Children>,
    meshes: Query<Option<&RenderLayers>, With<Handle<Mesh>>>,
    mut models: Query<(Entity, &mut Transform), With<PlayerModel>>,
) {
    let Ok(player) = players.get_single() else { return };
    let layers = model_render_layers(rigs.get_single().map_or(CameraMode::ThirdPerson, CameraRig::mode));
    let pose = player.model();
    for (model, mut transform) in &mut models {
        transform.translation = pose.translation;
        transform.rotation = Quat::from_rotation_y(pose.yaw);
        // scene meshes spawn as descendants and do not inherit layers
        for mesh in children.iter_descendants(model) {
            if meshes.get(mesh).is_ok_and(|current| current != Some(&layers)) {
                commands.entity(mesh).insert(layers.clone());
            }
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
pub fn apply_player_settings(settings: Res<Settings>, mut players: Query<&mut Player>) {
    if !settings.is_changed() {
        return;
    }
    for mut player in &mut players {
        player.apply_settings(&settings);
    }
}
