//! Level rules around the player: the bomb and its countdown.
//!
//! The countdown starts the first time the player moves. If it runs out the
//! bomb detonates and the player is hard-killed. Pushing the bomb into the
//! water first disarms it and ends the level with a soft kill.

use bevy::prelude::*;

use crate::camera::CameraRig;
use crate::physics::{BodyDesc, BodyHandle, CollisionFilter, PhysicsWorld, groups};
use crate::player::{KillKind, Player, PlayerEvent};
use crate::settings::Settings;

#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelEvent {
    CountdownStarted,
    Exploded,
    Disarmed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelOutcome {
    Exploded,
    Disarmed,
}

#[derive(Resource, Clone, Debug, PartialEq)]
pub struct Countdown {
    duration: f32,
    remaining: f32,
    running: bool,
    outcome: Option<LevelOutcome>,
}

impl Countdown {
    #[must_use]
    pub fn new(seconds: f32) -> Self {
        Self { duration: seconds.max(0.0), remaining: seconds.max(0.0), running: false, outcome: None }
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.level.countdown_seconds)
    }

    #[must_use]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn outcome(&self) -> Option<LevelOutcome> {
        self.outcome
    }

    /// Start if not yet started and the level is still undecided.
    pub fn start(&mut self) -> bool {
        if self.running || self.outcome.is_some() || self.remaining < self.duration {
            return false;
        }
        self.running = true;
        true
    }

    /// Count down; returns true on the tick the timer runs out.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }
        self.remaining = (self.remaining - dt).max(0.0);
        if self.remaining > 0.0 {
            return false;
        }
        self.running = false;
        self.outcome = Some(LevelOutcome::Exploded);
        true
    }

    /// Stop the clock with the bomb disarmed. Too late once exploded.
    pub fn disarm(&mut self) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.running = false;
        self.outcome = Some(LevelOutcome::Disarmed);
        true
    }
}

/// The bomb prop: a heavy crate that can be shoved off the island.
#[derive(Component, Clone, Debug)]
pub struct Nuke {
    body: BodyHandle,
    disarmed: bool,
    can_disarm: bool,
}

impl Nuke {
    pub const HALF_EXTENTS: Vec3 = Vec3::new(1.25, 0.5, 0.5);
    pub const MASS: f32 = 2.0;

    pub fn spawn<W: PhysicsWorld + ?Sized>(world: &mut W, position: Vec3) -> Self {
        let body = world.create_body(BodyDesc {
            position,
            half_extents: Self::HALF_EXTENTS,
            mass: Self::MASS,
            filter: CollisionFilter::LEVEL,
            friction: BodyDesc::DEFAULT_FRICTION,
        });
        Self { body, disarmed: false, can_disarm: true }
    }

    #[must_use]
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    #[must_use]
    pub fn is_disarmed(&self) -> bool {
        self.disarmed
    }

    /// Drop the bomb through the world; it can no longer be disarmed.
    pub fn detonate<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        world.set_collision_group(self.body, groups::DISABLED);
        self.can_disarm = false;
    }

    /// Returns true on the tick the bomb sinks below `water_height`.
    pub fn update<W: PhysicsWorld + ?Sized>(&mut self, world: &W, water_height: f32) -> bool {
        if self.can_disarm && !self.disarmed && world.transform(self.body).position.y < water_height {
            self.disarmed = true;
            return true;
        }
        false
    }
}

/// One frame of level rules.
///
/// # Arguments
/// * `countdown` - level timer, started by the player's first move
/// * `nuke` - the bomb; sinking it disarms the level
/// * `player` - killed when the level is decided
/// * `rig` - the player's camera, disabled by the kill
/// * `world` - physics world holding the nuke and player bodies
/// * `water_height` - bodies below this are in the water
/// * `dt` - frame time in seconds
#[allow(clippy::too_many_arguments)]
pub fn advance_level<W: PhysicsWorld + ?Sized>(
    countdown: &mut Countdown,
    nuke: &mut Nuke,
    player: &mut Player,
    rig: &mut CameraRig,
    world: &mut W,
    water_height: f32,
    dt: f32,
) -> Vec<LevelEvent> {
    let mut events = Vec::new();
    if player.state().has_moved_ever && countdown.start() {
        info!("countdown started: {:.0}s", countdown.remaining());
        events.push(LevelEvent::CountdownStarted);
    }

    if nuke.update(world, water_height) && countdown.disarm() {
        info!("bomb disarmed with {:.1}s left", countdown.remaining());
        player.kill(KillKind::Soft, rig, world);
        events.push(LevelEvent::Disarmed);
    }

    if countdown.tick(dt) {
        info!("bomb exploded");
        nuke.detonate(world);
        player.kill(KillKind::Hard, rig, world);
        events.push(LevelEvent::Exploded);
    }
    events
}

#[allow(clippy::needless_pass_by_value, clippy::too_many_arguments)]
pub fn level_tick<W: PhysicsWorld + Resource>(
    time: Res<Time>,
    settings: Res<Settings>,
    mut countdown: ResMut<Countdown>,
    mut world: ResMut<W>,
    mut nukes: Query<&mut Nuke>,
    mut players: Query<&mut Player>,
    mut rigs: Query<&mut CameraRig>,
    mut level_events: EventWriter<LevelEvent>,
    mut player_events: EventWriter<PlayerEvent>,
) {
    let Ok(mut nuke) = nukes.get_single_mut() else { return };
    let Ok(mut player) = players.get_single_mut() else { return };
    let Ok(mut rig) = rigs.get_single_mut() else { return };
    let was_alive = player.state().alive;
    let events = advance_level(
        &mut countdown,
        &mut nuke,
        &mut player,
        &mut rig,
        &mut *world,
        settings.death.drown_height,
        time.delta_seconds(),
    );
    if was_alive {
        if let Some(kind) = player.state().death {
            player_events.send(PlayerEvent::Died(kind));
        }
    }
    level_events.send_batch(events);
}

/// Copy bomb body transforms onto their entities.
#[allow(clippy::needless_pass_by_value)]
pub fn sync_nuke_transform<W: PhysicsWorld + Resource>(world: Res<W>, mut nukes: Query<(&Nuke, &mut Transform)>) {
    for (nuke, mut transform) in &mut nukes {
        let body = world.transform(nuke.body());
        transform.translation = body.position;
        transform.rotation = body.orientation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputLatch, Keybinds};
    use crate::physics::SimpleWorld;
    use crate::player::{AnimationSet, ClipTrack};

    const DT: f32 = 1.0 / 60.0;

    struct Fixture {
        world: SimpleWorld,
        player: Player,
        rig: CameraRig,
        latch: InputLatch,
        nuke: Nuke,
        countdown: Countdown,
    }

    impl Fixture {
        fn new(countdown: f32, nuke_at: Vec3) -> Self {
            let settings = Settings::default();
            let mut world = SimpleWorld::new(-9.81, 10);
            world.add_static_box(Vec3::new(0.0, -1.0, 0.0), Vec3::new(5.0, 1.0, 5.0), CollisionFilter::LEVEL);
            let clips = AnimationSet::from_lookup(|_| Some(ClipTrack::new(1.0))).expect("clips");
            let player = Player::spawn(&mut world, Vec3::ZERO, clips, &settings);
            let rig = CameraRig::from_settings(Vec3::ZERO, &settings.camera, &settings.controls);
            let nuke = Nuke::spawn(&mut world, nuke_at);
            Self {
                world,
                player,
                rig,
                latch: InputLatch::new(Keybinds::default()),
                nuke,
                countdown: Countdown::new(countdown),
            }
        }

        fn frame(&mut self) -> Vec<LevelEvent> {
            self.world.step(DT, DT);
            self.player.tick(&mut self.latch, &mut self.rig, &mut self.world, DT);
            advance_level(&mut self.countdown, &mut self.nuke, &mut self.player, &mut self.rig, &mut self.world, -1.0, DT)
        }
    }

    #[test]
    fn countdown_waits_for_first_move() {
        let mut fx = Fixture::new(1.0, Vec3::new(3.0, 0.5, 3.0));
        for _ in 0..120 {
            assert!(fx.frame().is_empty());
        }
        assert!(!fx.countdown.is_running());
        fx.latch.on_key_down(KeyCode::KeyA);
        let events = fx.frame();
        assert_eq!(events, vec![LevelEvent::CountdownStarted]);
        assert!(fx.countdown.is_running());
    }

    #[test]
    fn explosion_hard_kills_player() {
        let mut fx = Fixture::new(0.5, Vec3::new(3.0, 0.5, 3.0));
        fx.latch.on_key_down(KeyCode::KeyA);
        fx.frame();
        fx.latch.on_key_up(KeyCode::KeyA);
        let mut exploded = 0;
        for _ in 0..60 {
            exploded += fx.frame().iter().filter(|e| **e == LevelEvent::Exploded).count();
        }
        assert_eq!(exploded, 1);
        assert_eq!(fx.countdown.outcome(), Some(LevelOutcome::Exploded));
        assert_eq!(fx.player.state().death, Some(KillKind::Hard));
        assert_eq!(fx.world.collision_filter(fx.nuke.body()).group, groups::DISABLED);
    }

    #[test]
    fn sinking_the_bomb_disarms_and_soft_kills() {
        // off the island, already falling towards the water
        let mut fx = Fixture::new(10.0, Vec3::new(8.0, 0.5, 0.0));
        fx.latch.on_key_down(KeyCode::KeyA);
        fx.frame();
        fx.latch.on_key_up(KeyCode::KeyA);
        let mut disarmed = 0;
        for _ in 0..120 {
            disarmed += fx.frame().iter().filter(|e| **e == LevelEvent::Disarmed).count();
        }
        assert_eq!(disarmed, 1);
        assert!(fx.nuke.is_disarmed());
        assert!(!fx.countdown.is_running());
        assert_eq!(fx.player.state().death, Some(KillKind::Soft));
    }

    #[test]
    fn detonated_bomb_cannot_be_disarmed() {
        let mut countdown = Countdown::new(0.1);
        assert!(countdown.start());
        assert!(countdown.tick(0.2));
        assert!(!countdown.disarm());
        assert!(!countdown.start());
        assert_eq!(countdown.outcome(), Some(LevelOutcome::Exploded));
    }
}
