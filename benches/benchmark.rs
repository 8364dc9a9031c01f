use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bevy::math::Vec3;
use bevy::prelude::KeyCode;
use disarm::camera::CameraRig;
use disarm::input::{InputFlag, InputLatch, InputState, Keybinds};
use disarm::physics::{CollisionFilter, PhysicsWorld, SimpleWorld};
use disarm::player::{resolve_locomotion, AnimationSet, ClipTrack, Player};
use disarm::settings::Settings;

fn captured_rig(settings: &Settings) -> CameraRig {
    let mut rig = CameraRig::from_settings(Vec3::ZERO, &settings.camera, &settings.controls);
    rig.lock();
    let _ = rig.on_lock_change(true);
    rig
}

/// Orbit the third person camera with small mouse deltas
fn bench_camera_orbit(c: &mut Criterion) {
    let settings = Settings::default();
    c.bench_function("camera_orbit", |b| {
        b.iter(|| {
            let mut rig = captured_rig(&settings);
            for i in 0..1_000usize {
                let dx = ((i * 13) % 17) as f32 - 8.0;
                let dy = ((i * 7) % 23) as f32 - 11.0;
                rig.apply_pointer_delta(black_box(dx), black_box(dy));
            }
            black_box(rig.transform);
        })
    });
}

/// First person look with randomized deltas (deterministic LCG), including spikes
fn bench_camera_look_random(c: &mut Criterion) {
    let settings = Settings::default();
    c.bench_function("camera_look_random", |b| {
        b.iter(|| {
            let mut rig = captured_rig(&settings);
            rig.toggle_perspective();
            let mut state: u32 = 0x12345678;
            for _ in 0..1_000usize {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                let dx = (((state >> 16) & 0x7fff) as f32 / 32767.0) * 600.0 - 300.0;
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                let dy = (((state >> 16) & 0x7fff) as f32 / 32767.0) * 600.0 - 300.0;
                rig.apply_pointer_delta(black_box(dx), black_box(dy));
            }
            black_box(rig.transform);
        })
    });
}

/// Resolve every movement key combination
fn bench_locomotion(c: &mut Criterion) {
    let flags = [InputFlag::Forward, InputFlag::Back, InputFlag::Left, InputFlag::Right];
    let mut latch = InputLatch::new(Keybinds::default());
    let states: Vec<InputState> = (0u8..16)
        .map(|bits| {
            for (i, flag) in flags.iter().enumerate() {
                let key = latch.keybinds().key(*flag);
                if bits & (1 << i) != 0 { latch.on_key_down(key) } else { latch.on_key_up(key) }
            }
            latch.state()
        })
        .collect();
    let direction = Vec3::new(0.6, 0.0, 0.8);
    c.bench_function("locomotion_resolve", |b| {
        b.iter(|| {
            for state in &states {
                black_box(resolve_locomotion(black_box(state), direction, 4.0));
            }
        })
    });
}

/// Full frame: physics step plus player tick, running diagonally across the island
fn bench_player_tick(c: &mut Criterion) {
    let settings = Settings::default();
    c.bench_function("player_tick", |b| {
        b.iter(|| {
            let mut world = SimpleWorld::from_settings(&settings.physics);
            world.add_static_box(Vec3::new(0.0, -1.0, 0.0), Vec3::new(50.0, 1.0, 50.0), CollisionFilter::LEVEL);
            let clips = AnimationSet::from_lookup(|_| Some(ClipTrack::new(1.0)));
            let Ok(clips) = clips else { return };
            let mut player = Player::spawn(&mut world, Vec3::ZERO, clips, &settings);
            let mut rig = captured_rig(&settings);
            let mut latch = InputLatch::new(Keybinds::default());
            latch.on_key_down(KeyCode::KeyW);
            latch.on_key_down(KeyCode::KeyD);
            let dt = settings.physics.fixed_timestep;
            for i in 0..600usize {
                if i % 90 == 0 {
                    latch.on_key_down(KeyCode::Space);
                } else {
                    latch.on_key_up(KeyCode::Space);
                }
                world.step(dt, dt);
                black_box(player.tick(&mut latch, &mut rig, &mut world, dt));
            }
            black_box(player.model());
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(50);
    targets = bench_camera_orbit, bench_camera_look_random, bench_locomotion, bench_player_tick
}
criterion_main!(benches);
