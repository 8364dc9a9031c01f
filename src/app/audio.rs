//! Sound cues for player and level events, plus the looping sea ambience.
use bevy::audio::Volume;
use bevy::prelude::*;
use disarm::level::LevelEvent;
use disarm::player::PlayerEvent;
use disarm::settings::{AudioSettings, Settings};

#[derive(Resource)]
pub struct SoundCues {
    pub jump: Handle<AudioSource>,
    pub land: Handle<AudioSource>,
    pub splash: Handle<AudioSource>,
    pub explosion: Handle<AudioSource>,
    pub ambient: Handle<AudioSource>,
}

#[allow(clippy::needless_pass_by_value)]
pub fn load_sound_cues(mut commands: Commands, asset_server: Res<AssetServer>, settings: Res<Settings>) {
    let cues = SoundCues {
        jump: asset_server.load("sounds/jump.ogg"),
        land: asset_server.load("sounds/land.ogg"),
        splash: asset_server.load("sounds/splash.ogg"),
        explosion: asset_server.load("sounds/explosion.ogg"),
        ambient: asset_server.load("sounds/waves.ogg"),
    };
    let audio = &settings.audio;
    commands.spawn(AudioBundle {
        source: cues.ambient.clone(),
        settings: PlaybackSettings::LOOP.with_volume(Volume::new(audio.master_volume * audio.ambient_volume)),
    });
    commands.insert_resource(cues);
}

/// One-shot sounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    Jump,
    Land,
    Splash,
    Explosion,
}

impl Cue {
    fn for_player(event: PlayerEvent) -> Option<Cue> {
        match event {
            PlayerEvent::Jumped => Some(Cue::Jump),
            PlayerEvent::Landed => Some(Cue::Land),
            PlayerEvent::Splashed => Some(Cue::Splash),
            PlayerEvent::PerspectiveChanged(_) | PlayerEvent::Died(_) => None,
        }
    }

    fn for_level(event: LevelEvent) -> Option<Cue> {
        match event {
            LevelEvent::Exploded => Some(Cue::Explosion),
            // the bomb hitting the water
            LevelEvent::Disarmed => Some(Cue::Splash),
            LevelEvent::CountdownStarted => None,
        }
    }

    /// Volume before the master volume is applied.
    fn volume(self, audio: &AudioSettings) -> f32 {
        match self {
            Cue::Land => audio.effects_volume * audio.land_volume,
            Cue::Jump | Cue::Splash | Cue::Explosion => audio.effects_volume,
        }
    }
}

impl SoundCues {
    fn source(&self, cue: Cue) -> &Handle<AudioSource> {
        match cue {
            Cue::Jump => &self.jump,
            Cue::Land => &self.land,
            Cue::Splash => &self.splash,
            Cue::Explosion => &self.explosion,
        }
    }
}

/// Play a one-shot for each cue-worthy event this frame.
#[allow(clippy::needless_pass_by_value)]
pub fn play_sound_cues(
    mut commands: Commands,
    cues: Res<SoundCues>,
    settings: Res<Settings>,
    mut player_events: EventReader<PlayerEvent>,
    mut level_events: EventReader<LevelEvent>,
) {
    let audio = &settings.audio;
    let player_cues = player_events.read().filter_map(|e| Cue::for_player(*e));
    let level_cues = level_events.read().filter_map(|e| Cue::for_level(*e));
    for cue in player_cues.chain(level_cues) {
        commands.spawn(AudioBundle {
            source: cues.source(cue).clone(),
            settings: PlaybackSettings::DESPAWN.with_volume(Volume::new(audio.master_volume * cue.volume(audio))),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disarm::player::KillKind;

    #[test]
    fn disarm_and_drowning_both_splash() {
        assert_eq!(Cue::for_level(LevelEvent::Disarmed), Some(Cue::Splash));
        assert_eq!(Cue::for_player(PlayerEvent::Splashed), Some(Cue::Splash));
        assert_eq!(Cue::for_level(LevelEvent::Exploded), Some(Cue::Explosion));
        assert_eq!(Cue::for_level(LevelEvent::CountdownStarted), None);
        assert_eq!(Cue::for_player(PlayerEvent::Died(KillKind::Hard)), None);
    }

    #[test]
    fn landing_uses_its_own_volume() {
        let audio = AudioSettings { effects_volume: 0.8, land_volume: 0.5, ..AudioSettings::default() };
        assert!((Cue::Land.volume(&audio) - 0.4).abs() < 1e-6);
        assert!((Cue::Jump.volume(&audio) - 0.8).abs() < 1e-6);
    }
}
