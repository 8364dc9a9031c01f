pub mod atmosphere;
pub mod audio;
pub mod player;
pub mod setup;

pub use atmosphere::sync_atmosphere_settings;
pub use audio::{load_sound_cues, play_sound_cues};
pub use player::{attach_animation_graph, load_player_assets, mirror_player_animation, spawn_player_when_ready};
pub use setup::setup;
