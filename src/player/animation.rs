//! Action labels and the animation blend selector.
//!
//! Six base clips are authored (idle, run, fall, left, right, backwards).
//! Diagonal gaits are not separate clips: they play two base clips at once
//! with the second phase-locked to the first.
//!
//! Backward diagonals pair crossed sides (`LeftBackwards` plays `Right` +
//! `Backwards`), which matches how the strafe clips were authored. The
//! `backward_diagonals_use_crossed_strafe_clips` test pins this mapping.

use std::fmt;

/// The locomotion state chosen for a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ActionLabel {
    #[default]
    Idle,
    Run,
    Backwards,
    Left,
    Right,
    Fall,
    LeftRun,
    RightRun,
    LeftBackwards,
    RightBackwards,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseClip {
    Idle,
    Run,
    Fall,
    Left,
    Right,
    Backwards,
}

impl BaseClip {
    pub const ALL: [BaseClip; 6] = [
        BaseClip::Idle,
        BaseClip::Run,
        BaseClip::Fall,
        BaseClip::Left,
        BaseClip::Right,
        BaseClip::Backwards,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BaseClip::Idle => "idle",
            BaseClip::Run => "run",
            BaseClip::Fall => "fall",
            BaseClip::Left => "left",
            BaseClip::Right => "right",
            BaseClip::Backwards => "backwards",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Which clips a label plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipSelection {
    Single(BaseClip),
    /// `follower` is kept at the same normalized time as `driver`.
    Pair { driver: BaseClip, follower: BaseClip },
}

impl ActionLabel {
    #[must_use]
    pub fn clips(self) -> ClipSelection {
        use ClipSelection::{Pair, Single};
        match self {
            ActionLabel::Idle => Single(BaseClip::Idle),
            ActionLabel::Run => Single(BaseClip::Run),
            ActionLabel::Backwards => Single(BaseClip::Backwards),
            ActionLabel::Left => Single(BaseClip::Left),
            ActionLabel::Right => Single(BaseClip::Right),
            ActionLabel::Fall => Single(BaseClip::Fall),
            ActionLabel::LeftRun => Pair { driver: BaseClip::Left, follower: BaseClip::Run },
            ActionLabel::RightRun => Pair { driver: BaseClip::Right, follower: BaseClip::Run },
            ActionLabel::LeftBackwards => Pair { driver: BaseClip::Right, follower: BaseClip::Backwards },
            ActionLabel::RightBackwards => Pair { driver: BaseClip::Left, follower: BaseClip::Backwards },
        }
    }
}

/// A playable clip handle.
pub trait AnimationClip {
    /// Start playing from the beginning.
    fn play(&mut self);

    fn stop(&mut self);

    fn is_playing(&self) -> bool;

    fn set_time(&mut self, seconds: f32);

    fn time(&self) -> f32;

    fn duration(&self) -> f32;

    /// Advance playback by `dt` seconds. No-op while stopped.
    fn advance(&mut self, dt: f32);

    /// Normalized playback position in `[0, 1)`.
    fn phase(&self) -> f32 {
        let duration = self.duration();
        if duration > 0.0 { self.time() / duration } else { 0.0 }
    }

    /// Jump to the same normalized position as a driver clip.
    fn sync_to_phase(&mut self, phase: f32) {
        let duration = self.duration();
        self.set_time(phase * duration);
    }
}

/// Looping playback cursor over a clip of known length.
///
/// The game mirrors these onto the engine's animation player each frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipTrack {
    duration: f32,
    time: f32,
    playing: bool,
}

impl ClipTrack {
    #[must_use]
    pub fn new(duration: f32) -> Self {
        Self { duration: duration.max(0.0), time: 0.0, playing: false }
    }
}

impl AnimationClip for ClipTrack {
    fn play(&mut self) {
        self.time = 0.0;
        self.playing = true;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn set_time(&mut self, seconds: f32) {
        self.time = if self.duration > 0.0 { seconds.rem_euclid(self.duration) } else { 0.0 };
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn duration(&self) -> f32 {
        self.duration
    }

    fn advance(&mut self, dt: f32) {
        if self.playing {
            self.set_time(self.time + dt);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MissingClipError {
    pub clip: BaseClip,
}

impl fmt::Display for MissingClipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "animation clip '{}' was not resolved before spawn", self.clip.name())
    }
}

impl std::error::Error for MissingClipError {}

/// Fixed table holding one clip per [`BaseClip`].
#[derive(Clone, Debug)]
pub struct AnimationSet<C> {
    clips: [C; 6],
}

impl<C: AnimationClip> AnimationSet<C> {
    /// Build the table by resolving each base clip.
    ///
    /// # Errors
    /// [`MissingClipError`] naming the first clip `lookup` could not provide.
    pub fn from_lookup(mut lookup: impl FnMut(BaseClip) -> Option<C>) -> Result<Self, MissingClipError> {
        let [idle, run, fall, left, right, backwards] =
            BaseClip::ALL.map(|clip| lookup(clip).ok_or(MissingClipError { clip }));
        Ok(Self { clips: [idle?, run?, fall?, left?, right?, backwards?] })
    }

    #[must_use]
    pub fn get(&self, clip: BaseClip) -> &C {
        &self.clips[clip.index()]
    }

    pub fn get_mut(&mut self, clip: BaseClip) -> &mut C {
        &mut self.clips[clip.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (BaseClip, &C)> {
        BaseClip::ALL.into_iter().zip(self.clips.iter())
    }

    fn stop_all(&mut self) {
        for clip in &mut self.clips {
            clip.stop();
        }
    }
}

/// Debounced selector mapping action labels to playing clips.
#[derive(Clone, Debug)]
pub struct AnimationBlend<C> {
    set: AnimationSet<C>,
    current: Option<ActionLabel>,
    sync: Option<(BaseClip, BaseClip)>,
}

impl<C: AnimationClip> AnimationBlend<C> {
    #[must_use]
    pub fn new(set: AnimationSet<C>) -> Self {
        Self { set, current: None, sync: None }
    }

    #[must_use]
    pub fn current(&self) -> Option<ActionLabel> {
        self.current
    }

    #[must_use]
    pub fn clips(&self) -> &AnimationSet<C> {
        &self.set
    }

    /// Clips currently playing, in table order.
    #[must_use]
    pub fn active_clips(&self) -> Vec<BaseClip> {
        self.set.iter().filter(|(_, c)| c.is_playing()).map(|(b, _)| b).collect()
    }

    /// Switch to `label` unless it is already the playing label.
    ///
    /// Returns whether a transition happened.
    pub fn select(&mut self, label: ActionLabel) -> bool {
        if self.current == Some(label) {
            return false;
        }
        self.transition(label);
        true
    }

    /// Stop everything and start the clips for `label` from the beginning.
    pub fn transition(&mut self, label: ActionLabel) {
        self.set.stop_all();
        self.sync = None;
        match label.clips() {
            ClipSelection::Single(clip) => self.set.get_mut(clip).play(),
            ClipSelection::Pair { driver, follower } => {
                self.set.get_mut(driver).play();
                self.set.get_mut(follower).play();
                let phase = self.set.get(driver).phase();
                self.set.get_mut(follower).sync_to_phase(phase);
                self.sync = Some((driver, follower));
            }
        }
        self.current = Some(label);
    }

    /// Advance playing clips, then re-lock any follower to its driver.
    pub fn advance(&mut self, dt: f32) {
        for clip in &mut self.set.clips {
            clip.advance(dt);
        }
        if let Some((driver, follower)) = self.sync {
            debug_assert!(self.set.get(driver).is_playing(), "blend driver stopped while synced");
            let phase = self.set.get(driver).phase();
            self.set.get_mut(follower).sync_to_phase(phase);
        }
    }
}
