//! Audio-related small types and constants.
//!
//! This module defines the stream format constants, the play-order policy,
//! the shared playback state and the structured status snapshot handed to
//! observers.

use std::time::{Duration, Instant};

use crate::config::{ChannelSetting, PlayModeSetting};

/// Sample rate every streamed track is normalized to.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;
/// Signed 16-bit PCM.
pub const BYTES_PER_SAMPLE: usize = 2;
/// Canonical WAV header length; the read cursor never moves before it.
pub const WAV_HEADER_LEN: u64 = 44;
/// Largest magnitude written to the output.
pub const FULL_SCALE: f64 = 32767.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// Walk the playlist order front to back.
    #[default]
    Sequential,
    /// Pick uniformly among tracks not yet played in the current pass.
    Shuffle,
    /// Replay the current track when it ends.
    RepeatOne,
}

impl PlayMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Sequential => "Sequential",
            Self::Shuffle => "Shuffle",
            Self::RepeatOne => "Repeat-one",
        }
    }

    /// `Sequential -> Shuffle -> RepeatOne -> Sequential`.
    pub fn cycle(self) -> Self {
        match self {
            Self::Sequential => Self::Shuffle,
            Self::Shuffle => Self::RepeatOne,
            Self::RepeatOne => Self::Sequential,
        }
    }
}

impl From<PlayModeSetting> for PlayMode {
    fn from(setting: PlayModeSetting) -> Self {
        match setting {
            PlayModeSetting::Sequential => Self::Sequential,
            PlayModeSetting::Shuffle => Self::Shuffle,
            PlayModeSetting::RepeatOne => Self::RepeatOne,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ChannelLayout {
    Mono,
    #[default]
    Stereo,
}

impl ChannelLayout {
    pub fn count(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }

    /// Bytes per frame of 16-bit PCM in this layout.
    pub fn frame_bytes(self) -> usize {
        usize::from(self.count()) * BYTES_PER_SAMPLE
    }
}

impl From<ChannelSetting> for ChannelLayout {
    fn from(setting: ChannelSetting) -> Self {
        match setting {
            ChannelSetting::Mono => Self::Mono,
            ChannelSetting::Stereo => Self::Stereo,
        }
    }
}

/// Transport state shared between the producer and the controller.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub paused: bool,
    /// Relative seek not yet applied to the open track.
    pub pending_seek_seconds: f64,
    /// Wall-clock position within the current track.
    pub elapsed_seconds: f64,
    pub last_update: Instant,
}

impl PlaybackState {
    pub fn new(now: Instant) -> Self {
        Self {
            paused: false,
            pending_seek_seconds: 0.0,
            elapsed_seconds: 0.0,
            last_update: now,
        }
    }

    /// Integrate wall-clock time up to `now`. Time only counts while playing a track.
    pub fn tick(&mut self, now: Instant, streaming: bool) {
        if streaming && !self.paused {
            let delta = now.saturating_duration_since(self.last_update);
            self.elapsed_seconds += delta.as_secs_f64();
        }
        self.last_update = now;
    }

    /// Forget position and pending seek, e.g. after a track change.
    pub fn reset_position(&mut self, now: Instant) {
        self.elapsed_seconds = 0.0;
        self.pending_seek_seconds = 0.0;
        self.last_update = now;
    }

    /// Accumulate a relative seek. The resulting position never goes below zero.
    pub fn queue_seek(&mut self, delta_seconds: f64) {
        self.pending_seek_seconds += delta_seconds;
        let floor = -self.elapsed_seconds;
        if self.pending_seek_seconds < floor {
            self.pending_seek_seconds = floor;
        }
    }
}

/// Point-in-time view of the engine for front-ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub title: Option<String>,
    pub file_name: Option<String>,
    /// Catalog index of the current track.
    pub index: Option<usize>,
    pub track_count: usize,
    pub elapsed: Duration,
    pub duration: Option<Duration>,
    pub gain: Option<f64>,
    pub mode: PlayMode,
    pub repeat: bool,
    pub paused: bool,
    /// The playlist ran out under a non-repeating policy (or the engine stopped).
    pub drained: bool,
    /// Fatal error that halted the engine, if any.
    pub error: Option<String>,
}

impl Status {
    pub fn state_label(&self) -> &'static str {
        if self.drained {
            "Stopped"
        } else if self.paused {
            "Paused"
        } else {
            "Playing"
        }
    }

    /// One-line rendering: `<file> [mm:ss] <mode> <state>`.
    pub fn describe(&self) -> String {
        let name = self.file_name.as_deref().unwrap_or("-");
        format!(
            "{} [{}] {} {}",
            name,
            format_mmss(self.elapsed),
            self.mode.label(),
            self.state_label()
        )
    }
}

/// Format a `Duration` as `MM:SS`.
pub fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
