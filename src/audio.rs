//! The streaming engine.
//!
//! Tracks are normalized to 44.1 kHz 16-bit PCM (transcoding through an
//! external program when needed), gain-adjusted against their peak, and handed
//! out in exactly-sized frame blocks on demand.

mod artifact;
mod controller;
mod engine;
mod gain;
mod normalize;
mod playlist;
mod source;
mod track;
mod types;

pub use artifact::{ScratchDir, TempArtifact};
pub use controller::Controller;
pub use engine::{Engine, EngineOptions, Producer};
pub use gain::{GAIN_CEILING, GainAnalyzer, scan_peak};
pub use normalize::{Normalizer, Resolved, WavProbe, probe_wav};
pub use playlist::{Advance, Playlist};
pub use source::{FrameBlock, FrameSource, MonitorSource};
pub use track::OpenTrack;
pub use types::{
    BYTES_PER_SAMPLE, ChannelLayout, FULL_SCALE, PlayMode, PlaybackState, Status,
    TARGET_SAMPLE_RATE, WAV_HEADER_LEN, format_mmss,
};

#[cfg(test)]
mod tests;
