//! The pull boundary towards the downstream signal chain.
//!
//! Downstream code owns the call loop: it hands the engine an output block and
//! gets it back completely filled. [`MonitorSource`] adapts the same pull API to
//! `rodio` so the stream can be listened to locally.

use std::sync::Arc;
use std::time::Duration;

use rodio::Source;
use tracing::error;

use crate::error::Result;

use super::engine::{Engine, Producer};
use super::types::{ChannelLayout, TARGET_SAMPLE_RATE};

/// Output buffers for one pull. Every slice is filled completely.
pub enum FrameBlock<'a> {
    /// Separate left/right channels; the block length is the shorter slice.
    Stereo {
        left: &'a mut [i16],
        right: &'a mut [i16],
    },
    /// A single channel.
    Mono(&'a mut [i16]),
    /// Interleaved samples with `channels` samples per frame.
    Interleaved {
        samples: &'a mut [i16],
        channels: u16,
    },
}

impl FrameBlock<'_> {
    /// Number of frames the block holds.
    pub fn frames(&self) -> usize {
        match self {
            Self::Stereo { left, right } => left.len().min(right.len()),
            Self::Mono(out) => out.len(),
            Self::Interleaved { samples, channels } => samples.len() / usize::from((*channels).max(1)),
        }
    }

    /// Write one frame at position `at`. `frame` holds one sample per source channel.
    pub(crate) fn put(&mut self, at: usize, frame: &[i16]) {
        let (l, r) = match frame {
            [m] => (*m, *m),
            [l, r, ..] => (*l, *r),
            [] => (0, 0),
        };
        match self {
            Self::Stereo { left, right } => {
                left[at] = l;
                right[at] = r;
            }
            Self::Mono(out) => {
                out[at] = if frame.len() > 1 {
                    ((i32::from(l) + i32::from(r)) / 2) as i16
                } else {
                    l
                };
            }
            Self::Interleaved { samples, channels } => {
                let ch = usize::from((*channels).max(1));
                let base = at * ch;
                samples[base] = l;
                if ch > 1 {
                    samples[base + 1] = r;
                    for s in &mut samples[base + 2..base + ch] {
                        *s = 0;
                    }
                }
            }
        }
    }

    /// Zero every frame from `from` to the end of the block.
    pub fn silence_from(&mut self, from: usize) {
        let frames = self.frames();
        if from >= frames {
            return;
        }
        match self {
            Self::Stereo { left, right } => {
                left[from..frames].fill(0);
                right[from..frames].fill(0);
            }
            Self::Mono(out) => out[from..].fill(0),
            Self::Interleaved { samples, channels } => {
                let ch = usize::from((*channels).max(1));
                samples[from * ch..].fill(0);
            }
        }
    }
}

/// Anything that can be pulled for exactly-sized PCM blocks.
pub trait FrameSource: Send {
    fn layout(&self) -> ChannelLayout;

    fn sample_rate(&self) -> u32 {
        TARGET_SAMPLE_RATE
    }

    /// Fill `block` completely and return the number of frames that carry
    /// audio. That count is below the block length only once the playlist is
    /// permanently exhausted; the rest of the block is then silence.
    fn pull(&mut self, block: FrameBlock<'_>) -> Result<usize>;
}

/// Local playback of the stream through `rodio`.
pub struct MonitorSource {
    producer: Producer,
    block: Vec<i16>,
    pos: usize,
    channels: u16,
}

impl MonitorSource {
    pub fn new(engine: Arc<Engine>, block_frames: usize) -> Self {
        let channels = engine.layout().count();
        let producer = Producer::new(engine);
        Self {
            producer,
            block: vec![0; block_frames.max(1) * usize::from(channels)],
            pos: usize::MAX,
            channels,
        }
    }

    fn refill(&mut self) -> bool {
        if !self.producer.engine().is_running() {
            return false;
        }
        let channels = self.channels;
        let block = FrameBlock::Interleaved {
            samples: &mut self.block,
            channels,
        };
        if let Err(e) = self.producer.pull(block) {
            error!(error = %e, "monitor output stopped");
            return false;
        }
        self.pos = 0;
        true
    }
}

impl Iterator for MonitorSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.block.len() && !self.refill() {
            return None;
        }
        let sample = self.block[self.pos];
        self.pos += 1;
        Some(f32::from(sample) / 32768.0)
    }
}

impl Source for MonitorSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> rodio::ChannelCount {
        self.channels
    }

    fn sample_rate(&self) -> rodio::SampleRate {
        TARGET_SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
