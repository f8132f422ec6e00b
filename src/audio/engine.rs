//! The pull-based frame producer.
//!
//! All mutable engine state (transport, playlist cursor, open track) sits in
//! one [`Shared`] struct behind one mutex. A pull holds the lock for its whole
//! duration except while a new track is being resolved: transcoding and gain
//! analysis run unlocked and the result is installed afterwards, unless a
//! concurrent track change superseded it in the meantime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::Result;
use crate::library::Track;

use super::artifact::ScratchDir;
use super::gain::GainAnalyzer;
use super::normalize::Normalizer;
use super::playlist::{Advance, Playlist};
use super::source::{FrameBlock, FrameSource};
use super::track::OpenTrack;
use super::types::{BYTES_PER_SAMPLE, ChannelLayout, FULL_SCALE, PlayMode, PlaybackState};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub layout: ChannelLayout,
    /// Maximum frames per sub-read.
    pub chunk_size: usize,
    pub mode: PlayMode,
    pub repeat: bool,
    /// "Previous" restarts the current track past this many seconds.
    pub restart_threshold_secs: f64,
    /// Fixed shuffle seed; random when `None`.
    pub seed: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            layout: ChannelLayout::Stereo,
            chunk_size: 4096,
            mode: PlayMode::Sequential,
            repeat: true,
            restart_threshold_secs: 3.0,
            seed: None,
        }
    }
}

impl EngineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            layout: settings.audio.channels.into(),
            chunk_size: settings.audio.chunk_size.max(1),
            mode: settings.playback.mode.into(),
            repeat: settings.playback.repeat,
            restart_threshold_secs: settings.controls.restart_threshold_secs,
            seed: None,
        }
    }
}

/// How a track change picks its target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Start,
    /// The current track ran out.
    Advance,
    /// User asked for the next track.
    Skip,
    /// User asked for the previous track.
    Back,
}

pub(crate) struct Shared {
    pub(crate) playback: PlaybackState,
    pub(crate) playlist: Playlist,
    pub(crate) open: Option<OpenTrack>,
    /// Bumped on every track change so late loads can tell they were superseded.
    generation: u64,
    pub(crate) failure: Option<String>,
    pub(crate) stopped: bool,
}

impl Shared {
    /// Nothing is open and nothing is being loaded.
    pub(crate) fn is_drained(&self) -> bool {
        self.open.is_none() && (self.stopped || self.playlist.current().is_none())
    }
}

pub struct Engine {
    tracks: Vec<Track>,
    state: Mutex<Shared>,
    normalizer: Normalizer,
    analyzer: GainAnalyzer,
    scratch: Arc<ScratchDir>,
    layout: ChannelLayout,
    chunk_size: usize,
    restart_threshold_secs: f64,
    running: AtomicBool,
}

impl Engine {
    /// Build an engine and open the first track.
    ///
    /// Fails if the first track cannot be transcoded.
    pub fn new(
        tracks: Vec<Track>,
        options: EngineOptions,
        normalizer: Normalizer,
        analyzer: GainAnalyzer,
        scratch: Arc<ScratchDir>,
    ) -> Result<Self> {
        let playlist = match options.seed {
            Some(seed) => Playlist::seeded(tracks.len(), options.mode, options.repeat, seed),
            None => Playlist::new(tracks.len(), options.mode, options.repeat),
        };
        let engine = Self {
            tracks,
            state: Mutex::new(Shared {
                playback: PlaybackState::new(Instant::now()),
                playlist,
                open: None,
                generation: 0,
                failure: None,
                stopped: false,
            }),
            normalizer,
            analyzer,
            scratch,
            layout: options.layout,
            chunk_size: options.chunk_size.max(1),
            restart_threshold_secs: options.restart_threshold_secs,
            running: AtomicBool::new(true),
        };

        let started = {
            let guard = engine.lock();
            engine.change_track(guard, Step::Start).map(drop)
        };
        started?;
        Ok(engine)
    }

    /// Wire scratch directory, normalizer and gain analyzer from `settings`.
    pub fn from_settings(tracks: Vec<Track>, settings: &Settings) -> Result<Self> {
        let options = EngineOptions::from_settings(settings);
        let scratch = Arc::new(ScratchDir::open(&settings.transcoder.scratch_dir)?);
        let normalizer = Normalizer::new(
            settings.transcoder.program.clone(),
            options.layout,
            scratch.clone(),
        );
        let analyzer = GainAnalyzer::new(settings.audio.headroom, settings.audio.max_gain);
        Self::new(tracks, options, normalizer, analyzer, scratch)
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn scratch_dir(&self) -> &ScratchDir {
        &self.scratch
    }

    pub(crate) fn restart_threshold_secs(&self) -> f64 {
        self.restart_threshold_secs
    }

    /// Cleared by [`stop`](Self::stop) and by fatal errors; loops poll it.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve, analyze and open catalog entry `index`. Runs without the lock.
    fn load(&self, index: usize) -> Result<OpenTrack> {
        let track = &self.tracks[index];
        let source = self.normalizer.resolve(track)?;
        let gain = self.analyzer.analyze(source.path());
        let open = OpenTrack::open(index, source, gain, self.layout)?;
        info!(
            index,
            title = %track.title,
            path = %track.path.display(),
            gain,
            transcoded = open.is_transcoded(),
            "now playing"
        );
        Ok(open)
    }

    /// Move the playlist cursor per `step` and install the resulting track.
    ///
    /// The lock is released while the new track is resolved. If another
    /// change happened meanwhile the freshly loaded track is discarded.
    pub(crate) fn change_track<'a>(
        &'a self,
        mut guard: MutexGuard<'a, Shared>,
        step: Step,
    ) -> Result<MutexGuard<'a, Shared>> {
        if guard.stopped {
            return Ok(guard);
        }

        let previous = guard.open.as_ref().map(OpenTrack::index);
        let target = match step {
            Step::Start => guard.playlist.start(),
            Step::Advance => guard.playlist.advance(),
            Step::Skip => guard.playlist.skip(),
            Step::Back => guard.playlist.step_back(),
        };
        guard.playback.reset_position(Instant::now());
        guard.generation = guard.generation.wrapping_add(1);

        let index = match target {
            Advance::Open(index) => index,
            Advance::Drained => {
                guard.open = None;
                info!("playlist exhausted");
                return Ok(guard);
            }
        };

        // Replaying the same track only needs a rewind.
        if step == Step::Advance && previous == Some(index) {
            if let Some(open) = guard.open.as_mut() {
                match open.rewind() {
                    Ok(()) => {
                        debug!(index, "replaying track");
                        return Ok(guard);
                    }
                    Err(e) => warn!(index, error = %e, "rewind failed, reopening"),
                }
            }
        }

        // Dropping the old handle deletes its temp artifact before a new one is made.
        guard.open = None;
        let generation = guard.generation;
        drop(guard);

        let loaded = self.load(index);

        let mut guard = self.lock();
        if guard.generation != generation || guard.stopped {
            debug!(index, "track change superseded, discarding");
            return Ok(guard);
        }
        match loaded {
            Ok(open) => {
                guard.open = Some(open);
                guard.playback.reset_position(Instant::now());
                Ok(guard)
            }
            Err(e) => {
                self.halt(&mut guard, &e.to_string());
                Err(e)
            }
        }
    }

    fn halt(&self, shared: &mut Shared, reason: &str) {
        error!(reason, "engine halted");
        self.running.store(false, Ordering::SeqCst);
        shared.failure = Some(reason.to_string());
        shared.open = None;
        shared.stopped = true;
        if let Err(e) = self.scratch.purge() {
            warn!(error = %e, "failed to purge scratch directory");
        }
    }

    /// Fill `block` completely from the playlist.
    ///
    /// Returns the number of frames carrying audio: the full block length
    /// except when the playlist drains for good, in which case the rest is
    /// silence. A paused engine yields a full block of silence, and so does a
    /// playlist that cycles without any track yielding audio.
    pub fn produce(&self, mut block: FrameBlock<'_>, buf: &mut Vec<u8>) -> Result<usize> {
        let n = block.frames();
        let channels = usize::from(self.layout.count());
        let frame_bytes = self.layout.frame_bytes();

        let mut guard = self.lock();
        let mut produced = 0;
        // Track changes in a row that found no audio; one full cycle is the limit.
        let mut empty_changes = 0;
        let cycle = self.tracks.len().max(1);

        while produced < n {
            if guard.playback.paused {
                block.silence_from(produced);
                return Ok(n);
            }

            let want = (n - produced).min(self.chunk_size);
            let (frames, gain) = match guard.open.as_mut() {
                Some(open) => read_chunk(open, buf, want, frame_bytes),
                None => {
                    block.silence_from(produced);
                    // Not drained means a controller call is loading the next track.
                    return Ok(if guard.is_drained() { produced } else { n });
                }
            };

            if frames == 0 {
                if empty_changes >= cycle {
                    debug!(empty_changes, "no track yielded audio, emitting silence");
                    block.silence_from(produced);
                    return Ok(n);
                }
                empty_changes += 1;
                guard = match self.change_track(guard, Step::Advance) {
                    Ok(guard) => guard,
                    Err(e) => {
                        block.silence_from(produced);
                        return Err(e);
                    }
                };
                continue;
            }

            empty_changes = 0;
            let mut samples = [0i16; 2];
            for (i, frame) in buf[..frames * frame_bytes]
                .chunks_exact(frame_bytes)
                .enumerate()
            {
                for (c, raw) in frame.chunks_exact(BYTES_PER_SAMPLE).enumerate() {
                    samples[c] = scale(i16::from_le_bytes([raw[0], raw[1]]), gain);
                }
                block.put(produced + i, &samples[..channels]);
            }
            produced += frames;

            if frames < want {
                guard = match self.change_track(guard, Step::Advance) {
                    Ok(guard) => guard,
                    Err(e) => {
                        block.silence_from(produced);
                        return Err(e);
                    }
                };
            }
        }

        Ok(produced)
    }

    /// Close the open track, delete temp artifacts and clear the running flag.
    /// Safe to call any number of times from any thread.
    pub fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        let mut guard = self.lock();
        guard.stopped = true;
        guard.generation = guard.generation.wrapping_add(1);
        let open = guard.open.take();
        drop(guard);
        drop(open);

        if let Err(e) = self.scratch.purge() {
            warn!(error = %e, "failed to purge scratch directory");
        }
        if was_running {
            info!("engine stopped");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one sub-chunk; a read error ends the track like EOF would.
fn read_chunk(open: &mut OpenTrack, buf: &mut Vec<u8>, want: usize, frame_bytes: usize) -> (usize, f32) {
    let bytes = match open.read_frames(buf, want) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %open.path().display(), error = %e, "read failed, ending track");
            0
        }
    };
    // A trailing partial frame is dropped.
    (bytes / frame_bytes, open.gain() as f32)
}

fn scale(sample: i16, gain: f32) -> i16 {
    let limit = FULL_SCALE as f32;
    (f32::from(sample) * gain).clamp(-limit, limit) as i16
}

/// The engine's [`FrameSource`] handle. Owns the raw read buffer so pulls don't allocate.
pub struct Producer {
    engine: Arc<Engine>,
    buf: Vec<u8>,
}

impl Producer {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            buf: Vec::new(),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Pull into an interleaved buffer in the engine's own channel layout.
    pub fn produce_interleaved(&mut self, out: &mut [i16]) -> Result<usize> {
        let channels = self.engine.layout().count();
        self.pull(FrameBlock::Interleaved {
            samples: out,
            channels,
        })
    }
}

impl FrameSource for Producer {
    fn layout(&self) -> ChannelLayout {
        self.engine.layout()
    }

    fn pull(&mut self, block: FrameBlock<'_>) -> Result<usize> {
        self.engine.produce(block, &mut self.buf)
    }
}
