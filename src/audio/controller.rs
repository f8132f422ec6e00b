//! Transport controls for a running [`Engine`].
//!
//! Every operation takes the engine lock, so controls issued from the input
//! thread interleave safely with pulls from the output thread.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::Result;

use super::engine::{Engine, Step};
use super::types::{PlayMode, Status};

#[derive(Clone)]
pub struct Controller {
    engine: Arc<Engine>,
}

impl Controller {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Flip the pause flag and return the new value.
    pub fn toggle_pause(&self) -> bool {
        let mut shared = self.engine.lock();
        let streaming = shared.open.is_some();
        shared.playback.tick(Instant::now(), streaming);
        shared.playback.paused = !shared.playback.paused;
        info!(paused = shared.playback.paused, "pause toggled");
        shared.playback.paused
    }

    pub fn seek_forward(&self, seconds: f64) {
        self.seek_by(seconds.abs());
    }

    pub fn seek_backward(&self, seconds: f64) {
        self.seek_by(-seconds.abs());
    }

    /// Queue a relative seek. It takes effect at the next [`update_position`](Self::update_position).
    pub fn seek_by(&self, seconds: f64) {
        let mut shared = self.engine.lock();
        let streaming = shared.open.is_some();
        shared.playback.tick(Instant::now(), streaming);
        shared.playback.queue_seek(seconds);
        debug!(
            delta = seconds,
            pending = shared.playback.pending_seek_seconds,
            "seek queued"
        );
    }

    /// Jump to the next track per the play mode. Repeat-one moves on.
    pub fn next_track(&self) -> Result<()> {
        let shared = self.engine.lock();
        info!("next track");
        self.engine.change_track(shared, Step::Skip).map(drop)
    }

    /// Restart the current track if more than the restart threshold has
    /// elapsed, otherwise go to the previous entry in play order.
    pub fn previous_track(&self) -> Result<()> {
        let mut shared = self.engine.lock();
        let streaming = shared.open.is_some();
        shared.playback.tick(Instant::now(), streaming);

        if shared.playback.elapsed_seconds > self.engine.restart_threshold_secs() {
            if let Some(open) = shared.open.as_mut() {
                match open.rewind() {
                    Ok(()) => {
                        info!("restarting track");
                        shared.playback.reset_position(Instant::now());
                        return Ok(());
                    }
                    Err(e) => warn!(error = %e, "rewind failed, reopening"),
                }
            }
        }

        info!("previous track");
        self.engine.change_track(shared, Step::Back).map(drop)
    }

    pub fn set_mode(&self, mode: PlayMode) {
        let mut shared = self.engine.lock();
        shared.playlist.set_mode(mode);
        info!(mode = mode.label(), "play mode changed");
    }

    /// Advance to the next mode in `Sequential -> Shuffle -> RepeatOne` order.
    pub fn cycle_mode(&self) -> PlayMode {
        let mut shared = self.engine.lock();
        let mode = shared.playlist.mode().cycle();
        shared.playlist.set_mode(mode);
        info!(mode = mode.label(), "play mode changed");
        mode
    }

    pub fn set_repeat(&self, repeat: bool) {
        self.engine.lock().playlist.set_repeat(repeat);
        info!(repeat, "repeat changed");
    }

    pub fn toggle_repeat(&self) -> bool {
        let mut shared = self.engine.lock();
        let repeat = !shared.playlist.repeat();
        shared.playlist.set_repeat(repeat);
        info!(repeat, "repeat changed");
        repeat
    }

    /// Integrate elapsed time and apply any pending seek. Call periodically.
    pub fn update_position(&self) {
        self.update_position_at(Instant::now());
    }

    pub fn update_position_at(&self, now: Instant) {
        let mut guard = self.engine.lock();
        let shared = &mut *guard;
        let streaming = shared.open.is_some();
        shared.playback.tick(now, streaming);

        let pending = shared.playback.pending_seek_seconds;
        if pending == 0.0 {
            return;
        }
        shared.playback.pending_seek_seconds = 0.0;

        let Some(open) = shared.open.as_mut() else {
            return;
        };
        match open.seek_by(pending) {
            Ok(applied) => {
                let elapsed = (shared.playback.elapsed_seconds + applied).max(0.0);
                shared.playback.elapsed_seconds = elapsed;
                debug!(requested = pending, applied, elapsed, "seek applied");
            }
            Err(e) => warn!(error = %e, "seek failed"),
        }
    }

    pub fn status(&self) -> Status {
        let shared = self.engine.lock();
        let tracks = self.engine.tracks();
        let index = shared
            .open
            .as_ref()
            .map(|open| open.index())
            .or_else(|| shared.playlist.current());
        let track = index.and_then(|i| tracks.get(i));

        Status {
            title: track.map(|t| t.title.clone()),
            file_name: track.map(|t| t.file_name()),
            index,
            track_count: tracks.len(),
            elapsed: Duration::from_secs_f64(shared.playback.elapsed_seconds.max(0.0)),
            duration: track.and_then(|t| t.duration),
            gain: shared.open.as_ref().map(|open| open.gain()),
            mode: shared.playlist.mode(),
            repeat: shared.playlist.repeat(),
            paused: shared.playback.paused,
            drained: shared.is_drained(),
            error: shared.failure.clone(),
        }
    }

    /// `<file> [mm:ss] <mode> <state>`.
    pub fn describe(&self) -> String {
        self.status().describe()
    }

    pub fn stop(&self) {
        self.engine.stop();
    }
}
