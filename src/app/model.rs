//! Application model types: `App` and `TransportState`.
//!
//! The `App` struct holds the catalog titles, the latest engine [`Status`]
//! snapshot and the browsing cursor used by the UI and runtime.

use crate::audio::Status;
use crate::library::Track;

/// The transport state shown to the user and to MPRIS.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn from_status(status: &Status) -> Self {
        if status.drained {
            Self::Stopped
        } else if status.paused {
            Self::Paused
        } else {
            Self::Playing
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
        }
    }
}

/// One catalog row as the UI lists it.
#[derive(Clone, Debug)]
pub struct TrackRow {
    pub title: String,
    pub file_name: String,
    pub path: String,
    pub duration: Option<std::time::Duration>,
}

impl From<&Track> for TrackRow {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            file_name: track.file_name(),
            path: track.path.display().to_string(),
            duration: track.duration,
        }
    }
}

/// The main application model.
pub struct App {
    pub tracks: Vec<TrackRow>,
    /// Browsing cursor into `tracks`.
    pub selected: usize,
    pub status: Option<Status>,

    pub follow_playback: bool,
    pub metadata_window: bool,

    pub music_dir: String,
    /// Carrier frequency in Hz, handed to the RF sink.
    pub frequency_hz: f64,
    /// Transmit gain in dB, handed to the RF sink.
    pub gain_db: f64,
}

impl App {
    /// Create a new `App` listing `tracks`.
    pub fn new(tracks: &[Track], music_dir: String, frequency_hz: f64, gain_db: f64) -> Self {
        Self {
            tracks: tracks.iter().map(TrackRow::from).collect(),
            selected: 0,
            status: None,
            follow_playback: true,
            metadata_window: false,
            music_dir,
            frequency_hz,
            gain_db,
        }
    }

    /// Store a fresh snapshot. Returns true when the track or transport state
    /// changed, i.e. when observers such as MPRIS need an update.
    pub fn refresh(&mut self, status: Status) -> bool {
        let changed = match &self.status {
            Some(prev) => {
                prev.index != status.index
                    || TransportState::from_status(prev) != TransportState::from_status(&status)
                    || prev.mode != status.mode
                    || prev.repeat != status.repeat
            }
            None => true,
        };
        if self.follow_playback {
            if let Some(idx) = status.index {
                self.selected = idx.min(self.tracks.len().saturating_sub(1));
            }
        }
        self.status = Some(status);
        changed
    }

    pub fn transport(&self) -> TransportState {
        self.status
            .as_ref()
            .map(TransportState::from_status)
            .unwrap_or_default()
    }

    /// Catalog index currently streaming.
    pub fn now_playing(&self) -> Option<usize> {
        self.status.as_ref().and_then(|s| s.index)
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    /// `100.500 MHz` style label for the header.
    pub fn frequency_label(&self) -> String {
        format!("{:.3} MHz", self.frequency_hz / 1_000_000.0)
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    /// Enable following playback (cursor follows the streaming track).
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
        if let Some(idx) = self.now_playing() {
            self.selected = idx;
        }
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    /// Move selection down, wrapping to the top.
    pub fn next(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + 1) % self.tracks.len();
        }
    }

    /// Move selection up, wrapping to the bottom.
    pub fn prev(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + self.tracks.len() - 1) % self.tracks.len();
        }
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.tracks.len().saturating_sub(1);
    }
}
