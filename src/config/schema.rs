use std::path::PathBuf;

use serde::Deserialize;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/fmcast/config.toml` or `~/.config/fmcast/config.toml`
///
/// Precedence (highest wins):
/// 1) Command-line flags (applied by the runtime after loading)
/// 2) Environment variables (prefix `FMCAST__`, `__` as nested separator)
/// 3) Config file (if present)
/// 4) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub transcoder: TranscoderSettings,
    pub controls: ControlsSettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Maximum frames read from the open track per sub-read.
    pub chunk_size: usize,
    /// Fraction of full scale the loudest sample of a track is normalized to.
    pub headroom: f64,
    /// Upper bound on the per-track gain.
    pub max_gain: f64,
    pub channels: ChannelSetting,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            headroom: 0.98,
            max_gain: 2.0,
            channels: ChannelSetting::Stereo,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelSetting {
    Mono,
    Stereo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Play-order policy the engine starts with.
    pub mode: PlayModeSetting,
    /// Wrap around (or reshuffle) once the playlist is exhausted.
    pub repeat: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            mode: PlayModeSetting::Sequential,
            repeat: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayModeSetting {
    #[serde(alias = "seq", alias = "in-order", alias = "in_order")]
    Sequential,
    #[serde(alias = "random")]
    Shuffle,
    #[serde(
        alias = "repeatone",
        alias = "repeat_one",
        alias = "loop-one",
        alias = "loop_one"
    )]
    RepeatOne,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["wav".into(), "mp3".into(), "flac".into(), "ogg".into()],
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscoderSettings {
    /// Executable invoked to convert tracks into 44.1 kHz 16-bit WAV.
    pub program: PathBuf,
    /// Scratch directory for transcoded files. Cleared at startup and shutdown.
    pub scratch_dir: PathBuf,
}

impl Default for TranscoderSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            scratch_dir: PathBuf::from("temp"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to seek when pressing `H` / `L`.
    pub seek_seconds: f64,
    /// "Previous" restarts the current track once more than this many seconds have played.
    pub restart_threshold_secs: f64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            seek_seconds: 10.0,
            restart_threshold_secs: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// Interval of the display-refresh tick (milliseconds).
    pub refresh_ms: u64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ fmcast: on the air ~ ".to_string(),
            refresh_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// Log file. When unset, logs go to stderr unless the TUI owns the terminal.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
