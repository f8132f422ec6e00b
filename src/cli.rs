//! Command-line arguments.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{ChannelSetting, PlayModeSetting, Settings};

/// Where the produced PCM goes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    /// Play through the default audio device.
    Monitor,
    /// Raw interleaved s16le on stdout, for an external modulator.
    Stdout,
}

#[derive(Parser, Debug)]
#[command(name = "fmcast")]
#[command(about = "Stream a music directory as gain-normalized 44.1 kHz PCM")]
#[command(version)]
pub struct Args {
    /// Directory containing the music library
    #[arg(short, long, env = "FMCAST_DIR")]
    pub dir: PathBuf,

    /// Transmit frequency in Hz
    #[arg(short, long)]
    pub frequency: f64,

    /// Transmit gain in dB
    #[arg(short, long, allow_negative_numbers = true)]
    pub gain: f64,

    /// Start in shuffle mode
    #[arg(short, long)]
    pub shuffle: bool,

    /// Stream a single channel instead of stereo
    #[arg(long)]
    pub mono: bool,

    /// Output sink for the stream
    #[arg(long, value_enum, default_value_t = OutputKind::Monitor)]
    pub output: OutputKind,

    /// Run without the terminal interface; control via stdin lines (EOF quits)
    #[arg(long)]
    pub no_tui: bool,

    /// Path to a config file (overrides FMCAST_CONFIG_PATH)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Fold flags into the loaded settings. Flags win over config.
    pub fn apply(&self, settings: &mut Settings) {
        if self.shuffle {
            settings.playback.mode = PlayModeSetting::Shuffle;
        }
        if self.mono {
            settings.audio.channels = ChannelSetting::Mono;
        }
    }

    /// The TUI needs the terminal; stdout output and non-tty sessions run headless.
    pub fn use_tui(&self) -> bool {
        !self.no_tui && self.output == OutputKind::Monitor && std::io::stdout().is_terminal()
    }
}
