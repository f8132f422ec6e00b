//! Error taxonomy for the streaming engine.
//!
//! Only structural failures (empty catalog, failed transcode, unusable output)
//! are ever returned to callers. Probe failures, unsupported sample widths and
//! out-of-range seeks are handled where they occur and exist here so internal
//! helpers can report them before a safe default is substituted.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No file under the music directory matched the extension allow-list.
    #[error("no audio files found in {}", .0.display())]
    EmptyCatalog(PathBuf),

    /// The external transcoder could not produce a canonical WAV for `track`.
    #[error("transcoding {} failed: {reason}", track.display())]
    TranscodeFailed { track: PathBuf, reason: String },

    /// The WAV header could not be read.
    #[error("could not probe {}: {reason}", path.display())]
    ProbeFailed { path: PathBuf, reason: String },

    /// Peak scanning only understands 16-bit integer PCM.
    #[error("unsupported sample width: {0} bits")]
    UnsupportedSampleWidth(u16),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The local monitor output could not be opened.
    #[error("audio output error: {0}")]
    Output(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
