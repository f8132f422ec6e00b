use std::path::{Path, PathBuf};
use std::time::Duration;

/// Container/codec hint derived from the file extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Codec {
    Wav,
    Mp3,
    Flac,
    Ogg,
    /// Any other allow-listed extension; always transcoded.
    Other,
}

impl Codec {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("wav") | Some("wave") => Self::Wav,
            Some("mp3") => Self::Mp3,
            Some("flac") => Self::Flac,
            Some("ogg") | Some("oga") => Self::Ogg,
            _ => Self::Other,
        }
    }
}

/// One catalog entry. Never mutated after enumeration.
#[derive(Debug, Clone)]
pub struct Track {
    pub path: PathBuf,
    pub codec: Codec,
    pub title: String,
    pub duration: Option<Duration>,
}

impl Track {
    /// File name including extension, as shown in the status line.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string()
    }
}
