//! Format normalization: decide whether a track can be streamed as-is and
//! drive the external transcoder when it cannot.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::library::{Codec, Track};

use super::artifact::{ScratchDir, TempArtifact};
use super::types::{ChannelLayout, TARGET_SAMPLE_RATE};

/// Header fields relevant to the streamability decision.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WavProbe {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub integer: bool,
}

pub fn probe_wav(path: &Path) -> Result<WavProbe> {
    let reader = hound::WavReader::open(path).map_err(|e| Error::ProbeFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let spec = reader.spec();
    Ok(WavProbe {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        integer: spec.sample_format == hound::SampleFormat::Int,
    })
}

/// Where the bytes of a track come from.
#[derive(Debug)]
pub enum Resolved {
    /// The original file already matches the stream format.
    Direct(PathBuf),
    /// A transcoded copy in the scratch directory.
    Transcoded(TempArtifact),
}

impl Resolved {
    pub fn path(&self) -> &Path {
        match self {
            Self::Direct(p) => p,
            Self::Transcoded(a) => a.path(),
        }
    }

    pub fn owns_temp(&self) -> bool {
        matches!(self, Self::Transcoded(_))
    }
}

pub struct Normalizer {
    program: PathBuf,
    layout: ChannelLayout,
    scratch: Arc<ScratchDir>,
}

impl Normalizer {
    pub fn new(program: impl Into<PathBuf>, layout: ChannelLayout, scratch: Arc<ScratchDir>) -> Self {
        Self {
            program: program.into(),
            layout,
            scratch,
        }
    }

    /// A track streams directly only if it is a 44.1 kHz, 16-bit integer WAV
    /// with the configured channel count. Unreadable headers mean "convert".
    pub fn needs_conversion(&self, track: &Track) -> bool {
        if track.codec != Codec::Wav {
            return true;
        }
        match probe_wav(&track.path) {
            Ok(probe) => {
                probe.sample_rate != TARGET_SAMPLE_RATE
                    || probe.channels != self.layout.count()
                    || probe.bits_per_sample != 16
                    || !probe.integer
            }
            Err(e) => {
                debug!(error = %e, "probe failed, converting");
                true
            }
        }
    }

    pub fn resolve(&self, track: &Track) -> Result<Resolved> {
        if !self.needs_conversion(track) {
            return Ok(Resolved::Direct(track.path.clone()));
        }
        self.transcode(track).map(Resolved::Transcoded)
    }

    fn transcode(&self, track: &Track) -> Result<TempArtifact> {
        let failed = |reason: String| Error::TranscodeFailed {
            track: track.path.clone(),
            reason,
        };

        let stem = track
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("track");
        let artifact = self
            .scratch
            .allocate(stem)
            .map_err(|e| failed(format!("cannot create scratch file: {e}")))?;

        info!(
            src = %track.path.display(),
            out = %artifact.path().display(),
            channels = self.layout.count(),
            "transcoding"
        );

        let output = Command::new(&self.program)
            .args(self.arguments(&track.path, artifact.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| failed(format!("cannot run {}: {e}", self.program.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("").trim();
            let reason = if detail.is_empty() {
                format!("{} exited with {}", self.program.display(), output.status)
            } else {
                format!("{} exited with {}: {detail}", self.program.display(), output.status)
            };
            if let Err(e) = artifact.remove() {
                warn!(error = %e, "could not clean up failed transcode output");
            }
            return Err(failed(reason));
        }

        Ok(artifact)
    }

    /// Fixed transcoder arguments: force rate, channel count and 16-bit PCM,
    /// and strip metadata so the output header stays at 44 bytes.
    pub fn arguments(&self, src: &Path, out: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(src.as_os_str().to_owned());
        args.extend(
            [
                "-ar".to_string(),
                TARGET_SAMPLE_RATE.to_string(),
                "-ac".to_string(),
                self.layout.count().to_string(),
                "-c:a".to_string(),
                "pcm_s16le".to_string(),
                "-map_metadata".to_string(),
                "-1".to_string(),
                "-fflags".to_string(),
                "+bitexact".to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(out.as_os_str().to_owned());
        args
    }
}
