//! Peak-based gain analysis.

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

use super::types::FULL_SCALE;

/// Hard upper bound on any per-track gain, whatever the configuration says.
pub const GAIN_CEILING: f64 = 2.0;

/// Frames scanned per buffer while looking for the peak.
const SCAN_FRAMES: usize = 4096;

#[derive(Debug, Copy, Clone)]
pub struct GainAnalyzer {
    headroom: f64,
    max_gain: f64,
}

impl Default for GainAnalyzer {
    fn default() -> Self {
        Self::new(0.98, 2.0)
    }
}

impl GainAnalyzer {
    pub fn new(headroom: f64, max_gain: f64) -> Self {
        Self {
            headroom,
            max_gain: max_gain.min(GAIN_CEILING),
        }
    }

    /// Gain that brings the file's loudest sample to `headroom` of full scale.
    ///
    /// Files that cannot be scanned are treated as already peaking at full scale.
    pub fn analyze(&self, path: &Path) -> f64 {
        let peak = match scan_peak(path) {
            Ok(peak) => peak,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "peak scan unavailable, assuming full scale");
                FULL_SCALE as u32
            }
        };
        let gain = self.gain_for_peak(peak);
        debug!(path = %path.display(), peak, gain, "gain analyzed");
        gain
    }

    pub fn gain_for_peak(&self, peak: u32) -> f64 {
        if peak == 0 {
            return 1.0;
        }
        let gain = self.headroom * FULL_SCALE / f64::from(peak);
        gain.min(self.max_gain)
    }
}

/// Largest absolute sample over all channels, streamed in bounded buffers.
pub fn scan_peak(path: &Path) -> Result<u32> {
    let mut reader = hound::WavReader::open(path).map_err(|e| Error::ProbeFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let spec = reader.spec();
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(Error::UnsupportedSampleWidth(spec.bits_per_sample));
    }

    let buffer_len = SCAN_FRAMES * usize::from(spec.channels.max(1));
    let mut samples = reader.samples::<i16>();
    let mut buffer: Vec<i16> = Vec::with_capacity(buffer_len);
    let mut peak: u32 = 0;

    loop {
        buffer.clear();
        for sample in samples.by_ref().take(buffer_len) {
            let sample = sample.map_err(|e| Error::ProbeFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            buffer.push(sample);
        }
        if buffer.is_empty() {
            break;
        }
        let local = buffer
            .iter()
            .map(|&s| u32::from(s.unsigned_abs()))
            .max()
            .unwrap_or(0);
        peak = peak.max(local);
    }

    Ok(peak)
}
