//! The streaming handle for the track currently being read.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::normalize::Resolved;
use super::types::{ChannelLayout, TARGET_SAMPLE_RATE, WAV_HEADER_LEN};

#[derive(Debug)]
pub struct OpenTrack {
    /// Catalog index this handle was opened for.
    index: usize,
    /// Keeps a transcoded artifact alive for as long as the handle exists.
    source: Resolved,
    file: File,
    cursor: u64,
    len: u64,
    gain: f64,
    frame_bytes: usize,
}

impl OpenTrack {
    /// Open the resolved stream and position the cursor just past the header.
    pub fn open(index: usize, source: Resolved, gain: f64, layout: ChannelLayout) -> io::Result<Self> {
        let mut file = File::open(source.path())?;
        let len = file.metadata()?.len();
        let cursor = WAV_HEADER_LEN.min(len);
        file.seek(SeekFrom::Start(cursor))?;
        Ok(Self {
            index,
            source,
            file,
            cursor,
            len,
            gain,
            frame_bytes: layout.frame_bytes(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        self.source.path()
    }

    pub fn is_transcoded(&self) -> bool {
        self.source.owns_temp()
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Byte offset of the next read.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Read up to `frames` frames of raw PCM into `buf`, returning the byte count.
    ///
    /// Keeps reading until the request is satisfied or the file ends, so a
    /// short count always means end of stream.
    pub fn read_frames(&mut self, buf: &mut Vec<u8>, frames: usize) -> io::Result<usize> {
        let want = frames * self.frame_bytes;
        buf.resize(want, 0);
        let mut filled = 0;
        while filled < want {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.cursor += filled as u64;
        buf.truncate(filled);
        Ok(filled)
    }

    /// Move back to the first sample.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.seek_to(WAV_HEADER_LEN.min(self.len))
    }

    /// Move the cursor by `seconds` (negative = backwards), frame aligned and
    /// clamped to the PCM payload. Returns the offset actually applied, in seconds.
    ///
    /// On error the cursor is left where it was.
    pub fn seek_by(&mut self, seconds: f64) -> io::Result<f64> {
        let bytes_per_second = f64::from(TARGET_SAMPLE_RATE) * self.frame_bytes as f64;
        let frame = self.frame_bytes as i64;
        let delta_frames = (seconds * f64::from(TARGET_SAMPLE_RATE)).round() as i64;

        let header = WAV_HEADER_LEN.min(self.len) as i64;
        let end = self.len as i64;
        let wanted = (self.cursor as i64 + delta_frames * frame).clamp(header, end);
        let aligned = header + (wanted - header) / frame * frame;

        let previous = self.cursor;
        self.seek_to(aligned as u64)?;
        Ok((aligned - previous as i64) as f64 / bytes_per_second)
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.cursor = offset;
        Ok(())
    }
}
