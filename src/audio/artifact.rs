//! Scratch directory and transcoded temp files.
//!
//! A [`TempArtifact`] deletes its file when dropped, so whoever owns the open
//! track owns the artifact's lifetime. The [`ScratchDir`] itself is purged on
//! startup and shutdown to catch leftovers from a crashed run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Create `root` if needed and remove any regular files left in it.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        let dir = Self { root };
        let removed = dir.purge()?;
        if removed > 0 {
            debug!(removed, dir = %dir.root.display(), "purged stale scratch files");
        }
        Ok(dir)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Remove every regular file directly inside the scratch directory.
    pub fn purge(&self) -> io::Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(removed)
    }

    /// Reserve a uniquely named `<stem>_XXXXXX.wav` file for a transcode.
    pub fn allocate(&self, stem: &str) -> io::Result<TempArtifact> {
        let path = tempfile::Builder::new()
            .prefix(&format!("{stem}_"))
            .suffix(".wav")
            .tempfile_in(&self.root)?
            .into_temp_path();
        Ok(TempArtifact { path })
    }
}

/// A transcoded file owned by exactly one open track.
#[derive(Debug)]
pub struct TempArtifact {
    path: TempPath,
}

impl TempArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now, reporting failures instead of ignoring them.
    pub fn remove(self) -> io::Result<()> {
        let shown = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => {
                debug!(path = %shown.display(), "temp artifact removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(path = %shown.display(), error = %e, "failed to remove temp artifact");
                Err(e)
            }
        }
    }
}
