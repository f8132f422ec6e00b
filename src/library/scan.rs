use std::cmp::Ordering;
use std::path::Path;
use std::time::Duration;

use lofty::prelude::*;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::LibrarySettings;
use crate::error::{Error, Result};

use super::model::{Codec, Track};

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Files before subdirectories, then by name, so each directory's tracks stay contiguous.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn read_tags(path: &Path) -> (Option<String>, Option<Duration>) {
    match lofty::read_from_path(path) {
        Ok(tagged) => {
            let duration = Some(tagged.properties().duration()).filter(|d| !d.is_zero());
            let title = tagged
                .primary_tag()
                .or_else(|| tagged.first_tag())
                .and_then(|tag| tag.title().map(|t| t.trim().to_string()))
                .filter(|t| !t.is_empty());
            (title, duration)
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable tags");
            (None, None)
        }
    }
}

/// Walk `dir` and return every allow-listed audio file as a [`Track`].
///
/// Order is deterministic: within each directory level, files come first in
/// lexicographic order, followed by subdirectories in lexicographic order.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Result<Vec<Track>> {
    let root = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(&root)
        .follow_links(settings.follow_links)
        .sort_by(files_first);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, settings) {
            continue;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        let (title, duration) = read_tags(path);

        tracks.push(Track {
            path: path.to_path_buf(),
            codec: Codec::from_path(path),
            title: title.unwrap_or(stem),
            duration,
        });
    }

    if tracks.is_empty() {
        return Err(Error::EmptyCatalog(root));
    }

    debug!(count = tracks.len(), root = %root.display(), "catalog enumerated");
    Ok(tracks)
}
