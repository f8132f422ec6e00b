use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::audio::Engine;
use crate::cli::Args;
use crate::config;
use crate::library::scan;

/// Enumerate the library and open the first track.
pub fn build_engine(args: &Args, settings: &config::Settings) -> anyhow::Result<Arc<Engine>> {
    let tracks = scan(&args.dir, &settings.library)
        .with_context(|| format!("cannot build playlist from {}", args.dir.display()))?;
    info!(
        dir = %args.dir.display(),
        tracks = tracks.len(),
        mode = ?settings.playback.mode,
        repeat = settings.playback.repeat,
        channels = ?settings.audio.channels,
        "library scanned"
    );

    let engine = Engine::from_settings(tracks, settings).context("cannot start the stream")?;
    Ok(Arc::new(engine))
}
