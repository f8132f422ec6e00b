//! Consumers of the pull API that ship with the binary.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{error, info};

use crate::audio::{Engine, MonitorSource, Producer};
use crate::cli::OutputKind;
use crate::error::{Error, Result};

pub enum Output {
    /// Local playback; the stream must outlive the sink.
    Monitor { _stream: OutputStream, sink: Sink },
    /// Writer thread pushing raw PCM to stdout.
    Stdout(JoinHandle<()>),
}

impl Output {
    pub fn start(kind: OutputKind, engine: Arc<Engine>, block_frames: usize) -> Result<Self> {
        match kind {
            OutputKind::Monitor => {
                let mut stream = OutputStreamBuilder::open_default_stream()
                    .map_err(|e| Error::Output(e.to_string()))?;
                // rodio logs to stderr when OutputStream is dropped, which would garble the TUI.
                stream.log_on_drop(false);
                let sink = Sink::connect_new(stream.mixer());
                sink.append(MonitorSource::new(engine, block_frames));
                info!("monitor output started");
                Ok(Self::Monitor {
                    _stream: stream,
                    sink,
                })
            }
            OutputKind::Stdout => {
                let handle = thread::Builder::new()
                    .name("pcm-writer".into())
                    .spawn(move || write_pcm(engine, block_frames, io::stdout()))?;
                info!("stdout output started");
                Ok(Self::Stdout(handle))
            }
        }
    }

    /// Tear down after the engine has been stopped.
    pub fn finish(self) {
        match self {
            Self::Monitor { _stream, sink } => sink.stop(),
            Self::Stdout(handle) => {
                if handle.join().is_err() {
                    error!("pcm writer panicked");
                }
            }
        }
    }
}

/// Pull fixed blocks and write them as interleaved little-endian `i16` until
/// the engine stops or the reader goes away.
pub fn write_pcm<W: Write>(engine: Arc<Engine>, block_frames: usize, mut out: W) {
    let channels = usize::from(engine.layout().count());
    let mut producer = Producer::new(engine.clone());
    let mut block = vec![0i16; block_frames.max(1) * channels];
    let mut bytes = Vec::with_capacity(block.len() * 2);

    while engine.is_running() {
        if let Err(e) = producer.produce_interleaved(&mut block) {
            error!(error = %e, "stream halted");
            break;
        }
        bytes.clear();
        for sample in &block {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        if let Err(e) = out.write_all(&bytes).and_then(|()| out.flush()) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                info!("stdout reader closed, stopping");
            } else {
                error!(error = %e, "stdout write failed");
            }
            engine.stop();
            break;
        }
    }
}
