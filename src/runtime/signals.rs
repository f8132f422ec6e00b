//! Interrupt and termination signals.
//!
//! A signal is turned into a regular `Quit` command so shutdown always goes
//! through the same teardown as a quit key: engine stop, artifact purge,
//! output join.

use std::sync::mpsc::Sender;
use std::thread;

use tokio::signal;
use tracing::{info, warn};

use crate::audio::Controller;
use crate::mpris::ControlCmd;

/// Ask the control loop to quit. If nothing listens anymore, stop the engine directly.
pub fn request_shutdown(tx: &Sender<ControlCmd>, controller: &Controller) {
    if tx.send(ControlCmd::Quit).is_err() {
        controller.stop();
    }
}

/// Listen for SIGINT/SIGTERM on a background thread.
pub fn spawn_signal_listener(tx: Sender<ControlCmd>, controller: Controller) {
    let spawned = thread::Builder::new().name("signals".into()).spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "signal handling unavailable");
                return;
            }
        };
        runtime.block_on(shutdown_signal());
        request_shutdown(&tx, &controller);
    });
    if let Err(e) = spawned {
        warn!(error = %e, "signal handling unavailable");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, mpsc};

    use super::*;
    use crate::audio::{Engine, EngineOptions, GainAnalyzer, Normalizer, ScratchDir};
    use crate::library::{Codec, Track};

    fn controller(dir: &std::path::Path) -> Controller {
        let path = dir.join("a.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..20 {
            writer.write_sample(100i16).unwrap();
        }
        writer.finalize().unwrap();

        let track = Track {
            codec: Codec::Wav,
            title: "a".into(),
            duration: None,
            path,
        };
        let options = EngineOptions::default();
        let scratch = Arc::new(ScratchDir::open(dir.join("temp")).unwrap());
        let normalizer = Normalizer::new("ffmpeg", options.layout, scratch.clone());
        let engine = Engine::new(vec![track], options, normalizer, GainAnalyzer::default(), scratch).unwrap();
        Controller::new(Arc::new(engine))
    }

    #[test]
    fn shutdown_request_reaches_the_control_loop() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        let (tx, rx) = mpsc::channel();

        request_shutdown(&tx, &controller);
        assert_eq!(rx.try_recv(), Ok(ControlCmd::Quit));
        assert!(controller.is_running());
    }

    #[test]
    fn shutdown_without_a_loop_stops_the_engine() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        let (tx, rx) = mpsc::channel();
        drop(rx);

        request_shutdown(&tx, &controller);
        assert!(!controller.is_running());
    }
}
