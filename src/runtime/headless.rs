//! Control loop without a terminal UI.
//!
//! Commands arrive as lines on stdin (one command per line) and from MPRIS.
//! End of input on stdin quits, like an empty line does. The current status
//! line is logged whenever it changes.

use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::audio::Controller;
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::dispatch::apply_command;

/// Parse one stdin line. An empty line (plain Enter) quits.
pub fn parse_line(line: &str) -> Option<ControlCmd> {
    let cmd = match line.trim().to_ascii_lowercase().as_str() {
        "" | "q" | "quit" | "exit" => ControlCmd::Quit,
        "p" | "pause" | "play" => ControlCmd::PlayPause,
        "n" | "next" => ControlCmd::Next,
        "b" | "prev" | "previous" => ControlCmd::Prev,
        "f" | "+" | "forward" => ControlCmd::SeekForward,
        "r" | "-" | "rewind" => ControlCmd::SeekBackward,
        "m" | "mode" => ControlCmd::CycleMode,
        "repeat" => ControlCmd::ToggleRepeat,
        _ => return None,
    };
    Some(cmd)
}

/// Send one command per recognized line, then `Quit` once input ends.
pub fn forward_commands<R: BufRead>(input: R, tx: &mpsc::Sender<ControlCmd>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        match parse_line(&line) {
            Some(cmd) => {
                if tx.send(cmd).is_err() {
                    return;
                }
            }
            None => warn!(input = line.trim(), "unknown command"),
        }
    }
    info!("stdin closed, quitting");
    let _ = tx.send(ControlCmd::Quit);
}

/// Forward parsed stdin lines into `tx` from a detached reader thread.
pub fn spawn_stdin_reader(tx: mpsc::Sender<ControlCmd>) {
    let spawned = thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || forward_commands(std::io::stdin().lock(), &tx));
    if let Err(e) = spawned {
        warn!(error = %e, "stdin commands unavailable");
    }
}

/// Run until quit, engine halt, or a drained playlist.
pub fn run(
    settings: &config::Settings,
    controller: &Controller,
    mpris: &MprisHandle,
    control_rx: &mpsc::Receiver<ControlCmd>,
) {
    let tick = Duration::from_millis(settings.ui.refresh_ms.min(100));
    let mut last_seen = None;

    while controller.is_running() {
        match control_rx.recv_timeout(tick) {
            Ok(cmd) => {
                if apply_command(cmd, controller, settings) {
                    return;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => thread::sleep(tick),
        }

        controller.update_position();
        let status = controller.status();
        mpris.set_status(&status);

        // Log on track or state changes, not on every second of progress.
        let seen = (status.index, status.mode, status.state_label(), status.repeat);
        if last_seen != Some(seen) {
            info!(repeat = status.repeat, "{}", status.describe());
            last_seen = Some(seen);
        }

        if status.drained {
            info!("playlist finished");
            return;
        }
    }
}
