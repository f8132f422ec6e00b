use tracing::error;

use crate::audio::Controller;
use crate::config;
use crate::mpris::ControlCmd;

/// Apply one transport command. Returns `true` when shutdown was requested.
///
/// Track-change failures are fatal: the engine has already halted itself, so
/// the error is only reported here and the loops exit on the running flag.
pub fn apply_command(cmd: ControlCmd, controller: &Controller, settings: &config::Settings) -> bool {
    let paused = || controller.status().paused;
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => {
            if paused() {
                controller.toggle_pause();
            }
        }
        // The engine keeps streaming silence while "stopped" from the desktop's view.
        ControlCmd::Pause | ControlCmd::Stop => {
            if !paused() {
                controller.toggle_pause();
            }
        }
        ControlCmd::PlayPause => {
            controller.toggle_pause();
        }
        ControlCmd::Next => {
            if let Err(e) = controller.next_track() {
                error!(error = %e, "next track failed");
            }
        }
        ControlCmd::Prev => {
            if let Err(e) = controller.previous_track() {
                error!(error = %e, "previous track failed");
            }
        }
        ControlCmd::SeekForward => controller.seek_forward(settings.controls.seek_seconds),
        ControlCmd::SeekBackward => controller.seek_backward(settings.controls.seek_seconds),
        ControlCmd::CycleMode => {
            controller.cycle_mode();
        }
        ControlCmd::ToggleRepeat => {
            controller.toggle_repeat();
        }
    }
    false
}
