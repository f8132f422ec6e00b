use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::Controller;
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::dispatch::apply_command;
use crate::runtime::mpris_sync::update_mpris;
use crate::ui;

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    last_draw: Option<Instant>,
}

/// Main terminal event loop: handles input, UI drawing, position updates and
/// MPRIS. Returns `Ok(())` when shutdown is requested or the engine halts.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    controller: &Controller,
    mpris: &MprisHandle,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> anyhow::Result<()> {
    let refresh = Duration::from_millis(settings.ui.refresh_ms);

    while controller.is_running() {
        while let Ok(cmd) = control_rx.try_recv() {
            if apply_command(cmd, controller, settings) {
                return Ok(());
            }
        }

        let due = state.last_draw.is_none_or(|at| at.elapsed() >= refresh);
        if due {
            controller.update_position();
            // Keep MPRIS in sync even when changes come from media keys or auto-advance.
            if app.refresh(controller.status()) {
                update_mpris(mpris, app);
            }
            terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.controls))?;
            state.last_draw = Some(Instant::now());
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, controller, state) {
                    break;
                }
                // Show the effect of a key press right away.
                state.last_draw = None;
            }
        }
    }

    Ok(())
}

/// Map a key to a transport command, if it is one.
pub fn key_command(key: KeyEvent) -> Option<ControlCmd> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(ControlCmd::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(ControlCmd::Quit),
        KeyCode::Char('p') | KeyCode::Char(' ') => Some(ControlCmd::PlayPause),
        KeyCode::Char('l') | KeyCode::Right => Some(ControlCmd::Next),
        KeyCode::Char('h') | KeyCode::Left => Some(ControlCmd::Prev),
        KeyCode::Char('L') => Some(ControlCmd::SeekForward),
        KeyCode::Char('H') => Some(ControlCmd::SeekBackward),
        KeyCode::Char('s') | KeyCode::Char('m') => Some(ControlCmd::CycleMode),
        KeyCode::Char('r') => Some(ControlCmd::ToggleRepeat),
        _ => None,
    }
}

fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    controller: &Controller,
    state: &mut EventLoopState,
) -> bool {
    if let Some(cmd) = key_command(key) {
        state.pending_gg = false;
        return apply_command(cmd, controller, settings);
    }

    match key.code {
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.follow_playback_off();
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            state.pending_gg = false;
            app.follow_playback_off();
            app.select_last();
        }
        KeyCode::Char('j') | KeyCode::Down => {
            state.pending_gg = false;
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.pending_gg = false;
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Char('f') => {
            state.pending_gg = false;
            app.follow_playback_on();
        }
        KeyCode::Char('K') => {
            state.pending_gg = false;
            app.toggle_metadata_window();
        }
        KeyCode::Char(_) => {
            // g pending should clear on any other printable char
            state.pending_gg = false;
        }
        _ => {}
    }

    false
}
