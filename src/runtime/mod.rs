use std::sync::mpsc;

use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info, warn};

use crate::app::App;
use crate::audio::Controller;
use crate::cli::Args;
use crate::mpris::ControlCmd;

mod dispatch;
mod event_loop;
mod headless;
mod logging;
mod mpris_sync;
mod output;
mod settings;
mod signals;
mod startup;

pub use dispatch::apply_command;
pub use event_loop::key_command;
pub use headless::parse_line;
pub use output::{Output, write_pcm};

pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let (mut settings, config_warning) = settings::load_settings(args.config.as_deref());
    args.apply(&mut settings);

    let tui = args.use_tui();
    let log_file = logging::init(&settings.logging, tui)?;
    if let Some(msg) = config_warning {
        warn!("{msg}");
    }
    info!(
        frequency_hz = args.frequency,
        gain_db = args.gain,
        output = ?args.output,
        log_file = ?log_file,
        "starting"
    );

    let engine = startup::build_engine(&args, &settings)?;
    let controller = Controller::new(engine.clone());

    let block_frames = settings.audio.chunk_size;
    let output = match Output::start(args.output, engine.clone(), block_frames) {
        Ok(output) => output,
        Err(e) => {
            controller.stop();
            return Err(e.into());
        }
    };

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    signals::spawn_signal_listener(control_tx.clone(), controller.clone());
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());

    let run_result = if tui {
        let mut app = App::new(
            engine.tracks(),
            args.dir.display().to_string(),
            args.frequency,
            args.gain,
        );
        run_tui(&settings, &mut app, &controller, &mpris, &control_rx)
    } else {
        headless::spawn_stdin_reader(control_tx);
        headless::run(&settings, &controller, &mpris, &control_rx);
        Ok(())
    };

    let failure = controller.status().error;
    controller.stop();
    output.finish();
    info!("shutdown complete");

    run_result?;
    if let Some(reason) = failure {
        error!(reason, "stream halted");
        anyhow::bail!("stream halted: {reason}");
    }
    Ok(())
}

fn run_tui(
    settings: &crate::config::Settings,
    app: &mut App,
    controller: &Controller,
    mpris: &crate::mpris::MprisHandle,
    control_rx: &mpsc::Receiver<ControlCmd>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(
        &mut terminal,
        settings,
        app,
        controller,
        mpris,
        control_rx,
        &mut state,
    );

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}
