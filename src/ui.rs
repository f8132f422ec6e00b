//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};

use crate::app::{App, TransportState};
use crate::audio::{Status, format_mmss};
use crate::config::{ControlsSettings, UiSettings};

/// Render the controls help text, incorporating the seek step.
fn controls_text(seek_seconds: f64) -> String {
    [
        "[space/p] play/pause".to_string(),
        "[h/l] prev/next".to_string(),
        format!("[H/L] seek -/+{seek_seconds}s"),
        "[s] mode".to_string(),
        "[r] repeat".to_string(),
        "[j/k] browse".to_string(),
        "[gg/G] top/bottom".to_string(),
        "[f] follow".to_string(),
        "[K] metadata".to_string(),
        "[q] quit".to_string(),
    ]
    .join(" | ")
}

/// `elapsed/total` when the duration is known.
fn position_text(status: &Status) -> String {
    match status.duration {
        Some(total) => format!("{}/{}", format_mmss(status.elapsed), format_mmss(total)),
        None => format_mmss(status.elapsed),
    }
}

fn status_text(app: &App) -> String {
    let Some(status) = &app.status else {
        return "Starting…".to_string();
    };
    let mut parts: Vec<String> = Vec::new();

    if let Some(err) = &status.error {
        parts.push(format!("HALTED: {err}"));
    }

    match (&status.title, status.index) {
        (Some(title), Some(idx)) if app.transport() != TransportState::Stopped => {
            parts.push(format!(
                "Song: {} [{}] ({}/{})",
                title,
                position_text(status),
                idx + 1,
                status.track_count
            ));
        }
        _ => {}
    }
    parts.push(app.transport().label().to_string());
    parts.push(format!("MODE: {}", status.mode.label()));
    parts.push(format!("REPEAT: {}", if status.repeat { "on" } else { "off" }));
    if let Some(gain) = status.gain {
        parts.push(format!("Gain: x{gain:.2}"));
    }
    parts.push(if app.follow_playback {
        "CURSOR: Follow".to_string()
    } else {
        "CURSOR: Free-roam".to_string()
    });
    parts.push(format!("Dir: {}", app.music_dir));

    parts.join(" • ")
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn left_padded(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding {
            left: 1,
            right: 0,
            top: 0,
            bottom: 0,
        })
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(frame: &mut Frame, app: &App, ui_settings: &UiSettings, controls_settings: &ControlsSettings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(format!(
        "{} • {} • {:+.1} dB",
        ui_settings.header_text,
        app.frequency_label(),
        app.gain_db
    ))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" fmcast ")
            .title_alignment(Alignment::Center),
    );
    frame.render_widget(header, chunks[0]);

    let status = Paragraph::new(status_text(app))
        .block(left_padded(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, chunks[1]);

    // Track list, windowed around the selection.
    {
        let total = app.tracks.len();
        let list_height = chunks[2].height.saturating_sub(2) as usize;
        let (start, end) = if total <= list_height || list_height == 0 {
            (0, total)
        } else {
            let half = list_height / 2;
            let start = app.selected.saturating_sub(half).min(total - list_height);
            (start, start + list_height)
        };

        let playing = app.now_playing();
        let items: Vec<ListItem> = (start..end)
            .map(|i| {
                let row = &app.tracks[i];
                let marker = if playing == Some(i) { "♪ " } else { "  " };
                ListItem::new(format!("{marker}{}", row.title))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(" playlist "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if total > 0 {
            state.select(Some(app.selected - start));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    if app.metadata_window {
        let popup_area = centered_rect_sized(72, 8, chunks[2]);
        frame.render_widget(Clear, popup_area);

        let meta = match app.tracks.get(app.selected) {
            Some(row) => format!(
                "Title: {}\nFile: {}\nDuration: {}\nPath: {}",
                row.title,
                row.file_name,
                row.duration.map(format_mmss).unwrap_or_else(|| "-".to_string()),
                row.path
            ),
            None => "No track selected".to_string(),
        };
        let popup = Paragraph::new(meta)
            .block(left_padded(" metadata (K closes) "))
            .wrap(Wrap { trim: true });
        frame.render_widget(popup, popup_area);
    }

    let footer = Paragraph::new(controls_text(controls_settings.seek_seconds))
        .block(left_padded(" controls "))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[3]);
}
