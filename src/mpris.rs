//! MPRIS D-Bus service so desktop media keys and `playerctl` can drive the stream.
//!
//! Incoming method calls are forwarded as [`ControlCmd`]s over a channel;
//! the runtime applies them to the controller. Properties are served from a
//! small shared snapshot the runtime refreshes through [`MprisHandle`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc::Sender};

use async_io::{Timer, block_on};
use tracing::{debug, warn};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedValue, Value};

use crate::app::TransportState;
use crate::audio::{PlayMode, Status};

/// Transport commands shared by every front-end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    SeekForward,
    SeekBackward,
    CycleMode,
    ToggleRepeat,
}

#[derive(Debug, Default)]
struct SharedState {
    playback: TransportState,
    title: Option<String>,
    index: Option<usize>,
    length_micros: Option<i64>,
    position_micros: i64,
    mode: PlayMode,
    repeat: bool,
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
}

impl MprisHandle {
    pub fn set_playback(&self, playback: TransportState) {
        if let Ok(mut s) = self.state.lock() {
            s.playback = playback;
        }
    }

    pub fn set_title(&self, title: Option<String>) {
        if let Ok(mut s) = self.state.lock() {
            s.title = title;
        }
    }

    /// Copy everything MPRIS exposes out of an engine snapshot.
    pub fn set_status(&self, status: &Status) {
        if let Ok(mut s) = self.state.lock() {
            s.playback = TransportState::from_status(status);
            s.title = status.title.clone();
            s.index = status.index;
            s.length_micros = status
                .duration
                .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX));
            s.position_micros = i64::try_from(status.elapsed.as_micros()).unwrap_or(i64::MAX);
            s.mode = status.mode;
            s.repeat = status.repeat;
        }
    }
}

/// MPRIS `LoopStatus` for a play mode and repeat flag.
fn loop_status(mode: PlayMode, repeat: bool) -> &'static str {
    match (mode, repeat) {
        (PlayMode::RepeatOne, _) => "Track",
        (_, true) => "Playlist",
        (_, false) => "None",
    }
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No-op for TUI.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "fmcast"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec![]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    /// Relative seek in microseconds; only the direction is used.
    fn seek(&self, offset: i64) {
        let cmd = if offset < 0 {
            ControlCmd::SeekBackward
        } else {
            ControlCmd::SeekForward
        };
        let _ = self.tx.send(cmd);
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        s.playback.label()
    }

    #[zbus(property)]
    fn loop_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "None";
        };
        loop_status(s.mode, s.repeat)
    }

    #[zbus(property)]
    fn shuffle(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.mode == PlayMode::Shuffle)
            .unwrap_or(false)
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let title = s.title.clone().unwrap_or_default();
        if let Some(v) = owned(Value::from(title)) {
            map.insert("xesam:title".to_string(), v);
        }
        if let Some(idx) = s.index {
            let path = format!("/org/mpris/MediaPlayer2/track/{idx}");
            if let Some(v) = ObjectPath::try_from(path)
                .ok()
                .and_then(|p| owned(Value::from(p)))
            {
                map.insert("mpris:trackid".to_string(), v);
            }
        }
        if let Some(len) = s.length_micros {
            if let Some(v) = owned(Value::from(len)) {
                map.insert("mpris:length".to_string(), v);
            }
        }
        map
    }
}

pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        block_on(async move {
            let path = "/org/mpris/MediaPlayer2";

            let connection = match Connection::session().await {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "MPRIS: failed to connect to session bus");
                    return;
                }
            };

            if let Err(e) = connection
                .request_name("org.mpris.MediaPlayer2.fmcast")
                .await
            {
                warn!(error = %e, "MPRIS: failed to acquire name");
                return;
            }

            let object_server = connection.object_server();

            if let Err(e) = object_server.at(path, RootIface { tx: tx.clone() }).await {
                warn!(error = %e, "MPRIS: failed to register root iface");
                return;
            }

            if let Err(e) = object_server
                .at(
                    path,
                    PlayerIface {
                        tx,
                        state: state_for_thread,
                    },
                )
                .await
            {
                warn!(error = %e, "MPRIS: failed to register player iface");
                return;
            }
            debug!("MPRIS service registered");

            // Keep the service alive.
            loop {
                Timer::after(std::time::Duration::from_secs(3600)).await;
            }
        });
    });

    MprisHandle { state }
}
