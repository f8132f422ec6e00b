use crate::app::App;
use crate::mpris::MprisHandle;

pub fn update_mpris(mpris: &MprisHandle, app: &App) {
    match &app.status {
        Some(status) => mpris.set_status(status),
        None => {
            mpris.set_title(None);
            mpris.set_playback(app.transport());
        }
    }
}
