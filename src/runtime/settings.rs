use std::path::Path;

use crate::config;
use crate::error::Error;

/// Load settings, falling back to defaults when the config is unusable.
///
/// Logging is not set up yet at this point (its level comes from these
/// settings), so the fallback reason is returned for the caller to log.
pub fn load_settings(explicit: Option<&Path>) -> (config::Settings, Option<String>) {
    let loaded = match explicit {
        Some(path) => config::Settings::load_from(Some(path)),
        None => config::Settings::load(),
    };
    match loaded {
        Ok(s) => match s.validate() {
            Ok(()) => (s, None),
            Err(msg) => (
                config::Settings::default(),
                Some(format!("{}, using defaults", Error::Config(msg))),
            ),
        },
        // Config is optional; failures should not prevent the app from starting.
        Err(e) => (
            config::Settings::default(),
            Some(format!("failed to load config, using defaults: {e}")),
        ),
    }
}
