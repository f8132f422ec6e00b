use std::{env, path::Path, path::PathBuf};

use super::schema::Settings;
use crate::audio::GAIN_CEILING;

/// Configuration loading helpers.
///
/// `Settings::load` layers environment variables (prefix `FMCAST__`) over an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and the default config file location.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        Self::load_from(resolve_config_path().as_deref())
    }

    /// Load settings from environment and an explicit (optional) config file.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("FMCAST")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.audio.chunk_size == 0 {
            return Err("audio.chunk_size must be >= 1".to_string());
        }
        if self.audio.headroom.is_nan() || self.audio.headroom <= 0.0 || self.audio.headroom > 1.0 {
            return Err("audio.headroom must be in (0, 1]".to_string());
        }
        if self.audio.max_gain.is_nan() || self.audio.max_gain <= 0.0 || self.audio.max_gain > GAIN_CEILING {
            return Err(format!("audio.max_gain must be in (0, {GAIN_CEILING}]"));
        }
        if self.controls.seek_seconds < 0.0 {
            return Err("controls.seek_seconds must be >= 0".to_string());
        }
        if self.ui.refresh_ms == 0 {
            return Err("ui.refresh_ms must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `FMCAST_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("FMCAST_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/fmcast/config.toml`
/// or `~/.config/fmcast/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("fmcast").join("config.toml"))
}
