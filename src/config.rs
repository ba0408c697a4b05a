use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::hot_reload::{HotReloadConfig, ReloadError, ReloadErrorContext, ReloadResult};

pub const DEFAULT_CONFIG_PATH: &str = "hotload.toml";

/// Environment variable naming the config file when no argument is given
pub const CONFIG_ENV_VAR: &str = "HOTLOAD_CONFIG";

/// Config file the host should read
///
/// The first argument after the program name wins, then `$HOTLOAD_CONFIG`,
/// then `hotload.toml` in the working directory. Empty values are skipped.
pub fn config_path(args: &[String], env: Option<String>) -> PathBuf {
    args.get(1)
        .cloned()
        .into_iter()
        .chain(env)
        .find(|candidate| !candidate.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Host configuration, read from `hotload.toml`
///
/// ```toml
/// frame_rate = 60
///
/// [hot_reload]
/// module_path = "./target/debug/libgame.so"
/// asset_root = "./assets"
/// poll_interval_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Target iterations per second, 0 for unpaced
    pub frame_rate: u32,

    pub hot_reload: HotReloadConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            hot_reload: HotReloadConfig::default(),
        }
    }
}

impl HostConfig {
    pub fn from_toml_str(raw: &str) -> ReloadResult<Self> {
        toml::from_str(raw).map_err(|e| ReloadError::Config(e.to_string()))
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: impl AsRef<Path>) -> ReloadResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).reload_context(path)?;
        Self::from_toml_str(&raw)
    }

    /// Time budget of one frame
    pub fn frame_interval(&self) -> Option<Duration> {
        (self.frame_rate > 0).then(|| Duration::from_secs(1) / self.frame_rate)
    }
}
