//! Hot-Reload System
//!
//! Replaces the running application module in place when its file changes,
//! and tells the module to refresh assets when the asset root changes.
//! Designed for rapid iteration during development.
//!
//! Key features:
//! - Throttled mtime polling of the module file and asset root
//! - Staged copies so the dynamic loader never hands back a cached image
//! - All-or-nothing entry-point binding
//! - A failed reload keeps the previous module serving

pub mod clock;
pub mod error;
pub mod loader;
pub mod supervisor;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use error::{load_error, missing_symbol, ReloadError, ReloadErrorContext, ReloadResult};
pub use loader::{stage_copy, staging_path, DylibLoader, LoadedModule, ModuleLoader};
pub use supervisor::{ReloadOutcome, ReloadState, ReloadStats, Supervisor};

use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Hot-reload configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotReloadConfig {
    /// Application module to load and watch
    pub module_path: PathBuf,

    /// Directory whose mtime triggers asset reload notifications
    pub asset_root: PathBuf,

    /// Where staged copies of the module are written
    pub staging_dir: PathBuf,

    /// Minimum time between filesystem checks once a module is bound
    pub poll_interval_ms: u64,

    /// Treat a missing asset root as fatal on first load
    pub require_assets_on_first_load: bool,
}

impl HotReloadConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from(".").join(libloading::library_filename("game")),
            asset_root: PathBuf::from("./assets"),
            staging_dir: std::env::temp_dir().join("hotload_staging"),
            poll_interval_ms: 500,
            require_assets_on_first_load: true,
        }
    }
}
