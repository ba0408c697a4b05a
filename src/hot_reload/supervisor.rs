use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use chrono::{DateTime, Local};
use crate::contract::EntryPoints;
use super::{
    stage_copy, staging_path, Clock, HotReloadConfig, LoadedModule, ModuleLoader, ReloadError,
    ReloadResult, SystemClock,
};

/// Result of one `maybe_reload` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReloadOutcome {
    /// Nothing to report; the bound module keeps serving
    Unchanged,
    /// Module and/or assets changed and the module must be told
    Reloaded,
    /// No usable module is bound; fatal
    Failed,
}

impl ReloadOutcome {
    pub fn is_reloaded(self) -> bool {
        self == ReloadOutcome::Reloaded
    }
}

/// Timestamps and counters carried between polls
///
/// Starts empty on every process start, so the first poll always loads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadState {
    /// Module mtime recorded at the last successful load
    pub module_mtime: Option<SystemTime>,

    /// Asset root mtime recorded at the last asset reload
    pub assets_mtime: Option<SystemTime>,

    /// When the filesystem was last checked
    pub last_poll: Option<Instant>,

    /// Number of load attempts, used for staging file names
    pub load_counter: u64,
}

/// Reload statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStats {
    /// Polls that went past the throttle and touched the filesystem
    pub polls: u64,
    /// Successful module loads with a fully bound entry-point set
    pub module_loads: u64,
    /// Asset root changes reported to the module
    pub asset_reloads: u64,
    /// Reloads that failed while a previous module kept serving
    pub failed_reloads: u64,
}

/// Reload supervisor
///
/// Owns the bound module and decides, on every dispatch, whether it must be
/// replaced. Not thread-safe; the host calls it from one thread only.
pub struct Supervisor<L: ModuleLoader, C: Clock = SystemClock> {
    config: HotReloadConfig,
    loader: L,
    clock: C,
    state: ReloadState,
    stats: ReloadStats,

    /// Module the bound entry points belong to
    current: Option<LoadedModule<L::Handle>>,

    /// Superseded or rejected modules. Never unloaded: code or data from them
    /// may still be referenced by application state.
    retired: Vec<LoadedModule<L::Handle>>,

    entry_points: Option<EntryPoints>,
}

impl<L: ModuleLoader> Supervisor<L, SystemClock> {
    pub fn new(config: HotReloadConfig, loader: L) -> Self {
        Self::with_clock(config, loader, SystemClock)
    }
}

impl<L: ModuleLoader, C: Clock> Supervisor<L, C> {
    pub fn with_clock(config: HotReloadConfig, loader: L, clock: C) -> Self {
        Self {
            config,
            loader,
            clock,
            state: ReloadState::default(),
            stats: ReloadStats::default(),
            current: None,
            retired: Vec::new(),
            entry_points: None,
        }
    }

    /// Poll for changes and reload if needed
    pub fn maybe_reload(&mut self) -> ReloadOutcome {
        let now = self.clock.now();
        let bound = self.entry_points.is_some();

        if bound {
            if let Some(last) = self.state.last_poll {
                if now.saturating_duration_since(last) < self.config.poll_interval() {
                    return ReloadOutcome::Unchanged;
                }
            }
        }
        self.state.last_poll = Some(now);
        self.stats.polls += 1;

        let module_mtime = modified_time(&self.config.module_path);
        let assets_mtime = modified_time(&self.config.asset_root);

        if !bound && assets_mtime.is_none() && self.config.require_assets_on_first_load {
            log::error!("{}", ReloadError::MissingAssets(self.config.asset_root.clone()));
            return ReloadOutcome::Failed;
        }

        let module_changed = module_mtime > self.state.module_mtime;
        let assets_changed = assets_mtime > self.state.assets_mtime;

        if !module_changed && !assets_changed {
            if !bound {
                log::error!("{}", ReloadError::MissingModule(self.config.module_path.clone()));
                return ReloadOutcome::Failed;
            }
            return ReloadOutcome::Unchanged;
        }

        if assets_changed {
            log::info!(
                "Assets changed ({}), triggering reload...",
                format_mtime(assets_mtime)
            );
            self.state.assets_mtime = assets_mtime;
            self.stats.asset_reloads += 1;
        }

        if module_changed {
            if let Err(err) = self.reload_module(module_mtime) {
                if self.entry_points.is_none() {
                    log::error!("Initial module load failed: {}", err);
                    return ReloadOutcome::Failed;
                }

                self.stats.failed_reloads += 1;
                log::warn!(
                    "Module reload failed, still serving module #{}: {}",
                    self.current.as_ref().map(|m| m.seq()).unwrap_or_default(),
                    err
                );
                if !assets_changed {
                    return ReloadOutcome::Unchanged;
                }
            }
        } else if !bound {
            log::error!("{}", ReloadError::MissingModule(self.config.module_path.clone()));
            return ReloadOutcome::Failed;
        }

        ReloadOutcome::Reloaded
    }

    /// Stage, load and bind the module file as it is now
    fn reload_module(&mut self, module_mtime: Option<SystemTime>) -> ReloadResult<()> {
        let seq = self.state.load_counter;
        self.state.load_counter += 1;

        let staged = self.staging_path_for(seq);
        stage_copy(&self.config.module_path, &staged)?;
        let handle = self.loader.load(&staged)?;

        log::info!(
            "Reloading module ({}) from {}...",
            format_mtime(module_mtime),
            staged.display()
        );
        self.state.module_mtime = module_mtime;

        let module = LoadedModule::new(handle, staged, seq);
        match self.loader.resolve(&module) {
            Ok(entry_points) => {
                if let Some(previous) = self.current.replace(module) {
                    self.retired.push(previous);
                }
                self.entry_points = Some(entry_points);
                self.stats.module_loads += 1;
                Ok(())
            }
            Err(err) => {
                self.retired.push(module);
                Err(err)
            }
        }
    }

    /// Staging path used for load attempt `seq`
    pub fn staging_path_for(&self, seq: u64) -> PathBuf {
        staging_path(&self.config.staging_dir, &self.config.module_path, seq)
    }

    /// Currently bound entry points
    pub fn entry_points(&self) -> Option<EntryPoints> {
        self.entry_points
    }

    pub fn current_module(&self) -> Option<&LoadedModule<L::Handle>> {
        self.current.as_ref()
    }

    pub fn retired_modules(&self) -> &[LoadedModule<L::Handle>] {
        &self.retired
    }

    pub fn state(&self) -> &ReloadState {
        &self.state
    }

    pub fn stats(&self) -> ReloadStats {
        self.stats
    }

    pub fn config(&self) -> &HotReloadConfig {
        &self.config
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }
}

impl<L: ModuleLoader, C: Clock> Drop for Supervisor<L, C> {
    fn drop(&mut self) {
        // Module handles are leaked, never closed.
        std::mem::forget(self.current.take());
        std::mem::forget(std::mem::take(&mut self.retired));
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Local wall-clock time of an mtime, or its raw form when chrono cannot represent it
fn format_mtime(mtime: Option<SystemTime>) -> String {
    let Some(time) = mtime else {
        return "missing".to_string();
    };

    time.duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|since| {
            let secs = i64::try_from(since.as_secs()).ok()?;
            DateTime::from_timestamp(secs, since.subsec_nanos())
        })
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| format!("{:?}", time))
}
