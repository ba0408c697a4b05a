//! Fixtures shared by the unit tests: a scratch module/asset tree, a loader
//! that "loads" text files, and a recording application module recording calls.

use std::cell::RefCell;
use std::ffi::c_void;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;
use crate::contract::{glue, AppEvent, AppModule, AppResult, EntryPoints, EventKind, ReloadLatch, QUIT_SYMBOL};
use crate::hot_reload::{
    load_error, missing_symbol, HotReloadConfig, LoadedModule, ModuleLoader, ReloadErrorContext,
    ReloadResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Init,
    Iterate,
    Event,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Call {
    pub tag: u32,
    pub phase: Phase,
    pub reloaded: bool,
}

thread_local! {
    static CALLS: RefCell<Vec<Call>> = RefCell::new(Vec::new());
}

fn record(tag: u32, phase: Phase, reloaded: bool) {
    CALLS.with(|calls| calls.borrow_mut().push(Call { tag, phase, reloaded }));
}

pub(crate) fn calls() -> Vec<Call> {
    CALLS.with(|calls| calls.borrow().clone())
}

pub(crate) fn reset_calls() {
    CALLS.with(|calls| calls.borrow_mut().clear());
}

/// Application module stand-in; `TAG` identifies which "build" is running.
/// All tags share one layout so state survives a swap, as with a real reload.
#[repr(C)]
pub(crate) struct Recorder<const TAG: u32> {
    pub args: Vec<String>,
    pub latch: ReloadLatch,
    pub refreshes: u32,
}

impl<const TAG: u32> Recorder<TAG> {
    fn observe(&mut self, reloaded: bool) {
        if self.latch.observe(reloaded) {
            self.refreshes += 1;
        }
    }
}

impl<const TAG: u32> AppModule for Recorder<TAG> {
    fn init(args: &[String], reloaded: bool) -> Result<Self, AppResult> {
        record(TAG, Phase::Init, reloaded);
        Ok(Self {
            args: args.to_vec(),
            latch: ReloadLatch::default(),
            refreshes: 0,
        })
    }

    fn iterate(&mut self, reloaded: bool) -> AppResult {
        record(TAG, Phase::Iterate, reloaded);
        self.observe(reloaded);
        AppResult::Continue
    }

    fn event(&mut self, event: &AppEvent, reloaded: bool) -> AppResult {
        record(TAG, Phase::Event, reloaded);
        self.observe(reloaded);
        match (event.kind, event.key_char()) {
            (EventKind::QuitRequested, _) | (_, Some('q')) => AppResult::Success,
            _ => AppResult::Continue,
        }
    }

    fn quit(self, _result: AppResult, reloaded: bool) {
        record(TAG, Phase::Quit, reloaded);
    }
}

/// # Safety
/// `state` must have been produced by a recorder's `app_init` and still be alive.
pub(crate) unsafe fn recorder_state<'a>(state: *mut c_void) -> &'a Recorder<1> {
    &*state.cast::<Recorder<1>>()
}

fn recorder_entry_points<const TAG: u32>(seq: u64) -> EntryPoints {
    EntryPoints::new(
        glue::init::<Recorder<TAG>>,
        glue::iterate::<Recorder<TAG>>,
        glue::event::<Recorder<TAG>>,
        glue::quit::<Recorder<TAG>>,
        seq,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FakeModule {
    A,
    B,
    Partial,
}

/// Loader whose "modules" are text files: `A`, `B` or `partial`.
/// Anything else fails to load.
#[derive(Debug, Default)]
pub(crate) struct FakeLoader {
    pub loaded: Vec<PathBuf>,
}

impl ModuleLoader for FakeLoader {
    type Handle = FakeModule;

    fn load(&mut self, path: &Path) -> ReloadResult<FakeModule> {
        let contents = fs::read_to_string(path).reload_context(path)?;
        let module = match contents.trim() {
            "A" => FakeModule::A,
            "B" => FakeModule::B,
            "partial" => FakeModule::Partial,
            other => return Err(load_error(path, format!("not a module: {other}"))),
        };

        self.loaded.push(path.to_path_buf());
        Ok(module)
    }

    fn resolve(&self, module: &LoadedModule<FakeModule>) -> ReloadResult<EntryPoints> {
        match module.handle() {
            FakeModule::A => Ok(recorder_entry_points::<1>(module.seq())),
            FakeModule::B => Ok(recorder_entry_points::<2>(module.seq())),
            FakeModule::Partial => Err(missing_symbol(QUIT_SYMBOL, "symbol not exported")),
        }
    }
}

/// Temporary module file, asset root and staging directory
pub(crate) struct Scratch {
    dir: TempDir,
}

impl Scratch {
    /// Asset root exists with mtime 100s after the epoch; no module yet
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create scratch directory");
        let scratch = Self { dir };
        fs::create_dir_all(scratch.asset_root()).expect("Failed to create asset root");
        scratch.touch_assets(100);
        scratch
    }

    pub fn module_path(&self) -> PathBuf {
        self.dir.path().join("libgame.so")
    }

    pub fn asset_root(&self) -> PathBuf {
        self.dir.path().join("assets")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.dir.path().join("stage")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> HotReloadConfig {
        HotReloadConfig {
            module_path: self.module_path(),
            asset_root: self.asset_root(),
            staging_dir: self.staging_dir(),
            poll_interval_ms: 500,
            require_assets_on_first_load: true,
        }
    }

    pub fn write_module(&self, contents: &str, mtime_secs: u64) {
        fs::write(self.module_path(), contents).expect("Failed to write module file");
        set_mtime(&self.module_path(), mtime_secs);
    }

    pub fn touch_assets(&self, mtime_secs: u64) {
        set_mtime(&self.asset_root(), mtime_secs);
    }

    pub fn remove_assets(&self) {
        fs::remove_dir_all(self.asset_root()).expect("Failed to remove asset root");
    }
}

pub(crate) fn set_mtime(path: &Path, secs: u64) {
    let file = if path.is_dir() {
        File::open(path)
    } else {
        OpenOptions::new().write(true).open(path)
    }
    .expect("Failed to open path for mtime update");

    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .expect("Failed to set mtime");
}
