//! Demo application module
//!
//! Build with `cargo build -p demo-module`, point `hotload.toml` at the
//! resulting library and run the host. Edit this file and rebuild, or touch
//! something in `assets/`, and the running host picks the change up.
//!
//! Keys: `s` prints the asset message, `q` quits.

use std::path::PathBuf;
use std::time::Instant;
use hotload::{AppEvent, AppModule, AppResult, EventKind, ReloadLatch};

const MESSAGE_FILE: &str = "message.txt";
const REPORT_EVERY: u64 = 300;

/// Application state. Its layout must stay stable across reloads.
#[repr(C)]
pub struct DemoGame {
    asset_root: PathBuf,
    message: String,
    frames: u64,
    started: Instant,
    latch: ReloadLatch,
}

impl DemoGame {
    fn load_assets(&mut self) -> AppResult {
        let path = self.asset_root.join(MESSAGE_FILE);
        match std::fs::read_to_string(&path) {
            Ok(message) => {
                self.message = message.trim().to_string();
                log::info!("Loaded asset message: {:?}", self.message);
                AppResult::Continue
            }
            Err(e) => {
                log::error!("Could not load {}: {}", path.display(), e);
                AppResult::Failure
            }
        }
    }

    /// Re-acquire assets once per reload, however many phases see the flag
    fn reload_assets_if_needed(&mut self, reloaded: bool) -> AppResult {
        if !self.latch.observe(reloaded) {
            return AppResult::Continue;
        }

        // every module image has its own logger slot
        init_logging();
        log::info!("Hot reload: reloading assets...");
        self.load_assets()
    }
}

fn init_logging() {
    if let Err(e) = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init() {
        log::debug!("Logger already initialized: {}", e);
    }
}

impl AppModule for DemoGame {
    fn init(args: &[String], _reloaded: bool) -> Result<Self, AppResult> {
        init_logging();
        log::info!("Demo module starting with args {:?}", args);

        let mut game = Self {
            asset_root: PathBuf::from("assets"),
            message: String::new(),
            frames: 0,
            started: Instant::now(),
            latch: ReloadLatch::default(),
        };

        match game.load_assets() {
            AppResult::Continue => Ok(game),
            other => Err(other),
        }
    }

    fn iterate(&mut self, reloaded: bool) -> AppResult {
        let result = self.reload_assets_if_needed(reloaded);
        if !result.is_continue() {
            return result;
        }

        self.frames += 1;
        if self.frames % REPORT_EVERY == 0 {
            log::info!(
                "frame {} ({:.1}s): {}",
                self.frames,
                self.started.elapsed().as_secs_f32(),
                self.message
            );
        }
        AppResult::Continue
    }

    fn event(&mut self, event: &AppEvent, reloaded: bool) -> AppResult {
        let result = self.reload_assets_if_needed(reloaded);
        if !result.is_continue() {
            return result;
        }

        match (event.kind, event.key_char()) {
            (EventKind::QuitRequested, _) | (_, Some('q')) => AppResult::Success,
            (_, Some('s')) => {
                println!("{}", self.message);
                AppResult::Continue
            }
            _ => AppResult::Continue,
        }
    }

    fn quit(self, result: AppResult, _reloaded: bool) {
        log::info!("Demo module quitting after {} frames with {:?}", self.frames, result);
    }
}

hotload::export_app_module!(DemoGame);
