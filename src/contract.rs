//! Application Module Contract
//!
//! A loadable application module exports exactly four functions with the
//! names and signatures below. The host resolves them as a unit after every
//! module load and calls them through the dispatcher, appending a `reloaded`
//! flag that is true only on the call directly following a reload.
//!
//! The state pointer handed to `app_init` outlives any single module image:
//! it is created by one version of the module and later used by the next.
//! Keeping the state layout compatible across reloads is the module's job.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::fmt;

/// Exported name of the init entry point
pub const INIT_SYMBOL: &str = "app_init";
/// Exported name of the iterate entry point
pub const ITERATE_SYMBOL: &str = "app_iterate";
/// Exported name of the event entry point
pub const EVENT_SYMBOL: &str = "app_event";
/// Exported name of the quit entry point
pub const QUIT_SYMBOL: &str = "app_quit";

/// Lifecycle result returned by init, iterate and event
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppResult {
    /// Keep running
    Continue = 0,
    /// Stop and quit cleanly
    Success = 1,
    /// Stop and report failure
    Failure = 2,
}

impl AppResult {
    pub fn is_continue(self) -> bool {
        self == AppResult::Continue
    }
}

/// Kind of host event
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyDown = 0,
    QuitRequested = 1,
}

/// Event record handed to `app_event`
///
/// The host does not interpret events; it forwards them unchanged.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppEvent {
    pub kind: EventKind,
    /// Unicode scalar value of the pressed key, 0 for non-key events
    pub key: u32,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl AppEvent {
    pub fn key_down(key: char) -> Self {
        Self {
            kind: EventKind::KeyDown,
            key: key as u32,
            timestamp_ms: now_millis(),
        }
    }

    pub fn quit_requested() -> Self {
        Self {
            kind: EventKind::QuitRequested,
            key: 0,
            timestamp_ms: now_millis(),
        }
    }

    /// Pressed key, if this is a key event
    pub fn key_char(&self) -> Option<char> {
        match self.kind {
            EventKind::KeyDown => char::from_u32(self.key),
            EventKind::QuitRequested => None,
        }
    }
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// `app_init(out_state, argc, argv, reloaded)`
pub type InitFn =
    unsafe extern "C" fn(*mut *mut c_void, c_int, *const *const c_char, bool) -> AppResult;
/// `app_iterate(state, reloaded)`
pub type IterateFn = unsafe extern "C" fn(*mut c_void, bool) -> AppResult;
/// `app_event(state, event, reloaded)`
pub type EventFn = unsafe extern "C" fn(*mut c_void, *const AppEvent, bool) -> AppResult;
/// `app_quit(state, result, reloaded)`
pub type QuitFn = unsafe extern "C" fn(*mut c_void, AppResult, bool);

/// The four entry points of one loaded module
///
/// Only ever constructed with all four functions present, so a partially
/// bound set cannot exist.
#[derive(Clone, Copy)]
pub struct EntryPoints {
    init: InitFn,
    iterate: IterateFn,
    event: EventFn,
    quit: QuitFn,
    module_seq: u64,
}

impl EntryPoints {
    pub fn new(init: InitFn, iterate: IterateFn, event: EventFn, quit: QuitFn, module_seq: u64) -> Self {
        Self {
            init,
            iterate,
            event,
            quit,
            module_seq,
        }
    }

    /// Load sequence number of the module these functions were resolved from
    pub fn module_seq(&self) -> u64 {
        self.module_seq
    }

    /// # Safety
    /// The owning module must still be loaded and `out_state` must be valid for writes.
    pub unsafe fn call_init(
        &self,
        out_state: *mut *mut c_void,
        argc: c_int,
        argv: *const *const c_char,
        reloaded: bool,
    ) -> AppResult {
        (self.init)(out_state, argc, argv, reloaded)
    }

    /// # Safety
    /// The owning module must still be loaded and `state` must come from `app_init`.
    pub unsafe fn call_iterate(&self, state: *mut c_void, reloaded: bool) -> AppResult {
        (self.iterate)(state, reloaded)
    }

    /// # Safety
    /// Same as [`EntryPoints::call_iterate`]; `event` must be valid for reads.
    pub unsafe fn call_event(&self, state: *mut c_void, event: *const AppEvent, reloaded: bool) -> AppResult {
        (self.event)(state, event, reloaded)
    }

    /// # Safety
    /// Same as [`EntryPoints::call_iterate`]; `state` must not be used afterwards.
    pub unsafe fn call_quit(&self, state: *mut c_void, result: AppResult, reloaded: bool) {
        (self.quit)(state, result, reloaded)
    }
}

impl fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoints")
            .field("module_seq", &self.module_seq)
            .finish_non_exhaustive()
    }
}

/// Module-side latch for the edge-triggered `reloaded` flag
///
/// Iterate and event may both see `reloaded == true` for the same physical
/// reload. The latch reports the edge once and re-arms as soon as a call
/// carries `false`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReloadLatch {
    #[default]
    Armed,
    Consumed,
}

impl ReloadLatch {
    /// Returns true when the caller should re-acquire its reload-sensitive resources
    pub fn observe(&mut self, reloaded: bool) -> bool {
        if !reloaded {
            *self = ReloadLatch::Armed;
            return false;
        }

        match self {
            ReloadLatch::Armed => {
                *self = ReloadLatch::Consumed;
                true
            }
            ReloadLatch::Consumed => false,
        }
    }
}

/// Rust-side view of an application module
///
/// Implement this and call [`export_app_module!`](crate::export_app_module)
/// to generate the four exported symbols.
pub trait AppModule: Sized {
    /// Build the application state. `Err` aborts startup with the given result.
    fn init(args: &[String], reloaded: bool) -> Result<Self, AppResult>;

    fn iterate(&mut self, reloaded: bool) -> AppResult;

    fn event(&mut self, event: &AppEvent, reloaded: bool) -> AppResult;

    fn quit(self, result: AppResult, reloaded: bool);
}

/// `extern "C"` adapters between the raw entry-point ABI and [`AppModule`]
///
/// Panics are caught here; unwinding out of an `extern "C"` function would
/// abort the host.
pub mod glue {
    use super::{AppEvent, AppModule, AppResult};
    use std::ffi::{c_char, c_int, c_void};
    use std::panic::{self, AssertUnwindSafe};

    fn guarded(phase: &str, f: impl FnOnce() -> AppResult) -> AppResult {
        panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
            log::error!("Application module panicked in {}", phase);
            AppResult::Failure
        })
    }

    /// # Safety
    /// `out_state` must be valid for writes; `argv` must hold `argc` C strings or be null.
    pub unsafe extern "C" fn init<M: AppModule>(
        out_state: *mut *mut c_void,
        argc: c_int,
        argv: *const *const c_char,
        reloaded: bool,
    ) -> AppResult {
        if out_state.is_null() {
            return AppResult::Failure;
        }
        let args = super::collect_args(argc, argv);

        match panic::catch_unwind(|| M::init(&args, reloaded)) {
            Ok(Ok(module)) => {
                *out_state = Box::into_raw(Box::new(module)).cast();
                AppResult::Continue
            }
            Ok(Err(result)) => result,
            Err(_) => {
                log::error!("Application module panicked in init");
                AppResult::Failure
            }
        }
    }

    /// # Safety
    /// `state` must be null or a pointer produced by [`init`] for the same `M`.
    pub unsafe extern "C" fn iterate<M: AppModule>(state: *mut c_void, reloaded: bool) -> AppResult {
        let Some(module) = state.cast::<M>().as_mut() else {
            return AppResult::Failure;
        };
        guarded("iterate", || module.iterate(reloaded))
    }

    /// # Safety
    /// As for [`iterate`]; `event` must be null or valid for reads.
    pub unsafe extern "C" fn event<M: AppModule>(
        state: *mut c_void,
        event: *const AppEvent,
        reloaded: bool,
    ) -> AppResult {
        let (Some(module), Some(event)) = (state.cast::<M>().as_mut(), event.as_ref()) else {
            return AppResult::Failure;
        };
        guarded("event", || module.event(event, reloaded))
    }

    /// # Safety
    /// As for [`iterate`]; the state is freed and must not be used again.
    pub unsafe extern "C" fn quit<M: AppModule>(state: *mut c_void, result: AppResult, reloaded: bool) {
        if state.is_null() {
            return;
        }
        let module = Box::from_raw(state.cast::<M>());
        guarded("quit", move || {
            module.quit(result, reloaded);
            AppResult::Success
        });
    }
}

unsafe fn collect_args(argc: c_int, argv: *const *const c_char) -> Vec<String> {
    let count = usize::try_from(argc).unwrap_or(0);
    if argv.is_null() {
        return Vec::new();
    }

    (0..count)
        .filter_map(|i| {
            let arg = *argv.add(i);
            (!arg.is_null()).then(|| CStr::from_ptr(arg).to_string_lossy().into_owned())
        })
        .collect()
}

/// Export a type implementing [`AppModule`] under the four well-known symbol names
#[macro_export]
macro_rules! export_app_module {
    ($module:ty) => {
        #[no_mangle]
        pub unsafe extern "C" fn app_init(
            out_state: *mut *mut ::std::ffi::c_void,
            argc: ::std::ffi::c_int,
            argv: *const *const ::std::ffi::c_char,
            reloaded: bool,
        ) -> $crate::contract::AppResult {
            $crate::contract::glue::init::<$module>(out_state, argc, argv, reloaded)
        }

        #[no_mangle]
        pub unsafe extern "C" fn app_iterate(
            state: *mut ::std::ffi::c_void,
            reloaded: bool,
        ) -> $crate::contract::AppResult {
            $crate::contract::glue::iterate::<$module>(state, reloaded)
        }

        #[no_mangle]
        pub unsafe extern "C" fn app_event(
            state: *mut ::std::ffi::c_void,
            event: *const $crate::contract::AppEvent,
            reloaded: bool,
        ) -> $crate::contract::AppResult {
            $crate::contract::glue::event::<$module>(state, event, reloaded)
        }

        #[no_mangle]
        pub unsafe extern "C" fn app_quit(
            state: *mut ::std::ffi::c_void,
            result: $crate::contract::AppResult,
            reloaded: bool,
        ) {
            $crate::contract::glue::quit::<$module>(state, result, reloaded)
        }
    };
}
