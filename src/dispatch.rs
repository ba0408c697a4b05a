//! Entry-Point Dispatcher
//!
//! Routes the host's four lifecycle callbacks into the currently bound
//! module. Every call polls the supervisor first and forwards whether a
//! reload just happened. The flag is not deduplicated across phases; the
//! module latches it.

use std::ffi::{c_char, c_int, c_void, CString};
use std::ptr;
use crate::contract::{AppEvent, AppResult, EntryPoints};
use crate::hot_reload::{Clock, ModuleLoader, ReloadOutcome, Supervisor, SystemClock};

pub struct Dispatcher<L: ModuleLoader, C: Clock = SystemClock> {
    supervisor: Supervisor<L, C>,

    /// Opaque application state written by `app_init`
    app_state: *mut c_void,
}

impl<L: ModuleLoader, C: Clock> Dispatcher<L, C> {
    pub fn new(supervisor: Supervisor<L, C>) -> Self {
        Self {
            supervisor,
            app_state: ptr::null_mut(),
        }
    }

    /// Poll for a reload and return the entry points to call, or `None` when fatal
    fn poll(&mut self) -> Option<(EntryPoints, bool)> {
        match self.supervisor.maybe_reload() {
            ReloadOutcome::Failed => None,
            outcome => self
                .supervisor
                .entry_points()
                .map(|entry_points| (entry_points, outcome.is_reloaded())),
        }
    }

    pub fn init(&mut self, args: &[String]) -> AppResult {
        let Some((entry_points, reloaded)) = self.poll() else {
            return AppResult::Failure;
        };

        let argv = CArgs::new(args);
        // SAFETY: the module is never unloaded; argv lives for the whole call.
        unsafe { entry_points.call_init(&mut self.app_state, argv.argc(), argv.argv(), reloaded) }
    }

    pub fn iterate(&mut self) -> AppResult {
        let Some((entry_points, reloaded)) = self.poll() else {
            return AppResult::Failure;
        };

        // SAFETY: app_state is whatever app_init produced (or null).
        unsafe { entry_points.call_iterate(self.app_state, reloaded) }
    }

    pub fn event(&mut self, event: &AppEvent) -> AppResult {
        let Some((entry_points, reloaded)) = self.poll() else {
            return AppResult::Failure;
        };

        // SAFETY: as for iterate; the event reference outlives the call.
        unsafe { entry_points.call_event(self.app_state, event, reloaded) }
    }

    /// Forward shutdown to the module
    ///
    /// When no usable module is bound the quit call is skipped entirely and
    /// anything the module owns is leaked.
    pub fn quit(&mut self, result: AppResult) {
        let Some((entry_points, reloaded)) = self.poll() else {
            log::error!("No usable module bound, skipping module quit");
            return;
        };

        let state = std::mem::replace(&mut self.app_state, ptr::null_mut());
        // SAFETY: the state is handed back to the module and not used again.
        unsafe { entry_points.call_quit(state, result, reloaded) }
    }

    /// Raw application state pointer
    pub fn app_state(&self) -> *mut c_void {
        self.app_state
    }

    pub fn supervisor(&self) -> &Supervisor<L, C> {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut Supervisor<L, C> {
        &mut self.supervisor
    }
}

/// NUL-terminated argument vector kept alive across an `app_init` call
struct CArgs {
    _owned: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl CArgs {
    fn new(args: &[String]) -> Self {
        let owned: Vec<CString> = args
            .iter()
            .map(|arg| CString::new(arg.replace('\0', "")).unwrap_or_default())
            .collect();

        let mut ptrs: Vec<*const c_char> = owned.iter().map(|arg| arg.as_ptr()).collect();
        ptrs.push(ptr::null());

        Self { _owned: owned, ptrs }
    }

    fn argc(&self) -> c_int {
        c_int::try_from(self.ptrs.len() - 1).unwrap_or(c_int::MAX)
    }

    fn argv(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }
}
