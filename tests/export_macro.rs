//! The export macro produces the four symbols with the contract's signatures

use std::ffi::{c_void, CString};
use std::ptr;
use hotload::contract::{EventFn, InitFn, IterateFn, QuitFn};
use hotload::{AppEvent, AppModule, AppResult, ReloadLatch};

/// Minimal module: counts frames, refreshes once per reload edge
struct Counter {
    args: Vec<String>,
    frames: u32,
    refreshes: u32,
    latch: ReloadLatch,
}

impl AppModule for Counter {
    fn init(args: &[String], _reloaded: bool) -> Result<Self, AppResult> {
        if args.iter().any(|a| a == "--refuse") {
            return Err(AppResult::Failure);
        }
        Ok(Self {
            args: args.to_vec(),
            frames: 0,
            refreshes: 0,
            latch: ReloadLatch::default(),
        })
    }

    fn iterate(&mut self, reloaded: bool) -> AppResult {
        if self.latch.observe(reloaded) {
            self.refreshes += 1;
        }
        self.frames += 1;
        AppResult::Continue
    }

    fn event(&mut self, event: &AppEvent, reloaded: bool) -> AppResult {
        if self.latch.observe(reloaded) {
            self.refreshes += 1;
        }
        match event.key_char() {
            Some('q') => AppResult::Success,
            Some('!') => panic!("module bug"),
            _ => AppResult::Continue,
        }
    }

    fn quit(self, _result: AppResult, _reloaded: bool) {}
}

hotload::export_app_module!(Counter);

const INIT: InitFn = app_init;
const ITERATE: IterateFn = app_iterate;
const EVENT: EventFn = app_event;
const QUIT: QuitFn = app_quit;

fn init_with(args: &[&str]) -> (AppResult, *mut c_void) {
    let owned: Vec<CString> = args.iter().map(|a| CString::new(*a).unwrap()).collect();
    let mut argv: Vec<_> = owned.iter().map(|a| a.as_ptr()).collect();
    argv.push(ptr::null());

    let mut state = ptr::null_mut();
    let result = unsafe { INIT(&mut state, owned.len() as i32, argv.as_ptr(), false) };
    (result, state)
}

#[test]
fn test_exported_lifecycle() {
    let (result, state) = init_with(&["host", "--windowed"]);
    assert_eq!(result, AppResult::Continue);
    assert!(!state.is_null());

    unsafe {
        assert_eq!(ITERATE(state, true), AppResult::Continue);
        assert_eq!(EVENT(state, &AppEvent::key_down('s'), true), AppResult::Continue);
        assert_eq!(ITERATE(state, false), AppResult::Continue);

        let counter = &*state.cast::<Counter>();
        assert_eq!(counter.args, vec!["host".to_string(), "--windowed".to_string()]);
        assert_eq!(counter.frames, 2);
        assert_eq!(counter.refreshes, 1);

        assert_eq!(EVENT(state, &AppEvent::key_down('q'), false), AppResult::Success);
        QUIT(state, AppResult::Success, false);
    }
}

#[test]
fn test_init_refusal_leaves_state_null() {
    let (result, state) = init_with(&["host", "--refuse"]);
    assert_eq!(result, AppResult::Failure);
    assert!(state.is_null());

    // quit on a null state is a no-op
    unsafe { QUIT(state, AppResult::Failure, false) };
}

#[test]
fn test_panics_become_failures() {
    let (_, state) = init_with(&[]);

    unsafe {
        assert_eq!(EVENT(state, &AppEvent::key_down('!'), false), AppResult::Failure);
        assert_eq!(ITERATE(ptr::null_mut(), false), AppResult::Failure);
        QUIT(state, AppResult::Failure, false);
    }
}
