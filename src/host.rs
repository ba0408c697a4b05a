//! Host run loop
//!
//! Calls init once, then drains pending events and iterates once per frame
//! until a phase returns something other than `Continue`, then quits with
//! that result.

use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};
use crossbeam_channel::{Receiver, TryRecvError};
use crate::contract::{AppEvent, AppResult};
use crate::dispatch::Dispatcher;
use crate::hot_reload::{Clock, ModuleLoader, SystemClock};

pub struct Host<L: ModuleLoader, C: Clock = SystemClock> {
    dispatcher: Dispatcher<L, C>,
    events: Receiver<AppEvent>,
    frame_interval: Option<Duration>,
    frames: u64,
}

impl<L: ModuleLoader, C: Clock> Host<L, C> {
    pub fn new(dispatcher: Dispatcher<L, C>, events: Receiver<AppEvent>, frame_interval: Option<Duration>) -> Self {
        Self {
            dispatcher,
            events,
            frame_interval,
            frames: 0,
        }
    }

    /// Run the application to completion and return its final result
    pub fn run(&mut self, args: &[String]) -> AppResult {
        let mut result = self.dispatcher.init(args);

        while result.is_continue() {
            let frame_start = Instant::now();

            result = self.pump_events();
            if result.is_continue() {
                result = self.dispatcher.iterate();
            }
            self.frames += 1;

            self.pace(frame_start);
        }

        log::info!("Shutting down after {} frames ({:?})", self.frames, result);
        self.dispatcher.quit(result);
        result
    }

    /// Forward queued events until the queue is empty or the module stops
    fn pump_events(&mut self) -> AppResult {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    let result = self.dispatcher.event(&event);
                    if !result.is_continue() {
                        return result;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    return AppResult::Continue;
                }
            }
        }
    }

    fn pace(&self, frame_start: Instant) {
        if let Some(interval) = self.frame_interval {
            let elapsed = frame_start.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn dispatcher(&self) -> &Dispatcher<L, C> {
        &self.dispatcher
    }
}

/// Turn stdin into key events, one per typed character
///
/// A quit request is sent when stdin closes.
pub fn stdin_events() -> Receiver<AppEvent> {
    let (tx, rx) = crossbeam_channel::unbounded();

    let spawned = thread::Builder::new()
        .name("stdin-events".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                for key in line.chars() {
                    if tx.send(AppEvent::key_down(key)).is_err() {
                        return;
                    }
                }
            }
            let _ = tx.send(AppEvent::quit_requested());
        });
    if let Err(e) = spawned {
        log::error!("Failed to spawn stdin reader: {}", e);
    }

    rx
}
