//! Development host that keeps an application module hot-reloadable.
//!
//! The host loads the application's logic from a dynamic library, polls the
//! library file and an asset directory for changes, and swaps the running
//! implementation in place without restarting or losing application state.

pub mod config;
pub mod contract;
pub mod dispatch;
pub mod host;
pub mod hot_reload;

#[cfg(test)]
mod test_support;

pub use config::HostConfig;
pub use contract::{AppEvent, AppModule, AppResult, EntryPoints, EventKind, ReloadLatch};
pub use dispatch::Dispatcher;
pub use host::Host;
pub use hot_reload::{DylibLoader, HotReloadConfig, ReloadOutcome, Supervisor};
