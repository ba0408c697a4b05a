//! Hot reload error handling
//!
//! Every failure inside a reload cycle is turned into a `ReloadError` and then
//! classified by the supervisor: fatal when nothing is bound yet, recoverable
//! otherwise.

use std::path::{Path, PathBuf};

/// Type alias for hot reload results
pub type ReloadResult<T> = Result<T, ReloadError>;

/// Errors produced while staging, loading or binding an application module
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load module {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Entry point `{symbol}` could not be resolved: {reason}")]
    MissingSymbol { symbol: String, reason: String },

    #[error("No loadable module found at {}", .0.display())]
    MissingModule(PathBuf),

    #[error("Asset root {} does not exist", .0.display())]
    MissingAssets(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Helper trait for attaching the offending path to I/O failures
pub trait ReloadErrorContext<T> {
    fn reload_context(self, path: &Path) -> ReloadResult<T>;
}

impl<T> ReloadErrorContext<T> for std::io::Result<T> {
    fn reload_context(self, path: &Path) -> ReloadResult<T> {
        self.map_err(|source| ReloadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Create a module load error
pub fn load_error(path: &Path, error: impl std::fmt::Display) -> ReloadError {
    ReloadError::Load {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

/// Create a symbol resolution error
pub fn missing_symbol(symbol: &str, error: impl std::fmt::Display) -> ReloadError {
    ReloadError::MissingSymbol {
        symbol: symbol.to_string(),
        reason: error.to_string(),
    }
}
