use std::path::{Path, PathBuf};
use libloading::{Library, Symbol};
use crate::contract::{
    EntryPoints, EventFn, InitFn, IterateFn, QuitFn, EVENT_SYMBOL, INIT_SYMBOL, ITERATE_SYMBOL,
    QUIT_SYMBOL,
};
use super::{load_error, missing_symbol, ReloadErrorContext, ReloadResult};

/// A module image loaded into the process
pub struct LoadedModule<H> {
    /// Loader-specific handle
    handle: H,

    /// Staged copy the module was loaded from
    path: PathBuf,

    /// Load sequence number, unique per process run
    seq: u64,
}

impl<H> LoadedModule<H> {
    pub fn new(handle: H, path: PathBuf, seq: u64) -> Self {
        Self { handle, path, seq }
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Loadable-module primitive used by the supervisor
pub trait ModuleLoader {
    type Handle;

    /// Load the module image at `path`
    fn load(&mut self, path: &Path) -> ReloadResult<Self::Handle>;

    /// Resolve all four entry points, or fail without binding any of them
    fn resolve(&self, module: &LoadedModule<Self::Handle>) -> ReloadResult<EntryPoints>;
}

/// Dynamic library loader
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

impl DylibLoader {
    pub fn new() -> Self {
        Self
    }
}

unsafe fn lookup<T: Copy>(library: &Library, name: &str) -> ReloadResult<T> {
    let symbol: Symbol<T> = library
        .get(name.as_bytes())
        .map_err(|e| missing_symbol(name, e))?;
    Ok(*symbol)
}

impl ModuleLoader for DylibLoader {
    type Handle = Library;

    fn load(&mut self, path: &Path) -> ReloadResult<Library> {
        // SAFETY: loading runs the library's initializers. Application modules
        // are trusted development builds.
        unsafe { Library::new(path) }.map_err(|e| load_error(path, e))
    }

    fn resolve(&self, module: &LoadedModule<Library>) -> ReloadResult<EntryPoints> {
        let library = module.handle();

        // SAFETY: the function types match the contract every module is built
        // against. The library itself is never unloaded, so the copied
        // pointers stay valid.
        let (init, iterate, event, quit) = unsafe {
            (
                lookup::<InitFn>(library, INIT_SYMBOL)?,
                lookup::<IterateFn>(library, ITERATE_SYMBOL)?,
                lookup::<EventFn>(library, EVENT_SYMBOL)?,
                lookup::<QuitFn>(library, QUIT_SYMBOL)?,
            )
        };

        Ok(EntryPoints::new(init, iterate, event, quit, module.seq()))
    }
}

/// Staging path for load number `seq`
///
/// `libgame.so` becomes `<dir>/libgame_<pid>_<seq>.so`. The pid keeps two hosts
/// sharing a staging directory from overwriting each other's loaded copies.
/// An empty `staging_dir` means the working directory; a bare file name would
/// send the dynamic loader searching the library path instead.
pub fn staging_path(staging_dir: &Path, module_path: &Path, seq: u64) -> PathBuf {
    let staging_dir = if staging_dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        staging_dir
    };

    let stem = module_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());

    let file_name = match module_path.extension() {
        Some(ext) => format!("{}_{}_{}.{}", stem, std::process::id(), seq, ext.to_string_lossy()),
        None => format!("{}_{}_{}", stem, std::process::id(), seq),
    };

    staging_dir.join(file_name)
}

/// Copy the module's current bytes to `staged`
pub fn stage_copy(module_path: &Path, staged: &Path) -> ReloadResult<()> {
    if let Some(dir) = staged.parent() {
        std::fs::create_dir_all(dir).reload_context(dir)?;
    }

    let bytes = std::fs::copy(module_path, staged).reload_context(module_path)?;
    log::debug!("Staged {} ({} bytes) at {}", module_path.display(), bytes, staged.display());
    Ok(())
}
