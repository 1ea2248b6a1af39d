//! Loading native libraries into the process

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;

use crate::error::{Result, native_load_failed};

/// A loaded native library
///
/// Cloning shares the underlying library; it stays loaded until the last clone
/// is dropped.
#[derive(Clone)]
pub struct NativeHandle {
    path: PathBuf,
    library: Option<Arc<Library>>,
}

impl NativeHandle {
    /// Wrap a library loaded through the system loader
    pub fn from_library(path: impl Into<PathBuf>, library: Library) -> Self {
        Self {
            path: path.into(),
            library: Some(Arc::new(library)),
        }
    }

    /// Handle for a library whose lifetime is managed elsewhere (host-owned)
    pub fn detached(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            library: None,
        }
    }

    /// File the handle was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn library(&self) -> Option<&Library> {
        self.library.as_deref()
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("path", &self.path)
            .field("loaded", &self.library.is_some())
            .finish()
    }
}

/// Turns a located file into a loaded handle
pub trait NativeLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<NativeHandle>;
}

/// Loads libraries with the platform dynamic loader (`dlopen` / `LoadLibrary`)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

impl NativeLoader for SystemLoader {
    fn load(&self, path: &Path) -> Result<NativeHandle> {
        // SAFETY: loading runs the library's initialisers. The file was found
        // under a probing path registered from a restored package, which is
        // the same trust boundary as the managed code requesting it.
        let library = unsafe { Library::new(path) }
            .map_err(|e| native_load_failed(path.display().to_string(), e.to_string()))?;
        Ok(NativeHandle::from_library(path, library))
    }
}

/// Reports the located file without loading it
#[derive(Debug, Default, Clone, Copy)]
pub struct LocateOnlyLoader;

impl NativeLoader for LocateOnlyLoader {
    fn load(&self, path: &Path) -> Result<NativeHandle> {
        Ok(NativeHandle::detached(path))
    }
}
