//! Native module resolution
//!
//! This module handles:
//! - The process-wide registry of native probing paths
//! - Hooks that let managed modules find native libraries shipped in packages
//! - Locating a library by logical name under `runtimes/<rid>` and loading it
//!
//! Resolution never fails loudly. A library that cannot be found, is ambiguous,
//! or fails to load yields [`NativeResolution::NotFound`] and the host reports
//! its own load error later.

pub mod hooks;
pub mod loader;
pub mod platform;
pub mod registry;

pub use hooks::{LoadHookTable, ManagedModule};
pub use loader::{LocateOnlyLoader, NativeHandle, NativeLoader, SystemLoader};
pub use platform::RuntimePlatform;
pub use registry::ProbingPathRegistry;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::ResolvedPackageReference;

static NEXT_RESOLVER_ID: AtomicU64 = AtomicU64::new(1);

/// Outcome of a native library lookup
#[derive(Debug, Clone)]
pub enum NativeResolution {
    Loaded(NativeHandle),
    /// Unresolved; the host continues with default handling
    NotFound,
}

impl NativeResolution {
    pub fn is_loaded(&self) -> bool {
        matches!(self, NativeResolution::Loaded(_))
    }

    pub fn handle(&self) -> Option<&NativeHandle> {
        match self {
            NativeResolution::Loaded(handle) => Some(handle),
            NativeResolution::NotFound => None,
        }
    }
}

/// Locates native libraries for managed modules loaded from restored packages
///
/// Each kernel owns one resolver. Probing paths are shared process-wide through
/// the [`ProbingPathRegistry`]; hooks are installed in the [`LoadHookTable`]
/// and removed again by [`dispose`](Self::dispose).
pub struct NativeModuleResolver {
    id: u64,
    this: Weak<NativeModuleResolver>,
    registry: Arc<ProbingPathRegistry>,
    hooks: Arc<LoadHookTable>,
    loader: Arc<dyn NativeLoader>,
    platform: RuntimePlatform,
    local_paths: Mutex<Vec<PathBuf>>,
    disposed: AtomicBool,
}

impl NativeModuleResolver {
    /// Resolver wired to the process-wide registry and hook table
    pub fn new(platform: RuntimePlatform) -> Arc<Self> {
        Self::with_parts(
            ProbingPathRegistry::global(),
            LoadHookTable::global(),
            Arc::new(SystemLoader),
            platform,
        )
    }

    /// Resolver with injected shared state
    pub fn with_parts(
        registry: Arc<ProbingPathRegistry>,
        hooks: Arc<LoadHookTable>,
        loader: Arc<dyn NativeLoader>,
        platform: RuntimePlatform,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: NEXT_RESOLVER_ID.fetch_add(1, Ordering::Relaxed),
            this: this.clone(),
            registry,
            hooks,
            loader,
            platform,
            local_paths: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn platform(&self) -> &RuntimePlatform {
        &self.platform
    }

    pub fn registry(&self) -> &Arc<ProbingPathRegistry> {
        &self.registry
    }

    /// Union `paths` into this resolver's set and the process-wide set
    ///
    /// Returns how many paths were new to the process. Modules that already
    /// bound their libraries are not re-resolved.
    pub fn register_probing_paths<I>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().collect();
        {
            let mut local = self
                .local_paths
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for path in &paths {
                if !local.contains(path) {
                    local.push(path.clone());
                }
            }
        }
        self.registry.register(paths)
    }

    /// Paths registered through this resolver
    pub fn probing_paths(&self) -> Vec<PathBuf> {
        self.local_paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install the resolution hook on a loaded module
    ///
    /// Dynamic modules are skipped; so is everything once disposed.
    pub fn attach(&self, module: &ManagedModule) -> bool {
        if self.is_disposed() || module.is_dynamic() {
            return false;
        }
        self.hooks.install(module, self.id, self.this.clone())
    }

    /// Host notification that a module finished loading
    pub fn on_module_loaded(&self, module: &ManagedModule) -> bool {
        self.attach(module)
    }

    /// Attach hooks for every module path belonging to a restored package
    pub fn attach_reference(&self, reference: &ResolvedPackageReference) -> usize {
        reference
            .assembly_paths()
            .iter()
            .filter(|path| self.attach(&ManagedModule::from_path(path.as_path())))
            .count()
    }

    /// Locate and load `module_name` on behalf of `requesting`
    ///
    /// Every registered directory is searched. A directory counts only if it
    /// holds exactly one candidate; if the counting directories disagree on
    /// the file, the request is ambiguous and stays unresolved.
    pub fn resolve(&self, module_name: &str, requesting: &ManagedModule) -> NativeResolution {
        let candidates = self.platform.candidate_file_names(module_name);
        let mut found: Option<PathBuf> = None;

        for directory in self.registry.snapshot() {
            let matches = match self.probe_directory(&directory, &candidates) {
                Ok(matches) => matches,
                Err(e) => {
                    debug!(
                        directory = %directory.display(),
                        error = %e,
                        "skipping unreadable probing path"
                    );
                    continue;
                }
            };

            match matches.as_slice() {
                [] => {}
                [single] => {
                    let canonical = dunce::canonicalize(single).unwrap_or_else(|_| single.clone());
                    match &found {
                        None => found = Some(canonical),
                        Some(existing) if *existing == canonical => {}
                        Some(existing) => {
                            debug!(
                                module = module_name,
                                first = %existing.display(),
                                second = %canonical.display(),
                                "ambiguous native library"
                            );
                            return NativeResolution::NotFound;
                        }
                    }
                }
                many => {
                    debug!(
                        module = module_name,
                        directory = %directory.display(),
                        count = many.len(),
                        "ambiguous native library within probing path"
                    );
                }
            }
        }

        let Some(path) = found else {
            debug!(
                module = module_name,
                requested_by = requesting.name(),
                "native library not found"
            );
            return NativeResolution::NotFound;
        };

        match self.loader.load(&path) {
            Ok(handle) => {
                info!(
                    module = module_name,
                    path = %path.display(),
                    requested_by = requesting.name(),
                    "loaded native library"
                );
                NativeResolution::Loaded(handle)
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "native library failed to load");
                NativeResolution::NotFound
            }
        }
    }

    fn probe_directory(&self, directory: &Path, candidates: &[String]) -> io::Result<Vec<PathBuf>> {
        let mut matches = Vec::new();
        for root in self.platform.search_roots(directory) {
            if !root.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&root).follow_links(true) {
                let entry = entry.map_err(io::Error::from)?;
                if entry.file_type().is_file()
                    && self
                        .platform
                        .matches(&entry.file_name().to_string_lossy(), candidates)
                {
                    matches.push(entry.into_path());
                }
            }
        }
        Ok(matches)
    }

    /// Detach every hook this resolver installed
    ///
    /// Registered probing paths stay in the process-wide registry.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            let removed = self.hooks.remove_owner(self.id);
            debug!(resolver = self.id, removed, "disposed native module resolver");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for NativeModuleResolver {
    fn drop(&mut self) {
        self.dispose();
    }
}
