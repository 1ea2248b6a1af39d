//! Per-module resolution hooks
//!
//! The host calls a single process-wide entry point, [`LoadHookTable::dispatch`],
//! when a managed module fails to bind a native library by normal means. The
//! table maps the requesting module's location to every resolver that attached
//! to it, oldest first; modules with no live hook fall through to default
//! handling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use tracing::debug;

use super::{NativeModuleResolver, NativeResolution};

static GLOBAL_HOOKS: OnceLock<Arc<LoadHookTable>> = OnceLock::new();

/// A managed code module as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagedModule {
    name: String,
    location: Option<PathBuf>,
}

impl ManagedModule {
    /// A module loaded from a file
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let location = path.into();
        let name = location
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            location: Some(location),
        }
    }

    /// A module generated in memory; it has no location and never gets a hook
    pub fn dynamic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn is_dynamic(&self) -> bool {
        self.location.is_none()
    }
}

struct HookEntry {
    owner: u64,
    resolver: Weak<NativeModuleResolver>,
}

/// Registration table keyed by module location
#[derive(Default)]
pub struct LoadHookTable {
    hooks: RwLock<HashMap<PathBuf, Vec<HookEntry>>>,
}

impl LoadHookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table consulted by the process-wide load hook
    pub fn global() -> Arc<Self> {
        GLOBAL_HOOKS.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Attach `resolver` to `module` on behalf of `owner`
    ///
    /// Returns false for dynamic modules and when `owner` already has a live
    /// hook on the module. Hooks from other owners are kept.
    pub(crate) fn install(
        &self,
        module: &ManagedModule,
        owner: u64,
        resolver: Weak<NativeModuleResolver>,
    ) -> bool {
        let Some(location) = module.location() else {
            return false;
        };

        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        let entries = hooks.entry(location.to_path_buf()).or_default();
        entries.retain(|entry| entry.resolver.strong_count() > 0);
        if entries.iter().any(|entry| entry.owner == owner) {
            return false;
        }

        debug!(module = %location.display(), owner, "attached native resolution hook");
        entries.push(HookEntry { owner, resolver });
        true
    }

    /// Detach every hook installed by `owner`
    pub(crate) fn remove_owner(&self, owner: u64) -> usize {
        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = 0;
        hooks.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.owner != owner);
            removed += before - entries.len();
            !entries.is_empty()
        });
        removed
    }

    pub fn is_attached(&self, module: &ManagedModule) -> bool {
        module.location().is_some_and(|location| {
            self.hooks
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(location)
                .is_some_and(|entries| {
                    entries.iter().any(|entry| entry.resolver.strong_count() > 0)
                })
        })
    }

    /// Number of modules with at least one hook
    pub fn len(&self) -> usize {
        self.hooks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry point for the host when `requesting` cannot bind `module_name`
    ///
    /// Never fails: anything short of a loaded handle is `NotFound`, and the
    /// host carries on with its default handling.
    pub fn dispatch(&self, module_name: &str, requesting: &ManagedModule) -> NativeResolution {
        let resolver = requesting.location().and_then(|location| {
            self.hooks
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(location)
                .and_then(|entries| entries.iter().find_map(|entry| entry.resolver.upgrade()))
        });

        match resolver {
            Some(resolver) => resolver.resolve(module_name, requesting),
            None => NativeResolution::NotFound,
        }
    }
}
