//! Probing path registry
//!
//! Directories where native libraries may live. Paths are only ever added;
//! a path registered once stays valid for the life of the process so
//! libraries that already bound through it keep resolving.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::debug;

static GLOBAL_REGISTRY: OnceLock<Arc<ProbingPathRegistry>> = OnceLock::new();

#[derive(Debug, Default)]
struct ProbingPaths {
    ordered: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

/// Insertion-ordered, union-only set of probing directories
#[derive(Debug, Default)]
pub struct ProbingPathRegistry {
    paths: Mutex<ProbingPaths>,
}

impl ProbingPathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every kernel in the process
    pub fn global() -> Arc<Self> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(Self::new()))
            .clone()
    }

    /// Union `paths` into the registry, returning how many were new
    pub fn register<I>(&self, paths: I) -> usize
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut guard = self.paths.lock().unwrap_or_else(PoisonError::into_inner);
        let mut added = 0;
        for path in paths {
            if guard.seen.insert(path.clone()) {
                debug!(path = %path.display(), "registered native probing path");
                guard.ordered.push(path);
                added += 1;
            }
        }
        added
    }

    /// Copy of the current paths in registration order
    ///
    /// Resolution iterates a snapshot, so paths registered mid-probe are only
    /// seen by later lookups.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .clone()
    }

    pub fn contains(&self, path: &std::path::Path) -> bool {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .seen
            .contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
