//! Package acquisition
//!
//! [`PackageRestoreContext`] accumulates `#r` requests and drives a
//! [`PackageRestorer`] over all of them at once. Every call to
//! [`restore`](PackageRestoreContext::restore) produces a fresh
//! [`AcquisitionResult`]; the context never fails, it reports.

pub mod local;
pub mod restorer;

pub use local::LocalPackagesRestorer;
pub use restorer::PackageRestorer;

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::domain::{AcquisitionResult, PackageReference, ResolvedPackageReference};
use crate::error::{KernelError, Result};

/// Accumulated package requests for one kernel
pub struct PackageRestoreContext {
    restorer: Arc<dyn PackageRestorer>,
    references: Mutex<Vec<PackageReference>>,
    resolved: Mutex<Vec<ResolvedPackageReference>>,
}

impl PackageRestoreContext {
    pub fn new(restorer: Arc<dyn PackageRestorer>) -> Self {
        Self {
            restorer,
            references: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
        }
    }

    /// Register a request from its raw parts
    ///
    /// Returns `Ok(false)` when an equivalent request is already registered.
    pub fn add_reference(
        &self,
        name: &str,
        version: Option<&str>,
        restore_sources: Option<&str>,
    ) -> Result<bool> {
        let reference = PackageReference::from_parts(
            name,
            version.map(str::to_string),
            restore_sources.map(str::to_string),
        )?;
        Ok(self.add(reference))
    }

    /// Register a request; false if an equivalent one is already present
    pub fn add(&self, reference: PackageReference) -> bool {
        let mut references = self
            .references
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if references.contains(&reference) {
            debug!(reference = %reference, "ignoring duplicate package reference");
            return false;
        }
        debug!(reference = %reference, "added package reference");
        references.push(reference);
        true
    }

    /// Every request registered so far, in registration order
    pub fn package_references(&self) -> Vec<PackageReference> {
        self.references
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run the restorer once over every accumulated request
    pub async fn restore(&self) -> AcquisitionResult {
        let requested = self.package_references();
        info!(count = requested.len(), "restoring packages");

        let result = match self.restorer.restore(&requested).await {
            Ok(resolved) => {
                let missing: Vec<String> = requested
                    .iter()
                    .filter(|reference| !reference.is_restore_source_only())
                    .filter(|reference| !resolved.iter().any(|r| reference.is_satisfied_by(r)))
                    .map(|reference| format!("Package '{}' was not resolved", reference.name()))
                    .collect();

                if missing.is_empty() {
                    AcquisitionResult::success(requested, resolved)
                } else {
                    AcquisitionResult::failure(requested, missing)
                }
            }
            Err(KernelError::RestoreFailed { errors }) => {
                AcquisitionResult::failure(requested, errors)
            }
            Err(e) => AcquisitionResult::failure(requested, vec![e.to_string()]),
        };

        if result.succeeded() {
            let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
            for reference in result.resolved_references() {
                let pinned = reference.reference();
                resolved.retain(|known| !pinned.is_satisfied_by(known));
                resolved.push(reference.clone());
            }
            info!(
                resolved = result.resolved_references().len(),
                "package restore succeeded"
            );
        } else {
            warn!(errors = ?result.errors(), "package restore failed");
        }

        result
    }

    /// Most recent resolution that fulfils `reference`
    pub fn resolved_reference(
        &self,
        reference: &PackageReference,
    ) -> Option<ResolvedPackageReference> {
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|resolved| reference.is_satisfied_by(resolved))
            .cloned()
    }
}
