//! Acquisition result
//!
//! The consolidated outcome of one restore over every accumulated reference.

use std::path::PathBuf;

use serde::Serialize;

use super::{PackageReference, ResolvedPackageReference};

/// Outcome of a single `restore()` invocation. Never mutated after construction.
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionResult {
    succeeded: bool,
    requested_references: Vec<PackageReference>,
    resolved_references: Vec<ResolvedPackageReference>,
    errors: Vec<String>,
}

impl AcquisitionResult {
    pub fn success(
        requested_references: Vec<PackageReference>,
        resolved_references: Vec<ResolvedPackageReference>,
    ) -> Self {
        Self {
            succeeded: true,
            requested_references,
            resolved_references,
            errors: Vec::new(),
        }
    }

    /// A failed restore carries no resolved references
    pub fn failure(requested_references: Vec<PackageReference>, errors: Vec<String>) -> Self {
        Self {
            succeeded: false,
            requested_references,
            resolved_references: Vec::new(),
            errors,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// The first reference the restore was issued for
    pub fn requested_package(&self) -> Option<&PackageReference> {
        self.requested_references.first()
    }

    pub fn requested_references(&self) -> &[PackageReference] {
        &self.requested_references
    }

    pub fn resolved_references(&self) -> &[ResolvedPackageReference] {
        &self.resolved_references
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Distinct union of every resolved reference's probing paths, first-seen order
    pub fn native_library_probing_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for path in self
            .resolved_references
            .iter()
            .flat_map(ResolvedPackageReference::probing_paths)
        {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    /// Distinct union of every resolved reference's assembly paths, first-seen order
    pub fn added_assembly_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for path in self
            .resolved_references
            .iter()
            .flat_map(ResolvedPackageReference::assembly_paths)
        {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    pub fn resolved_reference(&self, name: &str) -> Option<&ResolvedPackageReference> {
        self.resolved_references
            .iter()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }

    /// Version that was actually installed for `name`
    pub fn installed_version(&self, name: &str) -> Option<&str> {
        self.resolved_reference(name)
            .map(ResolvedPackageReference::version)
    }
}
