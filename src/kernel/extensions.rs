//! Collaborators a kernel hands work to

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::InvocationContext;
use crate::domain::ResolvedPackageReference;
use crate::error::Result;

/// Executes submitted code that is not a directive
#[async_trait]
pub trait LanguageEngine: Send + Sync {
    async fn execute(&self, code: &str, context: &InvocationContext) -> Result<()>;

    /// Make restored packages' assemblies visible to subsequent submissions
    fn add_script_references(&self, references: &[ResolvedPackageReference]);
}

/// Loads kernel extensions shipped inside a restored package
///
/// An error fails the `LoadExtensionsInDirectory` command and, through it,
/// the restore directive that sent it.
#[async_trait]
pub trait ExtensionActivator: Send + Sync {
    async fn activate(
        &self,
        package_root: &Path,
        assembly_paths: &[PathBuf],
        context: &InvocationContext,
    ) -> Result<()>;
}
