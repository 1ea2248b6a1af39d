//! The external restore seam

use async_trait::async_trait;

use crate::domain::{PackageReference, ResolvedPackageReference};
use crate::error::Result;

/// Fetches and lays out packages
///
/// Implementations run once per [`PackageRestoreContext::restore`] call with
/// every accumulated reference. On failure they return
/// [`KernelError::RestoreFailed`] carrying one message per failing reference;
/// any other error is reported as a single message.
///
/// [`PackageRestoreContext::restore`]: super::PackageRestoreContext::restore
/// [`KernelError::RestoreFailed`]: crate::error::KernelError::RestoreFailed
#[async_trait]
pub trait PackageRestorer: Send + Sync {
    async fn restore(
        &self,
        references: &[PackageReference],
    ) -> Result<Vec<ResolvedPackageReference>>;
}
