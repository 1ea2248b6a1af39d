//! Domain models for the interactive kernel
//!
//! Immutable value types describing requested dependencies and the outcome of
//! acquiring them. Free of I/O.

pub mod package;
pub mod result;

pub use package::{PackageIdentity, PackageReference, ResolvedPackageReference};
pub use result::AcquisitionResult;
