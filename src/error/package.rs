//! Package reference errors

use super::KernelError;

/// Creates an invalid package reference error
pub fn invalid_reference(input: impl Into<String>) -> KernelError {
    KernelError::InvalidPackageReference {
        input: input.into(),
    }
}

/// Creates a missing version error
pub fn missing_version(name: impl Into<String>) -> KernelError {
    KernelError::MissingPackageVersion { name: name.into() }
}

/// Creates a missing package root error
pub fn missing_package_root(name: impl Into<String>) -> KernelError {
    KernelError::MissingPackageRoot { name: name.into() }
}
