//! Native module loading errors

use super::KernelError;

/// Creates a native library load failed error
pub fn load_failed(path: impl Into<String>, reason: impl Into<String>) -> KernelError {
    KernelError::NativeLibraryLoadFailed {
        path: path.into(),
        reason: reason.into(),
    }
}
