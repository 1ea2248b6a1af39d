//! Package restore errors

use super::KernelError;

/// Creates a restore failed error carrying one message per failing reference
pub fn failed(errors: Vec<String>) -> KernelError {
    KernelError::RestoreFailed { errors }
}

/// Creates a restore aborted error
pub fn aborted(reason: impl Into<String>) -> KernelError {
    KernelError::RestoreAborted {
        reason: reason.into(),
    }
}
