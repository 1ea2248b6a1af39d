//! Configuration errors

use super::KernelError;

/// Creates a config parse failed error
pub fn parse_failed(path: impl Into<String>, reason: impl Into<String>) -> KernelError {
    KernelError::ConfigParseFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates an invalid config error
pub fn invalid(message: impl Into<String>) -> KernelError {
    KernelError::ConfigInvalid {
        message: message.into(),
    }
}

/// Creates a config read failed error
pub fn read_failed(path: impl Into<String>, reason: impl Into<String>) -> KernelError {
    KernelError::ConfigReadFailed {
        path: path.into(),
        reason: reason.into(),
    }
}
