//! File system errors

use super::KernelError;

/// Creates an IO error
pub fn io_error(message: impl Into<String>) -> KernelError {
    KernelError::IoError {
        message: message.into(),
    }
}
