//! Command pipeline errors

use super::KernelError;

/// Creates an unknown directive error
pub fn unknown_directive(name: impl Into<String>) -> KernelError {
    KernelError::UnknownDirective { name: name.into() }
}

/// Creates a command failed error
pub fn command_failed(message: impl Into<String>) -> KernelError {
    KernelError::CommandFailed {
        message: message.into(),
    }
}

/// Creates an extension activation failed error
pub fn extension_activation_failed(
    directory: impl Into<String>,
    reason: impl Into<String>,
) -> KernelError {
    KernelError::ExtensionActivationFailed {
        directory: directory.into(),
        reason: reason.into(),
    }
}

/// Creates a missing language engine error
pub fn no_language_engine(kernel: impl Into<String>) -> KernelError {
    KernelError::NoLanguageEngine {
        kernel: kernel.into(),
    }
}
