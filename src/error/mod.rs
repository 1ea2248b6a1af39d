//! Error types and handling for the interactive kernel
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`package`]: Package reference errors
//! - [`restore`]: Package restore errors
//! - [`native`]: Native module loading errors
//! - [`kernel`]: Command pipeline errors
//! - [`config`]: Configuration errors
//! - [`fs`]: File system errors

pub mod config;
pub mod fs;
pub mod kernel;
pub mod native;
pub mod package;
pub mod restore;

pub use config::{
    invalid as config_invalid, parse_failed as config_parse_failed,
    read_failed as config_read_failed,
};
pub use fs::io_error;
pub use kernel::{
    command_failed, extension_activation_failed, no_language_engine, unknown_directive,
};
pub use native::load_failed as native_load_failed;
pub use package::{invalid_reference, missing_package_root, missing_version};
pub use restore::{aborted as restore_aborted, failed as restore_failed};

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for kernel operations
#[derive(Error, Diagnostic, Debug)]
pub enum KernelError {
    // Package errors
    #[error("Invalid package reference: '{input}'")]
    #[diagnostic(
        code(ikernel::package::invalid_reference),
        help("Use `#r nuget:Name,Version`, `#r Name` or `#r RestoreSources=<uri>`")
    )]
    InvalidPackageReference { input: String },

    #[error("Package '{name}' has no version")]
    #[diagnostic(
        code(ikernel::package::missing_version),
        help("A resolved package must carry the exact version that was restored")
    )]
    MissingPackageVersion { name: String },

    #[error("Cannot determine package root for '{name}'")]
    #[diagnostic(
        code(ikernel::package::missing_root),
        help("Supply a package root or at least one assembly path")
    )]
    MissingPackageRoot { name: String },

    // Restore errors
    #[error("Package restore failed: {}", errors.join("; "))]
    #[diagnostic(code(ikernel::restore::failed))]
    RestoreFailed { errors: Vec<String> },

    #[error("Package restore was aborted: {reason}")]
    #[diagnostic(code(ikernel::restore::aborted))]
    RestoreAborted { reason: String },

    // Native module errors
    #[error("Failed to load native library '{path}': {reason}")]
    #[diagnostic(code(ikernel::native::load_failed))]
    NativeLibraryLoadFailed { path: String, reason: String },

    // Kernel errors
    #[error("Unknown directive: {name}")]
    #[diagnostic(
        code(ikernel::kernel::unknown_directive),
        help("Registered directives are `#r` and `#!nuget-restore`")
    )]
    UnknownDirective { name: String },

    #[error("No language engine is attached to kernel '{kernel}'")]
    #[diagnostic(code(ikernel::kernel::no_engine))]
    NoLanguageEngine { kernel: String },

    #[error("Command failed: {message}")]
    #[diagnostic(code(ikernel::kernel::command_failed))]
    CommandFailed { message: String },

    #[error("Failed to load extensions from '{directory}': {reason}")]
    #[diagnostic(code(ikernel::kernel::extension_activation_failed))]
    ExtensionActivationFailed { directory: String, reason: String },

    // Configuration errors
    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(ikernel::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse configuration file: {path}")]
    #[diagnostic(code(ikernel::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(ikernel::config::invalid))]
    ConfigInvalid { message: String },

    // File system errors
    #[error("IO error: {message}")]
    #[diagnostic(code(ikernel::fs::io_error))]
    IoError { message: String },
}

impl From<std::io::Error> for KernelError {
    fn from(err: std::io::Error) -> Self {
        KernelError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for KernelError {
    fn from(err: serde_yaml::Error) -> Self {
        KernelError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        KernelError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, KernelError>;
