//! Interactive kernel
//!
//! A directive-driven command/event kernel with background package restore
//! and on-demand native library resolution.
//!
//! - [`kernel`]: commands, events, directives and the package directives
//! - [`restore`]: accumulating package requests and restoring them
//! - [`native`]: probing path registry and native library resolution
//! - [`domain`]: package reference value types
//! - [`ui`]: rendering the event stream

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod kernel;
pub mod native;
pub mod restore;
pub mod ui;

pub use error::{KernelError, Result};
