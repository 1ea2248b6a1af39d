//! Command implementations for the ikernel CLI

pub mod completions;
pub mod probe;
pub mod run;
pub mod version;
