//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - run: Run command arguments
//! - probe: Probe command arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};

pub mod completions;
pub mod probe;
pub mod run;

pub use completions::CompletionsArgs;
pub use probe::ProbeArgs;
pub use run::RunArgs;

/// ikernel - interactive kernel host
///
/// Runs submissions through a directive-driven kernel with package restore.
#[derive(Parser, Debug)]
#[command(
    name = "ikernel",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Directive-driven interactive kernel with package restore",
    long_about = "ikernel runs code submissions through an interactive kernel. `#r` directives \
                  record package references, `#!nuget-restore` restores them from a local packages \
                  folder and registers their native library locations.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  ikernel run --file session.txt          \x1b[90m# Run each line as a submission\x1b[0m\n   \
                  ikernel run --json < session.txt        \x1b[90m# Emit events as JSON lines\x1b[0m\n   \
                  ikernel probe sqlite3 --path ./pkgs/p   \x1b[90m# Locate a native library\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Enable verbose logging (repeat for trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit code to a kernel and render its events
    Run(RunArgs),

    /// Resolve a native library against probing paths
    Probe(ProbeArgs),

    /// Show version information
    #[command(hide = true)]
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}
