use clap::Parser;
use std::path::PathBuf;

/// Arguments for probe command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Look for sqlite3 in a package folder:\n    ikernel probe sqlite3 --path ~/.nuget/packages/sqlite/3.13.0\n\n\
                  Probe for another platform:\n    ikernel probe sqlite3 --path ./pkg --rid win-x64")]
pub struct ProbeArgs {
    /// Logical native library name (e.g. sqlite3)
    pub name: String,

    /// Probing path to search; repeat for more
    #[arg(long = "path", short = 'p', required = true)]
    pub paths: Vec<PathBuf>,

    /// Runtime identifier directory under runtimes/ (defaults to this platform)
    #[arg(long)]
    pub rid: Option<String>,

    /// Load the library with the system loader instead of only locating it
    #[arg(long)]
    pub load: bool,
}
