use clap::Parser;
use std::path::PathBuf;

/// Arguments for run command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Run a session file:\n    ikernel run --file session.txt\n\n\
                  Read submissions from stdin:\n    printf '#r mypkg,1.2.3\\n#!nuget-restore\\n' | ikernel run\n\n\
                  Emit JSON events:\n    ikernel run --json --file session.txt")]
pub struct RunArgs {
    /// File with one submission per line (defaults to stdin)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Print events as JSON lines instead of rendering them
    #[arg(long)]
    pub json: bool,

    /// Configuration file (defaults to ./ikernel.yaml if present)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Local packages folder to restore from
    #[arg(long)]
    pub packages_dir: Option<PathBuf>,
}
