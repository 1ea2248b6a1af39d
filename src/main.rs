//! ikernel - interactive kernel host
//!
//! Runs code submissions through a directive-driven kernel that restores
//! packages and resolves their native libraries.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use interactive_kernel::cli::{Cli, Commands};
use interactive_kernel::commands;

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "IKERNEL_LOG";

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("interactive_kernel={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Probe(args) => commands::probe::run(args),
        Commands::Version => commands::version::run(),
        Commands::Completions(args) => commands::completions::run(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
