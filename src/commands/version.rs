//! Version command implementation

use crate::error::Result;
use crate::native::RuntimePlatform;

/// Run version command
pub fn run() -> Result<()> {
    println!("ikernel {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Build info:");
    println!("  Minimum Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("  Profile: {}", build_profile());
    println!("  Runtime identifier: {}", RuntimePlatform::current().rid());

    Ok(())
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
