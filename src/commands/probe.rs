//! Probe command implementation
//!
//! Runs native library resolution against explicit probing paths, using a
//! private registry so nothing leaks into the process-wide one.

use std::path::PathBuf;
use std::sync::Arc;

use console::Style;

use crate::cli::ProbeArgs;
use crate::error::{Result, native_load_failed};
use crate::native::{
    LoadHookTable, LocateOnlyLoader, ManagedModule, NativeLoader, NativeModuleResolver,
    NativeResolution, ProbingPathRegistry, RuntimePlatform, SystemLoader,
};

/// Run probe command
pub fn run(args: ProbeArgs) -> Result<()> {
    let resolution = probe(&args);
    match resolution.handle() {
        Some(handle) => {
            println!("{}", handle.path().display());
            Ok(())
        }
        None => {
            eprintln!(
                "{} no unique match for '{}' under {}",
                Style::new().red().bold().apply_to("not found:"),
                args.name,
                search_description(&args.paths)
            );
            Err(native_load_failed(
                args.name,
                "not found or ambiguous in the given probing paths",
            ))
        }
    }
}

fn probe(args: &ProbeArgs) -> NativeResolution {
    let platform = args
        .rid
        .clone()
        .map_or_else(RuntimePlatform::current, RuntimePlatform::with_rid);
    let loader: Arc<dyn NativeLoader> = if args.load {
        Arc::new(SystemLoader)
    } else {
        Arc::new(LocateOnlyLoader)
    };

    let resolver = NativeModuleResolver::with_parts(
        Arc::new(ProbingPathRegistry::new()),
        Arc::new(LoadHookTable::new()),
        loader,
        platform,
    );
    resolver.register_probing_paths(args.paths.iter().cloned());
    resolver.resolve(&args.name, &ManagedModule::dynamic("ikernel-probe"))
}

fn search_description(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
