//! Run command implementation
//!
//! Feeds each non-empty input line to a kernel as a `SubmitCode` command and
//! renders the kernel's event stream while it runs.

use std::io::Read;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::config::KernelConfig;
use crate::error::{Result, command_failed, io_error};
use crate::kernel::{Kernel, nuget};
use crate::native::NativeModuleResolver;
use crate::restore::LocalPackagesRestorer;
use crate::ui::{EventRenderer, JsonRenderer, TerminalRenderer};

/// Run command
pub fn run(args: RunArgs) -> Result<()> {
    let mut config = KernelConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.packages_dir {
        config.packages_dir = Some(dir);
    }

    let input = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| io_error(format!("{}: {e}", path.display())))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let renderer: Box<dyn EventRenderer> = if args.json {
        Box::new(JsonRenderer::new(std::io::stdout()))
    } else {
        Box::new(TerminalRenderer::new())
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let failed = runtime.block_on(run_session(&config, submissions(&input), renderer))?;

    if failed > 0 {
        return Err(command_failed(format!("{failed} submission(s) failed")));
    }
    Ok(())
}

/// Non-empty input lines, in order
pub fn submissions(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Run `submissions` on a fresh kernel; returns how many failed
pub async fn run_session(
    config: &KernelConfig,
    submissions: Vec<String>,
    mut renderer: Box<dyn EventRenderer>,
) -> Result<usize> {
    let resolver = NativeModuleResolver::new(config.runtime_platform());
    let kernel = Kernel::builder("ikernel")
        .native_resolver(resolver)
        .poll_interval(config.poll_interval())
        .build();
    let packages_dir = config.packages_dir()?;
    info!(packages_dir = %packages_dir.display(), "using local packages folder");
    nuget::use_nuget_directives(&kernel, Arc::new(LocalPackagesRestorer::new(packages_dir)));

    let mut events = kernel.subscribe();
    let render = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => renderer.render(&event)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "renderer fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
        renderer.finish()
    });

    let mut failed = 0;
    for code in submissions {
        let result = kernel.submit_code(code).await;
        if !result.succeeded() {
            failed += 1;
        }
    }

    kernel.dispose();
    // Closing the stream lets the renderer drain and finish
    drop(kernel);

    render.await.map_err(|e| io_error(e.to_string()))??;
    Ok(failed)
}
