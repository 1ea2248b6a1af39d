//! Package directives
//!
//! - `#r <package-spec>` records a package request
//! - `#!nuget-restore` restores every recorded request, reports progress
//!   while it runs, then wires the results into the kernel

use std::sync::Arc;

use tracing::{debug, info};

use super::{Command, InvocationContext, Kernel};
use crate::domain::{AcquisitionResult, PackageReference};
use crate::error::{Result, restore_aborted};
use crate::restore::{PackageRestoreContext, PackageRestorer};

pub const REFERENCE_DIRECTIVE: &str = "#r";
pub const RESTORE_DIRECTIVE: &str = "#!nuget-restore";

/// A progress line shown while a restore is running
struct PendingDisplay {
    key: String,
    message: String,
    reference: PackageReference,
    settled: bool,
}

impl PendingDisplay {
    fn settle(&mut self, context: &InvocationContext) {
        self.settled = true;
        context.update_display(format!("{} done!", self.message), self.key.clone());
    }
}

/// Register `#r` and `#!nuget-restore` on `kernel`
///
/// Returns the restore context both directives share.
pub fn use_nuget_directives(
    kernel: &Kernel,
    restorer: Arc<dyn PackageRestorer>,
) -> Arc<PackageRestoreContext> {
    let restore_context = Arc::new(PackageRestoreContext::new(restorer));

    let references = Arc::clone(&restore_context);
    kernel.add_directive(REFERENCE_DIRECTIVE, move |context, args| {
        let restore_context = Arc::clone(&references);
        Box::pin(async move {
            let reference = PackageReference::parse(&args)?;
            context
                .send(add_package_command(restore_context, reference))
                .await
        })
    });

    let restores = Arc::clone(&restore_context);
    kernel.add_directive(RESTORE_DIRECTIVE, move |context, _args| {
        let restore_context = Arc::clone(&restores);
        Box::pin(async move { context.send(restore_command(restore_context)).await })
    });

    restore_context
}

/// `AddPackage` command whose handler records the request
pub fn add_package_command(
    restore_context: Arc<PackageRestoreContext>,
    reference: PackageReference,
) -> Command {
    Command::add_package(reference.clone()).with_handler(move |context| {
        let restore_context = Arc::clone(&restore_context);
        let reference = reference.clone();
        Box::pin(async move {
            restore_context.add(reference);
            context.complete();
            Ok(())
        })
    })
}

/// `RestoreDirective` command whose handler restores every recorded request
pub fn restore_command(restore_context: Arc<PackageRestoreContext>) -> Command {
    Command::restore_directive().with_handler(move |context| {
        let restore_context = Arc::clone(&restore_context);
        Box::pin(restore_packages(context, restore_context))
    })
}

async fn restore_packages(
    context: InvocationContext,
    restore_context: Arc<PackageRestoreContext>,
) -> Result<()> {
    let requested = restore_context.package_references();
    let mut pending = announce(&context, &requested);

    let mut restore = tokio::spawn({
        let restore_context = Arc::clone(&restore_context);
        async move { restore_context.restore().await }
    });

    let interval = context.handling_kernel().poll_interval();
    let result = loop {
        tokio::select! {
            biased;
            joined = &mut restore => {
                break joined.unwrap_or_else(|e| {
                    AcquisitionResult::failure(
                        requested.clone(),
                        vec![restore_aborted(e.to_string()).to_string()],
                    )
                });
            }
            () = tokio::time::sleep(interval) => {
                for display in &mut pending {
                    display.message.push('.');
                    context.update_display(display.message.clone(), display.key.clone());
                }
            }
        }
    };

    if result.succeeded() {
        apply_restore(&context, &result, &mut pending).await?;
    } else {
        report_failures(&context, &result);
    }

    context.complete();
    Ok(())
}

/// Publish the initial progress line for each request
fn announce(context: &InvocationContext, requested: &[PackageReference]) -> Vec<PendingDisplay> {
    requested
        .iter()
        .map(|reference| {
            let key = reference.display_key();
            let message = format!("{key}...");
            context.display_value(message.clone(), Some(key.clone()));
            PendingDisplay {
                key,
                message,
                reference: reference.clone(),
                settled: false,
            }
        })
        .collect()
}

async fn apply_restore(
    context: &InvocationContext,
    result: &AcquisitionResult,
    pending: &mut [PendingDisplay],
) -> Result<()> {
    let kernel = context.handling_kernel();

    if let Some(resolver) = kernel.native_resolver() {
        let added = resolver.register_probing_paths(result.native_library_probing_paths());
        let hooked: usize = result
            .resolved_references()
            .iter()
            .map(|reference| resolver.attach_reference(reference))
            .sum();
        debug!(added, hooked, "registered native probing paths");
    }

    if let Some(engine) = kernel.language_engine() {
        engine.add_script_references(result.resolved_references());
    }

    let added_assembly_paths = result.added_assembly_paths();

    for display in pending
        .iter_mut()
        .filter(|display| display.reference.is_restore_source_only())
    {
        display.settle(context);
    }

    for resolved in result.resolved_references() {
        // Prefer an exact version match so a floating request does not take
        // the line of a pinned one
        let exact = resolved.reference();
        let display = pending
            .iter()
            .position(|d| !d.settled && d.reference == exact)
            .or_else(|| {
                pending
                    .iter()
                    .position(|d| !d.settled && d.reference.is_satisfied_by(resolved))
            });
        if let Some(index) = display {
            pending[index].settle(context);
        }

        context.package_added(resolved.clone());
        info!(package = %resolved, "package added");

        context
            .send(Command::load_extensions_in_directory(
                resolved.package_root().to_path_buf(),
                added_assembly_paths.clone(),
            ))
            .await?;
    }

    Ok(())
}

fn report_failures(context: &InvocationContext, result: &AcquisitionResult) {
    let errors = result.errors().join("\n");
    for reference in result.requested_references() {
        let message = if reference.is_restore_source_only() {
            format!(
                "Failed to apply restore sources {}\n{errors}",
                reference.restore_sources_value().unwrap_or_default()
            )
        } else {
            format!("Failed to add reference to package {}\n{errors}", reference.name())
        };
        context.error(message);
    }
}
