//! End-to-end tests for `#r` and `#!nuget-restore`

mod common;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{FakeRestorer, event_label};
use interactive_kernel::domain::ResolvedPackageReference;
use interactive_kernel::error::{Result, extension_activation_failed};
use interactive_kernel::kernel::{
    CommandStatus, ExtensionActivator, InvocationContext, Kernel, KernelEvent, LanguageEngine,
    nuget::use_nuget_directives,
};
use interactive_kernel::native::{
    LoadHookTable, LocateOnlyLoader, ManagedModule, NativeModuleResolver, ProbingPathRegistry,
    RuntimePlatform,
};

#[derive(Default)]
struct RecordingActivator {
    calls: Mutex<Vec<(PathBuf, Vec<PathBuf>)>>,
    fail: bool,
}

#[async_trait]
impl ExtensionActivator for RecordingActivator {
    async fn activate(
        &self,
        package_root: &Path,
        assembly_paths: &[PathBuf],
        _context: &InvocationContext,
    ) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((package_root.to_path_buf(), assembly_paths.to_vec()));
        if self.fail {
            return Err(extension_activation_failed(
                package_root.display().to_string(),
                "extension threw during load",
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingEngine {
    references: Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageEngine for RecordingEngine {
    async fn execute(&self, _code: &str, _context: &InvocationContext) -> Result<()> {
        Ok(())
    }

    fn add_script_references(&self, references: &[ResolvedPackageReference]) {
        self.references
            .lock()
            .unwrap()
            .extend(references.iter().map(ToString::to_string));
    }
}

fn visible(events: &[KernelEvent]) -> Vec<&'static str> {
    events
        .iter()
        .filter(|event| !event.is_terminal())
        .map(event_label)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_successful_restore_event_order() {
    let activator = Arc::new(RecordingActivator::default());
    let kernel = Kernel::builder("csharp")
        .extension_activator(Arc::clone(&activator) as Arc<dyn ExtensionActivator>)
        .build();
    let restorer =
        Arc::new(FakeRestorer::succeeding(2).with_delay(Duration::from_millis(1_200)));
    use_nuget_directives(&kernel, restorer);

    assert!(kernel.submit_code("#r mypkg,1.2.3").await.succeeded());
    let result = kernel.submit_code("#!nuget-restore").await;

    assert_eq!(result.status, CommandStatus::Completed);
    assert_eq!(
        visible(&result.events),
        vec!["produced", "updated", "updated", "updated", "package-added"]
    );

    let key = "Installing package mypkg, version 1.2.3";
    assert!(result.events.iter().filter(|e| e.key().is_some()).all(|e| e.key() == Some(key)));
    match result.events.iter().rev().find(|e| e.key().is_some()) {
        Some(KernelEvent::DisplayedValueUpdated { message, .. }) => {
            assert!(message.ends_with("...done!") || message.ends_with(". done!"));
        }
        other => panic!("expected final update, got {other:?}"),
    }

    let calls = activator.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, PathBuf::from("/pkgs/mypkg/1.2.3"));
    assert_eq!(calls[0].1.len(), 2);
}

#[tokio::test]
async fn test_failed_restore_reports_error_and_completes() {
    let kernel = Kernel::builder("csharp").build();
    use_nuget_directives(&kernel, Arc::new(FakeRestorer::failing(&["not found"])));

    kernel.submit_code("#r badpkg").await;
    let result = kernel.submit_code("#!nuget-restore").await;

    assert_eq!(result.status, CommandStatus::Completed);
    let errors: Vec<&str> = result
        .events
        .iter()
        .filter_map(|event| match event {
            KernelEvent::ErrorProduced { message, .. } => Some(message.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("badpkg"));
    assert!(errors[0].contains("not found"));
    assert!(
        !result
            .events
            .iter()
            .any(|e| matches!(e, KernelEvent::PackageAdded { .. }))
    );
}

#[tokio::test]
async fn test_extensions_see_every_restored_assembly() {
    let activator = Arc::new(RecordingActivator::default());
    let kernel = Kernel::builder("csharp")
        .extension_activator(Arc::clone(&activator) as Arc<dyn ExtensionActivator>)
        .build();
    use_nuget_directives(&kernel, Arc::new(FakeRestorer::succeeding(2)));

    kernel.submit_code("#r alpha,1.0.0\n#r beta,2.0.0").await;
    let result = kernel.submit_code("#!nuget-restore").await;
    assert!(result.succeeded());

    let calls = activator.calls.lock().unwrap();
    let roots: Vec<&Path> = calls.iter().map(|(root, _)| root.as_path()).collect();
    assert_eq!(
        roots,
        vec![Path::new("/pkgs/alpha/1.0.0"), Path::new("/pkgs/beta/2.0.0")]
    );
    for (_, paths) in calls.iter() {
        assert_eq!(paths.len(), 4);
    }
}

#[tokio::test]
async fn test_activation_failure_fails_restore() {
    let activator = Arc::new(RecordingActivator {
        fail: true,
        ..RecordingActivator::default()
    });
    let kernel = Kernel::builder("csharp")
        .extension_activator(Arc::clone(&activator) as Arc<dyn ExtensionActivator>)
        .build();
    use_nuget_directives(&kernel, Arc::new(FakeRestorer::succeeding(1)));

    kernel.submit_code("#r mypkg,1.2.3").await;
    let result = kernel.submit_code("#!nuget-restore").await;

    assert_eq!(result.status, CommandStatus::Failed);
    assert!(
        result
            .events
            .iter()
            .any(|e| matches!(e, KernelEvent::PackageAdded { .. }))
    );
    let failure = result
        .events
        .iter()
        .rev()
        .find_map(|event| match event {
            KernelEvent::CommandFailed { command, message, .. } if *command == result.command => {
                Some(message.clone())
            }
            _ => None,
        })
        .unwrap();
    assert!(failure.contains("extension threw during load"));
}

#[tokio::test]
async fn test_duplicate_directive_is_silent() {
    let restorer = Arc::new(FakeRestorer::succeeding(1));
    let kernel = Kernel::builder("csharp").build();
    let restore_context = use_nuget_directives(&kernel, Arc::clone(&restorer) as _);

    kernel.submit_code("#r mypkg,1.2.3").await;
    let duplicate = kernel.submit_code("#r mypkg,1.2.3").await;

    assert!(duplicate.succeeded());
    assert!(visible(&duplicate.events).is_empty());
    assert_eq!(restore_context.package_references().len(), 1);
}

#[tokio::test]
async fn test_restore_twice_refetches_accumulated_set() {
    let restorer = Arc::new(FakeRestorer::succeeding(1));
    let kernel = Kernel::builder("csharp").build();
    use_nuget_directives(&kernel, Arc::clone(&restorer) as _);

    kernel.submit_code("#r mypkg,1.2.3").await;
    kernel.submit_code("#!nuget-restore").await;
    kernel.submit_code("#r other,0.1.0").await;
    kernel.submit_code("#!nuget-restore").await;

    assert_eq!(restorer.calls(), 2);
    let seen = restorer.seen.lock().unwrap();
    assert_eq!(seen[0].len(), 1);
    assert_eq!(seen[1].len(), 2);
}

#[tokio::test]
async fn test_restore_registers_native_paths_and_hooks() {
    let registry = Arc::new(ProbingPathRegistry::new());
    let hooks = Arc::new(LoadHookTable::new());
    let resolver = NativeModuleResolver::with_parts(
        Arc::clone(&registry),
        Arc::clone(&hooks),
        Arc::new(LocateOnlyLoader),
        RuntimePlatform::with_rid(common::TEST_RID),
    );
    let engine = Arc::new(RecordingEngine::default());
    let kernel = Kernel::builder("csharp")
        .native_resolver(resolver)
        .language_engine(Arc::clone(&engine) as Arc<dyn LanguageEngine>)
        .build();
    use_nuget_directives(&kernel, Arc::new(FakeRestorer::succeeding(1)));

    kernel.submit_code("#r mypkg,1.2.3").await;
    let result = kernel.submit_code("#!nuget-restore").await;
    assert!(result.succeeded());

    assert!(registry.contains(Path::new("/pkgs/mypkg/1.2.3/runtimes")));
    let module = ManagedModule::from_path("/pkgs/mypkg/1.2.3/lib/net6.0/mypkg.0.dll");
    assert!(hooks.is_attached(&module));
    assert_eq!(*engine.references.lock().unwrap(), vec!["mypkg,1.2.3"]);

    kernel.dispose();
    assert!(!hooks.is_attached(&module));
    assert!(registry.contains(Path::new("/pkgs/mypkg/1.2.3/runtimes")));
}

#[tokio::test]
async fn test_subscribers_observe_the_same_order() {
    let kernel = Kernel::builder("csharp").build();
    use_nuget_directives(&kernel, Arc::new(FakeRestorer::succeeding(1)));
    let mut receiver = kernel.subscribe();

    kernel.submit_code("#r mypkg,1.2.3").await;
    let restore = kernel.submit_code("#!nuget-restore").await;

    let mut observed = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        observed.push(event_label(&event));
    }
    let history: Vec<&str> = kernel
        .event_stream()
        .history()
        .iter()
        .map(event_label)
        .collect();
    assert_eq!(observed, history);
    assert!(history.ends_with(&restore.events.iter().map(event_label).collect::<Vec<_>>()));
}

#[tokio::test]
async fn test_same_package_at_two_versions() {
    let activator = Arc::new(RecordingActivator::default());
    let kernel = Kernel::builder("csharp")
        .extension_activator(Arc::clone(&activator) as Arc<dyn ExtensionActivator>)
        .build();
    use_nuget_directives(&kernel, Arc::new(FakeRestorer::succeeding(1)));

    kernel.submit_code("#r mypkg,1.0.0").await;
    kernel.submit_code("#r mypkg,2.0.0").await;
    let result = kernel.submit_code("#!nuget-restore").await;
    assert!(result.succeeded());

    let settled: Vec<&str> = result
        .events
        .iter()
        .filter_map(|event| match event {
            KernelEvent::DisplayedValueUpdated { message, key, .. }
                if message.ends_with("done!") =>
            {
                Some(key.as_str())
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        settled,
        vec![
            "Installing package mypkg, version 1.0.0",
            "Installing package mypkg, version 2.0.0",
        ]
    );

    let calls = activator.calls.lock().unwrap();
    let roots: Vec<&Path> = calls.iter().map(|(root, _)| root.as_path()).collect();
    assert_eq!(
        roots,
        vec![Path::new("/pkgs/mypkg/1.0.0"), Path::new("/pkgs/mypkg/2.0.0")]
    );
}
