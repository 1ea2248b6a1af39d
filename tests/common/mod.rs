//! Common test utilities for interactive kernel integration tests

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use interactive_kernel::domain::{PackageReference, ResolvedPackageReference};
use interactive_kernel::error::{Result, restore_failed};
use interactive_kernel::kernel::KernelEvent;
use interactive_kernel::native::RuntimePlatform;
use interactive_kernel::restore::PackageRestorer;
use tempfile::TempDir;

/// Runtime identifier used by every fixture
#[allow(dead_code)]
pub const TEST_RID: &str = "test-x64";

/// A temporary directory with helpers for laying out packages
#[allow(dead_code)]
pub struct TestWorkspace {
    /// Temporary directory
    pub temp: TempDir,
    /// Path to workspace root
    pub path: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    /// Create a new test workspace
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Packages folder inside the workspace
    pub fn packages_dir(&self) -> PathBuf {
        self.path.join("packages")
    }

    /// Lay out `<packages>/<id>/<version>/lib/<tfm>/<assembly>` and return the version dir
    pub fn create_package(&self, id: &str, version: &str, assemblies: &[&str]) -> PathBuf {
        let version_dir = self.packages_dir().join(id.to_lowercase()).join(version);
        let lib = version_dir.join("lib").join("net6.0");
        std::fs::create_dir_all(&lib).expect("Failed to create lib directory");
        for assembly in assemblies {
            std::fs::write(lib.join(assembly), b"MZ").expect("Failed to write assembly");
        }
        version_dir
    }

    /// Add a native library for `module` under `<dir>/runtimes/<rid>/native`
    pub fn add_native(&self, dir: &Path, module: &str) -> PathBuf {
        let platform = RuntimePlatform::with_rid(TEST_RID);
        let native = dir.join("runtimes").join(TEST_RID).join("native");
        std::fs::create_dir_all(&native).expect("Failed to create native directory");
        let file = native.join(&platform.candidate_file_names(module)[0]);
        std::fs::write(&file, b"\x7fELF").expect("Failed to write native library");
        file
    }

    /// Write a file in workspace
    pub fn write_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }
}

/// Restorer with a scripted outcome
#[allow(dead_code)]
pub struct FakeRestorer {
    pub delay: Duration,
    pub errors: Option<Vec<String>>,
    pub assemblies_per_package: usize,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Vec<PackageReference>>>,
}

#[allow(dead_code)]
impl FakeRestorer {
    /// Succeeds with one resolved reference per named request
    pub fn succeeding(assemblies_per_package: usize) -> Self {
        Self {
            delay: Duration::ZERO,
            errors: None,
            assemblies_per_package,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(errors: &[&str]) -> Self {
        Self {
            errors: Some(errors.iter().map(|e| (*e).to_string()).collect()),
            ..Self::succeeding(1)
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageRestorer for FakeRestorer {
    async fn restore(
        &self,
        references: &[PackageReference],
    ) -> Result<Vec<ResolvedPackageReference>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(references.to_vec());
        tokio::time::sleep(self.delay).await;

        if let Some(errors) = &self.errors {
            return Err(restore_failed(errors.clone()));
        }

        references
            .iter()
            .filter(|reference| !reference.is_restore_source_only())
            .map(|reference| {
                let version = reference.version().unwrap_or("1.0.0");
                let root = PathBuf::from("/pkgs").join(reference.name()).join(version);
                let assemblies = (0..self.assemblies_per_package)
                    .map(|i| {
                        root.join("lib/net6.0")
                            .join(format!("{}.{i}.dll", reference.name()))
                    })
                    .collect();
                ResolvedPackageReference::new(
                    reference.name(),
                    version,
                    assemblies,
                    Some(root.clone()),
                    vec![root.join("runtimes")],
                )
            })
            .collect()
    }
}

/// Compact label for asserting event order
#[allow(dead_code)]
pub fn event_label(event: &KernelEvent) -> &'static str {
    match event {
        KernelEvent::DisplayedValueProduced { .. } => "produced",
        KernelEvent::DisplayedValueUpdated { .. } => "updated",
        KernelEvent::ErrorProduced { .. } => "error",
        KernelEvent::PackageAdded { .. } => "package-added",
        KernelEvent::CommandSucceeded { .. } => "succeeded",
        KernelEvent::CommandFailed { .. } => "failed",
    }
}
