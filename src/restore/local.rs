//! Restore from a local packages folder
//!
//! Resolves packages that are already present on disk, laid out as
//!
//! ```text
//! <root>/<id-lowercase>/<version>/lib/<tfm>/*.dll
//! <root>/<id-lowercase>/<version>/runtimes/<rid>/native/*
//! ```
//!
//! Restore sources that point at local directories are searched before the
//! packages folder itself.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use super::PackageRestorer;
use crate::domain::{PackageReference, ResolvedPackageReference};
use crate::error::{Result, restore_aborted, restore_failed};
use crate::native::platform::RUNTIMES_DIR;

const LIB_DIR: &str = "lib";
const MANAGED_EXTENSION: &str = "dll";

/// Target frameworks in order of preference
const PREFERRED_FRAMEWORKS: &[&str] = &[
    "net9.0",
    "net8.0",
    "net7.0",
    "net6.0",
    "net5.0",
    "netcoreapp3.1",
    "netstandard2.1",
    "netstandard2.0",
];

/// [`PackageRestorer`] backed by an on-disk packages folder
#[derive(Debug, Clone)]
pub struct LocalPackagesRestorer {
    packages_dir: PathBuf,
}

impl LocalPackagesRestorer {
    pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
        }
    }

    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    fn restore_blocking(&self, references: &[PackageReference]) -> Result<Vec<ResolvedPackageReference>> {
        let mut roots = Vec::new();
        let mut errors = Vec::new();

        for sources in references
            .iter()
            .filter_map(PackageReference::restore_sources_value)
        {
            for source in sources.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                match local_source_dir(source) {
                    Some(dir) => roots.push(dir),
                    None => errors.push(format!(
                        "Restore source '{source}' is not a local packages directory"
                    )),
                }
            }
        }
        roots.push(self.packages_dir.clone());

        let mut resolved = Vec::new();
        for reference in references.iter().filter(|r| !r.is_restore_source_only()) {
            match resolve_in_roots(&roots, reference) {
                Ok(Some(package)) => resolved.push(package),
                Ok(None) => errors.push(not_found_message(reference)),
                Err(e) => errors.push(format!("{}: {e}", not_found_message(reference))),
            }
        }

        if errors.is_empty() {
            Ok(resolved)
        } else {
            Err(restore_failed(errors))
        }
    }
}

#[async_trait]
impl PackageRestorer for LocalPackagesRestorer {
    async fn restore(
        &self,
        references: &[PackageReference],
    ) -> Result<Vec<ResolvedPackageReference>> {
        let restorer = self.clone();
        let references = references.to_vec();
        tokio::task::spawn_blocking(move || restorer.restore_blocking(&references))
            .await
            .map_err(|e| restore_aborted(e.to_string()))?
    }
}

fn not_found_message(reference: &PackageReference) -> String {
    match reference.version() {
        Some(version) => format!(
            "Unable to find package {} with version {version}",
            reference.name()
        ),
        None => format!("Unable to find package {}", reference.name()),
    }
}

fn local_source_dir(source: &str) -> Option<PathBuf> {
    let path = match source.strip_prefix("file://") {
        Some(rest) => PathBuf::from(rest),
        None if source.contains("://") => return None,
        None => PathBuf::from(source),
    };
    path.is_dir().then_some(path)
}

fn resolve_in_roots(
    roots: &[PathBuf],
    reference: &PackageReference,
) -> std::io::Result<Option<ResolvedPackageReference>> {
    for root in roots {
        let package_dir = root.join(reference.name().to_lowercase());
        if !package_dir.is_dir() {
            continue;
        }
        let Some((version, version_dir)) = select_version(&package_dir, reference.version())?
        else {
            continue;
        };

        let assembly_paths = managed_assemblies(&version_dir)?;
        let probing_paths = if version_dir.join(RUNTIMES_DIR).is_dir() {
            vec![version_dir.clone()]
        } else {
            Vec::new()
        };

        debug!(
            package = reference.name(),
            version = %version,
            assemblies = assembly_paths.len(),
            "resolved package from local folder"
        );

        return ResolvedPackageReference::new(
            reference.name(),
            version,
            assembly_paths,
            Some(version_dir),
            probing_paths,
        )
        .map(Some)
        .map_err(|e| std::io::Error::other(e.to_string()));
    }
    Ok(None)
}

fn child_dirs(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            dirs.push((
                entry.file_name().to_string_lossy().into_owned(),
                entry.into_path(),
            ));
        }
    }
    Ok(dirs)
}

fn select_version(
    package_dir: &Path,
    requested: Option<&str>,
) -> std::io::Result<Option<(String, PathBuf)>> {
    let versions = child_dirs(package_dir)?;
    Ok(match requested {
        Some(requested) => versions
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(requested)),
        None => versions
            .into_iter()
            .max_by(|(a, _), (b, _)| compare_versions(a, b)),
    })
}

/// Compare dotted version strings numerically where both segments are numbers
fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-']);
    let mut right = b.split(['.', '-']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn managed_assemblies(version_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let lib_dir = version_dir.join(LIB_DIR);
    if !lib_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut frameworks = child_dirs(&lib_dir)?;
    frameworks.sort_by(|(a, _), (b, _)| a.cmp(b));
    let framework = PREFERRED_FRAMEWORKS
        .iter()
        .find_map(|preferred| {
            frameworks
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(preferred))
        })
        .or_else(|| frameworks.first());

    let Some((_, framework_dir)) = framework else {
        return Ok(Vec::new());
    };

    let mut assemblies = Vec::new();
    for entry in WalkDir::new(framework_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        let is_managed = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MANAGED_EXTENSION));
        if entry.file_type().is_file() && is_managed {
            assemblies.push(entry.into_path());
        }
    }
    assemblies.sort();
    Ok(assemblies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;
    use std::fs;
    use tempfile::TempDir;

    fn write_package(root: &Path, id: &str, version: &str, tfm: &str, files: &[&str]) -> PathBuf {
        let version_dir = root.join(id.to_lowercase()).join(version);
        let lib = version_dir.join("lib").join(tfm);
        fs::create_dir_all(&lib).unwrap();
        for file in files {
            fs::write(lib.join(file), b"MZ").unwrap();
        }
        version_dir
    }

    fn reference(name: &str, version: Option<&str>) -> PackageReference {
        PackageReference::new(name, version.map(str::to_string)).unwrap()
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "2.0.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.0-beta", "1.0.0-alpha"), Ordering::Greater);
    }

    #[tokio::test]
    async fn test_resolves_requested_version() {
        let temp = TempDir::new().unwrap();
        let version_dir = write_package(temp.path(), "MyPkg", "1.2.3", "net6.0", &["MyPkg.dll", "MyPkg.Core.dll", "readme.txt"]);
        write_package(temp.path(), "MyPkg", "2.0.0", "net6.0", &["MyPkg.dll"]);

        let restorer = LocalPackagesRestorer::new(temp.path());
        let resolved = restorer
            .restore(&[reference("MyPkg", Some("1.2.3"))])
            .await
            .unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].version(), "1.2.3");
        assert_eq!(resolved[0].assembly_paths().len(), 2);
        assert_eq!(resolved[0].package_root(), version_dir);
        assert!(resolved[0].probing_paths().is_empty());
    }

    #[tokio::test]
    async fn test_highest_version_wins_when_unpinned() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "pkg", "1.9.0", "net6.0", &["pkg.dll"]);
        write_package(temp.path(), "pkg", "1.10.0", "net6.0", &["pkg.dll"]);

        let restorer = LocalPackagesRestorer::new(temp.path());
        let resolved = restorer.restore(&[reference("pkg", None)]).await.unwrap();
        assert_eq!(resolved[0].version(), "1.10.0");
    }

    #[tokio::test]
    async fn test_prefers_known_framework() {
        let temp = TempDir::new().unwrap();
        let version_dir = write_package(temp.path(), "pkg", "1.0.0", "netstandard2.0", &["old.dll"]);
        write_package(temp.path(), "pkg", "1.0.0", "net8.0", &["new.dll"]);

        let restorer = LocalPackagesRestorer::new(temp.path());
        let resolved = restorer.restore(&[reference("pkg", None)]).await.unwrap();
        assert_eq!(
            resolved[0].assembly_paths(),
            [version_dir.join("lib/net8.0/new.dll")]
        );
    }

    #[tokio::test]
    async fn test_runtimes_dir_becomes_probing_path() {
        let temp = TempDir::new().unwrap();
        let version_dir = write_package(temp.path(), "native.pkg", "1.0.0", "net6.0", &["Native.Pkg.dll"]);
        fs::create_dir_all(version_dir.join("runtimes/linux-x64/native")).unwrap();

        let restorer = LocalPackagesRestorer::new(temp.path());
        let resolved = restorer
            .restore(&[reference("Native.Pkg", None)])
            .await
            .unwrap();
        assert_eq!(resolved[0].probing_paths(), [version_dir]);
    }

    #[tokio::test]
    async fn test_missing_packages_are_reported_individually() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "present", "1.0.0", "net6.0", &["present.dll"]);

        let restorer = LocalPackagesRestorer::new(temp.path());
        let err = restorer
            .restore(&[
                reference("present", None),
                reference("badpkg", None),
                reference("present", Some("9.9.9")),
            ])
            .await
            .unwrap_err();

        let KernelError::RestoreFailed { errors } = err else {
            panic!("expected restore failure");
        };
        assert_eq!(
            errors,
            vec![
                "Unable to find package badpkg".to_string(),
                "Unable to find package present with version 9.9.9".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_local_restore_source_is_searched() {
        let packages = TempDir::new().unwrap();
        let feed = TempDir::new().unwrap();
        write_package(feed.path(), "feedpkg", "0.1.0", "net6.0", &["feedpkg.dll"]);

        let restorer = LocalPackagesRestorer::new(packages.path());
        let resolved = restorer
            .restore(&[
                PackageReference::restore_sources(feed.path().display().to_string()).unwrap(),
                reference("feedpkg", None),
            ])
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name(), "feedpkg");
    }

    #[tokio::test]
    async fn test_remote_restore_source_fails() {
        let temp = TempDir::new().unwrap();
        let restorer = LocalPackagesRestorer::new(temp.path());
        let err = restorer
            .restore(&[PackageReference::restore_sources("https://example.org/v3/index.json").unwrap()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("https://example.org/v3/index.json"));
    }
}
