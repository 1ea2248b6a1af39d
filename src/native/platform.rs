//! Platform conventions for native library lookup
//!
//! Packages ship native assets under `runtimes/<rid>/native/`, where `<rid>`
//! is an `<os>-<arch>` runtime identifier such as `linux-x64` or `win-arm64`.

use std::path::{Path, PathBuf};

/// Directory name that holds per-platform native assets inside a package
pub const RUNTIMES_DIR: &str = "runtimes";

/// The runtime identifier and file naming rules of the host platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePlatform {
    rid: String,
    extension: &'static str,
    library_prefix: Option<&'static str>,
}

impl RuntimePlatform {
    /// Platform of the running process
    pub fn current() -> Self {
        Self::with_rid(default_rid())
    }

    /// Current platform's naming rules with an explicit runtime identifier
    pub fn with_rid(rid: impl Into<String>) -> Self {
        let (extension, library_prefix) = if cfg!(windows) {
            ("dll", None)
        } else if cfg!(target_os = "macos") {
            ("dylib", Some("lib"))
        } else {
            ("so", Some("lib"))
        };

        Self {
            rid: rid.into(),
            extension,
            library_prefix,
        }
    }

    pub fn rid(&self) -> &str {
        &self.rid
    }

    pub fn extension(&self) -> &str {
        self.extension
    }

    /// File names that satisfy a request for `module_name`
    ///
    /// `sqlite3` maps to `sqlite3.so` and `libsqlite3.so` on Linux. A name that
    /// already carries the platform extension is taken as-is.
    pub fn candidate_file_names(&self, module_name: &str) -> Vec<String> {
        let suffix = format!(".{}", self.extension);
        let base = module_name.strip_suffix(&suffix).unwrap_or(module_name);

        let mut names = vec![format!("{base}{suffix}")];
        match self.library_prefix {
            Some(prefix) if !base.starts_with(prefix) => {
                names.push(format!("{prefix}{base}{suffix}"));
            }
            _ => {}
        }
        names
    }

    /// Directories to search below a probing path
    ///
    /// A probing path is either a package directory (searched under
    /// `runtimes/<rid>`) or a `runtimes` directory itself (searched under `<rid>`).
    pub fn search_roots(&self, probing_path: &Path) -> Vec<PathBuf> {
        let mut roots = vec![probing_path.join(RUNTIMES_DIR).join(&self.rid)];
        if probing_path.file_name().is_some_and(|name| name == RUNTIMES_DIR) {
            roots.push(probing_path.join(&self.rid));
        }
        roots
    }

    /// Whether a file name is one of `candidates`
    pub fn matches(&self, file_name: &str, candidates: &[String]) -> bool {
        if cfg!(windows) {
            candidates.iter().any(|c| c.eq_ignore_ascii_case(file_name))
        } else {
            candidates.iter().any(|c| c == file_name)
        }
    }
}

impl Default for RuntimePlatform {
    fn default() -> Self {
        Self::current()
    }
}

fn default_rid() -> String {
    let os = match std::env::consts::OS {
        "windows" => "win",
        "macos" => "osx",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        other => other,
    };
    format!("{os}-{arch}")
}
