//! Package reference domain types
//!
//! A [`PackageReference`] is what a user asks for with `#r`; a
//! [`ResolvedPackageReference`] is what the restore produced for it.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, invalid_reference, missing_package_root, missing_version};

const NUGET_PREFIX: &str = "nuget:";
const RESTORE_SOURCES_PREFIX: &str = "restoresources=";

/// A requested dependency
///
/// Either names a package (optionally pinned to a version) or only adds
/// restore sources. At least one of `name` and `restore_sources` is non-empty.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReference {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    restore_sources: Option<String>,
}

/// Deduplication key for a [`PackageReference`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackageIdentity {
    Package {
        name: String,
        version: Option<String>,
    },
    RestoreSources(String),
}

impl PackageReference {
    /// Create a reference to a named package
    pub fn new(name: impl Into<String>, version: Option<String>) -> Result<Self> {
        Self::from_parts(name, version, None)
    }

    /// Create a reference that only contributes restore sources
    pub fn restore_sources(sources: impl Into<String>) -> Result<Self> {
        Self::from_parts("", None, Some(sources.into()))
    }

    /// Create a reference from its raw parts, normalizing blank values to absent
    pub fn from_parts(
        name: impl Into<String>,
        version: Option<String>,
        restore_sources: Option<String>,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        let version = non_blank(version);
        let restore_sources = non_blank(restore_sources);

        if name.is_empty() && restore_sources.is_none() {
            return Err(invalid_reference(name));
        }

        Ok(Self {
            name,
            version,
            restore_sources,
        })
    }

    /// Parse a `#r` directive argument
    ///
    /// Accepted forms (the `nuget:` prefix and surrounding quotes are optional):
    /// - `Name` / `Name,Version`
    /// - `RestoreSources=<uri>`
    /// - a bare URI such as `https://example.org/v3/index.json`
    pub fn parse(token: &str) -> Result<Self> {
        let mut input = token.trim().trim_matches('"').trim();

        if let Some(rest) = strip_prefix_ignore_case(input, NUGET_PREFIX) {
            input = rest.trim();
        }

        if input.is_empty() {
            return Err(invalid_reference(token));
        }

        if let Some(rest) = strip_prefix_ignore_case(input, RESTORE_SOURCES_PREFIX) {
            let sources = rest.trim();
            if sources.is_empty() {
                return Err(invalid_reference(token));
            }
            return Self::restore_sources(sources);
        }

        if input.contains("://") {
            return Self::restore_sources(input);
        }

        let (name, version) = match input.split_once(',') {
            Some((name, version)) => (name.trim(), Some(version.trim().to_string())),
            None => (input, None),
        };

        if !is_valid_package_id(name)
            || version
                .as_deref()
                .is_some_and(|v| v.chars().any(char::is_whitespace))
        {
            return Err(invalid_reference(token));
        }

        Self::new(name, version)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn restore_sources_value(&self) -> Option<&str> {
        self.restore_sources.as_deref()
    }

    /// True when this reference only adds restore sources
    pub fn is_restore_source_only(&self) -> bool {
        self.name.is_empty()
    }

    /// Case-insensitive name comparison
    pub fn has_name(&self, name: &str) -> bool {
        !self.name.is_empty() && self.name.eq_ignore_ascii_case(name)
    }

    /// Whether `resolved` fulfils this request
    ///
    /// Names compare case-insensitively; an unversioned request accepts any
    /// resolved version.
    pub fn is_satisfied_by(&self, resolved: &ResolvedPackageReference) -> bool {
        self.has_name(resolved.name())
            && self
                .version
                .as_deref()
                .is_none_or(|version| version.eq_ignore_ascii_case(resolved.version()))
    }

    /// Identity used to reject duplicate requests
    pub fn identity(&self) -> PackageIdentity {
        if self.name.is_empty() {
            PackageIdentity::RestoreSources(
                self.restore_sources
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase(),
            )
        } else {
            PackageIdentity::Package {
                name: self.name.to_lowercase(),
                version: self.version.as_deref().map(str::to_lowercase),
            }
        }
    }

    /// Stable progress message for this reference
    ///
    /// The message doubles as the display key, so later updates replace the
    /// line that announced the install.
    pub fn display_key(&self) -> String {
        if self.name.is_empty() {
            format!(
                "Adding restore sources {}",
                self.restore_sources.as_deref().unwrap_or_default()
            )
        } else {
            let mut message = format!("Installing package {}", self.name);
            if let Some(version) = &self.version {
                message.push_str(&format!(", version {version}"));
            }
            message
        }
    }
}

impl PartialEq for PackageReference {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for PackageReference {}

impl Hash for PackageReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            return write!(
                f,
                "RestoreSources={}",
                self.restore_sources.as_deref().unwrap_or_default()
            );
        }
        match &self.version {
            Some(version) => write!(f, "{},{}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A dependency after a successful restore, with concrete file paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPackageReference {
    name: String,
    version: String,
    assembly_paths: Vec<PathBuf>,
    probing_paths: Vec<PathBuf>,
    package_root: PathBuf,
}

impl ResolvedPackageReference {
    /// Create a resolved reference
    ///
    /// `version` is mandatory. When `package_root` is `None` it defaults to the
    /// grandparent of the first assembly's directory, i.e. `<root>` for
    /// `<root>/lib/<tfm>/x.dll`.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        assembly_paths: Vec<PathBuf>,
        package_root: Option<PathBuf>,
        probing_paths: Vec<PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        let version = version.into();

        if version.trim().is_empty() {
            return Err(missing_version(name));
        }

        let package_root = match package_root {
            Some(root) => root,
            None => assembly_paths
                .first()
                .and_then(|path| path.parent())
                .and_then(Path::parent)
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .ok_or_else(|| missing_package_root(name.clone()))?,
        };

        let mut distinct_probing: Vec<PathBuf> = Vec::with_capacity(probing_paths.len());
        for path in probing_paths {
            if !distinct_probing.contains(&path) {
                distinct_probing.push(path);
            }
        }

        Ok(Self {
            name,
            version: version.trim().to_string(),
            assembly_paths,
            probing_paths: distinct_probing,
            package_root,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn assembly_paths(&self) -> &[PathBuf] {
        &self.assembly_paths
    }

    pub fn probing_paths(&self) -> &[PathBuf] {
        &self.probing_paths
    }

    pub fn package_root(&self) -> &Path {
        &self.package_root
    }

    /// The request this resolution satisfies, pinned to the resolved version
    pub fn reference(&self) -> PackageReference {
        PackageReference {
            name: self.name.clone(),
            version: Some(self.version.clone()),
            restore_sources: None,
        }
    }
}

impl fmt::Display for ResolvedPackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.name, self.version)
    }
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    input
        .get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &input[prefix.len()..])
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_valid_package_id(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
