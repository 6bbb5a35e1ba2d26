use std::fmt;
use std::path::PathBuf;

/// Where a package's sources come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// A bare name that still has to be resolved to a git origin.
    Name(String),
    /// A directory on the local filesystem.
    LocalPath(PathBuf),
    /// A remote repository, optionally pinned to a tag, branch or commit.
    Git { url: String, version: Option<String> },
}

impl PackageSource {
    pub fn git(url: impl Into<String>, version: Option<String>) -> Self {
        PackageSource::Git {
            url: url.into(),
            version,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PackageSource::Name(_) => "name",
            PackageSource::LocalPath(_) => "path",
            PackageSource::Git { .. } => "git",
        }
    }
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageSource::Name(name) => write!(f, "{}", name),
            PackageSource::LocalPath(path) => write!(f, "{}", path.display()),
            PackageSource::Git { url, version: None } => write!(f, "{}", url),
            PackageSource::Git {
                url,
                version: Some(v),
            } => write!(f, "{}@{}", url, v),
        }
    }
}

/// Replace path separators so a value can be used as a single directory name.
pub fn sanitize_component(value: &str) -> String {
    value.replace(['/', '\\'], "-")
}

/// Stable identity of an installable package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentifier {
    pub owner: String,
    pub name: String,
    /// Clone URL or local source path the package was fetched from.
    pub origin: String,
    pub version: Option<String>,
}

impl PackageIdentifier {
    pub fn new(
        owner: impl AsRef<str>,
        name: impl AsRef<str>,
        origin: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            owner: sanitize_component(owner.as_ref()),
            name: sanitize_component(name.as_ref()),
            origin: origin.into(),
            version,
        }
    }

    /// Identifier for a package copied from a local directory.
    pub fn local(name: impl AsRef<str>, path: &std::path::Path) -> Self {
        Self::new("local", name, path.display().to_string(), None)
    }

    /// `<owner>/<name>` or `<owner>/<name>-<version>`.
    pub fn directory_name(&self) -> String {
        format!("{}/{}", sanitize_component(&self.owner), self.leaf_name())
    }

    /// The directory path relative to the packages root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(sanitize_component(&self.owner)).join(self.leaf_name())
    }

    fn leaf_name(&self) -> String {
        let name = sanitize_component(&self.name);
        match &self.version {
            Some(version) => format!("{}-{}", name, sanitize_component(version)),
            None => name,
        }
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}/{}@{}", self.owner, self.name, v),
            None => write!(f, "{}/{}", self.owner, self.name),
        }
    }
}
