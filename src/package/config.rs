use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::runtime::Runtime;

use super::PackageIdentifier;

/// Directory under the user's home used when no root is given.
pub const DEFAULT_ROOT_DIR: &str = ".swinstall";

/// Install root shared by every component for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub root: PathBuf,
}

impl InstallConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.swinstall`
    #[tracing::instrument(skip(runtime))]
    pub fn default_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
        let home_dir = runtime
            .home_dir()
            .context("Could not find home directory")?;
        Ok(home_dir.join(DEFAULT_ROOT_DIR))
    }

    /// Symlinks to installed executables.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Package source trees, laid out as `<owner>/<name>[-<version>]`.
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    pub fn package_dir(&self, identifier: &PackageIdentifier) -> PathBuf {
        self.packages_dir().join(identifier.relative_path())
    }

    pub fn bin_link(&self, executable: &str) -> PathBuf {
        self.bin_dir().join(executable)
    }
}
