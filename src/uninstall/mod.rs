//! Finding installed package directories from what a user types.
//!
//! An identifier is tried, in order, as `owner/repo`, as a bare package
//! name across all owners, and finally as the name of a linked executable.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::package::InstallConfig;
use crate::runtime::{Runtime, is_path_under, normalize_path};

pub struct UninstallResolver<'a, R: Runtime> {
    runtime: &'a R,
}

impl<'a, R: Runtime> UninstallResolver<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Package directories matching `raw`. Empty when nothing matches.
    #[tracing::instrument(skip(self, config))]
    pub fn find_matches(&self, raw: &str, config: &InstallConfig) -> Result<Vec<PathBuf>> {
        let packages_dir = config.packages_dir();
        let matches = self.resolve(&packages_dir, raw, config)?;

        Ok(matches
            .into_iter()
            .filter(|m| {
                let m = normalize_path(m);
                m != normalize_path(&packages_dir) && is_path_under(&m, &packages_dir)
            })
            .collect())
    }

    fn resolve(&self, packages_dir: &Path, raw: &str, config: &InstallConfig) -> Result<Vec<PathBuf>> {
        if let Some((owner, repo)) = split_owner_repo(raw) {
            return self.match_owner_repo(packages_dir, owner, repo);
        }

        let matches = self.match_name(packages_dir, raw)?;
        if !matches.is_empty() {
            return Ok(matches);
        }

        self.match_binary(packages_dir, &config.bin_link(raw))
    }

    fn match_owner_repo(&self, packages_dir: &Path, owner: &str, repo: &str) -> Result<Vec<PathBuf>> {
        let owner_dir = packages_dir.join(owner);
        let exact = owner_dir.join(repo);
        if self.runtime.exists(&exact) {
            return Ok(vec![exact]);
        }
        if !self.runtime.is_dir(&owner_dir) {
            return Ok(Vec::new());
        }

        let prefix = format!("{}-", repo);
        Ok(self
            .runtime
            .read_dir(&owner_dir)?
            .into_iter()
            .filter(|entry| file_name(entry).is_some_and(|name| name.starts_with(&prefix)))
            .collect())
    }

    fn match_name(&self, packages_dir: &Path, name: &str) -> Result<Vec<PathBuf>> {
        let prefix = format!("{}-", name);
        Ok(self
            .package_dirs(packages_dir)?
            .into_iter()
            .filter(|dir| {
                file_name(dir).is_some_and(|n| n == name || n.starts_with(&prefix))
            })
            .collect())
    }

    fn match_binary(&self, packages_dir: &Path, link: &Path) -> Result<Vec<PathBuf>> {
        if !self.runtime.is_symlink(link) {
            return Ok(Vec::new());
        }
        let target = self.runtime.resolve_link(link)?;
        let target = target.to_string_lossy();
        debug!("{:?} links to {}", link, target);

        Ok(self
            .package_dirs(packages_dir)?
            .into_iter()
            .filter(|dir| target.contains(dir.to_string_lossy().as_ref()))
            .collect())
    }

    /// Every `<owner>/<package>` directory under `packages_dir`.
    pub fn package_dirs(&self, packages_dir: &Path) -> Result<Vec<PathBuf>> {
        if !self.runtime.is_dir(packages_dir) {
            return Ok(Vec::new());
        }
        let mut dirs = Vec::new();
        for owner in self.runtime.read_dir(packages_dir)? {
            if !self.runtime.is_dir(&owner) {
                continue;
            }
            for package in self.runtime.read_dir(&owner)? {
                if self.runtime.is_dir(&package) {
                    dirs.push(package);
                }
            }
        }
        Ok(dirs)
    }

    /// Delete a package directory and its owner directory if that is now empty.
    #[tracing::instrument(skip(self))]
    pub fn remove_package(&self, package_dir: &Path) -> Result<()> {
        self.runtime
            .remove_dir_all(package_dir)
            .with_context(|| format!("Failed to remove {:?}", package_dir))?;

        if let Some(owner_dir) = package_dir.parent()
            && self.runtime.read_dir(owner_dir)?.is_empty()
        {
            debug!("Removing empty owner directory {:?}", owner_dir);
            self.runtime
                .remove_dir(owner_dir)
                .with_context(|| format!("Failed to remove {:?}", owner_dir))?;
        }
        Ok(())
    }
}

/// `owner/repo` where each part is a single plain path component.
fn split_owner_repo(raw: &str) -> Option<(&str, &str)> {
    let mut parts = raw.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if is_plain_component(owner) && is_plain_component(repo) => {
            Some((owner, repo))
        }
        _ => None,
    }
}

fn is_plain_component(part: &str) -> bool {
    let mut components = Path::new(part).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(c)), None) if c == part
    )
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
