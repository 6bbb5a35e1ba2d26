use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::{
    package::InstallConfig,
    runtime::{Runtime, is_path_under},
    uninstall::UninstallResolver,
};

use super::config::Config;

/// One installed package and the executables linked into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub path: PathBuf,
    pub executables: Vec<String>,
}

/// List all installed packages
#[tracing::instrument(skip(runtime, install_root))]
pub fn list<R: Runtime>(runtime: R, install_root: Option<PathBuf>) -> Result<()> {
    let config = Config::load(&runtime, install_root, None)?;
    let packages = installed_packages(&runtime, &config.install)?;

    if packages.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }
    for package in packages {
        if package.executables.is_empty() {
            println!("{}", package.name);
        } else {
            println!("{}  [{}]", package.name, package.executables.join(", "));
        }
    }
    Ok(())
}

pub fn installed_packages<R: Runtime>(
    runtime: &R,
    config: &InstallConfig,
) -> Result<Vec<InstalledPackage>> {
    let packages_dir = config.packages_dir();
    let links = bin_links(runtime, &config.bin_dir())?;

    let mut packages = Vec::new();
    for path in UninstallResolver::new(runtime).package_dirs(&packages_dir)? {
        let name = path
            .strip_prefix(&packages_dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        let executables = links
            .iter()
            .filter(|(_, target)| is_path_under(target, &path))
            .map(|(name, _)| name.clone())
            .collect();
        packages.push(InstalledPackage {
            name,
            path,
            executables,
        });
    }
    Ok(packages)
}

/// `(name, resolved target)` of every symlink in `bin_dir`.
fn bin_links<R: Runtime>(runtime: &R, bin_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !runtime.is_dir(bin_dir) {
        return Ok(Vec::new());
    }
    let mut links = Vec::new();
    for entry in runtime.read_dir(bin_dir)? {
        if !runtime.is_symlink(&entry) {
            continue;
        }
        if let (Some(name), Ok(target)) = (entry.file_name(), runtime.resolve_link(&entry)) {
            links.push((name.to_string_lossy().into_owned(), target));
        }
    }
    Ok(links)
}
