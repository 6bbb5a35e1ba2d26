use anyhow::Result;
use log::info;
use std::path::PathBuf;

use crate::{
    build::Builder,
    error::UninstallError,
    process::{ProcessRunner, TokioProcessRunner},
    runtime::Runtime,
    uninstall::UninstallResolver,
};

use super::config::Config;

#[tracing::instrument(skip(runtime, install_root))]
pub fn uninstall<R: Runtime>(
    runtime: R,
    identifier: &str,
    yes: bool,
    install_root: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load(&runtime, install_root, None)?;
    run(&runtime, &TokioProcessRunner, &config, identifier, yes)
}

#[tracing::instrument(skip(runtime, runner, config))]
pub fn run<R: Runtime, P: ProcessRunner>(
    runtime: &R,
    runner: &P,
    config: &Config,
    identifier: &str,
    yes: bool,
) -> Result<()> {
    let packages_dir = config.install.packages_dir();
    let resolver = UninstallResolver::new(runtime);

    if resolver.package_dirs(&packages_dir)?.is_empty() {
        return Err(UninstallError::NoPackagesInstalled {
            root: config.install.root.clone(),
        }
        .into());
    }

    let matches = resolver.find_matches(identifier, &config.install)?;
    if matches.is_empty() {
        return Err(UninstallError::PackageNotFound {
            identifier: identifier.to_string(),
        }
        .into());
    }

    println!("The following packages will be removed:");
    for path in &matches {
        println!("  {}", display_name(&packages_dir, path));
    }
    if !yes && !runtime.confirm("Continue?")? {
        println!("Uninstall cancelled.");
        return Ok(());
    }

    let builder = Builder::new(runtime, runner, &config.install, &config.toolchain);
    for path in &matches {
        let dir_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let removed = builder.remove_symlinks(&dir_name)?;
        for name in &removed {
            println!("  Unlinked {}", name);
        }

        resolver.remove_package(path)?;
        println!("Removed {}", display_name(&packages_dir, path));
        info!("Removed {:?} and {} links", path, removed.len());
    }
    Ok(())
}

fn display_name(packages_dir: &std::path::Path, path: &std::path::Path) -> String {
    path.strip_prefix(packages_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
