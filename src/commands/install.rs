use anyhow::{Result, bail};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::{
    build::Builder,
    cleanup,
    fetch::Fetcher,
    package::{PackageIdentifier, PackageSource},
    process::{ProcessRunner, TokioProcessRunner},
    runtime::Runtime,
    search::{GitHubSearch, PackageSearch},
};

use super::config::Config;
use super::spec::InstallSpec;

#[tracing::instrument(skip(runtime, install_root, api_url))]
pub async fn install<R: Runtime>(
    runtime: R,
    package: &str,
    version: Option<String>,
    yes: bool,
    install_root: Option<PathBuf>,
    api_url: Option<String>,
) -> Result<()> {
    let config = Config::load(&runtime, install_root, api_url)?;
    let search = GitHubSearch::new(config.http_client()?, &config.api_url);
    run(&runtime, &TokioProcessRunner, &search, &config, package, version, yes).await
}

#[tracing::instrument(skip(runtime, runner, search, config))]
pub async fn run<R: Runtime, P: ProcessRunner, S: PackageSearch>(
    runtime: &R,
    runner: &P,
    search: &S,
    config: &Config,
    package: &str,
    version: Option<String>,
    yes: bool,
) -> Result<()> {
    let (identifier, source) = match InstallSpec::parse(runtime, package, version)? {
        InstallSpec::Resolved { identifier, source } => (identifier, source),
        InstallSpec::Name { name, version } => {
            resolve_name(runtime, search, &name, version, yes).await?
        }
    };
    debug!("Installing {} from {}", identifier, source);

    let cleanup_ctx = cleanup::new_shared();
    let cleanup_ctx_clone = cleanup_ctx.clone();
    let ctrl_c_handler = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cleaning up...");
            cleanup_ctx_clone
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .cleanup();
            std::process::exit(130);
        }
    });

    let fetched = Fetcher::new(runtime, runner, &config.install, &config.toolchain)
        .with_cleanup(cleanup_ctx)
        .fetch(&identifier, &source)
        .await;

    ctrl_c_handler.abort();
    let fetched = fetched?;

    let builder = Builder::new(runtime, runner, &config.install, &config.toolchain);
    let built = builder.build(&fetched.package_path).await?;
    if built.executables.is_empty() {
        bail!(
            "Build of {} finished but produced no executables under {}",
            identifier,
            config.toolchain.artifact_dir.display()
        );
    }
    let linked = builder.create_symlinks(&built)?;

    match &fetched.resolved_version {
        Some(v) => println!("Installed {} ({})", identifier, v),
        None => println!("Installed {}", identifier),
    }
    for name in &linked {
        println!("  {}", config.install.bin_link(name).display());
    }
    info!("Installed {} into {:?}", identifier, fetched.package_path);

    if !on_path(runtime, &config.install.bin_dir()) {
        println!();
        println!("Add {} to your PATH to use it:", config.install.bin_dir().display());
        println!(
            "  export PATH=\"{}:$PATH\"",
            config.install.bin_dir().display()
        );
    }
    Ok(())
}

/// Pick the most starred repository named `name`, asking the user first
/// unless `yes` is set.
async fn resolve_name<R: Runtime, S: PackageSearch>(
    runtime: &R,
    search: &S,
    name: &str,
    version: Option<String>,
    yes: bool,
) -> Result<(PackageIdentifier, PackageSource)> {
    println!("Searching for {}...", name);
    let Some(found) = search.search(name).await?.into_iter().next() else {
        bail!("No repositories found for `{}`", name);
    };

    println!("Found {} ({} stars)", found.full_name(), found.stars);
    if let Some(description) = &found.description {
        println!("  {}", description);
    }

    if !yes && !runtime.confirm(&format!("Install {}?", found.full_name()))? {
        bail!("Installation of {} cancelled", found.full_name());
    }

    let identifier = PackageIdentifier::new(
        &found.owner,
        &found.name,
        found.clone_url.clone(),
        version.clone(),
    );
    Ok((identifier, PackageSource::git(found.clone_url, version)))
}

fn on_path<R: Runtime>(runtime: &R, bin_dir: &Path) -> bool {
    match runtime.env_var("PATH") {
        Ok(path) => std::env::split_paths(&path).any(|p| p == bin_dir),
        Err(_) => {
            warn!("PATH is not set");
            false
        }
    }
}
