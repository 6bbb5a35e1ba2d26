//! Compiling fetched packages and linking their executables into `bin`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::error::BuildError;
use crate::fetch::sync::remove_entry;
use crate::manifest::ManifestReader;
use crate::package::{InstallConfig, Toolchain};
use crate::process::ProcessRunner;
use crate::runtime::{Runtime, normalize_path};

/// A binary produced by a release build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub executables: Vec<Executable>,
    pub package_path: PathBuf,
}

pub struct Builder<'a, R: Runtime, P: ProcessRunner> {
    runtime: &'a R,
    runner: &'a P,
    config: &'a InstallConfig,
    toolchain: &'a Toolchain,
}

impl<'a, R: Runtime, P: ProcessRunner> Builder<'a, R, P> {
    pub fn new(
        runtime: &'a R,
        runner: &'a P,
        config: &'a InstallConfig,
        toolchain: &'a Toolchain,
    ) -> Self {
        Self {
            runtime,
            runner,
            config,
            toolchain,
        }
    }

    /// Build every executable product of the package in release mode.
    ///
    /// Products are built one at a time with the tool's output shown live.
    /// The first failing product aborts the build. A product whose binary is
    /// missing afterwards is left out of the result.
    #[tracing::instrument(skip(self))]
    pub async fn build(&self, package_path: &Path) -> Result<BuildResult, BuildError> {
        let products = ManifestReader::new(self.runner, self.toolchain)
            .read_executable_products(package_path)
            .await?;

        if products.is_empty() {
            return Err(BuildError::NoExecutablesFound {
                path: package_path.to_path_buf(),
            });
        }

        for product in &products {
            println!("Building {}...", product);
            let status = self
                .runner
                .stream(
                    &self.toolchain.program,
                    &self.toolchain.build_args(product),
                    package_path,
                )
                .await
                .map_err(|e| BuildError::BuildFailed {
                    product: product.clone(),
                    path: package_path.to_path_buf(),
                    reason: e.to_string(),
                })?;

            if !status.success() {
                return Err(BuildError::BuildFailed {
                    product: product.clone(),
                    path: package_path.to_path_buf(),
                    reason: status.to_string(),
                });
            }
        }

        let mut executables = Vec::new();
        for product in products {
            let path = self.toolchain.binary_path(package_path, &product);
            if self.runtime.exists(&path) {
                executables.push(Executable {
                    name: product,
                    path,
                });
            } else {
                warn!("Built product {} but found no binary at {:?}", product, path);
            }
        }

        Ok(BuildResult {
            executables,
            package_path: package_path.to_path_buf(),
        })
    }

    /// Point `bin/<name>` at each built executable, replacing whatever was
    /// there. Links made before a failure stay in place.
    #[tracing::instrument(skip(self, result))]
    pub fn create_symlinks(&self, result: &BuildResult) -> Result<Vec<String>, BuildError> {
        let bin_dir = self.config.bin_dir();
        self.runtime
            .create_dir_all(&bin_dir)
            .map_err(|source| BuildError::SymlinkFailed {
                name: String::new(),
                link: bin_dir.clone(),
                source,
            })?;

        let mut installed = Vec::new();
        for executable in &result.executables {
            let link = self.config.bin_link(&executable.name);
            let _ = remove_entry(self.runtime, &link);

            self.absolute(&executable.path)
                .and_then(|target| {
                    debug!("Linking {:?} -> {:?}", link, target);
                    self.runtime.symlink(&target, &link)
                })
                .map_err(|source| BuildError::SymlinkFailed {
                    name: executable.name.clone(),
                    link: link.clone(),
                    source,
                })?;
            installed.push(executable.name.clone());
        }

        info!("Linked {:?} into {:?}", installed, bin_dir);
        Ok(installed)
    }

    /// Remove every symlink in `bin` that points into a package directory
    /// named `package_name` or `package_name-<version>`.
    ///
    /// Matching is by substring of the resolved target, so a package named
    /// `foo` also claims links into directories like `foo-bar`.
    #[tracing::instrument(skip(self))]
    pub fn remove_symlinks(&self, package_name: &str) -> Result<Vec<String>> {
        let bin_dir = self.config.bin_dir();
        if !self.runtime.exists(&bin_dir) {
            return Ok(Vec::new());
        }

        let exact = format!("/{}/", package_name);
        let versioned = format!("/{}-", package_name);
        let mut removed = Vec::new();

        for entry in self.runtime.read_dir(&bin_dir)? {
            if !self.runtime.is_symlink(&entry) {
                continue;
            }
            let Ok(target) = self.runtime.resolve_link(&entry) else {
                continue;
            };
            let target = target.to_string_lossy();
            if target.contains(&exact) || target.contains(&versioned) {
                self.runtime
                    .remove_symlink(&entry)
                    .with_context(|| format!("Failed to remove symlink {:?}", entry))?;
                if let Some(name) = entry.file_name() {
                    removed.push(name.to_string_lossy().into_owned());
                }
            }
        }

        Ok(removed)
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(normalize_path(path))
        } else {
            Ok(normalize_path(&self.runtime.current_dir()?.join(path)))
        }
    }
}
