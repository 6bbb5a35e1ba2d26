//! Bringing package sources into the install root.
//!
//! The directory derived from a [`PackageIdentifier`] is the only cache key:
//! when it exists the package is updated in place, otherwise it is created.
//! Trees created by a fetch are removed again when that fetch fails. Trees
//! that already existed are never removed, whatever goes wrong while
//! updating them.

pub mod git;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use log::{debug, info, warn};

use crate::cleanup::{CleanupGuard, SharedCleanupContext};
use crate::error::FetchError;
use crate::package::{InstallConfig, PackageIdentifier, PackageSource, Toolchain};
use crate::process::ProcessRunner;
use crate::runtime::Runtime;

use self::git::GitClient;
use self::sync::{copy_tree, sync_tree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub package_path: PathBuf,
    /// The requested version, or the short commit hash of a git checkout
    /// fetched without one.
    pub resolved_version: Option<String>,
    pub identifier: PackageIdentifier,
}

pub struct Fetcher<'a, R: Runtime, P: ProcessRunner> {
    runtime: &'a R,
    runner: &'a P,
    config: &'a InstallConfig,
    toolchain: &'a Toolchain,
    cleanup: Option<SharedCleanupContext>,
}

impl<'a, R: Runtime, P: ProcessRunner> Fetcher<'a, R, P> {
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
            cleanup: None,
        }
    }

    /// Register new package trees with `cleanup` while they are being created.
    pub fn with_cleanup(mut self, cleanup: SharedCleanupContext) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    fn git(&self) -> GitClient<'a, P> {
        GitClient::new(self.runner)
    }

    fn guard(&self, path: &Path) -> Option<CleanupGuard> {
        self.cleanup
            .as_ref()
            .map(|ctx| CleanupGuard::new(ctx.clone(), path.to_path_buf()))
    }

    fn discard(&self, path: &Path) {
        if self.runtime.exists(path) {
            debug!("Removing {:?}", path);
            if let Err(e) = self.runtime.remove_dir_all(path) {
                warn!("Failed to remove {:?}: {}", path, e);
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch(
        &self,
        identifier: &PackageIdentifier,
        source: &PackageSource,
    ) -> Result<FetchResult, FetchError> {
        let packages_dir = self.config.packages_dir();
        self.runtime
            .create_dir_all(&packages_dir)
            .map_err(|source| FetchError::Prepare {
                path: packages_dir.clone(),
                source,
            })?;

        let dest = self.config.package_dir(identifier);
        let resolved_version = if self.runtime.exists(&dest) {
            info!("Updating existing package at {:?}", dest);
            self.update_existing(identifier, source, &dest).await?
        } else {
            info!("Fetching {} ({} source) into {:?}", identifier, source.kind(), dest);
            self.fetch_new(identifier, source, &dest).await?
        };

        Ok(FetchResult {
            package_path: dest,
            resolved_version,
            identifier: identifier.clone(),
        })
    }

    async fn update_existing(
        &self,
        identifier: &PackageIdentifier,
        source: &PackageSource,
        dest: &Path,
    ) -> Result<Option<String>, FetchError> {
        match source {
            PackageSource::LocalPath(src) => {
                println!("Syncing {} into {}", src.display(), dest.display());
                let stats = sync_tree(self.runtime, src, dest, &self.toolchain.excluded_dirs)
                    .map_err(|source| FetchError::CopyFailed {
                        from: src.clone(),
                        to: dest.to_path_buf(),
                        source,
                    })?;
                debug!("Sync of {:?}: {:?}", dest, stats);
                self.finalize(dest, false)?;
                Ok(identifier.version.clone())
            }
            PackageSource::Git { version, .. } => {
                println!("Updating {}", identifier);
                let resolved = self
                    .update_checkout(identifier, version.as_deref(), dest)
                    .await?;
                self.finalize(dest, false)?;
                Ok(resolved)
            }
            PackageSource::Name(name) => {
                debug!("{} already present, leaving {:?} as is", name, dest);
                Ok(identifier.version.clone())
            }
        }
    }

    async fn update_checkout(
        &self,
        identifier: &PackageIdentifier,
        version: Option<&str>,
        dest: &Path,
    ) -> Result<Option<String>, FetchError> {
        let git = self.git();
        let op_failed = |operation: &str, source: anyhow::Error| FetchError::GitOperationFailed {
            operation: operation.to_string(),
            path: dest.to_path_buf(),
            source,
        };

        git.fetch(dest).await.map_err(|e| op_failed("fetch", e))?;

        match version {
            Some(reference) => {
                if !git
                    .has_ref(dest, reference)
                    .await
                    .map_err(|e| op_failed("rev-parse", e))?
                {
                    return Err(FetchError::VersionNotFound {
                        version: reference.to_string(),
                        origin: identifier.origin.clone(),
                    });
                }
                git.checkout(dest, reference)
                    .await
                    .map_err(|source| FetchError::CheckoutFailed {
                        reference: reference.to_string(),
                        path: dest.to_path_buf(),
                        source,
                    })?;
                if git
                    .is_branch(dest, reference)
                    .await
                    .map_err(|e| op_failed("show-ref", e))?
                {
                    git.pull_branch(dest, reference)
                        .await
                        .map_err(|e| op_failed("pull", e))?;
                }
                Ok(Some(reference.to_string()))
            }
            None => {
                let branch = git
                    .current_branch(dest)
                    .await
                    .map_err(|e| op_failed("rev-parse", e))?;
                if branch.is_none() {
                    match git
                        .default_branch(dest)
                        .await
                        .map_err(|e| op_failed("symbolic-ref", e))?
                    {
                        Some(default) => {
                            debug!("Detached HEAD in {:?}, switching to {}", dest, default);
                            git.checkout(dest, &default).await.map_err(|source| {
                                FetchError::CheckoutFailed {
                                    reference: default.clone(),
                                    path: dest.to_path_buf(),
                                    source,
                                }
                            })?;
                        }
                        None => {
                            warn!("{:?} has a detached HEAD and no default branch", dest);
                            return git
                                .short_head(dest)
                                .await
                                .map(Some)
                                .map_err(|e| op_failed("rev-parse", e));
                        }
                    }
                }
                git.pull(dest).await.map_err(|e| op_failed("pull", e))?;
                git.short_head(dest)
                    .await
                    .map(Some)
                    .map_err(|e| op_failed("rev-parse", e))
            }
        }
    }

    async fn fetch_new(
        &self,
        identifier: &PackageIdentifier,
        source: &PackageSource,
        dest: &Path,
    ) -> Result<Option<String>, FetchError> {
        match source {
            PackageSource::Git { url, version } => {
                let parent = dest.parent().unwrap_or(dest);
                self.runtime
                    .create_dir_all(parent)
                    .map_err(|source| FetchError::Prepare {
                        path: parent.to_path_buf(),
                        source,
                    })?;

                let _guard = self.guard(dest);
                let git = self.git();

                println!("Cloning {}", url);
                if let Err(source) = git.clone_repo(url, dest).await {
                    self.discard(dest);
                    return Err(FetchError::CloneFailed {
                        url: url.clone(),
                        path: dest.to_path_buf(),
                        source,
                    });
                }

                let resolved = match version {
                    Some(reference) => {
                        if let Err(source) = git.checkout(dest, reference).await {
                            self.discard(dest);
                            return Err(FetchError::CheckoutFailed {
                                reference: reference.clone(),
                                path: dest.to_path_buf(),
                                source,
                            });
                        }
                        Some(reference.clone())
                    }
                    None => match git.short_head(dest).await {
                        Ok(hash) => Some(hash),
                        Err(source) => {
                            self.discard(dest);
                            return Err(FetchError::GitOperationFailed {
                                operation: "rev-parse".to_string(),
                                path: dest.to_path_buf(),
                                source,
                            });
                        }
                    },
                };

                self.finalize(dest, true)?;
                Ok(resolved)
            }
            PackageSource::LocalPath(src) => {
                if !self.runtime.exists(&self.toolchain.manifest_path(src)) {
                    return Err(FetchError::InvalidPackageStructure {
                        path: src.clone(),
                        manifest: self.toolchain.manifest_file.clone(),
                    });
                }

                let _guard = self.guard(dest);

                println!("Copying {} into {}", src.display(), dest.display());
                if let Err(source) = copy_tree(self.runtime, src, dest, &self.toolchain.excluded_dirs)
                {
                    self.discard(dest);
                    return Err(FetchError::CopyFailed {
                        from: src.clone(),
                        to: dest.to_path_buf(),
                        source,
                    });
                }

                self.finalize(dest, true)?;
                Ok(identifier.version.clone())
            }
            PackageSource::Name(name) => Err(FetchError::GitOperationFailed {
                operation: "clone".to_string(),
                path: dest.to_path_buf(),
                source: anyhow!("package name `{}` was not resolved to a git origin", name),
            }),
        }
    }

    /// Check that `dest` holds a package manifest, removing `dest` when it
    /// does not and `cleanup_on_error` is set.
    fn finalize(&self, dest: &Path, cleanup_on_error: bool) -> Result<(), FetchError> {
        if self.runtime.exists(&self.toolchain.manifest_path(dest)) {
            return Ok(());
        }
        if cleanup_on_error {
            self.discard(dest);
        }
        Err(FetchError::InvalidPackageStructure {
            path: dest.to_path_buf(),
            manifest: self.toolchain.manifest_file.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup;
    use crate::process::{CapturedOutput, MockProcessRunner};
    use crate::runtime::RealRuntime;
    use std::fs;
    use tempfile::tempdir;

    const MANIFEST: &str = "// swift-tools-version:5.9\n";

    fn local_package(root: &Path, name: &str) -> PathBuf {
        let dir = root.join("src").join(name);
        fs::create_dir_all(dir.join("Sources").join(name)).unwrap();
        fs::write(dir.join("Package.swift"), MANIFEST).unwrap();
        fs::write(dir.join("Sources").join(name).join("main.swift"), "print(1)").unwrap();
        dir
    }

    async fn local_fetch(
        config: &InstallConfig,
        toolchain: &Toolchain,
        src: &Path,
        name: &str,
    ) -> Result<FetchResult, FetchError> {
        let runtime = RealRuntime;
        let runner = MockProcessRunner::new();
        let fetcher = Fetcher::new(&runtime, &runner, config, toolchain);
        let id = PackageIdentifier::local(name, src);
        fetcher
            .fetch(&id, &PackageSource::LocalPath(src.to_path_buf()))
            .await
    }

    /// Answers `git clone` by creating the destination with a manifest.
    fn clone_creates_package(args: &[String]) -> CapturedOutput {
        let dest = PathBuf::from(args.last().unwrap());
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("Package.swift"), MANIFEST).unwrap();
        CapturedOutput::success("")
    }

    #[tokio::test]
    async fn test_local_fetch_into_empty_root() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path().join("root"));
        let toolchain = Toolchain::default();
        let src = local_package(dir.path(), "Package1");

        let result = local_fetch(&config, &toolchain, &src, "Package1").await.unwrap();

        let expected = config.packages_dir().join("local").join("Package1");
        assert_eq!(result.package_path, expected);
        assert!(expected.join("Package.swift").exists());
        assert!(expected.join("Sources/Package1/main.swift").exists());
        assert_eq!(result.resolved_version, None);
    }

    #[tokio::test]
    async fn test_local_fetch_is_idempotent() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path().join("root"));
        let toolchain = Toolchain::default();
        let src = local_package(dir.path(), "Package1");

        let first = local_fetch(&config, &toolchain, &src, "Package1").await.unwrap();
        let second = local_fetch(&config, &toolchain, &src, "Package1").await.unwrap();

        assert_eq!(first.package_path, second.package_path);
        assert!(second.package_path.join("Package.swift").exists());
    }

    #[tokio::test]
    async fn test_local_fetch_without_manifest_leaves_nothing() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path().join("root"));
        let toolchain = Toolchain::default();
        let src = dir.path().join("src").join("NotAPackage");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("README.md"), "hello").unwrap();

        let err = local_fetch(&config, &toolchain, &src, "NotAPackage").await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidPackageStructure { .. }));
        assert!(!config.packages_dir().join("local").join("NotAPackage").exists());
    }

    #[tokio::test]
    async fn test_two_local_packages_coexist() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path().join("root"));
        let toolchain = Toolchain::default();
        let one = local_package(dir.path(), "Package1");
        let two = local_package(dir.path(), "Package2");

        let first = local_fetch(&config, &toolchain, &one, "Package1").await.unwrap();
        let second = local_fetch(&config, &toolchain, &two, "Package2").await.unwrap();

        assert_ne!(first.package_path, second.package_path);
        assert!(first.package_path.exists());
        assert!(second.package_path.exists());
    }

    #[tokio::test]
    async fn test_local_fetch_skips_build_and_git() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path().join("root"));
        let toolchain = Toolchain::default();
        let src = local_package(dir.path(), "tool");
        fs::create_dir_all(src.join(".build/release")).unwrap();
        fs::write(src.join(".build/release/tool"), "binary").unwrap();
        fs::create_dir_all(src.join(".git")).unwrap();
        fs::write(src.join(".git/HEAD"), "ref: refs/heads/main").unwrap();

        let result = local_fetch(&config, &toolchain, &src, "tool").await.unwrap();

        assert!(!result.package_path.join(".build").exists());
        assert!(!result.package_path.join(".git").exists());
    }

    #[tokio::test]
    async fn test_local_refetch_syncs_and_keeps_build_output() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path().join("root"));
        let toolchain = Toolchain::default();
        let src = local_package(dir.path(), "tool");
        fs::write(src.join("Sources/tool/extra.swift"), "let x = 1").unwrap();

        let result = local_fetch(&config, &toolchain, &src, "tool").await.unwrap();
        fs::create_dir_all(result.package_path.join(".build/release")).unwrap();
        fs::write(result.package_path.join(".build/release/tool"), "binary").unwrap();

        fs::remove_file(src.join("Sources/tool/extra.swift")).unwrap();
        local_fetch(&config, &toolchain, &src, "tool").await.unwrap();

        assert!(!result.package_path.join("Sources/tool/extra.swift").exists());
        assert!(result.package_path.join(".build/release/tool").exists());
    }

    #[tokio::test]
    async fn test_local_refetch_keeps_existing_on_invalid_source() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path().join("root"));
        let toolchain = Toolchain::default();
        let src = local_package(dir.path(), "tool");

        let result = local_fetch(&config, &toolchain, &src, "tool").await.unwrap();
        fs::remove_file(src.join("Package.swift")).unwrap();

        let err = local_fetch(&config, &toolchain, &src, "tool").await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidPackageStructure { .. }));
        assert!(result.package_path.exists());
    }

    #[tokio::test]
    async fn test_git_clone_records_short_hash() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        let mut runner = MockProcessRunner::new();

        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("clone"))
            .times(1)
            .returning(|_, args, _, _| Ok(clone_creates_package(args)));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("rev-parse"))
            .times(1)
            .returning(|_, _, _, _| Ok(CapturedOutput::success("abc1234\n")));

        let ctx = cleanup::new_shared();
        let fetcher =
            Fetcher::new(&runtime, &runner, &config, &toolchain).with_cleanup(ctx.clone());
        let id = PackageIdentifier::new("owner", "tool", "https://github.com/owner/tool.git", None);
        let source = PackageSource::git("https://github.com/owner/tool.git", None);

        let result = fetcher.fetch(&id, &source).await.unwrap();

        assert_eq!(result.resolved_version.as_deref(), Some("abc1234"));
        assert_eq!(
            result.package_path,
            config.packages_dir().join("owner").join("tool")
        );
        assert!(ctx.lock().unwrap().paths().is_empty());
    }

    #[tokio::test]
    async fn test_git_checkout_failure_removes_new_clone() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        let mut runner = MockProcessRunner::new();

        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("clone"))
            .returning(|_, args, _, _| Ok(clone_creates_package(args)));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("checkout"))
            .returning(|_, _, _, _| {
                Ok(CapturedOutput::failure(1, "error: pathspec 'v9' did not match"))
            });

        let fetcher = Fetcher::new(&runtime, &runner, &config, &toolchain);
        let id = PackageIdentifier::new("owner", "tool", "u", Some("v9".into()));
        let source = PackageSource::git("https://github.com/owner/tool.git", Some("v9".into()));

        let err = fetcher.fetch(&id, &source).await.unwrap_err();

        assert!(matches!(err, FetchError::CheckoutFailed { ref reference, .. } if reference == "v9"));
        assert!(!config.packages_dir().join("owner").join("tool-v9").exists());
    }

    #[tokio::test]
    async fn test_git_clone_failure_reports_url() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        let mut runner = MockProcessRunner::new();

        runner
            .expect_capture()
            .returning(|_, _, _, _| Ok(CapturedOutput::failure(128, "repository not found")));

        let fetcher = Fetcher::new(&runtime, &runner, &config, &toolchain);
        let id = PackageIdentifier::new("owner", "missing", "u", None);
        let source = PackageSource::git("https://github.com/owner/missing.git", None);

        let err = fetcher.fetch(&id, &source).await.unwrap_err();

        assert!(matches!(err, FetchError::CloneFailed { ref url, .. } if url.ends_with("missing.git")));
        assert!(!config.packages_dir().join("owner").join("missing").exists());
    }

    #[tokio::test]
    async fn test_git_update_failure_keeps_existing_tree() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        let existing = config.packages_dir().join("owner").join("tool");
        fs::create_dir_all(&existing).unwrap();
        fs::write(existing.join("Package.swift"), MANIFEST).unwrap();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("fetch"))
            .returning(|_, _, _, _| Ok(CapturedOutput::failure(1, "could not resolve host")));

        let fetcher = Fetcher::new(&runtime, &runner, &config, &toolchain);
        let id = PackageIdentifier::new("owner", "tool", "u", None);
        let source = PackageSource::git("https://github.com/owner/tool.git", None);

        let err = fetcher.fetch(&id, &source).await.unwrap_err();

        assert!(matches!(err, FetchError::GitOperationFailed { ref operation, .. } if operation == "fetch"));
        assert!(existing.join("Package.swift").exists());
    }

    #[tokio::test]
    async fn test_git_update_unknown_version() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        let existing = config.packages_dir().join("owner").join("tool-v9");
        fs::create_dir_all(&existing).unwrap();
        fs::write(existing.join("Package.swift"), MANIFEST).unwrap();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("fetch"))
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| {
                matches!(args.first().map(String::as_str), Some("rev-parse" | "show-ref"))
            })
            .returning(|_, _, _, _| Ok(CapturedOutput::failure(1, "")));

        let fetcher = Fetcher::new(&runtime, &runner, &config, &toolchain);
        let id = PackageIdentifier::new("owner", "tool", "https://github.com/owner/tool.git", Some("v9".into()));
        let source = PackageSource::git("https://github.com/owner/tool.git", Some("v9".into()));

        let err = fetcher.fetch(&id, &source).await.unwrap_err();

        assert!(matches!(err, FetchError::VersionNotFound { ref version, .. } if version == "v9"));
        assert!(existing.exists());
    }

    #[tokio::test]
    async fn test_git_update_branch_pulls_it() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        let existing = config.packages_dir().join("owner").join("tool-main");
        fs::create_dir_all(&existing).unwrap();
        fs::write(existing.join("Package.swift"), MANIFEST).unwrap();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .withf(|_, args, _, _| {
                matches!(
                    args.first().map(String::as_str),
                    Some("fetch" | "rev-parse" | "checkout" | "show-ref")
                )
            })
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args == ["pull", "--quiet", "--ff-only", "origin", "main"])
            .times(1)
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));

        let fetcher = Fetcher::new(&runtime, &runner, &config, &toolchain);
        let id = PackageIdentifier::new("owner", "tool", "u", Some("main".into()));
        let source = PackageSource::git("https://github.com/owner/tool.git", Some("main".into()));

        let result = fetcher.fetch(&id, &source).await.unwrap();
        assert_eq!(result.resolved_version.as_deref(), Some("main"));
    }

    fn existing_checkout(config: &InstallConfig, relative: &str) -> PathBuf {
        let existing = config.packages_dir().join(relative);
        fs::create_dir_all(&existing).unwrap();
        fs::write(existing.join("Package.swift"), MANIFEST).unwrap();
        existing
    }

    #[tokio::test]
    async fn test_git_update_pulls_current_branch() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        existing_checkout(&config, "owner/tool");

        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("fetch"))
            .times(1)
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args == ["rev-parse", "--abbrev-ref", "HEAD"])
            .times(1)
            .returning(|_, _, _, _| Ok(CapturedOutput::success("main\n")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args == ["pull", "--quiet", "--ff-only"])
            .times(1)
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args == ["rev-parse", "--short", "HEAD"])
            .times(1)
            .returning(|_, _, _, _| Ok(CapturedOutput::success("def5678\n")));

        let fetcher = Fetcher::new(&runtime, &runner, &config, &toolchain);
        let id = PackageIdentifier::new("owner", "tool", "u", None);
        let source = PackageSource::git("https://github.com/owner/tool.git", None);

        let result = fetcher.fetch(&id, &source).await.unwrap();

        assert_eq!(result.resolved_version.as_deref(), Some("def5678"));
        assert_eq!(result.package_path, config.packages_dir().join("owner/tool"));
    }

    #[tokio::test]
    async fn test_git_update_detached_head_returns_to_default_branch() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        existing_checkout(&config, "owner/tool");

        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("fetch"))
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args == ["rev-parse", "--abbrev-ref", "HEAD"])
            .returning(|_, _, _, _| Ok(CapturedOutput::success("HEAD\n")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("symbolic-ref"))
            .returning(|_, _, _, _| Ok(CapturedOutput::success("origin/main\n")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args == ["checkout", "--quiet", "main"])
            .times(1)
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args == ["pull", "--quiet", "--ff-only"])
            .times(1)
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args == ["rev-parse", "--short", "HEAD"])
            .returning(|_, _, _, _| Ok(CapturedOutput::success("0a1b2c3\n")));

        let fetcher = Fetcher::new(&runtime, &runner, &config, &toolchain);
        let id = PackageIdentifier::new("owner", "tool", "u", None);
        let source = PackageSource::git("https://github.com/owner/tool.git", None);

        let result = fetcher.fetch(&id, &source).await.unwrap();
        assert_eq!(result.resolved_version.as_deref(), Some("0a1b2c3"));
    }

    #[tokio::test]
    async fn test_git_update_detached_head_without_default_keeps_commit() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        existing_checkout(&config, "owner/tool");

        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("fetch"))
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args == ["rev-parse", "--abbrev-ref", "HEAD"])
            .returning(|_, _, _, _| Ok(CapturedOutput::success("HEAD\n")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("symbolic-ref"))
            .returning(|_, _, _, _| Ok(CapturedOutput::failure(1, "")));
        runner
            .expect_capture()
            .withf(|_, args, _, _| args == ["rev-parse", "--short", "HEAD"])
            .returning(|_, _, _, _| Ok(CapturedOutput::success("9f8e7d6\n")));

        let fetcher = Fetcher::new(&runtime, &runner, &config, &toolchain);
        let id = PackageIdentifier::new("owner", "tool", "u", None);
        let source = PackageSource::git("https://github.com/owner/tool.git", None);

        let result = fetcher.fetch(&id, &source).await.unwrap();
        assert_eq!(result.resolved_version.as_deref(), Some("9f8e7d6"));
    }

    #[tokio::test]
    async fn test_git_clone_without_manifest_is_removed() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        let mut runner = MockProcessRunner::new();

        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("clone"))
            .times(1)
            .returning(|_, args, _, _| {
                let dest = PathBuf::from(args.last().unwrap());
                fs::create_dir_all(&dest).unwrap();
                fs::write(dest.join("README.md"), "not a package").unwrap();
                Ok(CapturedOutput::success(""))
            });
        runner
            .expect_capture()
            .withf(|_, args, _, _| args.first().map(String::as_str) == Some("rev-parse"))
            .returning(|_, _, _, _| Ok(CapturedOutput::success("abc1234\n")));

        let ctx = cleanup::new_shared();
        let fetcher =
            Fetcher::new(&runtime, &runner, &config, &toolchain).with_cleanup(ctx.clone());
        let id = PackageIdentifier::new("owner", "docs", "u", None);
        let source = PackageSource::git("https://github.com/owner/docs.git", None);

        let err = fetcher.fetch(&id, &source).await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidPackageStructure { .. }));
        assert!(!config.packages_dir().join("owner").join("docs").exists());
        assert!(ctx.lock().unwrap().paths().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_name_is_rejected() {
        let dir = tempdir().unwrap();
        let config = InstallConfig::new(dir.path());
        let toolchain = Toolchain::default();
        let runtime = RealRuntime;
        let runner = MockProcessRunner::new();

        let fetcher = Fetcher::new(&runtime, &runner, &config, &toolchain);
        let id = PackageIdentifier::new("unknown", "tool", "tool", None);

        let err = fetcher
            .fetch(&id, &PackageSource::Name("tool".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::GitOperationFailed { .. }));
    }
}
