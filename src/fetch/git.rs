//! Git operations over the `git` command line.

use std::path::Path;

use anyhow::{Context, Result, bail};
use log::debug;

use crate::process::{ProcessRunner, display_command};

const GIT: &str = "git";

/// Git prints little on stdout; this bounds diagnostics kept from it.
const GIT_OUTPUT_LIMIT: usize = 1024 * 1024;

pub struct GitClient<'a, P: ProcessRunner> {
    runner: &'a P,
}

impl<'a, P: ProcessRunner> GitClient<'a, P> {
    pub fn new(runner: &'a P) -> Self {
        Self { runner }
    }

    /// Run git in `cwd` and return its trimmed stdout, failing on a non-zero exit.
    async fn run(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let output = self
            .runner
            .capture(GIT, &args, cwd, GIT_OUTPUT_LIMIT)
            .await
            .with_context(|| format!("Failed to run `{}`", display_command(GIT, &args)))?;

        if !output.status.success() {
            bail!(
                "`{}` failed with {}: {}",
                display_command(GIT, &args),
                output.status,
                output.stderr.trim()
            );
        }
        Ok(output.stdout.trim().to_string())
    }

    /// Run git in `cwd` and report whether it exited successfully.
    async fn succeeds(&self, cwd: &Path, args: &[&str]) -> Result<bool> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let output = self
            .runner
            .capture(GIT, &args, cwd, GIT_OUTPUT_LIMIT)
            .await
            .with_context(|| format!("Failed to run `{}`", display_command(GIT, &args)))?;
        Ok(output.status.success())
    }

    #[tracing::instrument(skip(self))]
    pub async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let parent = dest
            .parent()
            .with_context(|| format!("Clone destination {:?} has no parent", dest))?;
        let dest_str = dest.to_string_lossy();
        self.run(parent, &["clone", "--quiet", url, dest_str.as_ref()])
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, repo: &Path) -> Result<()> {
        self.run(repo, &["fetch", "--quiet", "--tags", "--force", "origin"])
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, repo: &Path, reference: &str) -> Result<()> {
        self.run(repo, &["checkout", "--quiet", reference]).await?;
        Ok(())
    }

    /// Fast-forward the checked out branch to its upstream.
    #[tracing::instrument(skip(self))]
    pub async fn pull(&self, repo: &Path) -> Result<()> {
        self.run(repo, &["pull", "--quiet", "--ff-only"]).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn pull_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        self.run(repo, &["pull", "--quiet", "--ff-only", "origin", branch])
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn short_head(&self, repo: &Path) -> Result<String> {
        self.run(repo, &["rev-parse", "--short", "HEAD"]).await
    }

    /// The checked out branch, `None` on a detached HEAD.
    #[tracing::instrument(skip(self))]
    pub async fn current_branch(&self, repo: &Path) -> Result<Option<String>> {
        let branch = self.run(repo, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        Ok((branch != "HEAD" && !branch.is_empty()).then_some(branch))
    }

    /// The branch `origin/HEAD` points at, e.g. `main`.
    #[tracing::instrument(skip(self))]
    pub async fn default_branch(&self, repo: &Path) -> Result<Option<String>> {
        let args = ["symbolic-ref", "--quiet", "--short", "refs/remotes/origin/HEAD"];
        if !self.succeeds(repo, &args).await? {
            return Ok(None);
        }
        let head = self.run(repo, &args).await?;
        Ok(head.strip_prefix("origin/").map(str::to_string))
    }

    /// True if `reference` names a local branch or a branch on origin.
    #[tracing::instrument(skip(self))]
    pub async fn is_branch(&self, repo: &Path, reference: &str) -> Result<bool> {
        let local = format!("refs/heads/{}", reference);
        let remote = format!("refs/remotes/origin/{}", reference);
        for candidate in [local, remote] {
            if self
                .succeeds(repo, &["show-ref", "--verify", "--quiet", candidate.as_str()])
                .await?
            {
                debug!("{} is a branch ({})", reference, candidate);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True if `reference` resolves to a commit or names a branch on origin.
    #[tracing::instrument(skip(self))]
    pub async fn has_ref(&self, repo: &Path, reference: &str) -> Result<bool> {
        let commit = format!("{}^{{commit}}", reference);
        if self
            .succeeds(repo, &["rev-parse", "--verify", "--quiet", commit.as_str()])
            .await?
        {
            return Ok(true);
        }
        self.is_branch(repo, reference).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CapturedOutput, MockProcessRunner};
    use mockall::predicate::*;
    use std::path::PathBuf;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_clone_runs_in_parent() {
        let mut runner = MockProcessRunner::new();
        let dest = PathBuf::from("/root/packages/owner/tool");

        runner
            .expect_capture()
            .with(
                eq("git"),
                eq(args(&[
                    "clone",
                    "--quiet",
                    "https://github.com/owner/tool.git",
                    "/root/packages/owner/tool",
                ])),
                eq(PathBuf::from("/root/packages/owner")),
                always(),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));

        let git = GitClient::new(&runner);
        git.clone_repo("https://github.com/owner/tool.git", &dest)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let mut runner = MockProcessRunner::new();
        runner.expect_capture().returning(|_, _, _, _| {
            Ok(CapturedOutput::failure(
                1,
                "error: pathspec 'v9' did not match any file(s) known to git\n",
            ))
        });

        let git = GitClient::new(&runner);
        let err = git.checkout(Path::new("/repo"), "v9").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("git checkout --quiet v9"));
        assert!(msg.contains("did not match"));
    }

    #[tokio::test]
    async fn test_short_head_is_trimmed() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .with(eq("git"), eq(args(&["rev-parse", "--short", "HEAD"])), always(), always())
            .returning(|_, _, _, _| Ok(CapturedOutput::success("a1b2c3d\n")));

        let git = GitClient::new(&runner);
        assert_eq!(git.short_head(Path::new("/repo")).await.unwrap(), "a1b2c3d");
    }

    #[tokio::test]
    async fn test_current_branch_detached() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .returning(|_, _, _, _| Ok(CapturedOutput::success("HEAD\n")));

        let git = GitClient::new(&runner);
        assert_eq!(git.current_branch(Path::new("/repo")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_default_branch_strips_remote() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .returning(|_, _, _, _| Ok(CapturedOutput::success("origin/main\n")));

        let git = GitClient::new(&runner);
        assert_eq!(
            git.default_branch(Path::new("/repo")).await.unwrap(),
            Some("main".to_string())
        );
    }

    #[tokio::test]
    async fn test_is_branch_checks_remote_after_local() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .with(
                eq("git"),
                eq(args(&["show-ref", "--verify", "--quiet", "refs/heads/develop"])),
                always(),
                always(),
            )
            .returning(|_, _, _, _| Ok(CapturedOutput::failure(1, "")));
        runner
            .expect_capture()
            .with(
                eq("git"),
                eq(args(&[
                    "show-ref",
                    "--verify",
                    "--quiet",
                    "refs/remotes/origin/develop",
                ])),
                always(),
                always(),
            )
            .returning(|_, _, _, _| Ok(CapturedOutput::success("")));

        let git = GitClient::new(&runner);
        assert!(git.is_branch(Path::new("/repo"), "develop").await.unwrap());
    }

    #[tokio::test]
    async fn test_has_ref_tag() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .with(
                eq("git"),
                eq(args(&["rev-parse", "--verify", "--quiet", "1.0.0^{commit}"])),
                always(),
                always(),
            )
            .returning(|_, _, _, _| Ok(CapturedOutput::success("abc\n")));

        let git = GitClient::new(&runner);
        assert!(git.has_ref(Path::new("/repo"), "1.0.0").await.unwrap());
    }

    #[tokio::test]
    async fn test_has_ref_missing() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .returning(|_, _, _, _| Ok(CapturedOutput::failure(1, "")));

        let git = GitClient::new(&runner);
        assert!(!git.has_ref(Path::new("/repo"), "nope").await.unwrap());
    }
}
