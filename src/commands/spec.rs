//! Parsing the package argument of `install`.
//!
//! Accepted forms, tried in this order:
//! - a git URL: `https://`, `http://`, `ssh://`, `file://` or `git@host:path`
//! - a local directory: absolute, `./`, `../`, `~`, or any existing directory
//! - `owner/repo` or `owner/repo@version`, cloned from GitHub
//! - a bare name, resolved through repository search

use anyhow::{Context, Result, anyhow, bail};
use log::warn;
use std::path::{Path, PathBuf};

use crate::package::{PackageIdentifier, PackageSource};
use crate::runtime::{Runtime, normalize_path};

const URL_PREFIXES: [&str; 5] = ["https://", "http://", "ssh://", "file://", "git@"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSpec {
    /// Identity and source are known without asking anyone.
    Resolved {
        identifier: PackageIdentifier,
        source: PackageSource,
    },
    /// A bare name that still needs a search.
    Name {
        name: String,
        version: Option<String>,
    },
}

impl InstallSpec {
    /// `version` is the `--version` flag and takes precedence over `@version`.
    pub fn parse<R: Runtime>(runtime: &R, raw: &str, version: Option<String>) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("Package argument cannot be empty");
        }

        if URL_PREFIXES.iter().any(|p| raw.starts_with(p)) {
            return parse_url(raw, version);
        }

        if let Some(path) = local_path(runtime, raw)? {
            return parse_local(runtime, &path, version);
        }

        let (base, at_version) = split_version(raw)?;
        let version = merge_versions(version, at_version);

        if let Some((owner, repo)) = base.split_once('/') {
            if owner.is_empty() || repo.is_empty() || repo.contains('/') {
                bail!(
                    "Invalid package `{}`. Expected 'owner/repo', a URL, a path or a name.",
                    raw
                );
            }
            let url = format!("https://github.com/{}/{}.git", owner, repo);
            return Ok(InstallSpec::Resolved {
                identifier: PackageIdentifier::new(owner, repo, url.clone(), version.clone()),
                source: PackageSource::git(url, version),
            });
        }

        Ok(InstallSpec::Name {
            name: base.to_string(),
            version,
        })
    }
}

fn parse_url(url: &str, version: Option<String>) -> Result<InstallSpec> {
    let (owner, name) = url_owner_and_name(url)
        .with_context(|| format!("Cannot derive owner and name from `{}`", url))?;
    Ok(InstallSpec::Resolved {
        identifier: PackageIdentifier::new(owner, name, url, version.clone()),
        source: PackageSource::git(url, version),
    })
}

/// The last two path segments of a git URL, with `.git` removed from the name.
fn url_owner_and_name(url: &str) -> Option<(String, String)> {
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, path)| path)?,
        None => url.split_once(':').map(|(_, path)| path)?,
    };
    let mut segments = path.trim_end_matches('/').rsplit('/');
    let name = segments.next()?;
    let name = name.strip_suffix(".git").unwrap_or(name);
    let owner = segments.next()?;
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    Some((owner.to_string(), name.to_string()))
}

fn local_path<R: Runtime>(runtime: &R, raw: &str) -> Result<Option<PathBuf>> {
    if raw == "~" || raw.starts_with("~/") {
        let home = runtime
            .home_dir()
            .context("Could not find home directory")?;
        let rest = raw.trim_start_matches('~').trim_start_matches('/');
        return Ok(Some(home.join(rest)));
    }

    let explicit = Path::new(raw).is_absolute()
        || raw == "."
        || raw == ".."
        || raw.starts_with("./")
        || raw.starts_with("../");
    let candidate = runtime.current_dir()?.join(raw);
    if explicit {
        return Ok(Some(candidate));
    }
    Ok(runtime.is_dir(&candidate).then_some(candidate))
}

fn parse_local<R: Runtime>(
    runtime: &R,
    path: &Path,
    version: Option<String>,
) -> Result<InstallSpec> {
    if !runtime.is_dir(path) {
        bail!("{} is not a directory", path.display());
    }
    if let Some(v) = version {
        warn!("Ignoring version {} for local package {}", v, path.display());
    }

    let path = runtime
        .canonicalize(path)
        .unwrap_or_else(|_| normalize_path(path));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Cannot derive a package name from {}", path.display()))?;

    Ok(InstallSpec::Resolved {
        identifier: PackageIdentifier::local(&name, &path),
        source: PackageSource::LocalPath(path),
    })
}

fn split_version(raw: &str) -> Result<(&str, Option<String>)> {
    match raw.rsplit_once('@') {
        Some((_, "")) => Err(anyhow!(
            "Invalid format: version after @ cannot be empty. Expected 'owner/repo@version'."
        )),
        Some((base, version)) => Ok((base, Some(version.to_string()))),
        None => Ok((raw, None)),
    }
}

fn merge_versions(flag: Option<String>, inline: Option<String>) -> Option<String> {
    match (flag, inline) {
        (Some(flag), Some(inline)) if flag != inline => {
            warn!("Both --version {} and @{} given, using {}", flag, inline, flag);
            Some(flag)
        }
        (flag, inline) => flag.or(inline),
    }
}
