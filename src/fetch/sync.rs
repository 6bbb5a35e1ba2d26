//! Copying and syncing local package trees.
//!
//! Copies carry file permissions and modification times over, so the build
//! tool sees unchanged sources as unchanged. Entries whose name is listed in
//! `excluded` are skipped at every depth and, when syncing, left alone on the
//! destination so existing build output survives.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

use crate::runtime::Runtime;

/// What a sync changed on the destination.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub copied: usize,
    pub unchanged: usize,
    pub removed: usize,
}

fn is_excluded(path: &Path, excluded: &[String]) -> bool {
    path.file_name()
        .map(|name| excluded.iter().any(|e| name == e.as_str()))
        .unwrap_or(false)
}

/// Remove a symlink, directory tree or file at `path`.
pub(crate) fn remove_entry<R: Runtime>(runtime: &R, path: &Path) -> Result<()> {
    if runtime.is_symlink(path) {
        runtime.remove_symlink(path)
    } else if runtime.is_dir(path) {
        runtime.remove_dir_all(path)
    } else {
        runtime.remove_file(path)
    }
}

/// Copy every entry of `src` into `dest`, creating `dest` if needed.
#[tracing::instrument(skip(runtime, excluded))]
pub fn copy_tree<R: Runtime>(
    runtime: &R,
    src: &Path,
    dest: &Path,
    excluded: &[String],
) -> Result<usize> {
    runtime
        .create_dir_all(dest)
        .with_context(|| format!("Failed to create {:?}", dest))?;

    let mut copied = 0;
    for entry in runtime.read_dir(src)? {
        if is_excluded(&entry, excluded) {
            continue;
        }
        let Some(name) = entry.file_name() else {
            continue;
        };
        let target = dest.join(name);

        if runtime.is_symlink(&entry) {
            let link = runtime.read_link(&entry)?;
            runtime
                .symlink(&link, &target)
                .with_context(|| format!("Failed to recreate symlink {:?}", target))?;
            copied += 1;
        } else if runtime.is_dir(&entry) {
            copied += copy_tree(runtime, &entry, &target, excluded)?;
        } else {
            runtime.copy_file(&entry, &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Make `dest` mirror `src`: copy new or changed files and delete entries
/// that no longer exist in `src`.
#[tracing::instrument(skip(runtime, excluded))]
pub fn sync_tree<R: Runtime>(
    runtime: &R,
    src: &Path,
    dest: &Path,
    excluded: &[String],
) -> Result<SyncStats> {
    let mut stats = SyncStats::default();

    if runtime.is_symlink(dest) || (runtime.exists(dest) && !runtime.is_dir(dest)) {
        remove_entry(runtime, dest)?;
    }
    if !runtime.is_dir(dest) {
        runtime
            .create_dir_all(dest)
            .with_context(|| format!("Failed to create {:?}", dest))?;
    }

    let mut seen: HashSet<OsString> = HashSet::new();

    for entry in runtime.read_dir(src)? {
        if is_excluded(&entry, excluded) {
            continue;
        }
        let Some(name) = entry.file_name() else {
            continue;
        };
        seen.insert(name.to_os_string());
        let target = dest.join(name);

        if runtime.is_symlink(&entry) {
            let link = runtime.read_link(&entry)?;
            if runtime.is_symlink(&target) && runtime.read_link(&target).ok() == Some(link.clone())
            {
                stats.unchanged += 1;
                continue;
            }
            if runtime.is_symlink(&target) || runtime.exists(&target) {
                remove_entry(runtime, &target)?;
            }
            runtime
                .symlink(&link, &target)
                .with_context(|| format!("Failed to recreate symlink {:?}", target))?;
            stats.copied += 1;
        } else if runtime.is_dir(&entry) {
            let sub = sync_tree(runtime, &entry, &target, excluded)?;
            stats.copied += sub.copied;
            stats.unchanged += sub.unchanged;
            stats.removed += sub.removed;
        } else if runtime.is_unchanged(&entry, &target) {
            stats.unchanged += 1;
        } else {
            if runtime.is_symlink(&target) || runtime.exists(&target) {
                remove_entry(runtime, &target)?;
            }
            runtime.copy_file(&entry, &target)?;
            stats.copied += 1;
        }
    }

    for entry in runtime.read_dir(dest)? {
        if is_excluded(&entry, excluded) {
            continue;
        }
        let stale = entry
            .file_name()
            .map(|name| !seen.contains(name))
            .unwrap_or(false);
        if stale {
            debug!("Removing {:?}, no longer in {:?}", entry, src);
            remove_entry(runtime, &entry)?;
            stats.removed += 1;
        }
    }

    Ok(stats)
}
