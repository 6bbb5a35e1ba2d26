//! File system operations (copy, compare, directory).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn create_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context("Failed to create directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_file_impl(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).context("Failed to remove file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_dir_impl(&self, path: &Path) -> Result<()> {
        fs::remove_dir(path).context("Failed to remove directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).context("Failed to remove directory and its contents")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn exists_impl(&self, path: &Path) -> bool {
        path.exists()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_dir_impl(&self, path: &Path) -> bool {
        path.is_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_dir_impl(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)
            .with_context(|| format!("Failed to read directory {:?}", path))?
            .map(|entry| Ok(entry?.path()))
            .collect::<Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn copy_file_impl(&self, from: &Path, to: &Path) -> Result<u64> {
        let bytes = fs::copy(from, to)
            .with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        let modified = fs::metadata(from)
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to read modification time of {:?}", from))?;

        // Explicit timestamps need ownership, not write access, on unix.
        #[cfg(unix)]
        let file = fs::File::open(to);
        #[cfg(not(unix))]
        let file = fs::File::options().write(true).open(to);

        file.and_then(|f| f.set_modified(modified))
            .with_context(|| format!("Failed to preserve modification time on {:?}", to))?;

        Ok(bytes)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_unchanged_impl(&self, source: &Path, dest: &Path) -> bool {
        match (fs::metadata(source), fs::symlink_metadata(dest)) {
            (Ok(src), Ok(dst)) if dst.is_file() => {
                src.len() == dst.len()
                    && matches!(
                        (src.modified(), dst.modified()),
                        (Ok(a), Ok(b)) if a == b
                    )
            }
            _ => false,
        }
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn canonicalize_impl(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("Failed to canonicalize {:?}", path))
    }
}
