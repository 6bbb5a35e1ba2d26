//! Error kinds reported by the package lifecycle engine.
//!
//! Each variant carries the path, ref or product it concerns. Lower-level
//! failures are kept as the `source` so the full chain is printed by `main`.

use std::path::PathBuf;

use thiserror::Error;

use crate::process::ProcessError;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to clone {url} into {path:?}")]
    CloneFailed {
        url: String,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to check out `{reference}` in {path:?}")]
    CheckoutFailed {
        reference: String,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to copy {from:?} to {to:?}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("{path:?} is not a valid package: missing {manifest}")]
    InvalidPackageStructure { path: PathBuf, manifest: String },

    #[error("version `{version}` not found in {origin}")]
    VersionNotFound { version: String, origin: String },

    #[error("git {operation} failed in {path:?}")]
    GitOperationFailed {
        operation: String,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to prepare {path:?}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to run `{command}` in {path:?}")]
    Invocation {
        command: String,
        path: PathBuf,
        #[source]
        source: ProcessError,
    },

    #[error("failed to decode package description of {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build of product `{product}` failed in {path:?}: {reason}")]
    BuildFailed {
        product: String,
        path: PathBuf,
        reason: String,
    },

    #[error("no executable products declared in {path:?}")]
    NoExecutablesFound { path: PathBuf },

    #[error("failed to link executable `{name}` at {link:?}")]
    SymlinkFailed {
        name: String,
        link: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

#[derive(Debug, Error)]
pub enum UninstallError {
    #[error("no packages installed under {root:?}")]
    NoPackagesInstalled { root: PathBuf },

    #[error("package `{identifier}` is not installed")]
    PackageNotFound { identifier: String },
}
