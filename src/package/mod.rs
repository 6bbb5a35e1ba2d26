//! Package identity and on-disk layout.
//!
//! An installed package lives at `<root>/packages/<owner>/<name>[-<version>]`
//! and its executables are published as symlinks in `<root>/bin`. The
//! directory name derived from an identifier is the only key fetch, build
//! and uninstall share; there is no metadata file.

mod config;
mod identity;
mod toolchain;

pub use config::{DEFAULT_ROOT_DIR, InstallConfig};
pub use identity::{PackageIdentifier, PackageSource, sanitize_component};
pub use toolchain::Toolchain;
