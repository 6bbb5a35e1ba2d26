//! Command implementations behind the CLI.
//!
//! Each command has a thin entry point that loads [`config::Config`] with
//! real collaborators, and a `run` taking them by reference for tests.

pub mod config;
pub mod install;
pub mod list;
pub mod spec;
pub mod uninstall;

pub use install::install;
pub use list::list;
pub use uninstall::uninstall;
