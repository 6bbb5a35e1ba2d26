pub mod build;
pub mod cleanup;
pub mod commands;
pub mod error;
pub mod fetch;
pub mod http;
pub mod manifest;
pub mod package;
pub mod process;
pub mod runtime;
pub mod search;
pub mod uninstall;
