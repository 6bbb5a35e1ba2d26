use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::path::PathBuf;

use crate::{
    http::HttpClient,
    package::{InstallConfig, Toolchain},
    runtime::{Runtime, normalize_path},
    search::DEFAULT_API_URL,
};

/// Environment variable overriding the build tool executable.
pub const TOOLCHAIN_ENV: &str = "SWINSTALL_SWIFT";

/// Everything a command needs, resolved once from flags and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub install: InstallConfig,
    pub api_url: String,
    pub token: Option<String>,
    pub toolchain: Toolchain,
}

impl Config {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(
        runtime: &R,
        install_root: Option<PathBuf>,
        api_url: Option<String>,
    ) -> Result<Self> {
        let root = match install_root {
            Some(root) if root.is_absolute() => normalize_path(&root),
            Some(root) => normalize_path(&runtime.current_dir()?.join(root)),
            None => InstallConfig::default_root(runtime)?,
        };
        debug!("Install root: {:?}", root);

        let token = runtime
            .env_var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_some() {
            debug!("Using GITHUB_TOKEN for search requests");
        }

        let toolchain = match runtime.env_var(TOOLCHAIN_ENV) {
            Ok(program) if !program.trim().is_empty() => Toolchain::with_program(program),
            _ => Toolchain::default(),
        };

        Ok(Self {
            install: InstallConfig::new(root),
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token,
            toolchain,
        })
    }

    pub fn http_client(&self) -> Result<HttpClient> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(HttpClient::new(client).with_token(self.token.clone()))
    }
}
