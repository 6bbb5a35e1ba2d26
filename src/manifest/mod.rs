//! Reads the executable products of a package through the build tool.

use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Deserializer};

use crate::error::ManifestError;
use crate::package::Toolchain;
use crate::process::{ProcessRunner, display_command};

/// Upper bound on the package description accepted from the build tool.
pub const MANIFEST_OUTPUT_LIMIT: usize = 8 * 1024 * 1024;

/// The subset of the tool's package description that matters here.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PackageDescription {
    pub name: String,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Product {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProductKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    Executable,
    Library,
}

// The tool encodes the kind as an object keyed by the kind name, e.g.
// `{"executable": null}` or `{"library": ["automatic"]}`.
impl<'de> Deserialize<'de> for ProductKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        if map.contains_key("executable") {
            Ok(ProductKind::Executable)
        } else {
            Ok(ProductKind::Library)
        }
    }
}

impl PackageDescription {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Executable product names in declaration order.
    pub fn executable_products(&self) -> Vec<String> {
        self.products
            .iter()
            .filter(|p| p.kind == ProductKind::Executable)
            .map(|p| p.name.clone())
            .collect()
    }
}

pub struct ManifestReader<'a, P: ProcessRunner> {
    runner: &'a P,
    toolchain: &'a Toolchain,
}

impl<'a, P: ProcessRunner> ManifestReader<'a, P> {
    pub fn new(runner: &'a P, toolchain: &'a Toolchain) -> Self {
        Self { runner, toolchain }
    }

    /// Names of the executable products declared by the package at `package_path`.
    ///
    /// A package the tool cannot describe yields an empty list; it may be a
    /// library-only package.
    #[tracing::instrument(skip(self))]
    pub async fn read_executable_products(
        &self,
        package_path: &Path,
    ) -> Result<Vec<String>, ManifestError> {
        let args = self.toolchain.dump_package_args();
        let command = display_command(&self.toolchain.program, &args);

        let output = self
            .runner
            .capture(
                &self.toolchain.program,
                &args,
                package_path,
                MANIFEST_OUTPUT_LIMIT,
            )
            .await
            .map_err(|source| ManifestError::Invocation {
                command: command.clone(),
                path: package_path.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            warn!(
                "`{}` failed in {:?} ({}): {}",
                command,
                package_path,
                output.status,
                output.stderr.trim()
            );
            return Ok(Vec::new());
        }

        let description =
            PackageDescription::parse(&output.stdout).map_err(|source| ManifestError::Decode {
                path: package_path.to_path_buf(),
                source,
            })?;

        let executables = description.executable_products();
        debug!(
            "Package {} declares executables {:?}",
            description.name, executables
        );
        Ok(executables)
    }
}
