use std::path::{Path, PathBuf};

/// The external build tool and the conventions of its package format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Build tool executable, `swift` unless overridden.
    pub program: String,
    /// File whose presence marks a directory as a package.
    pub manifest_file: String,
    /// Release build output, relative to the package directory.
    pub artifact_dir: PathBuf,
    /// Subdirectories never copied from a local source.
    pub excluded_dirs: Vec<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            program: "swift".to_string(),
            manifest_file: "Package.swift".to_string(),
            artifact_dir: PathBuf::from(".build").join("release"),
            excluded_dirs: vec![".build".to_string(), ".git".to_string()],
        }
    }
}

impl Toolchain {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn dump_package_args(&self) -> Vec<String> {
        vec!["package".to_string(), "dump-package".to_string()]
    }

    pub fn build_args(&self, product: &str) -> Vec<String> {
        vec![
            "build".to_string(),
            "-c".to_string(),
            "release".to_string(),
            "--product".to_string(),
            product.to_string(),
        ]
    }

    pub fn manifest_path(&self, package_path: &Path) -> PathBuf {
        package_path.join(&self.manifest_file)
    }

    pub fn binary_path(&self, package_path: &Path, product: &str) -> PathBuf {
        package_path.join(&self.artifact_dir).join(product)
    }
}
