//! Project manifest (`Seal.toml`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileWarning, Result};

/// Manifest file name looked up in a project directory
pub const MANIFEST_FILE: &str = "Seal.toml";

/// Parsed `Seal.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub package: PackageConfig,
    #[serde(default)]
    pub lints: LintConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    pub name: String,
    /// Function run by `seal run`
    #[serde(default = "default_entry")]
    pub entry: String,
    /// Source files relative to the project directory. Empty means every
    /// `*.seal` file under `src/`.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

fn default_entry() -> String {
    "main".to_string()
}

/// What to do with a warning kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    Allow,
    #[default]
    Warn,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LintConfig {
    #[serde(default)]
    pub unreachable_arm: LintLevel,
    #[serde(default)]
    pub redundant_else: LintLevel,
    #[serde(default)]
    pub empty_sealed: LintLevel,
}

impl LintConfig {
    pub fn level(&self, warning: &CompileWarning) -> LintLevel {
        match warning {
            CompileWarning::UnreachableArm { .. } => self.unreachable_arm,
            CompileWarning::RedundantElse { .. } => self.redundant_else,
            CompileWarning::EmptySealed { .. } => self.empty_sealed,
        }
    }
}

impl Manifest {
    /// Manifest for a bare source file: package named after the file stem
    pub fn for_file(path: &Path) -> Self {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("main")
            .to_string();
        Self {
            package: PackageConfig {
                name,
                entry: default_entry(),
                sources: vec![path.to_path_buf()],
            },
            lints: LintConfig::default(),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CompileError::config_error(format!("invalid {MANIFEST_FILE}: {e}")))
    }

    /// Read `Seal.toml` from a project directory
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| CompileError::io_error(format!("Failed to read {}: {}", path.display(), e)))?;
        let manifest = Self::from_toml(&text)?;
        tracing::debug!(package = %manifest.package.name, "loaded manifest");
        Ok(manifest)
    }

    /// Source files of the project, relative to `dir` when listed explicitly
    pub fn source_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if self.package.sources.is_empty() {
            let sources = crate::resolver::discover_sources(&dir.join("src"))?;
            if sources.is_empty() {
                return Err(CompileError::config_error(format!(
                    "no source files found under {}",
                    dir.join("src").display()
                )));
            }
            Ok(sources)
        } else {
            Ok(self.package.sources.iter().map(|p| dir.join(p)).collect())
        }
    }
}
