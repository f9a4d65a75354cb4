//! JSON configuration for the phpack driver
//!
//! The recognized keys mirror what the bundler consumes: the entry script,
//! output and catalog locations, include/exclude globs, extra PSR-4 rules,
//! and the optimization toggles.

use phpack_analyze::autoload::composer::PathList;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Exclusions applied when the configuration names none.
pub const DEFAULT_EXCLUDES: &[&str] = &["**/tests/**", "**/*Test.php", "**/vendor/**"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration is missing the required \"entry\" key")]
    MissingEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// Relative path of the entry script. Required.
    pub entry: Option<String>,

    /// Output bundle path.
    pub output: Option<String>,

    /// Catalog database location.
    pub database: Option<String>,

    /// Glob patterns to pre-analyze.
    pub include: Vec<String>,
    pub include_paths: Vec<String>,

    /// Glob patterns marking files as ignorable.
    pub exclude: Vec<String>,
    pub exclude_patterns: Vec<String>,

    pub autoload: AutoloadConfig,
    pub optimization: OptimizationConfig,

    /// Inject the rethrowing error-handler bootstrap.
    pub error_handler: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AutoloadConfig {
    #[serde(rename = "psr-4")]
    pub psr4: HashMap<String, PathList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    pub remove_comments: bool,
    pub minimize_whitespace: bool,
    /// Enables dead-code pruning of unused symbols in the merger.
    pub enabled: bool,
}

impl PackConfig {
    pub fn load(path: &Path) -> Result<PackConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn entry(&self) -> Result<&str, ConfigError> {
        self.entry
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::MissingEntry)
    }

    pub fn output(&self) -> PathBuf {
        PathBuf::from(self.output.as_deref().unwrap_or("packed.php"))
    }

    pub fn database(&self) -> PathBuf {
        PathBuf::from(self.database.as_deref().unwrap_or("build/packer.db"))
    }

    /// `include` and `include_paths` merged.
    pub fn include_patterns(&self) -> Vec<String> {
        let mut patterns = self.include.clone();
        patterns.extend(self.include_paths.iter().cloned());
        patterns
    }

    /// Configured exclusions, falling back to the defaults.
    pub fn exclude_patterns(&self) -> Vec<String> {
        let mut patterns = self.exclude.clone();
        patterns.extend(self.exclude_patterns.iter().cloned());
        if patterns.is_empty() {
            patterns = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
        }
        patterns
    }
}
