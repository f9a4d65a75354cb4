//! Composer manifest parsing
//!
//! Only the autoload-related sections are consulted: `autoload`,
//! `autoload-dev`, and the per-package autoload entries of
//! `vendor/composer/installed.json`.

use phpack_core::paths::normalize_lexically;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Represents a parsed composer.json file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposerJson {
    #[serde(default)]
    pub autoload: AutoloadSection,

    #[serde(default, rename = "autoload-dev")]
    pub autoload_dev: AutoloadSection,
}

/// Autoload configuration section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutoloadSection {
    #[serde(default, rename = "psr-4")]
    pub psr4: HashMap<String, PathList>,

    #[serde(default, rename = "psr-0")]
    pub psr0: HashMap<String, PathList>,

    #[serde(default)]
    pub classmap: Vec<String>,

    #[serde(default)]
    pub files: Vec<String>,
}

impl AutoloadSection {
    pub fn is_empty(&self) -> bool {
        self.psr4.is_empty() && self.psr0.is_empty() && self.classmap.is_empty() && self.files.is_empty()
    }
}

/// Autoload paths can be a single string or an array of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PathList {
    Single(String),
    Multiple(Vec<String>),
}

impl PathList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            PathList::Single(s) => vec![s.clone()],
            PathList::Multiple(v) => v.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("Failed to read composer manifest: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse composer manifest: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl ComposerJson {
    pub fn load(path: &Path) -> Result<Self, ComposerError> {
        let content = std::fs::read_to_string(path)?;
        let composer: ComposerJson = serde_json::from_str(&content)?;
        Ok(composer)
    }
}

/// One package entry of `vendor/composer/installed.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstalledPackage {
    pub name: String,

    #[serde(default)]
    pub autoload: AutoloadSection,

    /// Composer 2 records the package root relative to `vendor/composer`.
    #[serde(default, rename = "install-path")]
    pub install_path: Option<String>,
}

impl InstalledPackage {
    /// Absolute package root under the given vendor directory.
    pub fn root(&self, vendor_dir: &Path) -> PathBuf {
        match &self.install_path {
            Some(rel) => normalize_lexically(&vendor_dir.join("composer").join(rel)),
            None => vendor_dir.join(&self.name),
        }
    }
}

/// The installed-packages manifest, either the Composer 2 wrapped form
/// (`{"packages": [...]}`) or the bare Composer 1 array.
#[derive(Debug, Clone, Default)]
pub struct InstalledJson {
    pub packages: Vec<InstalledPackage>,
}

impl InstalledJson {
    pub fn load(path: &Path) -> Result<Self, ComposerError> {
        #[derive(Deserialize)]
        struct Wrapped {
            #[serde(default)]
            packages: Vec<InstalledPackage>,
        }

        let content = std::fs::read_to_string(path)?;
        if let Ok(wrapped) = serde_json::from_str::<Wrapped>(&content) {
            return Ok(Self {
                packages: wrapped.packages,
            });
        }
        let packages: Vec<InstalledPackage> = serde_json::from_str(&content)?;
        Ok(Self { packages })
    }
}
