//! Index of bundled files for the require-strip pass
//!
//! The same file can be required through many syntactic forms
//! (`"foo.php"`, `"./foo.php"`, `__DIR__ . "/foo.php"`). Matching uses the
//! canonical path first, then basename and suffix; paths are never
//! case-folded.

use phpack_core::paths::{evaluate_include_context, normalize_lexically};
use phpack_store::FileRecord;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub struct BundledIndex {
    canonical: HashSet<PathBuf>,
    basenames: HashSet<String>,
    relative: Vec<String>,
}

impl BundledIndex {
    pub fn new(root: &Path, files: &[FileRecord]) -> Self {
        let mut canonical = HashSet::new();
        let mut basenames = HashSet::new();
        let mut relative = Vec::new();

        for file in files {
            let path = Path::new(&file.path);
            let absolute = if path.is_absolute() {
                normalize_lexically(path)
            } else {
                normalize_lexically(&root.join(path))
            };
            canonical.insert(absolute);
            if let Some(name) = path.file_name() {
                basenames.insert(name.to_string_lossy().to_string());
            }
            relative.push(file.path.clone());
        }

        Self {
            canonical,
            basenames,
            relative,
        }
    }

    /// Does an include context refer to a bundled file (or the Composer
    /// autoloader, which the bundle replaces outright)?
    pub fn matches_context(&self, context: &str, source_dir: &Path) -> bool {
        let Some(literal) = evaluate_include_context(context, source_dir) else {
            return false;
        };
        let literal_str = literal.to_string_lossy();

        if literal_str.ends_with("vendor/autoload.php") {
            return true;
        }

        let absolute = if literal.is_absolute() {
            literal.clone()
        } else {
            normalize_lexically(&source_dir.join(&literal))
        };
        if self.canonical.contains(&absolute) {
            return true;
        }

        if let Some(name) = literal.file_name() {
            if self.basenames.contains(&name.to_string_lossy().to_string()) {
                return true;
            }
        }

        self.relative
            .iter()
            .any(|rel| rel.ends_with(literal_str.as_ref()) || literal_str.ends_with(rel.as_str()))
    }
}
