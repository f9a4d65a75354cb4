//! phpack-codegen: assembles the final PHP source
//!
//! `AstMerger` groups the stored statement nodes of the bundled files by
//! namespace, strips now-redundant `require` statements, rewrites name
//! references to fully-qualified form, and extracts the entry script's
//! executable code. `CodeGenerator` turns the merged program into one PHP
//! file and writes it atomically with the executable bit set.

pub mod bundled;
pub mod comments;
pub mod generator;
pub mod merger;

pub use bundled::BundledIndex;
pub use generator::{CodeGenerator, GenerateOptions};
pub use merger::{AstMerger, GenerateError, MergedBundle, VendorBlock};

use phpack_core::Logger;
use phpack_store::{FileRecord, Store};
use std::path::{Path, PathBuf};

/// Run the whole generation pipeline: merge, render, write.
pub fn generate_bundle(
    store: &Store,
    root: &Path,
    entry_path: &str,
    files: &[FileRecord],
    options: &GenerateOptions,
    logger: &Logger,
) -> Result<PathBuf, GenerateError> {
    let merger = AstMerger::new(root, logger.clone());
    let bundle = merger.merge(store, entry_path, files, options)?;

    let generator = CodeGenerator::new(logger.clone());
    let text = generator.render(&bundle, options);
    generator.write(&text, &options.output)?;
    Ok(options.output.clone())
}
