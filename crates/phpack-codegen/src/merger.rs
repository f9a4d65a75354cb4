//! AST merging
//!
//! Takes the bundled files in load order and produces the merged program:
//! statements grouped by namespace, bundled `require` statements removed,
//! name references rewritten to `\FQN` form, and the entry file's
//! executable statements set aside for the tail of the bundle.

use crate::bundled::BundledIndex;
use crate::generator::GenerateOptions;
use phpack_core::edit::{apply_edits, Edit, EditError};
use phpack_core::ast::{NodeKind, StatementNode};
use phpack_core::paths::normalize_lexically;
use phpack_core::Logger;
use phpack_store::{FileRecord, Store, StoreError};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Nothing to bundle: the file list is empty")]
    EmptyBundle,

    #[error("Entry file {0} is not part of the bundle")]
    EntryNotBundled(String),

    #[error("Failed to write bundle: {0}")]
    Write(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Raw content of a `skip_ast` file, inlined ahead of the merged program.
#[derive(Debug, Clone)]
pub struct VendorBlock {
    pub path: String,
    pub content: String,
}

/// The merged program, ready for rendering.
#[derive(Debug, Default)]
pub struct MergedBundle {
    pub vendor_blocks: Vec<VendorBlock>,
    /// Statement texts grouped by namespace, first-seen order; `None` is
    /// the global namespace.
    pub namespaces: Vec<(Option<String>, Vec<String>)>,
    /// Executable statements extracted from the entry file.
    pub entry_code: Vec<String>,
}

impl MergedBundle {
    pub fn global_statements(&self) -> Option<&[String]> {
        self.namespaces
            .iter()
            .find(|(ns, _)| ns.is_none())
            .map(|(_, stmts)| stmts.as_slice())
    }

    pub fn named_namespaces(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.namespaces
            .iter()
            .filter_map(|(ns, stmts)| ns.as_deref().map(|n| (n, stmts.as_slice())))
    }
}

pub struct AstMerger {
    root: PathBuf,
    logger: Logger,
}

impl AstMerger {
    pub fn new(root: impl Into<PathBuf>, logger: Logger) -> Self {
        Self {
            root: root.into(),
            logger,
        }
    }

    /// Merge the files (already in load order) into one program.
    pub fn merge(
        &self,
        store: &Store,
        entry_path: &str,
        files: &[FileRecord],
        options: &GenerateOptions,
    ) -> Result<MergedBundle, GenerateError> {
        if files.is_empty() {
            return Err(GenerateError::EmptyBundle);
        }

        let entry_id = find_entry(files, entry_path)
            .ok_or_else(|| GenerateError::EntryNotBundled(entry_path.to_string()))?;

        let index = BundledIndex::new(&self.root, files);
        let mut bundle = MergedBundle::default();
        let mut pruned = 0usize;

        for file in files {
            if file.skip_ast {
                bundle.vendor_blocks.push(VendorBlock {
                    path: file.path.clone(),
                    content: strip_php_tags(&file.content),
                });
                continue;
            }

            let Some(nodes) = store.load_ast(file.id)? else {
                self.logger
                    .warn(format!("No stored AST for {}; file left out of the merge", file.path));
                continue;
            };

            let source_dir = self.source_dir(&file.path);
            let is_entry = file.id == entry_id;

            for node in &nodes {
                match node.kind {
                    NodeKind::Program | NodeKind::Use | NodeKind::Declare | NodeKind::InlineHtml => {}
                    kind if kind.is_declaration() => {
                        if options.dead_code && !is_entry && prunable(store, node)? {
                            pruned += 1;
                            self.logger.debug(format!(
                                "Pruning unreferenced symbol {}",
                                node.fqn.as_deref().unwrap_or("?")
                            ));
                            continue;
                        }
                        if let Some(text) = self.render_statement(node, &source_dir, &index)? {
                            push_grouped(&mut bundle.namespaces, node.namespace.clone(), text);
                        }
                    }
                    NodeKind::Include | NodeKind::Statement => {
                        if let Some(text) = self.render_statement(node, &source_dir, &index)? {
                            if is_entry {
                                bundle.entry_code.push(text);
                            } else {
                                push_grouped(&mut bundle.namespaces, node.namespace.clone(), text);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        if pruned > 0 {
            self.logger
                .info(format!("Dead-code pruning removed {} unreferenced symbols", pruned));
        }

        Ok(bundle)
    }

    /// Apply the require-strip and FQN-rewrite edits to one statement.
    /// Returns `None` when nothing of the statement survives.
    fn render_statement(
        &self,
        node: &StatementNode,
        source_dir: &Path,
        index: &BundledIndex,
    ) -> Result<Option<String>, GenerateError> {
        let mut edits: Vec<Edit> = Vec::new();
        let mut stripped: Vec<(usize, usize)> = Vec::new();

        for inc in &node.includes {
            if inc.standalone && index.matches_context(&inc.context, source_dir) {
                let range = (inc.start as usize, inc.end as usize);
                stripped.push(range);
                edits.push(Edit::delete(range.0, range.1));
            }
        }

        for name_ref in &node.name_refs {
            let (start, end) = (name_ref.start as usize, name_ref.end as usize);
            if stripped.iter().any(|(s, e)| start >= *s && end <= *e) {
                continue;
            }
            let current = &node.text[start..end];
            let replacement = format!("\\{}", name_ref.fqn);
            if current != replacement {
                edits.push(Edit::new(start, end, replacement));
            }
        }

        let rendered = apply_edits(&node.text, &edits)?;
        if rendered.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(rendered.trim_end().to_string()))
    }

    fn source_dir(&self, rel: &str) -> PathBuf {
        let path = Path::new(rel);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            normalize_lexically(&self.root.join(path))
        };
        absolute
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.root.clone())
    }
}

/// Only class-like declarations with zero recorded references are pruned;
/// functions are called by bare name and cannot be tracked this way.
fn prunable(store: &Store, node: &StatementNode) -> Result<bool, StoreError> {
    if !matches!(node.kind, NodeKind::Class | NodeKind::Interface | NodeKind::Trait) {
        return Ok(false);
    }
    let Some(fqn) = &node.fqn else {
        return Ok(false);
    };
    Ok(store.count_symbol_references(fqn)? == 0)
}

/// Locate the entry among the bundled files by exact path, suffix, or
/// basename.
fn find_entry(files: &[FileRecord], entry_path: &str) -> Option<i64> {
    if let Some(file) = files.iter().find(|f| f.is_entry) {
        return Some(file.id);
    }
    let entry_base = basename(entry_path);
    files
        .iter()
        .find(|f| {
            f.path == entry_path || f.path.ends_with(entry_path) || basename(&f.path) == entry_base
        })
        .map(|f| f.id)
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn push_grouped(namespaces: &mut Vec<(Option<String>, Vec<String>)>, ns: Option<String>, text: String) {
    if let Some(position) = namespaces.iter().position(|(existing, _)| *existing == ns) {
        namespaces[position].1.push(text);
    } else {
        namespaces.push((ns, vec![text]));
    }
}

/// Drop PHP open/close tags from raw vendor content.
pub fn strip_php_tags(content: &str) -> String {
    let mut text = content.trim();
    if let Some(rest) = text.strip_prefix("<?php") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("<?") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("?>") {
        text = rest;
    }
    text.trim().to_string()
}
