//! Per-file analysis
//!
//! Turns one file into catalog entries: the File record, its symbols,
//! dependencies, and the lowered AST. Analysis failures are contained per
//! file; the outcome is a sum type the caller inspects instead of an
//! exception that aborts the run.

use crate::autoload::{declares_in_content, extract_declared_classes, extract_declared_namespace};
use crate::collector::{CollectedFile, FileCollector};
use bumpalo::Bump;
use phpack_core::parser::{MagoParser, ParseError, Parser};
use phpack_core::paths::normalize_lexically;
use phpack_core::Logger;
use phpack_store::{FileKind, FileUpsert, NewDependency, Store, StoreError, SymbolKind};
use std::fs;
use std::path::{Path, PathBuf};

/// Result of analyzing one file.
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// Fully analyzed; symbols, dependencies, and AST are stored.
    Analyzed(i64),
    /// Vendor or config-flagged file recorded with `skip_ast`; symbols were
    /// scanned textually, no AST or dependencies stored.
    SkippedVendor(i64),
    /// The path does not exist on disk.
    NotFound(PathBuf),
    /// Source is not valid PHP; the file record is marked failed.
    ParseFailed { file_id: i64, error: ParseError },
}

impl AnalysisOutcome {
    pub fn file_id(&self) -> Option<i64> {
        match self {
            AnalysisOutcome::Analyzed(id) | AnalysisOutcome::SkippedVendor(id) => Some(*id),
            AnalysisOutcome::ParseFailed { file_id, .. } => Some(*file_id),
            AnalysisOutcome::NotFound(_) => None,
        }
    }
}

/// Analyzes single files against the store.
pub struct FileAnalyzer {
    root: PathBuf,
    parser: MagoParser,
    exclude_patterns: Vec<glob::Pattern>,
    vendor_patterns: Vec<glob::Pattern>,
    logger: Logger,
}

impl FileAnalyzer {
    pub fn new(root: impl Into<PathBuf>, logger: Logger) -> Self {
        Self {
            root: normalize_lexically(&root.into()),
            parser: MagoParser::new(),
            exclude_patterns: Vec::new(),
            vendor_patterns: Vec::new(),
            logger,
        }
    }

    /// Glob patterns marking files as ignorable.
    pub fn with_excludes(mut self, patterns: &[String]) -> Self {
        self.exclude_patterns = compile_patterns(patterns, &self.logger);
        self
    }

    /// Glob patterns flagging additional files as vendor.
    pub fn with_vendor_paths(mut self, patterns: &[String]) -> Self {
        self.vendor_patterns = compile_patterns(patterns, &self.logger);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical project-relative form of a path. Paths outside the root
    /// are kept verbatim as absolute paths.
    pub fn relative_path(&self, path: &Path) -> String {
        let absolute = if path.is_absolute() {
            normalize_lexically(path)
        } else {
            normalize_lexically(&self.root.join(path))
        };
        match absolute.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => absolute.to_string_lossy().replace('\\', "/"),
        }
    }

    /// True when the path matches an exclude pattern.
    pub fn is_excluded(&self, rel: &str) -> bool {
        let basename = rel.rsplit('/').next().unwrap_or(rel);
        self.exclude_patterns
            .iter()
            .any(|p| p.matches(rel) || p.matches(basename))
    }

    /// True for paths handled by the vendor flow (`skip_ast` record with a
    /// textual symbol scan).
    pub fn is_vendor_path(&self, rel: &str) -> bool {
        rel.starts_with("vendor/")
            || rel.contains("/vendor/")
            || self.vendor_patterns.iter().any(|p| p.matches(rel))
    }

    pub fn analyze(&self, store: &mut Store, path: &Path) -> Result<AnalysisOutcome, StoreError> {
        self.analyze_inner(store, path, false)
    }

    /// Analyze the entry script, flagging it in the catalog.
    pub fn analyze_entry(
        &self,
        store: &mut Store,
        path: &Path,
    ) -> Result<AnalysisOutcome, StoreError> {
        self.analyze_inner(store, path, true)
    }

    fn analyze_inner(
        &self,
        store: &mut Store,
        path: &Path,
        is_entry: bool,
    ) -> Result<AnalysisOutcome, StoreError> {
        let rel = self.relative_path(path);
        let absolute = self.absolute_path(&rel);

        let content = match fs::read_to_string(&absolute) {
            Ok(content) => content,
            Err(_) => {
                // A stale record must not stay pending forever.
                if let Some(record) = store.get_file_by_path(&rel)? {
                    store.mark_analysis_failed(record.id)?;
                }
                return Ok(AnalysisOutcome::NotFound(absolute));
            }
        };

        if self.is_vendor_path(&rel) {
            return self.record_vendor_file(store, &rel, &content, is_entry);
        }

        // Unchanged content with completed analysis needs no new pass.
        if let Some(existing) = store.get_file_by_path(&rel)? {
            if existing.hash == phpack_store::content_hash(&content)
                && existing.status == phpack_store::AnalysisStatus::Completed
            {
                let mut upsert = FileUpsert::new(rel.clone(), content);
                if is_entry {
                    upsert = upsert.entry(true);
                }
                let id = store.upsert_file(upsert)?;
                return Ok(AnalysisOutcome::Analyzed(id));
            }
        }

        let arena = Bump::new();
        let program = match self.parser.parse(&arena, &rel, &content) {
            Ok(program) => program,
            Err(error) => {
                let mut upsert = FileUpsert::new(rel.clone(), content);
                if is_entry {
                    upsert = upsert.entry(true);
                }
                let file_id = store.upsert_file(upsert)?;
                // Artifacts of an earlier successful pass are stale now.
                store.delete_file_artifacts(file_id)?;
                store.mark_analysis_failed(file_id)?;
                self.logger.warn(error.to_string());
                return Ok(AnalysisOutcome::ParseFailed { file_id, error });
            }
        };

        let collected = FileCollector::new(&content).collect(program);
        let (kind, class_name) = derive_file_kind(&collected);
        let namespace = collected.namespaces.first().cloned();

        let mut upsert = FileUpsert::new(rel.clone(), content);
        if is_entry {
            upsert = upsert.entry(true);
        }
        let file_id = store.upsert_file(upsert)?;

        // Reanalysis replaces all prior artifacts.
        store.delete_file_artifacts(file_id)?;
        store.update_file_metadata(file_id, kind, class_name.as_deref(), namespace.as_deref())?;

        for symbol in &collected.symbols {
            let result = store.insert_symbol(
                file_id,
                symbol.kind,
                &symbol.short_name,
                &symbol.fqn,
                symbol.namespace.as_deref(),
                symbol.visibility.as_deref(),
            );
            if let Err(StoreError::DuplicateSymbol { fqn, .. }) = &result {
                self.logger.warn(format!(
                    "Duplicate symbol {} in {}:{}; first definition wins",
                    fqn, rel, symbol.line
                ));
                continue;
            }
            result?;
        }

        for dep in &collected.dependencies {
            store.insert_dependency(NewDependency {
                source_file_id: file_id,
                kind: dep.kind,
                symbol_name: dep.symbol_name.clone(),
                line: dep.line,
                is_conditional: dep.conditional,
                context: dep.context.clone(),
            })?;
        }

        store.store_ast(file_id, &collected.nodes)?;
        store.mark_analyzed(file_id)?;

        self.logger.debug(format!(
            "Analyzed {}: {} symbols, {} dependencies",
            rel,
            collected.symbols.len(),
            collected.dependencies.len()
        ));
        Ok(AnalysisOutcome::Analyzed(file_id))
    }

    /// Vendor files keep their raw content and a textual symbol scan; no
    /// AST and no dependencies are recorded.
    fn record_vendor_file(
        &self,
        store: &mut Store,
        rel: &str,
        content: &str,
        is_entry: bool,
    ) -> Result<AnalysisOutcome, StoreError> {
        let namespace = extract_declared_namespace(content);
        let declared = extract_declared_classes(content);

        let mut upsert = FileUpsert::new(rel, content).vendor(true);
        if is_entry {
            upsert = upsert.entry(true);
        }
        let file_id = store.upsert_file(upsert)?;

        for name in &declared {
            let fqn = match &namespace {
                Some(ns) => format!("{}\\{}", ns, name),
                None => name.clone(),
            };
            if let Err(StoreError::DuplicateSymbol { fqn, .. }) = store.insert_symbol(
                file_id,
                SymbolKind::Class,
                name,
                &fqn,
                namespace.as_deref(),
                None,
            ) {
                self.logger.debug(format!(
                    "Vendor symbol {} already known; keeping first definition",
                    fqn
                ));
            }
        }

        store.mark_analyzed(file_id)?;
        Ok(AnalysisOutcome::SkippedVendor(file_id))
    }

    fn absolute_path(&self, rel: &str) -> PathBuf {
        let path = Path::new(rel);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// True when a vendor-catalog record declares the wanted class.
pub fn vendor_record_declares(content: &str, short: &str, namespace: &str) -> bool {
    declares_in_content(content, short, namespace)
}

fn compile_patterns(patterns: &[String], logger: &Logger) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|raw| match glob::Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                logger.warn(format!("Ignoring invalid glob pattern {:?}: {}", raw, err));
                None
            }
        })
        .collect()
}

fn derive_file_kind(collected: &CollectedFile) -> (FileKind, Option<String>) {
    if collected.symbols.is_empty() {
        return (FileKind::Script, None);
    }
    if collected.symbols.len() == 1 && !collected.has_executable_code {
        let symbol = &collected.symbols[0];
        let kind = match symbol.kind {
            SymbolKind::Class => FileKind::Class,
            SymbolKind::Interface => FileKind::Interface,
            SymbolKind::Trait => FileKind::Trait,
            SymbolKind::Function => return (FileKind::Script, None),
        };
        return (kind, Some(symbol.fqn.clone()));
    }
    (FileKind::Mixed, None)
}
