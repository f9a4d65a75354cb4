//! Fixed-point dependency resolution
//!
//! Drives analysis until every discoverable file is in the catalog and no
//! further dependencies can be bound. Unresolved leftovers are preserved
//! with `is_resolved=0`; only a missing or unparseable entry file is fatal.

use crate::autoload::AutoloadResolver;
use crate::builtins::{is_builtin_class, is_third_party};
use crate::file_analyzer::{vendor_record_declares, AnalysisOutcome, FileAnalyzer};
use phpack_core::ast::{NodeKind, DYNAMIC_INCLUDE};
use phpack_core::parser::ParseError;
use phpack_core::paths::evaluate_include_context;
use phpack_core::Logger;
use phpack_store::{
    AnalysisStatus, DependencyKind, DependencyRecord, NewDependency, Store, StoreError, SymbolKind,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unresolved-dependency passes before giving up.
const MAX_PASSES: usize = 5;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Entry file not found: {0}")]
    EntryNotFound(PathBuf),

    #[error(transparent)]
    EntryParse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters reported after `resolve_all`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolutionSummary {
    pub passes: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

/// Iterates unanalyzed files and unresolved dependencies to a fixed point.
pub struct DependencyResolver<'a> {
    analyzer: &'a FileAnalyzer,
    autoload: &'a AutoloadResolver,
    logger: Logger,
    /// Paths currently being walked; re-entry is a circular-analysis warning.
    processing: HashSet<String>,
    warned_dynamic: HashSet<i64>,
    warned_unresolved: HashSet<(i64, String)>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(analyzer: &'a FileAnalyzer, autoload: &'a AutoloadResolver, logger: Logger) -> Self {
        Self {
            analyzer,
            autoload,
            logger,
            processing: HashSet::new(),
            warned_dynamic: HashSet::new(),
            warned_unresolved: HashSet::new(),
        }
    }

    pub fn resolve_all(
        &mut self,
        store: &mut Store,
        entry: &Path,
    ) -> Result<ResolutionSummary, ResolveError> {
        let entry_id = match self.analyzer.analyze_entry(store, entry)? {
            AnalysisOutcome::Analyzed(id) | AnalysisOutcome::SkippedVendor(id) => id,
            AnalysisOutcome::NotFound(path) => return Err(ResolveError::EntryNotFound(path)),
            AnalysisOutcome::ParseFailed { error, .. } => return Err(ResolveError::EntryParse(error)),
        };

        self.queue_required_files(store, entry_id)?;
        self.drain_pending(store)?;

        let mut summary = ResolutionSummary::default();
        for pass in 0..MAX_PASSES {
            summary.passes = pass + 1;
            let unresolved = store.get_unresolved_dependencies()?;
            if unresolved.is_empty() {
                break;
            }

            let mut progressed = 0usize;
            for dep in &unresolved {
                if self.bind(store, dep)? {
                    progressed += 1;
                }
            }
            self.drain_pending(store)?;

            summary.resolved += progressed;
            if progressed == 0 {
                break;
            }
        }

        let remaining = store.get_unresolved_dependencies()?;
        summary.unresolved = remaining.len();
        if !remaining.is_empty() {
            self.logger.warn(format!(
                "{} dependencies remain unresolved after {} passes",
                remaining.len(),
                summary.passes
            ));
        }
        Ok(summary)
    }

    /// Composer `files` entries are always loaded, so the bundle always
    /// carries them: analyze each and attach it to the entry file.
    fn queue_required_files(&mut self, store: &mut Store, entry_id: i64) -> Result<(), ResolveError> {
        for path in self.autoload.required_files().to_vec() {
            let Some(target_id) = self.analyze_path(store, &path)? else {
                self.logger
                    .warn(format!("Autoload files entry missing: {}", path.display()));
                continue;
            };
            if target_id == entry_id {
                continue;
            }
            let dep_id = store.insert_dependency(NewDependency::path(
                entry_id,
                DependencyKind::Require,
                self.analyzer.relative_path(&path),
                0,
            ))?;
            store.resolve_dependency(dep_id, target_id)?;
        }
        Ok(())
    }

    fn drain_pending(&mut self, store: &mut Store) -> Result<(), ResolveError> {
        while let Some(file) = store.get_next_pending_file()? {
            self.analyze_path(store, Path::new(&file.path))?;
            // Whatever happened, the record must leave the pending state.
            if let Some(record) = store.get_file_by_path(&file.path)? {
                if record.status == AnalysisStatus::Pending {
                    store.mark_analysis_failed(record.id)?;
                }
            }
        }
        Ok(())
    }

    fn analyze_path(&mut self, store: &mut Store, path: &Path) -> Result<Option<i64>, ResolveError> {
        let rel = self.analyzer.relative_path(path);
        if !self.processing.insert(rel.clone()) {
            self.logger
                .warn(format!("Circular analysis detected at {}", rel));
            return Ok(None);
        }
        let outcome = self.analyzer.analyze(store, path);
        self.processing.remove(&rel);

        Ok(outcome?.file_id())
    }

    fn bind(&mut self, store: &mut Store, dep: &DependencyRecord) -> Result<bool, ResolveError> {
        if dep.kind.is_path_kind() {
            self.bind_path(store, dep)
        } else {
            self.bind_symbol(store, dep)
        }
    }

    fn bind_path(&mut self, store: &mut Store, dep: &DependencyRecord) -> Result<bool, ResolveError> {
        let Some(source) = store.get_file_by_id(dep.source_file_id)? else {
            return Ok(false);
        };
        let context = dep.context.clone().unwrap_or_default();

        if context.is_empty() || context == DYNAMIC_INCLUDE {
            if self.warned_dynamic.insert(dep.id) {
                self.logger.warn(format!(
                    "Dynamic include in {}:{} cannot be bundled",
                    source.path, dep.line
                ));
            }
            return Ok(false);
        }

        let source_abs = self.absolute(&source.path);
        let source_dir = source_abs
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.analyzer.root().to_path_buf());

        let Some(literal) = evaluate_include_context(&context, &source_dir) else {
            if self.warned_dynamic.insert(dep.id) {
                self.logger.warn(format!(
                    "Dynamic include in {}:{} cannot be bundled",
                    source.path, dep.line
                ));
            }
            return Ok(false);
        };

        let mut candidates = Vec::new();
        if literal.is_absolute() {
            candidates.push(literal.clone());
        } else {
            candidates.push(source_dir.join(&literal));
            candidates.push(self.analyzer.root().join(&literal));
            if let Ok(cwd) = std::env::current_dir() {
                candidates.push(cwd.join(&literal));
            }
            candidates.push(source_abs.join(&literal));
        }

        for candidate in candidates {
            if !candidate.is_file() {
                continue;
            }
            if let Some(target_id) = self.analyze_path(store, &candidate)? {
                store.resolve_dependency(dep.id, target_id)?;
                return Ok(true);
            }
        }

        if self
            .warned_unresolved
            .insert((dep.source_file_id, context.clone()))
        {
            self.logger.warn(format!(
                "Cannot resolve include {:?} from {}:{}",
                context, source.path, dep.line
            ));
        }
        Ok(false)
    }

    fn bind_symbol(&mut self, store: &mut Store, dep: &DependencyRecord) -> Result<bool, ResolveError> {
        let Some(fqn) = dep.symbol_name.clone().filter(|f| !f.is_empty()) else {
            return Ok(false);
        };

        // 1. Symbol already cataloged.
        if let Some(file) = store.find_file_by_symbol(&fqn)? {
            store.resolve_dependency(dep.id, file.id)?;
            return Ok(true);
        }

        // 2. A stored definition-bearing AST node.
        let node_file = store
            .find_ast_nodes_by_fqn(&fqn)?
            .into_iter()
            .find(|node| {
                NodeKind::parse(&node.kind)
                    .map(|k| k.is_declaration())
                    .unwrap_or(false)
            })
            .map(|node| node.file_id);
        if let Some(file_id) = node_file {
            store.resolve_dependency(dep.id, file_id)?;
            return Ok(true);
        }

        // 3. Autoload rules, then the unknown-class heuristics.
        let located = self
            .autoload
            .resolve_class(&fqn)
            .or_else(|| self.autoload.resolve_unknown(store, &fqn));
        if let Some(path) = located {
            return self.bind_symbol_to_path(store, dep, &fqn, &path);
        }

        if is_builtin_class(&fqn) || is_third_party(&fqn) {
            return Ok(false);
        }

        if self
            .warned_unresolved
            .insert((dep.source_file_id, fqn.clone()))
        {
            self.logger.warn(format!("Class not found: {}", fqn));
        }
        Ok(false)
    }

    fn bind_symbol_to_path(
        &mut self,
        store: &mut Store,
        dep: &DependencyRecord,
        fqn: &str,
        path: &Path,
    ) -> Result<bool, ResolveError> {
        let rel = self.analyzer.relative_path(path);
        // Vendor paths take the skip_ast flow even though the default
        // exclude patterns cover vendor/.
        if self.analyzer.is_excluded(&rel) && !self.analyzer.is_vendor_path(&rel) {
            return Ok(false);
        }

        let target_id = match store.get_file_by_path(&rel)? {
            Some(file) => file.id,
            None => match self.analyze_path(store, path)? {
                Some(id) => id,
                None => return Ok(false),
            },
        };

        // Vendor targets get a synthesized symbol so future lookups
        // short-circuit at the catalog.
        if let Some(target) = store.get_file_by_id(target_id)? {
            if target.is_vendor {
                let (namespace, short) = split_fqn(fqn);
                if vendor_record_declares(&target.content, short, namespace) {
                    let ns = if namespace.is_empty() { None } else { Some(namespace) };
                    if let Err(StoreError::DuplicateSymbol { .. }) =
                        store.insert_symbol(target_id, SymbolKind::Class, short, fqn, ns, None)
                    {
                        // Another file got there first; the binding still holds.
                    }
                }
            }
        }

        store.resolve_dependency(dep.id, target_id)?;
        Ok(true)
    }

    fn absolute(&self, rel: &str) -> PathBuf {
        let path = Path::new(rel);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.analyzer.root().join(path)
        }
    }
}

fn split_fqn(fqn: &str) -> (&str, &str) {
    match fqn.rfind('\\') {
        Some(pos) => (&fqn[..pos], &fqn[pos + 1..]),
        None => ("", fqn),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phpack_core::logger::MemorySink;
    use phpack_core::LogLevel;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn run_resolver(temp: &TempDir, entry: &str) -> (Store, ResolutionSummary, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::new(sink.clone());
        let mut store = Store::in_memory().unwrap();
        let analyzer = FileAnalyzer::new(temp.path(), logger.clone());
        let mut autoload = AutoloadResolver::new(temp.path(), logger.clone());
        let manifest = temp.path().join("composer.json");
        if manifest.exists() {
            autoload
                .load_composer_manifest(&mut store, &manifest)
                .unwrap();
        }

        let mut resolver = DependencyResolver::new(&analyzer, &autoload, logger);
        let summary = resolver
            .resolve_all(&mut store, Path::new(entry))
            .unwrap();
        (store, summary, sink)
    }

    #[test]
    fn test_resolves_psr4_class_dependency() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "composer.json", r#"{"autoload": {"psr-4": {"App\\": "src/"}}}"#);
        write(temp.path(), "main.php", "<?php\nuse App\\Calc;\necho (new Calc())->add(2, 3);\n");
        write(
            temp.path(),
            "src/Calc.php",
            "<?php\nnamespace App;\nclass Calc\n{\n    public function add($a, $b)\n    {\n        return $a + $b;\n    }\n}\n",
        );

        let (store, summary, _) = run_resolver(&temp, "main.php");
        assert_eq!(summary.unresolved, 0);

        let calc = store.get_file_by_path("src/Calc.php").unwrap().unwrap();
        assert_eq!(calc.status, AnalysisStatus::Completed);

        let entry = store.entry_file().unwrap().unwrap();
        let required = store.all_required_files(entry.id).unwrap();
        let paths: Vec<&str> = required.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/Calc.php", "main.php"]);
    }

    #[test]
    fn test_resolves_require_chain() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "main.php", "<?php\nrequire __DIR__ . '/lib/a.php';\necho run();\n");
        write(temp.path(), "lib/a.php", "<?php\nrequire_once __DIR__ . '/b.php';\nfunction run() { return helper(); }\n");
        write(temp.path(), "lib/b.php", "<?php\nfunction helper() { return 5; }\n");

        let (store, summary, _) = run_resolver(&temp, "main.php");
        assert_eq!(summary.unresolved, 0);

        let entry = store.entry_file().unwrap().unwrap();
        let paths: Vec<String> = store
            .all_required_files(entry.id)
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(paths, vec!["lib/b.php", "lib/a.php", "main.php"]);
    }

    #[test]
    fn test_circular_requires_tolerated() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.php", "<?php\nrequire_once 'b.php';\nfunction fa() {}\n");
        write(temp.path(), "b.php", "<?php\nrequire_once 'a.php';\nfunction fb() {}\n");

        let (store, summary, _) = run_resolver(&temp, "a.php");
        assert_eq!(summary.unresolved, 0);

        let entry = store.entry_file().unwrap().unwrap();
        let files = store.all_required_files(entry.id).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_unknown_class_warns_once() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "main.php", "<?php\nnew Unknown\\X();\nnew Unknown\\X();\n");

        let (store, summary, sink) = run_resolver(&temp, "main.php");
        assert_eq!(summary.unresolved, 1);
        assert_eq!(sink.count(LogLevel::Warn, "Class not found: Unknown\\X"), 1);

        let unresolved = store.get_unresolved_dependencies().unwrap();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].symbol_name.as_deref(), Some("Unknown\\X"));
    }

    #[test]
    fn test_builtin_classes_stay_silent() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "main.php",
            "<?php\ntry {\n    throw new \\RuntimeException('x');\n} catch (\\RuntimeException $e) {\n}\nnew \\Psr\\Log\\NullLogger();\n",
        );

        let (_, _, sink) = run_resolver(&temp, "main.php");
        assert_eq!(sink.count(LogLevel::Warn, "Class not found"), 0);
    }

    #[test]
    fn test_dynamic_include_warns_once() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "main.php", "<?php\n$name = 'x';\nrequire $name . '.php';\n");

        let (_, summary, sink) = run_resolver(&temp, "main.php");
        assert_eq!(summary.unresolved, 1);
        assert_eq!(sink.count(LogLevel::Warn, "Dynamic include"), 1);
    }

    #[test]
    fn test_vendor_target_synthesizes_symbol() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "composer.json",
            r#"{"autoload": {"psr-4": {"App\\": "src/"}}}"#,
        );
        write(
            temp.path(),
            "vendor/composer/installed.json",
            r#"{"packages": [{"name": "acme/widgets", "autoload": {"psr-4": {"Acme\\": "src"}}}]}"#,
        );
        write(
            temp.path(),
            "vendor/acme/widgets/src/Widget.php",
            "<?php\nnamespace Acme;\nclass Widget {}\n",
        );
        write(temp.path(), "main.php", "<?php\nnew \\Acme\\Widget();\n");

        let (store, summary, _) = run_resolver(&temp, "main.php");
        assert_eq!(summary.unresolved, 0);

        let vendor = store
            .find_file_by_symbol("Acme\\Widget")
            .unwrap()
            .expect("vendor symbol synthesized");
        assert!(vendor.is_vendor);
        assert!(vendor.skip_ast);
    }

    #[test]
    fn test_missing_entry_is_fatal() {
        let temp = TempDir::new().unwrap();
        let logger = Logger::null();
        let mut store = Store::in_memory().unwrap();
        let analyzer = FileAnalyzer::new(temp.path(), logger.clone());
        let autoload = AutoloadResolver::new(temp.path(), logger.clone());
        let mut resolver = DependencyResolver::new(&analyzer, &autoload, logger);

        let err = resolver
            .resolve_all(&mut store, Path::new("missing.php"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::EntryNotFound(_)));
    }

    #[test]
    fn test_conditional_includes_both_bundled() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "main.php",
            "<?php\nif (PHP_SAPI === \"cli\") {\n    require \"cli.php\";\n} else {\n    require \"web.php\";\n}\n",
        );
        write(temp.path(), "cli.php", "<?php\nfunction run_cli() {}\n");
        write(temp.path(), "web.php", "<?php\nfunction run_web() {}\n");

        let (store, summary, _) = run_resolver(&temp, "main.php");
        assert_eq!(summary.unresolved, 0);

        let entry = store.entry_file().unwrap().unwrap();
        let paths: Vec<String> = store
            .all_required_files(entry.id)
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert!(paths.contains(&"cli.php".to_string()));
        assert!(paths.contains(&"web.php".to_string()));

        let deps = store.dependencies_of(entry.id).unwrap();
        assert!(deps.iter().all(|d| d.is_conditional));
    }
}
