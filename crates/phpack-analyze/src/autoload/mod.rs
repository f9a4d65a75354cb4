//! Autoload rule handling
//!
//! Maps fully-qualified names to candidate files using PSR-4 / PSR-0 /
//! classmap / files rules, plus a last-resort file-system heuristic. Every
//! returned path is verified to textually declare the class in the
//! expected namespace before it is trusted.

pub mod composer;

use composer::{AutoloadSection, ComposerError, ComposerJson, InstalledJson};
use phpack_core::Logger;
use phpack_store::{AutoloadKind, Store, StoreError};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum AutoloadError {
    #[error(transparent)]
    Composer(#[from] ComposerError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
struct LoadedRule {
    kind: AutoloadKind,
    prefix: Option<String>,
    path: PathBuf,
    priority: i64,
}

/// Resolves class names to file paths via the configured autoload rules.
///
/// The classmap lookup table and the files list are built once as rules are
/// added and treated as read-only afterwards.
pub struct AutoloadResolver {
    root: PathBuf,
    rules: Vec<LoadedRule>,
    classmap: HashMap<String, PathBuf>,
    required_files: Vec<PathBuf>,
    logger: Logger,
}

impl AutoloadResolver {
    pub fn new(root: impl Into<PathBuf>, logger: Logger) -> Self {
        Self {
            root: root.into(),
            rules: Vec::new(),
            classmap: HashMap::new(),
            required_files: Vec::new(),
            logger,
        }
    }

    /// Rebuild the in-memory state from rules persisted in the store.
    pub fn load_rules_from_store(&mut self, store: &Store) -> Result<(), AutoloadError> {
        for rule in store.autoload_rules()? {
            self.add_rule_in_memory(rule.kind, rule.prefix.as_deref(), Path::new(&rule.path), rule.priority);
        }
        Ok(())
    }

    /// Register a rule, persisting it and updating the in-memory indexes.
    pub fn add_rule(
        &mut self,
        store: &mut Store,
        kind: AutoloadKind,
        prefix: Option<&str>,
        path: &Path,
        priority: i64,
    ) -> Result<(), AutoloadError> {
        store.insert_autoload_rule(kind, prefix, &path.to_string_lossy(), priority)?;
        self.add_rule_in_memory(kind, prefix, path, priority);
        Ok(())
    }

    fn add_rule_in_memory(
        &mut self,
        kind: AutoloadKind,
        prefix: Option<&str>,
        path: &Path,
        priority: i64,
    ) {
        match kind {
            AutoloadKind::Classmap => self.scan_classmap(path),
            AutoloadKind::Files => self.required_files.push(path.to_path_buf()),
            AutoloadKind::Psr4 | AutoloadKind::Psr0 => {
                self.rules.push(LoadedRule {
                    kind,
                    prefix: prefix.map(|p| p.to_string()),
                    path: path.to_path_buf(),
                    priority,
                });
                // Stable sort keeps insertion order among equal priorities.
                self.rules.sort_by_key(|r| std::cmp::Reverse(r.priority));
            }
        }
    }

    /// Read a composer.json and register its autoload rules. Dev rules get
    /// priority 50, regular rules 100. An installed-packages manifest under
    /// `vendor/composer/installed.json` is applied at each package's root.
    pub fn load_composer_manifest(
        &mut self,
        store: &mut Store,
        manifest_path: &Path,
    ) -> Result<(), AutoloadError> {
        let base = manifest_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let composer = ComposerJson::load(manifest_path)?;
        self.apply_section(store, &composer.autoload, &base, 100)?;
        self.apply_section(store, &composer.autoload_dev, &base, 50)?;

        let installed_path = base.join("vendor/composer/installed.json");
        if installed_path.exists() {
            match InstalledJson::load(&installed_path) {
                Ok(installed) => {
                    let vendor_dir = base.join("vendor");
                    for package in &installed.packages {
                        let package_root = package.root(&vendor_dir);
                        self.apply_section(store, &package.autoload, &package_root, 100)?;
                    }
                    self.logger.debug(format!(
                        "Loaded autoload rules for {} installed packages",
                        installed.packages.len()
                    ));
                }
                Err(err) => {
                    self.logger
                        .warn(format!("Skipping unreadable {}: {}", installed_path.display(), err));
                }
            }
        }

        Ok(())
    }

    fn apply_section(
        &mut self,
        store: &mut Store,
        section: &AutoloadSection,
        base: &Path,
        priority: i64,
    ) -> Result<(), AutoloadError> {
        // Sort prefixes so rule ids are deterministic across runs.
        let mut psr4: Vec<_> = section.psr4.iter().collect();
        psr4.sort_by(|a, b| a.0.cmp(b.0));
        for (prefix, paths) in psr4 {
            for path in paths.to_vec() {
                self.add_rule(store, AutoloadKind::Psr4, Some(prefix.as_str()), &base.join(path), priority)?;
            }
        }

        let mut psr0: Vec<_> = section.psr0.iter().collect();
        psr0.sort_by(|a, b| a.0.cmp(b.0));
        for (prefix, paths) in psr0 {
            for path in paths.to_vec() {
                self.add_rule(store, AutoloadKind::Psr0, Some(prefix.as_str()), &base.join(path), priority)?;
            }
        }

        for path in &section.classmap {
            self.add_rule(store, AutoloadKind::Classmap, None, &base.join(path), priority)?;
        }
        for path in &section.files {
            self.add_rule(store, AutoloadKind::Files, None, &base.join(path), priority)?;
        }
        Ok(())
    }

    /// Files from `files` rules; these are always bundled.
    pub fn required_files(&self) -> &[PathBuf] {
        &self.required_files
    }

    /// Map an FQN to a verified file path using the registered rules.
    pub fn resolve_class(&self, fqn: &str) -> Option<PathBuf> {
        let fqn = fqn.trim_start_matches('\\');

        for rule in &self.rules {
            let candidate = match rule.kind {
                AutoloadKind::Psr4 => psr4_candidate(rule, fqn),
                AutoloadKind::Psr0 => psr0_candidate(rule, fqn),
                _ => None,
            };
            if let Some(path) = candidate {
                if verify_declaration(&path, fqn) {
                    return Some(path);
                }
            }
        }

        if let Some(path) = self.classmap.get(fqn) {
            if verify_declaration(path, fqn) {
                return Some(path.clone());
            }
        }

        None
    }

    /// Last-resort lookup: scan vendor-flagged catalog files by basename,
    /// then probe conventional locations under the project root.
    pub fn resolve_unknown(&self, store: &Store, fqn: &str) -> Option<PathBuf> {
        let fqn = fqn.trim_start_matches('\\');
        let (namespace, short) = split_fqn(fqn);

        if let Ok(vendor_files) = store.vendor_files() {
            let wanted = format!("{}.php", short);
            for file in vendor_files {
                let basename = file.path.rsplit('/').next().unwrap_or(&file.path);
                if basename == wanted && declares_in_content(&file.content, short, namespace) {
                    return Some(self.root.join(&file.path));
                }
            }
        }

        let ns_path = namespace.replace('\\', "/");
        let mut candidates = vec![
            self.root.join(format!("{}.php", short)),
            self.root.join("src").join(format!("{}.php", short)),
        ];
        if !ns_path.is_empty() {
            candidates.push(self.root.join(&ns_path).join(format!("{}.php", short)));
            candidates.push(self.root.join("src").join(&ns_path).join(format!("{}.php", short)));
            let lower = ns_path.to_lowercase();
            if lower != ns_path {
                candidates.push(self.root.join(&lower).join(format!("{}.php", short)));
                candidates.push(self.root.join("src").join(&lower).join(format!("{}.php", short)));
            }
        }

        candidates
            .into_iter()
            .find(|candidate| verify_declaration(candidate, fqn))
    }

    /// Build the classmap index for one rule path, first declaration wins.
    fn scan_classmap(&mut self, path: &Path) {
        let mut scanned = 0usize;
        for entry in WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let file = entry.path();
            if !file.is_file() || file.extension().map(|e| e != "php").unwrap_or(true) {
                continue;
            }
            let Ok(content) = fs::read_to_string(file) else {
                continue;
            };
            scanned += 1;
            let namespace = extract_declared_namespace(&content);
            for name in extract_declared_classes(&content) {
                let fqn = match &namespace {
                    Some(ns) => format!("{}\\{}", ns, name),
                    None => name,
                };
                self.classmap.entry(fqn).or_insert_with(|| file.to_path_buf());
            }
        }
        self.logger.debug(format!(
            "Classmap scan of {} covered {} files, {} classes known",
            path.display(),
            scanned,
            self.classmap.len()
        ));
    }
}

fn split_fqn(fqn: &str) -> (&str, &str) {
    match fqn.rfind('\\') {
        Some(pos) => (&fqn[..pos], &fqn[pos + 1..]),
        None => ("", fqn),
    }
}

fn psr4_candidate(rule: &LoadedRule, fqn: &str) -> Option<PathBuf> {
    let prefix = rule.prefix.as_deref()?;
    let prefix = prefix.trim_start_matches('\\');
    let rest = fqn.strip_prefix(prefix)?;
    let rest = rest.trim_start_matches('\\');
    Some(rule.path.join(format!("{}.php", rest.replace('\\', "/"))))
}

fn psr0_candidate(rule: &LoadedRule, fqn: &str) -> Option<PathBuf> {
    let prefix = rule.prefix.as_deref()?;
    let prefix = prefix.trim_start_matches('\\');
    let rest = fqn.strip_prefix(prefix)?;
    let rest = rest.trim_start_matches('\\');
    let (namespace, short) = split_fqn(rest);
    // PSR-0 additionally expands underscores in the class-name portion.
    let short = short.replace('_', "/");
    let rel = if namespace.is_empty() {
        format!("{}.php", short)
    } else {
        format!("{}/{}.php", namespace.replace('\\', "/"), short)
    };
    Some(rule.path.join(rel))
}

/// A candidate is only accepted when the file exists and textually declares
/// the class in the expected namespace.
fn verify_declaration(path: &Path, fqn: &str) -> bool {
    let Ok(content) = fs::read_to_string(path) else {
        return false;
    };
    let (namespace, short) = split_fqn(fqn);
    declares_in_content(&content, short, namespace)
}

pub(crate) fn declares_in_content(content: &str, short: &str, namespace: &str) -> bool {
    let decl = Regex::new(&format!(
        r"(?m)(?:abstract\s+|final\s+)?(?:class|interface|trait|enum)\s+{}\b",
        regex::escape(short)
    ))
    .expect("declaration pattern");
    if !decl.is_match(content) {
        return false;
    }
    if namespace.is_empty() {
        return true;
    }
    let ns = Regex::new(&format!(
        r"(?m)namespace\s+{}\s*[;{{]",
        regex::escape(namespace)
    ))
    .expect("namespace pattern");
    ns.is_match(content)
}

pub(crate) fn extract_declared_namespace(content: &str) -> Option<String> {
    let re = Regex::new(r"(?m)^\s*namespace\s+([A-Za-z_][A-Za-z0-9_\\]*)\s*[;{]").expect("namespace pattern");
    re.captures(content)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

pub(crate) fn extract_declared_classes(content: &str) -> Vec<String> {
    let re = Regex::new(
        r"(?m)^\s*(?:abstract\s+|final\s+)?(?:class|interface|trait|enum)\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("class pattern");
    re.captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
