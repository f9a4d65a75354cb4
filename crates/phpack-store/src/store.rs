//! SQLite-backed catalog

use crate::model::*;
use phpack_core::ast::{NodeSpan, StatementNode};
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database directory error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AST payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Duplicate symbol {fqn}: already defined in file {existing_file} as {existing_kind}")]
    DuplicateSymbol {
        fqn: String,
        existing_file: i64,
        existing_kind: String,
    },

    #[error("Unknown file id {0}")]
    UnknownFile(i64),
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id          INTEGER PRIMARY KEY,
    path        TEXT NOT NULL UNIQUE,
    content     TEXT NOT NULL,
    hash        TEXT NOT NULL,
    kind        TEXT NOT NULL DEFAULT 'mixed',
    class_name  TEXT,
    namespace   TEXT,
    is_entry    INTEGER NOT NULL DEFAULT 0,
    is_vendor   INTEGER NOT NULL DEFAULT 0,
    skip_ast    INTEGER NOT NULL DEFAULT 0,
    status      TEXT NOT NULL DEFAULT 'pending',
    ast_root    INTEGER
);

CREATE TABLE IF NOT EXISTS symbols (
    id          INTEGER PRIMARY KEY,
    file_id     INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    kind        TEXT NOT NULL,
    short_name  TEXT NOT NULL,
    fqn         TEXT NOT NULL UNIQUE,
    namespace   TEXT,
    visibility  TEXT
);
CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id);

CREATE TABLE IF NOT EXISTS dependencies (
    id              INTEGER PRIMARY KEY,
    source_file_id  INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    target_file_id  INTEGER,
    kind            TEXT NOT NULL,
    symbol_name     TEXT,
    line            INTEGER NOT NULL DEFAULT 0,
    is_conditional  INTEGER NOT NULL DEFAULT 0,
    is_resolved     INTEGER NOT NULL DEFAULT 0,
    context         TEXT
);
CREATE INDEX IF NOT EXISTS idx_dependencies_source ON dependencies(source_file_id);
CREATE INDEX IF NOT EXISTS idx_dependencies_unresolved ON dependencies(is_resolved);

CREATE TABLE IF NOT EXISTS ast_nodes (
    id            INTEGER PRIMARY KEY,
    file_id       INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    parent_id     INTEGER,
    position      INTEGER NOT NULL DEFAULT 0,
    kind          TEXT NOT NULL,
    fqn           TEXT,
    start_offset  INTEGER NOT NULL DEFAULT 0,
    end_offset    INTEGER NOT NULL DEFAULT 0,
    start_line    INTEGER NOT NULL DEFAULT 0,
    end_line      INTEGER NOT NULL DEFAULT 0,
    payload       TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_ast_nodes_file ON ast_nodes(file_id);
CREATE INDEX IF NOT EXISTS idx_ast_nodes_fqn ON ast_nodes(fqn);

CREATE TABLE IF NOT EXISTS autoload_rules (
    id        INTEGER PRIMARY KEY,
    kind      TEXT NOT NULL,
    prefix    TEXT,
    path      TEXT NOT NULL,
    priority  INTEGER NOT NULL DEFAULT 100
);
"#;

/// SHA-256 of file content, lowercase hex.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Single source of truth for all inter-component data.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a catalog at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// In-memory catalog backing tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // ---- files ----------------------------------------------------------

    /// Insert or update a file record; returns its id.
    ///
    /// `is_entry=Some(true)` clears the flag on every other file. A `None`
    /// field leaves the stored value untouched, which is what makes the
    /// entry flag sticky.
    pub fn upsert_file(&mut self, upsert: FileUpsert) -> Result<i64, StoreError> {
        let hash = content_hash(&upsert.content);
        let tx = self.conn.transaction()?;

        let existing: Option<(i64, String, bool, bool, bool)> = tx
            .query_row(
                "SELECT id, hash, is_entry, is_vendor, skip_ast FROM files WHERE path = ?1",
                params![upsert.path],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()?;

        let id = match existing {
            Some((id, old_hash, was_entry, was_vendor, old_skip)) => {
                let is_entry = upsert.is_entry.unwrap_or(was_entry);
                let is_vendor = upsert.is_vendor.unwrap_or(was_vendor);
                let skip_ast = match upsert.skip_ast {
                    Some(v) => v,
                    None if is_vendor && !was_vendor => true,
                    None => old_skip,
                };
                if is_entry {
                    tx.execute("UPDATE files SET is_entry = 0 WHERE id <> ?1", params![id])?;
                }
                let status = if hash == old_hash { None } else { Some("pending") };
                tx.execute(
                    "UPDATE files SET content = ?2, hash = ?3,
                            kind = COALESCE(?4, kind),
                            class_name = COALESCE(?5, class_name),
                            namespace = COALESCE(?6, namespace),
                            is_entry = ?7, is_vendor = ?8, skip_ast = ?9,
                            status = COALESCE(?10, status)
                     WHERE id = ?1",
                    params![
                        id,
                        upsert.content,
                        hash,
                        upsert.kind.map(|k| k.as_str()),
                        upsert.class_name,
                        upsert.namespace,
                        is_entry,
                        is_vendor,
                        skip_ast,
                        status,
                    ],
                )?;
                id
            }
            None => {
                let is_vendor = upsert
                    .is_vendor
                    .unwrap_or_else(|| path_looks_vendored(&upsert.path));
                let skip_ast = upsert.skip_ast.unwrap_or(is_vendor);
                let is_entry = upsert.is_entry.unwrap_or(false);
                if is_entry {
                    tx.execute("UPDATE files SET is_entry = 0", [])?;
                }
                tx.execute(
                    "INSERT INTO files (path, content, hash, kind, class_name, namespace,
                                        is_entry, is_vendor, skip_ast, status)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending')",
                    params![
                        upsert.path,
                        upsert.content,
                        hash,
                        upsert.kind.unwrap_or(FileKind::Mixed).as_str(),
                        upsert.class_name,
                        upsert.namespace,
                        is_entry,
                        is_vendor,
                        skip_ast,
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;
        Ok(id)
    }

    pub fn get_file_by_path(&self, path: &str) -> Result<Option<FileRecord>, StoreError> {
        let file = self
            .conn
            .query_row(
                &format!("{} WHERE path = ?1", SELECT_FILE),
                params![path],
                row_to_file,
            )
            .optional()?;
        Ok(file)
    }

    pub fn get_file_by_id(&self, id: i64) -> Result<Option<FileRecord>, StoreError> {
        let file = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_FILE),
                params![id],
                row_to_file,
            )
            .optional()?;
        Ok(file)
    }

    /// The file currently flagged as entry, if any.
    pub fn entry_file(&self) -> Result<Option<FileRecord>, StoreError> {
        let file = self
            .conn
            .query_row(
                &format!("{} WHERE is_entry = 1", SELECT_FILE),
                [],
                row_to_file,
            )
            .optional()?;
        Ok(file)
    }

    pub fn vendor_files(&self) -> Result<Vec<FileRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE is_vendor = 1 ORDER BY id", SELECT_FILE))?;
        let files = stmt
            .query_map([], row_to_file)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(files)
    }

    pub fn get_next_pending_file(&self) -> Result<Option<FileRecord>, StoreError> {
        let file = self
            .conn
            .query_row(
                &format!(
                    "{} WHERE status = 'pending' AND skip_ast = 0 ORDER BY id LIMIT 1",
                    SELECT_FILE
                ),
                [],
                row_to_file,
            )
            .optional()?;
        Ok(file)
    }

    pub fn mark_analyzed(&mut self, file_id: i64) -> Result<(), StoreError> {
        self.set_status(file_id, AnalysisStatus::Completed)
    }

    pub fn mark_analysis_failed(&mut self, file_id: i64) -> Result<(), StoreError> {
        self.set_status(file_id, AnalysisStatus::Failed)
    }

    fn set_status(&mut self, file_id: i64, status: AnalysisStatus) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE files SET status = ?2 WHERE id = ?1",
            params![file_id, status.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownFile(file_id));
        }
        Ok(())
    }

    /// Update metadata derived during analysis.
    pub fn update_file_metadata(
        &mut self,
        file_id: i64,
        kind: FileKind,
        class_name: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE files SET kind = ?2, class_name = ?3, namespace = ?4 WHERE id = ?1",
            params![file_id, kind.as_str(), class_name, namespace],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownFile(file_id));
        }
        Ok(())
    }

    /// Remove symbols, dependencies, and AST of a file prior to reanalysis.
    pub fn delete_file_artifacts(&mut self, file_id: i64) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM symbols WHERE file_id = ?1", params![file_id])?;
        tx.execute(
            "DELETE FROM dependencies WHERE source_file_id = ?1",
            params![file_id],
        )?;
        tx.execute("DELETE FROM ast_nodes WHERE file_id = ?1", params![file_id])?;
        tx.execute(
            "UPDATE files SET ast_root = NULL WHERE id = ?1",
            params![file_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ---- symbols --------------------------------------------------------

    /// Record a symbol definition.
    ///
    /// The same FQN re-declared by a different file with a different kind is
    /// a `DuplicateSymbol` error and the first definition wins. Identical
    /// keys replace silently.
    pub fn insert_symbol(
        &mut self,
        file_id: i64,
        kind: SymbolKind,
        short_name: &str,
        fqn: &str,
        namespace: Option<&str>,
        visibility: Option<&str>,
    ) -> Result<i64, StoreError> {
        let fqn = fqn.trim_start_matches('\\');

        let existing: Option<(i64, i64, String)> = self
            .conn
            .query_row(
                "SELECT id, file_id, kind FROM symbols WHERE fqn = ?1",
                params![fqn],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match existing {
            Some((id, existing_file, existing_kind)) => {
                if existing_file != file_id && existing_kind != kind.as_str() {
                    return Err(StoreError::DuplicateSymbol {
                        fqn: fqn.to_string(),
                        existing_file,
                        existing_kind,
                    });
                }
                if existing_file != file_id {
                    // Same kind in another file: first definition wins.
                    return Ok(id);
                }
                self.conn.execute(
                    "UPDATE symbols SET kind = ?2, short_name = ?3, namespace = ?4, visibility = ?5
                     WHERE id = ?1",
                    params![id, kind.as_str(), short_name, namespace, visibility],
                )?;
                Ok(id)
            }
            None => {
                self.conn.execute(
                    "INSERT INTO symbols (file_id, kind, short_name, fqn, namespace, visibility)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![file_id, kind.as_str(), short_name, fqn, namespace, visibility],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }

    pub fn find_file_by_symbol(&self, fqn: &str) -> Result<Option<FileRecord>, StoreError> {
        let fqn = fqn.trim_start_matches('\\');
        let file_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT file_id FROM symbols WHERE fqn = ?1",
                params![fqn],
                |row| row.get(0),
            )
            .optional()?;
        match file_id {
            Some(id) => self.get_file_by_id(id),
            None => Ok(None),
        }
    }

    pub fn symbols_of(&self, file_id: i64) -> Result<Vec<SymbolRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, file_id, kind, short_name, fqn, namespace, visibility
             FROM symbols WHERE file_id = ?1 ORDER BY id",
        )?;
        let symbols = stmt
            .query_map(params![file_id], row_to_symbol)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(symbols)
    }

    /// Number of resolved symbol-kind dependencies pointing at an FQN.
    pub fn count_symbol_references(&self, fqn: &str) -> Result<i64, StoreError> {
        let fqn = fqn.trim_start_matches('\\');
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM dependencies
             WHERE symbol_name = ?1
               AND kind IN ('extends', 'implements', 'use_trait', 'use_class')",
            params![fqn],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ---- dependencies ---------------------------------------------------

    pub fn insert_dependency(&mut self, dep: NewDependency) -> Result<i64, StoreError> {
        let symbol_name = dep
            .symbol_name
            .as_deref()
            .map(|s| s.trim_start_matches('\\').to_string());
        self.conn.execute(
            "INSERT INTO dependencies
                (source_file_id, kind, symbol_name, line, is_conditional, is_resolved, context)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                dep.source_file_id,
                dep.kind.as_str(),
                symbol_name,
                dep.line,
                dep.is_conditional,
                dep.context,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_unresolved_dependencies(&self) -> Result<Vec<DependencyRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE is_resolved = 0 ORDER BY id",
            SELECT_DEPENDENCY
        ))?;
        let deps = stmt
            .query_map([], row_to_dependency)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(deps)
    }

    pub fn dependencies_of(&self, source_file_id: i64) -> Result<Vec<DependencyRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE source_file_id = ?1 ORDER BY id",
            SELECT_DEPENDENCY
        ))?;
        let deps = stmt
            .query_map(params![source_file_id], row_to_dependency)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(deps)
    }

    pub fn resolve_dependency(&mut self, dep_id: i64, target_file_id: i64) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE dependencies SET target_file_id = ?2, is_resolved = 1 WHERE id = ?1",
            params![dep_id, target_file_id],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownFile(dep_id));
        }
        Ok(())
    }

    /// Transitive closure of resolved dependencies from the entry file,
    /// deepest-first. Recursion depth is capped at 100 to defeat
    /// pathological cycles.
    pub fn all_required_files(&self, entry_id: i64) -> Result<Vec<FileRecord>, StoreError> {
        if self.get_file_by_id(entry_id)?.is_none() {
            return Err(StoreError::UnknownFile(entry_id));
        }
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.collect_required(entry_id, 0, &mut visited, &mut order)?;

        let mut files = Vec::with_capacity(order.len());
        for id in order {
            if let Some(file) = self.get_file_by_id(id)? {
                files.push(file);
            }
        }
        Ok(files)
    }

    fn collect_required(
        &self,
        file_id: i64,
        depth: u32,
        visited: &mut HashSet<i64>,
        order: &mut Vec<i64>,
    ) -> Result<(), StoreError> {
        if depth > 100 || !visited.insert(file_id) {
            return Ok(());
        }

        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT target_file_id FROM dependencies
             WHERE source_file_id = ?1 AND is_resolved = 1 AND target_file_id IS NOT NULL
             ORDER BY target_file_id",
        )?;
        let targets: Vec<i64> = stmt
            .query_map(params![file_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        for target in targets {
            self.collect_required(target, depth + 1, visited, order)?;
        }
        order.push(file_id);
        Ok(())
    }

    // ---- AST ------------------------------------------------------------

    /// Replace the stored AST of a file atomically.
    pub fn store_ast(&mut self, file_id: i64, nodes: &[StatementNode]) -> Result<(), StoreError> {
        let payloads: Vec<String> = nodes
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<_, _>>()?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM ast_nodes WHERE file_id = ?1", params![file_id])?;

        let span_end = nodes.last().map(|n| n.span.end).unwrap_or(0);
        let line_end = nodes.last().map(|n| n.span.end_line).unwrap_or(0);
        tx.execute(
            "INSERT INTO ast_nodes (file_id, parent_id, position, kind, start_offset, end_offset,
                                    start_line, end_line, payload)
             VALUES (?1, NULL, 0, 'program', 0, ?2, 1, ?3, '')",
            params![file_id, span_end, line_end],
        )?;
        let root_id = tx.last_insert_rowid();

        for (position, (node, payload)) in nodes.iter().zip(payloads.iter()).enumerate() {
            tx.execute(
                "INSERT INTO ast_nodes (file_id, parent_id, position, kind, fqn, start_offset,
                                        end_offset, start_line, end_line, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    file_id,
                    root_id,
                    position as i64,
                    node.kind.as_str(),
                    node.fqn,
                    node.span.start,
                    node.span.end,
                    node.span.start_line,
                    node.span.end_line,
                    payload,
                ],
            )?;
        }

        tx.execute(
            "UPDATE files SET ast_root = ?2 WHERE id = ?1",
            params![file_id, root_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Load the stored statement nodes of a file, in source order.
    pub fn load_ast(&self, file_id: i64) -> Result<Option<Vec<StatementNode>>, StoreError> {
        let root: Option<i64> = self
            .conn
            .query_row(
                "SELECT ast_root FROM files WHERE id = ?1",
                params![file_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        let Some(root_id) = root else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT payload FROM ast_nodes WHERE parent_id = ?1 ORDER BY position",
        )?;
        let payloads: Vec<String> = stmt
            .query_map(params![root_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let nodes = payloads
            .iter()
            .map(|p| serde_json::from_str(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(nodes))
    }

    /// Definition-bearing AST nodes recorded under an FQN.
    pub fn find_ast_nodes_by_fqn(&self, fqn: &str) -> Result<Vec<AstNodeRecord>, StoreError> {
        let fqn = fqn.trim_start_matches('\\');
        let mut stmt = self.conn.prepare(
            "SELECT id, file_id, parent_id, position, kind, fqn,
                    start_offset, end_offset, start_line, end_line, payload
             FROM ast_nodes WHERE fqn = ?1 ORDER BY id",
        )?;
        let nodes = stmt
            .query_map(params![fqn], row_to_ast_node)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    // ---- autoload rules -------------------------------------------------

    pub fn insert_autoload_rule(
        &mut self,
        kind: AutoloadKind,
        prefix: Option<&str>,
        path: &str,
        priority: i64,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO autoload_rules (kind, prefix, path, priority) VALUES (?1, ?2, ?3, ?4)",
            params![kind.as_str(), prefix, path, priority],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Autoload rules are loaded once per run; a persisted catalog drops
    /// the previous run's rules first.
    pub fn clear_autoload_rules(&mut self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM autoload_rules", [])?;
        Ok(())
    }

    /// Rules in priority-descending order.
    pub fn autoload_rules(&self) -> Result<Vec<AutoloadRuleRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, prefix, path, priority FROM autoload_rules
             ORDER BY priority DESC, id ASC",
        )?;
        let rules = stmt
            .query_map([], |row| {
                let kind_str: String = row.get(1)?;
                Ok(AutoloadRuleRecord {
                    id: row.get(0)?,
                    kind: AutoloadKind::parse(&kind_str).unwrap_or(AutoloadKind::Classmap),
                    prefix: row.get(2)?,
                    path: row.get(3)?,
                    priority: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }
}

fn path_looks_vendored(path: &str) -> bool {
    path.starts_with("vendor/") || path.contains("/vendor/")
}

const SELECT_FILE: &str = "SELECT id, path, content, hash, kind, class_name, namespace,
                                  is_entry, is_vendor, skip_ast, status, ast_root
                           FROM files";

const SELECT_DEPENDENCY: &str = "SELECT id, source_file_id, target_file_id, kind, symbol_name,
                                        line, is_conditional, is_resolved, context
                                 FROM dependencies";

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let kind_str: String = row.get(4)?;
    let status_str: String = row.get(10)?;
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        content: row.get(2)?,
        hash: row.get(3)?,
        kind: FileKind::parse(&kind_str),
        class_name: row.get(5)?,
        namespace: row.get(6)?,
        is_entry: row.get(7)?,
        is_vendor: row.get(8)?,
        skip_ast: row.get(9)?,
        status: AnalysisStatus::parse(&status_str),
        ast_root: row.get(11)?,
    })
}

fn row_to_symbol(row: &Row<'_>) -> rusqlite::Result<SymbolRecord> {
    let kind_str: String = row.get(2)?;
    Ok(SymbolRecord {
        id: row.get(0)?,
        file_id: row.get(1)?,
        kind: SymbolKind::parse(&kind_str).unwrap_or(SymbolKind::Class),
        short_name: row.get(3)?,
        fqn: row.get(4)?,
        namespace: row.get(5)?,
        visibility: row.get(6)?,
    })
}

fn row_to_dependency(row: &Row<'_>) -> rusqlite::Result<DependencyRecord> {
    let kind_str: String = row.get(3)?;
    Ok(DependencyRecord {
        id: row.get(0)?,
        source_file_id: row.get(1)?,
        target_file_id: row.get(2)?,
        kind: DependencyKind::parse(&kind_str).unwrap_or(DependencyKind::UseClass),
        symbol_name: row.get(4)?,
        line: row.get(5)?,
        is_conditional: row.get(6)?,
        is_resolved: row.get(7)?,
        context: row.get(8)?,
    })
}

fn row_to_ast_node(row: &Row<'_>) -> rusqlite::Result<AstNodeRecord> {
    Ok(AstNodeRecord {
        id: row.get(0)?,
        file_id: row.get(1)?,
        parent_id: row.get(2)?,
        position: row.get(3)?,
        kind: row.get(4)?,
        fqn: row.get(5)?,
        span: NodeSpan::new(row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?),
        payload: row.get(10)?,
    })
}
