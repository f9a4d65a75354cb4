//! Catalog record types

use phpack_core::ast::NodeSpan;

/// What a file contributes to the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Executable top-level code, no single defining class.
    Script,
    Class,
    Interface,
    Trait,
    /// Declarations mixed with executable code.
    Mixed,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Script => "script",
            FileKind::Class => "class",
            FileKind::Interface => "interface",
            FileKind::Trait => "trait",
            FileKind::Mixed => "mixed",
        }
    }

    pub fn parse(s: &str) -> FileKind {
        match s {
            "script" => FileKind::Script,
            "class" => FileKind::Class,
            "interface" => FileKind::Interface,
            "trait" => FileKind::Trait,
            _ => FileKind::Mixed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Pending,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> AnalysisStatus {
        match s {
            "completed" => AnalysisStatus::Completed,
            "failed" => AnalysisStatus::Failed,
            _ => AnalysisStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Interface,
    Trait,
    Function,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Trait => "trait",
            SymbolKind::Function => "function",
        }
    }

    pub fn parse(s: &str) -> Option<SymbolKind> {
        Some(match s {
            "class" => SymbolKind::Class,
            "interface" => SymbolKind::Interface,
            "trait" => SymbolKind::Trait,
            "function" => SymbolKind::Function,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Require,
    RequireOnce,
    Include,
    IncludeOnce,
    Extends,
    Implements,
    UseTrait,
    UseClass,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Require => "require",
            DependencyKind::RequireOnce => "require_once",
            DependencyKind::Include => "include",
            DependencyKind::IncludeOnce => "include_once",
            DependencyKind::Extends => "extends",
            DependencyKind::Implements => "implements",
            DependencyKind::UseTrait => "use_trait",
            DependencyKind::UseClass => "use_class",
        }
    }

    pub fn parse(s: &str) -> Option<DependencyKind> {
        Some(match s {
            "require" => DependencyKind::Require,
            "require_once" => DependencyKind::RequireOnce,
            "include" => DependencyKind::Include,
            "include_once" => DependencyKind::IncludeOnce,
            "extends" => DependencyKind::Extends,
            "implements" => DependencyKind::Implements,
            "use_trait" => DependencyKind::UseTrait,
            "use_class" => DependencyKind::UseClass,
            _ => return None,
        })
    }

    /// True for `require`/`include`-family dependencies resolved by path.
    pub fn is_path_kind(&self) -> bool {
        matches!(
            self,
            DependencyKind::Require
                | DependencyKind::RequireOnce
                | DependencyKind::Include
                | DependencyKind::IncludeOnce
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoloadKind {
    Psr4,
    Psr0,
    Classmap,
    Files,
}

impl AutoloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoloadKind::Psr4 => "psr4",
            AutoloadKind::Psr0 => "psr0",
            AutoloadKind::Classmap => "classmap",
            AutoloadKind::Files => "files",
        }
    }

    pub fn parse(s: &str) -> Option<AutoloadKind> {
        Some(match s {
            "psr4" => AutoloadKind::Psr4,
            "psr0" => AutoloadKind::Psr0,
            "classmap" => AutoloadKind::Classmap,
            "files" => AutoloadKind::Files,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: i64,
    /// Canonical project-relative path.
    pub path: String,
    pub content: String,
    /// SHA-256 of content, lowercase hex.
    pub hash: String,
    pub kind: FileKind,
    pub class_name: Option<String>,
    pub namespace: Option<String>,
    pub is_entry: bool,
    pub is_vendor: bool,
    pub skip_ast: bool,
    pub status: AnalysisStatus,
    pub ast_root: Option<i64>,
}

/// Fields accepted by `Store::upsert_file`. `None` leaves an existing
/// record's value untouched.
#[derive(Debug, Clone, Default)]
pub struct FileUpsert {
    pub path: String,
    pub content: String,
    pub kind: Option<FileKind>,
    pub class_name: Option<String>,
    pub namespace: Option<String>,
    pub is_entry: Option<bool>,
    pub is_vendor: Option<bool>,
    pub skip_ast: Option<bool>,
}

impl FileUpsert {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn entry(mut self, is_entry: bool) -> Self {
        self.is_entry = Some(is_entry);
        self
    }

    pub fn vendor(mut self, is_vendor: bool) -> Self {
        self.is_vendor = Some(is_vendor);
        self
    }

    pub fn skip_ast(mut self, skip: bool) -> Self {
        self.skip_ast = Some(skip);
        self
    }

    pub fn kind(mut self, kind: FileKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SymbolRecord {
    pub id: i64,
    pub file_id: i64,
    pub kind: SymbolKind,
    pub short_name: String,
    /// Fully-qualified name, leading backslash stripped.
    pub fqn: String,
    pub namespace: Option<String>,
    pub visibility: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DependencyRecord {
    pub id: i64,
    pub source_file_id: i64,
    pub target_file_id: Option<i64>,
    pub kind: DependencyKind,
    pub symbol_name: Option<String>,
    pub line: u32,
    pub is_conditional: bool,
    pub is_resolved: bool,
    pub context: Option<String>,
}

/// Fields for `Store::insert_dependency`.
#[derive(Debug, Clone)]
pub struct NewDependency {
    pub source_file_id: i64,
    pub kind: DependencyKind,
    pub symbol_name: Option<String>,
    pub line: u32,
    pub is_conditional: bool,
    pub context: Option<String>,
}

impl NewDependency {
    pub fn symbol(source_file_id: i64, kind: DependencyKind, fqn: impl Into<String>, line: u32) -> Self {
        Self {
            source_file_id,
            kind,
            symbol_name: Some(fqn.into()),
            line,
            is_conditional: false,
            context: None,
        }
    }

    pub fn path(
        source_file_id: i64,
        kind: DependencyKind,
        context: impl Into<String>,
        line: u32,
    ) -> Self {
        Self {
            source_file_id,
            kind,
            symbol_name: None,
            line,
            is_conditional: false,
            context: Some(context.into()),
        }
    }

    pub fn conditional(mut self, conditional: bool) -> Self {
        self.is_conditional = conditional;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AstNodeRecord {
    pub id: i64,
    pub file_id: i64,
    pub parent_id: Option<i64>,
    pub position: u32,
    pub kind: String,
    pub fqn: Option<String>,
    pub span: NodeSpan,
    /// serde-JSON `StatementNode` payload; empty for the program root.
    pub payload: String,
}

#[derive(Debug, Clone)]
pub struct AutoloadRuleRecord {
    pub id: i64,
    pub kind: AutoloadKind,
    pub prefix: Option<String>,
    pub path: String,
    pub priority: i64,
}
