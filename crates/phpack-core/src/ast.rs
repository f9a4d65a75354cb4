//! Persisted statement-level AST model
//!
//! Each analyzed file is lowered to a flat sequence of top-level statement
//! nodes. Constructs the bundler reasons about (declarations, imports,
//! includes) carry their own tag; everything else is an opaque `Statement`
//! holding the verbatim source slice so the generator can re-emit it.

use serde::{Deserialize, Serialize};

/// Context string marking an include whose target cannot be a constant.
pub const DYNAMIC_INCLUDE: &str = "dynamic";

/// Byte and line range of a node in its origin file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpan {
    pub start: u32,
    pub end: u32,
    pub start_line: u32,
    pub end_line: u32,
}

impl NodeSpan {
    pub fn new(start: u32, end: u32, start_line: u32, end_line: u32) -> Self {
        Self {
            start,
            end,
            start_line,
            end_line,
        }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Tag of a persisted statement node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Per-file root; its children are the top-level statements.
    Program,
    Class,
    Interface,
    Trait,
    Function,
    /// `use` / group-`use` import statement.
    Use,
    Declare,
    /// Standalone `require`/`include` expression statement.
    Include,
    InlineHtml,
    /// Any other statement, carried verbatim.
    Statement,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Program => "program",
            NodeKind::Class => "class",
            NodeKind::Interface => "interface",
            NodeKind::Trait => "trait",
            NodeKind::Function => "function",
            NodeKind::Use => "use",
            NodeKind::Declare => "declare",
            NodeKind::Include => "include",
            NodeKind::InlineHtml => "inline_html",
            NodeKind::Statement => "statement",
        }
    }

    pub fn parse(s: &str) -> Option<NodeKind> {
        Some(match s {
            "program" => NodeKind::Program,
            "class" => NodeKind::Class,
            "interface" => NodeKind::Interface,
            "trait" => NodeKind::Trait,
            "function" => NodeKind::Function,
            "use" => NodeKind::Use,
            "declare" => NodeKind::Declare,
            "include" => NodeKind::Include,
            "inline_html" => NodeKind::InlineHtml,
            "statement" => NodeKind::Statement,
            _ => return None,
        })
    }

    /// True for nodes that define a symbol.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::Class | NodeKind::Interface | NodeKind::Trait | NodeKind::Function
        )
    }
}

/// The include-family construct used at a dependency site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeKind {
    Require,
    RequireOnce,
    Include,
    IncludeOnce,
}

impl IncludeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncludeKind::Require => "require",
            IncludeKind::RequireOnce => "require_once",
            IncludeKind::Include => "include",
            IncludeKind::IncludeOnce => "include_once",
        }
    }

    pub fn parse(s: &str) -> Option<IncludeKind> {
        Some(match s {
            "require" => IncludeKind::Require,
            "require_once" => IncludeKind::RequireOnce,
            "include" => IncludeKind::Include,
            "include_once" => IncludeKind::IncludeOnce,
            _ => return None,
        })
    }
}

/// A class-name reference inside a statement, with its resolved FQN.
///
/// Offsets are relative to the owning statement's `text` so the generator
/// can rewrite the name after `use` statements are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    pub start: u32,
    pub end: u32,
    pub fqn: String,
}

/// An include-family site inside a statement.
///
/// `context` is the literal path, the textual `__DIR__ . '...'` form, or
/// [`DYNAMIC_INCLUDE`]. Only `standalone` sites (the include is its own
/// expression statement) may be stripped by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeRef {
    pub start: u32,
    pub end: u32,
    pub kind: IncludeKind,
    pub context: String,
    pub conditional: bool,
    pub standalone: bool,
}

impl IncludeRef {
    pub fn is_dynamic(&self) -> bool {
        self.context == DYNAMIC_INCLUDE || self.context.is_empty()
    }
}

/// One lowered top-level statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementNode {
    pub kind: NodeKind,
    /// Verbatim source slice of the statement.
    pub text: String,
    pub span: NodeSpan,
    /// FQN for definition-bearing nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqn: Option<String>,
    /// Enclosing namespace; `None` is the global namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_refs: Vec<NameRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<IncludeRef>,
}

impl StatementNode {
    pub fn new(kind: NodeKind, text: impl Into<String>, span: NodeSpan) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            fqn: None,
            namespace: None,
            name_refs: Vec::new(),
            includes: Vec::new(),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.kind.is_declaration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_roundtrip() {
        for kind in [
            NodeKind::Program,
            NodeKind::Class,
            NodeKind::Interface,
            NodeKind::Trait,
            NodeKind::Function,
            NodeKind::Use,
            NodeKind::Declare,
            NodeKind::Include,
            NodeKind::InlineHtml,
            NodeKind::Statement,
        ] {
            assert_eq!(NodeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NodeKind::parse("bogus"), None);
    }

    #[test]
    fn test_include_kind_roundtrip() {
        for kind in [
            IncludeKind::Require,
            IncludeKind::RequireOnce,
            IncludeKind::Include,
            IncludeKind::IncludeOnce,
        ] {
            assert_eq!(IncludeKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_statement_node_serde_roundtrip() {
        let mut node = StatementNode::new(
            NodeKind::Class,
            "class Calc {}",
            NodeSpan::new(6, 19, 1, 1),
        );
        node.fqn = Some("App\\Calc".to_string());
        node.namespace = Some("App".to_string());
        node.name_refs.push(NameRef {
            start: 0,
            end: 4,
            fqn: "App\\Base".to_string(),
        });

        let json = serde_json::to_string(&node).unwrap();
        let back: StatementNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_dynamic_include() {
        let site = IncludeRef {
            start: 0,
            end: 10,
            kind: IncludeKind::Require,
            context: DYNAMIC_INCLUDE.to_string(),
            conditional: false,
            standalone: true,
        };
        assert!(site.is_dynamic());
    }
}
