//! Per-file AST walk
//!
//! `FileCollector` lowers one parsed file into catalog material: the
//! defined symbols, the outgoing dependencies, and the statement nodes the
//! merger re-emits later. Name references are resolved against the file's
//! `use` alias table as they are recorded, so the stored nodes survive the
//! loss of the import statements.

use mago_span::{HasSpan, Span};
use mago_syntax::ast::*;
use phpack_core::ast::{
    IncludeKind, IncludeRef, NameRef, NodeKind, NodeSpan, StatementNode, DYNAMIC_INCLUDE,
};
use phpack_core::parser::{line_at_offset, span_text};
use phpack_core::visitor::{Visitor, WalkContext};
use phpack_store::{DependencyKind, SymbolKind};
use std::collections::{HashMap, HashSet};

/// A symbol definition found in a file.
#[derive(Debug, Clone)]
pub struct CollectedSymbol {
    pub kind: SymbolKind,
    pub short_name: String,
    pub fqn: String,
    pub namespace: Option<String>,
    pub visibility: Option<String>,
    pub line: u32,
}

/// An outgoing dependency found in a file.
#[derive(Debug, Clone)]
pub struct CollectedDependency {
    pub kind: DependencyKind,
    pub symbol_name: Option<String>,
    pub context: Option<String>,
    pub line: u32,
    pub conditional: bool,
}

/// Everything one analysis pass extracts from a file.
#[derive(Debug, Default)]
pub struct CollectedFile {
    pub nodes: Vec<StatementNode>,
    pub symbols: Vec<CollectedSymbol>,
    pub dependencies: Vec<CollectedDependency>,
    /// Distinct namespaces in declaration order.
    pub namespaces: Vec<String>,
    /// True when the file contains statements outside declarations.
    pub has_executable_code: bool,
}

/// Resolve a source-level name to its FQN using PHP scoping rules.
///
/// Leading `\` marks a fully-qualified name; otherwise the first segment is
/// looked up in the alias table, `namespace\` expands to the current
/// namespace, and unqualified names are prefixed with it.
pub fn resolve_name(
    name: &str,
    namespace: Option<&str>,
    aliases: &HashMap<String, String>,
) -> String {
    let name = name.trim();
    if let Some(stripped) = name.strip_prefix('\\') {
        return stripped.to_string();
    }

    if name.to_ascii_lowercase().starts_with("namespace\\") {
        let rest = &name["namespace\\".len()..];
        return match namespace {
            Some(ns) => format!("{}\\{}", ns, rest),
            None => rest.to_string(),
        };
    }

    let (first, rest) = match name.split_once('\\') {
        Some((first, rest)) => (first, Some(rest)),
        None => (name, None),
    };
    if let Some(target) = aliases.get(first) {
        return match rest {
            Some(rest) => format!("{}\\{}", target, rest),
            None => target.clone(),
        };
    }

    match namespace {
        Some(ns) => format!("{}\\{}", ns, name),
        None => name.to_string(),
    }
}

/// Walks a program and lowers it to a [`CollectedFile`].
pub struct FileCollector<'s> {
    source: &'s str,
    namespace: Option<String>,
    aliases: HashMap<String, String>,
    /// End of the previous top-level statement; leading comments between
    /// statements attach to the following node.
    prev_end: usize,
    seen_symbol_deps: HashSet<(DependencyKind, String)>,
    out: CollectedFile,
}

impl<'s> FileCollector<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            namespace: None,
            aliases: HashMap::new(),
            prev_end: 0,
            seen_symbol_deps: HashSet::new(),
            out: CollectedFile::default(),
        }
    }

    pub fn collect(mut self, program: &Program<'_>) -> CollectedFile {
        for stmt in program.statements.iter() {
            self.lower_statement(stmt);
        }
        self.out
    }

    fn lower_statement(&mut self, stmt: &Statement<'_>) {
        match stmt {
            Statement::OpeningTag(_) | Statement::ClosingTag(_) | Statement::Noop(_) => {
                self.prev_end = stmt.span().end.offset as usize;
            }
            Statement::Inline(_) => {
                let span = stmt.span();
                let (ext_start, text) = self.extended_slice(&span);
                if !text.trim().is_empty() {
                    self.push_node(NodeKind::InlineHtml, None, &span, ext_start, text, Vec::new(), Vec::new());
                    self.out.has_executable_code = true;
                }
            }
            Statement::Namespace(ns) => self.lower_namespace(stmt, ns),
            Statement::Use(_) => self.lower_use(stmt),
            Statement::Declare(_) => {
                let span = stmt.span();
                let (ext_start, text) = self.extended_slice(&span);
                self.push_node(NodeKind::Declare, None, &span, ext_start, text, Vec::new(), Vec::new());
            }
            Statement::Class(class) => self.lower_class(stmt, class),
            Statement::Interface(interface) => self.lower_interface(stmt, interface),
            Statement::Trait(trait_def) => self.lower_trait(stmt, trait_def),
            Statement::Enum(enum_def) => self.lower_enum(stmt, enum_def),
            Statement::Function(func) => self.lower_function(stmt, func),
            Statement::Expression(expr_stmt) => {
                if let Some((kind, value)) = as_include(&expr_stmt.expression) {
                    self.lower_include(stmt, kind, value);
                } else {
                    self.lower_other(stmt);
                }
            }
            _ => self.lower_other(stmt),
        }
    }

    fn lower_namespace(&mut self, stmt: &Statement<'_>, ns: &Namespace<'_>) {
        let span = stmt.span();
        let text = span_text(self.source, &span);
        let name = extract_namespace_name(text);

        if let Some(name) = &name {
            if !self.out.namespaces.contains(name) {
                self.out.namespaces.push(name.clone());
            }
        }
        self.namespace = name;
        // Aliases apply to the namespace block that declared them.
        self.aliases.clear();

        // Skip past the `namespace X;` / `namespace X {` header so the
        // first child does not re-absorb it as leading trivia.
        let header_len = text
            .find(|c| c == ';' || c == '{')
            .map(|i| i + 1)
            .unwrap_or(0);
        self.prev_end = span.start.offset as usize + header_len;

        match &ns.body {
            NamespaceBody::Implicit(body) => {
                for inner in body.statements.iter() {
                    self.lower_statement(inner);
                }
            }
            NamespaceBody::BraceDelimited(body) => {
                for inner in body.statements.iter() {
                    self.lower_statement(inner);
                }
                self.prev_end = span.end.offset as usize;
            }
        }
    }

    fn lower_use(&mut self, stmt: &Statement<'_>) {
        let span = stmt.span();
        // Parse from the bare statement text; the stored node may carry
        // leading comment trivia.
        let statement_text = span_text(self.source, &span).to_string();
        let (ext_start, text) = self.extended_slice(&span);
        let line = line_at_offset(self.source, span.start.offset as usize) as u32;

        if let Some(imports) = parse_use_statement(&statement_text) {
            for (alias, fqn) in imports {
                self.push_symbol_dep(DependencyKind::UseClass, fqn.clone(), line, false);
                self.aliases.insert(alias, fqn);
            }
        }
        self.push_node(NodeKind::Use, None, &span, ext_start, text, Vec::new(), Vec::new());
    }

    fn lower_class(&mut self, stmt: &Statement<'_>, class: &Class<'_>) {
        let span = stmt.span();
        let name = span_text(self.source, &class.name.span).to_string();
        let fqn = self.qualify(&name);
        let visibility = declaration_modifier(
            &self.source[span.start.offset as usize..class.name.span.start.offset as usize],
        );
        let (ext_start, text) = self.extended_slice(&span);
        self.push_symbol(SymbolKind::Class, &name, &fqn, visibility, &span);

        let (name_refs, includes) = {
            let mut refs =
                RefCollector::new(self.source, self.namespace.as_deref(), &self.aliases);
            if let Some(extends) = &class.extends {
                for parent in extends.types.iter() {
                    refs.record_name(parent.span(), DependencyKind::Extends, WalkContext::default());
                }
            }
            if let Some(implements) = &class.implements {
                for iface in implements.types.iter() {
                    refs.record_name(iface.span(), DependencyKind::Implements, WalkContext::default());
                }
            }
            for member in class.members.iter() {
                refs.traverse_class_like_member(member, WalkContext::default());
            }
            refs.finish()
        };

        self.push_node(NodeKind::Class, Some(fqn), &span, ext_start, text, name_refs, includes);
    }

    fn lower_interface(&mut self, stmt: &Statement<'_>, interface: &Interface<'_>) {
        let span = stmt.span();
        let name = span_text(self.source, &interface.name.span).to_string();
        let fqn = self.qualify(&name);
        let (ext_start, text) = self.extended_slice(&span);
        self.push_symbol(SymbolKind::Interface, &name, &fqn, None, &span);

        let (name_refs, includes) = {
            let mut refs =
                RefCollector::new(self.source, self.namespace.as_deref(), &self.aliases);
            if let Some(extends) = &interface.extends {
                for parent in extends.types.iter() {
                    refs.record_name(parent.span(), DependencyKind::Extends, WalkContext::default());
                }
            }
            for member in interface.members.iter() {
                refs.traverse_class_like_member(member, WalkContext::default());
            }
            refs.finish()
        };

        self.push_node(NodeKind::Interface, Some(fqn), &span, ext_start, text, name_refs, includes);
    }

    fn lower_trait(&mut self, stmt: &Statement<'_>, trait_def: &Trait<'_>) {
        let span = stmt.span();
        let name = span_text(self.source, &trait_def.name.span).to_string();
        let fqn = self.qualify(&name);
        let (ext_start, text) = self.extended_slice(&span);
        self.push_symbol(SymbolKind::Trait, &name, &fqn, None, &span);

        let (name_refs, includes) = {
            let mut refs =
                RefCollector::new(self.source, self.namespace.as_deref(), &self.aliases);
            for member in trait_def.members.iter() {
                refs.traverse_class_like_member(member, WalkContext::default());
            }
            refs.finish()
        };

        self.push_node(NodeKind::Trait, Some(fqn), &span, ext_start, text, name_refs, includes);
    }

    fn lower_enum(&mut self, stmt: &Statement<'_>, enum_def: &Enum<'_>) {
        let span = stmt.span();
        let name = span_text(self.source, &enum_def.name.span).to_string();
        let fqn = self.qualify(&name);
        let (ext_start, text) = self.extended_slice(&span);
        // Enums take part in the class symbol space.
        self.push_symbol(SymbolKind::Class, &name, &fqn, None, &span);

        let (name_refs, includes) = {
            let mut refs =
                RefCollector::new(self.source, self.namespace.as_deref(), &self.aliases);
            for member in enum_def.members.iter() {
                refs.traverse_class_like_member(member, WalkContext::default());
            }
            refs.finish()
        };

        self.push_node(NodeKind::Class, Some(fqn), &span, ext_start, text, name_refs, includes);
    }

    fn lower_function(&mut self, stmt: &Statement<'_>, func: &Function<'_>) {
        let span = stmt.span();
        let name = span_text(self.source, &func.name.span).to_string();
        let fqn = self.qualify(&name);
        let (ext_start, text) = self.extended_slice(&span);
        self.push_symbol(SymbolKind::Function, &name, &fqn, None, &span);

        let (name_refs, includes) = {
            let mut refs =
                RefCollector::new(self.source, self.namespace.as_deref(), &self.aliases);
            for inner in func.body.statements.iter() {
                refs.traverse_statement(inner, WalkContext::default());
            }
            refs.finish()
        };

        self.push_node(NodeKind::Function, Some(fqn), &span, ext_start, text, name_refs, includes);
    }

    fn lower_include(&mut self, stmt: &Statement<'_>, kind: IncludeKind, value: &Expression<'_>) {
        let span = stmt.span();
        let context = include_context(value, self.source);
        let (ext_start, text) = self.extended_slice(&span);
        let includes = vec![IncludeAbs {
            start: span.start.offset as usize,
            end: span.end.offset as usize,
            kind,
            context,
            conditional: false,
            standalone: true,
        }];
        self.push_node(NodeKind::Include, None, &span, ext_start, text, Vec::new(), includes);
        self.out.has_executable_code = true;
    }

    fn lower_other(&mut self, stmt: &Statement<'_>) {
        let span = stmt.span();
        let (ext_start, text) = self.extended_slice(&span);

        let (name_refs, includes) = {
            let mut refs =
                RefCollector::new(self.source, self.namespace.as_deref(), &self.aliases);
            refs.traverse_statement(stmt, WalkContext::default());
            refs.finish()
        };

        self.push_node(NodeKind::Statement, None, &span, ext_start, text, name_refs, includes);
        self.out.has_executable_code = true;
    }

    // -- helpers ----------------------------------------------------------

    fn qualify(&self, name: &str) -> String {
        if let Some(stripped) = name.strip_prefix('\\') {
            stripped.to_string()
        } else if let Some(ns) = &self.namespace {
            format!("{}\\{}", ns, name)
        } else {
            name.to_string()
        }
    }

    /// Slice a statement together with any leading comment trivia after the
    /// previous statement.
    fn extended_slice(&mut self, span: &Span) -> (usize, String) {
        let start = span.start.offset as usize;
        let end = span.end.offset as usize;
        let gap_start = self.prev_end.min(start);

        let gap = &self.source[gap_start..start];
        let ext_start = match gap.find(|c: char| !c.is_whitespace()) {
            Some(i) => gap_start + i,
            None => start,
        };

        self.prev_end = end;
        (ext_start, self.source[ext_start..end].to_string())
    }

    fn push_symbol(
        &mut self,
        kind: SymbolKind,
        short_name: &str,
        fqn: &str,
        visibility: Option<String>,
        span: &Span,
    ) {
        self.out.symbols.push(CollectedSymbol {
            kind,
            short_name: short_name.to_string(),
            fqn: fqn.to_string(),
            namespace: self.namespace.clone(),
            visibility,
            line: line_at_offset(self.source, span.start.offset as usize) as u32,
        });
    }

    fn push_symbol_dep(&mut self, kind: DependencyKind, fqn: String, line: u32, conditional: bool) {
        if !self.seen_symbol_deps.insert((kind, fqn.clone())) {
            return;
        }
        self.out.dependencies.push(CollectedDependency {
            kind,
            symbol_name: Some(fqn),
            context: None,
            line,
            conditional,
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn push_node(
        &mut self,
        kind: NodeKind,
        fqn: Option<String>,
        span: &Span,
        ext_start: usize,
        text: String,
        name_refs: Vec<NameRefAbs>,
        includes: Vec<IncludeAbs>,
    ) {
        let end = span.end.offset as usize;
        let mut node = StatementNode::new(
            kind,
            text,
            NodeSpan::new(
                ext_start as u32,
                end as u32,
                line_at_offset(self.source, span.start.offset as usize) as u32,
                line_at_offset(self.source, end) as u32,
            ),
        );
        node.fqn = fqn;
        node.namespace = self.namespace.clone();

        for r in name_refs {
            let line = line_at_offset(self.source, r.start) as u32;
            node.name_refs.push(NameRef {
                start: (r.start - ext_start) as u32,
                end: (r.end - ext_start) as u32,
                fqn: r.fqn.clone(),
            });
            self.push_symbol_dep(r.dep_kind, r.fqn, line, r.conditional);
        }

        for inc in includes {
            let line = line_at_offset(self.source, inc.start) as u32;
            node.includes.push(IncludeRef {
                start: (inc.start - ext_start) as u32,
                end: (inc.end - ext_start) as u32,
                kind: inc.kind,
                context: inc.context.clone(),
                conditional: inc.conditional,
                standalone: inc.standalone,
            });
            self.out.dependencies.push(CollectedDependency {
                kind: include_dependency_kind(inc.kind),
                symbol_name: None,
                context: Some(inc.context),
                line,
                conditional: inc.conditional,
            });
        }

        self.out.nodes.push(node);
    }
}

fn include_dependency_kind(kind: IncludeKind) -> DependencyKind {
    match kind {
        IncludeKind::Require => DependencyKind::Require,
        IncludeKind::RequireOnce => DependencyKind::RequireOnce,
        IncludeKind::Include => DependencyKind::Include,
        IncludeKind::IncludeOnce => DependencyKind::IncludeOnce,
    }
}

/// `abstract` / `final` modifier in front of a class declaration.
fn declaration_modifier(head: &str) -> Option<String> {
    if head.contains("abstract") {
        Some("abstract".to_string())
    } else if head.contains("final") {
        Some("final".to_string())
    } else {
        None
    }
}

/// Extract the namespace name from the statement text.
fn extract_namespace_name(text: &str) -> Option<String> {
    let idx = text.find("namespace")?;
    let after = &text[idx + "namespace".len()..];
    let end = after
        .find(|c: char| c == '{' || c == ';')
        .unwrap_or(after.len());
    let name = after[..end].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Parse a `use` statement into `(alias, fqn)` pairs.
///
/// Handles single imports, `as` aliases, and group imports. Function and
/// constant imports return `None`; they do not take part in class
/// resolution.
fn parse_use_statement(text: &str) -> Option<Vec<(String, String)>> {
    let body = text.trim().trim_start_matches("use").trim();
    let lower = body.to_ascii_lowercase();
    if lower.starts_with("function ") || lower.starts_with("const ") {
        return None;
    }
    let body = body.trim_end_matches(';').trim();

    let mut imports = Vec::new();

    if let (Some(brace_start), Some(brace_end)) = (body.find('{'), body.rfind('}')) {
        // Group import: Prefix\{Bar, Baz as Qux}
        let prefix = body[..brace_start].trim().trim_end_matches('\\');
        for item in body[brace_start + 1..brace_end].split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let item_lower = item.to_ascii_lowercase();
            if item_lower.starts_with("function ") || item_lower.starts_with("const ") {
                continue;
            }
            let (name, alias) = split_alias(item);
            let fqn = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}\\{}", prefix, name)
            };
            imports.push((alias, fqn));
        }
        return Some(imports);
    }

    for item in body.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let (name, alias) = split_alias(item);
        imports.push((alias, name.trim_start_matches('\\').to_string()));
    }
    Some(imports)
}

/// Split `Foo\Bar as Baz` into the imported name and its local alias.
fn split_alias(item: &str) -> (&str, String) {
    if let Some(pos) = item.to_ascii_lowercase().find(" as ") {
        let name = item[..pos].trim();
        let alias = item[pos + 4..].trim().to_string();
        (name, alias)
    } else {
        let name = item.trim();
        let alias = name.rsplit('\\').next().unwrap_or(name).to_string();
        (name, alias)
    }
}

// -- reference collection -------------------------------------------------

#[derive(Debug)]
struct NameRefAbs {
    start: usize,
    end: usize,
    fqn: String,
    dep_kind: DependencyKind,
    conditional: bool,
}

#[derive(Debug)]
struct IncludeAbs {
    start: usize,
    end: usize,
    kind: IncludeKind,
    context: String,
    conditional: bool,
    standalone: bool,
}

/// Collects class-name references and include sites inside one statement
/// subtree.
struct RefCollector<'c, 's> {
    source: &'s str,
    namespace: Option<&'c str>,
    aliases: &'c HashMap<String, String>,
    refs: Vec<NameRefAbs>,
    includes: Vec<IncludeAbs>,
}

impl<'c, 's> RefCollector<'c, 's> {
    fn new(source: &'s str, namespace: Option<&'c str>, aliases: &'c HashMap<String, String>) -> Self {
        Self {
            source,
            namespace,
            aliases,
            refs: Vec::new(),
            includes: Vec::new(),
        }
    }

    fn finish(self) -> (Vec<NameRefAbs>, Vec<IncludeAbs>) {
        (self.refs, self.includes)
    }

    fn record_name(&mut self, span: Span, dep_kind: DependencyKind, cx: WalkContext) {
        let text = span_text(self.source, &span).trim();
        if text.is_empty() || text.starts_with('$') {
            return;
        }
        let lower = text.to_ascii_lowercase();
        if matches!(lower.as_str(), "self" | "static" | "parent") {
            return;
        }
        let fqn = resolve_name(text, self.namespace, self.aliases);
        self.refs.push(NameRefAbs {
            start: span.start.offset as usize,
            end: span.end.offset as usize,
            fqn,
            dep_kind,
            conditional: cx.conditional,
        });
    }

    fn record_include(
        &mut self,
        span: Span,
        kind: IncludeKind,
        value: &Expression<'_>,
        cx: WalkContext,
        standalone: bool,
    ) {
        self.includes.push(IncludeAbs {
            start: span.start.offset as usize,
            end: span.end.offset as usize,
            kind,
            context: include_context(value, self.source),
            conditional: cx.conditional,
            standalone,
        });
    }
}

impl<'a, 'c, 's> Visitor<'a> for RefCollector<'c, 's> {
    fn visit_statement(&mut self, stmt: &Statement<'a>, cx: WalkContext) -> bool {
        if let Statement::Expression(expr_stmt) = stmt {
            if let Some((kind, value)) = as_include(&expr_stmt.expression) {
                self.record_include(stmt.span(), kind, value, cx, true);
                return false;
            }
        }
        true
    }

    fn visit_class_like_member(&mut self, member: &ClassLikeMember<'a>, cx: WalkContext) -> bool {
        if let ClassLikeMember::TraitUse(trait_use) = member {
            for name in trait_use.trait_names.iter() {
                self.record_name(name.span(), DependencyKind::UseTrait, cx);
            }
        }
        true
    }

    fn visit_expression(&mut self, expr: &Expression<'a>, cx: WalkContext) -> bool {
        match expr {
            Expression::Instantiation(inst) => {
                if let Expression::Identifier(ident) = &*inst.class {
                    self.record_name(ident.span(), DependencyKind::UseClass, cx);
                }
            }
            Expression::AnonymousClass(anon) => {
                // Anonymous classes define no symbol, but their parents are
                // still dependencies.
                if let Some(extends) = &anon.extends {
                    for parent in extends.types.iter() {
                        self.record_name(parent.span(), DependencyKind::Extends, cx);
                    }
                }
                if let Some(implements) = &anon.implements {
                    for iface in implements.types.iter() {
                        self.record_name(iface.span(), DependencyKind::Implements, cx);
                    }
                }
                for member in anon.members.iter() {
                    self.traverse_class_like_member(member, cx);
                }
            }
            Expression::Call(Call::StaticMethod(static_call)) => {
                if let Expression::Identifier(ident) = &*static_call.class {
                    self.record_name(ident.span(), DependencyKind::UseClass, cx);
                }
            }
            Expression::Access(Access::ClassConstant(cc)) => {
                if let Expression::Identifier(ident) = &*cc.class {
                    self.record_name(ident.span(), DependencyKind::UseClass, cx);
                }
            }
            Expression::Binary(binary) => {
                if matches!(binary.operator, BinaryOperator::Instanceof(_)) {
                    if let Expression::Identifier(ident) = &*binary.rhs {
                        self.record_name(ident.span(), DependencyKind::UseClass, cx);
                    }
                }
            }
            Expression::Construct(construct) => {
                if let Some((kind, value)) = include_parts(construct) {
                    self.record_include(expr.span(), kind, value, cx, false);
                    return false;
                }
            }
            _ => {}
        }
        true
    }
}

// -- include extraction ---------------------------------------------------

fn include_parts<'x, 'a>(
    construct: &'x Construct<'a>,
) -> Option<(IncludeKind, &'x Expression<'a>)> {
    Some(match construct {
        Construct::Require(c) => (IncludeKind::Require, c.value),
        Construct::RequireOnce(c) => (IncludeKind::RequireOnce, c.value),
        Construct::Include(c) => (IncludeKind::Include, c.value),
        Construct::IncludeOnce(c) => (IncludeKind::IncludeOnce, c.value),
        _ => return None,
    })
}

fn as_include<'x, 'a>(expr: &'x Expression<'a>) -> Option<(IncludeKind, &'x Expression<'a>)> {
    match expr {
        Expression::Construct(construct) => include_parts(construct),
        Expression::Parenthesized(paren) => as_include(&paren.expression),
        _ => None,
    }
}

/// Context string for an include argument: the literal path, the verbatim
/// `__DIR__`-concat expression, or `"dynamic"`.
fn include_context(expr: &Expression<'_>, source: &str) -> String {
    match expr {
        Expression::Literal(Literal::String(s)) => {
            let raw = span_text(source, &s.span());
            match unquote(raw) {
                Some(path) => path,
                None => DYNAMIC_INCLUDE.to_string(),
            }
        }
        Expression::MagicConstant(MagicConstant::Directory(_)) => "__DIR__".to_string(),
        Expression::Parenthesized(paren) => include_context(&paren.expression, source),
        Expression::Binary(binary) => {
            if matches!(binary.operator, BinaryOperator::StringConcat(_))
                && concat_is_static(expr, source)
            {
                span_text(source, &expr.span()).to_string()
            } else {
                DYNAMIC_INCLUDE.to_string()
            }
        }
        _ => DYNAMIC_INCLUDE.to_string(),
    }
}

/// True when the expression is built only from string literals, `__DIR__`,
/// and concatenation.
fn concat_is_static(expr: &Expression<'_>, source: &str) -> bool {
    match expr {
        Expression::Literal(Literal::String(s)) => {
            unquote(span_text(source, &s.span())).is_some()
        }
        Expression::MagicConstant(MagicConstant::Directory(_)) => true,
        Expression::Parenthesized(paren) => concat_is_static(&paren.expression, source),
        Expression::Binary(binary) => {
            matches!(binary.operator, BinaryOperator::StringConcat(_))
                && concat_is_static(&binary.lhs, source)
                && concat_is_static(&binary.rhs, source)
        }
        _ => false,
    }
}

/// Strip matching quotes from a string literal.
fn unquote(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() >= 2
        && ((raw.starts_with('\'') && raw.ends_with('\''))
            || (raw.starts_with('"') && raw.ends_with('"')))
    {
        Some(raw[1..raw.len() - 1].to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use phpack_core::parser::{MagoParser, Parser};

    fn collect(source: &str) -> CollectedFile {
        let arena = Bump::new();
        let parser = MagoParser::new();
        let program = parser.parse(&arena, "test.php", source).unwrap();
        FileCollector::new(source).collect(program)
    }

    #[test]
    fn test_resolve_name_rules() {
        let mut aliases = HashMap::new();
        aliases.insert("Calc".to_string(), "App\\Math\\Calc".to_string());

        assert_eq!(resolve_name("\\Foo\\Bar", Some("App"), &aliases), "Foo\\Bar");
        assert_eq!(resolve_name("Calc", Some("Other"), &aliases), "App\\Math\\Calc");
        assert_eq!(resolve_name("Calc\\Inner", None, &aliases), "App\\Math\\Calc\\Inner");
        assert_eq!(resolve_name("Helper", Some("App"), &aliases), "App\\Helper");
        assert_eq!(resolve_name("Helper", None, &aliases), "Helper");
        assert_eq!(
            resolve_name("namespace\\Sub\\Thing", Some("App"), &aliases),
            "App\\Sub\\Thing"
        );
    }

    #[test]
    fn test_collect_class_with_namespace() {
        let out = collect("<?php\nnamespace App;\n\nclass Calc\n{\n    public function add($a, $b)\n    {\n        return $a + $b;\n    }\n}\n");
        assert_eq!(out.symbols.len(), 1);
        assert_eq!(out.symbols[0].fqn, "App\\Calc");
        assert_eq!(out.symbols[0].kind, SymbolKind::Class);
        assert_eq!(out.namespaces, vec!["App".to_string()]);
        assert!(!out.has_executable_code);

        let class_node = out
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Class)
            .unwrap();
        assert_eq!(class_node.fqn.as_deref(), Some("App\\Calc"));
        assert_eq!(class_node.namespace.as_deref(), Some("App"));
        assert!(class_node.text.starts_with("class Calc"));
    }

    #[test]
    fn test_collect_extends_implements() {
        let out = collect(
            "<?php\nnamespace App;\n\nuse Lib\\Contract;\n\nclass Calc extends Base implements Contract\n{\n}\n",
        );

        let kinds: Vec<(DependencyKind, &str)> = out
            .dependencies
            .iter()
            .filter_map(|d| d.symbol_name.as_deref().map(|s| (d.kind, s)))
            .collect();
        assert!(kinds.contains(&(DependencyKind::Extends, "App\\Base")));
        assert!(kinds.contains(&(DependencyKind::Implements, "Lib\\Contract")));
        assert!(kinds.contains(&(DependencyKind::UseClass, "Lib\\Contract")));

        // The class node carries rewritable references for both parents.
        let class_node = out
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Class)
            .unwrap();
        let ref_fqns: Vec<&str> = class_node.name_refs.iter().map(|r| r.fqn.as_str()).collect();
        assert!(ref_fqns.contains(&"App\\Base"));
        assert!(ref_fqns.contains(&"Lib\\Contract"));
        for r in &class_node.name_refs {
            let slice = &class_node.text[r.start as usize..r.end as usize];
            assert!(slice == "Base" || slice == "Contract");
        }
    }

    #[test]
    fn test_collect_use_aliases_and_new() {
        let out = collect("<?php\nuse App\\Calc as C;\n\necho (new C())->add(2, 3);\n");

        assert!(out.has_executable_code);
        let dep_fqns: Vec<&str> = out
            .dependencies
            .iter()
            .filter_map(|d| d.symbol_name.as_deref())
            .collect();
        assert!(dep_fqns.contains(&"App\\Calc"));

        let echo_node = out
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Statement)
            .unwrap();
        assert_eq!(echo_node.name_refs.len(), 1);
        assert_eq!(echo_node.name_refs[0].fqn, "App\\Calc");
        let r = &echo_node.name_refs[0];
        assert_eq!(&echo_node.text[r.start as usize..r.end as usize], "C");
    }

    #[test]
    fn test_collect_group_use() {
        let out = collect("<?php\nuse App\\{Calc, Util as U};\n\nnew Calc();\nnew U();\n");
        let dep_fqns: Vec<&str> = out
            .dependencies
            .iter()
            .filter_map(|d| d.symbol_name.as_deref())
            .collect();
        assert!(dep_fqns.contains(&"App\\Calc"));
        assert!(dep_fqns.contains(&"App\\Util"));
    }

    #[test]
    fn test_collect_static_call_const_instanceof() {
        let out = collect(
            "<?php\nnamespace App;\n\n$a = Config::load();\n$b = Config::VERSION;\nif ($a instanceof Loader) {\n    $a->run();\n}\n",
        );
        let deps: Vec<(DependencyKind, &str)> = out
            .dependencies
            .iter()
            .filter_map(|d| d.symbol_name.as_deref().map(|s| (d.kind, s)))
            .collect();
        assert!(deps.contains(&(DependencyKind::UseClass, "App\\Config")));
        assert!(deps.contains(&(DependencyKind::UseClass, "App\\Loader")));
    }

    #[test]
    fn test_collect_trait_use() {
        let out = collect("<?php\nnamespace App;\n\nclass Service\n{\n    use Loggable;\n}\n");
        let deps: Vec<(DependencyKind, &str)> = out
            .dependencies
            .iter()
            .filter_map(|d| d.symbol_name.as_deref().map(|s| (d.kind, s)))
            .collect();
        assert!(deps.contains(&(DependencyKind::UseTrait, "App\\Loggable")));
    }

    #[test]
    fn test_collect_includes() {
        let out = collect(
            "<?php\nrequire_once __DIR__ . '/bootstrap.php';\nrequire 'helpers.php';\n$config = require 'config.php';\n",
        );

        let path_deps: Vec<&CollectedDependency> = out
            .dependencies
            .iter()
            .filter(|d| d.kind.is_path_kind())
            .collect();
        assert_eq!(path_deps.len(), 3);
        assert_eq!(
            path_deps[0].context.as_deref(),
            Some("__DIR__ . '/bootstrap.php'")
        );
        assert_eq!(path_deps[1].context.as_deref(), Some("helpers.php"));

        // Standalone statements are strippable; the assignment form is not.
        let standalone: Vec<bool> = out
            .nodes
            .iter()
            .flat_map(|n| n.includes.iter().map(|i| i.standalone))
            .collect();
        assert_eq!(standalone, vec![true, true, false]);
    }

    #[test]
    fn test_conditional_include_flag() {
        let out = collect(
            "<?php\nif (PHP_SAPI === \"cli\") {\n    require \"cli.php\";\n} else {\n    require \"web.php\";\n}\n",
        );
        let path_deps: Vec<&CollectedDependency> = out
            .dependencies
            .iter()
            .filter(|d| d.kind.is_path_kind())
            .collect();
        assert_eq!(path_deps.len(), 2);
        assert!(path_deps.iter().all(|d| d.conditional));

        // Both include sites live inside the single if statement node and
        // are standalone statements there.
        let if_node = out
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Statement)
            .unwrap();
        assert_eq!(if_node.includes.len(), 2);
        assert!(if_node.includes.iter().all(|i| i.standalone && i.conditional));
        for inc in &if_node.includes {
            let slice = &if_node.text[inc.start as usize..inc.end as usize];
            assert!(slice.starts_with("require"));
        }
    }

    #[test]
    fn test_dynamic_include_context() {
        let out = collect("<?php\nrequire $path;\nrequire __DIR__ . $file;\n");
        let contexts: Vec<&str> = out
            .dependencies
            .iter()
            .filter_map(|d| d.context.as_deref())
            .collect();
        assert_eq!(contexts, vec![DYNAMIC_INCLUDE, DYNAMIC_INCLUDE]);
    }

    #[test]
    fn test_braced_namespaces() {
        let out = collect(
            "<?php\nnamespace A\\V1 {\n    class Calc {}\n}\nnamespace A\\V2 {\n    class Calc {}\n}\n",
        );
        assert_eq!(out.namespaces, vec!["A\\V1".to_string(), "A\\V2".to_string()]);
        assert_eq!(out.symbols.len(), 2);
        assert_eq!(out.symbols[0].fqn, "A\\V1\\Calc");
        assert_eq!(out.symbols[1].fqn, "A\\V2\\Calc");

        let class_namespaces: Vec<Option<&str>> = out
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Class)
            .map(|n| n.namespace.as_deref())
            .collect();
        assert_eq!(class_namespaces, vec![Some("A\\V1"), Some("A\\V2")]);
    }

    #[test]
    fn test_abstract_class_modifier() {
        let out = collect("<?php\nabstract class Base {}\nfinal class Leaf {}\n");
        assert_eq!(out.symbols[0].visibility.as_deref(), Some("abstract"));
        assert_eq!(out.symbols[1].visibility.as_deref(), Some("final"));
    }

    #[test]
    fn test_leading_comment_attaches_to_declaration() {
        let out = collect("<?php\n\n/** Adds numbers. */\nclass Calc {}\n");
        let class_node = out
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Class)
            .unwrap();
        assert!(class_node.text.starts_with("/** Adds numbers. */"));
    }

    #[test]
    fn test_use_function_skipped() {
        let out = collect("<?php\nuse function App\\helper;\nuse const App\\VERSION;\n");
        assert!(out
            .dependencies
            .iter()
            .all(|d| d.kind != DependencyKind::UseClass));
    }

    #[test]
    fn test_interface_symbol() {
        let out = collect("<?php\nnamespace App;\ninterface I\n{\n    public function go(): int;\n}\n");
        assert_eq!(out.symbols.len(), 1);
        assert_eq!(out.symbols[0].kind, SymbolKind::Interface);
        assert_eq!(out.symbols[0].fqn, "App\\I");
    }
}
