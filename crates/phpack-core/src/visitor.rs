//! AST visitor for traversing PHP syntax trees
//!
//! Default implementations handle traversal; implementors override the
//! `visit_*` hooks. The walk context tracks whether the current node sits
//! inside a conditional construct (`if`/`try`/loop/`switch`), which the
//! analyzer needs to flag conditional includes.

use mago_syntax::ast::*;

/// Ambient facts about the position of the node being visited.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkContext {
    /// True when the ancestor chain includes an `if`/`else`/`try`/`catch`,
    /// loop, or `switch` body.
    pub conditional: bool,
}

impl WalkContext {
    /// Context for children of a conditional construct.
    pub fn conditional(self) -> Self {
        Self { conditional: true }
    }
}

/// Trait for visiting PHP AST nodes
///
/// Return `true` from a hook to continue traversal into children.
pub trait Visitor<'a> {
    fn visit_statement(&mut self, _stmt: &Statement<'a>, _cx: WalkContext) -> bool {
        true
    }

    fn visit_expression(&mut self, _expr: &Expression<'a>, _cx: WalkContext) -> bool {
        true
    }

    /// Called for each class-like member before its children.
    fn visit_class_like_member(&mut self, _member: &ClassLikeMember<'a>, _cx: WalkContext) -> bool {
        true
    }

    /// Visit a program (entry point)
    fn visit_program(&mut self, program: &Program<'a>) {
        let cx = WalkContext::default();
        for stmt in program.statements.iter() {
            self.traverse_statement(stmt, cx);
        }
    }

    /// Traverse a statement and its children
    fn traverse_statement(&mut self, stmt: &Statement<'a>, cx: WalkContext) {
        if !self.visit_statement(stmt, cx) {
            return;
        }

        match stmt {
            Statement::Expression(expr_stmt) => {
                self.traverse_expression(&expr_stmt.expression, cx);
            }
            Statement::Block(block) => {
                for inner in block.statements.iter() {
                    self.traverse_statement(inner, cx);
                }
            }
            Statement::If(if_stmt) => {
                self.traverse_expression(&if_stmt.condition, cx);
                self.traverse_if_body(&if_stmt.body, cx.conditional());
            }
            Statement::Foreach(foreach) => {
                self.traverse_expression(&foreach.expression, cx);
                self.traverse_foreach_body(&foreach.body, cx.conditional());
            }
            Statement::For(for_stmt) => {
                for expr in for_stmt.initializations.iter() {
                    self.traverse_expression(expr, cx);
                }
                for expr in for_stmt.conditions.iter() {
                    self.traverse_expression(expr, cx);
                }
                for expr in for_stmt.increments.iter() {
                    self.traverse_expression(expr, cx);
                }
                self.traverse_for_body(&for_stmt.body, cx.conditional());
            }
            Statement::While(while_stmt) => {
                self.traverse_expression(&while_stmt.condition, cx);
                self.traverse_while_body(&while_stmt.body, cx.conditional());
            }
            Statement::DoWhile(do_while) => {
                self.traverse_statement(&do_while.statement, cx.conditional());
                self.traverse_expression(&do_while.condition, cx);
            }
            Statement::Class(class) => {
                for member in class.members.iter() {
                    self.traverse_class_like_member(member, cx);
                }
            }
            Statement::Interface(interface) => {
                for member in interface.members.iter() {
                    self.traverse_class_like_member(member, cx);
                }
            }
            Statement::Trait(tr) => {
                for member in tr.members.iter() {
                    self.traverse_class_like_member(member, cx);
                }
            }
            Statement::Function(func) => {
                for inner in func.body.statements.iter() {
                    self.traverse_statement(inner, cx);
                }
            }
            Statement::Namespace(ns) => match &ns.body {
                NamespaceBody::Implicit(body) => {
                    for inner in body.statements.iter() {
                        self.traverse_statement(inner, cx);
                    }
                }
                NamespaceBody::BraceDelimited(body) => {
                    for inner in body.statements.iter() {
                        self.traverse_statement(inner, cx);
                    }
                }
            },
            Statement::Try(try_stmt) => {
                let inner_cx = cx.conditional();
                for inner in try_stmt.block.statements.iter() {
                    self.traverse_statement(inner, inner_cx);
                }
                for catch in try_stmt.catch_clauses.iter() {
                    for inner in catch.block.statements.iter() {
                        self.traverse_statement(inner, inner_cx);
                    }
                }
                if let Some(finally) = &try_stmt.finally_clause {
                    for inner in finally.block.statements.iter() {
                        self.traverse_statement(inner, inner_cx);
                    }
                }
            }
            Statement::Switch(switch) => {
                self.traverse_expression(&switch.expression, cx);
                self.traverse_switch_body(&switch.body, cx.conditional());
            }
            Statement::Return(ret) => {
                if let Some(expr) = &ret.value {
                    self.traverse_expression(expr, cx);
                }
            }
            Statement::Echo(echo) => {
                for expr in echo.values.iter() {
                    self.traverse_expression(expr, cx);
                }
            }
            _ => {}
        }
    }

    /// Traverse an if body
    fn traverse_if_body(&mut self, body: &IfBody<'a>, cx: WalkContext) {
        match body {
            IfBody::Statement(stmt_body) => {
                self.traverse_statement(stmt_body.statement, cx);
                for else_if in stmt_body.else_if_clauses.iter() {
                    self.traverse_expression(&else_if.condition, cx);
                    self.traverse_statement(else_if.statement, cx);
                }
                if let Some(else_clause) = &stmt_body.else_clause {
                    self.traverse_statement(else_clause.statement, cx);
                }
            }
            IfBody::ColonDelimited(block) => {
                for inner in block.statements.iter() {
                    self.traverse_statement(inner, cx);
                }
                for else_if in block.else_if_clauses.iter() {
                    self.traverse_expression(&else_if.condition, cx);
                    for inner in else_if.statements.iter() {
                        self.traverse_statement(inner, cx);
                    }
                }
                if let Some(else_clause) = &block.else_clause {
                    for inner in else_clause.statements.iter() {
                        self.traverse_statement(inner, cx);
                    }
                }
            }
        }
    }

    /// Traverse a foreach body
    fn traverse_foreach_body(&mut self, body: &ForeachBody<'a>, cx: WalkContext) {
        match body {
            ForeachBody::Statement(stmt) => {
                self.traverse_statement(stmt, cx);
            }
            ForeachBody::ColonDelimited(block) => {
                for inner in block.statements.iter() {
                    self.traverse_statement(inner, cx);
                }
            }
        }
    }

    /// Traverse a for body
    fn traverse_for_body(&mut self, body: &ForBody<'a>, cx: WalkContext) {
        match body {
            ForBody::Statement(stmt) => {
                self.traverse_statement(stmt, cx);
            }
            ForBody::ColonDelimited(block) => {
                for inner in block.statements.iter() {
                    self.traverse_statement(inner, cx);
                }
            }
        }
    }

    /// Traverse a while body
    fn traverse_while_body(&mut self, body: &WhileBody<'a>, cx: WalkContext) {
        match body {
            WhileBody::Statement(stmt) => {
                self.traverse_statement(stmt, cx);
            }
            WhileBody::ColonDelimited(block) => {
                for inner in block.statements.iter() {
                    self.traverse_statement(inner, cx);
                }
            }
        }
    }

    /// Traverse a switch body
    fn traverse_switch_body(&mut self, body: &SwitchBody<'a>, cx: WalkContext) {
        match body {
            SwitchBody::BraceDelimited(block) => {
                for case in block.cases.iter() {
                    for stmt in case.statements().iter() {
                        self.traverse_statement(stmt, cx);
                    }
                }
            }
            SwitchBody::ColonDelimited(block) => {
                for case in block.cases.iter() {
                    for stmt in case.statements().iter() {
                        self.traverse_statement(stmt, cx);
                    }
                }
            }
        }
    }

    /// Traverse a class-like member
    fn traverse_class_like_member(&mut self, member: &ClassLikeMember<'a>, cx: WalkContext) {
        if !self.visit_class_like_member(member, cx) {
            return;
        }

        if let ClassLikeMember::Method(method) = member {
            match &method.body {
                MethodBody::Concrete(body) => {
                    for inner in body.statements.iter() {
                        self.traverse_statement(inner, cx);
                    }
                }
                MethodBody::Abstract(_) => {}
            }
        }
    }

    /// Traverse an expression and its children
    fn traverse_expression(&mut self, expr: &Expression<'a>, cx: WalkContext) {
        if !self.visit_expression(expr, cx) {
            return;
        }

        match expr {
            Expression::Call(call) => match call {
                Call::Function(func_call) => {
                    self.traverse_expression(func_call.function, cx);
                    for arg in func_call.argument_list.arguments.iter() {
                        self.traverse_expression(arg.value(), cx);
                    }
                }
                Call::Method(method_call) => {
                    self.traverse_expression(&method_call.object, cx);
                    for arg in method_call.argument_list.arguments.iter() {
                        self.traverse_expression(arg.value(), cx);
                    }
                }
                Call::StaticMethod(static_call) => {
                    for arg in static_call.argument_list.arguments.iter() {
                        self.traverse_expression(arg.value(), cx);
                    }
                }
                _ => {}
            },
            Expression::Instantiation(inst) => {
                self.traverse_expression(&inst.class, cx);
                if let Some(args) = &inst.argument_list {
                    for arg in args.arguments.iter() {
                        self.traverse_expression(arg.value(), cx);
                    }
                }
            }
            Expression::UnaryPrefix(unary) => {
                self.traverse_expression(&unary.operand, cx);
            }
            Expression::Parenthesized(paren) => {
                self.traverse_expression(&paren.expression, cx);
            }
            Expression::Binary(binary) => {
                self.traverse_expression(&binary.lhs, cx);
                self.traverse_expression(&binary.rhs, cx);
            }
            Expression::Conditional(ternary) => {
                self.traverse_expression(&ternary.condition, cx);
                if let Some(then) = &ternary.then {
                    self.traverse_expression(then, cx);
                }
                self.traverse_expression(&ternary.r#else, cx);
            }
            Expression::Assignment(assign) => {
                self.traverse_expression(&assign.lhs, cx);
                self.traverse_expression(&assign.rhs, cx);
            }
            Expression::ArrayAccess(access) => {
                self.traverse_expression(&access.array, cx);
                self.traverse_expression(&access.index, cx);
            }
            Expression::Array(arr) => {
                for elem in arr.elements.iter() {
                    if let ArrayElement::KeyValue(kv) = elem {
                        self.traverse_expression(&kv.key, cx);
                        self.traverse_expression(&kv.value, cx);
                    } else if let ArrayElement::Value(val) = elem {
                        self.traverse_expression(&val.value, cx);
                    }
                }
            }
            Expression::Closure(closure) => {
                for inner in closure.body.statements.iter() {
                    self.traverse_statement(inner, cx);
                }
            }
            Expression::ArrowFunction(arrow) => {
                self.traverse_expression(&arrow.expression, cx);
            }
            Expression::Throw(throw) => {
                self.traverse_expression(&throw.exception, cx);
            }
            _ => {}
        }
    }
}

/// Helper function to run a visitor on a program
pub fn visit<'a, V: Visitor<'a>>(visitor: &mut V, program: &Program<'a>) {
    visitor.visit_program(program);
}
