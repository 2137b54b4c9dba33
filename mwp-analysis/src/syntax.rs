// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Syntactic pre-analysis of the input AST.
//!
//! Three small walkers: variable collection (parameters and every name
//! appearing in the body, in appearance order), coverage (which
//! constructs fall outside the analyzable fragment — the strict-mode
//! gate), and bounded-loop compatibility (whether a `for` loop has the
//! shape `repeat X times` with `X` untouched by the body).

use rustc_hash::FxHashSet;

use mwp_ast::*;

/// Collect the variables of a function: parameters first, then every
/// identifier in the body in order of first appearance.
pub fn collect_variables(func: &Function) -> Vec<Ident> {
    let mut collector = Collector::default();
    for param in &func.params {
        collector.push(param);
    }
    collector.walk_block(&func.body);
    collector.order
}

/// Variables appearing in a single expression, in appearance order.
pub fn expr_variables(expr: &Expr) -> Vec<Ident> {
    let mut collector = Collector::default();
    collector.walk_expr(expr);
    collector.order
}

/// Variables appearing in a statement, in appearance order.
pub fn stmt_variables(stmt: &Stmt) -> Vec<Ident> {
    let mut collector = Collector::default();
    collector.walk_stmt(stmt);
    collector.order
}

#[derive(Default)]
struct Collector {
    seen: FxHashSet<Ident>,
    order: Vec<Ident>,
}

impl Collector {
    fn push(&mut self, name: &Ident) {
        if self.seen.insert(name.clone()) {
            self.order.push(name.clone());
        }
    }

    fn walk_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(decl) => {
                self.push(&decl.var);
                if let Some(init) = &decl.init {
                    self.walk_expr(init);
                }
            }
            Stmt::Assign(assign) => {
                self.push(&assign.target);
                self.walk_expr(&assign.value);
            }
            Stmt::Expr(es) => self.walk_expr(&es.expr),
            Stmt::If(stmt) => {
                self.walk_expr(&stmt.cond);
                self.walk_block(&stmt.then_branch);
                if let Some(else_branch) = &stmt.else_branch {
                    self.walk_block(else_branch);
                }
            }
            Stmt::While(stmt) => {
                self.walk_expr(&stmt.cond);
                self.walk_block(&stmt.body);
            }
            Stmt::For(stmt) => {
                if let Some(init) = &stmt.init {
                    self.walk_stmt(init);
                }
                if let Some(cond) = &stmt.cond {
                    self.walk_expr(cond);
                }
                if let Some(step) = &stmt.step {
                    self.walk_stmt(step);
                }
                self.walk_block(&stmt.body);
            }
            Stmt::Block(block) => self.walk_block(block),
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.walk_expr(value);
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) | Stmt::Unsupported(_) => {}
        }
    }

    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Var { name, .. } => self.push(name),
            Expr::Const { .. } => {}
            Expr::Binary { lhs, rhs, .. } => {
                self.walk_expr(lhs);
                self.walk_expr(rhs);
            }
            Expr::Unary { arg, .. } | Expr::Deref { arg, .. } | Expr::AddrOf { arg, .. } => {
                self.walk_expr(arg)
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            Expr::Index { base, index, .. } => {
                self.walk_expr(base);
                self.walk_expr(index);
            }
        }
    }
}

/// Call names treated as no-op annotations rather than calls.
pub const ANNOTATION_CALLS: [&str; 2] = ["assert", "assume"];

/// Coverage report: the constructs of a function the analysis cannot
/// derive flows for. Guard expressions are never inspected — conditions
/// contribute no flows.
#[derive(Debug, Default)]
pub struct Coverage {
    /// Descriptions of unsupported constructs, in source order.
    pub unsupported: Vec<String>,
}

impl Coverage {
    /// Check a whole function.
    pub fn check(func: &Function) -> Coverage {
        let mut coverage = Coverage::default();
        coverage.check_block(&func.body);
        coverage
    }

    /// True when the function lies entirely in the analyzable fragment.
    pub fn full(&self) -> bool {
        self.unsupported.is_empty()
    }

    fn check_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Unsupported(u) => self.unsupported.push(u.construct.to_string()),
            Stmt::Decl(decl) => {
                if let Some(init) = &decl.init {
                    self.check_value(init);
                }
            }
            Stmt::Assign(assign) => self.check_value(&assign.value),
            Stmt::Expr(es) => self.check_expr_stmt(&es.expr),
            Stmt::If(stmt) => {
                self.check_block(&stmt.then_branch);
                if let Some(else_branch) = &stmt.else_branch {
                    self.check_block(else_branch);
                }
            }
            Stmt::While(stmt) => self.check_block(&stmt.body),
            Stmt::For(stmt) => {
                if let Some(init) = &stmt.init {
                    self.check_stmt(init);
                }
                if let Some(step) = &stmt.step {
                    self.check_stmt(step);
                }
                self.check_block(&stmt.body);
            }
            Stmt::Block(block) => self.check_block(block),
            Stmt::Return(_) | Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => {}
        }
    }

    /// Check the right-hand side of an assignment (or initializer).
    fn check_value(&mut self, expr: &Expr) {
        match expr {
            Expr::Var { .. } | Expr::Const { .. } => {}
            Expr::Binary { op, lhs, rhs, .. } => {
                if !op.is_arithmetic() {
                    self.unsupported.push(format!("operator {op}"));
                } else if !lhs.is_atom() || !rhs.is_atom() {
                    self.unsupported.push("nested expression".to_string());
                }
            }
            Expr::Unary { arg, .. } => {
                if !arg.is_atom() {
                    self.unsupported.push("nested expression".to_string());
                }
            }
            Expr::Call { callee, .. } => self.unsupported.push(format!("call to {callee}")),
            Expr::Index { .. } => self.unsupported.push("array subscript".to_string()),
            Expr::Deref { .. } => self.unsupported.push("pointer dereference".to_string()),
            Expr::AddrOf { .. } => self.unsupported.push("address-of".to_string()),
        }
    }

    /// Check an expression in statement position.
    fn check_expr_stmt(&mut self, expr: &Expr) {
        match expr {
            Expr::Unary { op, arg, .. } if op.is_inc_dec() && arg.as_var().is_some() => {}
            Expr::Call { callee, .. } if ANNOTATION_CALLS.contains(&callee.as_str()) => {}
            Expr::Call { callee, .. } => self.unsupported.push(format!("call to {callee}")),
            Expr::Index { .. } => self.unsupported.push("array subscript".to_string()),
            Expr::Deref { .. } => self.unsupported.push("pointer dereference".to_string()),
            // remaining expression statements have no effect on flows
            _ => {}
        }
    }
}

/// Decide whether a `for` loop is a bounded mwp-loop `repeat X { C }`.
///
/// The control variable `X` is the one variable read by the guard (or
/// the init's source) that is neither declared nor stepped by the loop
/// itself; it must not occur in the body. Returns the control variable
/// when compatible.
pub fn loop_compat(stmt: &For) -> Option<Ident> {
    let mut iters: Vec<Ident> = Vec::new();
    let mut decls: Vec<Ident> = Vec::new();
    let mut srcs: Vec<Ident> = Vec::new();
    if let Some(init) = &stmt.init {
        collect_init(init, &mut iters, &mut decls, &mut srcs);
    }
    if let Some(step) = &stmt.step {
        for var in stmt_variables(step) {
            if !iters.contains(&var) {
                iters.push(var);
            }
        }
    }
    let conds = stmt
        .cond
        .as_ref()
        .map(expr_variables)
        .unwrap_or_default();

    let mut controls: Vec<Ident> = Vec::new();
    for var in conds.iter().chain(srcs.iter()) {
        if !decls.contains(var) && !iters.contains(var) && !controls.contains(var) {
            controls.push(var.clone());
        }
    }
    if controls.len() != 1 {
        tracing::debug!(?controls, "no single loop control variable");
        return None;
    }
    let x_var = controls.remove(0);

    let mut body_vars = Collector::default();
    body_vars.walk_block(&stmt.body);
    if body_vars.order.contains(&x_var) {
        tracing::warn!(%x_var, "loop control variable occurs in loop body");
        return None;
    }
    Some(x_var)
}

fn collect_init(init: &Stmt, iters: &mut Vec<Ident>, decls: &mut Vec<Ident>, srcs: &mut Vec<Ident>) {
    match init {
        Stmt::Assign(assign) => {
            iters.push(assign.target.clone());
            if let Some(name) = assign.value.as_var() {
                srcs.push(name.clone());
            }
        }
        Stmt::Decl(decl) => {
            decls.push(decl.var.clone());
            if let Some(name) = decl.init.as_ref().and_then(Expr::as_var) {
                srcs.push(name.clone());
            }
        }
        Stmt::Block(block) => {
            for stmt in &block.statements {
                collect_init(stmt, iters, decls, srcs);
            }
        }
        _ => {}
    }
}

/// Count the loops of a function (while and for, nested included).
pub fn count_loops(func: &Function) -> usize {
    fn walk_block(block: &Block) -> usize {
        block.statements.iter().map(walk_stmt).sum()
    }
    fn walk_stmt(stmt: &Stmt) -> usize {
        match stmt {
            Stmt::While(w) => 1 + walk_block(&w.body),
            Stmt::For(f) => 1 + walk_block(&f.body),
            Stmt::If(i) => {
                walk_block(&i.then_branch)
                    + i.else_branch.as_ref().map(walk_block).unwrap_or_default()
            }
            Stmt::Block(b) => walk_block(b),
            _ => 0,
        }
    }
    walk_block(&func.body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(source: &str) -> Function {
        let (program, errors) = mwp_parser::parse(source);
        assert!(errors.is_empty(), "{errors:?}");
        program.functions.into_iter().next().unwrap()
    }

    #[test]
    fn test_collect_variables_order() {
        let func = function("int f(int a, int b){ int c; c = b + a; int d = c; }");
        assert_eq!(collect_variables(&func), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_collect_includes_condition_variables() {
        let func = function("int f(int x){ while(x < y){ x = x + 1; } }");
        assert_eq!(collect_variables(&func), vec!["x", "y"]);
    }

    #[test]
    fn test_coverage_full() {
        let func = function("int f(int x, int y){ x = y + 1; if(x > 0){ x = y; } }");
        assert!(Coverage::check(&func).full());
    }

    #[test]
    fn test_coverage_flags_division() {
        let func = function("int f(int n){ n = n / 2; }");
        let coverage = Coverage::check(&func);
        assert_eq!(coverage.unsupported, vec!["operator /"]);
    }

    #[test]
    fn test_coverage_ignores_guards() {
        // `%` in the guard is fine, conditions carry no flows
        let func = function("int f(int n, int r){ if(n % 2 == 1){ r = r + 1; } }");
        assert!(Coverage::check(&func).full());
    }

    #[test]
    fn test_coverage_flags_calls_and_compound() {
        let func = function("int f(int x){ x = g(x); x += 1; assert(x); }");
        let coverage = Coverage::check(&func);
        assert_eq!(
            coverage.unsupported,
            vec!["call to g", "compound assignment"]
        );
    }

    #[test]
    fn test_loop_compat_bounded() {
        let func = function("int f(int n){ int s; for(int i = 0; i < n; i++){ s = s + 1; } }");
        let Stmt::For(stmt) = &func.body.statements[1] else {
            panic!("expected for");
        };
        assert_eq!(loop_compat(stmt), Some(Ident::new("n")));
    }

    #[test]
    fn test_loop_compat_rejects_control_in_body() {
        let func = function("int f(int n){ int s; for(int i = 0; i < n; i++){ n = n + 1; } }");
        let Stmt::For(stmt) = &func.body.statements[1] else {
            panic!("expected for");
        };
        assert_eq!(loop_compat(stmt), None);
    }

    #[test]
    fn test_loop_compat_rejects_multiple_controls() {
        let func = function("int f(int n, int m){ int s; for(int i = 0; i < n + m; i++){ s = s + 1; } }");
        let Stmt::For(stmt) = &func.body.statements[1] else {
            panic!("expected for");
        };
        assert_eq!(loop_compat(stmt), None);
    }

    #[test]
    fn test_count_loops() {
        let func = function(
            "int f(int n){ while(n > 0){ for(int i = 0; i < n; i++){ n = n - 1; } } if(n){ while(n){ n = n - 1; } } }",
        );
        assert_eq!(count_loops(&func), 3);
    }
}
