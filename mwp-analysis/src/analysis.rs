// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! The mwp-flow analyzer.
//!
//! Structural recursion over the statement tree, composing one relation
//! (or disjunction of relations) per statement. Each binary arithmetic
//! assignment opens one non-deterministic derivation point with three
//! choices; loops take the star of their body relation followed by the
//! applicable correction. A delta graph accumulates the `∞`-labeled
//! sequences so the traversal can stop as soon as failure is
//! unavoidable.

use mwp_ast::span::Span;
use mwp_ast::*;
use rustc_hash::FxHashSet;

use crate::bound::Bound;
use crate::delta_graph::DeltaGraph;
use crate::error::AnalysisResult;
use crate::polynomial::Polynomial;
use crate::relation_list::RelationList;
use crate::result::{FuncResult, FuncStatus, Report};
use crate::semiring::Scalar;
use crate::syntax::{self, Coverage};

/// The derivation choices available at every non-deterministic point.
pub const DOMAIN: [u8; 3] = [0, 1, 2];

/// Analyzer configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisConfig {
    /// Reject functions containing any unsupported construct instead
    /// of skipping the construct with a warning.
    pub strict: bool,
    /// Run every function to completion and keep the full matrix even
    /// when infinity is detected early.
    pub fin: bool,
}

/// Analyze a whole program.
pub fn analyze_program(program: &Program, config: AnalysisConfig) -> Report {
    let mut report = Report::new();
    report.program.n_functions = program.functions.len();
    report.program.n_loops = program.functions.iter().map(syntax::count_loops).sum();
    report.program.n_variables = program
        .functions
        .iter()
        .map(|f| syntax::collect_variables(f).len())
        .sum();
    for func in &program.functions {
        report.add(analyze_function(func, config));
    }
    report.on_end();
    report
}

/// Analyze a single function.
pub fn analyze_function(func: &Function, config: AnalysisConfig) -> FuncResult {
    tracing::info!(name = %func.name, "analyzing function");
    let mut result = FuncResult::new(func.name.clone());

    let coverage = Coverage::check(func);
    if !coverage.full() {
        for construct in &coverage.unsupported {
            tracing::warn!(name = %func.name, %construct, "unsupported syntax");
        }
        if config.strict {
            result.status = FuncStatus::Unsupported;
            result.warnings = coverage.unsupported;
            result.on_end();
            return result;
        }
    }

    let variables = syntax::collect_variables(func);
    tracing::debug!(name = %func.name, ?variables, "function variables");
    let mut relations = RelationList::identity(variables);
    let mut ctx = Context::new(!config.fin);

    let delta_infty = match analyze_body(&mut relations, &mut ctx, &func.body.statements) {
        Ok(infty) => infty,
        Err(e) => {
            tracing::error!(name = %func.name, error = %e, "analysis aborted");
            result.status = FuncStatus::Error;
            result.warnings.push(e.to_string());
            result.on_end();
            return result;
        }
    };

    // evaluate surviving choices and, if any, extract the bound
    let mut choices = None;
    if !delta_infty {
        let evaluated = relations.first().eval(&DOMAIN, ctx.index);
        if !evaluated.infinite() {
            let witness = evaluated.first().unwrap_or_default();
            let bound = Bound::calculate(&relations.first().apply_choice(&witness));
            result.set_bound(bound);
        }
        choices = Some(evaluated);
    }
    let infinite = delta_infty || choices.as_ref().is_some_and(|c| c.infinite());

    result.index = ctx.index;
    result.infinite = infinite;
    result.status = if infinite {
        FuncStatus::Infinite
    } else {
        FuncStatus::Bounded
    };
    result.variables = relations.first().variables.clone();
    result.warnings = ctx.warnings;
    result.returns = ctx.returns;
    if !(infinite && ctx.stop) {
        result.relation = Some(relations.first().clone());
    }
    if infinite && !ctx.stop {
        let relation = relations.first();
        let failing: FxHashSet<Ident> = relation
            .variables
            .iter()
            .filter(|v| relation.var_eval(&DOMAIN, ctx.index, v).infinite())
            .cloned()
            .collect();
        result.problematic_flows = relation.infty_vars(Some(&failing));
        tracing::info!(name = %func.name, flows = %relation.infty_pairs(Some(&failing)),
            "problematic flows");
    }
    if !infinite {
        result.choices = choices;
        if let Some(bound) = &result.bound_fmt {
            tracing::info!(name = %func.name, %bound, "bound found");
        }
    }
    result.on_end();
    result
}

/// Per-function traversal state.
struct Context {
    /// Next derivation point index.
    index: usize,
    /// Accumulated `∞` sequences.
    dg: DeltaGraph,
    /// Constructs skipped during traversal.
    warnings: Vec<String>,
    /// Variable named by a `return`, if seen.
    returns: Option<Ident>,
    /// Stop as soon as infinity is unavoidable.
    stop: bool,
}

impl Context {
    fn new(stop: bool) -> Self {
        Self {
            index: 0,
            dg: DeltaGraph::new(DOMAIN.len()),
            warnings: Vec::new(),
            returns: None,
            stop,
        }
    }

    fn skip_unsupported(&mut self, construct: &str) -> (RelationList, bool) {
        tracing::warn!(construct, "skipping unsupported syntax");
        self.warnings.push(construct.to_string());
        (RelationList::default(), false)
    }
}

/// Analyze a statement sequence, composing into `relations`. Returns
/// true when the delta graph proves failure unavoidable.
fn analyze_body(
    relations: &mut RelationList,
    ctx: &mut Context,
    statements: &[Stmt],
) -> AnalysisResult<bool> {
    let mut delta_infty = false;
    for (i, stmt) in statements.iter().enumerate() {
        tracing::debug!(stmt = i, total = statements.len(), "computing relation");
        let (rel_list, exit) = compute_relation(ctx, stmt)?;
        delta_infty = delta_infty || exit;
        if ctx.stop && delta_infty {
            tracing::debug!("failure is unavoidable, stopping early");
            break;
        }
        relations.composition(&rel_list)?;
    }
    Ok(delta_infty)
}

/// The relation(s) of one statement, plus an early-exit flag.
fn compute_relation(ctx: &mut Context, stmt: &Stmt) -> AnalysisResult<(RelationList, bool)> {
    match stmt {
        Stmt::Decl(decl) => match &decl.init {
            Some(init) => assign(ctx, &decl.var, init),
            None => Ok((RelationList::default(), false)),
        },
        Stmt::Assign(node) => assign(ctx, &node.target, &node.value),
        Stmt::Expr(node) => expr_stmt(ctx, &node.expr),
        Stmt::If(node) => if_stmt(ctx, node),
        Stmt::While(node) => while_loop(ctx, node),
        Stmt::For(node) => for_loop(ctx, node),
        Stmt::Block(block) => compound(ctx, &block.statements),
        Stmt::Return(node) => {
            if let Some(name) = node.value.as_ref().and_then(Expr::as_var) {
                ctx.returns = Some(name.clone());
            }
            Ok((RelationList::default(), false))
        }
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => {
            Ok((RelationList::default(), false))
        }
        Stmt::Unsupported(node) => Ok(ctx.skip_unsupported(&node.construct)),
    }
}

/// Analyze `x = e` for every supported right-hand side.
fn assign(ctx: &mut Context, target: &Ident, value: &Expr) -> AnalysisResult<(RelationList, bool)> {
    match value {
        // x = c: the constant replaces all previous flows into x
        Expr::Const { .. } => Ok((constant(target), false)),
        // x = y: unit flow from y to x
        Expr::Var { name, .. } => Ok((copy(target, name), false)),
        Expr::Binary { op, lhs, rhs, .. } => {
            if !op.is_arithmetic() {
                return Ok(ctx.skip_unsupported(&format!("operator {op}")));
            }
            if !lhs.is_atom() || !rhs.is_atom() {
                return Ok(ctx.skip_unsupported("nested expression"));
            }
            Ok((binary_op(ctx, target, *op, lhs, rhs), false))
        }
        Expr::Unary { op, arg, .. } => unary_assign(ctx, target, *op, arg),
        Expr::Call { callee, .. } => Ok(ctx.skip_unsupported(&format!("call to {callee}"))),
        Expr::Index { .. } => Ok(ctx.skip_unsupported("array subscript")),
        Expr::Deref { .. } => Ok(ctx.skip_unsupported("pointer dereference")),
        Expr::AddrOf { .. } => Ok(ctx.skip_unsupported("address-of")),
    }
}

/// `x = c`: a zero relation over `[x]`; composition erases the column.
fn constant(target: &Ident) -> RelationList {
    RelationList::from_variables(vec![target.clone()])
}

/// `x = y` with distinct variables.
fn copy(target: &Ident, source: &Ident) -> RelationList {
    if target == source {
        return RelationList::default();
    }
    let vector = vec![Polynomial::zero(), Polynomial::unit()];
    let mut rel_list = RelationList::identity(vec![target.clone(), source.clone()]);
    rel_list.replace_column(&vector, target);
    rel_list
}

/// `x = y ⊕ z`: one fresh derivation point, three choices, the column
/// of `x` encoding the operand flows per choice.
fn binary_op(ctx: &mut Context, target: &Ident, op: BinOp, lhs: &Expr, rhs: &Expr) -> RelationList {
    let y = lhs.as_var();
    let z = rhs.as_var();
    if y.is_none() && z.is_none() {
        // both operands literal: equivalent to a constant assignment
        return constant(target);
    }

    let unit3 = [Scalar::Unit; 3];
    let weak3 = [Scalar::Weak; 3];
    let index = ctx.index;
    let mut vector: Vec<Polynomial> = Vec::new();

    // target absent from the right-hand side: its old value is gone
    if Some(target) != y && Some(target) != z {
        vector.push(Polynomial::zero());
    }
    if y.is_none() || z.is_none() {
        vector.push(Polynomial::from_scalars(index, &unit3));
    } else if op == BinOp::Mul {
        vector.push(Polynomial::from_scalars(index, &weak3));
        if y != z {
            vector.push(Polynomial::from_scalars(index, &weak3));
        }
    } else if y == z {
        vector.push(Polynomial::from_scalars(
            index,
            &[Scalar::Poly, Scalar::Poly, Scalar::Weak],
        ));
    } else {
        vector.push(Polynomial::from_scalars(
            index,
            &[Scalar::Unit, Scalar::Poly, Scalar::Weak],
        ));
        vector.push(Polynomial::from_scalars(
            index,
            &[Scalar::Poly, Scalar::Unit, Scalar::Weak],
        ));
    }
    ctx.index += 1;

    let mut variables = vec![target.clone()];
    for operand in [y, z].into_iter().flatten() {
        if !variables.contains(operand) {
            variables.push(operand.clone());
        }
    }
    let mut rel_list = RelationList::identity(variables);
    rel_list.replace_column(&vector, target);
    rel_list
}

/// Assignments with a unary right-hand side desugar to their binary or
/// constant equivalents before analysis.
fn unary_assign(
    ctx: &mut Context,
    target: &Ident,
    op: UnOp,
    arg: &Expr,
) -> AnalysisResult<(RelationList, bool)> {
    let dummy = Span::dummy();
    let rewritten: Option<Vec<Stmt>> = match (op, arg) {
        // the operand's value is a constant either way
        (_, Expr::Const { value, .. }) if op != UnOp::Not && op != UnOp::Sizeof => {
            Some(vec![make_assign(target, make_const(*value))])
        }
        (UnOp::Not, _) => Some(vec![make_assign(target, make_const(1))]),
        (UnOp::Sizeof, _) => Some(vec![make_assign(target, make_const(64))]),
        (op, Expr::Var { name, .. }) if op.is_inc_dec() => {
            let step = inc_dec_as_binary(name, op);
            let take = make_assign(target, make_var(name));
            let prefix = matches!(op, UnOp::PreInc | UnOp::PreDec);
            Some(if prefix {
                vec![step, take]
            } else {
                vec![take, step]
            })
        }
        (UnOp::Neg, Expr::Var { name, .. }) => Some(vec![make_assign(
            target,
            Expr::Binary {
                span: dummy,
                op: BinOp::Mul,
                lhs: Box::new(make_var(name)),
                rhs: Box::new(make_const(-1)),
            },
        )]),
        (UnOp::Plus, Expr::Var { name, .. }) => Some(vec![make_assign(target, make_var(name))]),
        _ => None,
    };

    match rewritten {
        Some(statements) => compound(ctx, &statements),
        None => Ok(ctx.skip_unsupported(&format!("operator {op}"))),
    }
}

/// A standalone expression statement: only `x++`/`x--` change flows.
fn expr_stmt(ctx: &mut Context, expr: &Expr) -> AnalysisResult<(RelationList, bool)> {
    match expr {
        Expr::Unary { op, arg, .. } if op.is_inc_dec() => {
            if let Expr::Var { name, .. } = arg.as_ref() {
                let stmt = inc_dec_as_binary(name, *op);
                return compute_relation(ctx, &stmt);
            }
            Ok(ctx.skip_unsupported("nested expression"))
        }
        Expr::Call { callee, .. } if syntax::ANNOTATION_CALLS.contains(&callee.as_str()) => {
            Ok((RelationList::default(), false))
        }
        Expr::Call { callee, .. } => Ok(ctx.skip_unsupported(&format!("call to {callee}"))),
        // other expression statements have no effect on flows
        _ => Ok((RelationList::default(), false)),
    }
}

/// `x++` / `x--` as the binary statement `x = x ± 1`.
fn inc_dec_as_binary(name: &Ident, op: UnOp) -> Stmt {
    let binop = match op {
        UnOp::PreDec | UnOp::PostDec => BinOp::Sub,
        _ => BinOp::Add,
    };
    make_assign(
        name,
        Expr::Binary {
            span: Span::dummy(),
            op: binop,
            lhs: Box::new(make_var(name)),
            rhs: Box::new(make_const(1)),
        },
    )
}

fn make_assign(target: &Ident, value: Expr) -> Stmt {
    Stmt::Assign(Assign {
        span: Span::dummy(),
        target: target.clone(),
        value,
    })
}

fn make_var(name: &Ident) -> Expr {
    Expr::Var {
        span: Span::dummy(),
        name: name.clone(),
    }
}

fn make_const(value: i64) -> Expr {
    Expr::Const {
        span: Span::dummy(),
        value,
    }
}

/// Conditional: both branches analyzed independently, then joined by
/// the pairwise sum of their relation lists.
fn if_stmt(ctx: &mut Context, node: &If) -> AnalysisResult<(RelationList, bool)> {
    tracing::debug!("computing relation (conditional case)");
    let mut true_list = RelationList::default();
    if if_branch(ctx, Some(&node.then_branch), &mut true_list)? {
        return Ok((true_list, true));
    }
    let mut false_list = RelationList::default();
    if if_branch(ctx, node.else_branch.as_ref(), &mut false_list)? {
        return Ok((false_list, true));
    }
    Ok((false_list.sum(&true_list)?, false))
}

fn if_branch(
    ctx: &mut Context,
    branch: Option<&Block>,
    list: &mut RelationList,
) -> AnalysisResult<bool> {
    if let Some(block) = branch {
        for stmt in &block.statements {
            let (rel_list, exit) = compute_relation(ctx, stmt)?;
            if exit {
                return Ok(true);
            }
            list.composition(&rel_list)?;
        }
    }
    Ok(false)
}

/// Unbounded loop: star of the body relation, then the while
/// correction.
fn while_loop(ctx: &mut Context, node: &While) -> AnalysisResult<(RelationList, bool)> {
    tracing::debug!("analyzing while loop");
    let mut relations = RelationList::default();
    for stmt in &node.body.statements {
        let (rel_list, exit) = compute_relation(ctx, stmt)?;
        if exit {
            return Ok((rel_list, true));
        }
        relations.composition(&rel_list)?;
    }
    tracing::debug!("while loop fixpoint");
    relations.fixpoint()?;
    relations.while_correction(&mut ctx.dg);
    ctx.dg.fusion();
    Ok((relations, ctx.dg.forces_infinity()))
}

/// Counting loop. The bounded shape (`repeat X times`, `X` untouched)
/// gets the star plus the loop correction that records `X` as a
/// maximal dependency; any other shape is analyzed as its while-loop
/// desugaring `init; while (cond) { body; step }`.
fn for_loop(ctx: &mut Context, node: &For) -> AnalysisResult<(RelationList, bool)> {
    if let Some(x_var) = syntax::loop_compat(node) {
        tracing::debug!(control = %x_var, "analyzing bounded loop");
        let mut relations = RelationList::from_variables(vec![x_var.clone()]);
        for stmt in &node.body.statements {
            let (rel_list, exit) = compute_relation(ctx, stmt)?;
            if exit {
                return Ok((rel_list, true));
            }
            relations.composition(&rel_list)?;
        }
        tracing::debug!("bounded loop fixpoint");
        relations.fixpoint()?;
        relations.loop_correction(&x_var, &mut ctx.dg);
        ctx.dg.fusion();
        return Ok((relations, ctx.dg.forces_infinity()));
    }

    tracing::debug!("for loop is not a bounded loop, analyzing as while");
    let mut relations = RelationList::default();
    if let Some(init) = &node.init {
        let (rel_list, exit) = compute_relation(ctx, init)?;
        if exit {
            return Ok((rel_list, true));
        }
        relations.composition(&rel_list)?;
    }
    let mut body_list = RelationList::default();
    let step = node.step.as_deref();
    for stmt in node.body.statements.iter().chain(step) {
        let (rel_list, exit) = compute_relation(ctx, stmt)?;
        if exit {
            return Ok((rel_list, true));
        }
        body_list.composition(&rel_list)?;
    }
    body_list.fixpoint()?;
    body_list.while_correction(&mut ctx.dg);
    ctx.dg.fusion();
    relations.composition(&body_list)?;
    Ok((relations, ctx.dg.forces_infinity()))
}

/// A nested block: children composed in order.
fn compound(ctx: &mut Context, statements: &[Stmt]) -> AnalysisResult<(RelationList, bool)> {
    let mut relations = RelationList::default();
    for stmt in statements {
        let (rel_list, exit) = compute_relation(ctx, stmt)?;
        relations.composition(&rel_list)?;
        if exit {
            return Ok((relations, true));
        }
    }
    Ok((relations, false))
}
