// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Abstract syntax tree for the restricted imperative language analyzed
//! by the mwp analyzer.
//!
//! The tree is language-neutral: the analyzer consumes these nodes
//! regardless of which surface syntax produced them. Programs consist of
//! functions over integer variables, built from assignments, binary and
//! unary arithmetic, conditionals, bounded and unbounded loops.
//!
//! Constructs the analysis does not handle (calls, array subscripts,
//! pointer operations, compound assignment) are still representable so
//! that the analyzer can decide per its configuration whether to skip
//! them with a warning or reject the whole function.

pub mod span;

use smol_str::SmolStr;
use span::Span;

/// Interned string type for identifiers
pub type Ident = SmolStr;

/// A complete program: a collection of function definitions.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    /// Functions in declaration order
    pub functions: Vec<Function>,
}

/// A function definition.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    /// Source location of the definition
    pub span: Span,
    /// Name of the function
    pub name: Ident,
    /// Parameter names, in declaration order
    pub params: Vec<Ident>,
    /// Function body
    pub body: Block,
}

/// A braced sequence of statements.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    /// Source location of the block
    pub span: Span,
    /// Statements in source order
    pub statements: Vec<Stmt>,
}

/// A statement.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stmt {
    /// Variable declaration, with optional initializer
    Decl(Decl),
    /// Assignment to a variable
    Assign(Assign),
    /// Expression in statement position (e.g. `x++;` or a call)
    Expr(ExprStmt),
    /// Conditional statement
    If(If),
    /// Unbounded loop
    While(While),
    /// Counting loop, treated as while with prelude/step when the
    /// control variable occurs in the body
    For(For),
    /// Nested block
    Block(Block),
    /// `break;`
    Break(Span),
    /// `continue;`
    Continue(Span),
    /// `return;` or `return e;`
    Return(Return),
    /// Empty statement (stray `;`)
    Empty(Span),
    /// A statement form outside the analyzable fragment, e.g. a
    /// compound assignment or an assignment through a pointer
    Unsupported(UnsupportedStmt),
}

impl Stmt {
    /// Get the source span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Decl(d) => d.span,
            Stmt::Assign(a) => a.span,
            Stmt::Expr(e) => e.span,
            Stmt::If(i) => i.span,
            Stmt::While(w) => w.span,
            Stmt::For(f) => f.span,
            Stmt::Block(b) => b.span,
            Stmt::Break(s) | Stmt::Continue(s) | Stmt::Empty(s) => *s,
            Stmt::Return(r) => r.span,
            Stmt::Unsupported(u) => u.span,
        }
    }
}

/// A variable declaration: `int x;` or `int x = e;`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decl {
    pub span: Span,
    /// Declared variable name
    pub var: Ident,
    /// Optional initializer expression
    pub init: Option<Expr>,
}

/// A plain assignment: `x = e;`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assign {
    pub span: Span,
    /// Target variable
    pub target: Ident,
    /// Assigned expression
    pub value: Expr,
}

/// An expression in statement position.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExprStmt {
    pub span: Span,
    pub expr: Expr,
}

/// A conditional: `if (c) { … } else { … }`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct If {
    pub span: Span,
    /// Guard expression (never analyzed for flows)
    pub cond: Expr,
    /// Taken branch
    pub then_branch: Block,
    /// Optional else branch
    pub else_branch: Option<Block>,
}

/// An unbounded loop: `while (c) { … }`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct While {
    pub span: Span,
    /// Guard expression (never analyzed for flows)
    pub cond: Expr,
    pub body: Block,
}

/// A counting loop: `for (init; cond; step) { … }`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct For {
    pub span: Span,
    /// Loop prelude, e.g. `i = 0`
    pub init: Option<Box<Stmt>>,
    /// Guard expression
    pub cond: Option<Expr>,
    /// Step statement, e.g. `i++`
    pub step: Option<Box<Stmt>>,
    pub body: Block,
}

/// A return statement.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Return {
    pub span: Span,
    /// Returned expression, if any
    pub value: Option<Expr>,
}

/// A statement the analysis cannot handle.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnsupportedStmt {
    pub span: Span,
    /// Short description of the construct, e.g. `x += …`
    pub construct: SmolStr,
}

/// An expression.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    /// Variable reference
    Var { span: Span, name: Ident },
    /// Integer literal
    Const { span: Span, value: i64 },
    /// Binary operation
    Binary {
        span: Span,
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Unary operation
    Unary {
        span: Span,
        op: UnOp,
        arg: Box<Expr>,
    },
    /// Function call — not analyzable
    Call {
        span: Span,
        callee: Ident,
        args: Vec<Expr>,
    },
    /// Array subscript — not analyzable
    Index {
        span: Span,
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// Pointer dereference — not analyzable
    Deref { span: Span, arg: Box<Expr> },
    /// Address-of — not analyzable
    AddrOf { span: Span, arg: Box<Expr> },
}

impl Expr {
    /// Get the source span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Var { span, .. }
            | Expr::Const { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Call { span, .. }
            | Expr::Index { span, .. }
            | Expr::Deref { span, .. }
            | Expr::AddrOf { span, .. } => *span,
        }
    }

    /// The variable name, if this expression is a plain variable.
    pub fn as_var(&self) -> Option<&Ident> {
        match self {
            Expr::Var { name, .. } => Some(name),
            _ => None,
        }
    }

    /// True for variables and integer literals — the only operand
    /// forms a binary arithmetic assignment accepts.
    pub fn is_atom(&self) -> bool {
        matches!(self, Expr::Var { .. } | Expr::Const { .. })
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// True for the arithmetic operators the analysis derives flows for.
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul)
    }

    /// Surface syntax of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnOp {
    /// `-e`
    Neg,
    /// `+e`
    Plus,
    /// `!e`
    Not,
    /// `++x`
    PreInc,
    /// `--x`
    PreDec,
    /// `x++`
    PostInc,
    /// `x--`
    PostDec,
    /// `sizeof e`
    Sizeof,
}

impl UnOp {
    /// Surface syntax of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Plus => "+",
            UnOp::Not => "!",
            UnOp::PreInc | UnOp::PostInc => "++",
            UnOp::PreDec | UnOp::PostDec => "--",
            UnOp::Sizeof => "sizeof",
        }
    }

    /// True for `++`/`--` in either position.
    pub fn is_inc_dec(self) -> bool {
        matches!(
            self,
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec
        )
    }
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_as_var() {
        let e = Expr::Var {
            span: Span::dummy(),
            name: Ident::new("x"),
        };
        assert_eq!(e.as_var().map(|v| v.as_str()), Some("x"));
        let c = Expr::Const {
            span: Span::dummy(),
            value: 3,
        };
        assert!(c.as_var().is_none());
        assert!(c.is_atom());
    }

    #[test]
    fn test_binop_arithmetic() {
        assert!(BinOp::Add.is_arithmetic());
        assert!(BinOp::Mul.is_arithmetic());
        assert!(!BinOp::Div.is_arithmetic());
        assert!(!BinOp::Lt.is_arithmetic());
    }
}
