// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Lexer for the C-like surface syntax.
//!
//! Converts source text into a stream of tokens. The token set covers the
//! restricted imperative fragment: integer declarations, assignments,
//! arithmetic and comparison operators, control flow keywords, and the
//! pointer/array punctuation needed to at least *recognize* constructs the
//! analysis will reject.

use logos::Logos;
use mwp_ast::span::Span;
use smol_str::SmolStr;

/// A token with its span in the source.
#[derive(Debug, Clone)]
pub struct Token {
    /// The kind of this token.
    pub kind: TokenKind,
    /// The source span of this token.
    pub span: Span,
}

impl Token {
    /// Create a new token with the given kind and span.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Token kinds produced by the lexer.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
#[logos(skip r"#[^\n]*")]
pub enum TokenKind {
    // === Keywords ===
    /// The `int` type keyword.
    #[token("int")]
    Int,
    /// The `void` type keyword.
    #[token("void")]
    Void,
    /// The `if` keyword.
    #[token("if")]
    If,
    /// The `else` keyword.
    #[token("else")]
    Else,
    /// The `while` keyword.
    #[token("while")]
    While,
    /// The `for` keyword.
    #[token("for")]
    For,
    /// The `break` keyword.
    #[token("break")]
    Break,
    /// The `continue` keyword.
    #[token("continue")]
    Continue,
    /// The `return` keyword.
    #[token("return")]
    Return,
    /// The `sizeof` operator keyword.
    #[token("sizeof")]
    Sizeof,

    // === Literals & identifiers ===
    /// An integer literal.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLit(i64),
    /// An identifier.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| SmolStr::new(lex.slice()))]
    Ident(SmolStr),

    // === Punctuation ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,

    // === Operators ===
    #[token("=")]
    Assign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("&")]
    Amp,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,

    /// A byte sequence the lexer could not match.
    Error,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// True for the compound assignment operators (`+=` and friends),
    /// which the analysis treats as unsupported syntax.
    pub fn is_compound_assign(&self) -> bool {
        matches!(
            self,
            TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::PercentAssign
        )
    }
}

/// Tokenize an entire source string, appending a final `Eof` token.
///
/// Unlexable input becomes `Error` tokens rather than stopping the
/// stream, so the parser can report them with a location.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let kind = result.unwrap_or(TokenKind::Error);
        tokens.push(Token::new(kind, lexer.span().into()));
    }
    let end = source.len() as u32;
    tokens.push(Token::new(TokenKind::Eof, Span::new(end, end)));
    tokens
}
