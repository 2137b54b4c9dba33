// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Parser error types.

use crate::lexer::{Token, TokenKind};
use mwp_ast::span::Span;
use thiserror::Error;

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A parsing error.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token {found:?}, expected {expected}")]
    UnexpectedToken {
        span: Span,
        found: TokenKind,
        expected: String,
    },

    #[error("expected identifier")]
    ExpectedIdentifier { span: Span },

    #[error("unexpected end of file")]
    UnexpectedEof { span: Span },

    #[error("unrecognized input")]
    InvalidToken { span: Span },
}

impl ParseError {
    /// Create an unexpected token error.
    pub fn unexpected(token: &Token, expected: impl Into<String>) -> Self {
        match token.kind {
            TokenKind::Eof => Self::UnexpectedEof { span: token.span },
            TokenKind::Error => Self::InvalidToken { span: token.span },
            _ => Self::UnexpectedToken {
                span: token.span,
                found: token.kind.clone(),
                expected: expected.into(),
            },
        }
    }

    /// Get the span of this error.
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::ExpectedIdentifier { span } => *span,
            Self::UnexpectedEof { span } => *span,
            Self::InvalidToken { span } => *span,
        }
    }

    /// Format this error with line:column information from source.
    pub fn format_with_source(&self, source: &str) -> String {
        format!("{}: {}", self.span().format_location(source), self)
    }
}
