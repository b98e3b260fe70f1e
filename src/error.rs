//! Parse-error taxonomy.
//!
//! All runtime failure modes of the crate are concentrated here: the
//! tokenizer and parser fail with a [`ParseError`], while the safety analyzer
//! and the transformation passes are infallible by construction.

use thiserror::Error;

/// What went wrong while tokenizing or parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A general syntax error with a CPython-style message.
    Syntax(String),
    /// The parser saw a token it did not expect.
    UnexpectedToken { expected: String, found: String },
    /// A string literal ran past the end of its line or file.
    UnterminatedString,
    /// Indentation that does not line up with any open block, or a missing
    /// indented block after a compound-statement header.
    Indentation(String),
}

/// A tokenizer or parser failure, positioned at a 1-based line and 0-based
/// column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {line}, column {col}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: u32,
    pub col: u32,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorKind::Syntax(msg) => write!(f, "SyntaxError: {msg}"),
            ParseErrorKind::UnexpectedToken { expected, found } => {
                write!(f, "SyntaxError: expected {expected}, found {found}")
            }
            ParseErrorKind::UnterminatedString => {
                write!(f, "SyntaxError: unterminated string literal")
            }
            ParseErrorKind::Indentation(msg) => write!(f, "IndentationError: {msg}"),
        }
    }
}

impl ParseError {
    pub fn syntax(msg: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            kind: ParseErrorKind::Syntax(msg.into()),
            line,
            col,
        }
    }

    pub fn unexpected(
        expected: impl Into<String>,
        found: impl Into<String>,
        line: u32,
        col: u32,
    ) -> Self {
        Self {
            kind: ParseErrorKind::UnexpectedToken {
                expected: expected.into(),
                found: found.into(),
            },
            line,
            col,
        }
    }

    pub fn unterminated_string(line: u32, col: u32) -> Self {
        Self {
            kind: ParseErrorKind::UnterminatedString,
            line,
            col,
        }
    }

    pub fn indentation(msg: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            kind: ParseErrorKind::Indentation(msg.into()),
            line,
            col,
        }
    }
}
