//! Recursive-descent Python parser.
//!
//! Produces the tagged [`Module`](crate::ast::Module) tree from a source
//! string via the zero-copy [`Tokenizer`].  Two entry points:
//!
//! - [`parse`] — a full module
//! - [`parse_expression`] — a single expression, no statement machinery
//!
//! The parser materializes the whole token stream up front and walks it by
//! index; deeper lookahead (soft keywords, keyword arguments) is done by
//! saving and restoring that index.  There is no error recovery — the first
//! unexpected token aborts with a [`ParseError`].

pub mod lexer;

mod expr;
mod pattern;
mod stmt;

use crate::ast::{Expr, Module, Span, Stmt};
use crate::error::ParseError;
use lexer::{Token, TokenKind, Tokenizer};

// ── Public entry points ───────────────────────────────────────────────────────

/// Parse a complete module.  Empty input parses to `Module { body: [] }`.
pub fn parse(source: &str) -> Result<Module, ParseError> {
    Parser::new(source)?.parse_module()
}

/// Parse a single expression (`a < b <= c`, `f"{x:.2f}"`, …).
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    Parser::new(source)?.parse_expression_input()
}

// ── Parser ────────────────────────────────────────────────────────────────────

pub(crate) struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    idx: usize,
    /// End position of the most recently consumed token, for node spans.
    last_end: (u32, u32),
}

impl<'src> Parser<'src> {
    pub(crate) fn new(source: &'src str) -> Result<Self, ParseError> {
        let tokens = Tokenizer::new(source).tokenize()?;
        Ok(Self {
            tokens,
            idx: 0,
            last_end: (1, 0),
        })
    }

    // ── module / expression drivers ───────────────────────────────────────────

    fn parse_module(&mut self) -> Result<Module, ParseError> {
        let mut body = Vec::new();
        self.skip_newlines();
        while self.peek().kind != TokenKind::EndOfInput {
            self.parse_statement(&mut body)?;
            self.skip_newlines();
        }
        Ok(Module { body })
    }

    fn parse_expression_input(&mut self) -> Result<Expr, ParseError> {
        self.skip_newlines();
        let expr = self.parse_testlist_star()?;
        self.skip_newlines();
        if self.peek().kind != TokenKind::EndOfInput {
            return Err(self.unexpected("end of input"));
        }
        Ok(expr)
    }

    // ── token cursor ──────────────────────────────────────────────────────────

    fn peek(&self) -> &Token<'src> {
        &self.tokens[self.idx.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token<'src> {
        &self.tokens[(self.idx + offset).min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token<'src> {
        let tok = self.tokens[self.idx.min(self.tokens.len() - 1)];
        if self.idx < self.tokens.len() - 1 {
            self.idx += 1;
        }
        self.last_end = tok.end;
        tok
    }

    /// Save the cursor for tentative parsing (soft-keyword disambiguation).
    fn save(&self) -> usize {
        self.idx
    }

    fn restore(&mut self, idx: usize) {
        self.idx = idx;
    }

    // ── classification helpers ────────────────────────────────────────────────

    fn at_op(&self, op: &str) -> bool {
        let t = self.peek();
        t.kind == TokenKind::Op && t.text == op
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<Token<'src>, ParseError> {
        if self.at_op(op) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(&format!("`{op}`")))
        }
    }

    /// True when the next token is the given word (keywords are plain `Name`
    /// tokens; the parser dispatches on the lexeme).
    fn at_keyword(&self, word: &str) -> bool {
        let t = self.peek();
        t.kind == TokenKind::Name && t.text == word
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.at_keyword(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, word: &str) -> Result<Token<'src>, ParseError> {
        if self.at_keyword(word) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(&format!("`{word}`")))
        }
    }

    /// Consume an identifier.  Hard keywords are rejected; the soft keywords
    /// `match`, `case` and `type` are accepted.
    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        let t = *self.peek();
        if t.kind == TokenKind::Name && !lexer::is_keyword(t.text) {
            self.bump();
            Ok(t.text.to_string())
        } else {
            Err(self.unexpected("an identifier"))
        }
    }

    /// True when the next token starts an expression (used for optional
    /// values after `return`, `raise`, `yield`).
    fn at_expression_start(&self) -> bool {
        let t = self.peek();
        match t.kind {
            TokenKind::Name => !matches!(
                t.text,
                "import"
                    | "from"
                    | "as"
                    | "in"
                    | "is"
                    | "and"
                    | "or"
                    | "if"
                    | "else"
                    | "elif"
                    | "for"
                    | "while"
                    | "pass"
                    | "break"
                    | "continue"
                    | "return"
                    | "raise"
                    | "def"
                    | "class"
                    | "with"
                    | "try"
                    | "except"
                    | "finally"
                    | "global"
                    | "nonlocal"
                    | "del"
                    | "assert"
            ),
            TokenKind::Number | TokenKind::String => true,
            TokenKind::Op => matches!(
                t.text,
                "(" | "[" | "{" | "+" | "-" | "~" | "*" | "**" | "..."
            ),
            _ => false,
        }
    }

    // ── statement boundaries ──────────────────────────────────────────────────

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.bump();
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Dedent | TokenKind::EndOfInput
        ) || self.at_op(";")
    }

    /// Consume the logical end of a simple statement: a newline, or nothing
    /// when the statement sits right before a dedent or the end of input.
    /// Semicolons are handled by the simple-statement-list loop.
    fn expect_statement_end(&mut self) -> Result<(), ParseError> {
        match self.peek().kind {
            TokenKind::Newline => {
                self.bump();
                Ok(())
            }
            TokenKind::Dedent | TokenKind::EndOfInput => Ok(()),
            TokenKind::Op if self.peek().text == ";" => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    // ── errors and spans ──────────────────────────────────────────────────────

    fn unexpected(&self, expected: &str) -> ParseError {
        let t = self.peek();
        ParseError::unexpected(expected, t.describe(), t.start.0, t.start.1)
    }

    fn start(&self) -> (u32, u32) {
        self.peek().start
    }

    /// Span from a recorded start position to the end of the last consumed
    /// token.
    fn span_from(&self, start: (u32, u32)) -> Span {
        Span {
            line: start.0,
            col: start.1,
            end_line: self.last_end.0,
            end_col: self.last_end.1,
        }
    }

    fn stmt(&self, kind: crate::ast::StmtKind, start: (u32, u32)) -> Stmt {
        Stmt::new(kind, self.span_from(start))
    }

    fn expr(&self, kind: crate::ast::ExprKind, start: (u32, u32)) -> Expr {
        Expr::new(kind, self.span_from(start))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
