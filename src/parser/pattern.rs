//! `match` statements and the pattern sub-grammar.
//!
//! `match` is a soft keyword: the statement form is committed only after a
//! tentative parse finds `match <subject>:` — anything else rewinds the token
//! index and falls back to an ordinary expression statement.

use super::lexer::TokenKind;
use super::Parser;
use crate::ast::{Constant, Expr, ExprKind, MatchCase, Pattern, Stmt, StmtKind};
use crate::error::ParseError;

impl<'src> Parser<'src> {
    // ── match statement ───────────────────────────────────────────────────────

    /// Try to parse a `match` statement; `None` means the `match` token is an
    /// ordinary identifier and the caller should parse an expression
    /// statement instead.
    pub(super) fn try_parse_match(&mut self) -> Result<Option<Stmt>, ParseError> {
        let start = self.start();
        let save = self.save();
        self.expect_keyword("match")?;

        // Tokens that can only continue an expression rule the statement
        // form out immediately: `match = 5`, `match.group(0)`, `match:`…
        let next = self.peek();
        let expression_like = match next.kind {
            TokenKind::Newline | TokenKind::Dedent | TokenKind::EndOfInput => true,
            TokenKind::Op => matches!(
                next.text,
                "=" | ":=" | ":" | "." | "," | ";" | ")" | "]" | "}" | "==" | "!=" | "<" | ">"
                    | "<=" | ">=" | "+=" | "-=" | "*=" | "/=" | "//=" | "%=" | "**=" | "&="
                    | "|=" | "^=" | ">>=" | "<<=" | "@="
            ),
            _ => false,
        };
        if expression_like {
            self.restore(save);
            return Ok(None);
        }

        // Tentative subject parse; `match(x)` and friends rewind here.
        let subject = match self.parse_testlist_star() {
            Ok(e) => e,
            Err(_) => {
                self.restore(save);
                return Ok(None);
            }
        };
        if !self.at_op(":") {
            self.restore(save);
            return Ok(None);
        }

        self.bump();
        if self.peek().kind != TokenKind::Newline {
            return Err(self.unexpected("a newline after `match ...:`"));
        }
        self.bump();
        if self.peek().kind != TokenKind::Indent {
            let t = self.peek();
            return Err(ParseError::indentation(
                "expected an indented block",
                t.start.0,
                t.start.1,
            ));
        }
        self.bump();

        let mut cases = Vec::new();
        self.skip_newlines();
        while self.at_keyword("case") {
            cases.push(self.parse_match_case()?);
            self.skip_newlines();
        }
        if cases.is_empty() {
            return Err(self.unexpected("`case`"));
        }
        if self.peek().kind == TokenKind::Dedent {
            self.bump();
        }
        Ok(Some(self.stmt(
            StmtKind::Match {
                subject: Box::new(subject),
                cases,
            },
            start,
        )))
    }

    fn parse_match_case(&mut self) -> Result<MatchCase, ParseError> {
        self.expect_keyword("case")?;
        let pattern = self.parse_patterns()?;
        let guard = if self.eat_keyword("if") {
            Some(Box::new(self.parse_test()?))
        } else {
            None
        };
        let body = self.parse_suite()?;
        Ok(MatchCase {
            pattern,
            guard,
            body,
        })
    }

    // ── patterns ──────────────────────────────────────────────────────────────

    /// A case header pattern: an open sequence (`case a, b:`) or a single
    /// pattern.
    fn parse_patterns(&mut self) -> Result<Pattern, ParseError> {
        let first = self.parse_as_pattern()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut patterns = vec![first];
        while self.eat_op(",") {
            if self.at_op(":") || self.at_keyword("if") {
                break;
            }
            patterns.push(self.parse_as_pattern()?);
        }
        Ok(Pattern::MatchSequence { patterns })
    }

    /// `p | q | ...` with an optional trailing `as name`.
    fn parse_as_pattern(&mut self) -> Result<Pattern, ParseError> {
        let pattern = self.parse_or_pattern()?;
        if self.eat_keyword("as") {
            let name = self.expect_identifier()?;
            return Ok(Pattern::MatchAs {
                pattern: Some(Box::new(pattern)),
                name: Some(name),
            });
        }
        Ok(pattern)
    }

    fn parse_or_pattern(&mut self) -> Result<Pattern, ParseError> {
        let first = self.parse_closed_pattern()?;
        if !self.at_op("|") {
            return Ok(first);
        }
        let mut patterns = vec![first];
        while self.eat_op("|") {
            patterns.push(self.parse_closed_pattern()?);
        }
        Ok(Pattern::MatchOr { patterns })
    }

    fn parse_closed_pattern(&mut self) -> Result<Pattern, ParseError> {
        let t = *self.peek();
        match t.kind {
            TokenKind::Op if t.text == "(" => {
                self.bump();
                if self.eat_op(")") {
                    return Ok(Pattern::MatchSequence { patterns: vec![] });
                }
                let first = self.parse_as_pattern()?;
                if self.at_op(",") {
                    let mut patterns = vec![first];
                    while self.eat_op(",") {
                        if self.at_op(")") {
                            break;
                        }
                        patterns.push(self.parse_as_pattern()?);
                    }
                    self.expect_op(")")?;
                    return Ok(Pattern::MatchSequence { patterns });
                }
                self.expect_op(")")?;
                Ok(first)
            }
            TokenKind::Op if t.text == "[" => {
                self.bump();
                let mut patterns = Vec::new();
                while !self.at_op("]") {
                    patterns.push(self.parse_as_pattern()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("]")?;
                Ok(Pattern::MatchSequence { patterns })
            }
            TokenKind::Op if t.text == "{" => self.parse_mapping_pattern(),
            TokenKind::Op if t.text == "*" => {
                self.bump();
                let name = self.expect_identifier()?;
                let name = if name == "_" { None } else { Some(name) };
                Ok(Pattern::MatchStar { name })
            }
            TokenKind::Op if t.text == "-" => {
                // Negative literal pattern.
                let value = self.parse_literal_pattern_expr()?;
                Ok(Pattern::MatchValue {
                    value: Box::new(value),
                })
            }
            TokenKind::Number | TokenKind::String => {
                let value = self.parse_literal_pattern_expr()?;
                Ok(Pattern::MatchValue {
                    value: Box::new(value),
                })
            }
            TokenKind::Name => match t.text {
                "None" => {
                    self.bump();
                    Ok(Pattern::MatchSingleton {
                        value: Constant::None,
                    })
                }
                "True" => {
                    self.bump();
                    Ok(Pattern::MatchSingleton {
                        value: Constant::Bool(true),
                    })
                }
                "False" => {
                    self.bump();
                    Ok(Pattern::MatchSingleton {
                        value: Constant::Bool(false),
                    })
                }
                "_" => {
                    self.bump();
                    Ok(Pattern::MatchAs {
                        pattern: None,
                        name: None,
                    })
                }
                _ => self.parse_name_or_class_pattern(),
            },
            _ => Err(self.unexpected("a pattern")),
        }
    }

    /// Literal patterns reuse the expression parser at unary level so that
    /// numbers, strings and negative numbers come out as constants.
    fn parse_literal_pattern_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        if self.eat_op("-") {
            let operand = self.parse_primary()?;
            return Ok(self.expr(
                ExprKind::UnaryOp {
                    op: crate::ast::UnaryOperator::USub,
                    operand: Box::new(operand),
                },
                start,
            ));
        }
        self.parse_primary()
    }

    /// A bare name (capture), a dotted value, or a class pattern.
    fn parse_name_or_class_pattern(&mut self) -> Result<Pattern, ParseError> {
        let start = self.start();
        let id = self.expect_identifier()?;
        let mut value: Expr = self.expr(ExprKind::Name { id: id.clone() }, start);
        let mut dotted = false;
        while self.at_op(".") {
            self.bump();
            let attr = self.expect_identifier()?;
            dotted = true;
            value = self.expr(
                ExprKind::Attribute {
                    value: Box::new(value),
                    attr,
                },
                start,
            );
        }

        if self.at_op("(") {
            return self.parse_class_pattern(value);
        }
        if dotted {
            return Ok(Pattern::MatchValue {
                value: Box::new(value),
            });
        }
        // A bare name captures.
        Ok(Pattern::MatchAs {
            pattern: None,
            name: Some(id),
        })
    }

    fn parse_class_pattern(&mut self, cls: Expr) -> Result<Pattern, ParseError> {
        self.expect_op("(")?;
        let mut patterns = Vec::new();
        let mut kwd_attrs = Vec::new();
        let mut kwd_patterns = Vec::new();
        while !self.at_op(")") {
            if self.peek().kind == TokenKind::Name
                && self.peek_at(1).kind == TokenKind::Op
                && self.peek_at(1).text == "="
            {
                let attr = self.expect_identifier()?;
                self.expect_op("=")?;
                kwd_attrs.push(attr);
                kwd_patterns.push(self.parse_as_pattern()?);
            } else {
                patterns.push(self.parse_as_pattern()?);
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok(Pattern::MatchClass {
            cls: Box::new(cls),
            patterns,
            kwd_attrs,
            kwd_patterns,
        })
    }

    fn parse_mapping_pattern(&mut self) -> Result<Pattern, ParseError> {
        self.expect_op("{")?;
        let mut keys = Vec::new();
        let mut patterns = Vec::new();
        let mut rest = None;
        while !self.at_op("}") {
            if self.eat_op("**") {
                rest = Some(self.expect_identifier()?);
                let _ = self.eat_op(",");
                break;
            }
            keys.push(self.parse_literal_pattern_expr()?);
            self.expect_op(":")?;
            patterns.push(self.parse_as_pattern()?);
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op("}")?;
        Ok(Pattern::MatchMapping {
            keys,
            patterns,
            rest,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
