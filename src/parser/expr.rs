//! Expression parsing: the precedence ladder, atoms and trailers,
//! comprehensions, string literals and the f-string sub-parser.
//!
//! Precedence, low to high: walrus `:=` (right) > ternary > `or` > `and` >
//! `not` > chained comparisons > `|` > `^` > `&` > shifts > `+`/`-` >
//! `*`/`/`/`//`/`%`/`@` > unary > `**` (right) > `await` > atom-with-trailers.

use super::lexer::{Token, TokenKind, is_keyword};
use super::{Parser, parse_expression};
use crate::ast::{
    BoolOperator, CmpOperator, Comprehension, Constant, Expr, ExprKind, Keyword, Operator,
    UnaryOperator,
};
use crate::error::ParseError;

impl<'src> Parser<'src> {
    // ── testlists ─────────────────────────────────────────────────────────────

    /// An expression list that may be a bare tuple and may contain starred
    /// elements: the grammar slot of assignment values, `return`, `for` iters
    /// and subscript-free expression statements.
    pub(super) fn parse_testlist_star(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let first = self.parse_star_or_test()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if !self.at_expression_start() {
                break;
            }
            elts.push(self.parse_star_or_test()?);
        }
        Ok(self.expr(ExprKind::Tuple { elts }, start))
    }

    /// `*expr` (at bitwise-or level, per the star-expression grammar) or a
    /// plain test.
    pub(super) fn parse_star_or_test(&mut self) -> Result<Expr, ParseError> {
        if self.at_op("*") {
            let start = self.start();
            self.bump();
            let value = self.parse_bitor()?;
            return Ok(self.expr(
                ExprKind::Starred {
                    value: Box::new(value),
                },
                start,
            ));
        }
        self.parse_test()
    }

    // ── the ladder ────────────────────────────────────────────────────────────

    /// Full single expression: lambda / yield forms, ternary, walrus.
    pub(super) fn parse_test(&mut self) -> Result<Expr, ParseError> {
        if self.at_keyword("lambda") {
            return self.parse_lambda();
        }
        if self.at_keyword("yield") {
            return self.parse_yield();
        }
        let start = self.start();
        let expr = self.parse_ternary()?;
        if self.at_op(":=") {
            if !matches!(expr.kind, ExprKind::Name { .. }) {
                let t = self.peek();
                return Err(ParseError::syntax(
                    "assignment expression target must be a name",
                    t.start.0,
                    t.start.1,
                ));
            }
            self.bump();
            let value = self.parse_test()?;
            return Ok(self.expr(
                ExprKind::NamedExpr {
                    target: Box::new(expr),
                    value: Box::new(value),
                },
                start,
            ));
        }
        Ok(expr)
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let body = self.parse_or()?;
        if !self.at_keyword("if") {
            return Ok(body);
        }
        self.bump();
        let test = self.parse_or()?;
        self.expect_keyword("else")?;
        let orelse = self.parse_test()?;
        Ok(self.expr(
            ExprKind::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
            start,
        ))
    }

    pub(super) fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let first = self.parse_and()?;
        if !self.at_keyword("or") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword("or") {
            values.push(self.parse_and()?);
        }
        Ok(self.expr(
            ExprKind::BoolOp {
                op: BoolOperator::Or,
                values,
            },
            start,
        ))
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let first = self.parse_not()?;
        if !self.at_keyword("and") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword("and") {
            values.push(self.parse_not()?);
        }
        Ok(self.expr(
            ExprKind::BoolOp {
                op: BoolOperator::And,
                values,
            },
            start,
        ))
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.at_keyword("not") {
            let start = self.start();
            self.bump();
            let operand = self.parse_not()?;
            return Ok(self.expr(
                ExprKind::UnaryOp {
                    op: UnaryOperator::Not,
                    operand: Box::new(operand),
                },
                start,
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = if self.eat_op("==") {
                CmpOperator::Eq
            } else if self.eat_op("!=") {
                CmpOperator::NotEq
            } else if self.eat_op("<=") {
                CmpOperator::LtE
            } else if self.eat_op(">=") {
                CmpOperator::GtE
            } else if self.eat_op("<") {
                CmpOperator::Lt
            } else if self.eat_op(">") {
                CmpOperator::Gt
            } else if self.at_keyword("is") {
                self.bump();
                if self.eat_keyword("not") {
                    CmpOperator::IsNot
                } else {
                    CmpOperator::Is
                }
            } else if self.at_keyword("in") {
                self.bump();
                CmpOperator::In
            } else if self.at_keyword("not") && self.peek_at(1).text == "in" {
                self.bump();
                self.bump();
                CmpOperator::NotIn
            } else {
                break;
            };
            comparators.push(self.parse_bitor()?);
            ops.push(op);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(self.expr(
            ExprKind::Compare {
                left: Box::new(left),
                ops,
                comparators,
            },
            start,
        ))
    }

    fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut left = self.parse_bitxor()?;
        while self.eat_op("|") {
            let right = self.parse_bitxor()?;
            left = self.binop(left, Operator::BitOr, right, start);
        }
        Ok(left)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut left = self.parse_bitand()?;
        while self.eat_op("^") {
            let right = self.parse_bitand()?;
            left = self.binop(left, Operator::BitXor, right, start);
        }
        Ok(left)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut left = self.parse_shift()?;
        while self.eat_op("&") {
            let right = self.parse_shift()?;
            left = self.binop(left, Operator::BitAnd, right, start);
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut left = self.parse_arith()?;
        loop {
            let op = if self.eat_op("<<") {
                Operator::LShift
            } else if self.eat_op(">>") {
                Operator::RShift
            } else {
                return Ok(left);
            };
            let right = self.parse_arith()?;
            left = self.binop(left, op, right, start);
        }
    }

    fn parse_arith(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut left = self.parse_term()?;
        loop {
            let op = if self.eat_op("+") {
                Operator::Add
            } else if self.eat_op("-") {
                Operator::Sub
            } else {
                return Ok(left);
            };
            let right = self.parse_term()?;
            left = self.binop(left, op, right, start);
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut left = self.parse_factor()?;
        loop {
            let op = if self.eat_op("*") {
                Operator::Mult
            } else if self.eat_op("//") {
                Operator::FloorDiv
            } else if self.eat_op("/") {
                Operator::Div
            } else if self.eat_op("%") {
                Operator::Mod
            } else if self.eat_op("@") {
                Operator::MatMult
            } else {
                return Ok(left);
            };
            let right = self.parse_factor()?;
            left = self.binop(left, op, right, start);
        }
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let op = if self.eat_op("+") {
            UnaryOperator::UAdd
        } else if self.eat_op("-") {
            UnaryOperator::USub
        } else if self.eat_op("~") {
            UnaryOperator::Invert
        } else {
            return self.parse_power();
        };
        let operand = self.parse_factor()?;
        Ok(self.expr(
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            start,
        ))
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let base = self.parse_await_primary()?;
        if self.eat_op("**") {
            // Right-associative: the exponent re-enters at unary level.
            let exponent = self.parse_factor()?;
            return Ok(self.binop(base, Operator::Pow, exponent, start));
        }
        Ok(base)
    }

    fn parse_await_primary(&mut self) -> Result<Expr, ParseError> {
        if self.at_keyword("await") {
            let start = self.start();
            self.bump();
            let value = self.parse_await_primary()?;
            return Ok(self.expr(
                ExprKind::Await {
                    value: Box::new(value),
                },
                start,
            ));
        }
        self.parse_primary()
    }

    fn binop(&self, left: Expr, op: Operator, right: Expr, start: (u32, u32)) -> Expr {
        self.expr(
            ExprKind::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            start,
        )
    }

    // ── primaries and trailers ────────────────────────────────────────────────

    pub(super) fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let mut expr = self.parse_atom()?;
        loop {
            if self.at_op("(") {
                let (args, keywords) = self.parse_call_args()?;
                expr = self.expr(
                    ExprKind::Call {
                        func: Box::new(expr),
                        args,
                        keywords,
                    },
                    start,
                );
            } else if self.at_op("[") {
                self.bump();
                let slice = self.parse_subscript_list()?;
                self.expect_op("]")?;
                expr = self.expr(
                    ExprKind::Subscript {
                        value: Box::new(expr),
                        slice: Box::new(slice),
                    },
                    start,
                );
            } else if self.at_op(".") {
                self.bump();
                let attr = self.expect_identifier()?;
                expr = self.expr(
                    ExprKind::Attribute {
                        value: Box::new(expr),
                        attr,
                    },
                    start,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let t = *self.peek();
        match t.kind {
            TokenKind::Op if t.text == "(" => self.parse_paren_atom(),
            TokenKind::Op if t.text == "[" => self.parse_list_atom(),
            TokenKind::Op if t.text == "{" => self.parse_braced_atom(),
            TokenKind::Op if t.text == "..." => {
                self.bump();
                Ok(self.expr(
                    ExprKind::Constant {
                        value: Constant::Ellipsis,
                    },
                    start,
                ))
            }
            TokenKind::Number => {
                self.bump();
                Ok(self.expr(
                    ExprKind::Constant {
                        value: number_constant(t.text),
                    },
                    start,
                ))
            }
            TokenKind::String => self.parse_string_group(),
            TokenKind::Name => match t.text {
                "True" => {
                    self.bump();
                    Ok(self.expr(
                        ExprKind::Constant {
                            value: Constant::Bool(true),
                        },
                        start,
                    ))
                }
                "False" => {
                    self.bump();
                    Ok(self.expr(
                        ExprKind::Constant {
                            value: Constant::Bool(false),
                        },
                        start,
                    ))
                }
                "None" => {
                    self.bump();
                    Ok(self.expr(
                        ExprKind::Constant {
                            value: Constant::None,
                        },
                        start,
                    ))
                }
                name if is_keyword(name) => Err(self.unexpected("an expression")),
                name => {
                    self.bump();
                    Ok(self.expr(
                        ExprKind::Name {
                            id: name.to_string(),
                        },
                        start,
                    ))
                }
            },
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// `(...)`: empty tuple, parenthesized expression, tuple, or generator.
    fn parse_paren_atom(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.expect_op("(")?;
        if self.at_op(")") {
            self.bump();
            return Ok(self.expr(ExprKind::Tuple { elts: vec![] }, start));
        }
        if self.at_keyword("yield") {
            let inner = self.parse_yield()?;
            self.expect_op(")")?;
            return Ok(inner);
        }
        let first = self.parse_star_or_test()?;
        if self.at_comprehension_for() {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_op(")")?;
            return Ok(self.expr(
                ExprKind::GeneratorExp {
                    elt: Box::new(first),
                    generators,
                },
                start,
            ));
        }
        if self.at_op(",") {
            let mut elts = vec![first];
            while self.eat_op(",") {
                if self.at_op(")") {
                    break;
                }
                elts.push(self.parse_star_or_test()?);
            }
            self.expect_op(")")?;
            return Ok(self.expr(ExprKind::Tuple { elts }, start));
        }
        self.expect_op(")")?;
        Ok(first)
    }

    /// `[...]`: list or list comprehension.
    fn parse_list_atom(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.expect_op("[")?;
        if self.at_op("]") {
            self.bump();
            return Ok(self.expr(ExprKind::List { elts: vec![] }, start));
        }
        let first = self.parse_star_or_test()?;
        if self.at_comprehension_for() {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_op("]")?;
            return Ok(self.expr(
                ExprKind::ListComp {
                    elt: Box::new(first),
                    generators,
                },
                start,
            ));
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            elts.push(self.parse_star_or_test()?);
        }
        self.expect_op("]")?;
        Ok(self.expr(ExprKind::List { elts }, start))
    }

    /// `{...}`: dict, set, or one of their comprehensions.
    fn parse_braced_atom(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.expect_op("{")?;
        if self.at_op("}") {
            self.bump();
            return Ok(self.expr(
                ExprKind::Dict {
                    keys: vec![],
                    values: vec![],
                },
                start,
            ));
        }
        // `**expr` can only open a dict.
        if self.at_op("**") {
            self.bump();
            let spread = self.parse_or()?;
            return self.parse_dict_rest(start, vec![None], vec![spread]);
        }
        let first = self.parse_star_or_test()?;
        if self.at_op(":") {
            self.bump();
            let value = self.parse_test()?;
            if self.at_comprehension_for() {
                let generators = self.parse_comprehension_clauses()?;
                self.expect_op("}")?;
                return Ok(self.expr(
                    ExprKind::DictComp {
                        key: Box::new(first),
                        value: Box::new(value),
                        generators,
                    },
                    start,
                ));
            }
            return self.parse_dict_rest(start, vec![Some(first)], vec![value]);
        }
        if self.at_comprehension_for() {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_op("}")?;
            return Ok(self.expr(
                ExprKind::SetComp {
                    elt: Box::new(first),
                    generators,
                },
                start,
            ));
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            elts.push(self.parse_star_or_test()?);
        }
        self.expect_op("}")?;
        Ok(self.expr(ExprKind::Set { elts }, start))
    }

    /// Remaining `key: value` / `**spread` entries of a dict literal.
    fn parse_dict_rest(
        &mut self,
        start: (u32, u32),
        mut keys: Vec<Option<Expr>>,
        mut values: Vec<Expr>,
    ) -> Result<Expr, ParseError> {
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            if self.eat_op("**") {
                keys.push(None);
                values.push(self.parse_or()?);
                continue;
            }
            let key = self.parse_test()?;
            self.expect_op(":")?;
            let value = self.parse_test()?;
            keys.push(Some(key));
            values.push(value);
        }
        self.expect_op("}")?;
        Ok(self.expr(ExprKind::Dict { keys, values }, start))
    }

    // ── calls and subscripts ──────────────────────────────────────────────────

    /// `(args)` after a primary.  Positional arguments (including `*expr`)
    /// and keywords (`name=expr`, `**expr`); a bare generator argument
    /// (`f(x for x in y)`) is also recognized.
    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>), ParseError> {
        self.expect_op("(")?;
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.at_op(")") {
            if self.at_op("*") {
                let star_start = self.start();
                self.bump();
                let value = self.parse_test()?;
                args.push(self.expr(
                    ExprKind::Starred {
                        value: Box::new(value),
                    },
                    star_start,
                ));
            } else if self.eat_op("**") {
                let value = self.parse_test()?;
                keywords.push(Keyword { arg: None, value });
            } else if self.at_keyword_argument() {
                let name = self.expect_identifier()?;
                self.expect_op("=")?;
                let value = self.parse_test()?;
                keywords.push(Keyword {
                    arg: Some(name),
                    value,
                });
            } else {
                let arg_start = self.start();
                let e = self.parse_test()?;
                if self.at_comprehension_for() {
                    let generators = self.parse_comprehension_clauses()?;
                    args.push(self.expr(
                        ExprKind::GeneratorExp {
                            elt: Box::new(e),
                            generators,
                        },
                        arg_start,
                    ));
                } else {
                    args.push(e);
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok((args, keywords))
    }

    /// Two-token lookahead: `name=` (but not `name==`) begins a keyword
    /// argument.
    fn at_keyword_argument(&self) -> bool {
        let t = self.peek();
        t.kind == TokenKind::Name
            && !is_keyword(t.text)
            && self.peek_at(1).kind == TokenKind::Op
            && self.peek_at(1).text == "="
    }

    /// The interior of `[...]` in a subscript: one slice, or a tuple of
    /// comma-separated slices (generic subscripts like `Dict[str, int]`).
    fn parse_subscript_list(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let first = self.parse_subscript()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            elts.push(self.parse_subscript()?);
        }
        Ok(self.expr(ExprKind::Tuple { elts }, start))
    }

    fn parse_subscript(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        if self.at_op("*") {
            self.bump();
            let value = self.parse_test()?;
            return Ok(self.expr(
                ExprKind::Starred {
                    value: Box::new(value),
                },
                start,
            ));
        }
        let lower = if self.at_op(":") {
            None
        } else {
            Some(self.parse_test()?)
        };
        if !self.at_op(":") {
            return lower.ok_or_else(|| self.unexpected("an expression"));
        }
        self.bump();
        let upper = if self.at_op(":") || self.at_op("]") || self.at_op(",") {
            None
        } else {
            Some(self.parse_test()?)
        };
        let step = if self.eat_op(":") {
            if self.at_op("]") || self.at_op(",") {
                None
            } else {
                Some(self.parse_test()?)
            }
        } else {
            None
        };
        Ok(self.expr(
            ExprKind::Slice {
                lower: lower.map(Box::new),
                upper: upper.map(Box::new),
                step: step.map(Box::new),
            },
            start,
        ))
    }

    // ── comprehensions ────────────────────────────────────────────────────────

    fn at_comprehension_for(&self) -> bool {
        self.at_keyword("for") || (self.at_keyword("async") && self.peek_at(1).text == "for")
    }

    /// One or more `[async] for target in iter [if cond]*` clauses.  The
    /// `iter` and `if` subexpressions parse at or-test level so a ternary
    /// cannot swallow the following clause.
    pub(super) fn parse_comprehension_clauses(&mut self) -> Result<Vec<Comprehension>, ParseError> {
        let mut generators = Vec::new();
        loop {
            let is_async = if self.at_keyword("async") && self.peek_at(1).text == "for" {
                self.bump();
                true
            } else {
                false
            };
            if !self.eat_keyword("for") {
                break;
            }
            let target = self.parse_target_list()?;
            self.expect_keyword("in")?;
            let iter = self.parse_or()?;
            let mut ifs = Vec::new();
            while self.eat_keyword("if") {
                ifs.push(self.parse_or()?);
            }
            generators.push(Comprehension {
                target,
                iter,
                ifs,
                is_async: is_async as u8,
            });
            if !self.at_comprehension_for() {
                break;
            }
        }
        Ok(generators)
    }

    // ── lambda / yield ────────────────────────────────────────────────────────

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.expect_keyword("lambda")?;
        let args = self.parse_parameter_list(false, ":")?;
        self.expect_op(":")?;
        let body = self.parse_test()?;
        Ok(self.expr(
            ExprKind::Lambda {
                args: Box::new(args),
                body: Box::new(body),
            },
            start,
        ))
    }

    fn parse_yield(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        self.expect_keyword("yield")?;
        if self.eat_keyword("from") {
            let value = self.parse_test()?;
            return Ok(self.expr(
                ExprKind::YieldFrom {
                    value: Box::new(value),
                },
                start,
            ));
        }
        let value = if self.at_expression_start() {
            Some(Box::new(self.parse_testlist_star()?))
        } else {
            None
        };
        Ok(self.expr(ExprKind::Yield { value }, start))
    }

    // ── string literals ───────────────────────────────────────────────────────

    /// One or more adjacent string tokens.  Plain literals concatenate into a
    /// single `Constant`; when any participant is an f-string the result is a
    /// merged `JoinedStr`.
    fn parse_string_group(&mut self) -> Result<Expr, ParseError> {
        enum Piece {
            Text(String),
            Bytes(String),
            Formatted(Vec<Expr>),
        }

        let start = self.start();
        let mut pieces = Vec::new();
        let mut any_f = false;
        let mut any_bytes = false;
        while self.peek().kind == TokenKind::String {
            let tok = self.bump();
            let (prefix, inner) = split_string_token(tok.text);
            let is_raw = prefix.contains(['r', 'R']);
            if prefix.contains(['f', 'F']) {
                any_f = true;
                pieces.push(Piece::Formatted(parse_fstring_inner(inner, is_raw, &tok)?));
            } else if prefix.contains(['b', 'B']) {
                any_bytes = true;
                pieces.push(Piece::Bytes(decode_string(inner, is_raw)));
            } else {
                pieces.push(Piece::Text(decode_string(inner, is_raw)));
            }
        }

        if !any_f {
            let mut out = String::new();
            for piece in &pieces {
                match piece {
                    Piece::Text(s) | Piece::Bytes(s) => out.push_str(s),
                    Piece::Formatted(_) => unreachable!("no f-pieces on this path"),
                }
            }
            let value = if any_bytes {
                Constant::Bytes(out)
            } else {
                Constant::Str(out)
            };
            return Ok(self.expr(ExprKind::Constant { value }, start));
        }

        // Merge everything into one JoinedStr, folding adjacent literal runs.
        let mut values: Vec<Expr> = Vec::new();
        let mut push_chunk = |values: &mut Vec<Expr>, chunk: Expr| {
            if let (
                Some(Expr {
                    kind: ExprKind::Constant {
                        value: Constant::Str(prev),
                    },
                    ..
                }),
                ExprKind::Constant {
                    value: Constant::Str(next),
                },
            ) = (values.last_mut(), &chunk.kind)
            {
                prev.push_str(next);
            } else {
                values.push(chunk);
            }
        };
        for piece in pieces {
            match piece {
                Piece::Text(s) | Piece::Bytes(s) => push_chunk(
                    &mut values,
                    ExprKind::Constant {
                        value: Constant::Str(s),
                    }
                    .into(),
                ),
                Piece::Formatted(parts) => {
                    for part in parts {
                        push_chunk(&mut values, part);
                    }
                }
            }
        }
        Ok(self.expr(ExprKind::JoinedStr { values }, start))
    }
}

// ── string literal helpers ────────────────────────────────────────────────────

/// Split a raw string token into its prefix letters and quote-free body.
fn split_string_token(text: &str) -> (&str, &str) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() && !matches!(bytes[i], b'"' | b'\'') {
        i += 1;
    }
    let prefix = &text[..i];
    let q = bytes[i];
    let triple = bytes.get(i + 1) == Some(&q) && bytes.get(i + 2) == Some(&q);
    let open = if triple { 3 } else { 1 };
    let body_start = i + open;
    let body_end = text.len().saturating_sub(open).max(body_start);
    (prefix, &text[body_start..body_end])
}

/// Decode the common escape sequences; raw strings pass through unchanged.
/// Unknown escapes keep their backslash, matching CPython's lenient behavior.
fn decode_string(content: &str, raw: bool) -> String {
    if raw {
        return content.to_string();
    }
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            // Backslash-newline is a line continuation inside the literal.
            Some('\n') => {}
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                if let (Some(hi), Some(lo)) = (hi, lo)
                    && let (Some(h), Some(l)) = (hi.to_digit(16), lo.to_digit(16))
                    && let Some(ch) = char::from_u32(h * 16 + l)
                {
                    out.push(ch);
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parse the interior of an f-string into alternating literal `Constant`
/// chunks and `FormattedValue` entries.  The replacement expression is handed
/// to a nested parser; positions inside it are local to the substring.
fn parse_fstring_inner(
    inner: &str,
    raw: bool,
    tok: &Token<'_>,
) -> Result<Vec<Expr>, ParseError> {
    let bytes = inner.as_bytes();
    let mut out: Vec<Expr> = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    let fail = |msg: &str| ParseError::syntax(msg.to_string(), tok.start.0, tok.start.1);

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'{' {
            if bytes.get(i + 1) == Some(&b'{') {
                literal.push('{');
                i += 2;
                continue;
            }
            if !literal.is_empty() {
                out.push(
                    ExprKind::Constant {
                        value: Constant::Str(decode_string(&literal, raw)),
                    }
                    .into(),
                );
                literal.clear();
            }
            let (value, conversion, format_spec, next) =
                parse_replacement(inner, i + 1, raw, tok)?;
            out.push(
                ExprKind::FormattedValue {
                    value: Box::new(value),
                    conversion,
                    format_spec,
                }
                .into(),
            );
            i = next;
        } else if b == b'}' {
            if bytes.get(i + 1) == Some(&b'}') {
                literal.push('}');
                i += 2;
                continue;
            }
            return Err(fail("f-string: single '}' is not allowed"));
        } else {
            // Advance one UTF-8 character.
            let ch_len = inner[i..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
            literal.push_str(&inner[i..i + ch_len]);
            i += ch_len;
        }
    }
    if !literal.is_empty() {
        out.push(
            ExprKind::Constant {
                value: Constant::Str(decode_string(&literal, raw)),
            }
            .into(),
        );
    }
    Ok(out)
}

/// Parse one `{expr[!conv][:spec]}` replacement starting just after the `{`.
/// Returns the expression, the conversion code (`s`→115, `r`→114, `a`→97,
/// absent→-1), the optional format spec, and the index just past the closing
/// `}`.
fn parse_replacement(
    inner: &str,
    start: usize,
    raw: bool,
    tok: &Token<'_>,
) -> Result<(Expr, i32, Option<Box<Expr>>, usize), ParseError> {
    let bytes = inner.as_bytes();
    let fail = |msg: &str| ParseError::syntax(msg.to_string(), tok.start.0, tok.start.1);

    // Scan the expression region, tracking nested brackets, braces and
    // string quotes so `}`/`!`/`:` inside them do not terminate it.
    let mut depth = 1i32;
    let mut parens = 0i32;
    let mut quote: Option<(u8, bool)> = None;
    let mut i = start;
    let mut expr_end = None;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some((q, triple)) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                if !triple {
                    quote = None;
                } else if bytes.get(i + 1) == Some(&q) && bytes.get(i + 2) == Some(&q) {
                    quote = None;
                    i += 3;
                    continue;
                }
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => {
                let triple = bytes.get(i + 1) == Some(&b) && bytes.get(i + 2) == Some(&b);
                quote = Some((b, triple));
                i += if triple { 3 } else { 1 };
                continue;
            }
            b'(' | b'[' => parens += 1,
            b')' | b']' => parens -= 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    expr_end = Some(i);
                    break;
                }
            }
            b'!' if depth == 1 && parens == 0 && bytes.get(i + 1) != Some(&b'=') => {
                expr_end = Some(i);
                break;
            }
            b':' if depth == 1 && parens == 0 => {
                expr_end = Some(i);
                break;
            }
            _ => {}
        }
        i += 1;
    }
    let Some(expr_end) = expr_end else {
        return Err(fail("f-string: expecting '}'"));
    };
    let expr_src = inner[start..expr_end].trim();
    if expr_src.is_empty() {
        return Err(fail("f-string: empty expression not allowed"));
    }
    let value = parse_expression(expr_src)?;

    let mut i = expr_end;
    let mut conversion = -1;
    if bytes[i] == b'!' {
        let conv = bytes.get(i + 1).copied();
        conversion = match conv {
            Some(b's') => 115,
            Some(b'r') => 114,
            Some(b'a') => 97,
            _ => return Err(fail("f-string: invalid conversion character")),
        };
        i += 2;
    }

    let mut format_spec = None;
    if i < bytes.len() && bytes[i] == b':' {
        // The spec runs to the `}` that closes the replacement, minding
        // nested `{...}` fields.
        let spec_start = i + 1;
        let mut depth = 1i32;
        let mut j = spec_start;
        while j < bytes.len() {
            match bytes[j] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            j += 1;
        }
        if j >= bytes.len() {
            return Err(fail("f-string: expecting '}'"));
        }
        let spec_values = parse_fstring_inner(&inner[spec_start..j], raw, tok)?;
        format_spec = Some(Box::new(
            Expr::from(ExprKind::JoinedStr {
                values: spec_values,
            }),
        ));
        i = j;
    }

    if i >= bytes.len() || bytes[i] != b'}' {
        return Err(fail("f-string: expecting '}'"));
    }
    Ok((value, conversion, format_spec, i + 1))
}

// ── number literals ───────────────────────────────────────────────────────────

/// Convert a numeric lexeme into a constant.  Integers that overflow `i64`
/// degrade to floats, matching the JSON number model.
fn number_constant(text: &str) -> Constant {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    if let Some(stripped) = clean.strip_suffix(['j', 'J']) {
        let imag = if stripped.is_empty() {
            0.0
        } else {
            stripped.parse().unwrap_or(0.0)
        };
        return Constant::Complex { imag };
    }
    let lower = clean.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return match i64::from_str_radix(digits, radix) {
                Ok(i) => Constant::Int(i),
                Err(_) => Constant::Float(
                    u128::from_str_radix(digits, radix)
                        .map(|v| v as f64)
                        .unwrap_or(0.0),
                ),
            };
        }
    }
    if clean.contains(['.', 'e', 'E']) {
        return Constant::Float(clean.parse().unwrap_or(0.0));
    }
    match clean.parse::<i64>() {
        Ok(i) => Constant::Int(i),
        Err(_) => Constant::Float(clean.parse().unwrap_or(0.0)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::super::parse_expression;
    use crate::ast::{CmpOperator, Constant, ExprKind, Operator, UnaryOperator};

    fn kind(src: &str) -> ExprKind {
        parse_expression(src).unwrap().kind
    }

    #[test]
    fn test_precedence_mul_over_add() {
        // a + b * c  →  a + (b * c)
        let ExprKind::BinOp { op, right, .. } = kind("a + b * c") else {
            panic!("expected BinOp");
        };
        assert_eq!(op, Operator::Add);
        assert!(matches!(
            right.kind,
            ExprKind::BinOp {
                op: Operator::Mult,
                ..
            }
        ));
    }

    #[test]
    fn test_power_right_associative() {
        // 2 ** 3 ** 4  →  2 ** (3 ** 4)
        let ExprKind::BinOp { op, right, .. } = kind("2 ** 3 ** 4") else {
            panic!("expected BinOp");
        };
        assert_eq!(op, Operator::Pow);
        assert!(matches!(
            right.kind,
            ExprKind::BinOp {
                op: Operator::Pow,
                ..
            }
        ));
    }

    #[test]
    fn test_unary_binds_tighter_than_mul() {
        // -a * b  →  (-a) * b
        let ExprKind::BinOp { left, op, .. } = kind("-a * b") else {
            panic!("expected BinOp");
        };
        assert_eq!(op, Operator::Mult);
        assert!(matches!(
            left.kind,
            ExprKind::UnaryOp {
                op: UnaryOperator::USub,
                ..
            }
        ));
    }

    #[test]
    fn test_chained_comparison() {
        let ExprKind::Compare {
            left,
            ops,
            comparators,
        } = kind("a < b <= c")
        else {
            panic!("expected Compare");
        };
        assert!(matches!(left.kind, ExprKind::Name { ref id } if id == "a"));
        assert_eq!(ops, vec![CmpOperator::Lt, CmpOperator::LtE]);
        assert_eq!(comparators.len(), 2);
    }

    #[test]
    fn test_is_not_and_not_in() {
        let ExprKind::Compare { ops, .. } = kind("a is not b") else {
            panic!("expected Compare");
        };
        assert_eq!(ops, vec![CmpOperator::IsNot]);
        let ExprKind::Compare { ops, .. } = kind("a not in b") else {
            panic!("expected Compare");
        };
        assert_eq!(ops, vec![CmpOperator::NotIn]);
    }

    #[test]
    fn test_bool_op_collects_values() {
        let ExprKind::BoolOp { values, .. } = kind("a or b or c") else {
            panic!("expected BoolOp");
        };
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_ternary() {
        assert!(matches!(kind("a if c else b"), ExprKind::IfExp { .. }));
    }

    #[test]
    fn test_walrus() {
        let ExprKind::NamedExpr { target, .. } = kind("(n := 10)") else {
            panic!("expected NamedExpr");
        };
        assert!(matches!(target.kind, ExprKind::Name { ref id } if id == "n"));
    }

    #[test]
    fn test_call_with_keywords() {
        let ExprKind::Call {
            args, keywords, ..
        } = kind("f(1, x, key=2, **rest)")
        else {
            panic!("expected Call");
        };
        assert_eq!(args.len(), 2);
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].arg.as_deref(), Some("key"));
        assert_eq!(keywords[1].arg, None);
    }

    #[test]
    fn test_call_keyword_vs_comparison() {
        // `f(a == b)` is a positional comparison, not a keyword.
        let ExprKind::Call {
            args, keywords, ..
        } = kind("f(a == b)")
        else {
            panic!("expected Call");
        };
        assert_eq!(args.len(), 1);
        assert!(keywords.is_empty());
    }

    #[test]
    fn test_attribute_chain() {
        let ExprKind::Attribute { value, attr } = kind("a.b.c") else {
            panic!("expected Attribute");
        };
        assert_eq!(attr, "c");
        assert!(matches!(value.kind, ExprKind::Attribute { .. }));
    }

    #[test]
    fn test_subscript_slice_forms() {
        assert!(matches!(kind("a[1]").clone(), ExprKind::Subscript { slice, .. }
            if matches!(slice.kind, ExprKind::Constant { .. })));
        assert!(matches!(kind("a[1:2]"), ExprKind::Subscript { slice, .. }
            if matches!(slice.kind, ExprKind::Slice { .. })));
        let ExprKind::Subscript { slice, .. } = kind("a[1:10:2]") else {
            panic!("expected Subscript");
        };
        let ExprKind::Slice { lower, upper, step } = slice.kind else {
            panic!("expected Slice");
        };
        assert!(lower.is_some() && upper.is_some() && step.is_some());
    }

    #[test]
    fn test_generic_subscript_is_tuple() {
        let ExprKind::Subscript { slice, .. } = kind("Dict[str, int]") else {
            panic!("expected Subscript");
        };
        assert!(matches!(slice.kind, ExprKind::Tuple { ref elts } if elts.len() == 2));
    }

    #[test]
    fn test_tuple_list_set_dict_atoms() {
        assert!(matches!(kind("()"), ExprKind::Tuple { ref elts } if elts.is_empty()));
        assert!(matches!(kind("(1,)"), ExprKind::Tuple { ref elts } if elts.len() == 1));
        assert!(matches!(kind("(1)"), ExprKind::Constant { .. }));
        assert!(matches!(kind("[1, 2]"), ExprKind::List { ref elts } if elts.len() == 2));
        assert!(matches!(kind("{1, 2}"), ExprKind::Set { ref elts } if elts.len() == 2));
        assert!(matches!(kind("{}"), ExprKind::Dict { ref keys, .. } if keys.is_empty()));
    }

    #[test]
    fn test_dict_spread_null_key() {
        let ExprKind::Dict { keys, values } = kind("{'a': 1, **extra}") else {
            panic!("expected Dict");
        };
        assert_eq!(keys.len(), values.len());
        assert!(keys[0].is_some());
        assert!(keys[1].is_none());
    }

    #[test]
    fn test_comprehensions() {
        assert!(matches!(kind("[x for x in xs]"), ExprKind::ListComp { .. }));
        assert!(matches!(kind("{x for x in xs}"), ExprKind::SetComp { .. }));
        assert!(matches!(
            kind("{k: v for k, v in xs}"),
            ExprKind::DictComp { .. }
        ));
        assert!(matches!(
            kind("(x for x in xs)"),
            ExprKind::GeneratorExp { .. }
        ));
    }

    #[test]
    fn test_comprehension_if_clauses_in_order() {
        let ExprKind::ListComp { generators, .. } = kind("[x for x in xs if a if b]") else {
            panic!("expected ListComp");
        };
        assert_eq!(generators[0].ifs.len(), 2);
    }

    #[test]
    fn test_async_comprehension() {
        let ExprKind::ListComp { generators, .. } = kind("[x async for x in xs]") else {
            panic!("expected ListComp");
        };
        assert_eq!(generators[0].is_async, 1);
    }

    #[test]
    fn test_lambda() {
        let ExprKind::Lambda { args, .. } = kind("lambda x, y=1: x + y") else {
            panic!("expected Lambda");
        };
        assert_eq!(args.args.len(), 2);
        assert_eq!(args.defaults.len(), 1);
    }

    #[test]
    fn test_await() {
        assert!(matches!(kind("await f()"), ExprKind::Await { .. }));
    }

    #[test]
    fn test_string_concatenation() {
        let ExprKind::Constant { value } = kind("'a' 'b' 'c'") else {
            panic!("expected Constant");
        };
        assert_eq!(value, Constant::Str("abc".to_string()));
    }

    #[test]
    fn test_escape_decoding() {
        let ExprKind::Constant { value } = kind(r"'a\nb'") else {
            panic!("expected Constant");
        };
        assert_eq!(value, Constant::Str("a\nb".to_string()));
        // Raw strings keep the backslash.
        let ExprKind::Constant { value } = kind(r"r'a\nb'") else {
            panic!("expected Constant");
        };
        assert_eq!(value, Constant::Str("a\\nb".to_string()));
    }

    #[test]
    fn test_fstring_literal_and_expr() {
        let ExprKind::JoinedStr { values } = kind("f'hi {name}!'") else {
            panic!("expected JoinedStr");
        };
        assert_eq!(values.len(), 3);
        assert!(matches!(values[0].kind, ExprKind::Constant { .. }));
        assert!(matches!(values[1].kind, ExprKind::FormattedValue { .. }));
    }

    #[test]
    fn test_fstring_conversion_and_spec() {
        let ExprKind::JoinedStr { values } = kind("f'{x!r:>10}'") else {
            panic!("expected JoinedStr");
        };
        let ExprKind::FormattedValue {
            conversion,
            format_spec,
            ..
        } = &values[0].kind
        else {
            panic!("expected FormattedValue");
        };
        assert_eq!(*conversion, 114);
        assert!(format_spec.is_some());
    }

    #[test]
    fn test_fstring_spec_is_joined_str() {
        let ExprKind::JoinedStr { values } = kind("f\"{value:.2f}\"") else {
            panic!("expected JoinedStr");
        };
        let ExprKind::FormattedValue {
            value,
            conversion,
            format_spec,
        } = &values[0].kind
        else {
            panic!("expected FormattedValue");
        };
        assert!(matches!(value.kind, ExprKind::Name { ref id } if id == "value"));
        assert_eq!(*conversion, -1);
        let spec = format_spec.as_ref().unwrap();
        let ExprKind::JoinedStr { values: spec_vals } = &spec.kind else {
            panic!("expected JoinedStr spec");
        };
        assert!(
            matches!(&spec_vals[0].kind, ExprKind::Constant { value: Constant::Str(s) } if s == ".2f")
        );
    }

    #[test]
    fn test_fstring_double_braces_literal() {
        let ExprKind::JoinedStr { values } = kind("f'{{literal}}'") else {
            panic!("expected JoinedStr");
        };
        assert_eq!(values.len(), 1);
        assert!(
            matches!(&values[0].kind, ExprKind::Constant { value: Constant::Str(s) } if s == "{literal}")
        );
    }

    #[test]
    fn test_fstring_nested_spec() {
        let ExprKind::JoinedStr { values } = kind("f'{x:{width}}'") else {
            panic!("expected JoinedStr");
        };
        let ExprKind::FormattedValue { format_spec, .. } = &values[0].kind else {
            panic!("expected FormattedValue");
        };
        let spec = format_spec.as_ref().unwrap();
        let ExprKind::JoinedStr { values: sv } = &spec.kind else {
            panic!("expected JoinedStr");
        };
        assert!(matches!(sv[0].kind, ExprKind::FormattedValue { .. }));
    }

    #[test]
    fn test_number_constants() {
        assert!(matches!(kind("42"), ExprKind::Constant { value: Constant::Int(42) }));
        assert!(matches!(kind("0xff"), ExprKind::Constant { value: Constant::Int(255) }));
        assert!(matches!(kind("0b101"), ExprKind::Constant { value: Constant::Int(5) }));
        assert!(matches!(kind("1_000"), ExprKind::Constant { value: Constant::Int(1000) }));
        assert!(
            matches!(kind("3.5"), ExprKind::Constant { value: Constant::Float(f) } if f == 3.5)
        );
        assert!(
            matches!(kind("2e3"), ExprKind::Constant { value: Constant::Float(f) } if f == 2000.0)
        );
        assert!(
            matches!(kind("3j"), ExprKind::Constant { value: Constant::Complex { imag } } if imag == 3.0)
        );
    }

    #[test]
    fn test_huge_int_degrades_to_float() {
        assert!(matches!(
            kind("123456789012345678901234567890"),
            ExprKind::Constant {
                value: Constant::Float(_)
            }
        ));
    }

    #[test]
    fn test_ellipsis_atom() {
        assert!(matches!(
            kind("..."),
            ExprKind::Constant {
                value: Constant::Ellipsis
            }
        ));
    }

    #[test]
    fn test_yield_forms_in_parens() {
        assert!(matches!(kind("(yield)"), ExprKind::Yield { value: None }));
        assert!(matches!(kind("(yield 5)"), ExprKind::Yield { value: Some(_) }));
        assert!(matches!(kind("(yield from gen)"), ExprKind::YieldFrom { .. }));
    }

    #[test]
    fn test_starred_in_call() {
        let ExprKind::Call { args, .. } = kind("f(*xs)") else {
            panic!("expected Call");
        };
        assert!(matches!(args[0].kind, ExprKind::Starred { .. }));
    }

    #[test]
    fn test_matmul_operator() {
        assert!(matches!(
            kind("a @ b"),
            ExprKind::BinOp {
                op: Operator::MatMult,
                ..
            }
        ));
    }

    #[test]
    fn test_generator_argument() {
        let ExprKind::Call { args, .. } = kind("sum(x*x for x in xs)") else {
            panic!("expected Call");
        };
        assert!(matches!(args[0].kind, ExprKind::GeneratorExp { .. }));
    }
}
