//! Statement parsing: dispatch, simple statements, compound statements,
//! suites, parameter lists and assignment triage.

use super::lexer::TokenKind;
use super::Parser;
use crate::ast::{
    Alias, Arg, Arguments, ExceptHandler, Expr, ExprKind, Keyword, Operator, Stmt, StmtKind,
    TypeParam, WithItem,
};
use crate::error::ParseError;

/// Augmented-assignment operator lexemes mapped to their AST operators.
fn aug_op(text: &str) -> Option<Operator> {
    Some(match text {
        "+=" => Operator::Add,
        "-=" => Operator::Sub,
        "*=" => Operator::Mult,
        "/=" => Operator::Div,
        "//=" => Operator::FloorDiv,
        "%=" => Operator::Mod,
        "**=" => Operator::Pow,
        "&=" => Operator::BitAnd,
        "|=" => Operator::BitOr,
        "^=" => Operator::BitXor,
        ">>=" => Operator::RShift,
        "<<=" => Operator::LShift,
        "@=" => Operator::MatMult,
        _ => return None,
    })
}

impl<'src> Parser<'src> {
    // ── statement dispatch ────────────────────────────────────────────────────

    /// Parse one logical line (or compound statement) into `out`.  Simple
    /// statements may contribute several entries via `;` separators.
    pub(super) fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        if self.at_op("@") {
            out.push(self.parse_decorated()?);
            return Ok(());
        }
        if self.peek().kind == TokenKind::Name {
            match self.peek().text {
                "def" => {
                    out.push(self.parse_funcdef(Vec::new(), false)?);
                    return Ok(());
                }
                "class" => {
                    out.push(self.parse_classdef(Vec::new())?);
                    return Ok(());
                }
                "async" => {
                    out.push(self.parse_async_statement()?);
                    return Ok(());
                }
                "if" => {
                    out.push(self.parse_if()?);
                    return Ok(());
                }
                "while" => {
                    out.push(self.parse_while()?);
                    return Ok(());
                }
                "for" => {
                    out.push(self.parse_for(false)?);
                    return Ok(());
                }
                "with" => {
                    out.push(self.parse_with(false)?);
                    return Ok(());
                }
                "try" => {
                    out.push(self.parse_try()?);
                    return Ok(());
                }
                "match" => {
                    // Soft keyword: only a match statement when a subject and
                    // colon actually follow.
                    if let Some(stmt) = self.try_parse_match()? {
                        out.push(stmt);
                        return Ok(());
                    }
                }
                "type" => {
                    // Soft keyword: `type X = ...` / `type X[T] = ...`.
                    if self.at_type_alias() {
                        out.push(self.parse_type_alias()?);
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        self.parse_simple_stmt_list(out)
    }

    fn parse_simple_stmt_list(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        loop {
            out.push(self.parse_simple_stmt()?);
            if self.eat_op(";") {
                if matches!(
                    self.peek().kind,
                    TokenKind::Newline | TokenKind::Dedent | TokenKind::EndOfInput
                ) {
                    break;
                }
                continue;
            }
            break;
        }
        match self.peek().kind {
            TokenKind::Newline => {
                self.bump();
                Ok(())
            }
            TokenKind::Dedent | TokenKind::EndOfInput => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    fn parse_simple_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        if self.peek().kind == TokenKind::Name {
            match self.peek().text {
                "import" => return self.parse_import(),
                "from" => return self.parse_from_import(),
                "return" => {
                    self.bump();
                    let value = if self.at_statement_end() {
                        None
                    } else {
                        Some(Box::new(self.parse_testlist_star()?))
                    };
                    return Ok(self.stmt(StmtKind::Return { value }, start));
                }
                "raise" => {
                    self.bump();
                    if self.at_statement_end() {
                        return Ok(self.stmt(StmtKind::Raise { exc: None, cause: None }, start));
                    }
                    let exc = Some(Box::new(self.parse_test()?));
                    let cause = if self.eat_keyword("from") {
                        Some(Box::new(self.parse_test()?))
                    } else {
                        None
                    };
                    return Ok(self.stmt(StmtKind::Raise { exc, cause }, start));
                }
                "pass" => {
                    self.bump();
                    return Ok(self.stmt(StmtKind::Pass, start));
                }
                "break" => {
                    self.bump();
                    return Ok(self.stmt(StmtKind::Break, start));
                }
                "continue" => {
                    self.bump();
                    return Ok(self.stmt(StmtKind::Continue, start));
                }
                "global" => {
                    self.bump();
                    let names = self.parse_name_list()?;
                    return Ok(self.stmt(StmtKind::Global { names }, start));
                }
                "nonlocal" => {
                    self.bump();
                    let names = self.parse_name_list()?;
                    return Ok(self.stmt(StmtKind::Nonlocal { names }, start));
                }
                "del" => {
                    self.bump();
                    let mut targets = vec![self.parse_single_target()?];
                    while self.eat_op(",") {
                        if self.at_statement_end() {
                            break;
                        }
                        targets.push(self.parse_single_target()?);
                    }
                    return Ok(self.stmt(StmtKind::Delete { targets }, start));
                }
                "assert" => {
                    self.bump();
                    let test = Box::new(self.parse_test()?);
                    let msg = if self.eat_op(",") {
                        Some(Box::new(self.parse_test()?))
                    } else {
                        None
                    };
                    return Ok(self.stmt(StmtKind::Assert { test, msg }, start));
                }
                _ => {}
            }
        }
        self.parse_expr_statement()
    }

    fn parse_name_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.expect_identifier()?];
        while self.eat_op(",") {
            names.push(self.expect_identifier()?);
        }
        Ok(names)
    }

    // ── imports ───────────────────────────────────────────────────────────────

    fn parse_dotted_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.expect_identifier()?;
        while self.at_op(".") && self.peek_at(1).kind == TokenKind::Name {
            self.bump();
            name.push('.');
            name.push_str(&self.expect_identifier()?);
        }
        Ok(name)
    }

    fn parse_import_alias(&mut self, dotted: bool) -> Result<Alias, ParseError> {
        let name = if dotted {
            self.parse_dotted_name()?
        } else {
            self.expect_identifier()?
        };
        let asname = if self.eat_keyword("as") {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(Alias { name, asname })
    }

    fn parse_import(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.expect_keyword("import")?;
        let mut names = vec![self.parse_import_alias(true)?];
        while self.eat_op(",") {
            names.push(self.parse_import_alias(true)?);
        }
        Ok(self.stmt(StmtKind::Import { names }, start))
    }

    fn parse_from_import(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.expect_keyword("from")?;
        // Relative level: each `.` counts one, `...` counts three.
        let mut level = 0u32;
        loop {
            if self.eat_op(".") {
                level += 1;
            } else if self.eat_op("...") {
                level += 3;
            } else {
                break;
            }
        }
        let module = if self.at_keyword("import") {
            None
        } else {
            Some(self.parse_dotted_name()?)
        };
        if module.is_none() && level == 0 {
            return Err(self.unexpected("a module name"));
        }
        self.expect_keyword("import")?;

        if self.eat_op("*") {
            let names = vec![Alias {
                name: "*".to_string(),
                asname: None,
            }];
            return Ok(self.stmt(StmtKind::ImportFrom { module, names, level }, start));
        }

        let parens = self.eat_op("(");
        let mut names = vec![self.parse_import_alias(false)?];
        while self.eat_op(",") {
            if parens && self.at_op(")") {
                break;
            }
            names.push(self.parse_import_alias(false)?);
        }
        if parens {
            self.expect_op(")")?;
        }
        Ok(self.stmt(StmtKind::ImportFrom { module, names, level }, start))
    }

    // ── def / class / decorators ──────────────────────────────────────────────

    fn parse_decorated(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        let mut decorator_list = Vec::new();
        while self.at_op("@") {
            self.bump();
            decorator_list.push(self.parse_test()?);
            if self.peek().kind == TokenKind::Newline {
                self.bump();
            }
            self.skip_newlines();
        }
        let mut stmt = if self.at_keyword("def") {
            self.parse_funcdef(decorator_list, false)?
        } else if self.at_keyword("class") {
            self.parse_classdef(decorator_list)?
        } else if self.at_keyword("async") {
            self.bump();
            self.parse_funcdef(decorator_list, true)?
        } else {
            return Err(self.unexpected("`def`, `class` or `async def`"));
        };
        if let Some(span) = &mut stmt.span {
            span.line = start.0;
            span.col = start.1;
        }
        Ok(stmt)
    }

    fn parse_async_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword("async")?;
        if self.at_keyword("def") {
            self.parse_funcdef(Vec::new(), true)
        } else if self.at_keyword("for") {
            self.parse_for(true)
        } else if self.at_keyword("with") {
            self.parse_with(true)
        } else {
            Err(self.unexpected("`def`, `for` or `with`"))
        }
    }

    fn parse_funcdef(
        &mut self,
        decorator_list: Vec<Expr>,
        is_async: bool,
    ) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.expect_keyword("def")?;
        let name = self.expect_identifier()?;
        let type_params = self.parse_type_params()?;
        self.expect_op("(")?;
        let args = self.parse_parameter_list(true, ")")?;
        self.expect_op(")")?;
        let returns = if self.eat_op("->") {
            Some(Box::new(self.parse_test()?))
        } else {
            None
        };
        let body = self.parse_suite()?;
        let kind = if is_async {
            StmtKind::AsyncFunctionDef {
                name,
                type_params,
                args,
                body,
                decorator_list,
                returns,
            }
        } else {
            StmtKind::FunctionDef {
                name,
                type_params,
                args,
                body,
                decorator_list,
                returns,
            }
        };
        Ok(self.stmt(kind, start))
    }

    /// Parameter list grammar shared by `def` headers (annotations allowed)
    /// and `lambda` (no annotations, terminated by `:`).
    ///
    /// Defaults attach to the tail of the positional parameters; a bare `*`
    /// or `*name` switches to keyword-only collection with parallel
    /// `kw_defaults`; a `/` moves everything seen so far to `posonlyargs`;
    /// `**name` terminates.
    pub(super) fn parse_parameter_list(
        &mut self,
        annotations: bool,
        terminator: &str,
    ) -> Result<Arguments, ParseError> {
        let mut args = Arguments::default();
        let mut kwonly = false;

        loop {
            if self.at_op(terminator) || self.peek().kind == TokenKind::EndOfInput {
                break;
            }
            if self.eat_op("/") {
                args.posonlyargs.append(&mut args.args);
                if !self.eat_op(",") {
                    break;
                }
                continue;
            }
            if self.eat_op("**") {
                let param = self.parse_parameter(annotations)?;
                args.kwarg = Some(Box::new(param));
                let _ = self.eat_op(",");
                break;
            }
            if self.eat_op("*") {
                kwonly = true;
                if !self.at_op(",") && !self.at_op(terminator) {
                    args.vararg = Some(Box::new(self.parse_parameter(annotations)?));
                }
                if !self.eat_op(",") {
                    break;
                }
                continue;
            }

            let param = self.parse_parameter(annotations)?;
            let default = if self.eat_op("=") {
                Some(self.parse_test()?)
            } else {
                None
            };
            if kwonly {
                args.kwonlyargs.push(param);
                args.kw_defaults.push(default);
            } else {
                args.args.push(param);
                if let Some(d) = default {
                    args.defaults.push(d);
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(args)
    }

    fn parse_parameter(&mut self, annotations: bool) -> Result<Arg, ParseError> {
        let arg = self.expect_identifier()?;
        let annotation = if annotations && self.eat_op(":") {
            Some(Box::new(self.parse_test()?))
        } else {
            None
        };
        Ok(Arg { arg, annotation })
    }

    /// `[T, *Ts, **P]` type-parameter lists on `def`, `class` and `type`.
    fn parse_type_params(&mut self) -> Result<Vec<TypeParam>, ParseError> {
        let mut params = Vec::new();
        if !self.eat_op("[") {
            return Ok(params);
        }
        while !self.at_op("]") {
            if self.eat_op("*") {
                params.push(TypeParam::TypeVarTuple {
                    name: self.expect_identifier()?,
                });
            } else if self.eat_op("**") {
                params.push(TypeParam::ParamSpec {
                    name: self.expect_identifier()?,
                });
            } else {
                let name = self.expect_identifier()?;
                let bound = if self.eat_op(":") {
                    Some(Box::new(self.parse_test()?))
                } else {
                    None
                };
                params.push(TypeParam::TypeVar { name, bound });
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op("]")?;
        Ok(params)
    }

    fn parse_classdef(&mut self, decorator_list: Vec<Expr>) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.expect_keyword("class")?;
        let name = self.expect_identifier()?;
        let type_params = self.parse_type_params()?;
        let mut bases = Vec::new();
        let mut keywords = Vec::new();
        if self.eat_op("(") {
            while !self.at_op(")") {
                if self.eat_op("**") {
                    let value = self.parse_test()?;
                    keywords.push(Keyword { arg: None, value });
                } else if self.peek().kind == TokenKind::Name
                    && !super::lexer::is_keyword(self.peek().text)
                    && self.peek_at(1).text == "="
                    && self.peek_at(1).kind == TokenKind::Op
                {
                    let arg = self.expect_identifier()?;
                    self.expect_op("=")?;
                    let value = self.parse_test()?;
                    keywords.push(Keyword {
                        arg: Some(arg),
                        value,
                    });
                } else {
                    bases.push(self.parse_star_or_test()?);
                }
                if !self.eat_op(",") {
                    break;
                }
            }
            self.expect_op(")")?;
        }
        let body = self.parse_suite()?;
        Ok(self.stmt(
            StmtKind::ClassDef {
                name,
                type_params,
                bases,
                keywords,
                body,
                decorator_list,
            },
            start,
        ))
    }

    // ── control flow ──────────────────────────────────────────────────────────

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.expect_keyword("if")?;
        let test = Box::new(self.parse_test()?);
        let body = self.parse_suite()?;
        let orelse = self.parse_elif_else()?;
        Ok(self.stmt(StmtKind::If { test, body, orelse }, start))
    }

    fn parse_elif_else(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.skip_newlines();
        if self.at_keyword("elif") {
            let start = self.start();
            self.bump();
            let test = Box::new(self.parse_test()?);
            let body = self.parse_suite()?;
            let orelse = self.parse_elif_else()?;
            return Ok(vec![self.stmt(StmtKind::If { test, body, orelse }, start)]);
        }
        if self.at_keyword("else") {
            self.bump();
            return self.parse_suite();
        }
        Ok(Vec::new())
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.expect_keyword("while")?;
        let test = Box::new(self.parse_test()?);
        let body = self.parse_suite()?;
        let orelse = self.parse_optional_else()?;
        Ok(self.stmt(StmtKind::While { test, body, orelse }, start))
    }

    fn parse_optional_else(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.skip_newlines();
        if self.at_keyword("else") {
            self.bump();
            return self.parse_suite();
        }
        Ok(Vec::new())
    }

    fn parse_for(&mut self, is_async: bool) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.expect_keyword("for")?;
        let target = Box::new(self.parse_target_list()?);
        self.expect_keyword("in")?;
        let iter = Box::new(self.parse_testlist_star()?);
        let body = self.parse_suite()?;
        let orelse = self.parse_optional_else()?;
        let kind = if is_async {
            StmtKind::AsyncFor {
                target,
                iter,
                body,
                orelse,
            }
        } else {
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            }
        };
        Ok(self.stmt(kind, start))
    }

    fn parse_with(&mut self, is_async: bool) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.expect_keyword("with")?;
        let mut items = Vec::new();
        loop {
            let context_expr = self.parse_test()?;
            let optional_vars = if self.eat_keyword("as") {
                Some(Box::new(self.parse_single_target()?))
            } else {
                None
            };
            items.push(WithItem {
                context_expr,
                optional_vars,
            });
            if !self.eat_op(",") {
                break;
            }
        }
        let body = self.parse_suite()?;
        let kind = if is_async {
            StmtKind::AsyncWith { items, body }
        } else {
            StmtKind::With { items, body }
        };
        Ok(self.stmt(kind, start))
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.expect_keyword("try")?;
        let body = self.parse_suite()?;
        let mut handlers = Vec::new();
        self.skip_newlines();
        while self.at_keyword("except") {
            self.bump();
            // `except*` exception groups parse as plain handlers.
            let _ = self.eat_op("*");
            let type_ = if self.at_op(":") {
                None
            } else {
                Some(Box::new(self.parse_test()?))
            };
            let name = if self.eat_keyword("as") {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            let handler_body = self.parse_suite()?;
            handlers.push(ExceptHandler {
                type_,
                name,
                body: handler_body,
            });
            self.skip_newlines();
        }
        let orelse = self.parse_optional_else()?;
        self.skip_newlines();
        let finalbody = if self.at_keyword("finally") {
            self.bump();
            self.parse_suite()?
        } else {
            Vec::new()
        };
        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.unexpected("`except` or `finally`"));
        }
        Ok(self.stmt(
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            },
            start,
        ))
    }

    // ── type alias (PEP 695) ──────────────────────────────────────────────────

    /// `type` is a soft keyword: only `type NAME =` / `type NAME[` opens an
    /// alias statement.
    fn at_type_alias(&self) -> bool {
        let next = self.peek_at(1);
        if next.kind != TokenKind::Name || super::lexer::is_keyword(next.text) {
            return false;
        }
        let after = self.peek_at(2);
        after.kind == TokenKind::Op && (after.text == "=" || after.text == "[")
    }

    fn parse_type_alias(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        self.expect_keyword("type")?;
        let name_start = self.start();
        let id = self.expect_identifier()?;
        let name = Box::new(self.expr(ExprKind::Name { id }, name_start));
        let type_params = self.parse_type_params()?;
        self.expect_op("=")?;
        let value = Box::new(self.parse_test()?);
        Ok(self.stmt(
            StmtKind::TypeAlias {
                name,
                type_params,
                value,
            },
            start,
        ))
    }

    // ── assignments and expression statements ─────────────────────────────────

    fn parse_expr_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.start();
        let first = self.parse_testlist_star()?;

        if self.at_op(":") {
            self.bump();
            let annotation = Box::new(self.parse_test()?);
            let value = if self.eat_op("=") {
                Some(Box::new(self.parse_testlist_star()?))
            } else {
                None
            };
            let simple = matches!(first.kind, ExprKind::Name { .. }) as u8;
            return Ok(self.stmt(
                StmtKind::AnnAssign {
                    target: Box::new(first),
                    annotation,
                    value,
                    simple,
                },
                start,
            ));
        }

        if self.peek().kind == TokenKind::Op
            && let Some(op) = aug_op(self.peek().text)
        {
            self.bump();
            let value = Box::new(self.parse_testlist_star()?);
            return Ok(self.stmt(
                StmtKind::AugAssign {
                    target: Box::new(first),
                    op,
                    value,
                },
                start,
            ));
        }

        if self.eat_op("=") {
            let mut targets = vec![first];
            loop {
                let next = self.parse_testlist_star()?;
                if self.eat_op("=") {
                    targets.push(next);
                } else {
                    return Ok(self.stmt(
                        StmtKind::Assign {
                            targets,
                            value: Box::new(next),
                        },
                        start,
                    ));
                }
            }
        }

        Ok(self.stmt(
            StmtKind::Expr {
                value: Box::new(first),
            },
            start,
        ))
    }

    // ── targets ───────────────────────────────────────────────────────────────

    /// A `for`/`with` target list: star targets separated by commas, at
    /// primary level so `in` never reads as a comparison.
    pub(super) fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        let first = self.parse_single_target()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(",") {
            if self.at_keyword("in") || self.at_op(":") || self.at_statement_end() {
                break;
            }
            elts.push(self.parse_single_target()?);
        }
        Ok(self.expr(ExprKind::Tuple { elts }, start))
    }

    /// One assignment target: a name, attribute, subscript, starred target,
    /// or a parenthesized/bracketed nested target list.
    pub(super) fn parse_single_target(&mut self) -> Result<Expr, ParseError> {
        let start = self.start();
        if self.eat_op("*") {
            let value = Box::new(self.parse_single_target()?);
            return Ok(self.expr(ExprKind::Starred { value }, start));
        }
        if self.at_op("(") || self.at_op("[") {
            let is_list = self.at_op("[");
            let close = if is_list { "]" } else { ")" };
            self.bump();
            let mut elts = Vec::new();
            let mut trailing_comma = false;
            while !self.at_op(close) {
                elts.push(self.parse_single_target()?);
                trailing_comma = self.eat_op(",");
                if !trailing_comma {
                    break;
                }
            }
            self.expect_op(close)?;
            if is_list {
                return Ok(self.expr(ExprKind::List { elts }, start));
            }
            if elts.len() == 1 && !trailing_comma {
                return Ok(elts.into_iter().next().expect("len checked above"));
            }
            return Ok(self.expr(ExprKind::Tuple { elts }, start));
        }
        self.parse_primary()
    }

    // ── suites ────────────────────────────────────────────────────────────────

    /// `: <inline simple statements>` or `: NEWLINE INDENT stmts DEDENT`.
    pub(super) fn parse_suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_op(":")?;
        let mut body = Vec::new();
        if self.peek().kind == TokenKind::Newline {
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
            self.skip_newlines();
            while !matches!(
                self.peek().kind,
                TokenKind::Dedent | TokenKind::EndOfInput
            ) {
                self.parse_statement(&mut body)?;
                self.skip_newlines();
            }
            if self.peek().kind == TokenKind::Dedent {
                self.bump();
            }
        } else {
            self.parse_simple_stmt_list(&mut body)?;
        }
        Ok(body)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::{Constant, ExprKind, Operator, StmtKind};

    fn first(src: &str) -> StmtKind {
        parse(src).unwrap().body.remove(0).kind
    }

    #[test]
    fn test_import_aliases() {
        let StmtKind::Import { names } = first("import os.path as p, sys\n") else {
            panic!("expected Import");
        };
        assert_eq!(names[0].name, "os.path");
        assert_eq!(names[0].asname.as_deref(), Some("p"));
        assert_eq!(names[1].name, "sys");
        assert_eq!(names[1].asname, None);
    }

    #[test]
    fn test_relative_import_level() {
        let StmtKind::ImportFrom { module, names, level } =
            first("from ...pkg.sub import item\n")
        else {
            panic!("expected ImportFrom");
        };
        assert_eq!(module.as_deref(), Some("pkg.sub"));
        assert_eq!(level, 3);
        assert_eq!(names[0].name, "item");
    }

    #[test]
    fn test_bare_relative_import() {
        let StmtKind::ImportFrom { module, level, .. } = first("from . import x\n") else {
            panic!("expected ImportFrom");
        };
        assert_eq!(module, None);
        assert_eq!(level, 1);
    }

    #[test]
    fn test_star_import() {
        let StmtKind::ImportFrom { names, .. } = first("from os import *\n") else {
            panic!("expected ImportFrom");
        };
        assert_eq!(names[0].name, "*");
    }

    #[test]
    fn test_parenthesized_import_list() {
        let StmtKind::ImportFrom { names, .. } =
            first("from m import (a, b as c,\n    d)\n")
        else {
            panic!("expected ImportFrom");
        };
        assert_eq!(names.len(), 3);
        assert_eq!(names[1].asname.as_deref(), Some("c"));
    }

    #[test]
    fn test_funcdef_argument_grammar() {
        let StmtKind::FunctionDef { args, returns, .. } =
            first("def f(a, b=1, *rest, c, d=2, **kw) -> int:\n    pass\n")
        else {
            panic!("expected FunctionDef");
        };
        assert_eq!(args.args.len(), 2);
        assert_eq!(args.defaults.len(), 1);
        assert_eq!(args.vararg.as_ref().unwrap().arg, "rest");
        assert_eq!(args.kwonlyargs.len(), 2);
        assert_eq!(args.kw_defaults, vec![None, Some(ExprKind::Constant { value: Constant::Int(2) }.into())]);
        assert_eq!(args.kwarg.as_ref().unwrap().arg, "kw");
        assert!(returns.is_some());
    }

    #[test]
    fn test_positional_only_marker() {
        let StmtKind::FunctionDef { args, .. } = first("def f(a, b, /, c):\n    pass\n") else {
            panic!("expected FunctionDef");
        };
        assert_eq!(args.posonlyargs.len(), 2);
        assert_eq!(args.args.len(), 1);
    }

    #[test]
    fn test_bare_star_keyword_only() {
        let StmtKind::FunctionDef { args, .. } = first("def f(a, *, b):\n    pass\n") else {
            panic!("expected FunctionDef");
        };
        assert!(args.vararg.is_none());
        assert_eq!(args.kwonlyargs.len(), 1);
    }

    #[test]
    fn test_async_funcdef() {
        assert!(matches!(
            first("async def f():\n    await g()\n"),
            StmtKind::AsyncFunctionDef { .. }
        ));
    }

    #[test]
    fn test_decorators_in_source_order() {
        let StmtKind::FunctionDef { decorator_list, .. } =
            first("@first\n@second(arg)\ndef f():\n    pass\n")
        else {
            panic!("expected FunctionDef");
        };
        assert_eq!(decorator_list.len(), 2);
        assert!(matches!(decorator_list[0].kind, ExprKind::Name { ref id } if id == "first"));
        assert!(matches!(decorator_list[1].kind, ExprKind::Call { .. }));
    }

    #[test]
    fn test_type_params_on_def() {
        let StmtKind::FunctionDef { type_params, .. } =
            first("def f[T, *Ts, **P](x: T) -> T:\n    return x\n")
        else {
            panic!("expected FunctionDef");
        };
        assert_eq!(type_params.len(), 3);
    }

    #[test]
    fn test_classdef_bases_and_keywords() {
        let StmtKind::ClassDef { bases, keywords, .. } =
            first("class C(Base, metaclass=Meta, **extra):\n    pass\n")
        else {
            panic!("expected ClassDef");
        };
        assert_eq!(bases.len(), 1);
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0].arg.as_deref(), Some("metaclass"));
    }

    #[test]
    fn test_assignment_forms() {
        assert!(matches!(first("x = 1\n"), StmtKind::Assign { .. }));
        let StmtKind::Assign { targets, .. } = first("a = b = 1\n") else {
            panic!("expected Assign");
        };
        assert_eq!(targets.len(), 2);
        let StmtKind::AugAssign { op, .. } = first("x //= 2\n") else {
            panic!("expected AugAssign");
        };
        assert_eq!(op, Operator::FloorDiv);
        let StmtKind::AnnAssign { simple, value, .. } = first("x: int = 5\n") else {
            panic!("expected AnnAssign");
        };
        assert_eq!(simple, 1);
        assert!(value.is_some());
    }

    #[test]
    fn test_ann_assign_attribute_not_simple() {
        let StmtKind::AnnAssign { simple, .. } = first("obj.x: int\n") else {
            panic!("expected AnnAssign");
        };
        assert_eq!(simple, 0);
    }

    #[test]
    fn test_tuple_unpacking_assignment() {
        let StmtKind::Assign { targets, .. } = first("a, *rest = items\n") else {
            panic!("expected Assign");
        };
        let ExprKind::Tuple { elts } = &targets[0].kind else {
            panic!("expected Tuple target");
        };
        assert!(matches!(elts[1].kind, ExprKind::Starred { .. }));
    }

    #[test]
    fn test_elif_becomes_nested_if() {
        let StmtKind::If { orelse, .. } = first("if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n")
        else {
            panic!("expected If");
        };
        assert_eq!(orelse.len(), 1);
        let StmtKind::If { orelse: inner, .. } = &orelse[0].kind else {
            panic!("expected nested If");
        };
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_for_else_and_tuple_target() {
        let StmtKind::For { target, orelse, .. } =
            first("for k, v in items:\n    pass\nelse:\n    pass\n")
        else {
            panic!("expected For");
        };
        assert!(matches!(target.kind, ExprKind::Tuple { .. }));
        assert_eq!(orelse.len(), 1);
    }

    #[test]
    fn test_while_else() {
        let StmtKind::While { orelse, .. } = first("while x:\n    pass\nelse:\n    pass\n")
        else {
            panic!("expected While");
        };
        assert_eq!(orelse.len(), 1);
    }

    #[test]
    fn test_with_items() {
        let StmtKind::With { items, .. } =
            first("with open('a') as f, lock:\n    pass\n")
        else {
            panic!("expected With");
        };
        assert_eq!(items.len(), 2);
        assert!(items[0].optional_vars.is_some());
        assert!(items[1].optional_vars.is_none());
    }

    #[test]
    fn test_async_for_and_with() {
        assert!(matches!(
            first("async for x in xs:\n    pass\n"),
            StmtKind::AsyncFor { .. }
        ));
        assert!(matches!(
            first("async with ctx:\n    pass\n"),
            StmtKind::AsyncWith { .. }
        ));
    }

    #[test]
    fn test_try_except_else_finally() {
        let StmtKind::Try {
            handlers,
            orelse,
            finalbody,
            ..
        } = first(
            "try:\n    pass\nexcept ValueError as e:\n    pass\nexcept Exception:\n    pass\nelse:\n    pass\nfinally:\n    pass\n",
        )
        else {
            panic!("expected Try");
        };
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].name.as_deref(), Some("e"));
        assert!(handlers[1].name.is_none());
        assert_eq!(orelse.len(), 1);
        assert_eq!(finalbody.len(), 1);
    }

    #[test]
    fn test_bare_except() {
        let StmtKind::Try { handlers, .. } = first("try:\n    pass\nexcept:\n    pass\n")
        else {
            panic!("expected Try");
        };
        assert!(handlers[0].type_.is_none());
    }

    #[test]
    fn test_global_nonlocal_delete_assert() {
        assert!(matches!(first("global a, b\n"), StmtKind::Global { names } if names.len() == 2));
        assert!(matches!(first("nonlocal z\n"), StmtKind::Nonlocal { .. }));
        assert!(matches!(first("del d[k], x\n"), StmtKind::Delete { targets } if targets.len() == 2));
        assert!(matches!(first("assert x, 'msg'\n"), StmtKind::Assert { msg: Some(_), .. }));
    }

    #[test]
    fn test_return_forms() {
        assert!(matches!(first("def f():\n    return\n"), StmtKind::FunctionDef { body, .. }
            if matches!(body[0].kind, StmtKind::Return { value: None })));
        assert!(matches!(first("def f():\n    return 1, 2\n"), StmtKind::FunctionDef { body, .. }
            if matches!(&body[0].kind, StmtKind::Return { value: Some(v) }
                if matches!(v.kind, ExprKind::Tuple { .. }))));
    }

    #[test]
    fn test_raise_from() {
        let StmtKind::Raise { exc, cause } = first("raise ValueError('x') from err\n") else {
            panic!("expected Raise");
        };
        assert!(exc.is_some());
        assert!(cause.is_some());
    }

    #[test]
    fn test_inline_suite() {
        let StmtKind::If { body, .. } = first("if x: a = 1; b = 2\n") else {
            panic!("expected If");
        };
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_missing_indent_is_indentation_error() {
        let err = parse("if x:\npass\n").unwrap_err();
        assert!(err.to_string().contains("IndentationError"));
    }

    #[test]
    fn test_type_alias_statement() {
        let StmtKind::TypeAlias { name, type_params, .. } =
            first("type Vector[T] = list[T]\n")
        else {
            panic!("expected TypeAlias");
        };
        assert!(matches!(name.kind, ExprKind::Name { ref id } if id == "Vector"));
        assert_eq!(type_params.len(), 1);
    }

    #[test]
    fn test_type_as_plain_name() {
        // `type(x)` is a call, not an alias statement.
        assert!(matches!(first("type(x)\n"), StmtKind::Expr { .. }));
        assert!(matches!(first("type = 5\n"), StmtKind::Assign { .. }));
    }

    #[test]
    fn test_nested_functions() {
        let StmtKind::FunctionDef { body, .. } =
            first("def outer():\n    def inner():\n        pass\n    return inner\n")
        else {
            panic!("expected FunctionDef");
        };
        assert!(matches!(body[0].kind, StmtKind::FunctionDef { .. }));
    }

    #[test]
    fn test_walrus_in_if_condition() {
        let StmtKind::If { test, .. } = first("if (n := len(a)) > 10:\n    pass\n") else {
            panic!("expected If");
        };
        assert!(matches!(test.kind, ExprKind::Compare { .. }));
    }
}
