//! AST rewriting: the transformer counterpart of the visitor.
//!
//! Hooks return fresh nodes — the input tree is never mutated.  Returning
//! `None` from a hook deletes the node when it sits in a list context (a
//! statement body, call arguments, tuple elements); in a required slot the
//! original child is kept instead.

use crate::ast::{
    Arg, Arguments, Comprehension, ExceptHandler, Expr, ExprKind, Keyword, MatchCase, Module,
    Pattern, Stmt, StmtKind, WithItem,
};

/// Tree-to-tree rewriting with one overridable hook per node family.  The
/// defaults rebuild each node with transformed children, so an identity
/// transformer returns a structural copy.
pub trait Transformer {
    fn transform_module(&mut self, module: &Module) -> Module {
        Module {
            body: transform_body(self, &module.body),
        }
    }

    fn transform_stmt(&mut self, stmt: &Stmt) -> Option<Stmt> {
        Some(rebuild_stmt(self, stmt))
    }

    fn transform_expr(&mut self, expr: &Expr) -> Option<Expr> {
        Some(rebuild_expr(self, expr))
    }

    fn transform_pattern(&mut self, pattern: &Pattern) -> Option<Pattern> {
        Some(rebuild_pattern(self, pattern))
    }
}

/// Transform a statement list, dropping deleted entries.
pub fn transform_body<T: Transformer + ?Sized>(t: &mut T, body: &[Stmt]) -> Vec<Stmt> {
    body.iter().filter_map(|s| t.transform_stmt(s)).collect()
}

// ── required-slot helpers (deletion keeps the original) ───────────────────────

fn req<T: Transformer + ?Sized>(t: &mut T, e: &Expr) -> Box<Expr> {
    Box::new(t.transform_expr(e).unwrap_or_else(|| e.clone()))
}

fn opt<T: Transformer + ?Sized>(t: &mut T, e: &Option<Box<Expr>>) -> Option<Box<Expr>> {
    e.as_ref().and_then(|e| t.transform_expr(e)).map(Box::new)
}

fn list<T: Transformer + ?Sized>(t: &mut T, list: &[Expr]) -> Vec<Expr> {
    list.iter().filter_map(|e| t.transform_expr(e)).collect()
}

fn req_pattern<T: Transformer + ?Sized>(t: &mut T, p: &Pattern) -> Pattern {
    t.transform_pattern(p).unwrap_or_else(|| p.clone())
}

fn patterns<T: Transformer + ?Sized>(t: &mut T, ps: &[Pattern]) -> Vec<Pattern> {
    ps.iter().filter_map(|p| t.transform_pattern(p)).collect()
}

fn arguments<T: Transformer + ?Sized>(t: &mut T, a: &Arguments) -> Arguments {
    let arg = |t: &mut T, a: &Arg| Arg {
        arg: a.arg.clone(),
        annotation: opt(t, &a.annotation),
    };
    Arguments {
        posonlyargs: a.posonlyargs.iter().map(|p| arg(t, p)).collect(),
        args: a.args.iter().map(|p| arg(t, p)).collect(),
        vararg: a.vararg.as_ref().map(|v| Box::new(arg(t, v))),
        kwonlyargs: a.kwonlyargs.iter().map(|p| arg(t, p)).collect(),
        kw_defaults: a
            .kw_defaults
            .iter()
            .map(|d| d.as_ref().and_then(|d| t.transform_expr(d)))
            .collect(),
        kwarg: a.kwarg.as_ref().map(|k| Box::new(arg(t, k))),
        defaults: list(t, &a.defaults),
    }
}

fn keywords<T: Transformer + ?Sized>(t: &mut T, ks: &[Keyword]) -> Vec<Keyword> {
    ks.iter()
        .map(|k| Keyword {
            arg: k.arg.clone(),
            value: *req(t, &k.value),
        })
        .collect()
}

fn comprehensions<T: Transformer + ?Sized>(t: &mut T, gens: &[Comprehension]) -> Vec<Comprehension> {
    gens.iter()
        .map(|g| Comprehension {
            target: *req(t, &g.target),
            iter: *req(t, &g.iter),
            ifs: list(t, &g.ifs),
            is_async: g.is_async,
        })
        .collect()
}

// ── rebuilders ────────────────────────────────────────────────────────────────

/// The default statement recursion: rebuild with transformed children.
pub fn rebuild_stmt<T: Transformer + ?Sized>(t: &mut T, stmt: &Stmt) -> Stmt {
    let kind = match &stmt.kind {
        StmtKind::Import { names } => StmtKind::Import {
            names: names.clone(),
        },
        StmtKind::ImportFrom {
            module,
            names,
            level,
        } => StmtKind::ImportFrom {
            module: module.clone(),
            names: names.clone(),
            level: *level,
        },
        StmtKind::FunctionDef {
            name,
            type_params,
            args,
            body,
            decorator_list,
            returns,
        } => StmtKind::FunctionDef {
            name: name.clone(),
            type_params: type_params.clone(),
            args: arguments(t, args),
            body: transform_body(t, body),
            decorator_list: list(t, decorator_list),
            returns: opt(t, returns),
        },
        StmtKind::AsyncFunctionDef {
            name,
            type_params,
            args,
            body,
            decorator_list,
            returns,
        } => StmtKind::AsyncFunctionDef {
            name: name.clone(),
            type_params: type_params.clone(),
            args: arguments(t, args),
            body: transform_body(t, body),
            decorator_list: list(t, decorator_list),
            returns: opt(t, returns),
        },
        StmtKind::ClassDef {
            name,
            type_params,
            bases,
            keywords: kws,
            body,
            decorator_list,
        } => StmtKind::ClassDef {
            name: name.clone(),
            type_params: type_params.clone(),
            bases: list(t, bases),
            keywords: keywords(t, kws),
            body: transform_body(t, body),
            decorator_list: list(t, decorator_list),
        },
        StmtKind::Assign { targets, value } => StmtKind::Assign {
            targets: list(t, targets),
            value: req(t, value),
        },
        StmtKind::AugAssign { target, op, value } => StmtKind::AugAssign {
            target: req(t, target),
            op: *op,
            value: req(t, value),
        },
        StmtKind::AnnAssign {
            target,
            annotation,
            value,
            simple,
        } => StmtKind::AnnAssign {
            target: req(t, target),
            annotation: req(t, annotation),
            value: opt(t, value),
            simple: *simple,
        },
        StmtKind::TypeAlias {
            name,
            type_params,
            value,
        } => StmtKind::TypeAlias {
            name: req(t, name),
            type_params: type_params.clone(),
            value: req(t, value),
        },
        StmtKind::If { test, body, orelse } => StmtKind::If {
            test: req(t, test),
            body: transform_body(t, body),
            orelse: transform_body(t, orelse),
        },
        StmtKind::While { test, body, orelse } => StmtKind::While {
            test: req(t, test),
            body: transform_body(t, body),
            orelse: transform_body(t, orelse),
        },
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => StmtKind::For {
            target: req(t, target),
            iter: req(t, iter),
            body: transform_body(t, body),
            orelse: transform_body(t, orelse),
        },
        StmtKind::AsyncFor {
            target,
            iter,
            body,
            orelse,
        } => StmtKind::AsyncFor {
            target: req(t, target),
            iter: req(t, iter),
            body: transform_body(t, body),
            orelse: transform_body(t, orelse),
        },
        StmtKind::With { items, body } => StmtKind::With {
            items: with_items(t, items),
            body: transform_body(t, body),
        },
        StmtKind::AsyncWith { items, body } => StmtKind::AsyncWith {
            items: with_items(t, items),
            body: transform_body(t, body),
        },
        StmtKind::Match { subject, cases } => StmtKind::Match {
            subject: req(t, subject),
            cases: cases
                .iter()
                .map(|c| MatchCase {
                    pattern: req_pattern(t, &c.pattern),
                    guard: opt(t, &c.guard),
                    body: transform_body(t, &c.body),
                })
                .collect(),
        },
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => StmtKind::Try {
            body: transform_body(t, body),
            handlers: handlers
                .iter()
                .map(|h| ExceptHandler {
                    type_: opt(t, &h.type_),
                    name: h.name.clone(),
                    body: transform_body(t, &h.body),
                })
                .collect(),
            orelse: transform_body(t, orelse),
            finalbody: transform_body(t, finalbody),
        },
        StmtKind::Raise { exc, cause } => StmtKind::Raise {
            exc: opt(t, exc),
            cause: opt(t, cause),
        },
        StmtKind::Return { value } => StmtKind::Return {
            value: opt(t, value),
        },
        StmtKind::Delete { targets } => StmtKind::Delete {
            targets: list(t, targets),
        },
        StmtKind::Assert { test, msg } => StmtKind::Assert {
            test: req(t, test),
            msg: opt(t, msg),
        },
        StmtKind::Expr { value } => StmtKind::Expr {
            value: req(t, value),
        },
        StmtKind::Pass => StmtKind::Pass,
        StmtKind::Break => StmtKind::Break,
        StmtKind::Continue => StmtKind::Continue,
        StmtKind::Global { names } => StmtKind::Global {
            names: names.clone(),
        },
        StmtKind::Nonlocal { names } => StmtKind::Nonlocal {
            names: names.clone(),
        },
    };
    Stmt {
        kind,
        span: stmt.span,
    }
}

fn with_items<T: Transformer + ?Sized>(t: &mut T, items: &[WithItem]) -> Vec<WithItem> {
    items
        .iter()
        .map(|item| WithItem {
            context_expr: *req(t, &item.context_expr),
            optional_vars: opt(t, &item.optional_vars),
        })
        .collect()
}

/// The default expression recursion: rebuild with transformed children.
pub fn rebuild_expr<T: Transformer + ?Sized>(t: &mut T, expr: &Expr) -> Expr {
    let kind = match &expr.kind {
        ExprKind::BoolOp { op, values } => ExprKind::BoolOp {
            op: *op,
            values: list(t, values),
        },
        ExprKind::NamedExpr { target, value } => ExprKind::NamedExpr {
            target: req(t, target),
            value: req(t, value),
        },
        ExprKind::BinOp { left, op, right } => ExprKind::BinOp {
            left: req(t, left),
            op: *op,
            right: req(t, right),
        },
        ExprKind::UnaryOp { op, operand } => ExprKind::UnaryOp {
            op: *op,
            operand: req(t, operand),
        },
        ExprKind::Lambda { args, body } => ExprKind::Lambda {
            args: Box::new(arguments(t, args)),
            body: req(t, body),
        },
        ExprKind::IfExp { test, body, orelse } => ExprKind::IfExp {
            test: req(t, test),
            body: req(t, body),
            orelse: req(t, orelse),
        },
        ExprKind::Dict { keys, values } => {
            // Deleting a value would desynchronize the parallel arrays, so
            // dict entries use keep-original semantics for both halves.
            let keys = keys
                .iter()
                .map(|k| k.as_ref().map(|k| *req(t, k)))
                .collect();
            let values = values.iter().map(|v| *req(t, v)).collect();
            ExprKind::Dict { keys, values }
        }
        ExprKind::Set { elts } => ExprKind::Set {
            elts: list(t, elts),
        },
        ExprKind::List { elts } => ExprKind::List {
            elts: list(t, elts),
        },
        ExprKind::Tuple { elts } => ExprKind::Tuple {
            elts: list(t, elts),
        },
        ExprKind::ListComp { elt, generators } => ExprKind::ListComp {
            elt: req(t, elt),
            generators: comprehensions(t, generators),
        },
        ExprKind::SetComp { elt, generators } => ExprKind::SetComp {
            elt: req(t, elt),
            generators: comprehensions(t, generators),
        },
        ExprKind::DictComp {
            key,
            value,
            generators,
        } => ExprKind::DictComp {
            key: req(t, key),
            value: req(t, value),
            generators: comprehensions(t, generators),
        },
        ExprKind::GeneratorExp { elt, generators } => ExprKind::GeneratorExp {
            elt: req(t, elt),
            generators: comprehensions(t, generators),
        },
        ExprKind::Await { value } => ExprKind::Await {
            value: req(t, value),
        },
        ExprKind::Yield { value } => ExprKind::Yield {
            value: opt(t, value),
        },
        ExprKind::YieldFrom { value } => ExprKind::YieldFrom {
            value: req(t, value),
        },
        ExprKind::Compare {
            left,
            ops,
            comparators,
        } => ExprKind::Compare {
            left: req(t, left),
            ops: ops.clone(),
            // Parallel with `ops` — keep-original semantics.
            comparators: comparators.iter().map(|c| *req(t, c)).collect(),
        },
        ExprKind::Call {
            func,
            args,
            keywords: kws,
        } => ExprKind::Call {
            func: req(t, func),
            args: list(t, args),
            keywords: keywords(t, kws),
        },
        ExprKind::FormattedValue {
            value,
            conversion,
            format_spec,
        } => ExprKind::FormattedValue {
            value: req(t, value),
            conversion: *conversion,
            format_spec: opt(t, format_spec),
        },
        ExprKind::JoinedStr { values } => ExprKind::JoinedStr {
            values: list(t, values),
        },
        ExprKind::Constant { value } => ExprKind::Constant {
            value: value.clone(),
        },
        ExprKind::Attribute { value, attr } => ExprKind::Attribute {
            value: req(t, value),
            attr: attr.clone(),
        },
        ExprKind::Subscript { value, slice } => ExprKind::Subscript {
            value: req(t, value),
            slice: req(t, slice),
        },
        ExprKind::Starred { value } => ExprKind::Starred {
            value: req(t, value),
        },
        ExprKind::Name { id } => ExprKind::Name { id: id.clone() },
        ExprKind::Slice { lower, upper, step } => ExprKind::Slice {
            lower: opt(t, lower),
            upper: opt(t, upper),
            step: opt(t, step),
        },
    };
    Expr {
        kind,
        span: expr.span,
    }
}

/// The default pattern recursion.
pub fn rebuild_pattern<T: Transformer + ?Sized>(t: &mut T, pattern: &Pattern) -> Pattern {
    match pattern {
        Pattern::MatchValue { value } => Pattern::MatchValue {
            value: req(t, value),
        },
        Pattern::MatchSingleton { value } => Pattern::MatchSingleton {
            value: value.clone(),
        },
        Pattern::MatchSequence { patterns: ps } => Pattern::MatchSequence {
            patterns: patterns(t, ps),
        },
        Pattern::MatchMapping {
            keys,
            patterns: ps,
            rest,
        } => Pattern::MatchMapping {
            keys: keys.iter().map(|k| *req(t, k)).collect(),
            patterns: ps.iter().map(|p| req_pattern(t, p)).collect(),
            rest: rest.clone(),
        },
        Pattern::MatchClass {
            cls,
            patterns: ps,
            kwd_attrs,
            kwd_patterns,
        } => Pattern::MatchClass {
            cls: req(t, cls),
            patterns: patterns(t, ps),
            kwd_attrs: kwd_attrs.clone(),
            kwd_patterns: kwd_patterns.iter().map(|p| req_pattern(t, p)).collect(),
        },
        Pattern::MatchStar { name } => Pattern::MatchStar { name: name.clone() },
        Pattern::MatchAs { pattern, name } => Pattern::MatchAs {
            pattern: pattern
                .as_ref()
                .map(|p| Box::new(req_pattern(t, p))),
            name: name.clone(),
        },
        Pattern::MatchOr { patterns: ps } => Pattern::MatchOr {
            patterns: patterns(t, ps),
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
