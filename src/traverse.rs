//! AST traversal: the generator walk, typed node queries, and the visitor.
//!
//! [`NodeRef`] is a borrow enum over every node family; [`walk`] yields each
//! node exactly once in depth-first preorder using an explicit stack.  The
//! [`Visitor`] trait carries one overridable hook per node family whose
//! default recurses via the `walk_*` functions, so unhandled nodes never stop
//! a traversal.

use crate::ast::{
    Alias, Arg, Arguments, Comprehension, ExceptHandler, Expr, ExprKind, Keyword, MatchCase,
    Module, Pattern, Stmt, StmtKind, TypeParam, WithItem,
};

// ── NodeRef ───────────────────────────────────────────────────────────────────

/// A borrowed reference to any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Module(&'a Module),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Pattern(&'a Pattern),
    TypeParam(&'a TypeParam),
    Alias(&'a Alias),
    Arguments(&'a Arguments),
    Arg(&'a Arg),
    Keyword(&'a Keyword),
    WithItem(&'a WithItem),
    Comprehension(&'a Comprehension),
    MatchCase(&'a MatchCase),
    ExceptHandler(&'a ExceptHandler),
}

impl<'a> From<&'a Module> for NodeRef<'a> {
    fn from(m: &'a Module) -> Self {
        NodeRef::Module(m)
    }
}

impl<'a> From<&'a Stmt> for NodeRef<'a> {
    fn from(s: &'a Stmt) -> Self {
        NodeRef::Stmt(s)
    }
}

impl<'a> From<&'a Expr> for NodeRef<'a> {
    fn from(e: &'a Expr) -> Self {
        NodeRef::Expr(e)
    }
}

impl<'a> NodeRef<'a> {
    /// The node's JSON `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            NodeRef::Module(_) => "Module",
            NodeRef::Stmt(s) => s.kind.tag(),
            NodeRef::Expr(e) => e.kind.tag(),
            NodeRef::Pattern(p) => p.tag(),
            NodeRef::TypeParam(t) => t.tag(),
            NodeRef::Alias(_) => "alias",
            NodeRef::Arguments(_) => "arguments",
            NodeRef::Arg(_) => "arg",
            NodeRef::Keyword(_) => "keyword",
            NodeRef::WithItem(_) => "withitem",
            NodeRef::Comprehension(_) => "comprehension",
            NodeRef::MatchCase(_) => "match_case",
            NodeRef::ExceptHandler(_) => "ExceptHandler",
        }
    }

    pub fn as_stmt(&self) -> Option<&'a Stmt> {
        match self {
            NodeRef::Stmt(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_expr(&self) -> Option<&'a Expr> {
        match self {
            NodeRef::Expr(e) => Some(e),
            _ => None,
        }
    }

    /// Every node-valued field, in declaration order.  Scalar fields are
    /// skipped.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        match self {
            NodeRef::Module(m) => stmts(&mut out, &m.body),
            NodeRef::Stmt(s) => stmt_children(&mut out, &s.kind),
            NodeRef::Expr(e) => expr_children(&mut out, &e.kind),
            NodeRef::Pattern(p) => pattern_children(&mut out, p),
            NodeRef::TypeParam(t) => {
                if let TypeParam::TypeVar {
                    bound: Some(bound), ..
                } = t
                {
                    out.push(NodeRef::Expr(bound));
                }
            }
            NodeRef::Alias(_) => {}
            NodeRef::Arguments(a) => arguments_children(&mut out, a),
            NodeRef::Arg(a) => {
                if let Some(ann) = &a.annotation {
                    out.push(NodeRef::Expr(ann));
                }
            }
            NodeRef::Keyword(k) => out.push(NodeRef::Expr(&k.value)),
            NodeRef::WithItem(w) => {
                out.push(NodeRef::Expr(&w.context_expr));
                if let Some(v) = &w.optional_vars {
                    out.push(NodeRef::Expr(v));
                }
            }
            NodeRef::Comprehension(c) => {
                out.push(NodeRef::Expr(&c.target));
                out.push(NodeRef::Expr(&c.iter));
                exprs(&mut out, &c.ifs);
            }
            NodeRef::MatchCase(c) => {
                out.push(NodeRef::Pattern(&c.pattern));
                if let Some(g) = &c.guard {
                    out.push(NodeRef::Expr(g));
                }
                stmts(&mut out, &c.body);
            }
            NodeRef::ExceptHandler(h) => {
                if let Some(t) = &h.type_ {
                    out.push(NodeRef::Expr(t));
                }
                stmts(&mut out, &h.body);
            }
        }
        out
    }
}

fn stmts<'a>(out: &mut Vec<NodeRef<'a>>, body: &'a [Stmt]) {
    out.extend(body.iter().map(NodeRef::Stmt));
}

fn exprs<'a>(out: &mut Vec<NodeRef<'a>>, list: &'a [Expr]) {
    out.extend(list.iter().map(NodeRef::Expr));
}

fn stmt_children<'a>(out: &mut Vec<NodeRef<'a>>, kind: &'a StmtKind) {
    match kind {
        StmtKind::Import { names } | StmtKind::ImportFrom { names, .. } => {
            out.extend(names.iter().map(NodeRef::Alias));
        }
        StmtKind::FunctionDef {
            type_params,
            args,
            body,
            decorator_list,
            returns,
            ..
        }
        | StmtKind::AsyncFunctionDef {
            type_params,
            args,
            body,
            decorator_list,
            returns,
            ..
        } => {
            out.extend(type_params.iter().map(NodeRef::TypeParam));
            out.push(NodeRef::Arguments(args));
            stmts(out, body);
            exprs(out, decorator_list);
            if let Some(r) = returns {
                out.push(NodeRef::Expr(r));
            }
        }
        StmtKind::ClassDef {
            type_params,
            bases,
            keywords,
            body,
            decorator_list,
            ..
        } => {
            out.extend(type_params.iter().map(NodeRef::TypeParam));
            exprs(out, bases);
            out.extend(keywords.iter().map(NodeRef::Keyword));
            stmts(out, body);
            exprs(out, decorator_list);
        }
        StmtKind::Assign { targets, value } => {
            exprs(out, targets);
            out.push(NodeRef::Expr(value));
        }
        StmtKind::AugAssign { target, value, .. } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(value));
        }
        StmtKind::AnnAssign {
            target,
            annotation,
            value,
            ..
        } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(annotation));
            if let Some(v) = value {
                out.push(NodeRef::Expr(v));
            }
        }
        StmtKind::TypeAlias {
            name,
            type_params,
            value,
        } => {
            out.push(NodeRef::Expr(name));
            out.extend(type_params.iter().map(NodeRef::TypeParam));
            out.push(NodeRef::Expr(value));
        }
        StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
            out.push(NodeRef::Expr(test));
            stmts(out, body);
            stmts(out, orelse);
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        }
        | StmtKind::AsyncFor {
            target,
            iter,
            body,
            orelse,
        } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(iter));
            stmts(out, body);
            stmts(out, orelse);
        }
        StmtKind::With { items, body } | StmtKind::AsyncWith { items, body } => {
            out.extend(items.iter().map(NodeRef::WithItem));
            stmts(out, body);
        }
        StmtKind::Match { subject, cases } => {
            out.push(NodeRef::Expr(subject));
            out.extend(cases.iter().map(NodeRef::MatchCase));
        }
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            stmts(out, body);
            out.extend(handlers.iter().map(NodeRef::ExceptHandler));
            stmts(out, orelse);
            stmts(out, finalbody);
        }
        StmtKind::Raise { exc, cause } => {
            if let Some(e) = exc {
                out.push(NodeRef::Expr(e));
            }
            if let Some(c) = cause {
                out.push(NodeRef::Expr(c));
            }
        }
        StmtKind::Return { value } => {
            if let Some(v) = value {
                out.push(NodeRef::Expr(v));
            }
        }
        StmtKind::Delete { targets } => exprs(out, targets),
        StmtKind::Assert { test, msg } => {
            out.push(NodeRef::Expr(test));
            if let Some(m) = msg {
                out.push(NodeRef::Expr(m));
            }
        }
        StmtKind::Expr { value } => out.push(NodeRef::Expr(value)),
        StmtKind::Pass
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Global { .. }
        | StmtKind::Nonlocal { .. } => {}
    }
}

fn expr_children<'a>(out: &mut Vec<NodeRef<'a>>, kind: &'a ExprKind) {
    match kind {
        ExprKind::BoolOp { values, .. } | ExprKind::JoinedStr { values } => exprs(out, values),
        ExprKind::NamedExpr { target, value } => {
            out.push(NodeRef::Expr(target));
            out.push(NodeRef::Expr(value));
        }
        ExprKind::BinOp { left, right, .. } => {
            out.push(NodeRef::Expr(left));
            out.push(NodeRef::Expr(right));
        }
        ExprKind::UnaryOp { operand, .. } => out.push(NodeRef::Expr(operand)),
        ExprKind::Lambda { args, body } => {
            out.push(NodeRef::Arguments(args));
            out.push(NodeRef::Expr(body));
        }
        ExprKind::IfExp { test, body, orelse } => {
            out.push(NodeRef::Expr(test));
            out.push(NodeRef::Expr(body));
            out.push(NodeRef::Expr(orelse));
        }
        ExprKind::Dict { keys, values } => {
            for (key, value) in keys.iter().zip(values) {
                if let Some(k) = key {
                    out.push(NodeRef::Expr(k));
                }
                out.push(NodeRef::Expr(value));
            }
        }
        ExprKind::Set { elts } | ExprKind::List { elts } | ExprKind::Tuple { elts } => {
            exprs(out, elts);
        }
        ExprKind::ListComp { elt, generators }
        | ExprKind::SetComp { elt, generators }
        | ExprKind::GeneratorExp { elt, generators } => {
            out.push(NodeRef::Expr(elt));
            out.extend(generators.iter().map(NodeRef::Comprehension));
        }
        ExprKind::DictComp {
            key,
            value,
            generators,
        } => {
            out.push(NodeRef::Expr(key));
            out.push(NodeRef::Expr(value));
            out.extend(generators.iter().map(NodeRef::Comprehension));
        }
        ExprKind::Await { value }
        | ExprKind::YieldFrom { value }
        | ExprKind::Starred { value }
        | ExprKind::Attribute { value, .. } => out.push(NodeRef::Expr(value)),
        ExprKind::Yield { value } => {
            if let Some(v) = value {
                out.push(NodeRef::Expr(v));
            }
        }
        ExprKind::Compare {
            left, comparators, ..
        } => {
            out.push(NodeRef::Expr(left));
            exprs(out, comparators);
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            out.push(NodeRef::Expr(func));
            exprs(out, args);
            out.extend(keywords.iter().map(NodeRef::Keyword));
        }
        ExprKind::FormattedValue {
            value, format_spec, ..
        } => {
            out.push(NodeRef::Expr(value));
            if let Some(spec) = format_spec {
                out.push(NodeRef::Expr(spec));
            }
        }
        ExprKind::Subscript { value, slice } => {
            out.push(NodeRef::Expr(value));
            out.push(NodeRef::Expr(slice));
        }
        ExprKind::Slice { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                out.push(NodeRef::Expr(part));
            }
        }
        ExprKind::Constant { .. } | ExprKind::Name { .. } => {}
    }
}

fn pattern_children<'a>(out: &mut Vec<NodeRef<'a>>, pattern: &'a Pattern) {
    match pattern {
        Pattern::MatchValue { value } => out.push(NodeRef::Expr(value)),
        Pattern::MatchSequence { patterns } | Pattern::MatchOr { patterns } => {
            out.extend(patterns.iter().map(NodeRef::Pattern));
        }
        Pattern::MatchMapping { keys, patterns, .. } => {
            exprs(out, keys);
            out.extend(patterns.iter().map(NodeRef::Pattern));
        }
        Pattern::MatchClass {
            cls,
            patterns,
            kwd_patterns,
            ..
        } => {
            out.push(NodeRef::Expr(cls));
            out.extend(patterns.iter().map(NodeRef::Pattern));
            out.extend(kwd_patterns.iter().map(NodeRef::Pattern));
        }
        Pattern::MatchAs { pattern, .. } => {
            if let Some(p) = pattern {
                out.push(NodeRef::Pattern(p));
            }
        }
        Pattern::MatchSingleton { .. } | Pattern::MatchStar { .. } => {}
    }
}

fn arguments_children<'a>(out: &mut Vec<NodeRef<'a>>, a: &'a Arguments) {
    out.extend(a.posonlyargs.iter().map(NodeRef::Arg));
    out.extend(a.args.iter().map(NodeRef::Arg));
    if let Some(v) = &a.vararg {
        out.push(NodeRef::Arg(v));
    }
    out.extend(a.kwonlyargs.iter().map(NodeRef::Arg));
    for default in a.kw_defaults.iter().flatten() {
        out.push(NodeRef::Expr(default));
    }
    if let Some(k) = &a.kwarg {
        out.push(NodeRef::Arg(k));
    }
    exprs(out, &a.defaults);
}

// ── walk and queries ──────────────────────────────────────────────────────────

/// Depth-first preorder iterator over every node reachable from the root.
pub struct Walk<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let mut children = node.children();
        children.reverse();
        self.stack.extend(children);
        Some(node)
    }
}

/// Walk the tree rooted at `node`, yielding every node exactly once in
/// preorder.
pub fn walk<'a>(node: impl Into<NodeRef<'a>>) -> Walk<'a> {
    Walk {
        stack: vec![node.into()],
    }
}

/// All nodes whose tag is in `kinds` (one element for a single-kind query).
pub fn nodes_of_kind<'a>(node: impl Into<NodeRef<'a>>, kinds: &[&str]) -> Vec<NodeRef<'a>> {
    walk(node).filter(|n| kinds.contains(&n.kind())).collect()
}

/// First node matching `predicate`, in preorder.
pub fn find<'a>(
    node: impl Into<NodeRef<'a>>,
    predicate: impl Fn(&NodeRef<'a>) -> bool,
) -> Option<NodeRef<'a>> {
    walk(node).find(|n| predicate(n))
}

/// Every node matching `predicate`, in preorder.
pub fn find_all<'a>(
    node: impl Into<NodeRef<'a>>,
    predicate: impl Fn(&NodeRef<'a>) -> bool,
) -> Vec<NodeRef<'a>> {
    walk(node).filter(|n| predicate(n)).collect()
}

// ── Visitor ───────────────────────────────────────────────────────────────────

/// Read-only traversal with one overridable hook per node family.
///
/// Every hook's default body recurses into the node's children via the
/// matching `walk_*` function, so overriding only the hooks you care about
/// never cuts a traversal short.  Call the `walk_*` function from an override
/// to keep descending.
pub trait Visitor {
    fn visit_module(&mut self, module: &Module) {
        walk_module(self, module);
    }
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
    fn visit_pattern(&mut self, pattern: &Pattern) {
        walk_pattern(self, pattern);
    }
    fn visit_type_param(&mut self, type_param: &TypeParam) {
        walk_node(self, NodeRef::TypeParam(type_param));
    }
    fn visit_alias(&mut self, _alias: &Alias) {}
    fn visit_arguments(&mut self, arguments: &Arguments) {
        walk_node(self, NodeRef::Arguments(arguments));
    }
    fn visit_arg(&mut self, arg: &Arg) {
        walk_node(self, NodeRef::Arg(arg));
    }
    fn visit_keyword(&mut self, keyword: &Keyword) {
        walk_node(self, NodeRef::Keyword(keyword));
    }
    fn visit_with_item(&mut self, with_item: &WithItem) {
        walk_node(self, NodeRef::WithItem(with_item));
    }
    fn visit_comprehension(&mut self, comprehension: &Comprehension) {
        walk_node(self, NodeRef::Comprehension(comprehension));
    }
    fn visit_match_case(&mut self, match_case: &MatchCase) {
        walk_node(self, NodeRef::MatchCase(match_case));
    }
    fn visit_except_handler(&mut self, handler: &ExceptHandler) {
        walk_node(self, NodeRef::ExceptHandler(handler));
    }
}

/// Dispatch one node to its family hook.
fn dispatch<V: Visitor + ?Sized>(visitor: &mut V, node: NodeRef<'_>) {
    match node {
        NodeRef::Module(m) => visitor.visit_module(m),
        NodeRef::Stmt(s) => visitor.visit_stmt(s),
        NodeRef::Expr(e) => visitor.visit_expr(e),
        NodeRef::Pattern(p) => visitor.visit_pattern(p),
        NodeRef::TypeParam(t) => visitor.visit_type_param(t),
        NodeRef::Alias(a) => visitor.visit_alias(a),
        NodeRef::Arguments(a) => visitor.visit_arguments(a),
        NodeRef::Arg(a) => visitor.visit_arg(a),
        NodeRef::Keyword(k) => visitor.visit_keyword(k),
        NodeRef::WithItem(w) => visitor.visit_with_item(w),
        NodeRef::Comprehension(c) => visitor.visit_comprehension(c),
        NodeRef::MatchCase(c) => visitor.visit_match_case(c),
        NodeRef::ExceptHandler(h) => visitor.visit_except_handler(h),
    }
}

/// The generic recursion: visit every child of `node`.  This is the
/// `generic_visit` of the visitor protocol.
pub fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: NodeRef<'_>) {
    for child in node.children() {
        dispatch(visitor, child);
    }
}

pub fn walk_module<V: Visitor + ?Sized>(visitor: &mut V, module: &Module) {
    walk_node(visitor, NodeRef::Module(module));
}

pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    walk_node(visitor, NodeRef::Stmt(stmt));
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    walk_node(visitor, NodeRef::Expr(expr));
}

pub fn walk_pattern<V: Visitor + ?Sized>(visitor: &mut V, pattern: &Pattern) {
    walk_node(visitor, NodeRef::Pattern(pattern));
}

// ── Tests ─────────────────────────────────────────────────────────────────────
