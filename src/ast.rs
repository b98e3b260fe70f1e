//! AST node definitions shared by the parser, the traversal framework, the
//! transformer and the tests.
//!
//! The tree mirrors CPython's `ast` module in shape and naming: every node
//! serializes to JSON as `{"type": "<TagName>", "<field>": <value>, ...}`
//! with arrays for repeated fields and `null` for missing optionals.
//! Deserialization rejects unknown tags.
//!
//! Statements and expressions are wrapper structs (`Stmt`, `Expr`) carrying a
//! kind enum plus an optional source span.  Equality ignores spans so tests
//! can compare hand-built trees against parser output.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};

// ── Spans ─────────────────────────────────────────────────────────────────────

/// Source range of a node.  Lines are 1-based, columns are 0-based UTF-8 byte
/// offsets within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

// ── Module root ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub body: Vec<Stmt>,
}

impl Module {
    /// Serialize this module to the interop JSON shape.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("AST nodes always serialize")
    }

    /// Rebuild a module from its interop JSON shape.  Fails on unknown tags
    /// or malformed fields.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

// ── Statements ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Option<Span>,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self {
            kind,
            span: Some(span),
        }
    }
}

/// Span metadata is ignored: two statements are equal when their kinds are.
impl PartialEq for Stmt {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl From<StmtKind> for Stmt {
    fn from(kind: StmtKind) -> Self {
        Self { kind, span: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StmtKind {
    Import {
        names: Vec<Alias>,
    },
    ImportFrom {
        module: Option<String>,
        names: Vec<Alias>,
        level: u32,
    },
    FunctionDef {
        name: String,
        type_params: Vec<TypeParam>,
        args: Arguments,
        body: Vec<Stmt>,
        decorator_list: Vec<Expr>,
        returns: Option<Box<Expr>>,
    },
    AsyncFunctionDef {
        name: String,
        type_params: Vec<TypeParam>,
        args: Arguments,
        body: Vec<Stmt>,
        decorator_list: Vec<Expr>,
        returns: Option<Box<Expr>>,
    },
    ClassDef {
        name: String,
        type_params: Vec<TypeParam>,
        bases: Vec<Expr>,
        keywords: Vec<Keyword>,
        body: Vec<Stmt>,
        decorator_list: Vec<Expr>,
    },
    Assign {
        targets: Vec<Expr>,
        value: Box<Expr>,
    },
    AugAssign {
        target: Box<Expr>,
        op: Operator,
        value: Box<Expr>,
    },
    AnnAssign {
        target: Box<Expr>,
        annotation: Box<Expr>,
        value: Option<Box<Expr>>,
        simple: u8,
    },
    TypeAlias {
        name: Box<Expr>,
        type_params: Vec<TypeParam>,
        value: Box<Expr>,
    },
    If {
        test: Box<Expr>,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Box<Expr>,
        iter: Box<Expr>,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    AsyncFor {
        target: Box<Expr>,
        iter: Box<Expr>,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Box<Expr>,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    With {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },
    AsyncWith {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },
    Match {
        subject: Box<Expr>,
        cases: Vec<MatchCase>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    Raise {
        exc: Option<Box<Expr>>,
        cause: Option<Box<Expr>>,
    },
    Return {
        value: Option<Box<Expr>>,
    },
    Delete {
        targets: Vec<Expr>,
    },
    Pass,
    Break,
    Continue,
    Global {
        names: Vec<String>,
    },
    Nonlocal {
        names: Vec<String>,
    },
    Assert {
        test: Box<Expr>,
        msg: Option<Box<Expr>>,
    },
    Expr {
        value: Box<Expr>,
    },
}

impl StmtKind {
    /// The JSON `type` tag of this statement kind.
    pub fn tag(&self) -> &'static str {
        match self {
            StmtKind::Import { .. } => "Import",
            StmtKind::ImportFrom { .. } => "ImportFrom",
            StmtKind::FunctionDef { .. } => "FunctionDef",
            StmtKind::AsyncFunctionDef { .. } => "AsyncFunctionDef",
            StmtKind::ClassDef { .. } => "ClassDef",
            StmtKind::Assign { .. } => "Assign",
            StmtKind::AugAssign { .. } => "AugAssign",
            StmtKind::AnnAssign { .. } => "AnnAssign",
            StmtKind::TypeAlias { .. } => "TypeAlias",
            StmtKind::If { .. } => "If",
            StmtKind::For { .. } => "For",
            StmtKind::AsyncFor { .. } => "AsyncFor",
            StmtKind::While { .. } => "While",
            StmtKind::With { .. } => "With",
            StmtKind::AsyncWith { .. } => "AsyncWith",
            StmtKind::Match { .. } => "Match",
            StmtKind::Try { .. } => "Try",
            StmtKind::Raise { .. } => "Raise",
            StmtKind::Return { .. } => "Return",
            StmtKind::Delete { .. } => "Delete",
            StmtKind::Pass => "Pass",
            StmtKind::Break => "Break",
            StmtKind::Continue => "Continue",
            StmtKind::Global { .. } => "Global",
            StmtKind::Nonlocal { .. } => "Nonlocal",
            StmtKind::Assert { .. } => "Assert",
            StmtKind::Expr { .. } => "Expr",
        }
    }
}

// ── Expressions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Option<Span>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span: Some(span),
        }
    }
}

/// Span metadata is ignored: two expressions are equal when their kinds are.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Self {
        Self { kind, span: None }
    }
}

/// `None` constant — used when a helper node is built incrementally.
impl Default for Expr {
    fn default() -> Self {
        ExprKind::Constant {
            value: Constant::None,
        }
        .into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExprKind {
    BoolOp {
        op: BoolOperator,
        values: Vec<Expr>,
    },
    NamedExpr {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    BinOp {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Lambda {
        args: Box<Arguments>,
        body: Box<Expr>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    /// A `null` entry in `keys` marks a `**expr` spread whose expression sits
    /// at the same index in `values`.
    Dict {
        keys: Vec<Option<Expr>>,
        values: Vec<Expr>,
    },
    Set {
        elts: Vec<Expr>,
    },
    List {
        elts: Vec<Expr>,
    },
    Tuple {
        elts: Vec<Expr>,
    },
    ListComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    SetComp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    GeneratorExp {
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    Await {
        value: Box<Expr>,
    },
    Yield {
        value: Option<Box<Expr>>,
    },
    YieldFrom {
        value: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOperator>,
        comparators: Vec<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    FormattedValue {
        value: Box<Expr>,
        conversion: i32,
        format_spec: Option<Box<Expr>>,
    },
    JoinedStr {
        values: Vec<Expr>,
    },
    Constant {
        value: Constant,
    },
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        slice: Box<Expr>,
    },
    Starred {
        value: Box<Expr>,
    },
    Name {
        id: String,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
}

impl ExprKind {
    /// The JSON `type` tag of this expression kind.
    pub fn tag(&self) -> &'static str {
        match self {
            ExprKind::BoolOp { .. } => "BoolOp",
            ExprKind::NamedExpr { .. } => "NamedExpr",
            ExprKind::BinOp { .. } => "BinOp",
            ExprKind::UnaryOp { .. } => "UnaryOp",
            ExprKind::Lambda { .. } => "Lambda",
            ExprKind::IfExp { .. } => "IfExp",
            ExprKind::Dict { .. } => "Dict",
            ExprKind::Set { .. } => "Set",
            ExprKind::List { .. } => "List",
            ExprKind::Tuple { .. } => "Tuple",
            ExprKind::ListComp { .. } => "ListComp",
            ExprKind::SetComp { .. } => "SetComp",
            ExprKind::DictComp { .. } => "DictComp",
            ExprKind::GeneratorExp { .. } => "GeneratorExp",
            ExprKind::Await { .. } => "Await",
            ExprKind::Yield { .. } => "Yield",
            ExprKind::YieldFrom { .. } => "YieldFrom",
            ExprKind::Compare { .. } => "Compare",
            ExprKind::Call { .. } => "Call",
            ExprKind::FormattedValue { .. } => "FormattedValue",
            ExprKind::JoinedStr { .. } => "JoinedStr",
            ExprKind::Constant { .. } => "Constant",
            ExprKind::Attribute { .. } => "Attribute",
            ExprKind::Subscript { .. } => "Subscript",
            ExprKind::Starred { .. } => "Starred",
            ExprKind::Name { .. } => "Name",
            ExprKind::Slice { .. } => "Slice",
        }
    }
}

// ── Match patterns ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Pattern {
    MatchValue {
        value: Box<Expr>,
    },
    MatchSingleton {
        value: Constant,
    },
    MatchSequence {
        patterns: Vec<Pattern>,
    },
    MatchMapping {
        keys: Vec<Expr>,
        patterns: Vec<Pattern>,
        rest: Option<String>,
    },
    MatchClass {
        cls: Box<Expr>,
        patterns: Vec<Pattern>,
        kwd_attrs: Vec<String>,
        kwd_patterns: Vec<Pattern>,
    },
    MatchStar {
        name: Option<String>,
    },
    MatchAs {
        pattern: Option<Box<Pattern>>,
        name: Option<String>,
    },
    MatchOr {
        patterns: Vec<Pattern>,
    },
}

impl Pattern {
    pub fn tag(&self) -> &'static str {
        match self {
            Pattern::MatchValue { .. } => "MatchValue",
            Pattern::MatchSingleton { .. } => "MatchSingleton",
            Pattern::MatchSequence { .. } => "MatchSequence",
            Pattern::MatchMapping { .. } => "MatchMapping",
            Pattern::MatchClass { .. } => "MatchClass",
            Pattern::MatchStar { .. } => "MatchStar",
            Pattern::MatchAs { .. } => "MatchAs",
            Pattern::MatchOr { .. } => "MatchOr",
        }
    }
}

/// The wildcard pattern `_` — used as a default when a `match_case` is built
/// incrementally.
impl Default for Pattern {
    fn default() -> Self {
        Pattern::MatchAs {
            pattern: None,
            name: None,
        }
    }
}

// ── Type parameters (PEP 695) ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TypeParam {
    TypeVar {
        name: String,
        bound: Option<Box<Expr>>,
    },
    TypeVarTuple {
        name: String,
    },
    ParamSpec {
        name: String,
    },
}

impl TypeParam {
    pub fn tag(&self) -> &'static str {
        match self {
            TypeParam::TypeVar { .. } => "TypeVar",
            TypeParam::TypeVarTuple { .. } => "TypeVarTuple",
            TypeParam::ParamSpec { .. } => "ParamSpec",
        }
    }
}

// ── Operators ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
    FloorDiv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UnaryOperator {
    Invert,
    Not,
    UAdd,
    USub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoolOperator {
    And,
    Or,
}

// ── Constants ─────────────────────────────────────────────────────────────────

/// A literal constant value.
///
/// Scalar forms map onto native JSON (`null`, booleans, numbers, strings);
/// the forms JSON cannot express (`...`, complex and bytes literals) become
/// small marker objects keyed by `"constant"` so they never collide with the
/// node tag namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { imag: f64 },
    Str(String),
    Bytes(String),
    Ellipsis,
}

impl Serialize for Constant {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        match self {
            Constant::None => serializer.serialize_none(),
            Constant::Bool(b) => serializer.serialize_bool(*b),
            Constant::Int(i) => serializer.serialize_i64(*i),
            Constant::Float(f) => serializer.serialize_f64(*f),
            Constant::Str(s) => serializer.serialize_str(s),
            Constant::Complex { imag } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("constant", "complex")?;
                map.serialize_entry("imag", imag)?;
                map.end()
            }
            Constant::Bytes(b) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("constant", "bytes")?;
                map.serialize_entry("value", b)?;
                map.end()
            }
            Constant::Ellipsis => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("constant", "Ellipsis")?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Constant {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Null => Ok(Constant::None),
            serde_json::Value::Bool(b) => Ok(Constant::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Constant::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Constant::Float(f))
                } else {
                    Err(D::Error::custom("unrepresentable numeric constant"))
                }
            }
            serde_json::Value::String(s) => Ok(Constant::Str(s)),
            serde_json::Value::Object(map) => {
                let marker = map
                    .get("constant")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| D::Error::custom("constant object without `constant` marker"))?;
                match marker {
                    "Ellipsis" => Ok(Constant::Ellipsis),
                    "complex" => {
                        let imag = map
                            .get("imag")
                            .and_then(|v| v.as_f64())
                            .ok_or_else(|| D::Error::custom("complex constant without `imag`"))?;
                        Ok(Constant::Complex { imag })
                    }
                    "bytes" => {
                        let value = map
                            .get("value")
                            .and_then(|v| v.as_str())
                            .ok_or_else(|| D::Error::custom("bytes constant without `value`"))?;
                        Ok(Constant::Bytes(value.to_string()))
                    }
                    other => Err(D::Error::custom(format!(
                        "unknown constant marker `{other}`"
                    ))),
                }
            }
            _ => Err(D::Error::custom("invalid constant value")),
        }
    }
}

// ── Helper nodes ──────────────────────────────────────────────────────────────

/// Generates a helper-node struct with tagged JSON serialization.
///
/// Serde's internally-tagged representation only exists for enums, so these
/// structs carry their `"type"` tag through a hand-rolled impl pair.  The
/// deserializer validates the tag and rejects anything else.
macro_rules! node_struct {
    ($(#[$meta:meta])* $name:ident, $tag:literal { $( $field:ident : $ty:ty ),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $name {
            $( pub $field: $ty, )*
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", $tag)?;
                $( map.serialize_entry(stringify!($field), &self.$field)?; )*
                map.end()
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                #[derive(Deserialize)]
                struct Shadow {
                    #[serde(rename = "type")]
                    tag: String,
                    $( #[serde(default)] $field: $ty, )*
                }
                let shadow = Shadow::deserialize(deserializer)?;
                if shadow.tag != $tag {
                    return Err(D::Error::custom(format!(
                        concat!("expected node tag `", $tag, "`, found `{}`"),
                        shadow.tag
                    )));
                }
                Ok(Self { $( $field: shadow.$field, )* })
            }
        }
    };
}

node_struct!(
    /// One name inside an import statement: `import a.b as c` or
    /// `from m import x as y`.
    Alias, "alias" {
        name: String,
        asname: Option<String>,
    }
);

node_struct!(
    /// A single formal parameter.
    Arg, "arg" {
        arg: String,
        annotation: Option<Box<Expr>>,
    }
);

node_struct!(
    /// The full parameter list of a function or lambda.
    ///
    /// `defaults` aligns with the tail of `posonlyargs + args`; `kw_defaults`
    /// has one entry per keyword-only parameter, `null` when it is required.
    Arguments, "arguments" {
        posonlyargs: Vec<Arg>,
        args: Vec<Arg>,
        vararg: Option<Box<Arg>>,
        kwonlyargs: Vec<Arg>,
        kw_defaults: Vec<Option<Expr>>,
        kwarg: Option<Box<Arg>>,
        defaults: Vec<Expr>,
    }
);

node_struct!(
    /// A keyword argument in a call or class header; `arg` is `None` for
    /// `**expr` spreads.
    Keyword, "keyword" {
        arg: Option<String>,
        value: Expr,
    }
);

node_struct!(
    /// One `expr [as target]` item of a `with` statement.
    WithItem, "withitem" {
        context_expr: Expr,
        optional_vars: Option<Box<Expr>>,
    }
);

node_struct!(
    /// One `for target in iter [if cond]*` clause of a comprehension.
    Comprehension, "comprehension" {
        target: Expr,
        iter: Expr,
        ifs: Vec<Expr>,
        is_async: u8,
    }
);

node_struct!(
    /// One `case <pattern> [if guard]: body` arm of a `match` statement.
    MatchCase, "match_case" {
        pattern: Pattern,
        guard: Option<Box<Expr>>,
        body: Vec<Stmt>,
    }
);

node_struct!(
    /// One `except [type_ [as name]]:` clause.  The field is `type_` because
    /// `type` is the tag key.
    ExceptHandler, "ExceptHandler" {
        type_: Option<Box<Expr>>,
        name: Option<String>,
        body: Vec<Stmt>,
    }
);

node_struct!(ModuleRepr, "Module" {
    body: Vec<Stmt>,
});

impl Serialize for Module {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ModuleRepr {
            body: self.body.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Module {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = ModuleRepr::deserialize(deserializer)?;
        Ok(Module { body: repr.body })
    }
}

// ── Stmt / Expr serde ─────────────────────────────────────────────────────────
//
// The wrappers serialize as one flat JSON object: the kind contributes the
// `type` tag and its fields, the span contributes the optional position
// fields.  The merge goes through a `serde_json` map because the interop
// shape is defined in terms of JSON.

fn merge_span<S: serde::Serializer>(
    kind_value: Result<serde_json::Value, serde_json::Error>,
    span: &Option<Span>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::Error as _;
    let mut value = kind_value.map_err(S::Error::custom)?;
    if let (Some(span), Some(object)) = (span, value.as_object_mut()) {
        object.insert("line".to_string(), span.line.into());
        object.insert("col".to_string(), span.col.into());
        object.insert("end_line".to_string(), span.end_line.into());
        object.insert("end_col".to_string(), span.end_col.into());
    }
    value.serialize(serializer)
}

fn take_span(value: &serde_json::Value) -> Option<Span> {
    let object = value.as_object()?;
    let field = |name: &str| object.get(name)?.as_u64().map(|v| v as u32);
    Some(Span {
        line: field("line")?,
        col: field("col")?,
        end_line: field("end_line")?,
        end_col: field("end_col")?,
    })
}

impl Serialize for Stmt {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        merge_span(serde_json::to_value(&self.kind), &self.span, serializer)
    }
}

impl<'de> Deserialize<'de> for Stmt {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let span = take_span(&value);
        let kind = StmtKind::deserialize(value).map_err(D::Error::custom)?;
        Ok(Stmt { kind, span })
    }
}

impl Serialize for Expr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        merge_span(serde_json::to_value(&self.kind), &self.span, serializer)
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let span = take_span(&value);
        let kind = ExprKind::deserialize(value).map_err(D::Error::custom)?;
        Ok(Expr { kind, span })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn name(id: &str) -> Expr {
        ExprKind::Name { id: id.to_string() }.into()
    }

    #[test]
    fn test_stmt_equality_ignores_span() {
        let a = Stmt::new(
            StmtKind::Pass,
            Span {
                line: 1,
                col: 0,
                end_line: 1,
                end_col: 4,
            },
        );
        let b: Stmt = StmtKind::Pass.into();
        assert_eq!(a, b);
    }

    #[test]
    fn test_name_json_tag() {
        let v = serde_json::to_value(name("x")).unwrap();
        assert_eq!(v["type"], "Name");
        assert_eq!(v["id"], "x");
    }

    #[test]
    fn test_span_fields_flatten() {
        let e = Expr::new(
            ExprKind::Name {
                id: "x".to_string(),
            },
            Span {
                line: 3,
                col: 4,
                end_line: 3,
                end_col: 5,
            },
        );
        let v = serde_json::to_value(e).unwrap();
        assert_eq!(v["line"], 3);
        assert_eq!(v["end_col"], 5);
    }

    #[test]
    fn test_expr_round_trip() {
        let e: Expr = ExprKind::BinOp {
            left: Box::new(name("a")),
            op: Operator::Add,
            right: Box::new(
                ExprKind::Constant {
                    value: Constant::Int(2),
                }
                .into(),
            ),
        }
        .into();
        let v = serde_json::to_value(&e).unwrap();
        let back: Expr = serde_json::from_value(v).unwrap();
        assert_eq!(e, back);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let v = serde_json::json!({"type": "Bogus", "id": "x"});
        assert!(serde_json::from_value::<Expr>(v).is_err());
    }

    #[test]
    fn test_helper_tag_round_trip() {
        let a = Alias {
            name: "os".to_string(),
            asname: None,
        };
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["type"], "alias");
        assert_eq!(v["asname"], serde_json::Value::Null);
        let back: Alias = serde_json::from_value(v).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn test_helper_wrong_tag_rejected() {
        let v = serde_json::json!({"type": "arg", "name": "os", "asname": null});
        assert!(serde_json::from_value::<Alias>(v).is_err());
    }

    #[test]
    fn test_operator_json_shape() {
        let v = serde_json::to_value(Operator::FloorDiv).unwrap();
        assert_eq!(v["type"], "FloorDiv");
    }

    #[test]
    fn test_constant_scalars() {
        for (c, expect) in [
            (Constant::None, serde_json::Value::Null),
            (Constant::Bool(true), serde_json::json!(true)),
            (Constant::Int(42), serde_json::json!(42)),
            (Constant::Str("hi".to_string()), serde_json::json!("hi")),
        ] {
            let v = serde_json::to_value(&c).unwrap();
            assert_eq!(v, expect);
            let back: Constant = serde_json::from_value(v).unwrap();
            assert_eq!(back, c);
        }
    }

    #[test]
    fn test_constant_ellipsis_round_trip() {
        let v = serde_json::to_value(Constant::Ellipsis).unwrap();
        assert_eq!(v["constant"], "Ellipsis");
        let back: Constant = serde_json::from_value(v).unwrap();
        assert_eq!(back, Constant::Ellipsis);
    }

    #[test]
    fn test_module_round_trip() {
        let m = Module {
            body: vec![
                StmtKind::Expr {
                    value: Box::new(name("x")),
                }
                .into(),
                StmtKind::Pass.into(),
            ],
        };
        let v = m.to_json();
        assert_eq!(v["type"], "Module");
        let back = Module::from_json(v).unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn test_except_handler_field_name() {
        let h = ExceptHandler {
            type_: Some(Box::new(name("ValueError"))),
            name: Some("e".to_string()),
            body: vec![StmtKind::Pass.into()],
        };
        let v = serde_json::to_value(&h).unwrap();
        assert_eq!(v["type"], "ExceptHandler");
        assert_eq!(v["type_"]["type"], "Name");
    }
}
