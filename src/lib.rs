//! Python static-analysis toolkit: a Python 3.12 tokenizer and parser
//! producing a CPython-shaped AST, traversal and rewriting facilities over
//! that tree, text-level transformation passes targeting a WebAssembly
//! Python runtime, and a rule-driven safety analyzer.
//!
//! The core is purely synchronous and holds no external resources; the only
//! fallible surface is parsing, which fails with a typed [`ParseError`].
//!
//! # Example
//! ```
//! use pyx::{analyze, nodes_of_kind, parse};
//!
//! let module = parse("import os\nos.system('rm -rf /')\n").unwrap();
//! assert_eq!(nodes_of_kind(&module, &["Import"]).len(), 1);
//!
//! let report = analyze("import os\nos.system('rm -rf /')\n");
//! assert!(!report.safe);
//! ```

pub mod ast;
pub mod error;
pub mod parser;
pub mod safety;
pub mod stdlib;
pub mod transform;
pub mod transformer;
pub mod traverse;

pub use ast::{
    Alias, Arg, Arguments, BoolOperator, CmpOperator, Comprehension, Constant, ExceptHandler,
    Expr, ExprKind, Keyword, MatchCase, Module, Operator, Pattern, Span, Stmt, StmtKind,
    TypeParam, UnaryOperator, WithItem,
};
pub use error::{ParseError, ParseErrorKind};
pub use parser::{parse, parse_expression};
pub use safety::{analyze, SafetyAnalyzer, SafetyReport, SafetyRule, Severity, Violation};
pub use transform::{
    capture_print, extract_return_value, mock_input, prepare_for_runtime, rewrite_imports,
    wrap_async, wrap_exceptions, wrap_top_level_await,
};
pub use transformer::Transformer;
pub use traverse::{find, find_all, nodes_of_kind, walk, NodeRef, Visitor};
