//! Text-level rewrites that prepare Python source for a WebAssembly runtime:
//! async wrapping, import rewriting, stdout capture, last-expression result
//! extraction, `input()` mocking and exception serialization.
//!
//! Every pass is `&str -> String`, infallible, and composable; the canonical
//! order is [`prepare_for_runtime`].  The passes work on lines rather than
//! the AST because their output contracts are literal down to the character.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::stdlib::is_stdlib_module;

static AWAIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bawait\b").expect("hard-coded pattern is valid"));
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:import|from)\s+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("hard-coded pattern is valid")
});
static INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\binput\(").expect("hard-coded pattern is valid"));

// ── wrap_async ────────────────────────────────────────────────────────────────

/// Wrap the whole source in `async def __pyx_main__():`, indenting every
/// line by four spaces.  Empty lines stay empty; empty input gets a `pass`
/// body.  Wrapping is never collapsed — applying it twice wraps twice.
pub fn wrap_async(code: &str) -> String {
    let mut out = String::from("async def __pyx_main__():\n");
    if code.trim().is_empty() {
        out.push_str("    pass\n");
        return out;
    }
    for line in code.lines() {
        if line.trim().is_empty() {
            out.push_str(line);
        } else {
            out.push_str("    ");
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

// ── wrap_top_level_await ──────────────────────────────────────────────────────

/// Apply [`wrap_async`] only when a bare `await` occurs outside any
/// `async def` block; otherwise the input is returned unchanged.
pub fn wrap_top_level_await(code: &str) -> String {
    if has_top_level_await(code) {
        wrap_async(code)
    } else {
        code.to_string()
    }
}

fn has_top_level_await(code: &str) -> bool {
    // Indentation levels of the `async def` headers currently enclosing the
    // scan position.  A line indented at or below a header's level closes
    // that block.
    let mut async_defs: Vec<usize> = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - trimmed.len();
        while async_defs.last().is_some_and(|&level| indent <= level) {
            async_defs.pop();
        }
        let opens_async_def = trimmed.starts_with("async def ");
        if async_defs.is_empty() && !opens_async_def && AWAIT_RE.is_match(trimmed) {
            return true;
        }
        if opens_async_def {
            async_defs.push(indent);
        }
    }
    false
}

// ── rewrite_imports ───────────────────────────────────────────────────────────

/// Insert `await micropip.install("X")` before each import of a module `X`
/// that is not in the embedded standard-library set.  The original import
/// line is kept; duplicates within one call install only once.
///
/// A second pass adds nothing: install lines begin with `await`, not
/// `import`, and stdlib imports never match.
pub fn rewrite_imports(code: &str) -> String {
    let mut installed: HashSet<String> = HashSet::new();
    let mut out = String::new();
    for line in code.lines() {
        if let Some(caps) = IMPORT_RE.captures(line) {
            let module = &caps[1];
            if !is_stdlib_module(module) && installed.insert(module.to_string()) {
                out.push_str("await micropip.install(\"");
                out.push_str(module);
                out.push_str("\")\n");
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

// ── capture_print ─────────────────────────────────────────────────────────────

/// Prepend a stdout-capture preamble; the user's code follows verbatim.
pub fn capture_print(code: &str) -> String {
    let mut out = String::from(
        "import sys\n\
         import io\n\
         __pyx_stdout__ = io.StringIO()\n\
         __pyx_saved_stdout__ = sys.stdout\n\
         sys.stdout = __pyx_stdout__\n",
    );
    out.push_str(code);
    out
}

// ── extract_return_value ──────────────────────────────────────────────────────

/// If the last meaningful line is a bare expression, rewrite it to
/// `__pyx_result__ = <expr>`, preserving indentation and any trailing
/// comment.  Statement lines and assignments are left untouched.
pub fn extract_return_value(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let Some(idx) = lines.iter().rposition(|l| {
        let t = l.trim();
        !t.is_empty() && !t.starts_with('#')
    }) else {
        return code.to_string();
    };

    let line = lines[idx];
    let trimmed = line.trim_start();
    if starts_with_statement_keyword(trimmed) || is_assignment_line(trimmed) {
        return code.to_string();
    }

    let indent = &line[..line.len() - trimmed.len()];
    let (expr, comment) = split_trailing_comment(trimmed);
    let expr = expr.trim_end();
    let rewritten = match comment {
        Some(c) => format!("{indent}__pyx_result__ = {expr}  {c}"),
        None => format!("{indent}__pyx_result__ = {expr}"),
    };

    let mut out = String::new();
    for (i, l) in lines.iter().enumerate() {
        if i == idx {
            out.push_str(&rewritten);
        } else {
            out.push_str(l);
        }
        if i + 1 < lines.len() || code.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// Statement openers that rule a line out of result extraction.
fn starts_with_statement_keyword(trimmed: &str) -> bool {
    if trimmed.starts_with('@') {
        return true;
    }
    let word: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    match word.as_str() {
        "def" | "class" | "if" | "elif" | "for" | "while" | "except" | "with" | "return"
        | "raise" | "import" | "from" | "pass" | "break" | "continue" => true,
        "else" | "try" | "finally" => trimmed[word.len()..].trim_start().starts_with(':'),
        _ => false,
    }
}

/// True when the line contains a `=` that is an assignment: not part of
/// `==`/`!=`/`<=`/`>=`, not inside a string, and not inside a `lambda`
/// parameter list.
fn is_assignment_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    let lambda_spans = lambda_param_spans(line);
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'#' => break,
            b'=' => {
                let next_eq = bytes.get(i + 1) == Some(&b'=');
                let prev = if i > 0 { bytes[i - 1] } else { 0 };
                let part_of_comparison = next_eq || matches!(prev, b'=' | b'!' | b'<' | b'>');
                let in_lambda = lambda_spans.iter().any(|&(s, e)| i >= s && i < e);
                if !part_of_comparison && !in_lambda {
                    return true;
                }
                if next_eq {
                    i += 2;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// Byte ranges of `lambda` parameter lists: from the keyword to the `:` that
/// opens the body, tracking bracket depth.
fn lambda_param_spans(line: &str) -> Vec<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    let mut search = 0;
    while let Some(pos) = line[search..].find("lambda") {
        let start = search + pos;
        let before_ok =
            start == 0 || (!bytes[start - 1].is_ascii_alphanumeric() && bytes[start - 1] != b'_');
        let after = bytes.get(start + 6).copied().unwrap_or(b' ');
        let after_ok = !after.is_ascii_alphanumeric() && after != b'_';
        search = start + 6;
        if !before_ok || !after_ok {
            continue;
        }
        let mut depth = 0i32;
        let mut end = line.len();
        for (j, &b) in bytes.iter().enumerate().skip(start + 6) {
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b':' if depth == 0 => {
                    end = j;
                    break;
                }
                _ => {}
            }
        }
        spans.push((start, end));
        search = end;
    }
    spans
}

/// Split a line into its code part and an optional trailing comment, minding
/// string quotes.
fn split_trailing_comment(line: &str) -> (&str, Option<&str>) {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
        } else {
            match b {
                b'\'' | b'"' => quote = Some(b),
                b'#' => return (&line[..i], Some(&line[i..])),
                _ => {}
            }
        }
        i += 1;
    }
    (line, None)
}

// ── mock_input ────────────────────────────────────────────────────────────────

/// Replace every standalone `input(` with `await __pyx_input__(`.
pub fn mock_input(code: &str) -> String {
    INPUT_RE
        .replace_all(code, "await __pyx_input__(")
        .into_owned()
}

// ── wrap_exceptions ───────────────────────────────────────────────────────────

/// Wrap the source in a `try:` that serializes any raised exception into
/// `__pyx_error__` as a `{'type', 'message', 'traceback'}` dict.
pub fn wrap_exceptions(code: &str) -> String {
    let mut out = String::from("import traceback\n__pyx_error__ = None\ntry:\n");
    if code.trim().is_empty() {
        out.push_str("    pass\n");
    } else {
        for line in code.lines() {
            if line.trim().is_empty() {
                out.push_str(line);
            } else {
                out.push_str("    ");
                out.push_str(line);
            }
            out.push('\n');
        }
    }
    out.push_str(
        "except Exception as __pyx_exc__:\n    __pyx_error__ = {'type': type(__pyx_exc__).__name__, 'message': str(__pyx_exc__), 'traceback': traceback.format_exc()}\n",
    );
    out
}

// ── composition ───────────────────────────────────────────────────────────────

/// The full pipeline in canonical order:
/// `rewrite_imports → wrap_top_level_await → capture_print →
/// extract_return_value → wrap_exceptions → wrap_async`.
pub fn prepare_for_runtime(code: &str) -> String {
    let code = rewrite_imports(code);
    let code = wrap_top_level_await(&code);
    let code = capture_print(&code);
    let code = extract_return_value(&code);
    let code = wrap_exceptions(&code);
    wrap_async(&code)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── wrap_async ───────────────────────────────────────────────────────────

    #[test]
    fn test_wrap_async_indents_lines() {
        let out = wrap_async("x = 1\nprint(x)\n");
        assert_eq!(out, "async def __pyx_main__():\n    x = 1\n    print(x)\n");
    }

    #[test]
    fn test_wrap_async_empty_input_gets_pass() {
        assert_eq!(wrap_async(""), "async def __pyx_main__():\n    pass\n");
    }

    #[test]
    fn test_wrap_async_keeps_empty_lines_empty() {
        let out = wrap_async("a = 1\n\nb = 2\n");
        assert_eq!(out, "async def __pyx_main__():\n    a = 1\n\n    b = 2\n");
    }

    #[test]
    fn test_wrap_async_never_collapses() {
        let once = wrap_async("x = 1\n");
        let twice = wrap_async(&once);
        assert!(twice.starts_with("async def __pyx_main__():\n    async def __pyx_main__():\n"));
    }

    // ── wrap_top_level_await ─────────────────────────────────────────────────

    #[test]
    fn test_top_level_await_wraps() {
        let out = wrap_top_level_await("result = await fetch()\n");
        assert!(out.starts_with("async def __pyx_main__():\n"));
    }

    #[test]
    fn test_await_inside_async_def_untouched() {
        let src = "async def work():\n    await fetch()\nx = 1\n";
        assert_eq!(wrap_top_level_await(src), src);
    }

    #[test]
    fn test_await_after_async_def_block_wraps() {
        let src = "async def work():\n    await fetch()\nawait work()\n";
        assert!(wrap_top_level_await(src).starts_with("async def __pyx_main__():\n"));
    }

    #[test]
    fn test_await_in_comment_ignored() {
        let src = "# await something\nx = 1\n";
        assert_eq!(wrap_top_level_await(src), src);
    }

    #[test]
    fn test_no_await_is_identity() {
        let src = "x = 1\nprint(x)\n";
        assert_eq!(wrap_top_level_await(src), src);
    }

    // ── rewrite_imports ──────────────────────────────────────────────────────

    #[test]
    fn test_stdlib_imports_unchanged() {
        let src = "import os\nimport json\nfrom collections import OrderedDict\n";
        assert_eq!(rewrite_imports(src), src);
    }

    #[test]
    fn test_third_party_import_gets_install() {
        let out = rewrite_imports("import numpy as np\n");
        assert_eq!(out, "await micropip.install(\"numpy\")\nimport numpy as np\n");
    }

    #[test]
    fn test_from_import_top_module() {
        let out = rewrite_imports("from requests.adapters import HTTPAdapter\n");
        assert!(out.starts_with("await micropip.install(\"requests\")\n"));
    }

    #[test]
    fn test_duplicate_installs_suppressed() {
        let out = rewrite_imports("import numpy\nfrom numpy import array\n");
        assert_eq!(out.matches("micropip.install").count(), 1);
    }

    #[test]
    fn test_relative_import_untouched() {
        let src = "from . import sibling\nfrom .mod import thing\n";
        assert_eq!(rewrite_imports(src), src);
    }

    #[test]
    fn test_rewrite_imports_idempotent() {
        let once = rewrite_imports("import numpy\nimport pandas\n");
        assert_eq!(rewrite_imports(&once), once);
    }

    // ── capture_print ────────────────────────────────────────────────────────

    #[test]
    fn test_capture_print_preamble() {
        let out = capture_print("print('hi')\n");
        assert!(out.starts_with("import sys\nimport io\n__pyx_stdout__ = io.StringIO()\n"));
        assert!(out.contains("sys.stdout = __pyx_stdout__\n"));
        assert!(out.ends_with("print('hi')\n"));
    }

    // ── extract_return_value ─────────────────────────────────────────────────

    #[test]
    fn test_extracts_last_expression() {
        let out = extract_return_value("x = 1\nx + 1\n");
        assert_eq!(out, "x = 1\n__pyx_result__ = x + 1\n");
    }

    #[test]
    fn test_assignment_last_line_unchanged() {
        let src = "x = 1\ny = x\n";
        assert_eq!(extract_return_value(src), src);
    }

    #[test]
    fn test_augmented_assignment_unchanged() {
        let src = "x = 1\nx += 1\n";
        assert_eq!(extract_return_value(src), src);
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        let out = extract_return_value("x == 1\n");
        assert_eq!(out, "__pyx_result__ = x == 1\n");
        let out = extract_return_value("x != 1\n");
        assert_eq!(out, "__pyx_result__ = x != 1\n");
        let out = extract_return_value("x <= 1\n");
        assert_eq!(out, "__pyx_result__ = x <= 1\n");
    }

    #[test]
    fn test_statement_keywords_unchanged() {
        for src in [
            "return x\n",
            "pass\n",
            "import os\n",
            "from os import path\n",
            "raise ValueError\n",
            "break\n",
            "@decorator\n",
        ] {
            assert_eq!(extract_return_value(src), src, "line {src:?}");
        }
    }

    #[test]
    fn test_skips_trailing_blanks_and_comments() {
        let out = extract_return_value("value\n\n# done\n");
        assert_eq!(out, "__pyx_result__ = value\n\n# done\n");
    }

    #[test]
    fn test_preserves_indentation() {
        let out = extract_return_value("if True:\n    value\n");
        assert_eq!(out, "if True:\n    __pyx_result__ = value\n");
    }

    #[test]
    fn test_preserves_trailing_comment() {
        let out = extract_return_value("value  # the answer\n");
        assert_eq!(out, "__pyx_result__ = value  # the answer\n");
    }

    #[test]
    fn test_lambda_default_is_not_assignment() {
        // The `=` sits inside the lambda parameter list.
        let out = extract_return_value("(lambda x=1: x)(2)\n");
        assert_eq!(out, "__pyx_result__ = (lambda x=1: x)(2)\n");
    }

    #[test]
    fn test_equals_inside_string_not_assignment() {
        let out = extract_return_value("f(\"a=b\")\n");
        assert_eq!(out, "__pyx_result__ = f(\"a=b\")\n");
    }

    #[test]
    fn test_keyword_argument_counts_as_assignment() {
        // `f(key=1)` contains a bare `=`; the scan is deliberately literal,
        // so the line is left unchanged.
        let src = "f(key=1)\n";
        assert_eq!(extract_return_value(src), src);
    }

    #[test]
    fn test_empty_input_unchanged() {
        assert_eq!(extract_return_value(""), "");
    }

    // ── mock_input ───────────────────────────────────────────────────────────

    #[test]
    fn test_mock_input_rewrites_call() {
        assert_eq!(
            mock_input("name = input('who? ')\n"),
            "name = await __pyx_input__('who? ')\n"
        );
    }

    #[test]
    fn test_mock_input_word_boundary() {
        let src = "my_input('x')\nrawinput('y')\n";
        assert_eq!(mock_input(src), src);
    }

    #[test]
    fn test_mock_input_multiple_occurrences() {
        let out = mock_input("a = input()\nb = input()\n");
        assert_eq!(out.matches("__pyx_input__").count(), 2);
    }

    // ── wrap_exceptions ──────────────────────────────────────────────────────

    #[test]
    fn test_wrap_exceptions_shape() {
        let out = wrap_exceptions("x = 1\n");
        assert!(out.starts_with("import traceback\n__pyx_error__ = None\ntry:\n    x = 1\n"));
        assert!(out.contains("except Exception as __pyx_exc__:\n"));
        assert!(out.contains(
            "__pyx_error__ = {'type': type(__pyx_exc__).__name__, 'message': str(__pyx_exc__), 'traceback': traceback.format_exc()}"
        ));
    }

    // ── composition ──────────────────────────────────────────────────────────

    #[test]
    fn test_transform_composition_order() {
        let src = "import numpy as np\nresult = np.mean([1,2,3])\nresult\n";
        let out = wrap_async(&extract_return_value(&rewrite_imports(src)));
        assert!(out.starts_with("async def __pyx_main__():\n"));
        let lines: Vec<&str> = out.lines().collect();
        let idx = |needle: &str| {
            lines
                .iter()
                .position(|l| *l == needle)
                .unwrap_or_else(|| panic!("missing line {needle:?}"))
        };
        let install = idx("    await micropip.install(\"numpy\")");
        let import = idx("    import numpy as np");
        let assign = idx("    result = np.mean([1,2,3])");
        let capture = idx("    __pyx_result__ = result");
        assert!(install < import && import < assign && assign < capture);
    }

    #[test]
    fn test_prepare_for_runtime_outer_shape() {
        let out = prepare_for_runtime("print('hi')\n");
        assert!(out.starts_with("async def __pyx_main__():\n"));
        assert!(out.contains("__pyx_stdout__"));
        assert!(out.contains("except Exception as __pyx_exc__:"));
    }
}
