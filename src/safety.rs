//! Rule-driven safety analysis of Python source.
//!
//! The analyzer scans line by line with regex shape-matchers — deliberately
//! syntactic, not semantic — and reports [`Violation`]s grouped into a closed
//! set of kinds: dangerous imports, dynamic execution, filesystem and network
//! access, dunder-attribute escapes, insecure deserialization, FFI, infinite
//! loops, resource bombs and shell-injection shapes.
//!
//! Analysis never fails: an empty report on empty input is valid.  Callers
//! may extend the rule list with their own [`SafetyRule`] records before
//! analysis.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bbreak\b").expect("hard-coded pattern is valid"));

// ── report types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One rule match: `{"type": "<kind>", "message", "line", "severity"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub line: Option<usize>,
    pub severity: Severity,
}

/// The analysis result; `safe` is true exactly when `violations` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub safe: bool,
    pub violations: Vec<Violation>,
}

// ── rules ─────────────────────────────────────────────────────────────────────

pub type MessageFn = Box<dyn Fn(&str) -> String + Send + Sync>;
pub type SkipFn = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// One rule group: a violation kind, its line-scoped patterns, a message
/// builder over the matched text, a severity, and an optional whole-source
/// skip predicate that silences the group entirely.
pub struct SafetyRule {
    pub kind: String,
    pub patterns: Vec<Regex>,
    pub message: MessageFn,
    pub severity: Severity,
    pub skip_if: Option<SkipFn>,
}

impl SafetyRule {
    pub fn new(
        kind: &str,
        patterns: &[&str],
        severity: Severity,
        message: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: kind.to_string(),
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("hard-coded pattern is valid"))
                .collect(),
            message: Box::new(message),
            severity,
            skip_if: None,
        }
    }

    pub fn skip_if(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.skip_if = Some(Box::new(predicate));
        self
    }
}

/// Import-shaped patterns (`import X` / `from X`) for one module name.
fn import_patterns(module: &str) -> [String; 2] {
    let escaped = regex::escape(module);
    [
        format!(r"^\s*import\s+{escaped}\b"),
        format!(r"^\s*from\s+{escaped}\b"),
    ]
}

fn import_rule(kind: &str, modules: &[&str], label: &'static str) -> SafetyRule {
    let patterns: Vec<String> = modules.iter().flat_map(|m| import_patterns(m)).collect();
    let refs: Vec<&str> = patterns.iter().map(String::as_str).collect();
    SafetyRule::new(kind, &refs, Severity::Error, move |m| {
        format!("{label}: `{}`", m.trim())
    })
}

/// The default rule set, in declaration order.
pub fn default_rules() -> Vec<SafetyRule> {
    vec![
        import_rule(
            "dangerous_import",
            &["os", "subprocess", "socket", "pty"],
            "Import of dangerous module",
        ),
        SafetyRule::new(
            "code_execution",
            &[
                r"\bexec\s*\(",
                r"\beval\s*\(",
                r"\bcompile\s*\(",
                r"__import__\s*\(",
            ],
            Severity::Error,
            |m| format!("Dynamic code execution: `{m}`"),
        ),
        SafetyRule::new(
            "filesystem_access",
            &[
                r#"open\s*\(\s*["']/etc/"#,
                r#"open\s*\(\s*["']/proc/"#,
                r#"open\s*\(\s*["']/[^"']*["']\s*,\s*["'][wa]"#,
            ],
            Severity::Error,
            |m| format!("Filesystem access: `{m}`"),
        ),
        import_rule(
            "network_access",
            &["urllib", "http.client", "requests", "ftplib"],
            "Network access",
        ),
        SafetyRule::new(
            "dangerous_attribute",
            &[
                r"__builtins__",
                r"__globals__",
                r"__code__",
                r"__subclasses__",
                r"__mro__",
            ],
            Severity::Error,
            |m| format!("Access to dangerous attribute `{m}`"),
        ),
        import_rule(
            "serialization_danger",
            &["pickle", "cPickle", "marshal", "shelve"],
            "Insecure deserialization module",
        ),
        import_rule("ffi_danger", &["ctypes", "cffi"], "Foreign function interface"),
        SafetyRule::new(
            "infinite_loop",
            &[r"\bwhile\s+True\s*:", r"\bwhile\s+1\s*:"],
            Severity::Warning,
            |m| format!("Potential infinite loop: `{}` with no break", m.trim()),
        )
        .skip_if(|source| BREAK_RE.is_match(source)),
        SafetyRule::new(
            "resource_exhaustion",
            &[
                r"range\s*\(\s*\d{8,}",
                r"range\s*\(\s*10\s*\*\*\s*(?:[7-9]\b|\d{2,})",
                r"range\s*\(\s*2\s*\*\*\s*(?:3\d|[4-9]\d|\d{3,})",
                r"\*\s*\(?\s*10\s*\*\*\s*(?:[7-9]\b|\d{2,})",
                r"\[.*\*\s*\d{4,}\s*\]\s*\*\s*\d{4,}",
            ],
            Severity::Error,
            |m| format!("Potential resource exhaustion: `{}`", m.trim()),
        ),
        SafetyRule::new(
            "command_injection",
            &[r"os\.popen\s*\(", r"os\.system\s*\(", r"shell\s*=\s*True"],
            Severity::Error,
            |m| format!("Shell command injection risk: `{m}`"),
        ),
    ]
}

// ── analyzer ──────────────────────────────────────────────────────────────────

/// A configured analyzer: the default rules plus any caller additions.
pub struct SafetyAnalyzer {
    rules: Vec<SafetyRule>,
}

impl Default for SafetyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyAnalyzer {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// An analyzer with no rules at all; callers add their own.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[SafetyRule] {
        &self.rules
    }

    /// Append a rule; rules apply in declaration order.
    pub fn add_rule(&mut self, rule: SafetyRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Scan `source` line by line against every rule.  Lines are 1-based,
    /// counting `\n`-terminated lines; one line may produce several
    /// violations.
    pub fn analyze(&self, source: &str) -> SafetyReport {
        let mut violations = Vec::new();
        for rule in &self.rules {
            if rule.skip_if.as_ref().is_some_and(|skip| skip(source)) {
                continue;
            }
            for (index, line) in source.lines().enumerate() {
                for pattern in &rule.patterns {
                    if let Some(found) = pattern.find(line) {
                        violations.push(Violation {
                            kind: rule.kind.clone(),
                            message: (rule.message)(found.as_str()),
                            line: Some(index + 1),
                            severity: rule.severity,
                        });
                    }
                }
            }
        }
        SafetyReport {
            safe: violations.is_empty(),
            violations,
        }
    }
}

/// Analyze with the default rule set.
pub fn analyze(source: &str) -> SafetyReport {
    SafetyAnalyzer::new().analyze(source)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<String> {
        analyze(source).violations.iter().map(|v| v.kind.clone()).collect()
    }

    #[test]
    fn test_empty_input_is_safe() {
        let report = analyze("");
        assert!(report.safe);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_clean_code_is_safe() {
        let report = analyze("import json\nprint(json.dumps({'a': 1}))\n");
        assert!(report.safe, "violations: {:?}", report.violations);
    }

    #[test]
    fn test_safe_iff_no_violations() {
        for src in ["", "x = 1\n", "import os\n", "eval(code)\n"] {
            let report = analyze(src);
            assert_eq!(report.safe, report.violations.is_empty());
        }
    }

    #[test]
    fn test_dangerous_imports() {
        for src in [
            "import os\n",
            "from os import system\n",
            "import subprocess\n",
            "import socket\n",
            "import pty\n",
        ] {
            assert!(kinds(src).contains(&"dangerous_import".to_string()), "{src:?}");
        }
    }

    #[test]
    fn test_dangerous_import_line_number() {
        let report = analyze("x = 1\nimport os\n");
        let v = &report.violations[0];
        assert_eq!(v.kind, "dangerous_import");
        assert_eq!(v.line, Some(2));
        assert!(v.message.contains("os"));
    }

    #[test]
    fn test_code_execution_shapes() {
        for src in [
            "exec(payload)\n",
            "eval('1+1')\n",
            "compile(src, '<s>', 'exec')\n",
            "__import__('os')\n",
        ] {
            assert!(kinds(src).contains(&"code_execution".to_string()), "{src:?}");
        }
    }

    #[test]
    fn test_filesystem_access_shapes() {
        assert!(kinds("open('/etc/passwd')\n").contains(&"filesystem_access".to_string()));
        assert!(kinds("open('/proc/self/mem')\n").contains(&"filesystem_access".to_string()));
        assert!(kinds("open('/tmp/x', 'w')\n").contains(&"filesystem_access".to_string()));
        assert!(kinds("open('/var/log/x', 'a')\n").contains(&"filesystem_access".to_string()));
        // Reading a relative path is fine.
        assert!(!kinds("open('data.txt')\n").contains(&"filesystem_access".to_string()));
    }

    #[test]
    fn test_network_access_imports() {
        for src in [
            "import urllib\n",
            "from urllib.request import urlopen\n",
            "import http.client\n",
            "import requests\n",
            "import ftplib\n",
        ] {
            assert!(kinds(src).contains(&"network_access".to_string()), "{src:?}");
        }
    }

    #[test]
    fn test_dangerous_attributes() {
        for src in [
            "print(__builtins__)\n",
            "f.__globals__\n",
            "fn.__code__\n",
            "().__class__.__subclasses__()\n",
            "cls.__mro__\n",
        ] {
            assert!(kinds(src).contains(&"dangerous_attribute".to_string()), "{src:?}");
        }
    }

    #[test]
    fn test_serialization_and_ffi() {
        assert!(kinds("import pickle\n").contains(&"serialization_danger".to_string()));
        assert!(kinds("import marshal\n").contains(&"serialization_danger".to_string()));
        assert!(kinds("import shelve\n").contains(&"serialization_danger".to_string()));
        assert!(kinds("import ctypes\n").contains(&"ffi_danger".to_string()));
        assert!(kinds("from cffi import FFI\n").contains(&"ffi_danger".to_string()));
    }

    #[test]
    fn test_infinite_loop_without_break_warns() {
        let report = analyze("while True:\n    pass\n");
        let v = report
            .violations
            .iter()
            .find(|v| v.kind == "infinite_loop")
            .expect("infinite_loop should fire");
        assert_eq!(v.severity, Severity::Warning);
        assert_eq!(v.line, Some(1));
    }

    #[test]
    fn test_while_one_also_flagged() {
        assert!(kinds("while 1:\n    pass\n").contains(&"infinite_loop".to_string()));
    }

    #[test]
    fn test_break_anywhere_skips_infinite_loop() {
        // The skip predicate is source-wide, even when the break belongs to
        // another loop.
        let src = "while True:\n    pass\nfor i in x:\n    break\n";
        assert!(!kinds(src).contains(&"infinite_loop".to_string()));
    }

    #[test]
    fn test_resource_exhaustion_shapes() {
        for src in [
            "for i in range(100000000):\n",
            "for i in range(10**8):\n",
            "range(2**31)\n",
            "x = 'a' * (10**9)\n",
            "grid = [[0]*10000]*10000\n",
        ] {
            assert!(kinds(src).contains(&"resource_exhaustion".to_string()), "{src:?}");
        }
        assert!(!kinds("range(100)\n").contains(&"resource_exhaustion".to_string()));
        assert!(!kinds("range(10**3)\n").contains(&"resource_exhaustion".to_string()));
    }

    #[test]
    fn test_command_injection_shapes() {
        for src in [
            "os.popen('ls')\n",
            "os.system('rm -rf /')\n",
            "subprocess.run(cmd, shell=True)\n",
            "os.system(f\"echo {user}\")\n",
        ] {
            assert!(kinds(src).contains(&"command_injection".to_string()), "{src:?}");
        }
    }

    #[test]
    fn test_multiple_violations_one_line() {
        // `os.system(` fires command_injection; `eval(` fires code_execution.
        let report = analyze("os.system(eval(x))\n");
        let kinds: Vec<&str> = report.violations.iter().map(|v| v.kind.as_str()).collect();
        assert!(kinds.contains(&"command_injection"));
        assert!(kinds.contains(&"code_execution"));
    }

    #[test]
    fn test_all_error_except_infinite_loop() {
        let report = analyze("import os\nwhile True:\n    x = eval(y)\n");
        for v in &report.violations {
            if v.kind == "infinite_loop" {
                assert_eq!(v.severity, Severity::Warning);
            } else {
                assert_eq!(v.severity, Severity::Error);
            }
        }
    }

    #[test]
    fn test_custom_rule_extension() {
        let mut analyzer = SafetyAnalyzer::new();
        analyzer.add_rule(SafetyRule::new(
            "banned_builtin",
            &[r"\bglobals\s*\("],
            Severity::Error,
            |m| format!("banned builtin: `{m}`"),
        ));
        let report = analyzer.analyze("g = globals()\n");
        assert!(report.violations.iter().any(|v| v.kind == "banned_builtin"));
    }

    #[test]
    fn test_custom_rule_skip_predicate() {
        let mut analyzer = SafetyAnalyzer::empty();
        analyzer.add_rule(
            SafetyRule::new("no_todo", &[r"\bTODO\b"], Severity::Warning, |m| {
                format!("found `{m}`")
            })
            .skip_if(|src| src.contains("allow-todo")),
        );
        assert!(!analyzer.analyze("# TODO: later\n").safe);
        assert!(analyzer.analyze("# allow-todo\n# TODO: later\n").safe);
    }

    #[test]
    fn test_violation_json_shape() {
        let report = analyze("import os\n");
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["safe"], false);
        assert_eq!(v["violations"][0]["type"], "dangerous_import");
        assert_eq!(v["violations"][0]["severity"], "error");
        assert_eq!(v["violations"][0]["line"], 1);
        let back: SafetyReport = serde_json::from_value(v).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_import_os_then_system_call() {
        let report = analyze("import os\nos.system('rm -rf /')\n");
        assert!(!report.safe);
        let dangerous: Vec<_> = report
            .violations
            .iter()
            .filter(|v| v.kind == "dangerous_import")
            .collect();
        assert!(!dangerous.is_empty());
        assert_eq!(dangerous[0].line, Some(1));
        assert!(dangerous[0].message.contains("os"));
        assert!(report.violations.iter().any(|v| v.kind == "command_injection"));
    }
}
