//! Zero-copy Python tokenizer.
//!
//! Produces [`Token`]s that borrow `&'src str` lexemes directly from the
//! source buffer.  Keywords are *not* distinguished here — reserved words come
//! out as [`TokenKind::Name`] and the parser dispatches on the lexeme value.
//! F-strings are likewise a single `String` token; the parser's f-string
//! sub-parser takes the raw lexeme apart.
//!
//! Handles:
//! - INDENT / DEDENT via an indentation stack (a tab advances to the next
//!   multiple of 8)
//! - Implicit line continuation inside `(`, `[`, `{`
//! - Explicit line continuation via trailing `\`
//! - All string literal forms: single/triple-quoted, with `r`, `b`, `u`, `f`
//!   prefixes in either order and case
//! - Comments and blank lines (skipped, line numbers preserved)
//! - Longest-match operator lexing
//!
//! The first failure aborts tokenization: an unterminated single-line string
//! is `SyntaxError("EOL while scanning string literal")`, an unterminated
//! triple quote is an unterminated-string error, and a dedent to a level not
//! on the stack is an indentation error.

use crate::error::ParseError;

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Number,
    String,
    Op,
    Newline,
    Indent,
    Dedent,
    EndOfInput,
    /// Reserved kinds: this tokenizer skips comments silently, folds logical
    /// newlines into `Newline`, and raises instead of emitting error tokens.
    NewlineLogical,
    Comment,
    Error,
}

/// One lexeme with its half-open source range.  Positions are
/// `(1-based line, 0-based byte column)` pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub start: (u32, u32),
    pub end: (u32, u32),
}

impl<'src> Token<'src> {
    /// Human-readable description for error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Newline => "newline".to_string(),
            TokenKind::Indent => "indent".to_string(),
            TokenKind::Dedent => "dedent".to_string(),
            TokenKind::EndOfInput => "end of input".to_string(),
            _ => format!("`{}`", self.text),
        }
    }
}

/// Reserved words the parser refuses to use as identifiers.  The soft
/// keywords `match`, `case` and `type` are deliberately absent.
pub fn is_keyword(s: &str) -> bool {
    matches!(
        s,
        "False"
            | "None"
            | "True"
            | "and"
            | "as"
            | "assert"
            | "async"
            | "await"
            | "break"
            | "class"
            | "continue"
            | "def"
            | "del"
            | "elif"
            | "else"
            | "except"
            | "finally"
            | "for"
            | "from"
            | "global"
            | "if"
            | "import"
            | "in"
            | "is"
            | "lambda"
            | "nonlocal"
            | "not"
            | "or"
            | "pass"
            | "raise"
            | "return"
            | "try"
            | "while"
            | "with"
            | "yield"
    )
}

// ── Operator tables (longest match first) ─────────────────────────────────────

const OPS3: &[&str] = &["...", "**=", "//=", ">>=", "<<="];
const OPS2: &[&str] = &[
    "==", "!=", "<=", ">=", "<<", ">>", "**", "//", "->", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "@=", ":=",
];
const OPS1: &[u8] = b".,:;()[]{}+-*/%&|^~<>=@!?";

// ── Tokenizer ─────────────────────────────────────────────────────────────────

pub struct Tokenizer<'src> {
    src: &'src [u8],
    /// The same source as `&str` — used for safe UTF-8 slicing.
    src_str: &'src str,
    /// Current byte position.
    pos: usize,
    /// Current 1-based line number.
    line: u32,
    /// Byte offset where the current line begins (columns are `pos - line_start`).
    line_start: usize,
    /// Indentation stack; always starts with [0].
    indent_stack: Vec<usize>,
    /// How many DEDENT tokens remain to be emitted.
    pending_dedents: usize,
    /// Whether the next logical line should trigger indent/dedent analysis.
    at_line_start: bool,
    /// Nesting depth of `()`, `[]`, `{}`.  When > 0 newlines are ignored.
    bracket_depth: i32,
    /// One-token lookahead buffer.
    peeked: Option<Token<'src>>,
    /// Set once EndOfInput has been produced.
    done: bool,
}

impl<'src> Tokenizer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src: src.as_bytes(),
            src_str: src,
            pos: 0,
            line: 1,
            line_start: 0,
            indent_stack: vec![0],
            pending_dedents: 0,
            at_line_start: true,
            bracket_depth: 0,
            peeked: None,
            done: false,
        }
    }

    // ── public interface ──────────────────────────────────────────────────────

    /// Return (but do not consume) the next token.
    pub fn peek(&mut self) -> Result<&Token<'src>, ParseError> {
        if self.peeked.is_none() {
            let t = self.next_inner()?;
            self.peeked = Some(t);
        }
        Ok(self
            .peeked
            .as_ref()
            .expect("peeked is always Some after the fill above"))
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Result<Token<'src>, ParseError> {
        match self.peeked.take() {
            Some(t) => Ok(t),
            None => self.next_inner(),
        }
    }

    /// Drain the whole stream into a vector ending with one `EndOfInput`.
    pub fn tokenize(mut self) -> Result<Vec<Token<'src>>, ParseError> {
        let mut out = Vec::new();
        loop {
            let t = self.next_token()?;
            let end = t.kind == TokenKind::EndOfInput;
            out.push(t);
            if end {
                return Ok(out);
            }
        }
    }

    // ── position helpers ──────────────────────────────────────────────────────

    fn here(&self) -> (u32, u32) {
        (self.line, (self.pos - self.line_start) as u32)
    }

    /// Consume one newline byte (`\n`, or `\r` optionally followed by `\n`)
    /// and update line accounting.
    fn advance_newline(&mut self) {
        if self.src[self.pos] == b'\r' {
            self.pos += 1;
            if self.pos < self.src.len() && self.src[self.pos] == b'\n' {
                self.pos += 1;
            }
        } else {
            self.pos += 1;
        }
        self.line += 1;
        self.line_start = self.pos;
    }

    fn make(&self, kind: TokenKind, start_pos: usize, start: (u32, u32)) -> Token<'src> {
        Token {
            kind,
            text: &self.src_str[start_pos..self.pos],
            start,
            end: self.here(),
        }
    }

    fn zero_width(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            text: "",
            start: self.here(),
            end: self.here(),
        }
    }

    // ── internal tokenization ─────────────────────────────────────────────────

    fn next_inner(&mut self) -> Result<Token<'src>, ParseError> {
        // Emit pending DEDENT tokens before reading more source.
        if self.pending_dedents > 0 {
            self.pending_dedents -= 1;
            return Ok(self.zero_width(TokenKind::Dedent));
        }
        if self.done {
            return Ok(self.zero_width(TokenKind::EndOfInput));
        }

        loop {
            // At the start of a logical line (not inside brackets), handle
            // indentation.
            if self.at_line_start && self.bracket_depth == 0 {
                self.at_line_start = false;
                if let Some(tok) = self.handle_indent()? {
                    return Ok(tok);
                }
                if self.pending_dedents > 0 {
                    self.pending_dedents -= 1;
                    return Ok(self.zero_width(TokenKind::Dedent));
                }
            }

            if self.pos >= self.src.len() {
                // Flush remaining DEDENT tokens before EndOfInput.
                if self.indent_stack.len() > 1 {
                    self.indent_stack.pop();
                    self.pending_dedents = self.indent_stack.len().saturating_sub(1);
                    self.indent_stack.truncate(1);
                    return Ok(self.zero_width(TokenKind::Dedent));
                }
                self.done = true;
                return Ok(self.zero_width(TokenKind::EndOfInput));
            }

            let start_pos = self.pos;
            let start = self.here();
            let b = self.src[self.pos];

            // ── Whitespace (not newlines) ─────────────────────────────────
            if b == b' ' || b == b'\t' {
                self.pos += 1;
                continue;
            }

            // ── Newlines (\n, \r\n, \r all normalize) ─────────────────────
            if b == b'\n' || b == b'\r' {
                self.advance_newline();
                if self.bracket_depth > 0 {
                    // Implicit continuation inside brackets.
                    continue;
                }
                self.at_line_start = true;
                return Ok(Token {
                    kind: TokenKind::Newline,
                    text: "\n",
                    start,
                    end: self.here(),
                });
            }

            // ── Explicit line continuation ────────────────────────────────
            if b == b'\\' {
                self.pos += 1;
                if self.pos < self.src.len()
                    && (self.src[self.pos] == b'\n' || self.src[self.pos] == b'\r')
                {
                    self.advance_newline();
                    continue;
                }
                return Err(ParseError::syntax(
                    "unexpected character after line continuation character",
                    start.0,
                    start.1,
                ));
            }

            // ── Comments (skipped silently) ───────────────────────────────
            if b == b'#' {
                while self.pos < self.src.len()
                    && self.src[self.pos] != b'\n'
                    && self.src[self.pos] != b'\r'
                {
                    self.pos += 1;
                }
                continue;
            }

            // ── String literals ───────────────────────────────────────────
            if self.is_string_start() {
                return self.lex_string(start_pos, start);
            }

            // ── Numbers ───────────────────────────────────────────────────
            if b.is_ascii_digit()
                || (b == b'.'
                    && self
                        .src
                        .get(self.pos + 1)
                        .copied()
                        .is_some_and(|c| c.is_ascii_digit()))
            {
                self.lex_number();
                return Ok(self.make(TokenKind::Number, start_pos, start));
            }

            // ── Identifiers and keywords ──────────────────────────────────
            if b.is_ascii_alphabetic() || b == b'_' || !b.is_ascii() {
                return self.lex_name(start_pos, start);
            }

            // ── Operators and punctuation (longest match) ─────────────────
            if let Some(op_len) = self.match_operator() {
                match b {
                    b'(' | b'[' | b'{' => self.bracket_depth += 1,
                    b')' | b']' | b'}' => self.bracket_depth = (self.bracket_depth - 1).max(0),
                    _ => {}
                }
                self.pos += op_len;
                return Ok(self.make(TokenKind::Op, start_pos, start));
            }

            return Err(ParseError::syntax(
                format!("invalid character `{}`", b as char),
                start.0,
                start.1,
            ));
        }
    }

    fn match_operator(&self) -> Option<usize> {
        let rest = &self.src[self.pos..];
        if OPS3.iter().any(|op| rest.starts_with(op.as_bytes())) {
            return Some(3);
        }
        if OPS2.iter().any(|op| rest.starts_with(op.as_bytes())) {
            return Some(2);
        }
        if OPS1.contains(&rest[0]) {
            return Some(1);
        }
        None
    }

    // ── Indentation handling ──────────────────────────────────────────────────

    /// Called when `at_line_start` is true.  Scans leading whitespace of the
    /// next non-blank, non-comment line and emits INDENT/DEDENT/nothing.
    fn handle_indent(&mut self) -> Result<Option<Token<'src>>, ParseError> {
        loop {
            // Indentation width of the current line (tab stop at 8).
            let mut col = 0usize;
            while self.pos < self.src.len() {
                match self.src[self.pos] {
                    b' ' => {
                        col += 1;
                        self.pos += 1;
                    }
                    b'\t' => {
                        col = (col + 8) & !7;
                        self.pos += 1;
                    }
                    _ => break,
                }
            }

            if self.pos >= self.src.len() {
                // Whitespace-only tail.
                return Ok(None);
            }
            let b = self.src[self.pos];
            if b == b'\n' || b == b'\r' {
                // Blank line — no tokens.
                self.advance_newline();
                continue;
            }
            if b == b'#' {
                // Comment-only line — no tokens, line number preserved.
                while self.pos < self.src.len()
                    && self.src[self.pos] != b'\n'
                    && self.src[self.pos] != b'\r'
                {
                    self.pos += 1;
                }
                if self.pos < self.src.len() {
                    self.advance_newline();
                }
                continue;
            }

            // Real content at indentation `col`.
            let top = *self
                .indent_stack
                .last()
                .expect("indent_stack always holds at least the zero level");

            if col > top {
                self.indent_stack.push(col);
                return Ok(Some(self.zero_width(TokenKind::Indent)));
            } else if col < top {
                let mut dedent_count = 0usize;
                while self
                    .indent_stack
                    .last()
                    .is_some_and(|&level| level > col)
                {
                    self.indent_stack.pop();
                    dedent_count += 1;
                }
                if *self.indent_stack.last().unwrap_or(&0) != col {
                    let (line, c) = self.here();
                    return Err(ParseError::indentation(
                        "unindent does not match any outer indentation level",
                        line,
                        c,
                    ));
                }
                // Emit the first DEDENT now; queue the rest.
                self.pending_dedents = dedent_count - 1;
                return Ok(Some(self.zero_width(TokenKind::Dedent)));
            } else {
                return Ok(None);
            }
        }
    }

    // ── Identifier lexing ─────────────────────────────────────────────────────

    fn lex_name(&mut self, start_pos: usize, start: (u32, u32)) -> Result<Token<'src>, ParseError> {
        // ASCII fast path, falling back to full Unicode identifier classes.
        let mut chars = self.src_str[self.pos..].char_indices();
        let Some((_, first)) = chars.next() else {
            return Err(ParseError::syntax("unexpected end of input", start.0, start.1));
        };
        if !(first.is_ascii_alphabetic() || first == '_' || unicode_ident::is_xid_start(first)) {
            return Err(ParseError::syntax(
                format!("invalid character `{first}`"),
                start.0,
                start.1,
            ));
        }
        let mut len = first.len_utf8();
        for (idx, ch) in chars {
            if ch.is_ascii_alphanumeric() || ch == '_' || unicode_ident::is_xid_continue(ch) {
                len = idx + ch.len_utf8();
            } else {
                break;
            }
        }
        self.pos += len;
        Ok(self.make(TokenKind::Name, start_pos, start))
    }

    // ── Number lexing ─────────────────────────────────────────────────────────

    fn lex_number(&mut self) {
        let b = self.src[self.pos];
        // Radix prefixes: 0x / 0o / 0b.
        if b == b'0'
            && matches!(
                self.src.get(self.pos + 1).copied(),
                Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B')
            )
        {
            self.pos += 2;
            while self
                .src
                .get(self.pos)
                .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
            {
                self.pos += 1;
            }
            return;
        }

        // Integer part (or leading `.` of a bare fraction).
        while self
            .src
            .get(self.pos)
            .is_some_and(|c| c.is_ascii_digit() || *c == b'_')
        {
            self.pos += 1;
        }

        // Fractional part.  A `.` followed by an identifier is attribute
        // access on the integer, not part of the number.
        if self.src.get(self.pos) == Some(&b'.') {
            let after = self.src.get(self.pos + 1).copied();
            let is_exponent_ahead = matches!(after, Some(b'e' | b'E'))
                && matches!(
                    self.src.get(self.pos + 2).copied(),
                    Some(c) if c.is_ascii_digit() || c == b'+' || c == b'-'
                );
            let is_attribute = matches!(after, Some(c) if c.is_ascii_alphabetic() || c == b'_')
                && !is_exponent_ahead;
            if !is_attribute {
                self.pos += 1;
                while self
                    .src
                    .get(self.pos)
                    .is_some_and(|c| c.is_ascii_digit() || *c == b'_')
                {
                    self.pos += 1;
                }
            }
        }

        // Exponent.
        if matches!(self.src.get(self.pos).copied(), Some(b'e' | b'E')) {
            let mut ahead = self.pos + 1;
            if matches!(self.src.get(ahead).copied(), Some(b'+' | b'-')) {
                ahead += 1;
            }
            if self.src.get(ahead).is_some_and(u8::is_ascii_digit) {
                self.pos = ahead;
                while self
                    .src
                    .get(self.pos)
                    .is_some_and(|c| c.is_ascii_digit() || *c == b'_')
                {
                    self.pos += 1;
                }
            }
        }

        // Imaginary suffix.
        if matches!(self.src.get(self.pos).copied(), Some(b'j' | b'J')) {
            self.pos += 1;
        }
    }

    // ── String lexing ─────────────────────────────────────────────────────────

    fn is_string_start(&self) -> bool {
        let b = self.src[self.pos];
        match b {
            b'"' | b'\'' => true,
            b'r' | b'R' | b'b' | b'B' | b'u' | b'U' | b'f' | b'F' => {
                let next = self.src.get(self.pos + 1).copied().unwrap_or(0);
                match next {
                    b'"' | b'\'' => true,
                    b'r' | b'R' | b'b' | b'B' | b'f' | b'F' => {
                        // Two-char prefix like rb, br, rf, fr.
                        let nn = self.src.get(self.pos + 2).copied().unwrap_or(0);
                        nn == b'"' || nn == b'\''
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn lex_string(
        &mut self,
        start_pos: usize,
        start: (u32, u32),
    ) -> Result<Token<'src>, ParseError> {
        // Consume prefix letters (r, b, u, f in any order/case, at most two).
        let mut prefix_chars = 0;
        while prefix_chars < 2
            && matches!(
                self.src.get(self.pos).copied(),
                Some(b'r' | b'R' | b'b' | b'B' | b'u' | b'U' | b'f' | b'F')
            )
        {
            self.pos += 1;
            prefix_chars += 1;
        }

        let q = self.src[self.pos];
        let triple =
            self.src.get(self.pos + 1) == Some(&q) && self.src.get(self.pos + 2) == Some(&q);
        self.pos += if triple { 3 } else { 1 };

        if triple {
            loop {
                if self.pos >= self.src.len() {
                    return Err(ParseError::unterminated_string(start.0, start.1));
                }
                let b = self.src[self.pos];
                if b == b'\\' {
                    self.pos += 1;
                    if self.pos < self.src.len() {
                        if self.src[self.pos] == b'\n' || self.src[self.pos] == b'\r' {
                            self.advance_newline();
                        } else {
                            self.pos += 1;
                        }
                    }
                    continue;
                }
                if b == b'\n' || b == b'\r' {
                    self.advance_newline();
                    continue;
                }
                if b == q
                    && self.src.get(self.pos + 1) == Some(&q)
                    && self.src.get(self.pos + 2) == Some(&q)
                {
                    self.pos += 3;
                    break;
                }
                self.pos += 1;
            }
        } else {
            loop {
                if self.pos >= self.src.len() {
                    return Err(ParseError::syntax(
                        "EOL while scanning string literal",
                        start.0,
                        start.1,
                    ));
                }
                let b = self.src[self.pos];
                if b == b'\\' {
                    self.pos += 1;
                    if self.pos < self.src.len() {
                        if self.src[self.pos] == b'\n' || self.src[self.pos] == b'\r' {
                            // Escaped newline inside a single-quoted string.
                            self.advance_newline();
                        } else {
                            self.pos += 1;
                        }
                    }
                    continue;
                }
                if b == b'\n' || b == b'\r' {
                    return Err(ParseError::syntax(
                        "EOL while scanning string literal",
                        start.0,
                        start.1,
                    ));
                }
                if b == q {
                    self.pos += 1;
                    break;
                }
                self.pos += 1;
            }
        }

        Ok(self.make(TokenKind::String, start_pos, start))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
