//! The token stream.
//!
//! Tokens are scanned on demand and cached, so `mark`/`seek` are cursor
//! moves, not re-lexes. The one wrinkle is `/`: in operand position it
//! starts a regular expression, in operator position it is division, so a
//! cached `/`-introduced token is re-scanned when consumed under the other
//! mode. All other tokens scan identically in both modes.

use crate::token::{Token, TokenKind, TokenValue};
use memchr::memchr;
use nightjar_core::intern::AtomInterner;
use nightjar_core::text::{SourcePos, SourceSpan};
use nightjar_diagnostics::{messages, Diagnostic, DiagnosticCollection};
use unicode_xid::UnicodeXID;

/// What the parser expects next, which decides how `/` is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookaheadMode {
    /// An expression may start here: `/` begins a regular expression.
    Operand,
    /// A binary operator may appear here: `/` is division.
    Operator,
}

/// A saved token-cursor position.
#[derive(Debug, Clone, Copy)]
pub struct Mark {
    cursor: usize,
}

struct CachedToken {
    token: Token,
    mode: LookaheadMode,
}

/// Lazily-scanning token stream over UTF-8 source text.
pub struct TokenStream {
    text: String,
    interner: AtomInterner,
    /// Byte offset where the next uncached token scan begins.
    pos: usize,
    tokens: Vec<CachedToken>,
    /// Index of the next token to deliver.
    cursor: usize,
    diagnostics: DiagnosticCollection,
}

impl TokenStream {
    pub fn new(text: &str, interner: AtomInterner) -> Self {
        Self {
            text: text.to_string(),
            interner,
            pos: 0,
            tokens: Vec::new(),
            cursor: 0,
            diagnostics: DiagnosticCollection::new(),
        }
    }

    /// The interner used for names and string values.
    pub fn interner(&self) -> &AtomInterner {
        &self.interner
    }

    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    // ========================================================================
    // The consumption contract
    // ========================================================================

    /// Consume and return the kind of the next token.
    pub fn get(&mut self, mode: LookaheadMode) -> TokenKind {
        let kind = self.ensure(self.cursor, mode);
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
        kind
    }

    /// Look at the next token without consuming it.
    pub fn peek(&mut self, mode: LookaheadMode) -> TokenKind {
        self.ensure(self.cursor, mode)
    }

    /// Whether the next token is preceded by a line terminator.
    pub fn peek_on_new_line(&mut self, mode: LookaheadMode) -> bool {
        self.ensure(self.cursor, mode);
        self.token_at(self.cursor).on_new_line
    }

    /// The span of the next token, without consuming it.
    pub fn peek_span(&mut self, mode: LookaheadMode) -> SourceSpan {
        self.ensure(self.cursor, mode);
        self.token_at(self.cursor).span
    }

    /// Push back exactly one consumed token.
    pub fn unget(&mut self) {
        debug_assert!(self.cursor > 0, "unget with no consumed token");
        self.cursor -= 1;
    }

    /// Consume the next token if it has the given kind.
    pub fn match_token(&mut self, kind: TokenKind, mode: LookaheadMode) -> bool {
        if self.peek(mode) == kind {
            self.get(mode);
            true
        } else {
            false
        }
    }

    /// Snapshot the cursor for a speculative parse.
    pub fn mark(&self) -> Mark {
        Mark {
            cursor: self.cursor,
        }
    }

    /// Restore a snapshot taken with `mark`.
    pub fn seek(&mut self, mark: Mark) {
        debug_assert!(mark.cursor <= self.tokens.len());
        self.cursor = mark.cursor;
    }

    /// The most recently consumed token.
    pub fn current(&self) -> &Token {
        debug_assert!(self.cursor > 0, "no token consumed yet");
        &self.tokens[self.cursor - 1].token
    }

    pub fn current_span(&self) -> SourceSpan {
        self.current().span
    }

    /// Atom of the current Name/String token.
    pub fn current_atom(&self) -> nightjar_core::intern::Atom {
        self.current().atom()
    }

    pub fn diagnostics(&self) -> &DiagnosticCollection {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> DiagnosticCollection {
        std::mem::take(&mut self.diagnostics)
    }

    // ========================================================================
    // Cache management
    // ========================================================================

    fn token_at(&self, index: usize) -> &Token {
        let index = index.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index].token
    }

    /// Make sure the token at `index` is scanned compatibly with `mode` and
    /// return its kind.
    fn ensure(&mut self, index: usize, mode: LookaheadMode) -> TokenKind {
        if index < self.tokens.len() {
            let cached = &self.tokens[index];
            if cached.mode == mode || !cached.token.kind.is_mode_sensitive() {
                return cached.token.kind;
            }
            // Mode mismatch on a `/` token: drop it and everything after,
            // then rescan from its start under the requested mode.
            let begin = cached.token.span.begin as usize;
            let on_new_line = cached.token.on_new_line;
            self.tokens.truncate(index);
            self.pos = begin;
            let token = self.scan_token(mode, on_new_line);
            let kind = token.kind;
            self.tokens.push(CachedToken { token, mode });
            return kind;
        }
        while self.tokens.len() <= index {
            if let Some(last) = self.tokens.last() {
                if last.token.kind == TokenKind::Eof {
                    return TokenKind::Eof;
                }
            }
            let on_new_line = self.skip_trivia();
            let token = self.scan_token(mode, on_new_line);
            self.tokens.push(CachedToken { token, mode });
        }
        self.tokens[index].token.kind
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    #[inline]
    fn peek_byte(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    #[inline]
    fn byte_at(&self, offset: usize) -> Option<u8> {
        self.text.as_bytes().get(self.pos + offset).copied()
    }

    #[inline]
    fn peek_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    /// Skip whitespace and comments. Returns whether a line terminator was
    /// crossed.
    fn skip_trivia(&mut self) -> bool {
        let mut saw_newline = false;
        loop {
            match self.peek_byte() {
                Some(b' ') | Some(b'\t') | Some(b'\x0b') | Some(b'\x0c') | Some(b'\r') => {
                    self.pos += 1;
                }
                Some(b'\n') => {
                    saw_newline = true;
                    self.pos += 1;
                }
                Some(b'/') if self.byte_at(1) == Some(b'/') => {
                    let rest = &self.text.as_bytes()[self.pos..];
                    match memchr(b'\n', rest) {
                        Some(offset) => self.pos += offset,
                        None => self.pos = self.text.len(),
                    }
                }
                Some(b'/') if self.byte_at(1) == Some(b'*') => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        let rest = &self.text.as_bytes()[self.pos..];
                        match memchr(b'*', rest) {
                            Some(offset) => {
                                saw_newline |= memchr(b'\n', &rest[..offset]).is_some();
                                if rest[offset..].starts_with(b"*/") {
                                    self.pos += offset + 2;
                                    break;
                                }
                                self.pos += offset + 1;
                            }
                            None => {
                                self.report_at(start, self.text.len(), &messages::UNTERMINATED_COMMENT, &[]);
                                self.pos = self.text.len();
                                break;
                            }
                        }
                    }
                }
                Some(c) if !c.is_ascii() => {
                    // Unicode whitespace / line separators.
                    let ch = self.peek_char().unwrap();
                    if ch == '\u{2028}' || ch == '\u{2029}' {
                        saw_newline = true;
                        self.pos += ch.len_utf8();
                    } else if ch.is_whitespace() {
                        self.pos += ch.len_utf8();
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        saw_newline
    }

    fn report_at(&mut self, begin: usize, end: usize, msg: &nightjar_diagnostics::DiagnosticMessage, args: &[&str]) {
        self.diagnostics.add(Diagnostic::at(
            SourceSpan::new(begin as SourcePos, end as SourcePos),
            msg,
            args,
        ));
    }

    fn token(
        &self,
        kind: TokenKind,
        begin: usize,
        value: TokenValue,
        on_new_line: bool,
    ) -> Token {
        Token {
            kind,
            span: SourceSpan::new(begin as SourcePos, self.pos as SourcePos),
            value,
            on_new_line,
        }
    }

    fn scan_token(&mut self, mode: LookaheadMode, on_new_line: bool) -> Token {
        let begin = self.pos;
        let Some(byte) = self.peek_byte() else {
            return self.token(TokenKind::Eof, begin, TokenValue::None, on_new_line);
        };

        let kind = match byte {
            b'{' => self.punct(TokenKind::LeftBrace, 1),
            b'}' => self.punct(TokenKind::RightBrace, 1),
            b'(' => self.punct(TokenKind::LeftParen, 1),
            b')' => self.punct(TokenKind::RightParen, 1),
            b'[' => self.punct(TokenKind::LeftBracket, 1),
            b']' => self.punct(TokenKind::RightBracket, 1),
            b';' => self.punct(TokenKind::Semi, 1),
            b',' => self.punct(TokenKind::Comma, 1),
            b':' => self.punct(TokenKind::Colon, 1),
            b'?' => self.punct(TokenKind::Hook, 1),
            b'~' => self.punct(TokenKind::BitNot, 1),
            b'.' => {
                if self.byte_at(1).is_some_and(|b| b.is_ascii_digit()) {
                    return self.scan_number(begin, on_new_line);
                }
                if self.byte_at(1) == Some(b'.') && self.byte_at(2) == Some(b'.') {
                    self.punct(TokenKind::TripleDot, 3)
                } else {
                    self.punct(TokenKind::Dot, 1)
                }
            }
            b'=' => {
                if self.byte_at(1) == Some(b'=') {
                    if self.byte_at(2) == Some(b'=') {
                        self.punct(TokenKind::StrictEq, 3)
                    } else {
                        self.punct(TokenKind::Eq, 2)
                    }
                } else if self.byte_at(1) == Some(b'>') {
                    self.punct(TokenKind::Arrow, 2)
                } else {
                    self.punct(TokenKind::Assign, 1)
                }
            }
            b'!' => {
                if self.byte_at(1) == Some(b'=') {
                    if self.byte_at(2) == Some(b'=') {
                        self.punct(TokenKind::StrictNe, 3)
                    } else {
                        self.punct(TokenKind::Ne, 2)
                    }
                } else {
                    self.punct(TokenKind::Not, 1)
                }
            }
            b'<' => {
                if self.byte_at(1) == Some(b'<') {
                    if self.byte_at(2) == Some(b'=') {
                        self.punct(TokenKind::LshAssign, 3)
                    } else {
                        self.punct(TokenKind::Lsh, 2)
                    }
                } else if self.byte_at(1) == Some(b'=') {
                    self.punct(TokenKind::Le, 2)
                } else {
                    self.punct(TokenKind::Lt, 1)
                }
            }
            b'>' => {
                if self.byte_at(1) == Some(b'>') {
                    if self.byte_at(2) == Some(b'>') {
                        if self.byte_at(3) == Some(b'=') {
                            self.punct(TokenKind::UrshAssign, 4)
                        } else {
                            self.punct(TokenKind::Ursh, 3)
                        }
                    } else if self.byte_at(2) == Some(b'=') {
                        self.punct(TokenKind::RshAssign, 3)
                    } else {
                        self.punct(TokenKind::Rsh, 2)
                    }
                } else if self.byte_at(1) == Some(b'=') {
                    self.punct(TokenKind::Ge, 2)
                } else {
                    self.punct(TokenKind::Gt, 1)
                }
            }
            b'+' => {
                if self.byte_at(1) == Some(b'+') {
                    self.punct(TokenKind::Inc, 2)
                } else if self.byte_at(1) == Some(b'=') {
                    self.punct(TokenKind::AddAssign, 2)
                } else {
                    self.punct(TokenKind::Add, 1)
                }
            }
            b'-' => {
                if self.byte_at(1) == Some(b'-') {
                    self.punct(TokenKind::Dec, 2)
                } else if self.byte_at(1) == Some(b'=') {
                    self.punct(TokenKind::SubAssign, 2)
                } else {
                    self.punct(TokenKind::Sub, 1)
                }
            }
            b'*' => {
                if self.byte_at(1) == Some(b'=') {
                    self.punct(TokenKind::MulAssign, 2)
                } else {
                    self.punct(TokenKind::Mul, 1)
                }
            }
            b'%' => {
                if self.byte_at(1) == Some(b'=') {
                    self.punct(TokenKind::ModAssign, 2)
                } else {
                    self.punct(TokenKind::Mod, 1)
                }
            }
            b'&' => {
                if self.byte_at(1) == Some(b'&') {
                    self.punct(TokenKind::And, 2)
                } else if self.byte_at(1) == Some(b'=') {
                    self.punct(TokenKind::BitAndAssign, 2)
                } else {
                    self.punct(TokenKind::BitAnd, 1)
                }
            }
            b'|' => {
                if self.byte_at(1) == Some(b'|') {
                    self.punct(TokenKind::Or, 2)
                } else if self.byte_at(1) == Some(b'=') {
                    self.punct(TokenKind::BitOrAssign, 2)
                } else {
                    self.punct(TokenKind::BitOr, 1)
                }
            }
            b'^' => {
                if self.byte_at(1) == Some(b'=') {
                    self.punct(TokenKind::BitXorAssign, 2)
                } else {
                    self.punct(TokenKind::BitXor, 1)
                }
            }
            b'/' => {
                if mode == LookaheadMode::Operand {
                    return self.scan_regexp(begin, on_new_line);
                }
                if self.byte_at(1) == Some(b'=') {
                    self.punct(TokenKind::DivAssign, 2)
                } else {
                    self.punct(TokenKind::Div, 1)
                }
            }
            b'"' | b'\'' => return self.scan_string(begin, byte, on_new_line),
            b'0'..=b'9' => return self.scan_number(begin, on_new_line),
            _ => {
                let ch = self.peek_char().unwrap();
                if ch == '$' || ch == '_' || ch.is_xid_start() {
                    return self.scan_name(begin, on_new_line);
                }
                self.pos += ch.len_utf8();
                self.report_at(begin, self.pos, &messages::ILLEGAL_CHARACTER, &[]);
                return self.token(TokenKind::Error, begin, TokenValue::None, on_new_line);
            }
        };
        self.token(kind, begin, TokenValue::None, on_new_line)
    }

    #[inline]
    fn punct(&mut self, kind: TokenKind, len: usize) -> TokenKind {
        self.pos += len;
        kind
    }

    fn scan_name(&mut self, begin: usize, on_new_line: bool) -> Token {
        while let Some(ch) = self.peek_char() {
            if ch == '$' || ch == '_' || ch.is_xid_continue() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        let text = &self.text[begin..self.pos];
        if let Some(keyword) = TokenKind::keyword(text) {
            return self.token(keyword, begin, TokenValue::None, on_new_line);
        }
        let atom = self.interner.intern(text);
        self.token(TokenKind::Name, begin, TokenValue::Atom(atom), on_new_line)
    }

    fn scan_string(&mut self, begin: usize, quote: u8, on_new_line: bool) -> Token {
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek_byte() {
                None => {
                    self.report_at(begin, self.pos, &messages::UNTERMINATED_STRING, &[]);
                    return self.token(TokenKind::Error, begin, TokenValue::None, on_new_line);
                }
                Some(b'\n') => {
                    self.report_at(begin, self.pos, &messages::EOL_IN_STRING, &[]);
                    return self.token(TokenKind::Error, begin, TokenValue::None, on_new_line);
                }
                Some(b) if b == quote => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    if !self.scan_escape(&mut value) {
                        self.report_at(begin, self.pos, &messages::BAD_ESCAPE, &[]);
                        return self.token(TokenKind::Error, begin, TokenValue::None, on_new_line);
                    }
                }
                Some(_) => {
                    let ch = self.peek_char().unwrap();
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
        let atom = self.interner.intern(&value);
        self.token(TokenKind::String, begin, TokenValue::Atom(atom), on_new_line)
    }

    /// Decode one escape sequence after the backslash into `out`.
    fn scan_escape(&mut self, out: &mut String) -> bool {
        let Some(ch) = self.peek_char() else {
            return false;
        };
        self.pos += ch.len_utf8();
        match ch {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek_byte().is_some_and(|b| b.is_ascii_digit()) => out.push('\0'),
            'x' => {
                let Some(code) = self.scan_hex_digits(2) else {
                    return false;
                };
                out.push(code as u8 as char);
            }
            'u' => {
                let Some(code) = self.scan_hex_digits(4) else {
                    return false;
                };
                match char::from_u32(code) {
                    Some(c) => out.push(c),
                    None => out.push('\u{fffd}'),
                }
            }
            '\n' => {}
            _ => out.push(ch),
        }
        true
    }

    fn scan_hex_digits(&mut self, count: usize) -> Option<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            let b = self.peek_byte()?;
            let digit = (b as char).to_digit(16)?;
            value = value * 16 + digit;
            self.pos += 1;
        }
        Some(value)
    }

    fn scan_number(&mut self, begin: usize, on_new_line: bool) -> Token {
        if self.peek_byte() == Some(b'0')
            && matches!(self.byte_at(1), Some(b'x') | Some(b'X'))
        {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek_byte().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            if self.pos == digits_start {
                self.report_at(begin, self.pos, &messages::MALFORMED_NUMBER, &["0x"]);
                return self.token(TokenKind::Error, begin, TokenValue::None, on_new_line);
            }
            let value = u64::from_str_radix(&self.text[digits_start..self.pos], 16)
                .map(|v| v as f64)
                .unwrap_or(f64::INFINITY);
            return self.token(TokenKind::Number, begin, TokenValue::Number(value), on_new_line);
        }

        // Legacy octal: leading 0 followed only by octal digits.
        if self.peek_byte() == Some(b'0')
            && self.byte_at(1).is_some_and(|b| (b'0'..=b'7').contains(&b))
        {
            let digits_start = self.pos;
            self.pos += 1;
            let mut all_octal = true;
            while let Some(b) = self.peek_byte() {
                if (b'0'..=b'7').contains(&b) {
                    self.pos += 1;
                } else if b.is_ascii_digit() {
                    all_octal = false;
                    break;
                } else {
                    break;
                }
            }
            if all_octal {
                let value = u64::from_str_radix(&self.text[digits_start..self.pos], 8)
                    .map(|v| v as f64)
                    .unwrap_or(f64::INFINITY);
                return self.token(TokenKind::Number, begin, TokenValue::Number(value), on_new_line);
            }
            // `08`/`09`: fall through and rescan as decimal.
            self.pos = digits_start;
        }

        while self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek_byte() == Some(b'.') {
            self.pos += 1;
            while self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte(), Some(b'e') | Some(b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
                while self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.report_at(begin, self.pos, &messages::MALFORMED_NUMBER, &["e"]);
                self.pos = mark;
            }
        }
        let value = self.text[begin..self.pos].parse::<f64>().unwrap_or(f64::NAN);
        self.token(TokenKind::Number, begin, TokenValue::Number(value), on_new_line)
    }

    fn scan_regexp(&mut self, begin: usize, on_new_line: bool) -> Token {
        debug_assert_eq!(self.peek_byte(), Some(b'/'));
        self.pos += 1;
        let body_start = self.pos;
        let mut in_class = false;
        loop {
            match self.peek_byte() {
                None | Some(b'\n') => {
                    self.report_at(begin, self.pos, &messages::UNTERMINATED_REGEXP, &[]);
                    return self.token(TokenKind::Error, begin, TokenValue::None, on_new_line);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    if matches!(self.peek_byte(), None | Some(b'\n')) {
                        continue;
                    }
                    let ch = self.peek_char().unwrap();
                    self.pos += ch.len_utf8();
                }
                Some(b'[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(b']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some(b'/') if !in_class => break,
                Some(_) => {
                    let ch = self.peek_char().unwrap();
                    self.pos += ch.len_utf8();
                }
            }
        }
        let pattern = self.interner.intern(&self.text[body_start..self.pos]);
        self.pos += 1;
        let flags_start = self.pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphabetic() {
                if !matches!(ch, 'g' | 'i' | 'm' | 'y') {
                    self.pos += 1;
                    self.report_at(
                        flags_start,
                        self.pos,
                        &messages::BAD_REGEXP_FLAG,
                        &[&ch.to_string()],
                    );
                    return self.token(TokenKind::Error, begin, TokenValue::None, on_new_line);
                }
                self.pos += 1;
            } else {
                break;
            }
        }
        let flags = self.interner.intern(&self.text[flags_start..self.pos]);
        self.token(
            TokenKind::RegExp,
            begin,
            TokenValue::RegExp { pattern, flags },
            on_new_line,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(src: &str) -> TokenStream {
        TokenStream::new(src, AtomInterner::new())
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut ts = stream(src);
        let mut out = Vec::new();
        loop {
            let kind = ts.get(LookaheadMode::Operand);
            if kind == TokenKind::Eof {
                break;
            }
            out.push(kind);
        }
        out
    }

    #[test]
    fn scans_statement_tokens() {
        assert_eq!(
            kinds("var x = 1;"),
            [
                TokenKind::Var,
                TokenKind::Name,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Semi,
            ]
        );
    }

    #[test]
    fn maximal_munch_on_operators() {
        assert_eq!(
            kinds(">>>= >>> >>= >> >= >"),
            [
                TokenKind::UrshAssign,
                TokenKind::Ursh,
                TokenKind::RshAssign,
                TokenKind::Rsh,
                TokenKind::Ge,
                TokenKind::Gt,
            ]
        );
    }

    #[test]
    fn slash_mode_selects_regexp_or_division() {
        let mut ts = stream("/ab/g");
        assert_eq!(ts.get(LookaheadMode::Operand), TokenKind::RegExp);
        match &ts.current().value {
            TokenValue::RegExp { pattern, flags } => {
                assert_eq!(ts.interner().resolve(*pattern), "ab");
                assert_eq!(ts.interner().resolve(*flags), "g");
            }
            v => panic!("unexpected value {:?}", v),
        }

        let mut ts = stream("/ ab");
        assert_eq!(ts.get(LookaheadMode::Operator), TokenKind::Div);
    }

    #[test]
    fn cached_slash_token_rescans_under_other_mode() {
        let mut ts = stream("/x/ y");
        assert_eq!(ts.peek(LookaheadMode::Operator), TokenKind::Div);
        // Re-reading the same position as an operand must produce the regexp.
        assert_eq!(ts.get(LookaheadMode::Operand), TokenKind::RegExp);
        assert_eq!(ts.get(LookaheadMode::Operator), TokenKind::Name);
    }

    #[test]
    fn unget_and_mark_seek() {
        let mut ts = stream("a b c");
        assert_eq!(ts.get(LookaheadMode::Operand), TokenKind::Name);
        let mark = ts.mark();
        assert_eq!(ts.get(LookaheadMode::Operand), TokenKind::Name);
        assert_eq!(ts.get(LookaheadMode::Operand), TokenKind::Name);
        ts.unget();
        assert_eq!(ts.get(LookaheadMode::Operand), TokenKind::Name);
        ts.seek(mark);
        let b = ts.get(LookaheadMode::Operand);
        assert_eq!(b, TokenKind::Name);
        assert_eq!(ts.interner().resolve(ts.current_atom()), "b");
    }

    #[test]
    fn line_break_flag() {
        let mut ts = stream("a\nb c");
        ts.get(LookaheadMode::Operand);
        assert!(ts.peek_on_new_line(LookaheadMode::Operand));
        ts.get(LookaheadMode::Operand);
        assert!(!ts.peek_on_new_line(LookaheadMode::Operand));
    }

    #[test]
    fn comments_are_trivia() {
        assert_eq!(
            kinds("a // one\n/* two\nthree */ b"),
            [TokenKind::Name, TokenKind::Name]
        );
    }

    #[test]
    fn string_escapes_decode() {
        let mut ts = stream(r#"'a\n\x41B'"#);
        assert_eq!(ts.get(LookaheadMode::Operand), TokenKind::String);
        assert_eq!(ts.interner().resolve(ts.current_atom()), "a\nAB");
        // Escapes make the span longer than the decoded text plus quotes.
        let span = ts.current_span();
        assert!(span.len() as usize > "a\nAB".len() + 2);
    }

    #[test]
    fn numbers_decode() {
        let mut ts = stream("0x10 010 1.5e2 08");
        ts.get(LookaheadMode::Operand);
        assert_eq!(ts.current().number(), 16.0);
        ts.get(LookaheadMode::Operand);
        assert_eq!(ts.current().number(), 8.0);
        ts.get(LookaheadMode::Operand);
        assert_eq!(ts.current().number(), 150.0);
        ts.get(LookaheadMode::Operand);
        assert_eq!(ts.current().number(), 8.0);
    }

    #[test]
    fn unterminated_string_is_error() {
        let mut ts = stream("'abc");
        assert_eq!(ts.get(LookaheadMode::Operand), TokenKind::Error);
        assert!(ts.diagnostics().has_errors());
    }
}
