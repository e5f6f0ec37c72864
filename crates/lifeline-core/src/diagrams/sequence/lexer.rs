use super::model::{MessageKind, NotePlacement};

/// Byte cursor over the diagram body. All scanning helpers stop on ASCII delimiters only, so
/// `pos` always lands on a UTF-8 boundary.
pub(super) struct Scanner<'input> {
    input: &'input str,
    pos: usize,
}

impl<'input> Scanner<'input> {
    pub(super) fn new(input: &'input str) -> Self {
        Self { input, pos: 0 }
    }

    pub(super) fn pos(&self) -> usize {
        self.pos
    }

    pub(super) fn at_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek2(&self) -> Option<[u8; 2]> {
        let bytes = self.input.as_bytes();
        if self.pos + 1 >= bytes.len() {
            return None;
        }
        Some([bytes[self.pos], bytes[self.pos + 1]])
    }

    pub(super) fn skip_ws(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' || b == b'\r' {
                self.pos += 1;
                continue;
            }
            break;
        }
    }

    fn at_comment(&self) -> bool {
        matches!(self.peek(), Some(b'#')) || matches!(self.peek2(), Some([b'%', b'%']))
    }

    fn skip_comment(&mut self) -> bool {
        if !self.at_comment() {
            return false;
        }
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        true
    }

    /// Skips whitespace, statement separators and comments.
    pub(super) fn skip_blank(&mut self) {
        loop {
            self.skip_ws();
            if self.skip_comment() {
                continue;
            }
            match self.peek() {
                Some(b'\n' | b';') => self.pos += 1,
                _ => break,
            }
        }
    }

    /// True when the cursor sits at a statement boundary (after trailing whitespace).
    pub(super) fn at_statement_end(&mut self) -> bool {
        self.skip_ws();
        self.at_eof() || matches!(self.peek(), Some(b'\n' | b';')) || self.at_comment()
    }

    pub(super) fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn starts_with_ci(&self, kw: &str) -> bool {
        let rest = self.input.as_bytes().get(self.pos..).unwrap_or_default();
        let kwb = kw.as_bytes();
        rest.len() >= kwb.len() && rest[..kwb.len()].eq_ignore_ascii_case(kwb)
    }

    fn starts_with_ci_word(&self, kw: &str) -> bool {
        if !self.starts_with_ci(kw) {
            return false;
        }
        match self.input.as_bytes().get(self.pos + kw.len()) {
            None => true,
            Some(b) => !b.is_ascii_alphanumeric() && *b != b'_',
        }
    }

    /// Consumes `kw` (case-insensitive) when it appears as a whole word.
    pub(super) fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.starts_with_ci_word(kw) {
            self.pos += kw.len();
            return true;
        }
        false
    }

    /// Like [`Scanner::eat_keyword`] but also requires whitespace, `:` or a statement boundary after
    /// the word, so `title->Bob` is still read as a message.
    pub(super) fn eat_line_keyword(&mut self, kw: &str) -> bool {
        if !self.starts_with_ci(kw) {
            return false;
        }
        let next = self.input.as_bytes().get(self.pos + kw.len()).copied();
        if matches!(next, None | Some(b' ' | b'\t' | b'\r' | b'\n' | b';' | b':' | b'{')) {
            self.pos += kw.len();
            return true;
        }
        false
    }

    /// Text up to the end of the statement: newline, `;`, `#` or `%%`.
    pub(super) fn read_to_line_end(&mut self) -> &'input str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\n' || b == b';' || b == b'#' {
                break;
            }
            if let Some([b'%', b'%']) = self.peek2() {
                break;
            }
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Raw text up to (not including) the next `}`; the brace is consumed.
    pub(super) fn read_braced(&mut self) -> Option<&'input str> {
        let rel_end = self.input[self.pos..].find('}')?;
        let s = &self.input[self.pos..self.pos + rel_end];
        self.pos += rel_end + 1;
        Some(s)
    }

    pub(super) fn lex_arrow(&mut self) -> Option<MessageKind> {
        let rest = &self.input[self.pos..];
        let (token, kind) = MessageKind::ARROWS
            .iter()
            .find(|(token, _)| rest.starts_with(token))?;
        self.pos += token.len();
        Some(*kind)
    }

    pub(super) fn lex_placement(&mut self) -> Option<NotePlacement> {
        for (words, placement) in [
            (("left", "of"), NotePlacement::LeftOf),
            (("right", "of"), NotePlacement::RightOf),
        ] {
            let save = self.pos;
            if self.eat_keyword(words.0) {
                self.skip_ws();
                if self.eat_keyword(words.1) {
                    return Some(placement);
                }
            }
            self.pos = save;
        }
        self.eat_keyword("over").then_some(NotePlacement::Over)
    }

    fn at_arrow(&self) -> bool {
        let bytes = self.input.as_bytes();
        bytes.get(self.pos) == Some(&b'-')
            && matches!(bytes.get(self.pos + 1), Some(b'-' | b'>' | b'x'))
    }

    /// Actor name as used in messages and notes: everything up to an arrow, `+`, `:`, `,`,
    /// `>` or the end of the statement. Inner whitespace is kept; the result is trimmed.
    pub(super) fn lex_actor(&mut self) -> Option<&'input str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'\n' | b';' | b',' | b':' | b'+' | b'>' | b'#') {
                break;
            }
            if self.at_comment() || self.at_arrow() {
                break;
            }
            self.pos += 1;
        }
        let s = self.input[start..self.pos].trim();
        (!s.is_empty()).then_some(s)
    }

    /// 1-based line and column of byte offset `at`.
    pub(super) fn line_col(&self, at: usize) -> (usize, usize) {
        let before = &self.input[..at.min(self.input.len())];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }

    /// A short excerpt of the current statement for error messages.
    pub(super) fn excerpt(&self, from: usize) -> &'input str {
        let rest = &self.input[from.min(self.input.len())..];
        let end = rest.find('\n').unwrap_or(rest.len());
        rest[..end].trim()
    }
}
