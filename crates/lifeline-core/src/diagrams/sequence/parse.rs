use crate::preprocess::{DirectiveFlag, FlagDirective};
use crate::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

use super::lexer::Scanner;
use super::model::{ActorType, BlockKind, BlockMarker, DiagramState};

/// Parses a preprocessed diagram body into `state`, statement by statement.
///
/// `flags` are positional `wrap` / `nowrap` switches (byte offsets into `code`). On error the
/// statements applied so far stay in `state`.
pub fn parse_sequence(code: &str, flags: &[FlagDirective], state: &mut DiagramState) -> Result<()> {
    Parser {
        scanner: Scanner::new(code),
        flags,
        next_flag: 0,
        open_blocks: Vec::new(),
        state,
    }
    .run()
}

#[derive(Debug, Clone, Copy)]
struct OpenBlock {
    kind: BlockKind,
    start: usize,
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    flags: &'a [FlagDirective],
    next_flag: usize,
    open_blocks: Vec<OpenBlock>,
    state: &'a mut DiagramState,
}

const BLOCK_KEYWORDS: [(&str, BlockKind); 5] = [
    ("loop", BlockKind::Loop),
    ("opt", BlockKind::Opt),
    ("alt", BlockKind::Alt),
    ("par", BlockKind::Par),
    ("rect", BlockKind::Rect),
];

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<()> {
        self.skip_blank();
        let start = self.scanner.pos();
        if !self.scanner.eat_line_keyword("sequenceDiagram") {
            return Err(self.syntax(start, "expected `sequenceDiagram`"));
        }
        self.expect_statement_end()?;

        loop {
            self.skip_blank();
            if self.scanner.at_eof() {
                break;
            }
            let start = self.scanner.pos();
            tracing::trace!(
                line = self.scanner.line_col(start).0,
                statement = self.scanner.excerpt(start),
                "sequence statement"
            );
            self.statement(start)?;
            self.expect_statement_end()?;
        }

        if let Some(open) = self.open_blocks.last().copied() {
            return Err(self.syntax(
                open.start,
                format!("unclosed `{}` block; missing `end`", block_keyword(open.kind)),
            ));
        }
        Ok(())
    }

    fn skip_blank(&mut self) {
        self.scanner.skip_blank();
        let pos = self.scanner.pos();
        while let Some(flag) = self.flags.get(self.next_flag).filter(|f| f.offset <= pos) {
            self.state.set_wrap(flag.flag == DirectiveFlag::Wrap);
            self.next_flag += 1;
        }
    }

    fn statement(&mut self, start: usize) -> Result<()> {
        if self.scanner.eat_line_keyword("participant") {
            return self.participant(start, ActorType::Participant);
        }
        if self.scanner.eat_line_keyword("actor") {
            return self.participant(start, ActorType::Actor);
        }
        if self.scanner.eat_line_keyword("autonumber") {
            self.state.enable_autonumber();
            return Ok(());
        }
        if self.scanner.eat_line_keyword("title") {
            self.scanner.skip_ws();
            self.scanner.eat(b':');
            let title = self.scanner.read_to_line_end().trim();
            self.state.set_title(title);
            return Ok(());
        }
        if self.scanner.eat_line_keyword("accTitle") {
            self.scanner.skip_ws();
            if !self.scanner.eat(b':') {
                return Err(self.syntax(start, "expected `:` after `accTitle`"));
            }
            let title = self.scanner.read_to_line_end().trim();
            self.state.set_acc_title(title);
            return Ok(());
        }
        if self.scanner.eat_line_keyword("accDescr") {
            return self.acc_descr(start);
        }
        if self.scanner.eat_line_keyword("activate") {
            let actor = self.actor_to_line_end(start)?;
            self.state.activate(actor);
            return Ok(());
        }
        if self.scanner.eat_line_keyword("deactivate") {
            let actor = self.actor_to_line_end(start)?;
            return self.deactivate(actor, start);
        }
        if self.scanner.eat_line_keyword("note") {
            return self.note(start);
        }
        for (kw, kind) in BLOCK_KEYWORDS {
            if self.scanner.eat_line_keyword(kw) {
                let label = self.scanner.read_to_line_end();
                self.state
                    .add_block_marker(BlockMarker::start(kind), Some(label));
                self.open_blocks.push(OpenBlock { kind, start });
                return Ok(());
            }
        }
        if self.scanner.eat_line_keyword("else") {
            return self.section(start, BlockMarker::AltElse);
        }
        if self.scanner.eat_line_keyword("and") {
            return self.section(start, BlockMarker::ParAnd);
        }
        if self.scanner.eat_line_keyword("end") {
            let Some(open) = self.open_blocks.pop() else {
                return Err(self.syntax(start, "`end` without an open block"));
            };
            self.state.add_block_marker(BlockMarker::end(open.kind), None);
            return Ok(());
        }

        self.signal(start)
    }

    fn participant(&mut self, start: usize, actor_type: ActorType) -> Result<()> {
        static ALIAS_RE: OnceLock<Regex> = OnceLock::new();
        let alias_re = ALIAS_RE
            .get_or_init(|| Regex::new(r"(?i)^(.+?)\s+as\s+(.*)$").expect("valid regex"));

        self.scanner.skip_ws();
        let rest = self.scanner.read_to_line_end().trim();
        let (id, alias) = match alias_re.captures(rest) {
            Some(caps) => (
                caps.get(1).map_or(rest, |m| m.as_str().trim()),
                caps.get(2).map(|m| m.as_str().trim()),
            ),
            None => (rest, None),
        };
        if id.is_empty() {
            return Err(self.syntax(start, "expected a participant name"));
        }
        self.state.declare_actor(id, alias, actor_type);
        Ok(())
    }

    fn acc_descr(&mut self, start: usize) -> Result<()> {
        static INDENT_RE: OnceLock<Regex> = OnceLock::new();
        let indent_re = INDENT_RE.get_or_init(|| Regex::new(r"\n\s+").expect("valid regex"));

        self.scanner.skip_ws();
        if self.scanner.eat(b':') {
            let descr = self.scanner.read_to_line_end().trim();
            self.state.set_acc_descr(descr);
            return Ok(());
        }
        if self.scanner.eat(b'{') {
            let Some(body) = self.scanner.read_braced() else {
                return Err(self.syntax(start, "unterminated `accDescr {` block; missing `}`"));
            };
            let descr = indent_re.replace_all(body.trim(), "\n");
            self.state.set_acc_descr(descr);
            return Ok(());
        }
        Err(self.syntax(start, "expected `:` or `{` after `accDescr`"))
    }

    fn actor_to_line_end(&mut self, start: usize) -> Result<&'a str> {
        self.scanner.skip_ws();
        let actor = self.scanner.read_to_line_end().trim();
        if actor.is_empty() {
            return Err(self.syntax(start, "expected an actor name"));
        }
        Ok(actor)
    }

    fn deactivate(&mut self, actor: &str, start: usize) -> Result<()> {
        self.state.deactivate(actor).map_err(|source| {
            let (line, column) = self.scanner.line_col(start);
            Error::ActivationMismatch {
                source,
                line,
                column,
            }
        })
    }

    fn note(&mut self, start: usize) -> Result<()> {
        self.scanner.skip_ws();
        let Some(placement) = self.scanner.lex_placement() else {
            return Err(self.syntax(
                start,
                "expected `left of`, `right of` or `over` after `Note`",
            ));
        };
        self.scanner.skip_ws();
        let Some(from) = self.scanner.lex_actor() else {
            return Err(self.syntax(start, "expected an actor name in note"));
        };
        self.scanner.skip_ws();
        let to = if self.scanner.eat(b',') {
            self.scanner.skip_ws();
            let Some(to) = self.scanner.lex_actor() else {
                return Err(self.syntax(start, "expected a second actor name after `,`"));
            };
            self.scanner.skip_ws();
            Some(to)
        } else {
            None
        };
        if !self.scanner.eat(b':') {
            return Err(self.syntax(start, "missing `:` before note text"));
        }
        let text = self.scanner.read_to_line_end();
        self.state.add_note(placement, from, to, text);
        Ok(())
    }

    fn section(&mut self, start: usize, marker: BlockMarker) -> Result<()> {
        let expected = marker.kind();
        if self.open_blocks.last().map(|b| b.kind) != Some(expected) {
            let kw = if marker == BlockMarker::AltElse {
                "else"
            } else {
                "and"
            };
            return Err(self.syntax(
                start,
                format!("`{kw}` outside of an `{}` block", block_keyword(expected)),
            ));
        }
        let label = self.scanner.read_to_line_end();
        self.state.add_block_marker(marker, Some(label));
        Ok(())
    }

    fn signal(&mut self, start: usize) -> Result<()> {
        let Some(from) = self.scanner.lex_actor() else {
            return Err(self.unrecognized(start));
        };
        self.scanner.skip_ws();
        let Some(kind) = self.scanner.lex_arrow() else {
            return Err(self.unrecognized(start));
        };
        self.scanner.skip_ws();
        let activate = self.scanner.eat(b'+');
        let deactivate = !activate && self.scanner.eat(b'-');
        self.scanner.skip_ws();
        let Some(to) = self.scanner.lex_actor() else {
            return Err(self.syntax(start, "expected a target actor after the arrow"));
        };
        self.scanner.skip_ws();
        let text = if self.scanner.eat(b':') {
            self.scanner.read_to_line_end()
        } else {
            ""
        };

        self.state.add_message(from, to, kind, text);
        if activate {
            self.state.activate(to);
        }
        if deactivate {
            self.deactivate(from, start)?;
        }
        Ok(())
    }

    fn expect_statement_end(&mut self) -> Result<()> {
        if self.scanner.at_statement_end() {
            return Ok(());
        }
        let at = self.scanner.pos();
        Err(self.syntax(
            at,
            format!("unexpected `{}`", self.scanner.excerpt(at)),
        ))
    }

    fn unrecognized(&self, start: usize) -> Error {
        self.syntax(
            start,
            format!("unrecognized statement `{}`", self.scanner.excerpt(start)),
        )
    }

    fn syntax(&self, at: usize, message: impl Into<String>) -> Error {
        let (line, column) = self.scanner.line_col(at);
        Error::Syntax {
            line,
            column,
            message: message.into(),
        }
    }
}

fn block_keyword(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Loop => "loop",
        BlockKind::Opt => "opt",
        BlockKind::Alt => "alt",
        BlockKind::Par => "par",
        BlockKind::Rect => "rect",
    }
}
