use crate::config::LiveConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    #[default]
    Participant,
    Actor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub name: String,
    pub description: String,
    pub actor_type: ActorType,
    pub wrap: bool,
    pub activation_depth: u32,
}

/// Arrow kinds, one per arrow token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// `->`
    Solid,
    /// `-->`
    Dotted,
    /// `->>`
    SolidOpen,
    /// `-->>`
    DottedOpen,
    /// `-x`
    SolidCross,
    /// `--x`
    DottedCross,
}

impl MessageKind {
    /// Arrow tokens ordered longest first, so a prefix scan picks the greedy match.
    pub const ARROWS: [(&'static str, MessageKind); 6] = [
        ("-->>", MessageKind::DottedOpen),
        ("->>", MessageKind::SolidOpen),
        ("-->", MessageKind::Dotted),
        ("--x", MessageKind::DottedCross),
        ("->", MessageKind::Solid),
        ("-x", MessageKind::SolidCross),
    ];

    pub fn from_arrow(token: &str) -> Option<Self> {
        Self::ARROWS
            .iter()
            .find(|(arrow, _)| *arrow == token)
            .map(|(_, kind)| *kind)
    }

    pub fn arrow(self) -> &'static str {
        Self::ARROWS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(arrow, _)| *arrow)
            .unwrap_or("->")
    }

    pub fn is_dotted(self) -> bool {
        matches!(self, Self::Dotted | Self::DottedOpen | Self::DottedCross)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotePlacement {
    LeftOf,
    RightOf,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivationEdge {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Loop,
    Opt,
    Alt,
    Par,
    Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockMarker {
    LoopStart,
    LoopEnd,
    OptStart,
    OptEnd,
    AltStart,
    AltElse,
    AltEnd,
    ParStart,
    ParAnd,
    ParEnd,
    RectStart,
    RectEnd,
}

impl BlockMarker {
    pub fn start(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Loop => Self::LoopStart,
            BlockKind::Opt => Self::OptStart,
            BlockKind::Alt => Self::AltStart,
            BlockKind::Par => Self::ParStart,
            BlockKind::Rect => Self::RectStart,
        }
    }

    pub fn end(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Loop => Self::LoopEnd,
            BlockKind::Opt => Self::OptEnd,
            BlockKind::Alt => Self::AltEnd,
            BlockKind::Par => Self::ParEnd,
            BlockKind::Rect => Self::RectEnd,
        }
    }

    pub fn kind(self) -> BlockKind {
        match self {
            Self::LoopStart | Self::LoopEnd => BlockKind::Loop,
            Self::OptStart | Self::OptEnd => BlockKind::Opt,
            Self::AltStart | Self::AltElse | Self::AltEnd => BlockKind::Alt,
            Self::ParStart | Self::ParAnd | Self::ParEnd => BlockKind::Par,
            Self::RectStart | Self::RectEnd => BlockKind::Rect,
        }
    }

    pub fn is_start(self) -> bool {
        matches!(
            self,
            Self::LoopStart | Self::OptStart | Self::AltStart | Self::ParStart | Self::RectStart
        )
    }

    pub fn is_end(self) -> bool {
        matches!(
            self,
            Self::LoopEnd | Self::OptEnd | Self::AltEnd | Self::ParEnd | Self::RectEnd
        )
    }

    /// `else` / `and` continuations.
    pub fn is_section(self) -> bool {
        matches!(self, Self::AltElse | Self::ParAnd)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub kind: MessageKind,
    pub from: String,
    pub to: String,
    pub text: String,
    pub wrap: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub placement: NotePlacement,
    pub from: String,
    pub to: String,
    pub text: String,
    pub wrap: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    Message(Message),
    Note(Note),
    Activation {
        edge: ActivationEdge,
        actor: String,
    },
    Block {
        marker: BlockMarker,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
}

/// Flat event classification used by renderers that switch on a single discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineType {
    Solid,
    Dotted,
    SolidOpen,
    DottedOpen,
    SolidCross,
    DottedCross,
    ActiveStart,
    ActiveEnd,
    Note,
    LoopStart,
    LoopEnd,
    OptStart,
    OptEnd,
    AltStart,
    AltElse,
    AltEnd,
    ParStart,
    ParAnd,
    ParEnd,
    RectStart,
    RectEnd,
}

impl From<MessageKind> for LineType {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Solid => Self::Solid,
            MessageKind::Dotted => Self::Dotted,
            MessageKind::SolidOpen => Self::SolidOpen,
            MessageKind::DottedOpen => Self::DottedOpen,
            MessageKind::SolidCross => Self::SolidCross,
            MessageKind::DottedCross => Self::DottedCross,
        }
    }
}

impl From<BlockMarker> for LineType {
    fn from(marker: BlockMarker) -> Self {
        match marker {
            BlockMarker::LoopStart => Self::LoopStart,
            BlockMarker::LoopEnd => Self::LoopEnd,
            BlockMarker::OptStart => Self::OptStart,
            BlockMarker::OptEnd => Self::OptEnd,
            BlockMarker::AltStart => Self::AltStart,
            BlockMarker::AltElse => Self::AltElse,
            BlockMarker::AltEnd => Self::AltEnd,
            BlockMarker::ParStart => Self::ParStart,
            BlockMarker::ParAnd => Self::ParAnd,
            BlockMarker::ParEnd => Self::ParEnd,
            BlockMarker::RectStart => Self::RectStart,
            BlockMarker::RectEnd => Self::RectEnd,
        }
    }
}

impl Event {
    pub fn line_type(&self) -> LineType {
        match self {
            Self::Message(m) => m.kind.into(),
            Self::Note(_) => LineType::Note,
            Self::Activation {
                edge: ActivationEdge::Start,
                ..
            } => LineType::ActiveStart,
            Self::Activation {
                edge: ActivationEdge::End,
                ..
            } => LineType::ActiveEnd,
            Self::Block { marker, .. } => (*marker).into(),
        }
    }

    pub fn from(&self) -> Option<&str> {
        match self {
            Self::Message(m) => Some(&m.from),
            Self::Note(n) => Some(&n.from),
            Self::Activation { actor, .. } => Some(actor),
            Self::Block { .. } => None,
        }
    }

    pub fn to(&self) -> Option<&str> {
        match self {
            Self::Message(m) => Some(&m.to),
            Self::Note(n) => Some(&n.to),
            Self::Activation { actor, .. } => Some(actor),
            Self::Block { .. } => None,
        }
    }

    /// Message or note text, or a block label.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Message(m) => Some(&m.text),
            Self::Note(n) => Some(&n.text),
            Self::Activation { .. } => None,
            Self::Block { label, .. } => label.as_deref(),
        }
    }

    pub fn activation_actor(&self) -> Option<&str> {
        match self {
            Self::Activation { actor, .. } => Some(actor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Trying to inactivate an inactive participant ({actor})")]
pub struct InactiveParticipant {
    pub actor: String,
}

#[derive(Debug, Clone)]
struct ParsedText {
    text: String,
    wrap: Option<bool>,
}

/// Caller-owned diagram state. The parser drives it statement by statement; `clear` resets it
/// before an unrelated input is parsed into the same instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramState {
    actors: IndexMap<String, Actor>,
    events: Vec<Event>,
    title: Option<String>,
    acc_title: Option<String>,
    acc_descr: Option<String>,
    autonumber: bool,
    message_count: u32,
    #[serde(skip)]
    config: LiveConfig,
}

impl DiagramState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LiveConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Registers `id` on first sight. A later call with an alias refreshes the description.
    pub fn add_actor(&mut self, id: &str, alias: Option<&str>) {
        self.upsert_actor(id, alias, None);
    }

    /// `participant` / `actor` declarations. The keyword sets the actor type even when the actor
    /// was already referenced.
    pub fn declare_actor(&mut self, id: &str, alias: Option<&str>, actor_type: ActorType) {
        self.upsert_actor(id, alias, Some(actor_type));
    }

    fn upsert_actor(&mut self, id: &str, alias: Option<&str>, actor_type: Option<ActorType>) {
        let parsed = alias.map(|a| self.parse_message(a));
        let default_wrap = self.config.wrap_enabled();

        if let Some(actor) = self.actors.get_mut(id) {
            if let Some(parsed) = parsed {
                actor.description = parsed.text;
                actor.wrap = parsed.wrap.unwrap_or(default_wrap);
            }
            if let Some(actor_type) = actor_type {
                actor.actor_type = actor_type;
            }
            return;
        }

        let (description, wrap) = match parsed {
            Some(p) => (p.text, p.wrap.unwrap_or(default_wrap)),
            None => (id.to_string(), default_wrap),
        };
        self.actors.insert(
            id.to_string(),
            Actor {
                name: id.to_string(),
                description,
                actor_type: actor_type.unwrap_or_default(),
                wrap,
                activation_depth: 0,
            },
        );
    }

    pub fn add_message(&mut self, from: &str, to: &str, kind: MessageKind, text: &str) {
        self.add_actor(from, None);
        self.add_actor(to, None);
        let parsed = self.parse_message(text);
        let wrap = parsed.wrap.unwrap_or(self.config.wrap_enabled());
        self.message_count += 1;
        let sequence_number = self.autonumber.then_some(self.message_count);
        self.events.push(Event::Message(Message {
            kind,
            from: from.to_string(),
            to: to.to_string(),
            text: parsed.text,
            wrap,
            sequence_number,
        }));
    }

    pub fn activate(&mut self, id: &str) {
        self.add_actor(id, None);
        if let Some(actor) = self.actors.get_mut(id) {
            actor.activation_depth += 1;
        }
        self.events.push(Event::Activation {
            edge: ActivationEdge::Start,
            actor: id.to_string(),
        });
    }

    /// Fails without touching the state when `id` has no open activation.
    pub fn deactivate(&mut self, id: &str) -> Result<(), InactiveParticipant> {
        let Some(actor) = self.actors.get_mut(id).filter(|a| a.activation_depth > 0) else {
            return Err(InactiveParticipant {
                actor: id.to_string(),
            });
        };
        actor.activation_depth -= 1;
        self.events.push(Event::Activation {
            edge: ActivationEdge::End,
            actor: id.to_string(),
        });
        Ok(())
    }

    /// `to` is only given for the two-actor `over A,B` form; source order is kept as is.
    pub fn add_note(&mut self, placement: NotePlacement, from: &str, to: Option<&str>, text: &str) {
        let to = to.unwrap_or(from);
        self.add_actor(from, None);
        self.add_actor(to, None);
        let parsed = self.parse_message(text);
        let wrap = parsed.wrap.unwrap_or(self.config.wrap_enabled());
        self.events.push(Event::Note(Note {
            placement,
            from: from.to_string(),
            to: to.to_string(),
            text: parsed.text,
            wrap,
        }));
    }

    /// End markers never carry a label.
    pub fn add_block_marker(&mut self, marker: BlockMarker, label: Option<&str>) {
        let label = if marker.is_end() {
            None
        } else {
            Some(label.unwrap_or_default().trim().to_string())
        };
        self.events.push(Event::Block { marker, label });
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn set_acc_title(&mut self, title: impl Into<String>) {
        self.acc_title = Some(title.into());
    }

    pub fn set_acc_descr(&mut self, descr: impl Into<String>) {
        self.acc_descr = Some(descr.into());
    }

    /// Numbers every message, including those added before this call.
    pub fn enable_autonumber(&mut self) {
        if self.autonumber {
            return;
        }
        self.autonumber = true;
        let mut n = 0;
        for event in &mut self.events {
            if let Event::Message(m) = event {
                n += 1;
                m.sequence_number = Some(n);
            }
        }
    }

    pub fn show_sequence_numbers(&self) -> bool {
        self.autonumber
    }

    pub fn actors(&self) -> &IndexMap<String, Actor> {
        &self.actors
    }

    pub fn actor(&self, id: &str) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.events.iter().filter_map(|e| match e {
            Event::Message(m) => Some(m),
            _ => None,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn acc_title(&self) -> Option<&str> {
        self.acc_title.as_deref()
    }

    pub fn acc_descr(&self) -> Option<&str> {
        self.acc_descr.as_deref()
    }

    /// Zero for unknown actors.
    pub fn activation_depth(&self, id: &str) -> u32 {
        self.actors.get(id).map_or(0, |a| a.activation_depth)
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LiveConfig {
        &mut self.config
    }

    /// Positional `wrap` / `nowrap` switch; affects statements parsed after it.
    pub fn set_wrap(&mut self, wrap: bool) {
        self.config.wrap = wrap;
        self.config.sequence.wrap = wrap;
    }

    fn parse_message(&self, raw: &str) -> ParsedText {
        fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
            let head = s.get(..prefix.len())?;
            head.eq_ignore_ascii_case(prefix)
                .then(|| &s[prefix.len()..])
        }

        let trimmed = raw.trim();
        let (wrap, cleaned) = if let Some(rest) = strip_prefix_ci(trimmed, ":wrap:") {
            (Some(true), rest)
        } else if let Some(rest) = strip_prefix_ci(trimmed, "wrap:") {
            (Some(true), rest)
        } else if let Some(rest) = strip_prefix_ci(trimmed, ":nowrap:") {
            (Some(false), rest)
        } else if let Some(rest) = strip_prefix_ci(trimmed, "nowrap:") {
            (Some(false), rest)
        } else {
            (None, trimmed)
        };

        ParsedText {
            text: cleaned.trim().to_string(),
            wrap,
        }
    }
}
