//! Sequence diagrams: statement scanner, parser and the diagram state it drives.

mod lexer;
mod model;
mod parse;

pub use model::{
    ActivationEdge, Actor, ActorType, BlockKind, BlockMarker, DiagramState, Event,
    InactiveParticipant, LineType, Message, MessageKind, Note, NotePlacement,
};
pub use parse::parse_sequence;
