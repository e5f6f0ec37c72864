use crate::bounds::BoundingBox;
use lifeline_core::diagrams::sequence::{ActorType, BlockKind, MessageKind, NotePlacement};
use lifeline_core::{LiveConfig, ParseMetadata};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMeta {
    pub diagram_type: String,
    pub title: Option<String>,
    pub config: LiveConfig,
}

impl LayoutMeta {
    pub fn from_parse_metadata(meta: &ParseMetadata) -> Self {
        Self {
            diagram_type: meta.diagram_type.clone(),
            title: meta.title.clone(),
            config: meta.config.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutActor {
    pub name: String,
    pub description: String,
    pub actor_type: ActorType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutActor {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMessage {
    pub kind: MessageKind,
    pub from: String,
    pub to: String,
    pub text: String,
    pub start_x: f64,
    pub stop_x: f64,
    /// Y of the arrow line.
    pub y: f64,
    pub self_message: bool,
    pub text_width: f64,
    pub text_height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNote {
    pub placement: NotePlacement,
    pub from: String,
    pub to: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutActivation {
    pub actor: String,
    pub start_x: f64,
    pub start_y: f64,
    pub stop_x: f64,
    pub stop_y: f64,
    /// Zero for the outermost activation of the actor.
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSection {
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutBlock {
    pub kind: BlockKind,
    pub label: String,
    pub sections: Vec<LayoutSection>,
    /// Margin-expanded extent returned when the block was closed.
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceDiagramLayout {
    pub actors: Vec<LayoutActor>,
    /// Bottom row, present when `mirrorActors` is on.
    pub mirrored_actors: Vec<LayoutActor>,
    pub messages: Vec<LayoutMessage>,
    pub notes: Vec<LayoutNote>,
    pub activations: Vec<LayoutActivation>,
    /// In closing order, so nested blocks come before their parents.
    pub blocks: Vec<LayoutBlock>,
    pub title: Option<String>,
    pub bounds: BoundingBox,
    /// Viewport size including diagram margins.
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutedDiagram {
    pub meta: LayoutMeta,
    pub layout: SequenceDiagramLayout,
}
