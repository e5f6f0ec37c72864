#![forbid(unsafe_code)]

//! Headless sequence diagram layout: geometry only, no drawing.

pub mod bounds;
pub mod model;
pub mod sequence;
pub mod text;

use crate::model::{LayoutMeta, LayoutedDiagram};
use crate::text::{DeterministicTextMeasurer, TextMeasurer};
use lifeline_core::ParsedDiagram;
use std::sync::Arc;

pub use sequence::layout_sequence_diagram;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported diagram type for layout: {diagram_type}")]
    UnsupportedDiagram { diagram_type: String },
    #[error("invalid semantic model: {message}")]
    InvalidModel { message: String },
    #[error("unbalanced block scope: {message}")]
    UnbalancedScope { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct LayoutOptions {
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        }
    }
}

pub fn layout_parsed(parsed: &ParsedDiagram, options: &LayoutOptions) -> Result<LayoutedDiagram> {
    let meta = LayoutMeta::from_parse_metadata(&parsed.meta);
    if meta.diagram_type != "sequence" {
        return Err(Error::UnsupportedDiagram {
            diagram_type: meta.diagram_type,
        });
    }

    let layout = layout_sequence_diagram(
        &parsed.state,
        &meta.config,
        options.text_measurer.as_ref(),
    )?;
    Ok(LayoutedDiagram { meta, layout })
}
