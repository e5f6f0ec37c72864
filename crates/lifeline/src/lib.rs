#![forbid(unsafe_code)]

//! `lifeline` is a headless sequence diagram parser and layout engine.
//!
//! Parsing lives in `lifeline-core` and is always available. Geometry comes from
//! `lifeline-render` behind a feature flag; nothing here draws.
//!
//! # Features
//!
//! - `render`: enable the bounds engine and sequence layout (`lifeline::render`)

pub use lifeline_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use lifeline_render::bounds::{BoundingBox, Bounds};
    pub use lifeline_render::model::{LayoutedDiagram, SequenceDiagramLayout};
    pub use lifeline_render::text::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};
    pub use lifeline_render::{LayoutOptions, layout_parsed, layout_sequence_diagram};

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Parse(#[from] lifeline_core::Error),
        #[error(transparent)]
        Layout(#[from] lifeline_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Synchronous layout helper (executor-free).
    pub fn layout_diagram_sync(
        engine: &lifeline_core::Engine,
        text: &str,
        layout_options: &LayoutOptions,
    ) -> Result<LayoutedDiagram> {
        let parsed = engine.parse_diagram_sync(text)?;
        Ok(lifeline_render::layout_parsed(&parsed, layout_options)?)
    }

    pub async fn layout_diagram(
        engine: &lifeline_core::Engine,
        text: &str,
        layout_options: &LayoutOptions,
    ) -> Result<LayoutedDiagram> {
        layout_diagram_sync(engine, text, layout_options)
    }

    /// Bundles an [`Engine`](lifeline_core::Engine) with layout options so UI integrations can
    /// pass a single value around. All work is CPU-bound and does no I/O.
    #[derive(Clone, Default)]
    pub struct HeadlessRenderer {
        pub engine: lifeline_core::Engine,
        pub layout: LayoutOptions,
    }

    impl HeadlessRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_site_config(mut self, site_config: lifeline_core::LiveConfig) -> Self {
            self.engine = self.engine.with_site_config(site_config);
            self
        }

        pub fn with_text_measurer(
            mut self,
            measurer: std::sync::Arc<dyn TextMeasurer + Send + Sync>,
        ) -> Self {
            self.layout.text_measurer = measurer;
            self
        }

        pub fn parse_diagram_sync(&self, text: &str) -> Result<lifeline_core::ParsedDiagram> {
            Ok(self.engine.parse_diagram_sync(text)?)
        }

        pub fn layout_diagram_sync(&self, text: &str) -> Result<LayoutedDiagram> {
            layout_diagram_sync(&self.engine, text, &self.layout)
        }
    }
}
