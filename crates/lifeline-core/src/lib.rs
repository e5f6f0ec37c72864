#![forbid(unsafe_code)]

//! Sequence diagram parser + event model (headless).
//!
//! Design goals:
//! - deterministic outputs: the same text always yields the same event list
//! - caller-owned state, no globals; one [`Engine`] can serve many threads
//! - runtime-agnostic async APIs (no specific executor required)

pub mod config;
pub mod diagrams;
pub mod error;
pub mod preprocess;

pub use config::{LiveConfig, SequenceConfig};
pub use diagrams::sequence::{DiagramState, Event, parse_sequence};
pub use error::{Error, Result};
pub use preprocess::{PreprocessResult, preprocess_diagram};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseMetadata {
    pub diagram_type: String,
    /// The effective config after site defaults, front-matter and directives.
    pub config: LiveConfig,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDiagram {
    pub meta: ParseMetadata,
    pub state: DiagramState,
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    site_config: LiveConfig,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base configuration every parse starts from, before front-matter and directives.
    pub fn with_site_config(mut self, site_config: LiveConfig) -> Self {
        self.site_config = site_config;
        self
    }

    pub fn site_config(&self) -> &LiveConfig {
        &self.site_config
    }

    /// Resets `state` and parses `text` into it.
    ///
    /// `state` is cleared first, so it never holds a previous diagram once this returns.
    /// Directive errors are reported before any statement is parsed. Syntax and activation
    /// errors leave the statements parsed so far in `state`; callers should `clear` it (or
    /// parse again) before reading it as a complete diagram.
    pub fn parse_into(&self, state: &mut DiagramState, text: &str) -> Result<ParseMetadata> {
        state.clear();
        let pre = preprocess_diagram(text)?;

        let mut config = self.site_config.clone();
        pre.apply_fragments(&mut config)?;

        *state.config_mut() = config;
        if let Some(title) = pre.title.as_deref().filter(|t| !t.is_empty()) {
            state.set_title(title);
        }

        parse_sequence(&pre.code, &pre.flags, state)?;

        Ok(ParseMetadata {
            diagram_type: "sequence".to_string(),
            config: state.config().clone(),
            title: state.title().map(str::to_string),
        })
    }

    /// Synchronous variant of [`Engine::parse_diagram`].
    pub fn parse_diagram_sync(&self, text: &str) -> Result<ParsedDiagram> {
        let mut state = DiagramState::new();
        let meta = self.parse_into(&mut state, text)?;
        Ok(ParsedDiagram { meta, state })
    }

    pub async fn parse_diagram(&self, text: &str) -> Result<ParsedDiagram> {
        self.parse_diagram_sync(text)
    }
}

#[cfg(test)]
mod tests;
