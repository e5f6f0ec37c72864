use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPlacement {
    #[default]
    Tspan,
    Fo,
    Old,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontWeight {
    Number(u32),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogLevel {
    Level(u8),
    Name(String),
}

/// Layout knobs of the sequence renderer. Keys mirror the camelCase names used in directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SequenceConfig {
    pub diagram_margin_x: f64,
    pub diagram_margin_y: f64,
    pub actor_margin: f64,
    pub width: f64,
    pub height: f64,
    pub box_margin: f64,
    pub box_text_margin: f64,
    pub note_margin: f64,
    pub message_margin: f64,
    pub mirror_actors: bool,
    pub bottom_margin_adj: f64,
    pub activation_width: f64,
    pub wrap_padding: f64,
    pub wrap: bool,
    pub message_font_size: f64,
    pub note_font_size: f64,
    pub actor_font_size: f64,
    pub text_placement: TextPlacement,
    /// Keys we do not interpret; kept so callers can round-trip them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            diagram_margin_x: 50.0,
            diagram_margin_y: 10.0,
            actor_margin: 50.0,
            width: 150.0,
            height: 65.0,
            box_margin: 10.0,
            box_text_margin: 5.0,
            note_margin: 10.0,
            message_margin: 35.0,
            mirror_actors: true,
            bottom_margin_adj: 1.0,
            activation_width: 10.0,
            wrap_padding: 10.0,
            wrap: false,
            message_font_size: 16.0,
            note_font_size: 16.0,
            actor_font_size: 14.0,
            text_placement: TextPlacement::Tspan,
            extra: Map::new(),
        }
    }
}

impl SequenceConfig {
    /// Overwrites one recognized key. Returns `Ok(false)` when `key` is not a sequence key.
    pub fn set_key(&mut self, key: &str, value: &Value) -> Result<bool> {
        match key {
            "diagramMarginX" => self.diagram_margin_x = from_key(key, value)?,
            "diagramMarginY" => self.diagram_margin_y = from_key(key, value)?,
            "actorMargin" => self.actor_margin = from_key(key, value)?,
            "width" => self.width = from_key(key, value)?,
            "height" => self.height = from_key(key, value)?,
            "boxMargin" => self.box_margin = from_key(key, value)?,
            "boxTextMargin" => self.box_text_margin = from_key(key, value)?,
            "noteMargin" => self.note_margin = from_key(key, value)?,
            "messageMargin" => self.message_margin = from_key(key, value)?,
            "mirrorActors" => self.mirror_actors = from_key(key, value)?,
            "bottomMarginAdj" => self.bottom_margin_adj = from_key(key, value)?,
            "activationWidth" => self.activation_width = from_key(key, value)?,
            "wrapPadding" => self.wrap_padding = from_key(key, value)?,
            "wrap" => self.wrap = from_key(key, value)?,
            "messageFontSize" => self.message_font_size = from_key(key, value)?,
            "noteFontSize" => self.note_font_size = from_key(key, value)?,
            "actorFontSize" => self.actor_font_size = from_key(key, value)?,
            "textPlacement" => self.text_placement = from_key(key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// The configuration a diagram is laid out with: site defaults, then front-matter, then
/// directives in source order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    pub wrap: bool,
    pub sequence: SequenceConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LiveConfig {
    /// `init` / `initialize` semantics: a nested `sequence` object replaces the whole section.
    pub fn apply_init(&mut self, fragment: &Map<String, Value>) -> Result<()> {
        for (key, value) in fragment {
            if key == "sequence" {
                self.sequence = from_key(key, value)?;
                continue;
            }
            self.apply_key(key, value)?;
        }
        Ok(())
    }

    /// `config` semantics: a nested `sequence` object is merged into the section key by key.
    pub fn apply_config(&mut self, fragment: &Map<String, Value>) -> Result<()> {
        for (key, value) in fragment {
            if key == "sequence" {
                let Value::Object(section) = value else {
                    return Err(Error::config("`sequence` must be an object"));
                };
                for (k, v) in section {
                    if !self.sequence.set_key(k, v)? {
                        self.sequence.extra.insert(k.clone(), v.clone());
                    }
                }
                continue;
            }
            self.apply_key(key, value)?;
        }
        Ok(())
    }

    pub fn wrap_enabled(&self) -> bool {
        self.wrap || self.sequence.wrap
    }

    fn apply_key(&mut self, key: &str, value: &Value) -> Result<()> {
        match key {
            "theme" => self.theme = from_key(key, value)?,
            "logLevel" => self.log_level = from_key(key, value)?,
            "fontFamily" => self.font_family = from_key(key, value)?,
            "fontSize" => self.font_size = from_key(key, value)?,
            "fontWeight" => self.font_weight = from_key(key, value)?,
            "wrap" => self.wrap = from_key(key, value)?,
            _ => {
                if !self.sequence.set_key(key, value)? {
                    tracing::debug!(key, "passing through unrecognized config key");
                    self.extra.insert(key.to_string(), value.clone());
                }
            }
        }
        Ok(())
    }
}

fn from_key<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T> {
    T::deserialize(value)
        .map_err(|e| Error::config(format!("invalid value for `{key}`: {e}")))
}
