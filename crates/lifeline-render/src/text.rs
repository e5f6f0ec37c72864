use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
    pub font_weight: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 16.0,
            font_weight: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

/// Text measurement service consumed by the layout. Implementations must be pure: the same input
/// always yields the same metrics.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;

    /// Greedy word wrapping on top of [`TextMeasurer::measure`]. Explicit `<br>` breaks are kept;
    /// a single word wider than `max_width` gets a line of its own.
    fn measure_wrapped(&self, text: &str, style: &TextStyle, max_width: f64) -> TextMetrics {
        let lines = wrap_text_lines(self, text, style, max_width);
        let mut width: f64 = 0.0;
        let mut height = 0.0;
        for line in &lines {
            let m = self.measure(line, style);
            width = width.max(m.width);
            height += m.height;
        }
        TextMetrics {
            width,
            height,
            line_count: lines.len(),
        }
    }
}

/// Character-cell approximation: every display column is `char_width_factor` of the font size wide.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl DeterministicTextMeasurer {
    pub fn normalized_text_lines(text: &str) -> Vec<&str> {
        split_html_br_lines(text)
            .into_iter()
            .flat_map(|l| l.split('\n'))
            .collect()
    }
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let char_width_factor = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let line_height_factor = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };

        let lines = Self::normalized_text_lines(text);
        let font_size = style.font_size.max(1.0);
        let max_cols = lines.iter().map(|l| l.width()).max().unwrap_or(0);

        TextMetrics {
            width: max_cols as f64 * font_size * char_width_factor,
            height: lines.len() as f64 * font_size * line_height_factor,
            line_count: lines.len(),
        }
    }
}

/// Splits on `<br>`, `<br/>`, `<br />` and any other whitespace before the slash.
pub fn split_html_br_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut line_start = 0;
    let mut i = 0;

    while i + 3 <= bytes.len() {
        if bytes[i] != b'<' || !bytes[i + 1..i + 3].eq_ignore_ascii_case(b"br") {
            i += 1;
            continue;
        }
        let mut j = i + 3;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'/' {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'>' {
            out.push(&text[line_start..i]);
            line_start = j + 1;
            i = j + 1;
        } else {
            i += 1;
        }
    }
    out.push(&text[line_start..]);
    out
}

pub fn wrap_text_lines<M: TextMeasurer + ?Sized>(
    measurer: &M,
    text: &str,
    style: &TextStyle,
    max_width: f64,
) -> Vec<String> {
    let mut out = Vec::new();
    for raw in split_html_br_lines(text) {
        let mut current = String::new();
        for word in raw.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measurer.measure(&candidate, style).width <= max_width {
                current = candidate;
            } else {
                out.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        out.push(current);
    }
    out
}
