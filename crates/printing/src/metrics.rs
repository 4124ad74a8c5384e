use serde::{Deserialize, Serialize};

/// Three-tier font size used by text commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Normal,
    Large,
}

impl FontSize {
    /// Fixed point size for the tier.
    pub const fn points(self) -> f32 {
        match self {
            FontSize::Small => 14.0,
            FontSize::Normal => 20.0,
            FontSize::Large => 28.0,
        }
    }
}

/// Character metrics used for wrapping and row heights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextMetrics {
    pub font_family: String,
    /// Advance of a basic (ASCII) glyph relative to the font size.
    pub char_proportion: f32,
    /// Row height relative to the font size.
    pub line_height_proportion: f32,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            font_family: "SimHei".to_string(),
            char_proportion: 0.7352,
            line_height_proportion: 1.6,
        }
    }
}

impl TextMetrics {
    /// Advance of `ch` at `font_size`; anything outside ASCII is double width.
    pub fn char_width(&self, ch: char, font_size: f32) -> f32 {
        let basic = self.char_proportion * font_size;
        if (ch as u32) < 128 {
            basic
        } else {
            basic * 2.0
        }
    }

    /// Estimated advance of a whole line of text.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }

    pub fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_height_proportion
    }

    /// Row height of the default font, used to reset the pending line offset.
    pub fn baseline(&self) -> f32 {
        self.line_height(FontSize::Normal.points())
    }

    /// Clamps nonsensical values coming from configuration files.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !(self.char_proportion.is_finite() && self.char_proportion > 0.0) {
            self.char_proportion = defaults.char_proportion;
        }
        if !(self.line_height_proportion.is_finite() && self.line_height_proportion > 0.0) {
            self.line_height_proportion = defaults.line_height_proportion;
        }
        if self.font_family.trim().is_empty() {
            self.font_family = defaults.font_family;
        }
    }
}
