use crate::metrics::TextMetrics;

/// Text with explicit line breaks inserted, plus the number of rows it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedText {
    pub text: String,
    pub rows: u32,
}

impl WrappedText {
    /// Height claimed by the wrapped text at `font_size`.
    pub fn height(&self, font_size: f32, metrics: &TextMetrics) -> f32 {
        self.rows as f32 * metrics.line_height(font_size)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

/// Greedily breaks `content` into rows no wider than `budget` pixels.
///
/// Embedded line breaks are discarded first. Characters are accumulated left
/// to right; once the running width passes the budget a break goes in before
/// the current character, which then opens the next row. A character is never
/// split, and a character wider than the budget sits alone on its row instead
/// of leaving an empty one behind.
pub fn wrap_text(content: &str, font_size: f32, budget: f32, metrics: &TextMetrics) -> WrappedText {
    let mut text = String::with_capacity(content.len());
    let mut rows = 1u32;
    let mut row_width = 0.0f32;
    let mut row_is_empty = true;

    for ch in content.chars().filter(|ch| !matches!(ch, '\r' | '\n')) {
        let width = metrics.char_width(ch, font_size);
        row_width += width;
        if row_width > budget && !row_is_empty {
            text.push('\n');
            row_width = width;
            rows += 1;
        }
        text.push(ch);
        row_is_empty = false;
    }

    WrappedText { text, rows }
}
