use crate::config::FontSpec;

/// Rendered size of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
}

/// Measures label text the way the canvas would render it.
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, text: &str, font: &FontSpec) -> TextExtent;
}

/// Measures text with a fixed advance per character, one line per `\n`.
///
/// Deterministic, so layouts computed with it are stable across runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedMetricMeasurer {
    /// Horizontal advance of one character as a fraction of the font size.
    pub char_width: f64,
}

impl Default for FixedMetricMeasurer {
    fn default() -> Self {
        Self { char_width: 0.6 }
    }
}

impl TextMeasurer for FixedMetricMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> TextExtent {
        if text.is_empty() {
            return TextExtent::default();
        }
        let (line_count, widest) = text
            .lines()
            .fold((0usize, 0usize), |(count, widest), line| {
                (count + 1, widest.max(line.chars().count()))
            });
        TextExtent {
            width: widest as f64 * font.size * self.char_width,
            height: line_count.max(1) as f64 * font.size * font.line_height,
        }
    }
}
