//! Text measurement collaborator

/// Measures rendered text. Font shaping lives outside the core; this is the
/// only question the layout side needs answered.
pub trait TextMetrics: Send {
    /// Advance width of `text` at `size` px, in pixels.
    fn text_width(&self, text: &str, size: f32) -> f32;
}

/// Fixed-advance measurement used when no shaper is attached.
#[derive(Clone, Copy, Debug)]
pub struct MonospaceMetrics {
    /// Glyph advance as a fraction of the font size.
    pub advance: f32,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMetrics for MonospaceMetrics {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size.max(0.0) * self.advance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monospace_counts_chars_not_bytes() {
        let m = MonospaceMetrics { advance: 0.5 };
        assert_eq!(m.text_width("abcd", 10.0), 20.0);
        assert_eq!(m.text_width("éé", 10.0), 10.0);
        assert_eq!(m.text_width("", 10.0), 0.0);
    }
}
