use crate::foundation::core::AspectRatio;

/// Fraction of frame width captions may occupy.
pub const CAPTION_MAX_WIDTH_FRACTION: f32 = 0.85;

/// Caption line advance as a multiple of the font size.
pub const CAPTION_LINE_HEIGHT_FACTOR: f32 = 1.3;

/// Vertical center of the caption block as a fraction of frame height.
pub const CAPTION_BAND_CENTER: f32 = 0.80;

/// Text measurement seam used by the word-wrapper.
///
/// Production rendering measures through the shaping engine; tests supply a
/// fixed-advance implementation so wrap logic runs without fonts.
pub trait MeasureText {
    /// Width in pixels of `text` laid out on a single line at
    /// `font_size_px`.
    fn measure(&mut self, text: &str, font_size_px: f32) -> f32;
}

/// Caption font size for a frame of the given orientation and width.
///
/// Portrait frames are narrow, so captions take a larger share of the
/// width.
pub fn caption_font_px(aspect: AspectRatio, frame_width: u32) -> f32 {
    let w = frame_width as f32;
    match aspect {
        AspectRatio::Portrait => w * 0.08,
        AspectRatio::Landscape => w * 0.04,
    }
}

/// Maximum caption line width for a frame of the given width.
pub fn caption_max_width_px(frame_width: u32) -> f32 {
    frame_width as f32 * CAPTION_MAX_WIDTH_FRACTION
}

/// Greedy word-wrap of `text` into lines no wider than `max_width_px`.
///
/// Words are taken in order; a word joins the current line when the joined
/// measurement still fits, otherwise it starts a new line. A single token
/// wider than the limit still occupies exactly one line — the wrapper never
/// splits inside a word and never fails.
pub fn wrap_caption(
    text: &str,
    font_size_px: f32,
    max_width_px: f32,
    measure: &mut dyn MeasureText,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure.measure(&candidate, font_size_px) <= max_width_px {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
#[path = "../../tests/unit/render/caption.rs"]
mod tests;
