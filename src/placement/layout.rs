//! Word wrapping inside a target rectangle.

use serde::{Deserialize, Serialize};

use crate::model::Rect;

use super::metrics::{self, ASCENT, DESCENT, LINE_HEIGHT};

/// A single wrapped line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// Left edge
    pub x: f32,
    /// Baseline (top-left origin)
    pub baseline: f32,
    /// Advance width of the text
    pub width: f32,
}

/// Text laid out in a rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutText {
    pub lines: Vec<TextLine>,
    /// Area the text actually occupies
    pub bbox: Rect,
    pub font_size: f32,
    /// Whether lines were dropped for lack of vertical space
    pub truncated: bool,
}

/// Wrap `text` at word boundaries to fit `target`.
///
/// Words wider than the target are broken between characters. Lines that
/// would extend below the target are dropped and the result is marked
/// truncated. Returns `None` when the text is empty or not even one line
/// fits.
pub fn layout_text(text: &str, target: &Rect, font_size: f32) -> Option<LaidOutText> {
    if target.is_degenerate() || !(font_size > 0.0) {
        return None;
    }
    let rows = wrap(text, target.width(), font_size)?;

    let line_height = font_size * LINE_HEIGHT;
    let mut lines = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let baseline = target.y0 + font_size * ASCENT + i as f32 * line_height;
        if baseline + font_size * DESCENT > target.y1 {
            break;
        }
        lines.push(TextLine {
            width: metrics::text_width(row, font_size),
            text: row.clone(),
            x: target.x0,
            baseline,
        });
    }

    let last = lines.last()?;
    let width = lines.iter().map(|l| l.width).fold(0.0, f32::max);
    let bbox = Rect::new(
        target.x0,
        target.y0,
        target.x0 + width,
        last.baseline + font_size * DESCENT,
    );

    Some(LaidOutText {
        truncated: lines.len() < rows.len(),
        lines,
        bbox,
        font_size,
    })
}

/// Greedy word wrap. `None` when the text is blank or a single character
/// is wider than the line.
fn wrap(text: &str, max_width: f32, font_size: f32) -> Option<Vec<String>> {
    let space = metrics::text_width(" ", font_size);
    let mut rows: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;

    for word in text.split_whitespace() {
        let word_width = metrics::text_width(word, font_size);

        if !current.is_empty() && current_width + space + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += space + word_width;
            continue;
        }

        if !current.is_empty() {
            rows.push(std::mem::take(&mut current));
            current_width = 0.0;
        }

        if word_width <= max_width {
            current.push_str(word);
            current_width = word_width;
            continue;
        }

        // break an oversized word between characters
        for c in word.chars() {
            let w = metrics::char_width(c) * font_size;
            if w > max_width {
                return None;
            }
            if current_width + w > max_width {
                rows.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            current.push(c);
            current_width += w;
        }
    }

    if !current.is_empty() {
        rows.push(current);
    }
    if rows.is_empty() {
        None
    } else {
        Some(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_line() {
        let target = Rect::new(5.0, 100.0, 70.0, 795.0);
        let laid = layout_text("Ref [1]: short", &target, 5.0).unwrap();
        assert_eq!(laid.lines.len(), 1);
        assert!(!laid.truncated);
        assert_eq!(laid.bbox.x0, 5.0);
        assert_eq!(laid.bbox.y0, 100.0);
        assert!(laid.bbox.x1 <= target.x1);
    }

    #[test]
    fn test_wraps_within_target_width() {
        let target = Rect::new(5.0, 100.0, 60.0, 795.0);
        let text = "Ref [2]: A fairly long reference entry that needs several lines to fit";
        let laid = layout_text(text, &target, 5.0).unwrap();
        assert!(laid.lines.len() > 1);
        for line in &laid.lines {
            assert!(line.width <= target.width() + 1e-3, "{:?}", line);
        }
        assert!(target.contains(&laid.bbox));
        // every word survives
        let joined: Vec<&str> = laid.lines.iter().flat_map(|l| l.text.split(' ')).collect();
        assert_eq!(joined.join(" "), text);
    }

    #[test]
    fn test_long_word_is_broken() {
        let target = Rect::new(0.0, 0.0, 20.0, 100.0);
        let laid = layout_text("Supercalifragilistic", &target, 5.0).unwrap();
        assert!(laid.lines.len() > 1);
        assert_eq!(
            laid.lines.iter().map(|l| l.text.as_str()).collect::<String>(),
            "Supercalifragilistic"
        );
    }

    #[test]
    fn test_overflow_truncates() {
        let target = Rect::new(0.0, 0.0, 30.0, 12.0);
        let laid = layout_text("one two three four five six seven", &target, 5.0).unwrap();
        assert!(laid.truncated);
        assert!(laid.bbox.y1 <= 12.0);
    }

    #[test]
    fn test_nothing_fits() {
        // narrower than any glyph
        assert!(layout_text("abc", &Rect::new(0.0, 0.0, 0.5, 100.0), 5.0).is_none());
        // shorter than one line
        assert!(layout_text("abc", &Rect::new(0.0, 0.0, 100.0, 2.0), 5.0).is_none());
        assert!(layout_text("   ", &Rect::new(0.0, 0.0, 100.0, 100.0), 5.0).is_none());
    }
}
