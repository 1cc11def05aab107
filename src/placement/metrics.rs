//! Helvetica advance widths.
//!
//! Annotations are drawn with the standard Helvetica font, so wrapping uses
//! its AFM widths. The same table gives the layout analyzer a width estimate
//! for spans whose font metrics are not read from the PDF.

/// Widths in 1/1000 em for the printable ASCII range `' '..='~'`.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Width used for characters outside the table.
const DEFAULT_WIDTH: u16 = 556;

/// Ascender height as a fraction of the font size.
pub const ASCENT: f32 = 0.718;

/// Descender depth as a fraction of the font size.
pub const DESCENT: f32 = 0.207;

/// Baseline-to-baseline distance as a fraction of the font size.
pub const LINE_HEIGHT: f32 = 1.15;

/// Advance width of a single character at 1pt.
pub fn char_width(c: char) -> f32 {
    let units = match c {
        ' '..='~' => HELVETICA_WIDTHS[c as usize - ' ' as usize],
        _ => DEFAULT_WIDTH,
    };
    units as f32 / 1000.0
}

/// Advance width of `text` at `font_size`.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width).sum::<f32>() * font_size
}
