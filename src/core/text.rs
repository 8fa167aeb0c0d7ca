//! Helvetica text metrics.
//!
//! Exported text is drawn with the standard-14 Helvetica font, whose advance
//! widths are fixed by the PDF specification. The overlay uses the same table
//! to measure text bounds so that the on-screen box and the flattened box
//! agree.

use crate::core::geometry::{DisplaySpace, Size};

/// Advance widths for Helvetica, ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, // 'A'..'P'
    778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'Q'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, // 'a'..'p'
    556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'q'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Fallback width for characters outside the table (1/1000 em).
const DEFAULT_WIDTH: u16 = 556;

/// Map a character to its WinAnsi (CP1252) code point.
///
/// This is the encoding the exported font declares, so the same mapping
/// drives both text measurement and content-stream bytes. `None` means the
/// character has no WinAnsi slot; such characters export as `?`.
pub fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x00..=0x7F | 0xA0..=0xFF => Some(code as u8),
        _ => match c {
            '\u{20AC}' => Some(0x80),
            '\u{201A}' => Some(0x82),
            '\u{0192}' => Some(0x83),
            '\u{201E}' => Some(0x84),
            '\u{2026}' => Some(0x85),
            '\u{2020}' => Some(0x86),
            '\u{2021}' => Some(0x87),
            '\u{02C6}' => Some(0x88),
            '\u{2030}' => Some(0x89),
            '\u{0160}' => Some(0x8A),
            '\u{2039}' => Some(0x8B),
            '\u{0152}' => Some(0x8C),
            '\u{017D}' => Some(0x8E),
            '\u{2018}' => Some(0x91),
            '\u{2019}' => Some(0x92),
            '\u{201C}' => Some(0x93),
            '\u{201D}' => Some(0x94),
            '\u{2022}' => Some(0x95),
            '\u{2013}' => Some(0x96),
            '\u{2014}' => Some(0x97),
            '\u{02DC}' => Some(0x98),
            '\u{2122}' => Some(0x99),
            '\u{0161}' => Some(0x9A),
            '\u{203A}' => Some(0x9B),
            '\u{0153}' => Some(0x9C),
            '\u{017E}' => Some(0x9E),
            '\u{0178}' => Some(0x9F),
            _ => None,
        },
    }
}

/// Advance width of a single character in 1/1000 em units.
///
/// WinAnsi characters above ASCII use the fallback width, which equals the
/// width of `?` — the glyph unmappable characters are substituted with on
/// export — so measurement and output stay consistent.
pub fn char_width(c: char) -> u16 {
    match win_ansi_byte(c) {
        Some(code @ 32..=126) => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => DEFAULT_WIDTH,
    }
}

/// Advance width of a string at the given font size.
pub fn text_width(text: &str, font_size: f64) -> f64 {
    let units: u64 = text.chars().map(|c| char_width(c) as u64).sum();
    units as f64 * font_size / 1000.0
}

/// Measured bounds of a single-line text run.
///
/// Height is the nominal line box (one em); multi-line content measures the
/// widest line and stacks line boxes.
pub fn measure_text(text: &str, font_size: f64) -> Size<DisplaySpace> {
    let mut widest: f64 = 0.0;
    let mut lines = 0usize;
    for line in text.split('\n') {
        widest = widest.max(text_width(line, font_size));
        lines += 1;
    }
    Size::new(widest, font_size * lines.max(1) as f64)
}
