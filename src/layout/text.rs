// document-synthesis-service/src/layout/text.rs

//! Text measurement and line breaking for the builtin Helvetica family.
//! Characters WinAnsi cannot hold are set in the composite CJK font, which
//! advances every glyph by one em.

use super::{Font, TextStyle};

// Advance widths in 1/1000 em for ASCII 32..=126, from the standard AFM files.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn char_width(c: char, font: Font) -> u16 {
    let table = match font {
        Font::Bold => &HELVETICA_BOLD,
        Font::Regular | Font::Italic => &HELVETICA,
    };
    match c as u32 {
        code @ 32..=126 => table[(code - 32) as usize],
        _ if win_ansi_byte(c).is_none() => 1000,
        _ => 556,
    }
}

pub fn text_width(text: &str, style: &TextStyle) -> f64 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c, style.font))).sum();
    f64::from(units) * style.size / 1000.0
}

pub fn line_height(size: f64) -> f64 {
    size * 1.35
}

/// Greedy line breaking on whitespace. Words wider than `max_width` (and
/// unspaced CJK runs) are broken between characters. Explicit newlines are
/// kept as breaks.
pub fn wrap_text(text: &str, style: &TextStyle, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, style) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(word, style) <= max_width {
                current = word.to_string();
            } else {
                for piece in break_word(word, style, max_width) {
                    if !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                    }
                    current = piece;
                }
            }
        }
        lines.push(current);
    }
    // Leading/trailing blank lines come from stray newlines only.
    while lines.len() > 1 && lines.last().map(String::is_empty).unwrap_or(false) {
        lines.pop();
    }
    lines
}

fn break_word(word: &str, style: &TextStyle, max_width: f64) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        current.push(c);
        if text_width(&current, style) > max_width && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Truncates with an ellipsis so the text fits `max_width`.
pub fn fit_text(text: &str, style: &TextStyle, max_width: f64) -> String {
    if text_width(text, style) <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        out.push(c);
        if text_width(&format!("{out}…"), style) > max_width {
            out.pop();
            break;
        }
    }
    format!("{}…", out.trim_end())
}

fn win_ansi_byte(c: char) -> Option<u8> {
    match c as u32 {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => Some(code as u8),
        _ => match c {
            '€' => Some(0x80),
            '‚' => Some(0x82),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '™' => Some(0x99),
            '\t' => Some(b' '),
            _ => None,
        },
    }
}

/// A stretch of text that a single font can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedRun {
    /// WinAnsiEncoding bytes for the Helvetica family.
    WinAnsi(Vec<u8>),
    /// UTF-16BE code units for the composite CJK font. Characters outside
    /// the Basic Multilingual Plane become U+FFFD.
    Wide(Vec<u8>),
}

/// Splits text into runs, switching fonts wherever WinAnsi cannot encode a
/// character. Nothing is replaced with `?`.
pub fn encode_runs(text: &str) -> Vec<EncodedRun> {
    let mut runs: Vec<EncodedRun> = Vec::new();
    for c in text.chars() {
        match win_ansi_byte(c) {
            Some(byte) => match runs.last_mut() {
                Some(EncodedRun::WinAnsi(bytes)) => bytes.push(byte),
                _ => runs.push(EncodedRun::WinAnsi(vec![byte])),
            },
            None => {
                let unit = u16::try_from(c as u32).unwrap_or(0xFFFD);
                match runs.last_mut() {
                    Some(EncodedRun::Wide(bytes)) => bytes.extend_from_slice(&unit.to_be_bytes()),
                    _ => runs.push(EncodedRun::Wide(unit.to_be_bytes().to_vec())),
                }
            }
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Color;

    fn body() -> TextStyle {
        TextStyle::new(Font::Regular, 10.0, Color::TEXT)
    }

    #[test]
    fn measures_with_afm_widths() {
        // H(722) + i(222) = 944 units at 10pt.
        assert!((text_width("Hi", &body()) - 9.44).abs() < 1e-9);
        let bold = TextStyle::bold(10.0);
        assert!((text_width("Hi", &bold) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn wraps_on_word_boundaries_within_width() {
        let text = "Recycled rubber granulate is sold to sports surface and molded goods manufacturers.";
        let lines = wrap_text(text, &body(), 150.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, &body()) <= 150.0, "{line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn breaks_long_words_and_cjk_runs() {
        let lines = wrap_text("轮胎回收工厂技术与财务分析轮胎回收工厂技术与财务分析", &body(), 50.0);
        assert!(lines.len() >= 4);
        assert!(lines.iter().all(|l| text_width(l, &body()) <= 50.0));
    }

    #[test]
    fn keeps_explicit_newlines() {
        assert_eq!(wrap_text("a\nb", &body(), 500.0), vec!["a", "b"]);
        assert_eq!(wrap_text("", &body(), 500.0), vec![""]);
    }

    #[test]
    fn truncates_with_ellipsis() {
        let out = fit_text("Environmental bonus per ton processed", &body(), 60.0);
        assert!(out.ends_with('…'));
        assert!(text_width(&out, &body()) <= 60.0);
    }

    #[test]
    fn latin_text_stays_in_one_win_ansi_run() {
        assert_eq!(
            encode_runs("Ação €5"),
            vec![EncodedRun::WinAnsi(vec![b'A', 0xE7, 0xE3, b'o', b' ', 0x80, b'5'])]
        );
    }

    #[test]
    fn cjk_characters_switch_to_wide_runs() {
        assert_eq!(
            encode_runs("1. 可行性"),
            vec![
                EncodedRun::WinAnsi(b"1. ".to_vec()),
                EncodedRun::Wide(vec![0x53, 0xEF, 0x88, 0x4C, 0x60, 0x27]),
            ]
        );
        assert_eq!(encode_runs("😀"), vec![EncodedRun::Wide(vec![0xFF, 0xFD])]);
    }

    #[test]
    fn characters_outside_win_ansi_measure_one_em() {
        assert!((text_width("中", &body()) - 10.0).abs() < 1e-9);
        assert!((text_width("Ж", &body()) - 10.0).abs() < 1e-9);
        assert!((text_width("é", &body()) - 5.56).abs() < 1e-9);
    }
}
