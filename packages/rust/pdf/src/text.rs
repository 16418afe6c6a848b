//! Text measurement and encoding for the standard Helvetica fonts.

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126.
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

/// Width used for characters outside the ASCII table.
const FALLBACK_WIDTH: u16 = 556;

/// Helvetica-Bold runs a little wider than the regular face.
const BOLD_FACTOR: f32 = 1.06;

/// Approximate rendered width of `text` in points.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (32..=126).contains(&code) {
                u32::from(HELVETICA_WIDTHS[(code - 32) as usize])
            } else {
                u32::from(FALLBACK_WIDTH)
            }
        })
        .sum();
    let width = units as f32 * size / 1000.0;
    if bold { width * BOLD_FACTOR } else { width }
}

/// Encode text for a font using `WinAnsiEncoding`.
///
/// Latin-1 passes through; common typographic punctuation maps to its
/// code point in the Windows-1252 range; everything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap to `max_width` points. Words wider than a line are split.
pub fn wrap_text(text: &str, max_width: f32, size: f32, bold: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if text_width(&candidate, size, bold) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if text_width(word, size, bold) <= max_width {
            current = word.to_string();
        } else {
            for c in word.chars() {
                current.push(c);
                if text_width(&current, size, bold) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_of_known_strings() {
        // "Page 1" = 667 + 556 + 556 + 556 + 278 + 556 = 3169 units
        let w = text_width("Page 1", 10.0, false);
        assert!((w - 31.69).abs() < 0.01);
        assert!(text_width("Page 1", 10.0, true) > w);
        assert_eq!(text_width("", 12.0, false), 0.0);
    }

    #[test]
    fn win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Abc 1"), b"Abc 1".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("a…b"), vec![b'a', 0x85, b'b']);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 80.0, 10.0, false);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 10.0, false) <= 80.0, "line too wide: {line}");
        }
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn wrap_breaks_long_words() {
        let lines = wrap_text("Supercalifragilisticexpialidocious", 40.0, 10.0, false);
        assert!(lines.len() >= 2);
        assert_eq!(lines.concat(), "Supercalifragilisticexpialidocious");
    }

    #[test]
    fn wrap_empty_yields_one_line() {
        assert_eq!(wrap_text("", 100.0, 10.0, false), vec![String::new()]);
    }
}
