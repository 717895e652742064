//! Deterministic text measurement and line breaking.
//!
//! Both layout passes break lines through [`wrap_text`] with the same [`TextMetrics`], so the
//! height measured by the estimator is exactly the height drawn by the renderer.

use crate::style::{TextStyle, PT_TO_MM};

/// Measures the advance width of text.
pub trait TextMetrics: Send + Sync {
    /// Width of `text` in millimetres when set in `style`.
    fn text_width(&self, text: &str, style: &TextStyle) -> f64;
}

/// Width table in ems, chosen to be at least as wide as common CJK and sans-serif faces.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmWidthMetrics;

const BOLD_FACTOR: f64 = 1.05;

impl EmWidthMetrics {
    fn char_em(c: char) -> f64 {
        match c {
            ' ' | '\u{00A0}' => 0.3,
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.32,
            'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 0.4,
            'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.9,
            'A'..='Z' | '0'..='9' | '#' | '&' | '+' | '=' | '?' | '$' => 0.62,
            c if c.is_ascii() => 0.56,
            c if is_wide(c) => 1.0,
            _ => 0.62,
        }
    }
}

impl TextMetrics for EmWidthMetrics {
    fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
        let ems: f64 = text.chars().map(Self::char_em).sum();
        let factor = if style.bold { BOLD_FACTOR } else { 1.0 };
        ems * f64::from(style.font_size) * PT_TO_MM * factor
    }
}

/// Full-width characters: CJK ideographs, kana, hangul and full-width punctuation.
pub fn is_wide(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x20000..=0x3FFFD
    )
}

/// Breaks `text` into lines no wider than `width` millimetres.
///
/// Explicit newlines are kept. Latin words move to the next line as a whole unless a single word
/// is wider than the line; full-width characters may break anywhere. Empty input yields one empty
/// line.
pub fn wrap_text(
    text: &str,
    width: f64,
    style: &TextStyle,
    metrics: &dyn TextMetrics,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(paragraph.trim_end_matches('\r'), width, style, metrics, &mut lines);
    }
    lines
}

fn wrap_paragraph(
    text: &str,
    width: f64,
    style: &TextStyle,
    metrics: &dyn TextMetrics,
    lines: &mut Vec<String>,
) {
    let mut line = String::new();
    for token in tokens(text) {
        if token.trim().is_empty() {
            if !line.is_empty() {
                line.push_str(token);
            }
            continue;
        }

        let candidate = format!("{line}{token}");
        if metrics.text_width(&candidate, style) <= width {
            line = candidate;
            continue;
        }

        if !line.trim().is_empty() {
            lines.push(line.trim_end().to_owned());
        }
        line.clear();

        if metrics.text_width(token, style) <= width {
            line.push_str(token);
            continue;
        }
        for c in token.chars() {
            let mut next = line.clone();
            next.push(c);
            if !line.is_empty() && metrics.text_width(&next, style) > width {
                lines.push(std::mem::replace(&mut line, c.to_string()));
            } else {
                line = next;
            }
        }
    }
    lines.push(line.trim_end().to_owned());
}

/// Splits into runs of whitespace, runs of narrow non-space characters, and single wide characters.
fn tokens(text: &str) -> Vec<&str> {
    #[derive(PartialEq)]
    enum Kind {
        Space,
        Word,
        Wide,
    }

    let kind = |c: char| {
        if c.is_whitespace() {
            Kind::Space
        } else if is_wide(c) {
            Kind::Wide
        } else {
            Kind::Word
        }
    };

    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current: Option<Kind> = None;
    for (index, c) in text.char_indices() {
        let next = kind(c);
        let split = match &current {
            Some(Kind::Wide) => true,
            Some(previous) => *previous != next,
            None => false,
        };
        if split {
            tokens.push(&text[start..index]);
            start = index;
        }
        current = Some(next);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use genpdf::style::Color;

    fn style() -> TextStyle {
        TextStyle {
            font_size: 10,
            bold: false,
            color: Color::Rgb(0, 0, 0),
            leading: 14.0,
        }
    }

    fn em() -> f64 {
        10.0 * PT_TO_MM
    }

    #[test]
    fn wide_characters_take_a_full_em() {
        let width = EmWidthMetrics.text_width("报告", &style());
        assert!((width - 2.0 * em()).abs() < 1e-9);
        let bold = TextStyle { bold: true, ..style() };
        assert!(EmWidthMetrics.text_width("报告", &bold) > width);
    }

    #[test]
    fn short_text_stays_on_one_line() {
        assert_eq!(wrap_text("hello world", 100.0, &style(), &EmWidthMetrics), ["hello world"]);
    }

    #[test]
    fn wraps_cjk_anywhere() {
        let lines = wrap_text("一二三四五六七", 3.0 * em() + 0.01, &style(), &EmWidthMetrics);
        assert_eq!(lines, ["一二三", "四五六", "七"]);
    }

    #[test]
    fn wraps_latin_on_word_boundaries() {
        let width = EmWidthMetrics.text_width("alpha beta", &style()) + 0.01;
        let lines = wrap_text("alpha beta alpha beta", width, &style(), &EmWidthMetrics);
        assert_eq!(lines, ["alpha beta", "alpha beta"]);
    }

    #[test]
    fn breaks_overlong_words() {
        let width = EmWidthMetrics.text_width("abcd", &style()) + 0.01;
        let lines = wrap_text("abcdefghij", width, &style(), &EmWidthMetrics);
        assert_eq!(lines, ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn keeps_explicit_newlines_and_empty_text() {
        assert_eq!(wrap_text("a\n\nb", 50.0, &style(), &EmWidthMetrics), ["a", "", "b"]);
        assert_eq!(wrap_text("", 50.0, &style(), &EmWidthMetrics), [""]);
    }

    #[test]
    fn every_line_fits() {
        let text = "本月外卖订单量同比增长 23%，主要来自 lunch combo 套餐与满减活动的拉动。";
        let width = 40.0;
        for line in wrap_text(text, width, &style(), &EmWidthMetrics) {
            assert!(EmWidthMetrics.text_width(&line, &style()) <= width, "{line}");
        }
    }
}
