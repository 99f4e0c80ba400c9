//! Line breaking and alignment for text blocks.
//!
//! Layout works on widths from a caller-supplied measuring function, so it
//! is independent of any particular font backend.

use serde::{Deserialize, Serialize};

/// How each line sits horizontally inside the text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    #[serde(alias = "center")]
    Centre,
    Right,
}

/// One laid-out line and its measured width in pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub width: u32,
    /// True when the line ends at an explicit newline or the end of the
    /// text, rather than at a wrap point.
    pub last_in_paragraph: bool,
}

/// Break `text` into lines no wider than `max_width`.
///
/// Explicit newlines always break. Words are wrapped at whitespace; a word
/// wider than `max_width` on its own is broken between characters.
pub fn wrap_lines(text: &str, max_width: u32, measure: impl Fn(&str) -> u32) -> Vec<Line> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
        let mut wrapped: Vec<String> = Vec::new();
        let mut current = String::new();

        for word in paragraph.split_inclusive(char::is_whitespace) {
            let candidate = format!("{current}{word}");
            if measure(candidate.trim_end()) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                wrapped.push(current.trim_end().to_string());
                current = String::new();
            }
            if measure(word.trim_end()) <= max_width {
                current.push_str(word);
                continue;
            }

            // Force-break a word that cannot fit on a line of its own.
            for ch in word.chars() {
                let mut next = current.clone();
                next.push(ch);
                if measure(next.trim_end()) > max_width && !current.is_empty() {
                    wrapped.push(current.trim_end().to_string());
                    current = ch.to_string();
                } else {
                    current = next;
                }
            }
        }
        wrapped.push(current.trim_end().to_string());

        let count = wrapped.len();
        lines.extend(wrapped.into_iter().enumerate().map(|(i, text)| Line {
            width: measure(&text),
            text,
            last_in_paragraph: i + 1 == count,
        }));
    }

    lines
}

/// Horizontal offset of a line of `line_width` inside a block of
/// `block_width`.
pub fn line_offset(align: Align, block_width: u32, line_width: u32) -> i32 {
    let slack = block_width.saturating_sub(line_width) as i32;
    match align {
        Align::Left => 0,
        Align::Centre => slack / 2,
        Align::Right => slack,
    }
}

/// Word positions that stretch `line` to exactly `block_width` by widening
/// the gaps between words. `None` when the line should not be justified:
/// it is the last of its paragraph or has a single word.
pub fn justify<'a>(
    line: &'a Line,
    block_width: u32,
    measure: impl Fn(&str) -> u32,
) -> Option<Vec<(i32, &'a str)>> {
    if line.last_in_paragraph {
        return None;
    }
    let words: Vec<&str> = line.text.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }

    let inked: u32 = words.iter().map(|w| measure(w)).sum();
    let gaps = (words.len() - 1) as u32;
    let slack = block_width.saturating_sub(inked);
    let (gap, extra) = (slack / gaps, slack % gaps);

    let mut x = 0u32;
    let mut placed = Vec::with_capacity(words.len());
    for (i, word) in words.into_iter().enumerate() {
        placed.push((x as i32, word));
        x += measure(word) + gap + u32::from((i as u32) < extra);
    }
    Some(placed)
}
