//! Unicode-aware text measurement, padding and wrapping.
//!
//! Widths come from `console`, so wide characters count as two columns and
//! ANSI escapes count as none. Padding a painted string therefore gives the
//! same visible result as painting a padded one.

use console::{measure_text_width, pad_str, pad_str_with, Alignment};

/// Display width in terminal columns. ANSI escapes do not count.
pub fn display_width(s: &str) -> usize {
    measure_text_width(s)
}

/// Right-aligns `s` within `width` columns.
pub fn pad_left(s: &str, width: usize) -> String {
    pad_str(s, width, Alignment::Right, None).into_owned()
}

/// Left-aligns `s` within `width` columns.
pub fn pad_right(s: &str, width: usize) -> String {
    pad_str(s, width, Alignment::Left, None).into_owned()
}

/// Centers `s` within `width` columns using spaces.
pub fn pad_center(s: &str, width: usize) -> String {
    center_with(s, width, ' ')
}

/// Centers `s` within `width` columns using `fill`.
///
/// Odd padding puts the extra column on the left when `width` is odd and on
/// the right otherwise.
pub fn center_with(s: &str, width: usize, fill: char) -> String {
    let w = display_width(s);
    let total = width.saturating_sub(w);
    let left = total / 2 + (total & width & 1);
    let shifted = pad_str_with(s, w + left, Alignment::Right, None, fill);
    pad_str_with(&shifted, width, Alignment::Left, None, fill).into_owned()
}

/// Length of the longest space separated word.
pub fn longest_word(s: &str) -> usize {
    s.split(' ').map(display_width).max().unwrap_or(0)
}

/// Greedy title wrap used for field headers.
///
/// A title that fits in `width` stays on one line. Otherwise words are
/// appended to the current line while the line, plus the next word, stays
/// strictly below `width`.
pub fn wrap_title(title: &str, width: usize) -> Vec<String> {
    if display_width(title) <= width {
        return vec![title.to_string()];
    }

    let mut words = title.split(' ');
    let first = words.next().unwrap_or_default();
    let mut lines = Vec::new();
    let mut line = vec![first];
    let mut cur_len = display_width(first);

    for word in words {
        let word_len = display_width(word);
        if word_len + cur_len < width {
            line.push(word);
            cur_len += word_len + 1;
        } else {
            lines.push(line.join(" "));
            line = vec![word];
            cur_len = word_len;
        }
    }

    if !line.is_empty() {
        lines.push(line.join(" "));
    }

    lines
}

/// Wraps a sheet description into lines of roughly `width` columns.
///
/// Words accumulate until the line reaches `width`; the word that pushed it
/// over moves to the next line unless it is alone.
pub fn wrap_description(description: &str, width: usize) -> Vec<String> {
    let mut pending: std::collections::VecDeque<&str> = description.split(' ').collect();
    let mut lines = Vec::new();
    let mut words: Vec<&str> = Vec::new();

    while let Some(word) = pending.pop_front() {
        words.push(word);
        let line = words.join(" ");

        if display_width(&line) >= width {
            if words.len() > 1 {
                if let Some(last) = words.pop() {
                    pending.push_front(last);
                }
                lines.push(words.join(" "));
            } else {
                lines.push(line);
            }
            words.clear();
        }
    }

    if !words.is_empty() {
        lines.push(words.join(" "));
    }

    lines
}
