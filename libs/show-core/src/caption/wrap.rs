//! Line wrapping by character-weight budget.

const BREAK_PUNCTUATION: &[char] = &[',', '.', ';', ':', '!', '?'];

/// Every wrapped line of a caption, in order, with no cap on how many there
/// are; a long caption just grows the block vertically. Scrolling or
/// truncating a tall block is UI-toolkit layout and stays out of scope here,
/// so the renderer gets the full list and decides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WrappedText(Vec<String>);

impl WrappedText {
    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn into_lines(self) -> Vec<String> {
        self.0
    }

    pub fn line_count(&self) -> usize {
        self.0.len()
    }
}

impl std::ops::Deref for WrappedText {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

/// Wrap `text` into lines whose weighted character budget does not exceed
/// `max_chars_per_line`, where each CJK character counts as
/// `chinese_char_weight` of a slot and every other character counts as 1.0.
/// Break preference: after punctuation, then after whitespace, else at 3/4
/// of the current line's length.
pub fn wrap_lines(text: &str, max_chars_per_line: u32, chinese_char_weight: f32) -> WrappedText {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return WrappedText::default();
    }
    let budget = max_chars_per_line as f32;

    let mut lines = Vec::new();
    let mut line_start = 0usize;
    let mut weight = 0.0f32;
    let mut last_punct: Option<usize> = None;
    let mut last_space: Option<usize> = None;

    for (i, &c) in chars.iter().enumerate() {
        weight += char_weight(c, chinese_char_weight);
        if BREAK_PUNCTUATION.contains(&c) {
            last_punct = Some(i);
        } else if c.is_whitespace() {
            last_space = Some(i);
        }

        if weight > budget {
            let break_at = last_punct
                .filter(|&p| p >= line_start)
                .or_else(|| last_space.filter(|&s| s >= line_start))
                .unwrap_or_else(|| line_start + ((i - line_start) * 3 / 4).max(1));
            let end = (break_at + 1).min(chars.len());
            lines.push(chars[line_start..end].iter().collect::<String>().trim().to_string());
            line_start = end;
            weight = chars[line_start..=i.min(chars.len() - 1)]
                .iter()
                .map(|&c| char_weight(c, chinese_char_weight))
                .sum();
            last_punct = None;
            last_space = None;
        }
    }
    if line_start < chars.len() {
        lines.push(chars[line_start..].iter().collect::<String>().trim().to_string());
    }
    WrappedText(lines.into_iter().filter(|l| !l.is_empty()).collect())
}

fn char_weight(c: char, chinese_char_weight: f32) -> f32 {
    if is_cjk(c) {
        chinese_char_weight
    } else {
        1.0
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32, 0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaks_after_punctuation_when_possible() {
        let lines = wrap_lines("Hello, world. This keeps going for a while yet", 12, 1.8);
        assert!(lines.len() > 1);
        assert!(lines[0].ends_with(',') || lines[0].ends_with('.'));
    }

    #[test]
    fn cjk_characters_weigh_more() {
        let ascii_lines = wrap_lines("aaaaaaaaaaaaaaaaaaaa", 10, 1.8);
        let cjk_lines = wrap_lines("測測測測測測測測測測測測測測測測測測測測", 10, 1.8);
        // heavier per-char weight means fewer chars fit per line
        assert!(cjk_lines.first().unwrap().chars().count() <= ascii_lines.first().unwrap().chars().count());
    }

    #[test]
    fn empty_text_yields_no_lines() {
        assert!(wrap_lines("", 10, 1.8).is_empty());
    }
}
