#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Times,serif".to_string(),
            font_size: 14.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    pub line_count: usize,
}

pub trait TextMeasurer {
    fn measure(&self, lines: &[String], style: &TextStyle) -> TextMetrics;
}

/// Font-independent measurer: a fixed advance per character and a fixed line height.
///
/// Layout output only depends on the input text, never on installed fonts.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl DeterministicTextMeasurer {
    pub fn line_height(&self, style: &TextStyle) -> f64 {
        let factor = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };
        style.font_size.max(1.0) * factor
    }
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, lines: &[String], style: &TextStyle) -> TextMetrics {
        let char_width_factor = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let font_size = style.font_size.max(1.0);
        let max_chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let line_count = lines.len().max(1);
        TextMetrics {
            width: max_chars as f64 * font_size * char_width_factor,
            height: line_count as f64 * self.line_height(style),
            line_count,
        }
    }
}

/// Splits a DOT label into display lines.
///
/// `\n`, `\l` and `\r` end a line and `\N` expands to the node name.
pub fn label_lines(label: &str, node_name: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = label.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            current.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'l' | 'r') => lines.push(std::mem::take(&mut current)),
            Some('N') => current.push_str(node_name),
            Some('\\') => current.push('\\'),
            Some(other) => {
                current.push('\\');
                current.push(other);
            }
            None => current.push('\\'),
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
    fn measures_longest_line() {
        let m = DeterministicTextMeasurer::default();
        let style = TextStyle {
            font_family: "Helvetica".into(),
            font_size: 10.0,
        };
        let metrics = m.measure(&["abcd".into(), "ab".into()], &style);
        assert_eq!(metrics.width, 24.0);
        assert_eq!(metrics.height, 24.0);
        assert_eq!(metrics.line_count, 2);
    }

    #[test]
    fn splits_escaped_line_breaks() {
        assert_eq!(label_lines(r"one\ntwo\l", "n"), ["one", "two"]);
        assert_eq!(label_lines(r"\N!", "recA"), ["recA!"]);
        assert_eq!(label_lines("", "recA"), [""]);
        assert_eq!(label_lines(r"a\\b", "n"), [r"a\b"]);
    }
}
