use crate::pdf::font::is_supported;

const DELIMITER: &str = "**";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSegment {
    pub text: String,
    pub emphasized: bool,
}

impl StyledSegment {
    fn new(text: impl Into<String>, emphasized: bool) -> Self {
        Self {
            text: text.into(),
            emphasized,
        }
    }
}

/// Drops every character the layout fonts cannot draw.
pub fn filter_supported(line: &str) -> String {
    line.chars().filter(|ch| is_supported(*ch)).collect()
}

/// Splits one line of text into regular and emphasized segments. `**` only
/// opens emphasis when a closing `**` follows on the same line; an unmatched
/// delimiter stays in the text as-is.
pub fn parse_line(line: &str) -> Vec<StyledSegment> {
    let filtered = filter_supported(line);
    let mut segments = Vec::new();
    let mut regular = String::new();
    let mut rest = filtered.as_str();

    while let Some(open) = rest.find(DELIMITER) {
        let after_open = &rest[open + DELIMITER.len()..];
        let Some(close) = after_open.find(DELIMITER) else {
            break;
        };
        regular.push_str(&rest[..open]);
        let inner = &after_open[..close];
        if !inner.is_empty() {
            if !regular.is_empty() {
                segments.push(StyledSegment::new(std::mem::take(&mut regular), false));
            }
            segments.push(StyledSegment::new(inner, true));
        }
        rest = &after_open[close + DELIMITER.len()..];
    }
    regular.push_str(rest);
    if !regular.is_empty() {
        segments.push(StyledSegment::new(regular, false));
    }
    segments
}

/// Physical input lines. One trailing newline ends the last line instead of
/// starting an empty one, so text read from a file lays out like the file.
pub fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.strip_suffix('\n').unwrap_or(text).split('\n')
}

/// The line's text with matched delimiters removed.
pub fn plain_text(line: &str) -> String {
    parse_line(line)
        .into_iter()
        .map(|segment| segment.text)
        .collect()
}
