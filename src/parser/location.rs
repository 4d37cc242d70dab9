//! Source positions
//!
//! Converts byte offsets into 1-based line/column pairs and extracts the
//! context snippet shown next to a defect.

/// Maximum number of characters kept on each side of the column in a snippet
const CONTEXT_RADIUS: usize = 30;

/// A 1-based line/column position, column counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Locate a byte offset inside `text`
    ///
    /// Offsets past the end clamp to the end of the text, and offsets that
    /// fall inside a multi-byte character snap back to its first byte.
    pub fn from_offset(text: &str, offset: usize) -> Self {
        let offset = floor_char_boundary(text, offset);
        let before = &text[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        let column = text[line_start..offset].chars().count() + 1;
        Self { line, column }
    }
}

/// Snippet of the line containing `offset`, clipped around the offset
///
/// Returns an empty string when the line is blank.
pub fn context_snippet(text: &str, offset: usize) -> String {
    let offset = floor_char_boundary(text, offset);
    let line_start = text[..offset].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let line_end = text[offset..]
        .find('\n')
        .map(|idx| offset + idx)
        .unwrap_or(text.len());
    let line = text[line_start..line_end].trim_end_matches('\r');

    let column = text[line_start..offset].chars().count();
    let total = line.chars().count();
    let first = column.saturating_sub(CONTEXT_RADIUS);
    let last = (column + CONTEXT_RADIUS).min(total);

    let mut snippet: String = line.chars().skip(first).take(last - first).collect();
    if snippet.trim().is_empty() {
        return String::new();
    }
    if first > 0 {
        snippet.insert_str(0, "...");
    }
    if last < total {
        snippet.push_str("...");
    }
    snippet.trim().to_string()
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_character() {
        assert_eq!(
            Location::from_offset("<a/>", 0),
            Location { line: 1, column: 1 }
        );
    }

    #[test]
    fn test_multi_line_offsets() {
        let text = "<a>\n  <b>\n</a>";
        let offset = text.find("<b>").unwrap();
        assert_eq!(
            Location::from_offset(text, offset),
            Location { line: 2, column: 3 }
        );
    }

    #[test]
    fn test_columns_count_characters() {
        let text = "<é>é</x>";
        let offset = text.find("</x>").unwrap();
        assert_eq!(
            Location::from_offset(text, offset),
            Location { line: 1, column: 5 }
        );
    }

    #[test]
    fn test_offset_past_end_clamps() {
        assert_eq!(
            Location::from_offset("ab\ncd", 100),
            Location { line: 2, column: 3 }
        );
        assert_eq!(Location::from_offset("", 0), Location { line: 1, column: 1 });
    }

    #[test]
    fn test_context_is_offending_line() {
        let text = "<root>\n  <child>&bogus;</child>\n</root>";
        let offset = text.find('&').unwrap();
        assert_eq!(context_snippet(text, offset), "<child>&bogus;</child>");
    }

    #[test]
    fn test_context_is_clipped_on_long_lines() {
        let text = format!("<a>{}&x;{}</a>", "y".repeat(100), "z".repeat(100));
        let offset = text.find('&').unwrap();
        let snippet = context_snippet(&text, offset);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("&x;"));
    }

    #[test]
    fn test_blank_context_is_empty() {
        assert_eq!(context_snippet("", 0), "");
        assert_eq!(context_snippet("<a>\n\n", 4), "");
    }
}
