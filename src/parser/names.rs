//! XML 1.0 character classes
//!
//! `Char`, `NameStartChar` and `NameChar` productions from the XML 1.0
//! (fifth edition) grammar.

/// Whether `c` may appear anywhere in an XML document
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// The `S` production
pub fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Whether `c` may start a name
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// Whether `c` may continue a name
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

/// Whether `name` matches the `Name` production
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start_char(first) => chars.all(is_name_char),
        _ => false,
    }
}

/// Byte index of the first character that is not a legal XML character
pub fn find_illegal_char(text: &str) -> Option<(usize, char)> {
    text.char_indices().find(|&(_, c)| !is_xml_char(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("root"));
        assert!(is_valid_name("_private"));
        assert!(is_valid_name("ns:item-1.2"));
        assert!(is_valid_name("élément"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1st"));
        assert!(!is_valid_name("-dash"));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("a&b"));
    }

    #[test]
    fn test_illegal_characters() {
        assert_eq!(find_illegal_char("<a>ok</a>"), None);
        assert_eq!(find_illegal_char("<a>\tok\r\n</a>"), None);
        assert_eq!(find_illegal_char("<a>\u{1}</a>"), Some((3, '\u{1}')));
        assert_eq!(find_illegal_char("<a>\u{FFFE}</a>"), Some((3, '\u{FFFE}')));
    }
}
