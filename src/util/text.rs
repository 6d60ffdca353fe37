use std::borrow::Cow;

/// Returns `Some(trimmed)` when the field holds anything besides whitespace.
///
/// Stored content uses empty strings, missing keys and `null` interchangeably
/// for "not set"; callers funnel all three through this.
pub fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[inline]
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || (!c.is_control() && c != '\u{FFFE}' && c != '\u{FFFF}')
        || ('\u{80}'..='\u{9F}').contains(&c)
}

/// Strip characters that XML 1.0 documents cannot contain.
///
/// Removes C0 control characters (except tab, newline and carriage return),
/// DEL and the `U+FFFE`/`U+FFFF` non-characters. C1 controls are legal XML and
/// are preserved.
///
/// Returns `Cow::Borrowed` when the input is already clean, which is the
/// common case for rendered article bodies.
///
/// # Examples
///
/// ```
/// use partnerfeed::util::strip_invalid_xml_chars;
///
/// assert_eq!(strip_invalid_xml_chars("a\u{0}b\u{1b}c"), "abc");
/// assert_eq!(strip_invalid_xml_chars("tab\tok"), "tab\tok");
/// ```
pub fn strip_invalid_xml_chars(s: &str) -> Cow<'_, str> {
    if s.chars().all(is_xml_char) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| is_xml_char(c)).collect())
}
