//! XML Entity Decoding
//!
//! Handles decoding of XML entities in raw text and attribute values:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when no entities are present. The tokenizer never
//! decodes; callers apply this to the strings they care about.

use memchr::memchr;
use std::borrow::Cow;

/// Decode entity references in a string
///
/// Unknown entities and stray ampersands are kept as-is.
#[inline]
pub fn parse_entities(input: &str) -> Cow<'_, str> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

fn decode_entities(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp_offset) = memchr(b'&', &bytes[pos..]) {
        result.push_str(&input[pos..pos + amp_offset]);
        pos += amp_offset;

        let decoded = memchr(b';', &bytes[pos..])
            .and_then(|semi| decode_entity(&input[pos + 1..pos + semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                result.push(c);
                pos += semi + 1;
            }
            None => {
                result.push('&');
                pos += 1;
            }
        }
    }

    result.push_str(&input[pos..]);
    result
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &str) -> Option<char> {
    if let Some(reference) = entity.strip_prefix('#') {
        return decode_numeric_entity(reference);
    }

    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode a numeric character reference
fn decode_numeric_entity(reference: &str) -> Option<char> {
    let codepoint = match reference.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => reference.parse::<u32>().ok()?,
    };
    char::from_u32(codepoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_entities_borrows() {
        let decoded = parse_entities("plain text");
        assert!(matches!(decoded, Cow::Borrowed("plain text")));
    }

    #[test]
    fn test_quoted_speech() {
        assert_eq!(parse_entities("&quot;Run!&quot;, he said"), "\"Run!\", he said");
    }

    #[test]
    fn test_builtin_entities() {
        assert_eq!(parse_entities("&lt;a&gt; &amp; &apos;b&apos;"), "<a> & 'b'");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(parse_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(parse_entities("&#x1F600;"), "\u{1F600}");
    }

    #[test]
    fn test_unknown_and_stray() {
        assert_eq!(parse_entities("&nbsp; & &#xD800; &"), "&nbsp; & &#xD800; &");
        assert_eq!(parse_entities("fish & chips &amp; more"), "fish & chips & more");
    }
}
