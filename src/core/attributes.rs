//! XML Attribute Parsing
//!
//! Splits the raw attribute string of a start tag into name/value pairs.
//! Values are returned raw; pass them through
//! [`parse_entities`](super::entities::parse_entities) to decode references.

use super::scanner::is_whitespace;
use memchr::memchr;
use std::collections::BTreeMap;
use thiserror::Error;

/// Parsed attributes keyed by name
pub type AttributeMap = BTreeMap<String, String>;

/// Malformed attribute string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("attribute name expected at byte {0}")]
    MissingName(usize),
    #[error("expected a value for the attribute `{0}`")]
    MissingValue(String),
    #[error("value of attribute `{0}` should be quoted")]
    UnquotedValue(String),
    #[error("unclosed value for attribute `{0}`")]
    UnclosedValue(String),
}

/// Parse a raw attribute string such as ` first="one" second='two'`
///
/// Whitespace is allowed around `=`. A later duplicate overwrites an
/// earlier one. Empty or all-whitespace input yields an empty map.
pub fn parse_attrs(input: &str) -> Result<AttributeMap, AttributeError> {
    let bytes = input.as_bytes();
    let mut attrs = AttributeMap::new();
    let mut pos = 0;

    loop {
        pos = skip_whitespace(bytes, pos);
        if pos >= bytes.len() {
            break;
        }

        let name_start = pos;
        while pos < bytes.len() && !is_whitespace(bytes[pos]) && bytes[pos] != b'=' {
            pos += 1;
        }
        if pos == name_start {
            return Err(AttributeError::MissingName(name_start));
        }
        let name = &input[name_start..pos];

        pos = skip_whitespace(bytes, pos);
        if bytes.get(pos) != Some(&b'=') {
            return Err(AttributeError::MissingValue(name.to_owned()));
        }
        pos = skip_whitespace(bytes, pos + 1);

        let quote = match bytes.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err(AttributeError::UnquotedValue(name.to_owned())),
        };
        let value_start = pos + 1;
        let Some(len) = memchr(quote, &bytes[value_start..]) else {
            return Err(AttributeError::UnclosedValue(name.to_owned()));
        };

        attrs.insert(name.to_owned(), input[value_start..value_start + len].to_owned());
        pos = value_start + len + 1;
    }

    Ok(attrs)
}

#[inline]
fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_whitespace(bytes[pos]) {
        pos += 1;
    }
    pos
}
