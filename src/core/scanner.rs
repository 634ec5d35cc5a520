//! Delimiter search over the tokenizer's admitted bytes
//!
//! A `Scanner` is a cursor over one step's worth of pending input. Searches
//! report absolute offsets into that slice; `None` means the construct is
//! not complete yet and the tokenizer keeps the bytes for the next write.

use memchr::{memchr, memmem};

/// Cursor over pending tokenizer input
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Start at offset 0 of `input`
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Offset of the cursor within the pending bytes
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor, e.g. past a construct that was just emitted
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Pending bytes in this step
    #[inline]
    pub fn len(&self) -> usize {
        self.input.len()
    }

    /// Nothing left to tokenize in this step
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.input[start..end]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Byte `offset` past the cursor, if it has arrived
    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Next `<`; everything before it is text
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', &self.input[self.pos..]).map(|i| self.pos + i)
    }

    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, &self.input[self.pos..]).map(|i| self.pos + i)
    }

    /// Next `-->`, `]]>` or `?>` style terminator
    #[inline]
    pub fn find_sequence(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(&self.input[self.pos..], needle).map(|i| self.pos + i)
    }

    /// The `>` ending a start or end tag
    ///
    /// A `>` inside a quoted attribute value does not count.
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut quote: Option<u8> = None;
        for (i, &b) in self.remaining().iter().enumerate() {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'>') => return Some(self.pos + i),
                _ => {}
            }
        }
        None
    }

    /// The `>` ending `<!DOCTYPE ...>`, past any `[...]` subset and quoted literal
    pub fn find_declaration_end(&self) -> Option<usize> {
        let mut pos = self.pos;
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;

        while pos < self.input.len() {
            let b = self.input[pos];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'[' => depth += 1,
                    b']' => depth = depth.saturating_sub(1),
                    b'>' if depth == 0 => return Some(pos),
                    _ => {}
                },
            }
            pos += 1;
        }
        None
    }
}

/// XML `S` production: space, tab, newline, carriage return
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}
