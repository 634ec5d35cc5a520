//! Push Tokenizer - Incremental XML event emitter
//!
//! Accepts input in arbitrarily sized chunks and reports every construct to
//! a [`ScanHandler`] as soon as it is fully delimited:
//! - Element start/end tags (start tags carry the raw attribute string)
//! - Text content
//! - CDATA sections
//! - Comments
//! - Processing instructions
//!
//! Events are raw: entity references are not decoded and attribute strings
//! are not split. Input beyond the high-water mark goes into a backlog; the
//! tokenizer then reports saturation from [`PushTokenizer::write`] and works
//! the backlog off one step per [`PushTokenizer::poll_ready`].

use super::scanner::{is_whitespace, Scanner};
use std::future::poll_fn;
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::{debug, trace};

/// Default number of bytes tokenized per write or readiness step
pub const DEFAULT_HIGH_WATER_MARK: usize = 16 * 1024;

/// Malformed input, reported once through [`ScanHandler::error`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {position}")]
pub struct ParseError {
    /// Human-readable description
    pub message: String,
    /// Byte offset in the whole input stream
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

/// Trait for handling tokenizer events
///
/// The tokenizer calls these methods synchronously from inside `write`,
/// `poll_ready` and `end`. Borrowed strings are only valid for the call.
pub trait ScanHandler {
    /// Called when an element starts
    ///
    /// # Arguments
    /// * `name` - Element name
    /// * `attrs` - Raw attribute string, everything between the name and `>` or `/>`
    /// * `self_closing` - True for `<name/>`
    fn tag_open(&mut self, name: &str, attrs: &str, self_closing: bool);

    /// Called when an explicit end tag is found
    fn tag_close(&mut self, name: &str);

    /// Called for text content (never empty)
    fn text(&mut self, contents: &str);

    /// Called for CDATA sections
    ///
    /// # Arguments
    /// * `contents` - Content excluding `<![CDATA[` and `]]>`
    fn cdata(&mut self, contents: &str);

    /// Called for comments
    ///
    /// # Arguments
    /// * `contents` - Content excluding `<!--` and `-->`
    fn comment(&mut self, contents: &str);

    /// Called for processing instructions, including the XML declaration
    ///
    /// # Arguments
    /// * `contents` - Content excluding `<?` and `?>`
    fn processing_instruction(&mut self, contents: &str);

    /// Called once when the input turns out to be malformed
    fn error(&mut self, error: ParseError);

    /// Called for DOCTYPE (optional, default does nothing)
    fn doctype(&mut self, _contents: &str) {}
}

/// Current tokenizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Ready for more input
    Accepting,
    /// Backlog pending; wait for `ready` before writing more
    Saturated,
    /// `end` was called
    Ended,
    /// Malformed input seen; everything further is ignored
    Failed,
}

/// Incremental tokenizer driving a [`ScanHandler`]
///
/// The handler is attached by constructing the tokenizer around it and
/// detached with [`PushTokenizer::into_handler`].
pub struct PushTokenizer<H> {
    handler: H,
    /// Admitted bytes not yet consumed by a complete construct
    buffer: Vec<u8>,
    /// Written bytes not yet admitted
    backlog: Vec<u8>,
    backlog_pos: usize,
    high_water_mark: usize,
    /// Stream offset of `buffer[0]`
    offset: usize,
    /// Names of open elements
    stack: Vec<String>,
    ended: bool,
    error: Option<ParseError>,
}

impl<H: ScanHandler> PushTokenizer<H> {
    /// Create a tokenizer with the default high-water mark
    pub fn new(handler: H) -> Self {
        Self::with_high_water_mark(handler, DEFAULT_HIGH_WATER_MARK)
    }

    /// Create a tokenizer that admits at most `high_water_mark` bytes per step
    pub fn with_high_water_mark(handler: H, high_water_mark: usize) -> Self {
        PushTokenizer {
            handler,
            buffer: Vec::new(),
            backlog: Vec::new(),
            backlog_pos: 0,
            high_water_mark: high_water_mark.max(1),
            offset: 0,
            stack: Vec::new(),
            ended: false,
            error: None,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Detach the handler
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// The failure reported to the handler, if any
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    pub fn state(&self) -> ParseState {
        if self.error.is_some() {
            ParseState::Failed
        } else if self.ended {
            ParseState::Ended
        } else if self.is_saturated() {
            ParseState::Saturated
        } else {
            ParseState::Accepting
        }
    }

    /// True while written input is waiting in the backlog
    #[inline]
    pub fn is_saturated(&self) -> bool {
        self.backlog_pos < self.backlog.len()
    }

    /// Bytes written but not yet turned into events
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.backlog.len() - self.backlog_pos
    }

    /// Feed a chunk of input
    ///
    /// Tokenizes up to one high-water mark of input before returning.
    /// Returns false when input is left in the backlog; the caller should
    /// then wait for [`ready`](Self::ready) before writing again.
    pub fn write(&mut self, chunk: &[u8]) -> bool {
        if self.error.is_some() {
            return true;
        }
        if self.ended {
            let position = self.stream_position();
            self.fail(ParseError::new("Write after end", position));
            return true;
        }

        self.backlog.extend_from_slice(chunk);
        self.admit();

        let accepted = !self.is_saturated();
        if !accepted {
            trace!(backlog = self.backlog.len() - self.backlog_pos, "tokenizer saturated");
        }
        accepted
    }

    /// Process one backlog step; ready once the backlog is empty
    pub fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if !self.is_saturated() {
            return Poll::Ready(());
        }

        self.admit();
        if self.is_saturated() {
            cx.waker().wake_by_ref();
            Poll::Pending
        } else {
            trace!("tokenizer drained its backlog");
            Poll::Ready(())
        }
    }

    /// Wait until the backlog has been tokenized
    pub async fn ready(&mut self) {
        poll_fn(|cx| self.poll_ready(cx)).await
    }

    /// Signal end of input
    ///
    /// Tokenizes whatever is left, emits trailing text and reports
    /// unterminated constructs or unclosed elements as an error.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        while self.is_saturated() {
            self.admit();
        }
        if self.error.is_some() {
            return;
        }

        self.tokenize(true);
        if self.error.is_none() && !self.stack.is_empty() {
            let message = format!("Unclosed tags: {}", self.stack.join(", "));
            let position = self.stream_position();
            self.fail(ParseError::new(message, position));
        }
    }

    #[inline]
    fn stream_position(&self) -> usize {
        self.offset + self.buffer.len()
    }

    /// Move one high-water mark of backlog into the buffer and tokenize it
    fn admit(&mut self) {
        let remaining = &self.backlog[self.backlog_pos..];
        let take = remaining.len().min(self.high_water_mark);
        self.buffer.extend_from_slice(&remaining[..take]);
        self.backlog_pos += take;
        if self.backlog_pos == self.backlog.len() {
            self.backlog.clear();
            self.backlog_pos = 0;
        }

        self.tokenize(false);
    }

    fn tokenize(&mut self, at_eof: bool) {
        if self.error.is_some() {
            return;
        }

        let mut pass = Pass {
            scanner: Scanner::new(&self.buffer),
            handler: &mut self.handler,
            stack: &mut self.stack,
            at_eof,
        };
        let outcome = pass.run();
        let consumed = pass.scanner.position();

        match outcome {
            Ok(()) => {
                self.buffer.drain(..consumed);
                self.offset += consumed;
            }
            Err(mut error) => {
                error.position += self.offset;
                self.fail(error);
            }
        }
    }

    fn fail(&mut self, error: ParseError) {
        if self.error.is_some() {
            return;
        }
        debug!(position = error.position, message = %error.message, "tokenizer failed");

        self.buffer.clear();
        self.backlog.clear();
        self.backlog_pos = 0;
        self.stack.clear();
        self.error = Some(error.clone());
        self.handler.error(error);
    }
}

/// One tokenizing sweep over the admitted buffer
///
/// Every construct method returns `Ok(true)` when it consumed something,
/// `Ok(false)` when the construct is not complete yet (position unchanged)
/// and `Err` for malformed input. Error positions are buffer-relative.
struct Pass<'a, 'h, H> {
    scanner: Scanner<'a>,
    handler: &'h mut H,
    stack: &'h mut Vec<String>,
    at_eof: bool,
}

impl<'a, H: ScanHandler> Pass<'a, '_, H> {
    fn run(&mut self) -> Result<(), ParseError> {
        while !self.scanner.is_eof() {
            let progressed = match self.scanner.peek() {
                Some(b'<') => self.markup()?,
                _ => self.text()?,
            };
            if !progressed {
                break;
            }
        }
        Ok(())
    }

    fn incomplete(&mut self, message: &str, start: usize) -> Result<bool, ParseError> {
        self.scanner.set_position(start);
        if self.at_eof {
            Err(ParseError::new(message, start))
        } else {
            Ok(false)
        }
    }

    fn text(&mut self) -> Result<bool, ParseError> {
        let start = self.scanner.position();
        let end = match self.scanner.find_tag_start() {
            Some(end) => end,
            None if self.at_eof => self.scanner.len(),
            None => return Ok(false),
        };

        let contents = utf8(self.scanner.slice(start, end), start)?;
        self.handler.text(contents);
        self.scanner.set_position(end);
        Ok(true)
    }

    fn markup(&mut self) -> Result<bool, ParseError> {
        let start = self.scanner.position();
        match self.scanner.peek_at(1) {
            None => self.incomplete("Unclosed tag", start),
            Some(b'/') => self.end_tag(start),
            Some(b'!') => self.declaration(start),
            Some(b'?') => self.delimited(
                start,
                2,
                b"?>",
                "Unclosed processing instruction",
                H::processing_instruction,
            ),
            Some(_) => self.start_tag(start),
        }
    }

    fn declaration(&mut self, start: usize) -> Result<bool, ParseError> {
        const COMMENT: &[u8] = b"<!--";
        const CDATA: &[u8] = b"<![CDATA[";
        const DOCTYPE: &[u8] = b"<!DOCTYPE";

        let rest = self.scanner.remaining();
        if rest.starts_with(COMMENT) {
            self.delimited(start, COMMENT.len(), b"-->", "Unclosed comment", H::comment)
        } else if rest.starts_with(CDATA) {
            self.delimited(start, CDATA.len(), b"]]>", "Unclosed CDATA section", H::cdata)
        } else if rest.starts_with(DOCTYPE) {
            self.doctype(start, DOCTYPE.len())
        } else if !self.at_eof && [COMMENT, CDATA, DOCTYPE].iter().any(|p| p.starts_with(rest)) {
            Ok(false)
        } else {
            Err(ParseError::new("Unrecognized sequence: <!", start))
        }
    }

    /// Construct with fixed opening and closing delimiters
    fn delimited(
        &mut self,
        start: usize,
        open_len: usize,
        close: &[u8],
        unclosed: &str,
        emit: fn(&mut H, &str),
    ) -> Result<bool, ParseError> {
        self.scanner.set_position(start + open_len);
        let Some(end) = self.scanner.find_sequence(close) else {
            return self.incomplete(unclosed, start);
        };

        let contents = utf8(self.scanner.slice(start + open_len, end), start)?;
        emit(&mut *self.handler, contents);
        self.scanner.set_position(end + close.len());
        Ok(true)
    }

    fn doctype(&mut self, start: usize, open_len: usize) -> Result<bool, ParseError> {
        self.scanner.set_position(start + open_len);
        let Some(end) = self.scanner.find_declaration_end() else {
            return self.incomplete("Unclosed DOCTYPE", start);
        };

        let contents = utf8(self.scanner.slice(start + open_len, end), start)?;
        self.handler.doctype(contents.trim());
        self.scanner.set_position(end + 1);
        Ok(true)
    }

    fn end_tag(&mut self, start: usize) -> Result<bool, ParseError> {
        self.scanner.set_position(start + 2);
        let Some(gt) = self.scanner.find_byte(b'>') else {
            return self.incomplete("Unclosed tag", start);
        };

        let name = utf8(self.scanner.slice(start + 2, gt), start)?.trim();
        match self.stack.pop() {
            Some(open) if open == name => {}
            Some(open) => {
                return Err(ParseError::new(
                    format!("Mismatched closing tag </{name}>, expected </{open}>"),
                    start,
                ))
            }
            None => {
                return Err(ParseError::new(
                    format!("Unexpected closing tag </{name}>"),
                    start,
                ))
            }
        }

        self.handler.tag_close(name);
        self.scanner.set_position(gt + 1);
        Ok(true)
    }

    fn start_tag(&mut self, start: usize) -> Result<bool, ParseError> {
        self.scanner.set_position(start + 1);
        let Some(gt) = self.scanner.find_tag_end_quoted() else {
            return self.incomplete("Unclosed tag", start);
        };

        let inner = self.scanner.slice(start + 1, gt);
        let (body, self_closing) = match inner.split_last() {
            Some((b'/', body)) => (body, true),
            _ => (inner, false),
        };

        let name_len = body
            .iter()
            .position(|&b| is_whitespace(b) || b == b'/')
            .unwrap_or(body.len());
        if name_len == 0 {
            return Err(ParseError::new("Tag name expected", start));
        }

        let name = utf8(&body[..name_len], start)?;
        let attrs = utf8(&body[name_len..], start)?;
        self.handler.tag_open(name, attrs, self_closing);
        if !self_closing {
            self.stack.push(name.to_owned());
        }

        self.scanner.set_position(gt + 1);
        Ok(true)
    }
}

#[inline]
fn utf8(bytes: &[u8], position: usize) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|_| ParseError::new("Invalid UTF-8 sequence", position))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every callback as a short line
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ScanHandler for Recorder {
        fn tag_open(&mut self, name: &str, attrs: &str, self_closing: bool) {
            self.events
                .push(format!("open {name} [{attrs}] {self_closing}"));
        }
        fn tag_close(&mut self, name: &str) {
            self.events.push(format!("close {name}"));
        }
        fn text(&mut self, contents: &str) {
            self.events.push(format!("text [{contents}]"));
        }
        fn cdata(&mut self, contents: &str) {
            self.events.push(format!("cdata [{contents}]"));
        }
        fn comment(&mut self, contents: &str) {
            self.events.push(format!("comment [{contents}]"));
        }
        fn processing_instruction(&mut self, contents: &str) {
            self.events.push(format!("pi [{contents}]"));
        }
        fn error(&mut self, error: ParseError) {
            self.events.push(format!("error {}", error.message));
        }
    }

    fn tokenize_chunks(chunks: &[&str]) -> Vec<String> {
        let mut tokenizer = PushTokenizer::new(Recorder::default());
        for chunk in chunks {
            tokenizer.write(chunk.as_bytes());
        }
        tokenizer.end();
        tokenizer.into_handler().events
    }

    #[test]
    fn test_simple_document() {
        let events = tokenize_chunks(&["<?xml version=\"1.0\"?><a x=\"1\">hi<b/></a>"]);
        assert_eq!(
            events,
            vec![
                "pi [xml version=\"1.0\"]",
                "open a [ x=\"1\"] false",
                "text [hi]",
                "open b [] true",
                "close a",
            ]
        );
    }

    #[test]
    fn test_self_closing_keeps_space() {
        let events = tokenize_chunks(&["<r><selfclose /></r>"]);
        assert_eq!(events[1], "open selfclose [ ] true");
    }

    #[test]
    fn test_chunk_boundaries_inside_constructs() {
        let whole = tokenize_chunks(&["<a><!-- c --><![CDATA[x<y]]>text</a>"]);
        let split = tokenize_chunks(&["<", "a><!", "-", "- c -", "-><![CD", "ATA[x<y]", "]>te", "xt</", "a>"]);
        assert_eq!(whole, split);
        assert_eq!(
            whole,
            vec![
                "open a [] false",
                "comment [ c ]",
                "cdata [x<y]",
                "text [text]",
                "close a",
            ]
        );
    }

    #[test]
    fn test_text_is_held_until_delimited() {
        let mut tokenizer = PushTokenizer::new(Recorder::default());
        tokenizer.write(b"<a>par");
        assert_eq!(tokenizer.handler().events, vec!["open a [] false"]);
        tokenizer.write(b"tial</a>tail");
        assert_eq!(tokenizer.handler().events.len(), 3);
        tokenizer.end();
        assert_eq!(
            tokenizer.into_handler().events,
            vec!["open a [] false", "text [partial]", "close a", "text [tail]"]
        );
    }

    #[test]
    fn test_quoted_gt_in_attribute() {
        let events = tokenize_chunks(&["<a title=\"x > y\"></a>"]);
        assert_eq!(events[0], "open a [ title=\"x > y\"] false");
    }

    #[test]
    fn test_doctype_is_skipped() {
        let events = tokenize_chunks(&["<!DOCTYPE note [<!ELEMENT note (#PCDATA)>]><note/>"]);
        assert_eq!(events, vec!["open note [] true"]);
    }

    #[test]
    fn test_mismatched_close_fails() {
        let events = tokenize_chunks(&["<a><b></a><c/>"]);
        assert_eq!(
            events,
            vec![
                "open a [] false",
                "open b [] false",
                "error Mismatched closing tag </a>, expected </b>",
            ]
        );
    }

    #[test]
    fn test_unclosed_constructs_at_end() {
        assert_eq!(
            tokenize_chunks(&["<a><!-- never"]).last().map(String::as_str),
            Some("error Unclosed comment")
        );
        assert_eq!(
            tokenize_chunks(&["<a><b>"]).last().map(String::as_str),
            Some("error Unclosed tags: a, b")
        );
        assert_eq!(
            tokenize_chunks(&["<a"]).last().map(String::as_str),
            Some("error Unclosed tag")
        );
    }

    #[test]
    fn test_unknown_declaration() {
        let events = tokenize_chunks(&["<!ELEMENT x>"]);
        assert_eq!(events, vec!["error Unrecognized sequence: <!"]);
    }

    #[test]
    fn test_error_position_is_absolute() {
        let mut tokenizer = PushTokenizer::new(Recorder::default());
        tokenizer.write(b"<a>0123456789");
        tokenizer.write(b"</b>");
        let error = tokenizer.error().cloned();
        assert_eq!(error, Some(ParseError::new("Mismatched closing tag </b>, expected </a>", 13)));
        assert_eq!(tokenizer.state(), ParseState::Failed);
    }

    #[test]
    fn test_failed_tokenizer_ignores_input() {
        let mut tokenizer = PushTokenizer::new(Recorder::default());
        tokenizer.write(b"</x>");
        tokenizer.write(b"<a>text</a>");
        tokenizer.end();
        assert_eq!(tokenizer.into_handler().events, vec!["error Unexpected closing tag </x>"]);
    }

    #[test]
    fn test_invalid_utf8() {
        let mut tokenizer = PushTokenizer::new(Recorder::default());
        tokenizer.write(b"<a>\xff\xfe</a>");
        assert_eq!(
            tokenizer.into_handler().events,
            vec!["open a [] false", "error Invalid UTF-8 sequence"]
        );
    }

    #[test]
    fn test_saturation_and_ready() {
        let mut tokenizer = PushTokenizer::with_high_water_mark(Recorder::default(), 4);
        let accepted = tokenizer.write(b"<a>one</a>");
        assert!(!accepted);
        assert_eq!(tokenizer.state(), ParseState::Saturated);
        assert_eq!(tokenizer.handler().events, vec!["open a [] false"]);

        futures::executor::block_on(tokenizer.ready());
        assert_eq!(tokenizer.state(), ParseState::Accepting);
        assert_eq!(tokenizer.buffered_len(), 0);
        assert_eq!(
            tokenizer.handler().events,
            vec!["open a [] false", "text [one]", "close a"]
        );
    }

    #[test]
    fn test_write_after_end() {
        let mut tokenizer = PushTokenizer::new(Recorder::default());
        tokenizer.end();
        tokenizer.write(b"<a/>");
        assert_eq!(tokenizer.into_handler().events, vec!["error Write after end"]);
    }
}
