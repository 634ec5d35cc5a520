//! Event Queue
//!
//! Implements ScanHandler to turn tokenizer callbacks into [`Node`] records
//! held in FIFO order until a bridge drains them.
//!
//! The interest configuration is resolved once into a table of plain
//! function pointers, one per event kind. A kind that is not of interest has
//! no listener at all, so the callback returns without allocating.

use crate::core::tokenizer::{ParseError, ScanHandler};
use crate::node::{is_blank, Node, NodeKind, ParserOptions};
use std::collections::vec_deque::{self, VecDeque};
use tracing::warn;

/// Queued record: a node, or the failure that ends the parse
pub type Entry = Result<Node, ParseError>;

type Queue = VecDeque<Entry>;
type TagOpenListener = fn(&mut Queue, &str, &str, bool);
type Listener = fn(&mut Queue, &str);

/// Per-kind listeners derived from [`ParserOptions`]
#[derive(Clone, Copy)]
struct Listeners {
    tag_open: Option<TagOpenListener>,
    tag_close: Option<Listener>,
    text: Option<Listener>,
    cdata: Option<Listener>,
    comment: Option<Listener>,
    processing_instruction: Option<Listener>,
}

impl Listeners {
    fn new(options: &ParserOptions) -> Self {
        let kinds = options.kinds();
        let wanted = |kind: NodeKind, listener: Listener| kinds.contains(kind).then_some(listener);

        // Synthetic closes exist only for consumers that want closes at all.
        let synthesize_close = kinds.contains(NodeKind::TagClose);
        let tag_open = kinds.contains(NodeKind::TagOpen).then(|| {
            match (synthesize_close, options.reports_self_closing()) {
                (false, false) => open as TagOpenListener,
                (false, true) => open_flagged,
                (true, false) => open_then_close,
                (true, true) => open_flagged_then_close,
            }
        });

        let text_listener: Listener = if options.suppresses_empty_text() {
            non_blank_text
        } else {
            text
        };

        Listeners {
            tag_open,
            tag_close: wanted(NodeKind::TagClose, close),
            text: wanted(NodeKind::Text, text_listener),
            cdata: wanted(NodeKind::CData, cdata),
            comment: wanted(NodeKind::Comment, comment),
            processing_instruction: wanted(NodeKind::ProcessingInstruction, processing_instruction),
        }
    }
}

fn open(queue: &mut Queue, name: &str, attrs: &str, _self_closing: bool) {
    queue.push_back(Ok(Node::tag_open(name, attrs)));
}

fn open_flagged(queue: &mut Queue, name: &str, attrs: &str, self_closing: bool) {
    queue.push_back(Ok(Node::TagOpen {
        name: name.to_owned(),
        attrs: attrs.to_owned(),
        self_closing: Some(self_closing),
    }));
}

fn open_then_close(queue: &mut Queue, name: &str, attrs: &str, self_closing: bool) {
    open(queue, name, attrs, self_closing);
    if self_closing {
        close(queue, name);
    }
}

fn open_flagged_then_close(queue: &mut Queue, name: &str, attrs: &str, self_closing: bool) {
    open_flagged(queue, name, attrs, self_closing);
    if self_closing {
        close(queue, name);
    }
}

fn close(queue: &mut Queue, name: &str) {
    queue.push_back(Ok(Node::tag_close(name)));
}

fn text(queue: &mut Queue, contents: &str) {
    queue.push_back(Ok(Node::text(contents)));
}

fn non_blank_text(queue: &mut Queue, contents: &str) {
    if !is_blank(contents) {
        text(queue, contents);
    }
}

fn cdata(queue: &mut Queue, contents: &str) {
    queue.push_back(Ok(Node::CData(contents.to_owned())));
}

fn comment(queue: &mut Queue, contents: &str) {
    queue.push_back(Ok(Node::Comment(contents.to_owned())));
}

fn processing_instruction(queue: &mut Queue, contents: &str) {
    queue.push_back(Ok(Node::ProcessingInstruction(contents.to_owned())));
}

/// Handler that queues the events of interest
///
/// Attach it by building a [`PushTokenizer`](crate::core::tokenizer::PushTokenizer)
/// around it; every write, readiness step or end call may append entries.
/// Callers take them out with [`drain`](Self::drain) between tokenizer calls.
pub struct EventQueue {
    listeners: Listeners,
    queue: Queue,
}

impl EventQueue {
    pub fn new(options: &ParserOptions) -> Self {
        EventQueue {
            listeners: Listeners::new(options),
            queue: VecDeque::with_capacity(64),
        }
    }

    /// Take every queued entry in arrival order, leaving the queue empty
    pub fn drain(&mut self) -> vec_deque::IntoIter<Entry> {
        std::mem::take(&mut self.queue).into_iter()
    }

    /// Take the oldest entry
    pub(crate) fn pop(&mut self) -> Option<Entry> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl ScanHandler for EventQueue {
    #[inline]
    fn tag_open(&mut self, name: &str, attrs: &str, self_closing: bool) {
        if let Some(listener) = self.listeners.tag_open {
            listener(&mut self.queue, name, attrs, self_closing);
        }
    }

    #[inline]
    fn tag_close(&mut self, name: &str) {
        if let Some(listener) = self.listeners.tag_close {
            listener(&mut self.queue, name);
        }
    }

    #[inline]
    fn text(&mut self, contents: &str) {
        if let Some(listener) = self.listeners.text {
            listener(&mut self.queue, contents);
        }
    }

    #[inline]
    fn cdata(&mut self, contents: &str) {
        if let Some(listener) = self.listeners.cdata {
            listener(&mut self.queue, contents);
        }
    }

    #[inline]
    fn comment(&mut self, contents: &str) {
        if let Some(listener) = self.listeners.comment {
            listener(&mut self.queue, contents);
        }
    }

    #[inline]
    fn processing_instruction(&mut self, contents: &str) {
        if let Some(listener) = self.listeners.processing_instruction {
            listener(&mut self.queue, contents);
        }
    }

    fn error(&mut self, error: ParseError) {
        self.queue.push_back(Err(error));
    }
}

impl Drop for EventQueue {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            warn!(pending = self.queue.len(), "event queue dropped with undrained entries");
        }
    }
}
