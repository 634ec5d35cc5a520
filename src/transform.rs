//! Flow-Controlled Transform
//!
//! A byte-consuming, node-emitting stage with a bounded output buffer:
//! - `Sink<impl AsRef<[u8]>>` accepts input chunks
//! - `Stream<Item = Result<Node>>` yields nodes in document order
//!
//! The writer side is held back by two signals: tokenizer saturation (the
//! backlog is worked off one step per poll) and a full output buffer (the
//! writer parks until the reader takes a node). Records that do not fit in
//! the output buffer stay in the event queue and move over as room appears.
//!
//! Use [`StreamExt::split`](futures::StreamExt::split) to drive both halves
//! from different tasks.

use crate::core::tokenizer::{ParseError, PushTokenizer, DEFAULT_HIGH_WATER_MARK};
use crate::error::{Error, Result};
use crate::node::{Node, ParserOptions};
use crate::queue::EventQueue;
use futures::{ready, Sink, Stream};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use tracing::{debug, trace};

/// Default number of nodes the output buffer holds
pub const DEFAULT_OUTPUT_HIGH_WATER_MARK: usize = 16;

/// Configuration shared by both bridges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub parser: ParserOptions,
    /// Output buffer capacity in nodes (flow-controlled transform only)
    pub high_water_mark: usize,
    /// Bytes tokenized per write or readiness step
    pub tokenizer_high_water_mark: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            parser: ParserOptions::default(),
            high_water_mark: DEFAULT_OUTPUT_HIGH_WATER_MARK,
            tokenizer_high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }
}

impl TransformOptions {
    pub fn new(parser: ParserOptions) -> Self {
        TransformOptions {
            parser,
            ..Self::default()
        }
    }

    pub fn high_water_mark(mut self, nodes: usize) -> Self {
        self.high_water_mark = nodes;
        self
    }

    pub fn tokenizer_high_water_mark(mut self, bytes: usize) -> Self {
        self.tokenizer_high_water_mark = bytes;
        self
    }

    pub(crate) fn tokenizer(&self) -> PushTokenizer<EventQueue> {
        PushTokenizer::with_high_water_mark(
            EventQueue::new(&self.parser),
            self.tokenizer_high_water_mark,
        )
    }
}

impl From<ParserOptions> for TransformOptions {
    fn from(parser: ParserOptions) -> Self {
        TransformOptions::new(parser)
    }
}

/// Where the transform currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformState {
    /// Waiting for input
    Idle,
    /// Handing a chunk to the tokenizer
    Feeding,
    /// Moving queued records into the output buffer
    Draining,
    /// Tokenizer saturated; working off its backlog
    SuspendedOnInput,
    /// Output buffer full; waiting for the reader
    SuspendedOnOutput,
    /// End of input signalled; finalizing
    Flushing,
    /// All records forwarded after end of input
    Closed,
    /// Malformed input; no further input is processed
    Failed,
}

/// Flow-controlled XML transform
pub struct XmlTransform {
    tokenizer: PushTokenizer<EventQueue>,
    output: VecDeque<Node>,
    high_water_mark: usize,
    state: TransformState,
    failure: Option<ParseError>,
    failure_delivered: bool,
    ended: bool,
    reader: Option<Waker>,
    writer: Option<Waker>,
}

impl XmlTransform {
    pub fn new(options: impl Into<TransformOptions>) -> Self {
        let options = options.into();
        XmlTransform {
            tokenizer: options.tokenizer(),
            high_water_mark: options.high_water_mark.max(1),
            output: VecDeque::with_capacity(options.high_water_mark),
            state: TransformState::Idle,
            failure: None,
            failure_delivered: false,
            ended: false,
            reader: None,
            writer: None,
        }
    }

    pub fn state(&self) -> TransformState {
        self.state
    }

    /// Nodes waiting for the reader
    pub fn buffered_len(&self) -> usize {
        self.output.len()
    }

    /// Records produced by the tokenizer but not yet moved to the output
    pub fn pending(&self) -> usize {
        self.tokenizer.handler().len()
    }

    #[inline]
    fn output_full(&self) -> bool {
        self.output.len() >= self.high_water_mark
    }

    /// Move queued records into the output buffer while it has room
    fn forward(&mut self) {
        let before = self.output.len();
        while !self.output_full() && self.failure.is_none() {
            match self.tokenizer.handler_mut().pop() {
                Some(Ok(node)) => self.output.push_back(node),
                Some(Err(error)) => self.fail(error),
                None => break,
            }
        }
        if self.output.len() > before {
            trace!(forwarded = self.output.len() - before, buffered = self.output.len(), "forwarded nodes");
            wake(&mut self.reader);
        }
    }

    fn fail(&mut self, error: ParseError) {
        debug!(%error, "transform failed");
        self.state = TransformState::Failed;
        self.failure = Some(error);
        wake(&mut self.reader);
        wake(&mut self.writer);
    }

    fn check_failure(&self) -> Result<()> {
        match &self.failure {
            Some(error) => Err(Error::Parse(error.clone())),
            None => Ok(()),
        }
    }

    /// Forward records and work off the tokenizer backlog
    ///
    /// Ready once the backlog and the event queue are both empty. With
    /// `need_room` the output buffer must also have space for more.
    fn poll_drive(&mut self, cx: &mut Context<'_>, need_room: bool) -> Poll<Result<()>> {
        loop {
            self.forward();
            self.check_failure()?;

            let queued = !self.tokenizer.handler().is_empty();
            if queued || (need_room && self.output_full()) {
                if self.state != TransformState::SuspendedOnOutput {
                    trace!(buffered = self.output.len(), queued = self.pending(), "waiting for reader");
                }
                self.state = TransformState::SuspendedOnOutput;
                self.writer = Some(cx.waker().clone());
                return Poll::Pending;
            }

            if self.tokenizer.is_saturated() {
                self.state = TransformState::SuspendedOnInput;
                ready!(self.tokenizer.poll_ready(cx));
                trace!("tokenizer ready");
                continue;
            }

            if !self.ended {
                self.state = TransformState::Idle;
            }
            return Poll::Ready(Ok(()));
        }
    }
}

#[inline]
fn wake(waker: &mut Option<Waker>) {
    if let Some(waker) = waker.take() {
        waker.wake();
    }
}

impl<T: AsRef<[u8]>> Sink<T> for XmlTransform {
    type Error = Error;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();
        if this.ended && this.failure.is_none() {
            return Poll::Ready(Err(Error::Closed));
        }
        this.poll_drive(cx, true)
    }

    fn start_send(self: Pin<&mut Self>, item: T) -> Result<()> {
        let this = self.get_mut();
        this.check_failure()?;
        if this.ended {
            return Err(Error::Closed);
        }

        this.state = TransformState::Feeding;
        if !this.tokenizer.write(item.as_ref()) {
            debug!(pending_bytes = this.tokenizer.buffered_len(), "tokenizer saturated");
        }

        this.state = TransformState::Draining;
        this.forward();
        this.check_failure()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.get_mut().poll_drive(cx, false)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();
        loop {
            ready!(this.poll_drive(cx, false))?;
            if this.ended {
                break;
            }

            debug!("end of input, finalizing tokenizer");
            this.ended = true;
            this.state = TransformState::Flushing;
            this.tokenizer.end();
        }

        if this.state != TransformState::Closed {
            trace!(buffered = this.output.len(), "transform closed");
            this.state = TransformState::Closed;
            wake(&mut this.reader);
        }
        Poll::Ready(Ok(()))
    }
}

impl Stream for XmlTransform {
    type Item = Result<Node>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // records left in the queue after a write move as soon as room frees up
        this.forward();
        if let Some(node) = this.output.pop_front() {
            wake(&mut this.writer);
            return Poll::Ready(Some(Ok(node)));
        }

        if let Some(error) = &this.failure {
            if this.failure_delivered {
                return Poll::Ready(None);
            }
            this.failure_delivered = true;
            return Poll::Ready(Some(Err(Error::Parse(error.clone()))));
        }

        if this.state == TransformState::Closed {
            return Poll::Ready(None);
        }

        this.reader = Some(cx.waker().clone());
        Poll::Pending
    }
}
