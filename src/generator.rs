//! Pull-Driven Node Stream
//!
//! Lazily parses an input stream of byte chunks. Nothing is read from the
//! source until the consumer asks for the next node, and a chunk is only
//! requested once every node from the previous one has been yielded.
//! Dropping the stream drops the tokenizer, its event queue and the source.

use crate::core::tokenizer::PushTokenizer;
use crate::error::{BoxError, Error, Result};
use crate::node::Node;
use crate::queue::{Entry, EventQueue};
use crate::transform::TransformOptions;
use async_stream::try_stream;
use futures::{pin_mut, Stream, StreamExt};
use std::collections::vec_deque;
use tracing::{debug, trace};

/// Parse `source` into a stream of nodes
///
/// Ends with `Err(Error::Parse)` on malformed markup and with
/// `Err(Error::Source)` when the source itself fails.
pub fn xml_node_stream<S, B, E>(
    options: impl Into<TransformOptions>,
    source: S,
) -> impl Stream<Item = Result<Node>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
{
    let options = options.into();
    try_stream! {
        let mut tokenizer = options.tokenizer();
        pin_mut!(source);

        for entry in drain(&mut tokenizer) {
            yield entry?;
        }

        while let Some(chunk) = source.next().await {
            let chunk = chunk.map_err(|e| Error::Source(e.into()))?;
            if tokenizer.write(chunk.as_ref()) {
                for entry in drain(&mut tokenizer) {
                    yield entry?;
                }
                continue;
            }

            trace!(pending_bytes = tokenizer.buffered_len(), "tokenizer saturated");
            for entry in drain(&mut tokenizer) {
                yield entry?;
            }
            tokenizer.ready().await;
            for entry in drain(&mut tokenizer) {
                yield entry?;
            }
        }

        debug!("source exhausted, finalizing tokenizer");
        tokenizer.end();
        for entry in drain(&mut tokenizer) {
            yield entry?;
        }
    }
}

#[inline]
fn drain(tokenizer: &mut PushTokenizer<EventQueue>) -> vec_deque::IntoIter<Entry> {
    tokenizer.handler_mut().drain()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, ParserOptions};
    use futures::executor::block_on;
    use futures::stream;
    use std::io;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = io::Result<&'static str>> {
        stream::iter(parts.to_vec().into_iter().map(Ok))
    }

    #[test]
    fn test_end_to_end() {
        let options = ParserOptions::new().include([NodeKind::TagOpen, NodeKind::TagClose]);
        let nodes = block_on(
            xml_node_stream(options, chunks(&["<a x=\"1\"><b/>", "</a>"]))
                .map(|r| r.unwrap())
                .collect::<Vec<_>>(),
        );
        assert_eq!(
            nodes,
            vec![
                Node::tag_open("a", " x=\"1\""),
                Node::tag_open("b", ""),
                Node::tag_close("b"),
                Node::tag_close("a"),
            ]
        );
    }

    #[test]
    fn test_trailing_text_is_flushed() {
        let nodes = block_on(
            xml_node_stream(ParserOptions::new(), chunks(&["<a/>", "tail"]))
                .collect::<Vec<_>>(),
        );
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[2].as_ref().ok(), Some(&Node::text("tail")));
    }

    #[test]
    fn test_parse_error_ends_stream() {
        let items = block_on(
            xml_node_stream(ParserOptions::new(), chunks(&["<a>", "</b>", "<c/>"]))
                .collect::<Vec<_>>(),
        );
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(Error::Parse(_))));
    }

    #[test]
    fn test_source_error_ends_stream() {
        let source = stream::iter(vec![
            Ok("<a>"),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
            Ok("</a>"),
        ]);
        let items = block_on(xml_node_stream(ParserOptions::new(), source).collect::<Vec<_>>());
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(Error::Source(_))));
    }

    #[test]
    fn test_saturated_writes_are_worked_off() {
        let options = TransformOptions::new(ParserOptions::new().no_empty_text(true))
            .tokenizer_high_water_mark(3);
        let xml = "<root><item id=\"1\"/><item id=\"2\"/></root>";
        let nodes = block_on(
            xml_node_stream(options, chunks(&[xml]))
                .map(|r| r.unwrap())
                .collect::<Vec<_>>(),
        );
        assert_eq!(nodes.len(), 6);
        assert_eq!(nodes[5], Node::tag_close("root"));
    }
}
