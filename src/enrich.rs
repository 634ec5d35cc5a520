//! Attribute Enrichment
//!
//! Replaces the raw attribute string of every tag-open record with a parsed
//! [`AttributeMap`](crate::core::attributes::AttributeMap). Works on the
//! output of either bridge; all other records pass through untouched and in
//! order.

use crate::error::{Error, Result};
use crate::node::{Node, ParsedNode};
use futures::{ready, Stream};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Stream returned by [`parse_attributes`]
    ///
    /// Ends after the first error, whether it came from upstream or from a
    /// malformed attribute string.
    #[must_use = "streams do nothing unless polled"]
    pub struct ParseAttributes<S> {
        #[pin]
        inner: S,
        done: bool,
    }
}

/// Parse the attributes of every tag-open record in `stream`
pub fn parse_attributes<S>(stream: S) -> ParseAttributes<S>
where
    S: Stream<Item = Result<Node>>,
{
    ParseAttributes {
        inner: stream,
        done: false,
    }
}

impl<S> Stream for ParseAttributes<S>
where
    S: Stream<Item = Result<Node>>,
{
    type Item = Result<ParsedNode>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }

        let item = match ready!(this.inner.poll_next(cx)) {
            Some(entry) => entry.and_then(|node| node.parse_attributes().map_err(Error::from)),
            None => {
                *this.done = true;
                return Poll::Ready(None);
            }
        };
        if item.is_err() {
            *this.done = true;
        }
        Poll::Ready(Some(item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            self.inner.size_hint()
        }
    }
}

/// Extension methods for streams of nodes
pub trait NodeStreamExt: Stream<Item = Result<Node>> + Sized {
    /// See [`parse_attributes`]
    fn parse_attributes(self) -> ParseAttributes<Self> {
        parse_attributes(self)
    }
}

impl<S: Stream<Item = Result<Node>>> NodeStreamExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attributes::{AttributeError, AttributeMap};
    use futures::executor::block_on;
    use futures::{stream, StreamExt};

    fn map(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_tag_open_attrs_are_parsed() {
        let source = stream::iter(vec![
            Ok(Node::tag_open("hasattrs", " first=\"one\" second=\"two\"  third=\"three \" ")),
            Ok(Node::text("\n")),
            Ok(Node::tag_open("emptyattrs", " ")),
        ]);
        let nodes: Vec<_> = block_on(source.parse_attributes().collect::<Vec<_>>())
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(
            nodes,
            vec![
                Node::TagOpen {
                    name: "hasattrs".into(),
                    attrs: map(&[("first", "one"), ("second", "two"), ("third", "three ")]),
                    self_closing: None,
                },
                Node::Text("\n".into()),
                Node::TagOpen {
                    name: "emptyattrs".into(),
                    attrs: AttributeMap::new(),
                    self_closing: None,
                },
            ]
        );
    }

    #[test]
    fn test_malformed_attrs_end_stream() {
        let source = stream::iter(vec![
            Ok(Node::tag_open("a", " x=1")),
            Ok(Node::tag_close("a")),
        ]);
        let items = block_on(parse_attributes(source).collect::<Vec<_>>());
        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            Err(Error::Attribute(AttributeError::UnquotedValue(name))) if name == "x"
        ));
    }

    #[test]
    fn test_upstream_error_passes_through() {
        let source = stream::iter(vec![
            Ok(Node::text("x")),
            Err(Error::Closed),
            Ok(Node::text("y")),
        ]);
        let items = block_on(parse_attributes(source).collect::<Vec<_>>());
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(Error::Closed)));
    }
}
