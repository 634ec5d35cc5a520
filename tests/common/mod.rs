//! Test infrastructure for the streaming bridges
//!
//! Drives both bridges over the same chunked input so tests can compare
//! their output directly.

#![allow(dead_code)]

use futures::{stream, SinkExt, StreamExt};
use xmlflow::{xml_node_stream, Error, Node, Result, TransformOptions, XmlTransform};

/// Document exercising every node kind
pub const SAMPLE_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<head>
<!-- this is a comment -->
<title>XML Test File</title>
<selfclose />
<cdata-section><![CDATA[this is a c&data s<>ction]]></cdata-section>
<empty></empty>
<hasattrs first=\"one\" second=\"two\"  third=\"three \" />
<textarea> this\nis\na\r\n\ttextual\ncontent  </textarea>
<other attr=\"value\"></other>
</head>
";

/// Install a subscriber once; `RUST_LOG=xmlflow=trace` shows bridge transitions
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Split input into chunks of at most `size` bytes
pub fn chunked(input: &str, size: usize) -> Vec<Vec<u8>> {
    input
        .as_bytes()
        .chunks(size.max(1))
        .map(<[u8]>::to_vec)
        .collect()
}

/// Feed chunks through an `XmlTransform`, reading concurrently
///
/// Returns the writer's outcome and everything the reader saw.
pub async fn run_transform(
    options: impl Into<TransformOptions>,
    chunks: Vec<Vec<u8>>,
) -> (Result<()>, Vec<Result<Node>>) {
    let (mut sink, reader) = XmlTransform::new(options).split::<Vec<u8>>();
    let mut source = stream::iter(chunks.into_iter().map(Ok::<_, Error>));

    let writer = async move {
        sink.send_all(&mut source).await?;
        sink.close().await
    };
    futures::join!(writer, reader.collect::<Vec<_>>())
}

/// Pull every item from `xml_node_stream`
pub async fn run_stream(options: impl Into<TransformOptions>, chunks: Vec<Vec<u8>>) -> Vec<Result<Node>> {
    let source = stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));
    xml_node_stream(options, source).collect().await
}

/// Unwrap a result list that must not contain errors
pub fn nodes(items: Vec<Result<Node>>) -> Vec<Node> {
    items
        .into_iter()
        .map(|item| item.unwrap_or_else(|e| panic!("unexpected error: {e}")))
        .collect()
}

/// Tag-open with the self-closing flag set
pub fn flagged(name: &str, attrs: &str, self_closing: bool) -> Node {
    Node::TagOpen {
        name: name.into(),
        attrs: attrs.into(),
        self_closing: Some(self_closing),
    }
}
