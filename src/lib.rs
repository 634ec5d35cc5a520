//! xmlflow - Streaming XML parsing with flow control
//!
//! A push tokenizer emits events synchronously as input arrives; the
//! bridges in this crate buffer those events and hand them to pull-based
//! consumers with backpressure in both directions.
//!
//! Surfaces:
//! A: Flow-controlled transform (`XmlTransform`, a `Sink` of chunks and a `Stream` of nodes)
//! B: Lazy node stream over an input stream (`xml_node_stream`)
//! C: Attribute enrichment for either (`NodeStreamExt::parse_attributes`)
//!
//! ```no_run
//! use futures::{stream, StreamExt};
//! use xmlflow::{xml_node_stream, NodeKind, NodeStreamExt, ParserOptions};
//!
//! # async fn run() -> xmlflow::Result<()> {
//! let chunks = stream::iter(vec![Ok::<_, std::io::Error>("<a x=\"1\">"), Ok("</a>")]);
//! let options = ParserOptions::new().include([NodeKind::TagOpen, NodeKind::TagClose]);
//! let mut nodes = xml_node_stream(options, chunks).parse_attributes().boxed();
//! while let Some(node) = nodes.next().await {
//!     println!("{:?}", node?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod enrich;
pub mod error;
pub mod generator;
pub mod node;
pub mod queue;
pub mod transform;

pub use crate::core::attributes::{parse_attrs, AttributeError, AttributeMap};
pub use crate::core::entities::parse_entities;
pub use crate::core::tokenizer::{ParseError, PushTokenizer, ScanHandler};
pub use enrich::{parse_attributes, NodeStreamExt, ParseAttributes};
pub use error::{BoxError, Error, Result};
pub use generator::xml_node_stream;
pub use node::{KindSet, Node, NodeKind, ParsedNode, ParserOptions, UnknownKind, AVAILABLE_NODES};
pub use queue::EventQueue;
pub use transform::{TransformOptions, TransformState, XmlTransform};
