//! Node Types
//!
//! Defines the records produced by both streaming bridges, the kinds used
//! to select them and the interest configuration.

use crate::core::attributes::{parse_attrs, AttributeError, AttributeMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One parse event
///
/// `A` is the attribute payload of tag-open records: the raw attribute
/// string as tokenized, or an [`AttributeMap`] after enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<A = String> {
    /// Start of an element
    TagOpen {
        /// Element name
        name: String,
        /// Attributes, raw or parsed
        attrs: A,
        /// Set only when self-closing reporting is enabled
        self_closing: Option<bool>,
    },

    /// End of an element, explicit or synthesized for `<name/>`
    TagClose {
        /// Element name
        name: String,
    },

    /// Text content, entities not decoded
    Text(String),

    /// CDATA section content (excluding markers)
    CData(String),

    /// Comment content (excluding markers)
    Comment(String),

    /// Processing instruction content (excluding `<?` and `?>`)
    ProcessingInstruction(String),
}

/// Tag-open records carry a parsed attribute map
pub type ParsedNode = Node<AttributeMap>;

impl<A> Node<A> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::TagOpen { .. } => NodeKind::TagOpen,
            Node::TagClose { .. } => NodeKind::TagClose,
            Node::Text(_) => NodeKind::Text,
            Node::CData(_) => NodeKind::CData,
            Node::Comment(_) => NodeKind::Comment,
            Node::ProcessingInstruction(_) => NodeKind::ProcessingInstruction,
        }
    }

    /// Element name for tag records
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::TagOpen { name, .. } | Node::TagClose { name } => Some(name),
            _ => None,
        }
    }

    /// Contents of text-like records
    pub fn contents(&self) -> Option<&str> {
        match self {
            Node::Text(s) | Node::CData(s) | Node::Comment(s) | Node::ProcessingInstruction(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    /// Attributes of a tag-open record
    pub fn attrs(&self) -> Option<&A> {
        match self {
            Node::TagOpen { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    /// Replace the attribute payload, consuming the record
    pub fn try_map_attrs<B, E>(self, f: impl FnOnce(A) -> Result<B, E>) -> Result<Node<B>, E> {
        Ok(match self {
            Node::TagOpen {
                name,
                attrs,
                self_closing,
            } => Node::TagOpen {
                name,
                attrs: f(attrs)?,
                self_closing,
            },
            Node::TagClose { name } => Node::TagClose { name },
            Node::Text(s) => Node::Text(s),
            Node::CData(s) => Node::CData(s),
            Node::Comment(s) => Node::Comment(s),
            Node::ProcessingInstruction(s) => Node::ProcessingInstruction(s),
        })
    }
}

impl Node {
    /// Tag-open record without the self-closing flag
    pub fn tag_open(name: impl Into<String>, attrs: impl Into<String>) -> Self {
        Node::TagOpen {
            name: name.into(),
            attrs: attrs.into(),
            self_closing: None,
        }
    }

    pub fn tag_close(name: impl Into<String>) -> Self {
        Node::TagClose { name: name.into() }
    }

    pub fn text(contents: impl Into<String>) -> Self {
        Node::Text(contents.into())
    }

    /// Parse the raw attribute string of a tag-open record
    ///
    /// An all-whitespace string becomes an empty map without invoking the
    /// parser. Other records pass through unchanged.
    pub fn parse_attributes(self) -> Result<ParsedNode, AttributeError> {
        self.try_map_attrs(|raw| {
            if is_blank(&raw) {
                Ok(AttributeMap::new())
            } else {
                parse_attrs(&raw)
            }
        })
    }
}

/// Whether `s` holds only whitespace as ECMAScript `\s` defines it
///
/// Unlike [`char::is_whitespace`] this counts U+FEFF and leaves U+0085 out.
pub(crate) fn is_blank(s: &str) -> bool {
    s.chars().all(|c| {
        matches!(
            c,
            '\t' | '\n' | '\u{B}' | '\u{C}' | '\r' | ' '
                | '\u{A0}' | '\u{1680}' | '\u{2000}'..='\u{200A}'
                | '\u{2028}' | '\u{2029}' | '\u{202F}' | '\u{205F}' | '\u{3000}' | '\u{FEFF}'
        )
    })
}

/// Kind of a [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    TagOpen,
    TagClose,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

/// Every node kind, in canonical order
pub const AVAILABLE_NODES: [NodeKind; 6] = NodeKind::ALL;

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::TagOpen,
        NodeKind::TagClose,
        NodeKind::Text,
        NodeKind::CData,
        NodeKind::Comment,
        NodeKind::ProcessingInstruction,
    ];

    /// Lower-case name used in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::TagOpen => "tagopen",
            NodeKind::TagClose => "tagclose",
            NodeKind::Text => "text",
            NodeKind::CData => "cdata",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processinginstruction",
        }
    }

    #[inline]
    fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name that is not one of [`AVAILABLE_NODES`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown node kind `{0}`")]
pub struct UnknownKind(pub String);

impl FromStr for NodeKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_owned()))
    }
}

/// Set of node kinds
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KindSet(u8);

impl KindSet {
    pub const fn empty() -> Self {
        KindSet(0)
    }

    pub fn all() -> Self {
        NodeKind::ALL.into_iter().collect()
    }

    #[inline]
    pub fn contains(self, kind: NodeKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: NodeKind) {
        self.0 |= kind.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Kinds in canonical order
    pub fn iter(self) -> impl Iterator<Item = NodeKind> {
        NodeKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }
}

impl Default for KindSet {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<NodeKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = NodeKind>>(iter: I) -> Self {
        let mut set = KindSet::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl From<NodeKind> for KindSet {
    fn from(kind: NodeKind) -> Self {
        KindSet(kind.bit())
    }
}

impl<const N: usize> From<[NodeKind; N]> for KindSet {
    fn from(kinds: [NodeKind; N]) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<&[NodeKind]> for KindSet {
    fn from(kinds: &[NodeKind]) -> Self {
        kinds.iter().copied().collect()
    }
}

/// Comma-separated kind names, e.g. `"tagopen,tagclose"`
impl FromStr for KindSet {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(NodeKind::from_str)
            .collect()
    }
}

/// Interest configuration
///
/// Which kinds are reported, whether whitespace-only text is suppressed and
/// whether tag-open records carry the self-closing flag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParserOptions {
    include: KindSet,
    no_empty_text: bool,
    report_self_closing: bool,
}

impl ParserOptions {
    /// All kinds, no suppression, no flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Report only these kinds
    pub fn include(mut self, kinds: impl Into<KindSet>) -> Self {
        self.include = kinds.into();
        self
    }

    /// Drop text records that are empty or whitespace-only
    pub fn no_empty_text(mut self, enabled: bool) -> Self {
        self.no_empty_text = enabled;
        self
    }

    /// Set `self_closing` on tag-open records
    pub fn report_self_closing(mut self, enabled: bool) -> Self {
        self.report_self_closing = enabled;
        self
    }

    pub fn kinds(&self) -> KindSet {
        self.include
    }

    pub fn suppresses_empty_text(&self) -> bool {
        self.no_empty_text
    }

    pub fn reports_self_closing(&self) -> bool {
        self.report_self_closing
    }
}
